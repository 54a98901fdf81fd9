//! http/1.1 clear text transport over [xitca_client].
//!
//! exchanges run on a dedicated worker thread driving a single threaded tokio runtime. the
//! engine there owns connections and wire framing. this module only translates a [Request] into
//! the engine's request and the engine's response into [Listener] events.

use core::{cell::Cell, future::poll_fn, pin::Pin, time::Duration};

use std::{
    error, io,
    rc::Rc,
    sync::{Arc, Mutex, PoisonError},
    thread,
};

use bytes::Bytes;
use futures_core::Stream;
use http::{
    HeaderMap, HeaderName, HeaderValue, Version,
    header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST, TRANSFER_ENCODING, USER_AGENT},
};
use tokio::{
    runtime::Runtime,
    sync::mpsc::{UnboundedReceiver, UnboundedSender, error::SendError, unbounded_channel},
    task::LocalSet,
};
use tracing::{debug, trace};
use xitca_client::{
    Client as Engine,
    error::{Error as EngineError, TimeoutError as EngineTimeout},
};

use crate::{
    error::{Error, ProtoError, TimeoutError, TransportError},
    options::{ClientOptions, RequestOptions},
    request::{FORM_ENCODED_CONTENT_TYPE, Request},
};

use super::{Failure, Listener, Transport};

/// [Transport] speaking http/1.1 over plain tcp.
pub struct H1Transport {
    tx: Mutex<Option<UnboundedSender<Job>>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    request_timeout: Duration,
}

struct Job {
    req: Request,
    timeout: Duration,
    listener: Arc<dyn Listener>,
}

struct Config {
    user_agent: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    request_buffer_size: usize,
    response_buffer_size: usize,
}

impl H1Transport {
    /// spawn worker thread of transport.
    pub fn new(opts: &ClientOptions) -> Result<Self, Error> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TransportError::Io)?;

        let config = Config {
            user_agent: opts.user_agent.clone(),
            connect_timeout: opts.connect_timeout,
            request_timeout: opts.request_timeout,
            request_buffer_size: opts.request_buffer_size.max(1),
            response_buffer_size: opts.response_buffer_size.max(1),
        };

        let (tx, rx) = unbounded_channel();

        let handle = thread::Builder::new()
            .name(String::from("tally-h1-worker"))
            .spawn(move || run_worker(rt, rx, config))
            .map_err(TransportError::Io)?;

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
            request_timeout: opts.request_timeout,
        })
    }
}

impl Transport for H1Transport {
    fn send(&self, req: Request, opts: &RequestOptions, listener: Arc<dyn Listener>) {
        listener.on_queued();

        let job = Job {
            req,
            timeout: opts.get_timeout().min(self.request_timeout),
            listener,
        };

        let rejected = match *self.tx.lock().unwrap_or_else(PoisonError::into_inner) {
            Some(ref tx) => tx.send(job).err().map(|SendError(job)| job),
            None => Some(job),
        };

        if let Some(job) = rejected {
            debug!(target: "tally::h1", "exchange rejected by stopped transport");
            job.listener
                .on_complete(Err(Failure::Transport(TransportError::Shutdown)));
        }
    }

    /// stop accepting exchanges. in flight exchanges run to completion before worker exits.
    fn shutdown(&self) {
        drop(self.tx.lock().unwrap_or_else(PoisonError::into_inner).take());

        let handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            // shutdown from inside a completion callback runs on worker thread itself.
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                debug!(target: "tally::h1", "worker thread panicked");
            }
        }
    }
}

impl Drop for H1Transport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(rt: Runtime, mut rx: UnboundedReceiver<Job>, config: Config) {
    debug!(target: "tally::h1", "worker started");

    let local = LocalSet::new();

    local.spawn_local(async move {
        // engine spawns its date service so it's built inside the runtime.
        let engine = Rc::new(
            Engine::builder()
                .set_connect_timeout(config.connect_timeout)
                .set_request_timeout(config.request_timeout)
                .set_response_timeout(config.request_timeout)
                .finish(),
        );
        let config = Rc::new(config);

        while let Some(job) = rx.recv().await {
            tokio::task::spawn_local(dispatch(engine.clone(), config.clone(), job));
        }
    });

    // LocalSet resolves when receiver loop and every in flight exchange are finished.
    rt.block_on(local);

    debug!(target: "tally::h1", "worker stopped");
}

#[derive(Clone, Copy)]
enum Phase {
    Request,
    Response,
}

async fn dispatch(engine: Rc<Engine>, config: Rc<Config>, job: Job) {
    let Job { req, timeout, listener } = job;

    let phase = Cell::new(Phase::Request);

    let res = match tokio::time::timeout(timeout, exchange(&engine, &config, &req, &*listener, &phase)).await {
        Ok(res) => res,
        Err(_) => Err(Failure::Transport(TimeoutError::Request.into())),
    };

    if let Err(ref e) = res {
        debug!(target: "tally::h1", "exchange with {} failed: {e}", req.uri());
        match phase.get() {
            Phase::Request => listener.on_request_failure(e),
            Phase::Response => listener.on_response_failure(e),
        }
    }

    listener.on_complete(res);
}

// the engine writes the whole request before yielding its response. request progress events
// are therefore emitted once the request is known to be sent.
async fn exchange(
    engine: &Engine,
    config: &Config,
    req: &Request,
    listener: &dyn Listener,
    phase: &Cell<Phase>,
) -> Result<(), Failure> {
    match req.uri().scheme_str() {
        Some("http") | None => {}
        Some("https") => return Err(TransportError::Unsupported("https by http/1 clear text transport").into()),
        Some(_) => return Err(TransportError::Unsupported("unknown uri scheme").into()),
    }

    let body = req.body().cloned().or_else(|| req.form_body());
    let headers = request_headers(req, body.as_ref().map(Bytes::len), &config.user_agent)?;

    listener.on_request_begin();
    listener.on_request_headers(&headers);

    let mut builder = engine
        .get(req.uri().clone())
        .map_err(engine_error)?
        .method(req.method().into())
        .version(Version::HTTP_11);
    *builder.headers_mut() = headers;

    let builder = match body {
        Some(ref body) => builder.body(body.clone()),
        None if req.method().has_body() => builder.body(Bytes::new()),
        None => builder,
    };

    let mut res = builder.send().await.map_err(engine_error)?;

    trace!(target: "tally::h1", "request to {} sent", req.uri());

    listener.on_request_commit();
    if let Some(body) = body.filter(|b| !b.is_empty()) {
        for chunk in body.chunks(config.request_buffer_size) {
            listener.on_request_content(chunk);
        }
    }
    listener.on_request_success();
    phase.set(Phase::Response);

    let mut head = http::Response::new(());
    *head.status_mut() = res.status();
    *head.version_mut() = res.version();
    *head.headers_mut() = core::mem::take(res.headers_mut());

    listener.on_response_begin(head.status());
    for (name, value) in head.headers() {
        listener.on_response_header(name, value);
    }
    listener.on_response_headers(&head)?;

    let body = res.body_mut();

    while let Some(chunk) = poll_fn(|cx| Pin::new(&mut *body).poll_next(cx)).await {
        let chunk = chunk.map_err(body_error)?;
        for part in chunk.chunks(config.response_buffer_size) {
            listener.on_response_content(part)?;
        }
    }

    listener.on_response_success();

    Ok(())
}

/// headers sent with request. the engine adds nothing the map already carries.
fn request_headers(req: &Request, body_len: Option<usize>, user_agent: &str) -> Result<HeaderMap, ProtoError> {
    let mut headers = HeaderMap::with_capacity(req.headers().count() + 4);

    for h in req.headers() {
        let name = HeaderName::from_bytes(h.name().as_bytes()).map_err(|_| ProtoError::InvalidHeader)?;
        for v in h.values() {
            let value = HeaderValue::from_str(v).map_err(|_| ProtoError::InvalidHeader)?;
            headers.append(name.clone(), value);
        }
    }

    if !headers.contains_key(HOST) {
        let uri = req.uri();
        let host = uri.host().unwrap_or_default();
        let value = match uri.port_u16() {
            Some(port) => HeaderValue::try_from(format!("{host}:{port}")),
            None => HeaderValue::try_from(host),
        }
        .map_err(|_| ProtoError::InvalidHeader)?;
        headers.insert(HOST, value);
    }

    if !user_agent.is_empty() && !headers.contains_key(USER_AGENT) {
        let value = HeaderValue::from_str(user_agent).map_err(|_| ProtoError::InvalidHeader)?;
        headers.insert(USER_AGENT, value);
    }

    if !req.cookies().is_empty() {
        let cookie = req.cookies().iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
        let value = HeaderValue::try_from(cookie).map_err(|_| ProtoError::InvalidHeader)?;
        headers.append(COOKIE, value);
    }

    if req.form_body().is_some() && !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_ENCODED_CONTENT_TYPE));
    }

    headers.remove(TRANSFER_ENCODING);
    match body_len {
        Some(len) => {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
        }
        None if req.method().has_body() => {
            headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        }
        None => {
            headers.remove(CONTENT_LENGTH);
        }
    }

    // one connection per exchange.
    headers.insert(CONNECTION, HeaderValue::from_static("close"));

    Ok(headers)
}

fn engine_error(e: EngineError) -> TransportError {
    match e {
        EngineError::Io(e) => TransportError::Io(e),
        EngineError::Std(e) => match e.downcast::<EngineTimeout>() {
            Ok(e) => match *e {
                EngineTimeout::Resolve | EngineTimeout::Connect | EngineTimeout::TlsHandshake => {
                    TimeoutError::Connect.into()
                }
                _ => TimeoutError::Request.into(),
            },
            Err(e) => TransportError::Std(e),
        },
        e => TransportError::Std(Box::new(e)),
    }
}

fn body_error(e: Box<dyn error::Error + Send + Sync>) -> TransportError {
    match e.downcast::<io::Error>() {
        Ok(e) if e.kind() == io::ErrorKind::UnexpectedEof => ProtoError::UnexpectedEof.into(),
        Ok(e) => TransportError::Io(*e),
        Err(e) => TransportError::Std(e),
    }
}
