//! in memory transport replaying canned responses.

use core::time::Duration;

use std::{io, sync::Arc, thread};

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use tracing::debug;

use crate::{error::TransportError, options::RequestOptions, request::Request};

use super::{Failure, Listener, Transport};

/// canned response of [ScriptedTransport].
#[derive(Clone, Debug)]
pub struct Script {
    status: u16,
    headers: Vec<(String, String)>,
    chunks: Vec<Bytes>,
    fail_after: Option<(usize, String)>,
    delay: Duration,
}

impl Script {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            chunks: Vec::new(),
            fail_after: None,
            delay: Duration::ZERO,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// append a chunk of response content.
    pub fn chunk(mut self, chunk: impl Into<Bytes>) -> Self {
        self.chunks.push(chunk.into());
        self
    }

    /// declare `Content-Length` as the total size of all chunks.
    pub fn content_length(self) -> Self {
        let len = self.chunks.iter().map(Bytes::len).sum::<usize>();
        self.header("content-length", len.to_string())
    }

    /// fail the exchange with an io error after delivering `chunks` chunks of content.
    pub fn fail_after(mut self, chunks: usize, msg: impl Into<String>) -> Self {
        self.fail_after = Some((chunks, msg.into()));
        self
    }

    /// sleep before the exchange begins.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// [Transport] replaying a [Script] for every request on a dedicated thread.
#[derive(Clone)]
pub struct ScriptedTransport {
    script: Arc<dyn Fn(&Request) -> Script + Send + Sync>,
}

impl ScriptedTransport {
    /// replay the same script for every request.
    pub fn new(script: Script) -> Self {
        Self::with(move |_| script.clone())
    }

    /// derive script from each request.
    pub fn with<F>(f: F) -> Self
    where
        F: Fn(&Request) -> Script + Send + Sync + 'static,
    {
        Self { script: Arc::new(f) }
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, req: Request, _: &RequestOptions, listener: Arc<dyn Listener>) {
        listener.on_queued();

        let script = (self.script)(&req);
        let fallback = listener.clone();

        let res = thread::Builder::new()
            .name(String::from("tally-scripted"))
            .spawn(move || {
                let res = replay(&req, &script, &*listener);
                listener.on_complete(res);
            });

        if let Err(e) = res {
            debug!("failed to spawn scripted exchange: {e}");
            fallback.on_complete(Err(Failure::Transport(TransportError::Io(e))));
        }
    }
}

fn replay(req: &Request, script: &Script, listener: &dyn Listener) -> Result<(), Failure> {
    if !script.delay.is_zero() {
        thread::sleep(script.delay);
    }

    listener.on_request_begin();

    let mut headers = HeaderMap::new();
    for h in req.headers() {
        let Ok(name) = HeaderName::from_bytes(h.name().as_bytes()) else {
            continue;
        };
        for v in h.values() {
            if let Ok(value) = HeaderValue::from_str(v) {
                headers.append(name.clone(), value);
            }
        }
    }
    listener.on_request_headers(&headers);
    listener.on_request_commit();

    if let Some(body) = req.body().cloned().or_else(|| req.form_body()) {
        listener.on_request_content(&body);
    }
    listener.on_request_success();

    let res = replay_response(script, listener);
    match res {
        Ok(()) => listener.on_response_success(),
        Err(ref e) => listener.on_response_failure(e),
    }
    res
}

fn replay_response(script: &Script, listener: &dyn Listener) -> Result<(), Failure> {
    let status = StatusCode::from_u16(script.status)
        .map_err(|e| Failure::Transport(TransportError::Std(Box::new(e))))?;

    listener.on_response_begin(status);

    let mut head = http::Response::new(());
    *head.status_mut() = status;
    for (name, value) in script.headers.iter() {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| TransportError::Std(Box::new(e)))?;
        let value = HeaderValue::from_str(value).map_err(|e| TransportError::Std(Box::new(e)))?;
        listener.on_response_header(&name, &value);
        head.headers_mut().append(name, value);
    }

    listener.on_response_headers(&head)?;

    for (idx, chunk) in script.chunks.iter().enumerate() {
        if let Some((after, ref msg)) = script.fail_after {
            if idx == after {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, msg.clone()).into());
            }
        }
        listener.on_response_content(chunk)?;
    }

    if let Some((after, ref msg)) = script.fail_after {
        if after >= script.chunks.len() {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, msg.clone()).into());
        }
    }

    Ok(())
}
