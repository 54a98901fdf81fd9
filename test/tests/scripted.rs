use std::{
    sync::{Arc, Mutex, mpsc},
    thread,
    time::Duration,
};

use tally_client::{
    Client, Header, HttpClient, Instrument, Request, RequestBuilder, RequestOptions, Response,
    error::{CapacityExceeded, Error, TransportError},
    http::{self, HeaderValue, StatusCode},
    transport::{
        Abort, Failure, Listener, Transport,
        scripted::{Script, ScriptedTransport},
    },
};

fn client(script: Script) -> HttpClient {
    HttpClient::builder()
        .transport(ScriptedTransport::new(script))
        .finish()
        .unwrap()
}

fn request() -> Request {
    RequestBuilder::get("http://scripted.local/path").unwrap().create()
}

fn headers(res: &Response) -> Vec<Header> {
    res.headers().cloned().collect()
}

#[tokio::test]
async fn completion_styles_agree() {
    let client = client(
        Script::new(200)
            .header("x-a", "1")
            .header("x-a", "2")
            .header("content-type", "text/plain")
            .chunk("hello ")
            .chunk("world"),
    );

    for opts in [
        RequestOptions::DEFAULT,
        RequestOptions::DEFAULT.max_response_bytes(8).truncate_on_limit(),
    ] {
        let blocking = client.send(request(), &opts).unwrap();

        let (tx, rx) = mpsc::channel();
        client.send_async(request(), &opts).on_complete(move |res| {
            let _ = tx.send(res);
        });
        let callback = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();

        let promise = client.send_promise(request(), &opts).await.unwrap();

        for res in [&callback, &promise] {
            assert_eq!(res.status_code(), blocking.status_code());
            assert_eq!(headers(res), headers(&blocking));
            assert_eq!(res.bytes(), blocking.bytes());
            assert_eq!(res.is_truncated(), blocking.is_truncated());
        }

        assert_eq!(blocking.header_values("x-a"), ["1", "2"]);
        match opts.get_max_response_bytes() {
            8 => {
                assert!(blocking.is_truncated());
                assert_eq!(blocking.bytes().unwrap().as_ref(), b"hello wo");
            }
            _ => {
                assert!(!blocking.is_truncated());
                assert_eq!(blocking.bytes().unwrap().as_ref(), b"hello world");
            }
        }
    }
}

#[tokio::test]
async fn completion_styles_agree_on_failure() {
    let client = client(Script::new(200).chunk("partial").fail_after(1, "reset"));
    let opts = RequestOptions::DEFAULT;

    let err = client.send(request(), &opts).unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Io(_))));

    let (tx, rx) = mpsc::channel();
    client.send_async(request(), &opts).on_complete(move |res| {
        let _ = tx.send(res);
    });
    let err = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Io(_))));

    let err = client.send_promise(request(), &opts).await.unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Io(_))));
}

#[test]
fn truncate_across_chunks() {
    let client = client(Script::new(200).chunk("aaaa").chunk("bbbb").chunk("cccc"));

    let opts = RequestOptions::DEFAULT.max_response_bytes(6).truncate_on_limit();
    let res = client.send(request(), &opts).unwrap();
    assert!(res.is_truncated());
    assert_eq!(res.bytes().unwrap().as_ref(), b"aaaabb");

    let opts = RequestOptions::DEFAULT.max_response_bytes(6);
    let err = client.send(request(), &opts).unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded(ref e) if e.limit == 6));

    // content exactly at the limit is not truncated.
    let opts = RequestOptions::DEFAULT.max_response_bytes(12);
    let res = client.send(request(), &opts).unwrap();
    assert!(!res.is_truncated());
    assert_eq!(res.bytes().unwrap().len(), 12);
}

#[test]
fn instrument_levels() {
    let client = client(Script::new(200).chunk("body"));

    let res = client
        .send(request(), &RequestOptions::DEFAULT.instrument(Instrument::None))
        .unwrap();
    assert!(res.timing().is_none());
    assert!(res.stats().is_none());

    let res = client
        .send(request(), &RequestOptions::DEFAULT.instrument(Instrument::Timing))
        .unwrap();
    assert!(res.timing().is_some());
    assert!(res.stats().is_none());

    let res = client.send(request(), &RequestOptions::DEFAULT).unwrap();
    let stats = res.stats().unwrap();
    assert_eq!(stats.response_body_size(), 4);
    assert_eq!(stats.response_chunk_count(), 1);
    assert_eq!(res.timing(), Some(stats.timing()));
}

#[test]
fn wait_timeout() {
    let client = client(Script::new(200).delay(Duration::from_millis(500)));

    let opts = RequestOptions::DEFAULT.timeout(Duration::from_millis(50));
    let err = client.send(request(), &opts).unwrap_err();
    assert!(matches!(err, Error::WaitTimeout(_)));
}

#[test]
fn script_per_request() {
    let transport = ScriptedTransport::with(|req| match req.request_path() {
        "/missing" => Script::new(404),
        path => Script::new(200).chunk(path.to_owned()),
    });
    let client = HttpClient::builder().transport(transport).finish().unwrap();

    let res = client
        .send_default(RequestBuilder::get("http://scripted.local/found").unwrap().create())
        .unwrap();
    assert_eq!(res.bytes().unwrap().as_ref(), b"/found");

    let res = client
        .send_default(RequestBuilder::get("http://scripted.local/missing").unwrap().create())
        .unwrap();
    assert_eq!(res.status_code(), 404);
}

// transport dropping every listener without completing it.
struct Vanishing;

impl Transport for Vanishing {
    fn send(&self, _: Request, _: &RequestOptions, listener: Arc<dyn Listener>) {
        listener.on_queued();
    }
}

#[tokio::test]
async fn abandoned_exchange_is_interrupted() {
    let client = HttpClient::builder().transport(Vanishing).finish().unwrap();

    let err = client.send_default(request()).unwrap_err();
    assert!(matches!(err, Error::Interrupted));

    let err = client.send_promise(request(), &RequestOptions::DEFAULT).await.unwrap_err();
    assert!(matches!(err, Error::Interrupted));
}

struct Recording {
    events: Mutex<Vec<&'static str>>,
    done: Mutex<Option<mpsc::Sender<()>>>,
}

impl Recording {
    fn push(&self, event: &'static str) {
        self.events.lock().unwrap().push(event);
    }
}

impl Listener for Recording {
    fn on_queued(&self) {
        self.push("queued");
    }

    fn on_request_begin(&self) {
        self.push("request_begin");
    }

    fn on_request_success(&self) {
        self.push("request_success");
    }

    fn on_response_begin(&self, _: StatusCode) {
        self.push("response_begin");
    }

    fn on_response_content(&self, _: &[u8]) -> Result<(), Abort> {
        self.push("response_content");
        Ok(())
    }

    fn on_response_success(&self) {
        self.push("response_success");
    }

    fn on_response_failure(&self, _: &Failure) {
        self.push("response_failure");
    }

    fn on_complete(&self, _: Result<(), Failure>) {
        self.push("complete");
        if let Some(tx) = self.done.lock().unwrap().take() {
            let _ = tx.send(());
        }
    }
}

fn record(script: Script) -> Vec<&'static str> {
    let (tx, rx) = mpsc::channel();
    let listener = Arc::new(Recording {
        events: Mutex::new(Vec::new()),
        done: Mutex::new(Some(tx)),
    });

    ScriptedTransport::new(script).send(request(), &RequestOptions::DEFAULT, listener.clone());
    rx.recv_timeout(Duration::from_secs(5)).unwrap();

    listener.events.lock().unwrap().clone()
}

#[test]
fn event_order() {
    assert_eq!(
        record(Script::new(200).chunk("a").chunk("b")),
        [
            "queued",
            "request_begin",
            "request_success",
            "response_begin",
            "response_content",
            "response_content",
            "response_success",
            "complete",
        ]
    );

    assert_eq!(
        record(Script::new(200).chunk("a").fail_after(1, "reset")),
        [
            "queued",
            "request_begin",
            "request_success",
            "response_begin",
            "response_content",
            "response_failure",
            "complete",
        ]
    );
}

fn head(status: StatusCode) -> http::Response<()> {
    let mut head = http::Response::new(());
    *head.status_mut() = status;
    head.headers_mut().insert("x-a", HeaderValue::from_static("1"));
    head
}

// transport delivering every chunk and reporting success whatever its listener answers.
struct Deaf(&'static [&'static str]);

impl Transport for Deaf {
    fn send(&self, _: Request, _: &RequestOptions, listener: Arc<dyn Listener>) {
        listener.on_queued();
        listener.on_request_begin();
        listener.on_request_success();
        listener.on_response_begin(StatusCode::OK);
        let _ = listener.on_response_headers(&head(StatusCode::OK));
        for chunk in self.0 {
            let _ = listener.on_response_content(chunk.as_bytes());
        }
        listener.on_response_success();
        listener.on_complete(Ok(()));
    }
}

#[test]
fn ignored_abort_keeps_limit() {
    let client = HttpClient::builder()
        .transport(Deaf(&["12345", "6789", "ab"]))
        .finish()
        .unwrap();

    let opts = RequestOptions::DEFAULT.max_response_bytes(8);
    let err = client.send(request(), &opts).unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded(CapacityExceeded { limit: 8 })));

    let res = client.send(request(), &opts.truncate_on_limit()).unwrap();
    assert!(res.is_truncated());
    assert_eq!(res.bytes().unwrap().as_ref(), b"12345678");
    assert_eq!(res.stats().unwrap().response_body_size(), 8);

    // under the limit the transport result stands.
    let res = client
        .send(request(), &RequestOptions::DEFAULT.max_response_bytes(11))
        .unwrap();
    assert!(!res.is_truncated());
    assert_eq!(res.bytes().unwrap().as_ref(), b"123456789ab");
}

// transport delivering content before marking headers complete.
struct Coalescing;

impl Transport for Coalescing {
    fn send(&self, _: Request, _: &RequestOptions, listener: Arc<dyn Listener>) {
        thread::spawn(move || {
            listener.on_queued();
            listener.on_request_begin();
            listener.on_request_success();
            listener.on_response_begin(StatusCode::OK);
            let _ = listener.on_response_content(b"early");
            thread::sleep(Duration::from_millis(2));
            let _ = listener.on_response_headers(&head(StatusCode::OK));
            let _ = listener.on_response_content(b" late");
            listener.on_response_success();
            listener.on_complete(Ok(()));
        });
    }
}

#[test]
fn content_before_last_header() {
    let client = HttpClient::builder().transport(Coalescing).finish().unwrap();

    let res = client.send_default(request()).unwrap();
    assert_eq!(res.bytes().unwrap().as_ref(), b"early late");
    assert_eq!(res.header_value("x-a"), Some("1"));

    let stats = res.stats().unwrap();
    assert_eq!(stats.response_chunk_count(), 2);
    assert!(stats.time_to_first_content() < stats.time_to_last_header());
    assert!(stats.time_to_last_header() <= stats.time_to_response_complete());
    assert!(stats.time_to_response_status() <= stats.time_to_first_content());
}
