use std::{sync::mpsc, time::Duration};

use tally_client::{
    Client, Cookie, HttpClient, Instrument, RequestBuilder, RequestOptions, TRUNCATED,
    error::{Error, ProtoError, TimeoutError, TransportError},
};
use tally_test::{Error as TestError, Reply, test_h1_server, unused_addr};

fn client() -> Result<HttpClient, TestError> {
    Ok(HttpClient::builder().finish()?)
}

#[test]
fn h1_get() -> Result<(), TestError> {
    let handle = test_h1_server(|req| {
        Reply::ok(format!("{} {}", req.method, req.path))
            .header("x-agent", req.header("user-agent").unwrap_or_default())
            .header("x-cookie", req.header("cookie").unwrap_or_default())
            .header("set-cookie", "session=abc; Path=/; HttpOnly")
            .header("content-type", "text/plain; charset=utf-8")
    })?;

    let client = client()?;

    let mut builder = RequestBuilder::get(handle.url("/hello?name=tally"))?;
    builder
        .header("X-Custom", "1")
        .cookie(Cookie::request("a", "1"))
        .cookie(Cookie::request("b", "2"));
    let req = builder.create();

    assert_eq!(req.parameter_value("name"), Some("tally"));

    let res = client.send(req, &RequestOptions::DEFAULT)?;

    assert!(res.is_ok());
    assert_eq!(res.bytes().unwrap().as_ref(), b"GET /hello?name=tally");
    assert_eq!(res.header_value("X-Agent"), Some("tally/0.1"));
    assert_eq!(res.header_value("x-cookie"), Some("a=1; b=2"));
    assert_eq!(res.charset("iso-8859-1"), "utf-8");
    assert!(!res.is_truncated());

    let cookie = &res.cookies()[0];
    assert_eq!(cookie.name(), "session");
    assert_eq!(cookie.value(), "abc");
    assert!(cookie.is_http_only());

    let stats = res.stats().unwrap();
    assert_eq!(stats.response_body_size(), 21);
    assert!(stats.response_header_count() >= 5);
    assert!(stats.time_to_response_complete() >= stats.time_to_first_content());

    Ok(())
}

#[test]
fn h1_form_post() -> Result<(), TestError> {
    let handle = test_h1_server(|req| {
        Reply::ok(req.body.clone()).header("x-content-type", req.header("content-type").unwrap_or_default())
    })?;

    let client = client()?;

    let mut builder = RequestBuilder::form_post(handle.url("/form"))?;
    builder.parameter("name", "a b").parameter("name", "c&d").parameter("k", "v");

    let res = client.send_default(builder.create())?;

    assert_eq!(res.bytes().unwrap().as_ref(), b"k=v&name=a+b&name=c%26d");
    assert_eq!(
        res.header_value("x-content-type"),
        Some("application/x-www-form-urlencoded")
    );

    Ok(())
}

#[test]
fn h1_post_body() -> Result<(), TestError> {
    let handle = test_h1_server(|req| Reply::ok(req.body.clone()))?;

    let client = client()?;
    let body = vec![b'x'; 32 * 1024];
    let req = RequestBuilder::post(handle.url("/upload"), body.clone())?.create();

    let res = client.send(req, &RequestOptions::DEFAULT.instrument(Instrument::Stats))?;

    assert_eq!(res.bytes().unwrap().as_ref(), &body[..]);
    assert_eq!(res.stats().unwrap().request_body_size(), body.len() as u64);

    Ok(())
}

#[test]
fn h1_truncate() -> Result<(), TestError> {
    let handle = test_h1_server(|_| Reply::ok(vec![b'a'; 1000]))?;

    let client = client()?;
    let opts = RequestOptions::DEFAULT.max_response_bytes(100).truncate_on_limit();

    let res = client.send(RequestBuilder::get(handle.url("/"))?.create(), &opts)?;

    assert!(res.is_truncated());
    assert_eq!(res.attribute(TRUNCATED).and_then(|a| a.as_bool()), Some(true));
    assert_eq!(res.bytes().unwrap().len(), 100);
    assert_eq!(res.stats().unwrap().response_body_size(), 100);

    Ok(())
}

#[test]
fn h1_capacity_exceeded() -> Result<(), TestError> {
    let handle = test_h1_server(|req| match req.path.as_str() {
        "/sized" => Reply::ok(vec![b'a'; 1000]),
        _ => Reply::new(200).chunked([vec![b'a'; 60], vec![b'b'; 60]]),
    })?;

    let client = client()?;
    let opts = RequestOptions::DEFAULT.max_response_bytes(100);

    // declared length fails before any content is collected.
    let err = client
        .send(RequestBuilder::get(handle.url("/sized"))?.create(), &opts)
        .unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded(ref e) if e.limit == 100));

    let err = client
        .send(RequestBuilder::get(handle.url("/chunked"))?.create(), &opts)
        .unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded(ref e) if e.limit == 100));

    Ok(())
}

#[test]
fn h1_chunked_body() -> Result<(), TestError> {
    let handle = test_h1_server(|_| Reply::new(200).chunked(["hello", " ", "world"]))?;

    let client = client()?;

    let res = client.send_default(RequestBuilder::get(handle.url("/chunked"))?.create())?;
    assert_eq!(res.bytes().unwrap().as_ref(), b"hello world");
    assert!(res.stats().unwrap().response_chunk_count() >= 1);

    Ok(())
}

#[test]
fn h1_head() -> Result<(), TestError> {
    let handle = test_h1_server(|_| Reply::ok(vec![b'a'; 4096]))?;

    let client = client()?;
    let opts = RequestOptions::DEFAULT.max_response_bytes(16);

    // declared length of HEAD response is not checked against capacity.
    let res = client.send(RequestBuilder::head(handle.url("/"))?.create(), &opts)?;

    assert_eq!(res.status_code(), 200);
    assert_eq!(res.header_value("content-length"), Some("4096"));
    assert!(res.bytes().unwrap().is_empty());

    Ok(())
}

#[test]
fn h1_status_and_early_eof() -> Result<(), TestError> {
    let handle = test_h1_server(|req| match req.path.as_str() {
        "/missing" => Reply::new(404).body("not found"),
        _ => Reply::new(200).short("abc", 10),
    })?;

    let client = client()?;

    let res = client.send_default(RequestBuilder::get(handle.url("/missing"))?.create())?;
    assert_eq!(res.status_code(), 404);
    assert!(!res.is_ok());

    let err = client
        .send_default(RequestBuilder::get(handle.url("/short"))?.create())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError::Proto(ProtoError::UnexpectedEof))
    ));

    Ok(())
}

#[tokio::test]
async fn h1_request_timeout() -> Result<(), TestError> {
    let handle = test_h1_server(|_| Reply::ok("late").delay(Duration::from_secs(3)))?;

    let client = client()?;
    let opts = RequestOptions::DEFAULT.timeout(Duration::from_millis(200));

    let err = client
        .send_promise(RequestBuilder::get(handle.url("/"))?.create(), &opts)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Transport(TransportError::Timeout(TimeoutError::Request))
    ));

    Ok(())
}

#[test]
fn h1_connect_failure() -> Result<(), TestError> {
    let addr = unused_addr()?;

    let client = client()?;

    let err = client
        .send_default(RequestBuilder::get(format!("http://{addr}/"))?.create())
        .unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Io(_))));

    let err = client
        .send_default(RequestBuilder::get("https://localhost/")?.create())
        .unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Unsupported(_))));

    Ok(())
}

#[tokio::test]
async fn h1_completion_styles() -> Result<(), TestError> {
    let handle = test_h1_server(|req| Reply::ok(req.path.clone()))?;

    let client = client()?;
    let opts = RequestOptions::DEFAULT;

    let res = client.send(RequestBuilder::get(handle.url("/blocking"))?.create(), &opts)?;
    assert_eq!(res.bytes().unwrap().as_ref(), b"/blocking");

    let (tx, rx) = mpsc::channel();
    client
        .send_async(RequestBuilder::get(handle.url("/callback"))?.create(), &opts)
        .on_complete(move |res| {
            let _ = tx.send(res);
        });
    let res = rx.recv_timeout(Duration::from_secs(5))??;
    assert_eq!(res.bytes().unwrap().as_ref(), b"/callback");

    let res = client
        .send_promise(RequestBuilder::get(handle.url("/promise"))?.create(), &opts)
        .await?;
    assert_eq!(res.bytes().unwrap().as_ref(), b"/promise");

    Ok(())
}

#[test]
fn h1_shutdown() -> Result<(), TestError> {
    let handle = test_h1_server(|_| Reply::ok("ok"))?;

    let client = client()?;

    let res = client.send_default(RequestBuilder::get(handle.url("/"))?.create())?;
    assert!(res.is_ok());

    client.shutdown();

    let err = client
        .send_default(RequestBuilder::get(handle.url("/"))?.create())
        .unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Shutdown)));

    Ok(())
}
