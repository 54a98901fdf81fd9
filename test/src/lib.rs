//! test server and fixtures shared by integration tests of tally-client.

use std::{
    error, io,
    net::{SocketAddr, TcpListener},
    sync::Arc,
    thread,
    time::Duration,
};

use bytes::{BufMut, Bytes, BytesMut};
use tally_client::http::StatusCode;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::oneshot,
};
use tracing::debug;

pub type Error = Box<dyn error::Error + Send + Sync>;

/// request head and body as seen by test server.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl RequestHead {
    /// first header value with given name. names are compared case insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

enum ReplyBody {
    Sized(Bytes),
    Chunked(Vec<Bytes>),
    // declared length is larger than the content sent.
    Short(Bytes, usize),
}

/// response written by test server.
pub struct Reply {
    status: u16,
    headers: Vec<(String, String)>,
    body: ReplyBody,
    delay: Duration,
}

impl Reply {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: ReplyBody::Sized(Bytes::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200).body(body)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// body sent with `Content-Length`.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = ReplyBody::Sized(body.into());
        self
    }

    /// body sent with `Transfer-Encoding: chunked`. one chunk per item.
    pub fn chunked<I, B>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        self.body = ReplyBody::Chunked(chunks.into_iter().map(Into::into).collect());
        self
    }

    /// declare `declared` bytes of content and close connection after writing `body`.
    pub fn short(mut self, body: impl Into<Bytes>, declared: usize) -> Self {
        self.body = ReplyBody::Short(body.into(), declared);
        self
    }

    /// wait before writing the reply.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn encode(&self, head_only: bool) -> BytesMut {
        let mut buf = BytesMut::new();

        let reason = StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown");
        buf.put_slice(format!("HTTP/1.1 {} {reason}\r\n", self.status).as_bytes());

        for (name, value) in self.headers.iter() {
            buf.put_slice(format!("{name}: {value}\r\n").as_bytes());
        }

        match self.body {
            ReplyBody::Sized(ref body) => buf.put_slice(format!("content-length: {}\r\n", body.len()).as_bytes()),
            ReplyBody::Chunked(_) => buf.put_slice(b"transfer-encoding: chunked\r\n"),
            ReplyBody::Short(_, declared) => buf.put_slice(format!("content-length: {declared}\r\n").as_bytes()),
        }

        buf.put_slice(b"connection: close\r\n\r\n");

        if head_only {
            return buf;
        }

        match self.body {
            ReplyBody::Sized(ref body) | ReplyBody::Short(ref body, _) => buf.put_slice(body),
            ReplyBody::Chunked(ref chunks) => {
                for chunk in chunks.iter().filter(|c| !c.is_empty()) {
                    buf.put_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
                    buf.put_slice(chunk);
                    buf.put_slice(b"\r\n");
                }
                buf.put_slice(b"0\r\n\r\n");
            }
        }

        buf
    }
}

/// A http/1 test server replying to every request with the output of `handler`.
///
/// server runs on its own thread and stops when returned handle is dropped.
pub fn test_h1_server<F>(handler: F) -> Result<TestServerHandle, Error>
where
    F: Fn(&RequestHead) -> Reply + Send + Sync + 'static,
{
    let lst = TcpListener::bind("127.0.0.1:0")?;
    lst.set_nonblocking(true)?;

    let addr = lst.local_addr()?;

    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

    let (tx, rx) = oneshot::channel::<()>();

    let handler = Arc::new(handler);

    thread::Builder::new()
        .name(String::from("tally-test-server"))
        .spawn(move || {
            rt.block_on(async move {
                let lst = match tokio::net::TcpListener::from_std(lst) {
                    Ok(lst) => lst,
                    Err(e) => {
                        debug!("test server failed to start: {e}");
                        return;
                    }
                };

                let mut rx = rx;

                loop {
                    tokio::select! {
                        _ = &mut rx => break,
                        res = lst.accept() => {
                            match res {
                                Ok((stream, _)) => {
                                    let handler = handler.clone();
                                    tokio::spawn(async move {
                                        if let Err(e) = serve(stream, &*handler).await {
                                            debug!("test server connection error: {e}");
                                        }
                                    });
                                }
                                Err(e) => debug!("test server accept error: {e}"),
                            }
                        }
                    }
                }
            })
        })?;

    Ok(TestServerHandle { addr, _stop: tx })
}

async fn serve<F>(mut stream: TcpStream, handler: &F) -> io::Result<()>
where
    F: Fn(&RequestHead) -> Reply,
{
    let mut buf = BytesMut::with_capacity(4096);

    let (mut head, len) = loop {
        if stream.read_buf(&mut buf).await? == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        if let Some(parsed) = parse_head(&buf)? {
            break parsed;
        }
    };

    let _ = buf.split_to(len);

    let content_length = head
        .header("content-length")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < content_length {
        if stream.read_buf(&mut buf).await? == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
    }

    head.body = buf.split_to(content_length).freeze();

    let reply = handler(&head);

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let out = reply.encode(head.method == "HEAD");
    stream.write_all(&out).await?;
    stream.flush().await?;
    stream.shutdown().await
}

fn parse_head(buf: &[u8]) -> io::Result<Option<(RequestHead, usize)>> {
    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut headers);

    let len = match req.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e)),
    };

    let head = RequestHead {
        method: req.method.unwrap_or_default().to_owned(),
        path: req.path.unwrap_or_default().to_owned(),
        headers: req
            .headers
            .iter()
            .map(|h| (h.name.to_owned(), String::from_utf8_lossy(h.value).into_owned()))
            .collect(),
        body: Bytes::new(),
    };

    Ok(Some((head, len)))
}

pub struct TestServerHandle {
    addr: SocketAddr,
    _stop: oneshot::Sender<()>,
}

impl TestServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn ip_port_string(&self) -> String {
        format!("{}:{}", self.addr.ip(), self.addr.port())
    }

    /// absolute url of given path on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.ip_port_string())
    }
}

/// an address nothing listens on.
pub fn unused_addr() -> Result<SocketAddr, Error> {
    let lst = TcpListener::bind("127.0.0.1:0")?;
    Ok(lst.local_addr()?)
}
