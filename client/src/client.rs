use std::sync::Arc;

use crate::{
    builder::ClientBuilder,
    completion::{Listenable, ListenableResponse, Pending, Promise, ResponseFuture, completion},
    error::Error,
    exchange::Exchange,
    options::{ClientOptions, RequestOptions},
    request::Request,
    response::Response,
    transport::Transport,
};

/// http client offering three ways of consuming one exchange.
///
/// implementor only provides [Client::start]. the consumption styles are derived from it and all
/// observe the same single terminal event.
pub trait Client: Send + Sync {
    /// start an exchange and return the read half of its result cell without blocking.
    fn start(&self, req: Request, opts: &RequestOptions) -> Pending<Response>;

    /// send request and block until the response is collected or [RequestOptions::get_timeout]
    /// elapsed.
    ///
    /// on timeout [Error::WaitTimeout] is returned and the exchange continues in background.
    fn send(&self, req: Request, opts: &RequestOptions) -> Result<Response, Error> {
        let timeout = opts.get_timeout();
        self.start(req, opts).wait(timeout)
    }

    /// send request with [RequestOptions::DEFAULT].
    fn send_default(&self, req: Request) -> Result<Response, Error> {
        self.send(req, &RequestOptions::DEFAULT)
    }

    /// send request and return a handle accepting one completion callback.
    fn send_async(&self, req: Request, opts: &RequestOptions) -> ListenableResponse {
        Listenable::new(self.start(req, opts))
    }

    /// send request and return a future of the response.
    fn send_promise(&self, req: Request, opts: &RequestOptions) -> ResponseFuture {
        Promise::new(self.start(req, opts))
    }

    /// release resources of client. exchanges started after shutdown fail.
    fn shutdown(&self) {}
}

/// [Client] implementation collecting responses through a [Transport].
pub struct HttpClient {
    transport: Box<dyn Transport>,
    options: ClientOptions,
}

impl HttpClient {
    pub(crate) fn new(transport: Box<dyn Transport>, options: ClientOptions) -> Self {
        Self { transport, options }
    }

    /// Start a new ClientBuilder.
    ///
    /// See [ClientBuilder] for detail.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}

impl Client for HttpClient {
    fn start(&self, req: Request, opts: &RequestOptions) -> Pending<Response> {
        let (completer, pending) = completion();
        let exchange = Exchange::new(req.method(), opts, completer);
        self.transport.send(req, opts, Arc::new(exchange));
        pending
    }

    fn shutdown(&self) {
        self.transport.shutdown();
    }
}

impl Drop for HttpClient {
    fn drop(&mut self) {
        self.transport.shutdown();
    }
}
