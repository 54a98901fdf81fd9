use crate::{client::HttpClient, error::Error, options::ClientOptions, transport::Transport};

/// Builder type for [HttpClient]. Offer configurations before a client instance is created.
pub struct ClientBuilder {
    options: ClientOptions,
    transport: TransportKind,
}

enum TransportKind {
    #[cfg(feature = "http1")]
    H1,
    Custom(Box<dyn Transport>),
    #[cfg(not(feature = "http1"))]
    Missing,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        ClientBuilder {
            options: ClientOptions::default(),
            #[cfg(feature = "http1")]
            transport: TransportKind::H1,
            #[cfg(not(feature = "http1"))]
            transport: TransportKind::Missing,
        }
    }

    /// set options of client. see [ClientOptions] for detail.
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// use the http/1 clear text transport. this is the default transport.
    #[cfg(feature = "http1")]
    pub fn h1(mut self) -> Self {
        self.transport = TransportKind::H1;
        self
    }

    /// use a custom transport. client options are not passed to it.
    ///
    /// # Examples
    /// ```rust
    /// use tally_client::{HttpClient, transport::scripted::{Script, ScriptedTransport}};
    ///
    /// let transport = ScriptedTransport::new(Script::new(200).chunk("hello"));
    /// let client = HttpClient::builder().transport(transport).finish().unwrap();
    /// ```
    pub fn transport<T>(mut self, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        self.transport = TransportKind::Custom(Box::new(transport));
        self
    }

    /// Finish the builder and construct [HttpClient] instance.
    pub fn finish(self) -> Result<HttpClient, Error> {
        let transport = match self.transport {
            #[cfg(feature = "http1")]
            TransportKind::H1 => Box::new(crate::transport::h1::H1Transport::new(&self.options)?) as Box<dyn Transport>,
            TransportKind::Custom(transport) => transport,
            #[cfg(not(feature = "http1"))]
            TransportKind::Missing => {
                return Err(Error::Transport(crate::error::TransportError::Unsupported(
                    "no transport configured. enable http1 feature or provide one with ClientBuilder::transport",
                )));
            }
        };

        Ok(HttpClient::new(transport, self.options))
    }
}
