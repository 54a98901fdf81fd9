use std::sync::{Mutex, PoisonError};

use http::{
    HeaderMap, HeaderName, HeaderValue, StatusCode,
    header::{CONTENT_LENGTH, SET_COOKIE},
};
use tracing::{debug, trace};

use crate::{
    attribute::TRUNCATED,
    collector::Collector,
    completion::Completer,
    cookie::Cookie,
    error::{CapacityExceeded, Error},
    options::{Instrument, RequestOptions},
    recorder::Recorder,
    request::Method,
    response::{Response, ResponseBuilder},
    transport::{Abort, Failure, Listener},
};

/// collection and instrumentation pipeline of one exchange.
///
/// receives transport events, feeds content to [Collector] and milestones to [Recorder] and
/// resolves the completion cell on the terminal event.
pub(crate) struct Exchange {
    collector: Collector,
    recorder: Recorder,
    instrument: Instrument,
    head: Mutex<Option<(StatusCode, HeaderMap)>>,
    completer: Mutex<Option<Completer<Response>>>,
}

impl Exchange {
    pub(crate) fn new(method: Method, opts: &RequestOptions, completer: Completer<Response>) -> Self {
        let collector = Collector::new(opts.get_max_response_bytes(), opts.is_truncate_on_limit())
            .head(method == Method::Head);

        Self {
            collector,
            recorder: Recorder::new(),
            instrument: opts.get_instrument(),
            head: Mutex::new(None),
            completer: Mutex::new(Some(completer)),
        }
    }

    fn response(&self, truncated: bool) -> Result<Response, Error> {
        let head = self.head.lock().unwrap_or_else(PoisonError::into_inner).take();

        // transport reported success without ever delivering a response head.
        let Some((status, headers)) = head else {
            return Err(Error::Interrupted);
        };

        let mut builder = ResponseBuilder::new(status.as_u16());

        for (name, value) in headers.iter() {
            let value = String::from_utf8_lossy(value.as_bytes());
            if name == SET_COOKIE {
                if let Some(cookie) = Cookie::parse_set_cookie(&value) {
                    builder.cookie(cookie);
                }
            }
            builder.header(name.as_str(), value.into_owned());
        }

        builder.body(self.collector.content());

        match self.instrument {
            Instrument::Stats => {
                builder.stats(self.recorder.stats());
            }
            Instrument::Timing => {
                builder.timing(self.recorder.timing());
            }
            Instrument::None => {}
        }

        if truncated {
            builder.attribute(TRUNCATED, true);
        }

        Ok(builder.create())
    }
}

impl Listener for Exchange {
    fn on_queued(&self) {
        self.recorder.queued();
    }

    fn on_request_begin(&self) {
        self.recorder.request_begin();
    }

    fn on_request_headers(&self, headers: &HeaderMap) {
        self.recorder.request_headers(headers);
    }

    fn on_request_content(&self, chunk: &[u8]) {
        self.recorder.request_content(chunk.len());
    }

    fn on_request_success(&self) {
        self.recorder.request_complete();
    }

    fn on_request_failure(&self, err: &Failure) {
        trace!("request failed: {err}");
        self.recorder.request_complete();
    }

    fn on_response_begin(&self, _: StatusCode) {
        self.recorder.response_begin();
    }

    fn on_response_header(&self, _: &HeaderName, _: &HeaderValue) {
        self.recorder.response_header();
    }

    fn on_response_headers(&self, head: &http::Response<()>) -> Result<(), Abort> {
        self.recorder.response_headers(head.headers());

        *self.head.lock().unwrap_or_else(PoisonError::into_inner) = Some((head.status(), head.headers().clone()));

        let declared = head
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        self.collector.check_content_length(declared)
    }

    fn on_response_content(&self, chunk: &[u8]) -> Result<(), Abort> {
        match self.collector.on_content(chunk) {
            Ok(accepted) => {
                self.recorder.response_content(accepted);
                Ok(())
            }
            Err(overflow) => {
                self.recorder.response_content(overflow.accepted);
                Err(overflow.into())
            }
        }
    }

    fn on_response_success(&self) {
        self.recorder.response_complete();
    }

    fn on_response_failure(&self, err: &Failure) {
        trace!("response failed: {err}");
        self.recorder.response_complete();
    }

    fn on_complete(&self, result: Result<(), Failure>) {
        self.recorder.response_complete_if_unset();

        let Some(completer) = self.completer.lock().unwrap_or_else(PoisonError::into_inner).take() else {
            return;
        };

        // an overflow seen by collector decides the outcome whatever the transport reports.
        let res = if self.collector.is_overflowed() {
            let limit = self.collector.max_length();
            if self.collector.truncate_on_limit() {
                debug!("response truncated at {limit} bytes");
                self.response(true)
            } else {
                Err(Error::CapacityExceeded(CapacityExceeded { limit }))
            }
        } else {
            match result {
                Ok(()) => self.response(false),
                Err(Failure::Aborted(Abort::CapacityReached { limit })) => {
                    Err(Error::CapacityExceeded(CapacityExceeded { limit }))
                }
                Err(Failure::Transport(e)) => {
                    debug!("exchange failed: {e}");
                    Err(Error::Transport(e))
                }
            }
        };

        completer.complete(res);
    }
}
