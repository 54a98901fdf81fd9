use core::{fmt, time::Duration};

/// milestones of an exchange measured from the moment it's queued.
///
/// a milestone never reached is reported as zero. clock skew never produces a negative value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timing {
    pub(crate) request_start: Duration,
    pub(crate) request_complete: Duration,
    pub(crate) response_status: Duration,
    pub(crate) first_header: Duration,
    pub(crate) last_header: Duration,
    pub(crate) first_content: Duration,
    pub(crate) response_complete: Duration,
}

impl Timing {
    /// time from queued until the request begins transmission.
    pub fn time_to_request_start(&self) -> Duration {
        self.request_start
    }

    /// time from queued until the request is fully sent.
    pub fn time_to_request_complete(&self) -> Duration {
        self.request_complete
    }

    /// time from queued until the response status line is received.
    pub fn time_to_response_status(&self) -> Duration {
        self.response_status
    }

    pub fn time_to_first_header(&self) -> Duration {
        self.first_header
    }

    pub fn time_to_last_header(&self) -> Duration {
        self.last_header
    }

    pub fn time_to_first_content(&self) -> Duration {
        self.first_content
    }

    /// time from queued until the response is complete.
    pub fn time_to_response_complete(&self) -> Duration {
        self.response_complete
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "request start: {}us, request complete: {}us, response status: {}us, first header: {}us, last header: {}us, first content: {}us, response complete: {}us",
            self.request_start.as_micros(),
            self.request_complete.as_micros(),
            self.response_status.as_micros(),
            self.first_header.as_micros(),
            self.last_header.as_micros(),
            self.first_content.as_micros(),
            self.response_complete.as_micros(),
        )
    }
}
