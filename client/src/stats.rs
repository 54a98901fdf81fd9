use core::{fmt, ops::Deref};

use super::timing::Timing;

/// [Timing] of an exchange with size and chunk counters of both directions.
///
/// snapshot taken when the exchange completes. dereference to [Timing] for durations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub(crate) timing: Timing,
    pub(crate) request_header_count: u64,
    pub(crate) request_header_size: u64,
    pub(crate) request_chunk_count: u64,
    pub(crate) request_body_size: u64,
    pub(crate) response_header_count: u64,
    pub(crate) response_header_size: u64,
    pub(crate) response_chunk_count: u64,
    pub(crate) response_body_size: u64,
}

impl Stats {
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn request_header_count(&self) -> u64 {
        self.request_header_count
    }

    /// approximate size of request headers. name and value lengths plus two per header.
    pub fn request_header_size(&self) -> u64 {
        self.request_header_size
    }

    pub fn request_chunk_count(&self) -> u64 {
        self.request_chunk_count
    }

    pub fn request_body_size(&self) -> u64 {
        self.request_body_size
    }

    pub fn response_header_count(&self) -> u64 {
        self.response_header_count
    }

    /// approximate size of response headers. name and value lengths plus two per header.
    pub fn response_header_size(&self) -> u64 {
        self.response_header_size
    }

    pub fn response_chunk_count(&self) -> u64 {
        self.response_chunk_count
    }

    /// bytes of response content accepted into the body.
    pub fn response_body_size(&self) -> u64 {
        self.response_body_size
    }
}

impl Deref for Stats {
    type Target = Timing;

    fn deref(&self) -> &Self::Target {
        &self.timing
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, request headers: {} ({} bytes), request chunks: {} ({} bytes), response headers: {} ({} bytes), response chunks: {} ({} bytes)",
            self.timing,
            self.request_header_count,
            self.request_header_size,
            self.request_chunk_count,
            self.request_body_size,
            self.response_header_count,
            self.response_header_size,
            self.response_chunk_count,
            self.response_body_size,
        )
    }
}
