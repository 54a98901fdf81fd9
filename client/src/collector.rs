use core::fmt;

use std::{
    error,
    mem,
    sync::{Mutex, PoisonError},
};

use bytes::Bytes;
use tracing::{debug, trace};

use super::transport::Abort;

/// bounded in memory accumulator of response content.
///
/// buffer grows to the next power of two of required size, never past the max length. content
/// arriving beyond the limit either fails the exchange or, with truncation enabled, fills the
/// remaining room and ends collection. once the limit is exceeded every later chunk is rejected.
pub struct Collector {
    max_length: usize,
    truncate_on_limit: bool,
    head: bool,
    buf: Mutex<Buf>,
}

#[derive(Default)]
struct Buf {
    bytes: Vec<u8>,
    frozen: Option<Bytes>,
    truncated: bool,
    overflowed: bool,
}

/// chunk did not fit in the remaining capacity of [Collector].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
    /// leading bytes of the chunk that were accepted. non zero only with truncation enabled.
    pub accepted: usize,
    pub limit: usize,
}

impl fmt::Display for Overflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffering capacity {} exceeded", self.limit)
    }
}

impl error::Error for Overflow {}

impl From<Overflow> for Abort {
    fn from(o: Overflow) -> Self {
        Abort::CapacityReached { limit: o.limit }
    }
}

impl Collector {
    pub fn new(max_length: usize, truncate_on_limit: bool) -> Self {
        Self {
            max_length,
            truncate_on_limit,
            head: false,
            buf: Mutex::new(Buf::default()),
        }
    }

    /// collector of a HEAD exchange. declared content length is never checked.
    pub fn head(mut self, head: bool) -> Self {
        self.head = head;
        self
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn truncate_on_limit(&self) -> bool {
        self.truncate_on_limit
    }

    /// fail fast on a declared `Content-Length` larger than the limit.
    ///
    /// skipped with truncation enabled and for HEAD exchanges where the declared length does not
    /// describe any content that follows.
    pub fn check_content_length(&self, declared: Option<u64>) -> Result<(), Abort> {
        if self.truncate_on_limit || self.head {
            return Ok(());
        }
        match declared {
            Some(len) if len > self.max_length as u64 => {
                debug!(target: "tally::collect", "declared content length {len} exceeds limit {}", self.max_length);
                self.buf.lock().unwrap_or_else(PoisonError::into_inner).overflowed = true;
                Err(Abort::CapacityReached { limit: self.max_length })
            }
            _ => Ok(()),
        }
    }

    /// append a chunk of content. return the count of accepted bytes.
    pub fn on_content(&self, chunk: &[u8]) -> Result<usize, Overflow> {
        let mut buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);

        let len = buf.bytes.len();
        let limit = self.max_length;

        if buf.overflowed {
            trace!(target: "tally::collect", "content after overflow rejected");
            return Err(Overflow { accepted: 0, limit });
        }

        let required = match len.checked_add(chunk.len()) {
            Some(required) if required <= limit => required,
            _ => {
                buf.overflowed = true;

                if !self.truncate_on_limit {
                    debug!(target: "tally::collect", "content exceeds limit {limit}");
                    return Err(Overflow { accepted: 0, limit });
                }

                let room = limit - len;
                buf.bytes.reserve_exact(room);
                buf.bytes.extend_from_slice(&chunk[..room]);
                buf.truncated = true;
                debug!(target: "tally::collect", "content truncated at limit {limit}");
                return Err(Overflow { accepted: room, limit });
            }
        };

        if chunk.len() > buf.bytes.capacity() - len {
            let cap = required.checked_next_power_of_two().unwrap_or(limit).min(limit);
            buf.bytes.reserve_exact(cap - len);
            trace!(target: "tally::collect", "buffer grown to {} bytes", buf.bytes.capacity());
        }

        buf.bytes.extend_from_slice(chunk);

        Ok(chunk.len())
    }

    /// content or declared content length went past the limit. truncated or not.
    pub fn is_overflowed(&self) -> bool {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner).overflowed
    }

    /// limit was reached with truncation enabled.
    pub fn is_truncated(&self) -> bool {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner).truncated
    }

    /// accumulated content. empty when nothing was collected.
    pub fn content(&self) -> Bytes {
        let mut buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        if !buf.bytes.is_empty() {
            let bytes = mem::take(&mut buf.bytes);
            match buf.frozen.take() {
                Some(frozen) => {
                    let mut joined = Vec::with_capacity(frozen.len() + bytes.len());
                    joined.extend_from_slice(&frozen);
                    joined.extend_from_slice(&bytes);
                    buf.frozen = Some(Bytes::from(joined));
                }
                None => buf.frozen = Some(Bytes::from(bytes)),
            }
        }
        buf.frozen.clone().unwrap_or_default()
    }
}
