use core::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use std::time::Instant;

use http::HeaderMap;

use super::{stats::Stats, timing::Timing};

/// lock free recorder of exchange milestones and size counters.
///
/// every method takes `&self` and can be called from any thread the transport delivers events on.
pub struct Recorder {
    epoch: Instant,
    queued: Tick,
    request_begin: Tick,
    request_complete: Tick,
    response_status: Tick,
    first_header: Tick,
    last_header: Tick,
    first_content: Tick,
    response_complete: Tick,
    request_header_count: AtomicU64,
    request_header_size: AtomicU64,
    request_chunk_count: AtomicU64,
    request_body_size: AtomicU64,
    response_header_count: AtomicU64,
    response_header_size: AtomicU64,
    response_chunk_count: AtomicU64,
    response_body_size: AtomicU64,
}

// nanoseconds since recorder epoch plus one. zero is an unset tick.
struct Tick(AtomicU64);

impl Tick {
    const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    fn stamp(&self, now: u64) {
        self.0.store(now, Ordering::Release);
    }

    // first writer wins.
    fn stamp_once(&self, now: u64) {
        let _ = self.0.compare_exchange(0, now, Ordering::AcqRel, Ordering::Acquire);
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            queued: Tick::new(),
            request_begin: Tick::new(),
            request_complete: Tick::new(),
            response_status: Tick::new(),
            first_header: Tick::new(),
            last_header: Tick::new(),
            first_content: Tick::new(),
            response_complete: Tick::new(),
            request_header_count: AtomicU64::new(0),
            request_header_size: AtomicU64::new(0),
            request_chunk_count: AtomicU64::new(0),
            request_body_size: AtomicU64::new(0),
            response_header_count: AtomicU64::new(0),
            response_header_size: AtomicU64::new(0),
            response_chunk_count: AtomicU64::new(0),
            response_body_size: AtomicU64::new(0),
        }
    }

    fn now(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos())
            .unwrap_or(u64::MAX - 1)
            .saturating_add(1)
    }

    pub fn queued(&self) {
        self.queued.stamp(self.now());
    }

    pub fn request_begin(&self) {
        self.request_begin.stamp(self.now());
    }

    pub fn request_headers(&self, headers: &HeaderMap) {
        self.request_header_count.store(headers.len() as u64, Ordering::Relaxed);
        self.request_header_size.store(header_size(headers), Ordering::Relaxed);
    }

    pub fn request_content(&self, len: usize) {
        self.request_chunk_count.fetch_add(1, Ordering::Relaxed);
        self.request_body_size.fetch_add(len as u64, Ordering::Relaxed);
    }

    /// request fully sent or failed.
    pub fn request_complete(&self) {
        self.request_complete.stamp(self.now());
    }

    pub fn response_begin(&self) {
        self.response_status.stamp(self.now());
    }

    pub fn response_header(&self) {
        self.first_header.stamp_once(self.now());
    }

    pub fn response_headers(&self, headers: &HeaderMap) {
        self.last_header.stamp(self.now());
        self.response_header_count.store(headers.len() as u64, Ordering::Relaxed);
        self.response_header_size.store(header_size(headers), Ordering::Relaxed);
    }

    /// a response chunk was delivered and `accepted` bytes of it went into the body.
    pub fn response_content(&self, accepted: usize) {
        self.response_chunk_count.fetch_add(1, Ordering::Relaxed);
        self.response_body_size.fetch_add(accepted as u64, Ordering::Relaxed);
        self.first_content.stamp_once(self.now());
    }

    /// response fully received or failed.
    pub fn response_complete(&self) {
        self.response_complete.stamp(self.now());
    }

    /// stamp response completion only when no success or failure did it before.
    pub fn response_complete_if_unset(&self) {
        self.response_complete.stamp_once(self.now());
    }

    pub fn timing(&self) -> Timing {
        let queued = self.queued.get();
        let since = |tick: &Tick| match (queued, tick.get()) {
            (0, _) | (_, 0) => Duration::ZERO,
            (queued, tick) => Duration::from_nanos(tick.saturating_sub(queued)),
        };

        Timing {
            request_start: since(&self.request_begin),
            request_complete: since(&self.request_complete),
            response_status: since(&self.response_status),
            first_header: since(&self.first_header),
            last_header: since(&self.last_header),
            first_content: since(&self.first_content),
            response_complete: since(&self.response_complete),
        }
    }

    pub fn stats(&self) -> Stats {
        Stats {
            timing: self.timing(),
            request_header_count: self.request_header_count.load(Ordering::Relaxed),
            request_header_size: self.request_header_size.load(Ordering::Relaxed),
            request_chunk_count: self.request_chunk_count.load(Ordering::Relaxed),
            request_body_size: self.request_body_size.load(Ordering::Relaxed),
            response_header_count: self.response_header_count.load(Ordering::Relaxed),
            response_header_size: self.response_header_size.load(Ordering::Relaxed),
            response_chunk_count: self.response_chunk_count.load(Ordering::Relaxed),
            response_body_size: self.response_body_size.load(Ordering::Relaxed),
        }
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

// name and value character count plus two for the ": " separator.
fn header_size(headers: &HeaderMap) -> u64 {
    headers
        .iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes());
            (name.as_str().chars().count() + 2 + value.chars().count()) as u64
        })
        .sum()
}
