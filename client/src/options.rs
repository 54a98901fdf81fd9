use core::time::Duration;

use std::collections::HashMap;

use tracing::debug;

/// instrumentation attached to a completed [Response](crate::Response).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Instrument {
    None,
    Timing,
    #[default]
    Stats,
}

/// per request options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestOptions {
    max_response_bytes: usize,
    timeout: Duration,
    truncate_on_limit: bool,
    instrument: Instrument,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl RequestOptions {
    pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub const DEFAULT: Self = Self {
        max_response_bytes: Self::DEFAULT_MAX_RESPONSE_BYTES,
        timeout: Self::DEFAULT_TIMEOUT,
        truncate_on_limit: false,
        instrument: Instrument::Stats,
    };

    /// max bytes of response content collected in memory.
    pub const fn max_response_bytes(mut self, max: usize) -> Self {
        self.max_response_bytes = max;
        self
    }

    /// deadline of the exchange. bounds blocking wait and transport request time.
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// complete with content truncated at the limit instead of failing.
    pub const fn truncate_on_limit(mut self) -> Self {
        self.truncate_on_limit = true;
        self
    }

    pub const fn set_truncate_on_limit(mut self, truncate: bool) -> Self {
        self.truncate_on_limit = truncate;
        self
    }

    pub const fn instrument(mut self, instrument: Instrument) -> Self {
        self.instrument = instrument;
        self
    }

    pub const fn get_max_response_bytes(&self) -> usize {
        self.max_response_bytes
    }

    pub const fn get_timeout(&self) -> Duration {
        self.timeout
    }

    pub const fn is_truncate_on_limit(&self) -> bool {
        self.truncate_on_limit
    }

    pub const fn get_instrument(&self) -> Instrument {
        self.instrument
    }
}

/// per client options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientOptions {
    pub(crate) user_agent: String,
    pub(crate) connect_timeout: Duration,
    pub(crate) request_timeout: Duration,
    pub(crate) request_buffer_size: usize,
    pub(crate) response_buffer_size: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            user_agent: String::from(Self::DEFAULT_USER_AGENT),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            request_buffer_size: 4096,
            response_buffer_size: 16384,
        }
    }
}

impl ClientOptions {
    pub const DEFAULT_USER_AGENT: &'static str = "tally/0.1";

    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder {
            options: Self::default(),
        }
    }

    /// load options from a string property map. every key is looked up as `{prefix}{name}`.
    ///
    /// recognized names are `userAgent`, `connectionTimeout`, `requestTimeout`,
    /// `requestBufferSize` and `responseBufferSize`. time values accept `ms`, `s`, `m` and `h`
    /// suffix where a bare number is milliseconds. missing and unparsable values fall back to
    /// default.
    pub fn from_properties(prefix: &str, props: &HashMap<String, String>) -> Self {
        let mut opts = Self::default();

        let get = |name: &str| props.get(&format!("{prefix}{name}")).map(|v| v.trim());

        if let Some(agent) = get("userAgent") {
            opts.user_agent = agent.to_owned();
        }

        let time = |name: &str, default: Duration| match get(name) {
            Some(val) => parse_time(val).unwrap_or_else(|| {
                debug!("invalid time value {val:?} of property {prefix}{name}. fallback to default");
                default
            }),
            None => default,
        };

        opts.connect_timeout = time("connectionTimeout", opts.connect_timeout);
        opts.request_timeout = time("requestTimeout", opts.request_timeout);

        let size = |name: &str, default: usize| match get(name) {
            Some(val) => val.parse().unwrap_or_else(|_| {
                debug!("invalid size value {val:?} of property {prefix}{name}. fallback to default");
                default
            }),
            None => default,
        };

        opts.request_buffer_size = size("requestBufferSize", opts.request_buffer_size);
        opts.response_buffer_size = size("responseBufferSize", opts.response_buffer_size);

        opts
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn request_buffer_size(&self) -> usize {
        self.request_buffer_size
    }

    pub fn response_buffer_size(&self) -> usize {
        self.response_buffer_size
    }
}

/// builder type for [ClientOptions].
#[derive(Clone, Debug)]
pub struct ClientOptionsBuilder {
    options: ClientOptions,
}

impl ClientOptionsBuilder {
    /// user agent sent when a request does not carry its own. empty string disables it.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.options.user_agent = agent.into();
        self
    }

    pub fn connect_timeout(mut self, dur: Duration) -> Self {
        self.options.connect_timeout = dur;
        self
    }

    /// upper bound of request time applied by transport regardless of per request timeout.
    pub fn request_timeout(mut self, dur: Duration) -> Self {
        self.options.request_timeout = dur;
        self
    }

    pub fn request_buffer_size(mut self, size: usize) -> Self {
        self.options.request_buffer_size = size;
        self
    }

    pub fn response_buffer_size(mut self, size: usize) -> Self {
        self.options.response_buffer_size = size;
        self
    }

    pub fn finish(self) -> ClientOptions {
        self.options
    }
}

// time string to duration. bare number is milliseconds.
fn parse_time(val: &str) -> Option<Duration> {
    let idx = val.find(|c: char| !c.is_ascii_digit()).unwrap_or(val.len());
    let (num, unit) = val.split_at(idx);
    let num = num.parse::<u64>().ok()?;
    let dur = match unit.trim() {
        "" | "ms" => Duration::from_millis(num),
        "s" => Duration::from_secs(num),
        "m" => Duration::from_secs(num.checked_mul(60)?),
        "h" => Duration::from_secs(num.checked_mul(3600)?),
        _ => return None,
    };
    Some(dur)
}
