use std::time::Duration;

/// Conservative default applied to every discovery and token request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeouts for the HTTP transport. A request exceeding them fails like any other
/// transport error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HttpConfig {
    pub(crate) timeout: Duration,
    pub(crate) conn_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT,
            conn_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl HttpConfig {
    pub fn new(timeout: Duration, conn_timeout: Duration) -> Self {
        Self {
            timeout,
            conn_timeout,
        }
    }

    /// Uses the same value for the request and the connection timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(timeout, timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn conn_timeout(&self) -> Duration {
        self.conn_timeout
    }
}
