use std::time::Duration;

/// Default deadline for receiving each chunk of a request.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for writing a response.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum size of a complete HTTP request we will buffer before rejecting it (8 MiB).
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

/// Transport settings for [`Server`](super::Server).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use quimby::server::ServerConfig;
///
/// let config = ServerConfig::default()
///     .read_timeout(Duration::from_secs(2))
///     .max_request_size(64 * 1024);
/// assert_eq!(config.write_timeout_value(), Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    read_timeout: Duration,
    write_timeout: Duration,
    max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Requests larger than this (head plus body) are answered with 413.
    #[must_use]
    pub fn max_request_size(mut self, bytes: usize) -> Self {
        self.max_request_size = bytes;
        self
    }

    pub fn read_timeout_value(&self) -> Duration {
        self.read_timeout
    }

    pub fn write_timeout_value(&self) -> Duration {
        self.write_timeout
    }

    pub fn max_request_size_value(&self) -> usize {
        self.max_request_size
    }
}
