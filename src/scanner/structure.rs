use std::time::Duration;

use serde::Serialize;

use crate::config::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT};

/// Bytes taken from the socket in the single read.
pub const BANNER_READ_SIZE: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub address: String,
    pub banner: String,
}

impl ProbeResult {
    pub fn new(address: impl Into<String>, banner: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            banner: banner.into(),
        }
    }

    /// Error banners count; only an empty read is left out of the report.
    pub fn is_reportable(&self) -> bool {
        !self.banner.is_empty()
    }

    pub fn is_error(&self) -> bool {
        self.banner.starts_with("Error:")
    }
}

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub port: u16,
    pub timeout: Duration,
    pub read_size: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            read_size: BANNER_READ_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reportable_banners() {
        assert!(ProbeResult::new("10.0.0.1", "HTTP/1.1 200 OK").is_reportable());
        assert!(!ProbeResult::new("10.0.0.1", "").is_reportable());

        let failure = ProbeResult::new("10.0.0.1", "Error: Connection refused (port likely closed)");
        assert!(failure.is_reportable());
        assert!(failure.is_error());
    }
}
