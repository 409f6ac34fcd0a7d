use std::path::PathBuf;
use std::time::Duration;

use crate::output::OutputFormat;

pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 5;
pub const DEFAULT_OUTPUT: &str = "output.txt";

/// Everything a run needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub domain_file: PathBuf,
    pub output: PathBuf,
    pub workers: usize,
    pub port: u16,
    pub connect_timeout: Duration,
    pub format: OutputFormat,
}

impl RunConfig {
    pub fn new(domain_file: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            domain_file: domain_file.into(),
            output: output.into(),
            workers: DEFAULT_WORKERS,
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            format: OutputFormat::Text,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Pool size actually used; a zero from the command line still runs one worker.
    pub fn pool_size(&self) -> usize {
        self.workers.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::new("domains.txt", DEFAULT_OUTPUT);
        assert_eq!(config.workers, 10);
        assert_eq!(config.port, 80);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.output, PathBuf::from("output.txt"));
    }

    #[test]
    fn test_pool_size_never_zero() {
        let config = RunConfig::new("domains.txt", DEFAULT_OUTPUT).with_workers(0);
        assert_eq!(config.pool_size(), 1);
    }
}
