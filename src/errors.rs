use std::io;
use std::net::AddrParseError;
use std::path::PathBuf;

use thiserror::Error;

/// Reasons a banner probe can fail. Rendered into the banner text as
/// `Error: <description>`, never returned to the coordinator as `Err`.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Connection refused (port likely closed)")]
    ConnectionRefused,
    #[error("Connection timed out (port filtered or host down)")]
    TimedOut,
    #[error("Host unreachable (routing issue)")]
    HostUnreachable,
    #[error("Network unreachable (routing issue)")]
    NetworkUnreachable,
    #[error("Connection reset by peer")]
    ConnectionReset,
    #[error("Permission denied (firewall or privileges)")]
    PermissionDenied,
    #[error("Invalid IP address: {0}")]
    InvalidAddress(#[from] AddrParseError),
    #[error("Network error: {0}")]
    Network(io::Error),
}

impl From<io::Error> for ProbeError {
    fn from(error: io::Error) -> Self {
        classify_network_error(error)
    }
}

/// Map an I/O error onto the probe failure categories.
pub fn classify_network_error(error: io::Error) -> ProbeError {
    match error.kind() {
        io::ErrorKind::ConnectionRefused => ProbeError::ConnectionRefused,
        io::ErrorKind::TimedOut => ProbeError::TimedOut,
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
            ProbeError::ConnectionReset
        }
        io::ErrorKind::PermissionDenied => ProbeError::PermissionDenied,
        io::ErrorKind::HostUnreachable => ProbeError::HostUnreachable,
        io::ErrorKind::NetworkUnreachable | io::ErrorKind::AddrNotAvailable => {
            ProbeError::NetworkUnreachable
        }
        _ => ProbeError::Network(error),
    }
}

/// Failures that abort a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("domain list {} not found", .0.display())]
    InputNotFound(PathBuf),
    #[error("failed to read domain list {}: {source}", .path.display())]
    Input { path: PathBuf, source: io::Error },
    #[error("failed to open output {}: {source}", .path.display())]
    Output { path: PathBuf, source: io::Error },
    #[error("failed to write report: {0}")]
    Write(#[from] io::Error),
    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

impl RunError {
    /// Line printed on the status stream when the run aborts.
    pub fn status_line(&self) -> String {
        match self {
            RunError::InputNotFound(_) => "File not found.".to_string(),
            other => format!("An error occurred: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_network_error() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert!(matches!(
            classify_network_error(refused),
            ProbeError::ConnectionRefused
        ));

        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        assert!(matches!(ProbeError::from(reset), ProbeError::ConnectionReset));

        let other = io::Error::other("boom");
        assert!(matches!(ProbeError::from(other), ProbeError::Network(_)));
    }

    #[test]
    fn test_status_lines() {
        let missing = RunError::InputNotFound(PathBuf::from("domains.txt"));
        assert_eq!(missing.status_line(), "File not found.");

        let write = RunError::Write(io::Error::other("disk full"));
        assert_eq!(
            write.status_line(),
            "An error occurred: failed to write report: disk full"
        );
    }
}
