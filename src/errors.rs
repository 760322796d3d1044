//! Server-side error hierarchy.
//!
//! Errors are grouped by operational concern: infrastructure failures,
//! configuration problems, and unrecoverable conditions. Request-level
//! signalling (NOT_FOUND and friends) is expressed as `tonic::Status` at
//! the service boundary, not here; lock contention is resolved by waiting
//! and never surfaces as an error.

use std::net::AddrParseError;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (network, I/O)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// gRPC transport setup or serve-loop failures
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Malformed listen address in configuration
    #[error("Invalid listen address: {0}")]
    InvalidListenAddress(#[from] AddrParseError),

    /// Shutdown signal receiver dropped before the signal fired
    #[error("Shutdown signal channel closed: {0}")]
    SignalChannelClosed(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::System(SystemError::Io(e))
    }
}

impl From<tonic::transport::Error> for Error {
    fn from(e: tonic::transport::Error) -> Self {
        Error::System(SystemError::Transport(e))
    }
}

impl From<AddrParseError> for Error {
    fn from(e: AddrParseError) -> Self {
        Error::System(SystemError::InvalidListenAddress(e))
    }
}

#[cfg(test)]
mod errors_test {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: Error = io.into();
        assert!(matches!(err, Error::System(SystemError::Io(_))));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_addr_parse_error_conversion() {
        let parse_err = "not-an-addr".parse::<std::net::SocketAddr>().unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(
            err,
            Error::System(SystemError::InvalidListenAddress(_))
        ));
    }

    #[test]
    fn test_fatal_display() {
        let err = Error::Fatal("cannot continue".into());
        assert_eq!(err.to_string(), "Fatal error: cannot continue");
    }
}
