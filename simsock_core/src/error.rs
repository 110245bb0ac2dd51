use std::error::Error;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SocketErrorKind {
    #[error("Socket allocation error")]
    AllocationError,
    #[error("Bind error")]
    BindError,
    #[error("Host resolution error")]
    ResolutionError,
    #[error("Listen/accept error")]
    ListenAcceptError,
    #[error("Connect error")]
    ConnectError,
    #[error("Transfer error")]
    TransferError,
    #[error("Missing datagram destination")]
    MissingDestination,
    #[error("Reconnect cancelled")]
    Cancelled,
    #[error("Reconnect retries exhausted")]
    RetryExhausted,
    #[error("Unsupported operation")]
    UnsupportedOperation,
    #[error("Parse error")]
    ParseError,
}

#[derive(Debug, Clone)]
pub struct SocketError {
    pub error_kind: SocketErrorKind,
    pub message: String,
}

impl Display for SocketError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Socket Error: {}: {}", self.error_kind, self.message)
    }
}

impl Error for SocketError {}

impl SocketError {
    pub fn new(error_kind: SocketErrorKind, message: &str) -> Self {
        Self {
            error_kind,
            message: message.to_owned(),
        }
    }

    /// Wraps an OS error under the given kind, keeping its text as the message.
    pub fn from_io(error_kind: SocketErrorKind, err: std::io::Error) -> Self {
        Self::new(error_kind, err.to_string().as_str())
    }

    /// Construction-time failures; an endpoint that hit one of these was never built.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.error_kind,
            SocketErrorKind::AllocationError
                | SocketErrorKind::BindError
                | SocketErrorKind::ResolutionError
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_contains_kind_and_message() {
        let err = SocketError::new(SocketErrorKind::BindError, "port 9000 in use");
        assert_eq!(
            err.to_string(),
            "Socket Error: Bind error: port 9000 in use"
        );
    }

    #[test]
    fn construction_kinds_are_fatal() {
        assert!(SocketError::new(SocketErrorKind::AllocationError, "").is_fatal());
        assert!(SocketError::new(SocketErrorKind::ResolutionError, "").is_fatal());
        assert!(!SocketError::new(SocketErrorKind::TransferError, "").is_fatal());
        assert!(!SocketError::new(SocketErrorKind::ConnectError, "").is_fatal());
    }

    #[test]
    fn io_error_keeps_the_given_kind() {
        let err = SocketError::from_io(
            SocketErrorKind::TransferError,
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe"),
        );
        assert_eq!(err.error_kind, SocketErrorKind::TransferError);
        assert_eq!(err.message, "pipe");
    }
}
