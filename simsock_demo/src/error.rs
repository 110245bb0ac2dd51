use simsock_core::error::SocketError;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DemoErrorKind {
    SocketError(SocketError),
    InvalidFrame,
}

impl Display for DemoErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DemoErrorKind::SocketError(err) => Display::fmt(&err, f),
            DemoErrorKind::InvalidFrame => write!(f, "Invalid frame"),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub struct DemoError {
    pub error_kind: DemoErrorKind,
    pub message: String,
}

impl Display for DemoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            return write!(f, "DemoError: {}", self.error_kind);
        }
        write!(f, "DemoError: {}: {}", self.error_kind, self.message)
    }
}

impl DemoError {
    pub fn new(error_kind: DemoErrorKind, message: &str) -> Self {
        Self {
            error_kind,
            message: message.to_owned(),
        }
    }

    pub fn invalid_frame(message: &str) -> Self {
        Self::new(DemoErrorKind::InvalidFrame, message)
    }
}

impl From<SocketError> for DemoError {
    fn from(value: SocketError) -> Self {
        Self::new(DemoErrorKind::SocketError(value), "")
    }
}
