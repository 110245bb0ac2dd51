use simsock_core::error::SocketError;
use simsock_demo::error::DemoError;
use std::fmt::Debug;
use thiserror::Error;

#[derive(Error, Clone)]
pub enum AppError {
    #[error("SocketError -> {0}")]
    SocketError(SocketError),
    #[error("DemoError -> {0}")]
    DemoError(DemoError),
    #[error("config error: {0}")]
    ConfigError(String),
}

impl Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{0}", self)
    }
}

impl From<SocketError> for AppError {
    fn from(value: SocketError) -> Self {
        Self::SocketError(value)
    }
}

impl From<DemoError> for AppError {
    fn from(value: DemoError) -> Self {
        Self::DemoError(value)
    }
}

impl From<dotenvy::Error> for AppError {
    fn from(value: dotenvy::Error) -> Self {
        Self::ConfigError(value.to_string())
    }
}
