pub mod config;
mod connection;
pub mod endpoint;
pub mod error;
pub mod utils;

pub use config::EndpointConfig;
pub use endpoint::{Endpoint, LinkState, Role, Transport};
pub use error::{SocketError, SocketErrorKind};
pub use utils::{Cancellable, CancellationFlag};
