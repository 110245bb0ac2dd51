//! Demo peers exchanging a fixed test payload over a `simsock_core::Endpoint`.
//!
//! The client side ([`transmit::Transmitter`]) repeatedly sends the payload, the
//! host side ([`listen::Listener`]) reads it back and reports what arrived.
use std::time::Duration;

pub mod error;
pub mod listen;
pub mod payload;
pub mod transmit;

pub const DEFAULT_PAUSE: Duration = Duration::from_secs(2);

/// How long a demo loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoLimits {
    /// `None` runs until the process is stopped.
    pub iterations: Option<usize>,
    pub pause: Duration,
}

impl Default for DemoLimits {
    fn default() -> Self {
        Self {
            iterations: None,
            pause: DEFAULT_PAUSE,
        }
    }
}

impl DemoLimits {
    pub(crate) fn keep_going(&self, done: usize) -> bool {
        self.iterations.is_none_or(|max| done < max)
    }
}
