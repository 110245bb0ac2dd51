use crate::DemoLimits;
use crate::error::{DemoError, DemoErrorKind};
use crate::payload::{TestPayload, recv_message, recv_values};
use log::{error, info};
use simsock_core::Endpoint;
use std::thread::sleep;

/// Host half of the demo: reads one payload per round.
pub struct Listener {
    endpoint: Endpoint,
    limits: DemoLimits,
}

impl Listener {
    pub fn new(endpoint: Endpoint, limits: DemoLimits) -> Self {
        Self { endpoint, limits }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn receive_once(&mut self) -> Result<TestPayload, DemoError> {
        let values = recv_values(&mut self.endpoint)?;
        info!("Socket recv values: {values:?}");
        let message = recv_message(&mut self.endpoint)?;
        info!("Socket recv string: {message}");
        Ok(TestPayload { values, message })
    }

    /// Runs the configured number of rounds, handing every intact payload to
    /// `on_payload`, and returns how many arrived. Failed rounds are logged and
    /// skipped; a malformed frame drops the connection so the stream resyncs.
    pub fn receive_payloads(&mut self, mut on_payload: impl FnMut(TestPayload)) -> usize {
        let mut rounds = 0;
        let mut received = 0;
        while self.limits.keep_going(rounds) {
            match self.receive_once() {
                Ok(payload) => {
                    received += 1;
                    on_payload(payload);
                }
                Err(e) => {
                    error!("Socket failed to recv payload: {e}");
                    if matches!(e.error_kind, DemoErrorKind::InvalidFrame) {
                        self.endpoint.disconnect();
                    }
                }
            }
            rounds += 1;
            if self.limits.keep_going(rounds) {
                sleep(self.limits.pause);
            }
        }
        received
    }
}
