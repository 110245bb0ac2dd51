use crate::DemoLimits;
use crate::error::DemoError;
use crate::payload::{TestPayload, send_message, send_values};
use log::{error, info};
use simsock_core::Endpoint;
use std::thread::sleep;

/// Client half of the demo: sends the payload once per round.
pub struct Transmitter {
    endpoint: Endpoint,
    payload: TestPayload,
    limits: DemoLimits,
}

impl Transmitter {
    pub fn new(endpoint: Endpoint, payload: TestPayload, limits: DemoLimits) -> Self {
        Self {
            endpoint,
            payload,
            limits,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// One round. A failed part abandons the rest of the round so the next
    /// round starts on a frame boundary after the reconnect.
    pub fn transmit_once(&mut self) -> Result<(), DemoError> {
        send_values(&mut self.endpoint, &self.payload.values)?;
        info!("Socket sent values: {:?}", self.payload.values);
        send_message(&mut self.endpoint, &self.payload.message)?;
        info!("Socket sent string: {}", self.payload.message);
        Ok(())
    }

    /// Runs the configured number of rounds and returns how many fully succeeded.
    pub fn transmit_payloads(&mut self) -> usize {
        let mut rounds = 0;
        let mut delivered = 0;
        while self.limits.keep_going(rounds) {
            match self.transmit_once() {
                Ok(()) => delivered += 1,
                Err(e) => error!("Socket failed to send payload: {e}"),
            }
            rounds += 1;
            if self.limits.keep_going(rounds) {
                sleep(self.limits.pause);
            }
        }
        delivered
    }
}
