//! Framing for the demo payload.
//!
//! Each part travels as a 4-byte little-endian `i32` length followed by the
//! data: first the element count and the values (4 bytes each), then the byte
//! length and the UTF-8 message. Every length and every body is its own
//! `send`, so over UDP each one is its own datagram.
use crate::error::DemoError;
use bytes::{Buf, BufMut, BytesMut};
use simsock_core::Endpoint;

/// Upper bound on a decoded length, guards the receive buffer allocation.
pub const MAX_FRAME_LEN: usize = 1 << 20;

const LEN_SIZE: usize = size_of::<i32>();
const VALUE_SIZE: usize = size_of::<i32>();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPayload {
    pub values: Vec<i32>,
    pub message: String,
}

impl Default for TestPayload {
    fn default() -> Self {
        Self {
            values: vec![8, 6, 7, 5, 3, 0, 9],
            message: "Hello World!".to_owned(),
        }
    }
}

pub fn encode_len(len: usize) -> Result<[u8; LEN_SIZE], DemoError> {
    if len > MAX_FRAME_LEN {
        return Err(DemoError::invalid_frame(
            format!("length {len} exceeds {MAX_FRAME_LEN}").as_str(),
        ));
    }
    Ok((len as i32).to_le_bytes())
}

pub fn decode_len(bytes: [u8; LEN_SIZE]) -> Result<usize, DemoError> {
    let len = i32::from_le_bytes(bytes);
    if len < 0 || len as usize > MAX_FRAME_LEN {
        return Err(DemoError::invalid_frame(
            format!("length {len} out of range").as_str(),
        ));
    }
    Ok(len as usize)
}

pub fn encode_values(values: &[i32]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(values.len() * VALUE_SIZE);
    for value in values {
        buf.put_i32_le(*value);
    }
    buf
}

pub fn decode_values(mut bytes: &[u8]) -> Vec<i32> {
    let mut values = Vec::with_capacity(bytes.len() / VALUE_SIZE);
    while bytes.remaining() >= VALUE_SIZE {
        values.push(bytes.get_i32_le());
    }
    values
}

pub fn send_values(endpoint: &mut Endpoint, values: &[i32]) -> Result<(), DemoError> {
    endpoint.send_all(&encode_len(values.len())?)?;
    let body = encode_values(values);
    endpoint.send_all(&body)?;
    Ok(())
}

pub fn send_message(endpoint: &mut Endpoint, message: &str) -> Result<(), DemoError> {
    endpoint.send_all(&encode_len(message.len())?)?;
    endpoint.send_all(message.as_bytes())?;
    Ok(())
}

fn recv_len(endpoint: &mut Endpoint) -> Result<usize, DemoError> {
    let mut len = [0u8; LEN_SIZE];
    endpoint.recv_exact(&mut len)?;
    decode_len(len)
}

pub fn recv_values(endpoint: &mut Endpoint) -> Result<Vec<i32>, DemoError> {
    let count = recv_len(endpoint)?;
    let byte_len = count
        .checked_mul(VALUE_SIZE)
        .filter(|n| *n <= MAX_FRAME_LEN)
        .ok_or_else(|| {
            DemoError::invalid_frame(format!("{count} values do not fit a frame").as_str())
        })?;
    let mut body = vec![0u8; byte_len];
    endpoint.recv_exact(&mut body)?;
    Ok(decode_values(&body))
}

pub fn recv_message(endpoint: &mut Endpoint) -> Result<String, DemoError> {
    let len = recv_len(endpoint)?;
    let mut body = vec![0u8; len];
    endpoint.recv_exact(&mut body)?;
    String::from_utf8(body)
        .map_err(|e| DemoError::invalid_frame(format!("message is not UTF-8: {e}").as_str()))
}

pub fn send_payload(endpoint: &mut Endpoint, payload: &TestPayload) -> Result<(), DemoError> {
    send_values(endpoint, &payload.values)?;
    send_message(endpoint, &payload.message)
}

pub fn recv_payload(endpoint: &mut Endpoint) -> Result<TestPayload, DemoError> {
    let values = recv_values(endpoint)?;
    let message = recv_message(endpoint)?;
    Ok(TestPayload { values, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DemoErrorKind;

    #[test]
    fn default_payload_matches_the_demo_data() {
        let payload = TestPayload::default();
        assert_eq!(payload.values, [8, 6, 7, 5, 3, 0, 9]);
        assert_eq!(payload.message.len(), 12);
    }

    #[test]
    fn values_are_little_endian_i32() {
        let encoded = encode_values(&[8, -1]);
        assert_eq!(&encoded[..], &[8u8, 0, 0, 0, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(decode_values(&encoded), vec![8, -1]);
    }

    #[test]
    fn seven_values_take_28_bytes() {
        assert_eq!(encode_values(&TestPayload::default().values).len(), 28);
        assert_eq!(encode_len(7).unwrap(), [7, 0, 0, 0]);
    }

    #[test]
    fn trailing_partial_value_is_ignored() {
        assert_eq!(decode_values(&[1, 0, 0, 0, 2, 0]), vec![1]);
    }

    #[test]
    fn negative_length_is_rejected() {
        let err = decode_len((-1i32).to_le_bytes()).unwrap_err();
        assert!(matches!(err.error_kind, DemoErrorKind::InvalidFrame));
    }

    #[test]
    fn oversized_length_is_rejected() {
        assert!(decode_len(((MAX_FRAME_LEN + 1) as i32).to_le_bytes()).is_err());
        assert!(encode_len(MAX_FRAME_LEN + 1).is_err());
        assert_eq!(decode_len((MAX_FRAME_LEN as i32).to_le_bytes()).unwrap(), MAX_FRAME_LEN);
    }
}
