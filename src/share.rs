//! Snapshot serialization and share tokens.
//!
//! Snapshots are plain serde data. A share token is the compact JSON of a
//! snapshot written as lowercase hex, so it can sit in a URL query without
//! escaping. Decoding a token never fails loudly: anything that is not a
//! valid token yields `None`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{event, Level};

use crate::error::SimError;

/// Serialize a snapshot to JSON.
pub fn to_json<T: Serialize>(snapshot: &T) -> Result<String, SimError> {
    serde_json::to_string(snapshot).map_err(SimError::Serialize)
}

/// Serialize a snapshot to indented JSON.
pub fn to_json_pretty<T: Serialize>(snapshot: &T) -> Result<String, SimError> {
    serde_json::to_string_pretty(snapshot).map_err(SimError::Serialize)
}

/// Deserialize a snapshot from JSON.
pub fn from_json<T: DeserializeOwned>(text: &str) -> Result<T, SimError> {
    serde_json::from_str(text).map_err(SimError::Deserialize)
}

/// Encode a snapshot as a share token.
pub fn encode_share<T: Serialize>(snapshot: &T) -> Result<String, SimError> {
    let json = to_json(snapshot)?;
    let mut token = String::with_capacity(json.len() * 2);
    for byte in json.bytes() {
        token.push(HEX_DIGITS[usize::from(byte >> 4)]);
        token.push(HEX_DIGITS[usize::from(byte & 0xF)]);
    }
    Ok(token)
}

/// Decode a share token. Missing or malformed input yields `None`.
pub fn decode_share<T: DeserializeOwned>(token: &str) -> Option<T> {
    let token = token.trim();
    if token.is_empty() || token.len() % 2 != 0 {
        return None;
    }

    let bytes: Option<Vec<u8>> = token
        .as_bytes()
        .chunks(2)
        .map(|pair| Some(hex_value(pair[0])? << 4 | hex_value(pair[1])?))
        .collect();
    let json = String::from_utf8(bytes?).ok()?;

    match from_json(&json) {
        Ok(value) => Some(value),
        Err(e) => {
            event!(Level::DEBUG, "discarding share token: {}", e);
            None
        }
    }
}

const HEX_DIGITS: [char; 16] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
];

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
