//! Line framing for the chat channel: one JSON envelope per `\n`-terminated line.

use serde::{Serialize, de::DeserializeOwned};

use crate::error::Result;

/// Serializes an event into a single line, newline included.
pub fn encode_line<T: Serialize>(event: &T) -> Result<String> {
    let mut line = serde_json::to_string(event)?;
    line.push('\n');
    Ok(line)
}

/// Parses one received line. Surrounding whitespace (including the `\r` some
/// terminals send) is ignored.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T> {
    Ok(serde_json::from_str(line.trim())?)
}
