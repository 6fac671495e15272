//! Reply parsing.
//!
//! Both parsers are total: any byte input yields a value, never a panic.

use crate::error::CodecError;

use super::frame::{EstopState, Position};

const ACK_TOKEN: &str = "ok";
const ERROR_TOKEN: &str = "error";

/// Parse an E-stop query reply.
///
/// A reply containing the `error` token is `Active`, even when `ok` appears
/// as well. A reply containing only `ok` is `Normal`. Anything else,
/// including an empty reply, is `Unknown`.
pub fn parse_estop_reply(bytes: &[u8]) -> EstopState {
    let text = String::from_utf8_lossy(bytes).to_ascii_lowercase();
    let tokens = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty());

    // `error` wins over `ok` wherever they appear; a mixed reply never reads as released
    let mut saw_ack = false;
    for token in tokens {
        if token == ERROR_TOKEN {
            return EstopState::Active;
        }
        if token == ACK_TOKEN {
            saw_ack = true;
        }
    }

    if saw_ack {
        EstopState::Normal
    } else {
        EstopState::Unknown
    }
}

/// Parse a position reply of the form `x,y,z,ok`.
///
/// Returns `None` on any malformed input; callers treat that as "unknown",
/// never as the origin.
pub fn parse_position_reply(bytes: &[u8]) -> Option<Position> {
    try_parse_position_reply(bytes).ok()
}

/// Parse a position reply, reporting why it was rejected.
///
/// # Errors
///
/// Returns [`CodecError::MalformedReply`] describing the first problem found.
pub fn try_parse_position_reply(bytes: &[u8]) -> Result<Position, CodecError> {
    let text = String::from_utf8_lossy(bytes);
    let fields: Vec<&str> = text.trim().split(',').map(str::trim).collect();

    let [x, y, z, ack] = fields.as_slice() else {
        return Err(CodecError::MalformedReply(format!(
            "expected 4 fields, got {}",
            fields.len()
        )));
    };

    if !ack.eq_ignore_ascii_case(ACK_TOKEN) {
        return Err(CodecError::MalformedReply(format!(
            "missing acknowledgement, got {ack:?}"
        )));
    }

    Ok(Position::new(coordinate(x, 'x')?, coordinate(y, 'y')?, coordinate(z, 'z')?))
}

fn coordinate(field: &str, axis: char) -> Result<f64, CodecError> {
    let value: f64 = field
        .parse()
        .map_err(|_| CodecError::MalformedReply(format!("{axis} is not a number: {field:?}")))?;

    if value.is_finite() {
        Ok(value)
    } else {
        Err(CodecError::MalformedReply(format!("{axis} is not finite")))
    }
}
