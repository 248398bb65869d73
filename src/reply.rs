//! # Reply Interpretation
//!
//! Purpose: Convert raw RESP replies into the typed outcomes operations
//! return, enforcing a strict three-way split: failure, success with a
//! value, and success with nothing there.
//!
//! ## Design Principles
//! 1. **Shape Checks Are Strict**: Each operation expects exactly one reply
//!    shape; anything else is `UnexpectedResponse`, never a silent default.
//! 2. **Server Errors Pass Through**: `-ERR ...` text reaches the caller
//!    verbatim inside [`ClientError::Server`].
//! 3. **Absent Maps To `None`**: Null bulks and null arrays become `None`
//!    (or an empty list for range reads), so honest emptiness never looks
//!    like a fault.

use bytes::Bytes;

use crate::error::{ClientError, ClientResult};
use crate::resp::RespValue;

/// Extracts a signed integer reply (lengths, push counts, removal counts).
pub fn integer(reply: RespValue) -> ClientResult<i64> {
    match reply {
        RespValue::Integer(value) => Ok(value),
        RespValue::Error(message) => Err(ClientError::Server { message }),
        _ => Err(ClientError::UnexpectedResponse),
    }
}

/// Accepts only the canonical `OK` acknowledgment status.
pub fn status_ok(reply: RespValue) -> ClientResult<()> {
    match reply {
        RespValue::Simple(status) if status.eq_ignore_ascii_case(b"OK") => Ok(()),
        RespValue::Error(message) => Err(ClientError::Server { message }),
        _ => Err(ClientError::UnexpectedResponse),
    }
}

/// Bulk payload or `None` when the server had nothing to return.
pub fn bulk(reply: RespValue) -> ClientResult<Option<Bytes>> {
    match reply {
        RespValue::Bulk(data) => Ok(data),
        RespValue::Error(message) => Err(ClientError::Server { message }),
        _ => Err(ClientError::UnexpectedResponse),
    }
}

/// Array of bulk payloads, in server order. A null array counts as empty.
pub fn bulk_values(reply: RespValue) -> ClientResult<Vec<Bytes>> {
    let items = match reply {
        RespValue::Array(Some(items)) => items,
        RespValue::Array(None) => return Ok(Vec::new()),
        RespValue::Error(message) => return Err(ClientError::Server { message }),
        _ => return Err(ClientError::UnexpectedResponse),
    };

    let mut values = Vec::with_capacity(items.len());
    for item in items {
        match item {
            RespValue::Bulk(Some(data)) => values.push(data),
            _ => return Err(ClientError::UnexpectedResponse),
        }
    }
    Ok(values)
}

/// Element moved by a blocking single-element transfer, or `None` when the
/// wait timed out. Timeouts arrive as a null array on the wire, unlike the
/// null bulk an immediate miss produces, and both mean nothing moved.
pub fn moved_value(reply: RespValue) -> ClientResult<Option<Bytes>> {
    match reply {
        RespValue::Bulk(data) => Ok(data),
        RespValue::Array(None) => Ok(None),
        RespValue::Error(message) => Err(ClientError::Server { message }),
        _ => Err(ClientError::UnexpectedResponse),
    }
}

/// Two-element `[key, value]` array from a blocking pop. A null array means
/// the wait timed out with every watched list still empty.
pub fn entry_pair(reply: RespValue) -> ClientResult<Option<(Bytes, Bytes)>> {
    let items = match reply {
        RespValue::Array(Some(items)) => items,
        RespValue::Array(None) => return Ok(None),
        RespValue::Error(message) => return Err(ClientError::Server { message }),
        _ => return Err(ClientError::UnexpectedResponse),
    };

    let mut items = items.into_iter();
    match (items.next(), items.next(), items.next()) {
        (Some(RespValue::Bulk(Some(key))), Some(RespValue::Bulk(Some(value))), None) => {
            Ok(Some((key, value)))
        }
        _ => Err(ClientError::UnexpectedResponse),
    }
}
