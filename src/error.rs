//! # Client Errors
//!
//! Purpose: Define the single failure taxonomy shared by every operation,
//! keeping "the value is absent" out of the error channel entirely.
//!
//! ## Design Principles
//! 1. **Absence Is Not Failure**: A missing key or empty list surfaces as
//!    `Ok(None)` / `Ok(0)` from the calling operation, never as an error.
//! 2. **Uniform Surface**: Transport, framing, and server-reported faults
//!    share one enum so callers write a single recovery path.

use thiserror::Error;

/// Result type for the client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or IO failure while connecting, reading, or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// RESP2 framing or parse error on the reply stream.
    #[error("protocol error")]
    Protocol,

    /// Server returned an error reply.
    #[error("server error: {}", String::from_utf8_lossy(.message))]
    Server { message: Vec<u8> },

    /// Reply shape did not match what the issued command expects.
    #[error("unexpected response")]
    UnexpectedResponse,

    /// Pool is at capacity and no idle connections are available.
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// Address could not be parsed into a socket address.
    #[error("invalid address")]
    InvalidAddress,
}
