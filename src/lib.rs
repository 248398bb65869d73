//! # redlist
//!
//! Purpose: Provide a lightweight, synchronous client for the Redis list
//! family with connection pooling to minimize TCP handshake overhead.
//!
//! ## Design Principles
//! 1. **One Round Trip Per Call**: Every operation sends one request and
//!    reads one reply; no pipelining, no hidden retries.
//! 2. **Three-Way Outcomes**: Failure, value, and honest absence are kept
//!    apart: `Err(_)`, `Ok(Some(_))`, `Ok(None)`.
//! 3. **Object Pool Pattern**: Reuse TCP connections to avoid repeated
//!    connects.
//! 4. **Minimal Allocation**: Reuse buffers for RESP framing and parsing;
//!    payloads travel as [`bytes::Bytes`].
//!
//! ## Example
//!
//! ```no_run
//! use redlist::ListClient;
//!
//! fn main() -> redlist::ClientResult<()> {
//!     let client = ListClient::connect("127.0.0.1:6379")?;
//!     client.rpush(b"jobs", &["build", "test", "ship"])?;
//!     while let Some(job) = client.lpop(b"jobs")? {
//!         println!("next: {}", String::from_utf8_lossy(&job));
//!     }
//!     Ok(())
//! }
//! ```

mod command;
mod conn;
mod error;
mod list;
mod reply;
mod resp;

pub use error::{ClientError, ClientResult};
pub use list::{ClientConfig, ListClient};
