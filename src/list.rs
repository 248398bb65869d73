//! # Synchronous List Client
//!
//! Purpose: Expose a compact, blocking API for the Redis list family, one
//! strict request/reply round trip per call.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `ListClient` hides pooling and protocol details.
//! 2. **Borrow-Friendly API**: Accept `&[u8]` and `AsRef<[u8]>` slices to
//!    avoid unnecessary copies.
//! 3. **Absence Is `None`**: Missing keys, empty lists, and timed-out waits
//!    are ordinary outcomes, not errors.
//! 4. **Server Semantics Pass Through**: Counts, signs, and index
//!    conventions go to the server exactly as given; nothing is reinterpreted
//!    client-side.

use std::time::Duration;

use bytes::Bytes;

use crate::command::Command;
use crate::conn::{ConnectionPool, PoolConfig};
use crate::error::ClientResult;
use crate::reply;

/// Configuration for the client and its pool.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClientConfig {
    /// Server address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Maximum idle connections kept in the pool.
    pub max_idle: usize,
    /// Maximum total connections (idle + in-use).
    pub max_total: usize,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addr: "127.0.0.1:6379".to_string(),
            max_idle: 8,
            max_total: 16,
            read_timeout: None,
            write_timeout: None,
            connect_timeout: None,
        }
    }
}

/// Synchronous list client with connection pooling.
///
/// This is a facade over the pool, the command marshaler, and the reply
/// interpreter. Each call acquires a connection, runs one command, and
/// returns the connection to the pool.
pub struct ListClient {
    pool: ConnectionPool,
}

impl ListClient {
    /// Creates a client with default configuration.
    pub fn connect(addr: impl Into<String>) -> ClientResult<Self> {
        let mut config = ClientConfig::default();
        config.addr = addr.into();
        Self::with_config(config)
    }

    /// Creates a client with a custom configuration.
    pub fn with_config(config: ClientConfig) -> ClientResult<Self> {
        let pool = ConnectionPool::new(PoolConfig {
            addr: config.addr,
            max_idle: config.max_idle,
            max_total: config.max_total,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            connect_timeout: config.connect_timeout,
        })?;
        Ok(ListClient { pool })
    }

    /// Returns the length of the list, or 0 when the key is missing.
    pub fn llen(&self, key: &[u8]) -> ClientResult<i64> {
        let cmd = Command::new("LLEN").arg(key);
        let mut conn = self.pool.acquire()?;
        reply::integer(conn.run(&cmd)?)
    }

    /// Fetches the element at `index`. Negative indexes count from the tail
    /// (-1 is the last element).
    ///
    /// Returns `Ok(None)` when the index is out of range or the key is
    /// missing.
    pub fn lindex(&self, key: &[u8], index: i64) -> ClientResult<Option<Bytes>> {
        let cmd = Command::new("LINDEX").arg(key).num(index);
        let mut conn = self.pool.acquire()?;
        reply::bulk(conn.run(&cmd)?)
    }

    /// Overwrites the element at `index` with `value`.
    ///
    /// The server rejects a missing key or an out-of-range index with an
    /// error reply.
    pub fn lset(&self, key: &[u8], index: i64, value: &[u8]) -> ClientResult<()> {
        let cmd = Command::new("LSET").arg(key).num(index).arg(value);
        let mut conn = self.pool.acquire()?;
        reply::status_ok(conn.run(&cmd)?)
    }

    /// Inserts `value` immediately before the first occurrence of `pivot`.
    ///
    /// Returns the new list length, -1 when the pivot is absent, or 0 when
    /// the key is missing.
    pub fn linsert_before(&self, key: &[u8], pivot: &[u8], value: &[u8]) -> ClientResult<i64> {
        self.linsert(key, b"BEFORE", pivot, value)
    }

    /// Inserts `value` immediately after the first occurrence of `pivot`.
    ///
    /// Returns the new list length, -1 when the pivot is absent, or 0 when
    /// the key is missing.
    pub fn linsert_after(&self, key: &[u8], pivot: &[u8], value: &[u8]) -> ClientResult<i64> {
        self.linsert(key, b"AFTER", pivot, value)
    }

    /// Pushes values onto the head, leftmost argument first. Pushing `a`,
    /// `b`, `c` leaves the list reading `c`, `b`, `a`.
    ///
    /// Returns the list length after the push.
    pub fn lpush<V: AsRef<[u8]>>(&self, key: &[u8], values: &[V]) -> ClientResult<i64> {
        self.push("LPUSH", key, values)
    }

    /// Appends values to the tail in argument order.
    ///
    /// Returns the list length after the push.
    pub fn rpush<V: AsRef<[u8]>>(&self, key: &[u8], values: &[V]) -> ClientResult<i64> {
        self.push("RPUSH", key, values)
    }

    /// Pushes onto the head only if the list already exists.
    ///
    /// Returns the new length, or 0 when the key is missing.
    pub fn lpushx(&self, key: &[u8], value: &[u8]) -> ClientResult<i64> {
        self.pushx("LPUSHX", key, value)
    }

    /// Appends to the tail only if the list already exists.
    ///
    /// Returns the new length, or 0 when the key is missing.
    pub fn rpushx(&self, key: &[u8], value: &[u8]) -> ClientResult<i64> {
        self.pushx("RPUSHX", key, value)
    }

    /// Pops the head element.
    ///
    /// Returns `Ok(None)` when the list is empty or the key is missing.
    pub fn lpop(&self, key: &[u8]) -> ClientResult<Option<Bytes>> {
        self.pop("LPOP", key)
    }

    /// Pops the tail element.
    ///
    /// Returns `Ok(None)` when the list is empty or the key is missing.
    pub fn rpop(&self, key: &[u8]) -> ClientResult<Option<Bytes>> {
        self.pop("RPOP", key)
    }

    /// Pops the head of the first non-empty list among `keys`, waiting up to
    /// `timeout` for one to gain an element. A zero timeout waits forever.
    ///
    /// Keys are watched in argument order; the first with data wins. Returns
    /// the `(key, value)` pair that was served, or `Ok(None)` when the wait
    /// timed out with every list still empty.
    pub fn blpop<K: AsRef<[u8]>>(
        &self,
        keys: &[K],
        timeout: Duration,
    ) -> ClientResult<Option<(Bytes, Bytes)>> {
        self.bpop("BLPOP", keys, timeout)
    }

    /// Tail-popping counterpart of [`ListClient::blpop`], with the same
    /// key-priority and timeout semantics.
    pub fn brpop<K: AsRef<[u8]>>(
        &self,
        keys: &[K],
        timeout: Duration,
    ) -> ClientResult<Option<(Bytes, Bytes)>> {
        self.bpop("BRPOP", keys, timeout)
    }

    /// Atomically pops the tail of `source` and pushes it onto the head of
    /// `destination`.
    ///
    /// Returns the moved element, or `Ok(None)` when `source` is empty.
    /// Rotates in place when `source` and `destination` are the same key.
    pub fn rpoplpush(&self, source: &[u8], destination: &[u8]) -> ClientResult<Option<Bytes>> {
        let cmd = Command::new("RPOPLPUSH").arg(source).arg(destination);
        let mut conn = self.pool.acquire()?;
        reply::bulk(conn.run(&cmd)?)
    }

    /// Blocking [`ListClient::rpoplpush`]: waits up to `timeout` for
    /// `source` to gain an element. A zero timeout waits forever.
    ///
    /// Returns the moved element, or `Ok(None)` when the wait timed out.
    pub fn brpoplpush(
        &self,
        source: &[u8],
        destination: &[u8],
        timeout: Duration,
    ) -> ClientResult<Option<Bytes>> {
        let cmd = Command::new("BRPOPLPUSH")
            .arg(source)
            .arg(destination)
            .timeout(timeout);
        let mut conn = self.pool.acquire()?;
        reply::moved_value(conn.run_blocking(&cmd, timeout)?)
    }

    /// Returns the elements between `start` and `stop` inclusive. Negative
    /// indexes count from the tail, so `lrange(key, 0, -1)` reads the whole
    /// list.
    ///
    /// Out-of-range spans come back clamped, never as an error.
    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> ClientResult<Vec<Bytes>> {
        let cmd = Command::new("LRANGE").arg(key).num(start).num(stop);
        let mut conn = self.pool.acquire()?;
        reply::bulk_values(conn.run(&cmd)?)
    }

    /// Trims the list to the inclusive span `start..=stop`, dropping
    /// everything outside it. A span that selects nothing (for example
    /// `start > stop`) empties the list and removes the key.
    pub fn ltrim(&self, key: &[u8], start: i64, stop: i64) -> ClientResult<()> {
        let cmd = Command::new("LTRIM").arg(key).num(start).num(stop);
        let mut conn = self.pool.acquire()?;
        reply::status_ok(conn.run(&cmd)?)
    }

    /// Removes occurrences of `value` and returns how many were removed.
    ///
    /// The sign of `count` picks the scan direction: positive removes up to
    /// `count` matches from head to tail, negative up to `|count|` matches
    /// from tail to head, and zero removes every match.
    pub fn lrem(&self, key: &[u8], count: i64, value: &[u8]) -> ClientResult<i64> {
        let cmd = Command::new("LREM").arg(key).num(count).arg(value);
        let mut conn = self.pool.acquire()?;
        reply::integer(conn.run(&cmd)?)
    }

    /// Discards pooled connections; the next operation dials fresh. Useful
    /// after a server restart or a batch of failed calls.
    pub fn reset(&self) {
        self.pool.clear();
    }

    fn push<V: AsRef<[u8]>>(
        &self,
        verb: &'static str,
        key: &[u8],
        values: &[V],
    ) -> ClientResult<i64> {
        debug_assert!(!values.is_empty(), "push needs at least one value");
        let cmd = Command::with_capacity(verb, 1 + values.len())
            .arg(key)
            .args(values);
        let mut conn = self.pool.acquire()?;
        reply::integer(conn.run(&cmd)?)
    }

    fn pushx(&self, verb: &'static str, key: &[u8], value: &[u8]) -> ClientResult<i64> {
        let cmd = Command::new(verb).arg(key).arg(value);
        let mut conn = self.pool.acquire()?;
        reply::integer(conn.run(&cmd)?)
    }

    fn pop(&self, verb: &'static str, key: &[u8]) -> ClientResult<Option<Bytes>> {
        let cmd = Command::new(verb).arg(key);
        let mut conn = self.pool.acquire()?;
        reply::bulk(conn.run(&cmd)?)
    }

    fn bpop<K: AsRef<[u8]>>(
        &self,
        verb: &'static str,
        keys: &[K],
        timeout: Duration,
    ) -> ClientResult<Option<(Bytes, Bytes)>> {
        debug_assert!(!keys.is_empty(), "blocking pop needs at least one key");
        let cmd = Command::with_capacity(verb, keys.len() + 1)
            .args(keys)
            .timeout(timeout);
        let mut conn = self.pool.acquire()?;
        reply::entry_pair(conn.run_blocking(&cmd, timeout)?)
    }

    fn linsert(
        &self,
        key: &[u8],
        position: &'static [u8],
        pivot: &[u8],
        value: &[u8],
    ) -> ClientResult<i64> {
        let cmd = Command::new("LINSERT")
            .arg(key)
            .arg(position)
            .arg(pivot)
            .arg(value);
        let mut conn = self.pool.acquire()?;
        reply::integer(conn.run(&cmd)?)
    }
}
