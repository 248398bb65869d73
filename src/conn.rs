//! # Connections and Pooling
//!
//! Purpose: Reuse TCP connections across operations to reduce handshake
//! latency and allocation churn, one strict request/reply round trip at a
//! time.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Keep a bounded set of reusable connections.
//! 2. **Minimal Locking**: Hold the mutex only while moving idle connections.
//! 3. **Fail Fast**: Exceeding the pool limit returns an error immediately.
//! 4. **Failed Connections Never Return**: Any IO or framing fault marks the
//!    connection invalid, so a desynchronized reply stream cannot leak into
//!    the next operation.

use std::collections::VecDeque;
use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::command::Command;
use crate::error::{ClientError, ClientResult};
use crate::resp::{read_response, RespValue};

/// Extra client-side wait beyond a server-side blocking timeout, covering
/// scheduling and network slack before the read is declared dead.
const BLOCK_GRACE: Duration = Duration::from_secs(1);

/// Pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Server address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Maximum number of idle connections to keep.
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

struct PoolState {
    idle: VecDeque<Connection>,
    total: usize,
}

struct PoolInner {
    config: PoolConfig,
    state: Mutex<PoolState>,
}

/// Connection pool handle.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Creates a new connection pool with the provided configuration.
    pub fn new(config: PoolConfig) -> ClientResult<Self> {
        let state = PoolState {
            idle: VecDeque::with_capacity(config.max_idle),
            total: 0,
        };
        Ok(ConnectionPool {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(state),
            }),
        })
    }

    /// Acquires a connection from the pool.
    pub fn acquire(&self) -> ClientResult<PooledConnection> {
        if let Some(conn) = self.pop_idle() {
            return Ok(PooledConnection::new(self.inner.clone(), conn));
        }

        if !self.try_reserve() {
            return Err(ClientError::PoolExhausted);
        }

        match Connection::connect(&self.inner.config) {
            Ok(conn) => Ok(PooledConnection::new(self.inner.clone(), conn)),
            Err(err) => {
                self.release_slot();
                Err(err)
            }
        }
    }

    /// Drops every idle connection. Connections currently checked out are
    /// untouched and return to the pool (or are discarded) as usual.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        let dropped = state.idle.len();
        state.total = state.total.saturating_sub(dropped);
        state.idle.clear();
        if dropped > 0 {
            debug!("dropped {} pooled connection(s)", dropped);
        }
    }

    fn pop_idle(&self) -> Option<Connection> {
        let mut state = self.inner.state.lock();
        state.idle.pop_front()
    }

    fn try_reserve(&self) -> bool {
        let mut state = self.inner.state.lock();
        if state.total >= self.inner.config.max_total {
            return false;
        }
        state.total += 1;
        true
    }

    fn release_slot(&self) {
        let mut state = self.inner.state.lock();
        state.total = state.total.saturating_sub(1);
    }

    fn return_connection(&self, conn: Connection) {
        let mut state = self.inner.state.lock();
        if state.idle.len() < self.inner.config.max_idle {
            state.idle.push_back(conn);
        } else {
            state.total = state.total.saturating_sub(1);
        }
    }
}

/// RAII wrapper returning a connection to the pool on drop.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: Option<Connection>,
    valid: bool,
}

impl PooledConnection {
    fn new(pool: Arc<PoolInner>, conn: Connection) -> Self {
        PooledConnection {
            pool,
            conn: Some(conn),
            valid: true,
        }
    }

    /// Runs one command round trip and returns the parsed reply.
    pub fn run(&mut self, cmd: &Command<'_>) -> ClientResult<RespValue> {
        let conn = self.conn.as_mut().expect("connection exists");
        let reply = conn.run(cmd);
        if reply.is_err() {
            // If IO/protocol fails, do not return this connection to the pool.
            self.valid = false;
        }
        reply
    }

    /// Runs one round trip for a command the server may hold open until
    /// data arrives or `server_timeout` elapses (zero means wait forever).
    ///
    /// The socket read timeout is lifted for the duration of the wait and
    /// restored afterwards. A reply that already arrived is returned even if
    /// the restore fails; the connection is then discarded instead of
    /// re-pooled, since its timeout state is no longer trustworthy.
    pub fn run_blocking(
        &mut self,
        cmd: &Command<'_>,
        server_timeout: Duration,
    ) -> ClientResult<RespValue> {
        let conn = self.conn.as_mut().expect("connection exists");
        let reply = match conn.lift_read_timeout(server_timeout) {
            Ok(()) => conn.run(cmd),
            Err(err) => Err(err),
        };
        let restored = conn.restore_read_timeout();

        let (reply, reusable) = settle_blocking(reply, restored);
        if !reusable {
            self.valid = false;
        }
        reply
    }
}

/// Decides what a blocking round trip reports and whether the connection may
/// be reused. The reply always wins: an element the server already popped
/// must reach the caller even when restoring the read timeout failed.
fn settle_blocking(
    reply: ClientResult<RespValue>,
    restored: ClientResult<()>,
) -> (ClientResult<RespValue>, bool) {
    let reusable = reply.is_ok() && restored.is_ok();
    (reply, reusable)
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => return,
        };

        let pool = ConnectionPool {
            inner: self.pool.clone(),
        };

        if self.valid {
            pool.return_connection(conn);
        } else {
            pool.release_slot();
        }
    }
}

/// Single TCP connection with reusable buffers.
///
/// The buffers are stored on the connection to avoid per-call allocations.
pub struct Connection {
    // Buffered reader reduces syscalls while still allowing direct writes.
    reader: BufReader<TcpStream>,
    line_buf: Vec<u8>,
    write_buf: Vec<u8>,
    // Configured read timeout, restored after blocking commands lift it.
    read_timeout: Option<Duration>,
}

impl Connection {
    fn connect(config: &PoolConfig) -> ClientResult<Self> {
        let stream = connect_stream(config)?;
        if let Some(timeout) = config.read_timeout {
            stream.set_read_timeout(Some(timeout))?;
        }
        if let Some(timeout) = config.write_timeout {
            stream.set_write_timeout(Some(timeout))?;
        }
        // Disable Nagle to keep request latency low for small payloads.
        stream.set_nodelay(true)?;
        debug!("connected to {}", config.addr);

        Ok(Connection {
            reader: BufReader::new(stream),
            line_buf: Vec::with_capacity(128),
            write_buf: Vec::with_capacity(256),
            read_timeout: config.read_timeout,
        })
    }

    /// Encodes the command, sends it, and reads exactly one reply.
    fn run(&mut self, cmd: &Command<'_>) -> ClientResult<RespValue> {
        self.write_buf.clear();
        cmd.encode_into(&mut self.write_buf);
        trace!("{} request, {} bytes", cmd.verb(), self.write_buf.len());

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        read_response(&mut self.reader, &mut self.line_buf)
    }

    /// Replaces the socket read timeout with one sized for a server-side
    /// wait. A configured read timeout shorter than the server timeout would
    /// otherwise cut legitimate waits short.
    fn lift_read_timeout(&mut self, server_timeout: Duration) -> ClientResult<()> {
        let wait = if server_timeout.is_zero() {
            None
        } else {
            Some(server_timeout.saturating_add(BLOCK_GRACE))
        };
        trace!("read timeout lifted to {:?}", wait);
        self.reader.get_ref().set_read_timeout(wait)?;
        Ok(())
    }

    fn restore_read_timeout(&mut self) -> ClientResult<()> {
        self.reader.get_ref().set_read_timeout(self.read_timeout)?;
        Ok(())
    }
}

fn connect_stream(config: &PoolConfig) -> ClientResult<TcpStream> {
    let addr: SocketAddr = config.addr.parse().map_err(|_| ClientError::InvalidAddress)?;
    let stream = match config.connect_timeout {
        Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
        None => TcpStream::connect(addr)?,
    };
    Ok(stream)
}
