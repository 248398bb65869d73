//! Shared test servers: a scripted single-connection server for wire-level
//! assertions, and a stateful list server for end-to-end semantics including
//! blocking pops.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use redlist::{ClientConfig, ListClient};

pub fn client_with_addr(addr: String) -> ListClient {
    let config = ClientConfig {
        addr,
        max_idle: 1,
        max_total: 2,
        read_timeout: Some(Duration::from_secs(2)),
        write_timeout: Some(Duration::from_secs(2)),
        connect_timeout: Some(Duration::from_secs(2)),
    };
    ListClient::with_config(config).expect("client")
}

// ---------------------------------------------------------------------------
// Scripted server: one connection, a fixed number of commands, and a handler
// that asserts on the exact wire arguments and writes raw replies.
// ---------------------------------------------------------------------------

pub fn spawn_script(
    expected_commands: usize,
    handler: fn(usize, Vec<Vec<u8>>, &mut TcpStream),
) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));
        for idx in 0..expected_commands {
            let args = read_command(&mut reader).expect("read command");
            handler(idx, args, &mut stream);
        }
    });

    addr
}

pub fn write_simple(stream: &mut TcpStream, msg: &str) {
    write_raw(stream, &resp_simple(msg));
}

pub fn write_error(stream: &mut TcpStream, msg: &str) {
    write_raw(stream, &resp_error(msg));
}

pub fn write_integer(stream: &mut TcpStream, value: i64) {
    write_raw(stream, &resp_integer(value));
}

pub fn write_bulk(stream: &mut TcpStream, data: &[u8]) {
    write_raw(stream, &resp_bulk(data));
}

pub fn write_null_bulk(stream: &mut TcpStream) {
    write_raw(stream, &resp_null());
}

pub fn write_null_array(stream: &mut TcpStream) {
    write_raw(stream, &resp_null_array());
}

pub fn write_values(stream: &mut TcpStream, items: &[&[u8]]) {
    let owned: Vec<Vec<u8>> = items.iter().map(|item| item.to_vec()).collect();
    write_raw(stream, &resp_values(&owned));
}

pub fn write_pair(stream: &mut TcpStream, key: &[u8], value: &[u8]) {
    write_raw(stream, &resp_pair(key, value));
}

pub fn write_raw(stream: &mut TcpStream, reply: &[u8]) {
    let _ = stream.write_all(reply);
    let _ = stream.flush();
}

// ---------------------------------------------------------------------------
// Wire parsing shared by both servers.
// ---------------------------------------------------------------------------

fn read_command(reader: &mut BufReader<TcpStream>) -> std::io::Result<Vec<Vec<u8>>> {
    let mut line = Vec::new();
    read_line(reader, &mut line)?
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"))?;
    if line.first() != Some(&b'*') {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "expected array",
        ));
    }
    let count = parse_usize(&line[1..])?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        read_line(reader, &mut line)?
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"))?;
        if line.first() != Some(&b'$') {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "expected bulk",
            ));
        }
        let len = parse_usize(&line[1..])?;
        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;
        let mut crlf = [0u8; 2];
        reader.read_exact(&mut crlf)?;
        if crlf != [b'\r', b'\n'] {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "missing crlf",
            ));
        }
        args.push(data);
    }
    Ok(args)
}

fn read_line(reader: &mut BufReader<TcpStream>, buf: &mut Vec<u8>) -> std::io::Result<Option<()>> {
    buf.clear();
    let bytes = reader.read_until(b'\n', buf)?;
    if bytes == 0 {
        return Ok(None);
    }
    if buf.len() < 2 || buf[buf.len() - 2] != b'\r' {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "invalid line",
        ));
    }
    buf.truncate(buf.len() - 2);
    Ok(Some(()))
}

fn parse_usize(data: &[u8]) -> std::io::Result<usize> {
    if data.is_empty() {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "empty"));
    }
    let mut value = 0usize;
    for &b in data {
        if !b.is_ascii_digit() {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "digit"));
        }
        value = value.saturating_mul(10).saturating_add((b - b'0') as usize);
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Stateful list server: real list semantics over a shared store, blocking
// pops included, one thread per connection.
// ---------------------------------------------------------------------------

type Store = HashMap<Vec<u8>, VecDeque<Vec<u8>>>;

struct Shared {
    store: Mutex<Store>,
    wake: Condvar,
}

pub fn spawn_list_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    let shared = Arc::new(Shared {
        store: Mutex::new(HashMap::new()),
        wake: Condvar::new(),
    });

    thread::spawn(move || {
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(_) => break,
            };
            let shared = Arc::clone(&shared);
            thread::spawn(move || serve_connection(stream, shared));
        }
    });

    addr
}

fn serve_connection(stream: TcpStream, shared: Arc<Shared>) {
    let mut writer = stream.try_clone().expect("clone");
    let mut reader = BufReader::new(stream);
    loop {
        let args = match read_command(&mut reader) {
            Ok(args) => args,
            Err(_) => return,
        };
        let reply = dispatch_command(&args, &shared);
        if writer.write_all(&reply).is_err() {
            return;
        }
        let _ = writer.flush();
    }
}

fn dispatch_command(args: &[Vec<u8>], shared: &Shared) -> Vec<u8> {
    if args.is_empty() {
        return resp_error("empty command");
    }

    let cmd = args[0].to_ascii_uppercase();
    match cmd.as_slice() {
        b"LLEN" => handle_llen(args, shared),
        b"LINDEX" => handle_lindex(args, shared),
        b"LSET" => handle_lset(args, shared),
        b"LINSERT" => handle_linsert(args, shared),
        b"LPUSH" => handle_push(args, shared, true, true),
        b"RPUSH" => handle_push(args, shared, false, true),
        b"LPUSHX" => handle_push(args, shared, true, false),
        b"RPUSHX" => handle_push(args, shared, false, false),
        b"LPOP" => handle_pop(args, shared, true),
        b"RPOP" => handle_pop(args, shared, false),
        b"LRANGE" => handle_lrange(args, shared),
        b"LTRIM" => handle_ltrim(args, shared),
        b"LREM" => handle_lrem(args, shared),
        b"RPOPLPUSH" => handle_rpoplpush(args, shared),
        b"BLPOP" => handle_blocking_pop(args, shared, true),
        b"BRPOP" => handle_blocking_pop(args, shared, false),
        b"BRPOPLPUSH" => handle_brpoplpush(args, shared),
        _ => resp_error("unknown command"),
    }
}

fn lock(shared: &Shared) -> MutexGuard<'_, Store> {
    shared.store.lock().expect("store lock")
}

fn handle_llen(args: &[Vec<u8>], shared: &Shared) -> Vec<u8> {
    if args.len() != 2 {
        return resp_error("wrong number of arguments");
    }
    let store = lock(shared);
    let len = store.get(&args[1]).map_or(0, |list| list.len() as i64);
    resp_integer(len)
}

fn handle_lindex(args: &[Vec<u8>], shared: &Shared) -> Vec<u8> {
    if args.len() != 3 {
        return resp_error("wrong number of arguments");
    }
    let index = match parse_i64_arg(&args[2]) {
        Ok(index) => index,
        Err(reply) => return reply,
    };
    let store = lock(shared);
    let Some(list) = store.get(&args[1]) else {
        return resp_null();
    };
    match normalize_index(index, list.len()) {
        Some(at) => resp_bulk(&list[at]),
        None => resp_null(),
    }
}

fn handle_lset(args: &[Vec<u8>], shared: &Shared) -> Vec<u8> {
    if args.len() != 4 {
        return resp_error("wrong number of arguments");
    }
    let index = match parse_i64_arg(&args[2]) {
        Ok(index) => index,
        Err(reply) => return reply,
    };
    let mut store = lock(shared);
    let Some(list) = store.get_mut(&args[1]) else {
        return resp_error("no such key");
    };
    match normalize_index(index, list.len()) {
        Some(at) => {
            list[at] = args[3].clone();
            resp_simple("OK")
        }
        None => resp_error("index out of range"),
    }
}

fn handle_linsert(args: &[Vec<u8>], shared: &Shared) -> Vec<u8> {
    if args.len() != 5 {
        return resp_error("wrong number of arguments");
    }
    let before = if args[2].eq_ignore_ascii_case(b"BEFORE") {
        true
    } else if args[2].eq_ignore_ascii_case(b"AFTER") {
        false
    } else {
        return resp_error("syntax error");
    };

    let mut store = lock(shared);
    let Some(list) = store.get_mut(&args[1]) else {
        return resp_integer(0);
    };
    let Some(found) = list.iter().position(|item| item == &args[3]) else {
        return resp_integer(-1);
    };
    let at = if before { found } else { found + 1 };
    list.insert(at, args[4].clone());
    resp_integer(list.len() as i64)
}

fn handle_push(args: &[Vec<u8>], shared: &Shared, head: bool, create: bool) -> Vec<u8> {
    if args.len() < 3 {
        return resp_error("wrong number of arguments");
    }
    let mut store = lock(shared);
    if !create && !store.contains_key(&args[1]) {
        return resp_integer(0);
    }
    let list = store.entry(args[1].clone()).or_default();
    for value in &args[2..] {
        if head {
            list.push_front(value.clone());
        } else {
            list.push_back(value.clone());
        }
    }
    let len = list.len() as i64;
    drop(store);
    shared.wake.notify_all();
    resp_integer(len)
}

fn handle_pop(args: &[Vec<u8>], shared: &Shared, head: bool) -> Vec<u8> {
    if args.len() != 2 {
        return resp_error("wrong number of arguments");
    }
    let mut store = lock(shared);
    if let Some(list) = store.get_mut(&args[1]) {
        let value = if head { list.pop_front() } else { list.pop_back() };
        let emptied = list.is_empty();
        if emptied {
            store.remove(&args[1]);
        }
        match value {
            Some(value) => resp_bulk(&value),
            None => resp_null(),
        }
    } else {
        resp_null()
    }
}

fn handle_lrange(args: &[Vec<u8>], shared: &Shared) -> Vec<u8> {
    if args.len() != 4 {
        return resp_error("wrong number of arguments");
    }
    let (start, stop) = match (parse_i64_arg(&args[2]), parse_i64_arg(&args[3])) {
        (Ok(start), Ok(stop)) => (start, stop),
        (Err(reply), _) | (_, Err(reply)) => return reply,
    };
    let store = lock(shared);
    let Some(list) = store.get(&args[1]) else {
        return resp_values(&[]);
    };
    match normalize_range(start, stop, list.len()) {
        Some((from, to)) => {
            let items: Vec<Vec<u8>> = list
                .iter()
                .skip(from)
                .take(to - from + 1)
                .cloned()
                .collect();
            resp_values(&items)
        }
        None => resp_values(&[]),
    }
}

fn handle_ltrim(args: &[Vec<u8>], shared: &Shared) -> Vec<u8> {
    if args.len() != 4 {
        return resp_error("wrong number of arguments");
    }
    let (start, stop) = match (parse_i64_arg(&args[2]), parse_i64_arg(&args[3])) {
        (Ok(start), Ok(stop)) => (start, stop),
        (Err(reply), _) | (_, Err(reply)) => return reply,
    };
    let mut store = lock(shared);
    if let Some(list) = store.get_mut(&args[1]) {
        match normalize_range(start, stop, list.len()) {
            Some((from, to)) => {
                list.truncate(to + 1);
                list.drain(..from);
                if list.is_empty() {
                    store.remove(&args[1]);
                }
            }
            None => {
                store.remove(&args[1]);
            }
        }
    }
    resp_simple("OK")
}

fn handle_lrem(args: &[Vec<u8>], shared: &Shared) -> Vec<u8> {
    if args.len() != 4 {
        return resp_error("wrong number of arguments");
    }
    let count = match parse_i64_arg(&args[2]) {
        Ok(count) => count,
        Err(reply) => return reply,
    };
    let mut store = lock(shared);
    let Some(list) = store.get_mut(&args[1]) else {
        return resp_integer(0);
    };

    let target = &args[3];
    let limit = if count == 0 {
        usize::MAX
    } else {
        count.unsigned_abs() as usize
    };
    let mut removed = 0usize;
    if count >= 0 {
        let mut idx = 0;
        while idx < list.len() && removed < limit {
            if &list[idx] == target {
                let _ = list.remove(idx);
                removed += 1;
            } else {
                idx += 1;
            }
        }
    } else {
        let mut idx = list.len();
        while idx > 0 && removed < limit {
            idx -= 1;
            if &list[idx] == target {
                let _ = list.remove(idx);
                removed += 1;
            }
        }
    }
    if list.is_empty() {
        store.remove(&args[1]);
    }
    resp_integer(removed as i64)
}

fn handle_rpoplpush(args: &[Vec<u8>], shared: &Shared) -> Vec<u8> {
    if args.len() != 3 {
        return resp_error("wrong number of arguments");
    }
    let mut store = lock(shared);
    let value = {
        let Some(source) = store.get_mut(&args[1]) else {
            return resp_null();
        };
        let Some(value) = source.pop_back() else {
            return resp_null();
        };
        if source.is_empty() {
            store.remove(&args[1]);
        }
        value
    };
    store
        .entry(args[2].clone())
        .or_default()
        .push_front(value.clone());
    drop(store);
    shared.wake.notify_all();
    resp_bulk(&value)
}

fn handle_blocking_pop(args: &[Vec<u8>], shared: &Shared, head: bool) -> Vec<u8> {
    if args.len() < 3 {
        return resp_error("wrong number of arguments");
    }
    let keys = &args[1..args.len() - 1];
    let timeout = match parse_timeout(&args[args.len() - 1]) {
        Ok(timeout) => timeout,
        Err(reply) => return reply,
    };
    match wait_for_entry(shared, keys, timeout, head) {
        Some((key, value)) => resp_pair(&key, &value),
        None => resp_null_array(),
    }
}

fn handle_brpoplpush(args: &[Vec<u8>], shared: &Shared) -> Vec<u8> {
    if args.len() != 4 {
        return resp_error("wrong number of arguments");
    }
    let timeout = match parse_timeout(&args[3]) {
        Ok(timeout) => timeout,
        Err(reply) => return reply,
    };
    match wait_for_entry(shared, &args[1..2], timeout, false) {
        Some((_, value)) => {
            let mut store = lock(shared);
            store
                .entry(args[2].clone())
                .or_default()
                .push_front(value.clone());
            drop(store);
            shared.wake.notify_all();
            resp_bulk(&value)
        }
        // Timed-out blocked commands answer with a null array, not a null
        // bulk; the null bulk is the immediate RPOPLPUSH miss.
        None => resp_null_array(),
    }
}

/// Scans the watched keys in order; the first with data serves the pop.
/// Blocks on the store condvar until data arrives or the deadline passes.
/// A zero timeout means no deadline at all.
fn wait_for_entry(
    shared: &Shared,
    keys: &[Vec<u8>],
    timeout: Duration,
    head: bool,
) -> Option<(Vec<u8>, Vec<u8>)> {
    let deadline = if timeout.is_zero() {
        None
    } else {
        Some(Instant::now() + timeout)
    };
    let mut store = lock(shared);
    loop {
        for key in keys {
            if let Some(list) = store.get_mut(key) {
                let value = if head { list.pop_front() } else { list.pop_back() };
                if let Some(value) = value {
                    if list.is_empty() {
                        store.remove(key);
                    }
                    return Some((key.clone(), value));
                }
            }
        }
        store = match deadline {
            None => shared.wake.wait(store).expect("wait"),
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return None;
                }
                let (guard, _) = shared
                    .wake
                    .wait_timeout(store, deadline - now)
                    .expect("wait");
                guard
            }
        };
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let at = if index < 0 { index + len } else { index };
    if at < 0 || at >= len {
        None
    } else {
        Some(at as usize)
    }
}

fn normalize_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    if len == 0 {
        return None;
    }
    let mut from = if start < 0 { start + len } else { start };
    let mut to = if stop < 0 { stop + len } else { stop };
    if from < 0 {
        from = 0;
    }
    if to >= len {
        to = len - 1;
    }
    if from > to || from >= len || to < 0 {
        return None;
    }
    Some((from as usize, to as usize))
}

fn parse_i64_arg(arg: &[u8]) -> Result<i64, Vec<u8>> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| resp_error("value is not an integer"))
}

fn parse_timeout(arg: &[u8]) -> Result<Duration, Vec<u8>> {
    let seconds: f64 = std::str::from_utf8(arg)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| resp_error("timeout is not a float"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(resp_error("timeout is negative"));
    }
    Ok(Duration::from_secs_f64(seconds))
}

// ---------------------------------------------------------------------------
// Raw reply encoders.
// ---------------------------------------------------------------------------

fn resp_simple(message: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(message.len() + 3);
    buf.extend_from_slice(b"+");
    buf.extend_from_slice(message.as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf
}

fn resp_error(message: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(message.len() + 6);
    buf.extend_from_slice(b"-ERR ");
    buf.extend_from_slice(message.as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf
}

fn resp_integer(value: i64) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b":");
    buf.extend_from_slice(value.to_string().as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf
}

fn resp_bulk(data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"$");
    buf.extend_from_slice(data.len().to_string().as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf.extend_from_slice(data);
    buf.extend_from_slice(b"\r\n");
    buf
}

fn resp_null() -> Vec<u8> {
    b"$-1\r\n".to_vec()
}

fn resp_null_array() -> Vec<u8> {
    b"*-1\r\n".to_vec()
}

fn resp_values(items: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"*");
    buf.extend_from_slice(items.len().to_string().as_bytes());
    buf.extend_from_slice(b"\r\n");
    for item in items {
        buf.extend_from_slice(&resp_bulk(item));
    }
    buf
}

fn resp_pair(key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"*2\r\n");
    buf.extend_from_slice(&resp_bulk(key));
    buf.extend_from_slice(&resp_bulk(value));
    buf
}
