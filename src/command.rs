//! # Command Marshaling
//!
//! Purpose: Build the ordered argument array for one request and encode it
//! as a RESP2 array of length-tagged bulk strings.
//!
//! ## Design Principles
//! 1. **Borrow-Friendly**: Keys, values, and pivots stay borrowed slices;
//!    nothing is copied until the wire encoding.
//! 2. **Inline Numeric Scratch**: Counts, indexes, and timeouts render into
//!    fixed stack buffers owned by the argument itself, so the array never
//!    borrows from a temporary.
//! 3. **Binary-Safe**: Every argument is length-tagged; payloads may contain
//!    CR, LF, or NUL bytes.

use std::time::Duration;

/// Room for a sign plus 20 digits, or 20 digits plus a dot and 9 fraction
/// digits for timeouts.
const DECIMAL_CAP: usize = 30;

/// One request argument: either borrowed caller bytes or a decimal rendered
/// into inline scratch.
enum Arg<'a> {
    Slice(&'a [u8]),
    Decimal(Decimal),
}

impl Arg<'_> {
    fn as_bytes(&self) -> &[u8] {
        match self {
            Arg::Slice(data) => data,
            Arg::Decimal(decimal) => decimal.as_bytes(),
        }
    }
}

/// Decimal ASCII rendered into a fixed stack buffer.
struct Decimal {
    buf: [u8; DECIMAL_CAP],
    len: usize,
}

impl Decimal {
    fn signed(value: i64) -> Decimal {
        Decimal::render(value.unsigned_abs(), value < 0)
    }

    /// Renders a timeout as seconds with a minimal decimal form: `"0"`,
    /// `"5"`, `"0.1"`. Zero stays a bare `"0"`, which servers read as
    /// "wait forever".
    fn seconds(timeout: Duration) -> Decimal {
        let mut rendered = Decimal::render(timeout.as_secs(), false);
        let nanos = timeout.subsec_nanos();
        if nanos > 0 {
            rendered.push_fraction(nanos);
        }
        rendered
    }

    fn render(mut magnitude: u64, negative: bool) -> Decimal {
        let mut buf = [0u8; DECIMAL_CAP];
        let mut start = 0;
        if negative {
            buf[0] = b'-';
            start = 1;
        }
        let mut len = start;
        if magnitude == 0 {
            buf[len] = b'0';
            len += 1;
        } else {
            while magnitude > 0 {
                buf[len] = b'0' + (magnitude % 10) as u8;
                magnitude /= 10;
                len += 1;
            }
            buf[start..len].reverse();
        }
        Decimal { buf, len }
    }

    /// Appends `.` and the nanosecond fraction with trailing zeros trimmed.
    /// Callers skip this entirely for whole-second values.
    fn push_fraction(&mut self, nanos: u32) {
        self.buf[self.len] = b'.';
        self.len += 1;

        let mut digits = [0u8; 9];
        let mut rest = nanos;
        for slot in digits.iter_mut().rev() {
            *slot = b'0' + (rest % 10) as u8;
            rest /= 10;
        }
        let mut keep = digits.len();
        while keep > 0 && digits[keep - 1] == b'0' {
            keep -= 1;
        }
        self.buf[self.len..self.len + keep].copy_from_slice(&digits[..keep]);
        self.len += keep;
    }

    fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// An ordered request under construction: a verb followed by its arguments.
///
/// Argument order is exactly the order of the builder calls; the encoder
/// never reorders or rewrites anything.
pub struct Command<'a> {
    verb: &'static str,
    args: Vec<Arg<'a>>,
}

impl<'a> Command<'a> {
    pub fn new(verb: &'static str) -> Self {
        Command {
            verb,
            args: Vec::new(),
        }
    }

    /// Like [`Command::new`] with room reserved for `args` arguments.
    pub fn with_capacity(verb: &'static str, args: usize) -> Self {
        Command {
            verb,
            args: Vec::with_capacity(args),
        }
    }

    /// Appends one borrowed byte-string argument.
    pub fn arg(mut self, arg: &'a [u8]) -> Self {
        self.args.push(Arg::Slice(arg));
        self
    }

    /// Appends every item of a slice, in order. Accepts any element type
    /// that exposes bytes, so `&[&str]`, `&[String]`, `&[Vec<u8>]`, and
    /// `&[&[u8]]` all marshal identically.
    pub fn args<V: AsRef<[u8]>>(mut self, args: &'a [V]) -> Self {
        self.args.reserve(args.len());
        for arg in args {
            self.args.push(Arg::Slice(arg.as_ref()));
        }
        self
    }

    /// Appends a signed count or index as minimal decimal ASCII.
    pub fn num(mut self, value: i64) -> Self {
        self.args.push(Arg::Decimal(Decimal::signed(value)));
        self
    }

    /// Appends a timeout in seconds as minimal decimal ASCII.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.args.push(Arg::Decimal(Decimal::seconds(timeout)));
        self
    }

    pub fn verb(&self) -> &'static str {
        self.verb
    }

    /// Number of wire arguments including the verb.
    pub fn arg_count(&self) -> usize {
        1 + self.args.len()
    }

    /// Encodes the request as a RESP2 array of bulk strings, appending to
    /// `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(b'*');
        push_usize(out, self.arg_count());
        out.extend_from_slice(b"\r\n");
        push_bulk(out, self.verb.as_bytes());
        for arg in &self.args {
            push_bulk(out, arg.as_bytes());
        }
    }
}

fn push_bulk(out: &mut Vec<u8>, arg: &[u8]) {
    out.push(b'$');
    push_usize(out, arg.len());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(arg);
    out.extend_from_slice(b"\r\n");
}

fn push_usize(out: &mut Vec<u8>, mut value: usize) {
    // Write digits into a small stack buffer to avoid heap allocations.
    let mut buf = [0u8; 20];
    let mut len = 0;
    if value == 0 {
        buf[0] = b'0';
        len = 1;
    } else {
        while value > 0 {
            buf[len] = b'0' + (value % 10) as u8;
            value /= 10;
            len += 1;
        }
    }
    for idx in (0..len).rev() {
        out.push(buf[idx]);
    }
}
