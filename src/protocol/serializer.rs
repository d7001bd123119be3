//! Request serializer
//!
//! Commands are written in the RESP2 inline array form
//! (`*N\r\n$len\r\n<arg>\r\n…`), which the server accepts on every protocol
//! version. The serializer accumulates any number of pipelined commands and
//! records their tags in emission order, so the engine can later match each
//! reply to the command that produced it.

use crate::command::Command;
use crate::protocol::CRLF;
use bytes::{BufMut, Bytes, BytesMut};
use std::collections::VecDeque;

/// One command argument, canonicalized to its wire text
///
/// Integers are written in decimal, doubles with shortest round-trip
/// precision, booleans as `0`/`1`. Byte arguments are written verbatim.
#[derive(Debug, Clone)]
pub enum Arg {
    /// Raw bytes, written as-is
    Bytes(Bytes),
    /// Signed integer
    Int(i64),
    /// Floating point number
    Double(f64),
    /// Boolean, canonicalized to `0`/`1`
    Bool(bool),
}

impl Arg {
    fn write(&self, buf: &mut BytesMut) {
        match self {
            Self::Bytes(b) => write_bulk(buf, b),
            Self::Int(i) => write_bulk(buf, i.to_string().as_bytes()),
            Self::Double(d) => write_bulk(buf, d.to_string().as_bytes()),
            Self::Bool(b) => write_bulk(buf, if *b { b"1" } else { b"0" }),
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Self::Bytes(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Self::Bytes(Bytes::from(value.into_bytes()))
    }
}

impl From<&[u8]> for Arg {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(Bytes::copy_from_slice(value))
    }
}

impl From<Vec<u8>> for Arg {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<Bytes> for Arg {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

// A single integer conversion keeps literal arguments unambiguous.
impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Builds pipelined request bytes and the matching command tag FIFO
#[derive(Debug, Default)]
pub struct Serializer {
    buf: BytesMut,
    commands: VecDeque<Command>,
}

impl Serializer {
    /// Create an empty serializer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one command with its arguments
    pub fn push(&mut self, cmd: Command, args: &[Arg]) {
        self.begin(cmd, args.len());
        for arg in args {
            arg.write(&mut self.buf);
        }
        self.record(cmd);
    }

    /// Append one command with a key and a variable-length tail
    pub fn push_range<I>(&mut self, cmd: Command, key: &str, items: I)
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        let items: Vec<Arg> = items.into_iter().map(Into::into).collect();
        self.begin(cmd, 1 + items.len());
        write_bulk(&mut self.buf, key.as_bytes());
        for arg in &items {
            arg.write(&mut self.buf);
        }
        self.record(cmd);
    }

    /// Append one command with a key and alternating field/value pairs
    pub fn push_map<I, K, V>(&mut self, cmd: Command, key: &str, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Arg>,
        V: Into<Arg>,
    {
        let flat: Vec<Arg> = entries
            .into_iter()
            .flat_map(|(k, v)| [k.into(), v.into()])
            .collect();
        self.begin(cmd, 1 + flat.len());
        write_bulk(&mut self.buf, key.as_bytes());
        for arg in &flat {
            arg.write(&mut self.buf);
        }
        self.record(cmd);
    }

    /// The accumulated request bytes
    #[must_use]
    pub fn request(&self) -> &[u8] {
        &self.buf
    }

    /// Take the accumulated request bytes, leaving the serializer empty
    pub fn take_request(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    /// The tags recorded so far, in wire order
    #[must_use]
    pub fn commands(&self) -> &VecDeque<Command> {
        &self.commands
    }

    /// Drain the recorded tags
    pub fn take_commands(&mut self) -> VecDeque<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Whether nothing has been pushed since the last take
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty() && self.commands.is_empty()
    }

    fn begin(&mut self, cmd: Command, args: usize) {
        self.buf.put_u8(b'*');
        self.buf
            .extend_from_slice((1 + args).to_string().as_bytes());
        self.buf.extend_from_slice(CRLF);
        write_bulk(&mut self.buf, cmd.as_str().as_bytes());
    }

    fn record(&mut self, cmd: Command) {
        // subscription acks arrive as push frames and never occupy a reply slot
        if !cmd.has_push_response() {
            self.commands.push_back(cmd);
        }
    }
}

fn write_bulk(buf: &mut BytesMut, payload: &[u8]) {
    buf.put_u8(b'$');
    buf.extend_from_slice(payload.len().to_string().as_bytes());
    buf.extend_from_slice(CRLF);
    buf.extend_from_slice(payload);
    buf.extend_from_slice(CRLF);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_set() {
        let mut sr = Serializer::new();
        sr.push(Command::Set, &["b".into(), "aaa".into()]);
        assert_eq!(sr.request(), b"*3\r\n$3\r\nSET\r\n$1\r\nb\r\n$3\r\naaa\r\n");
        assert_eq!(sr.commands().front(), Some(&Command::Set));
    }

    #[test]
    fn test_push_hello() {
        let mut sr = Serializer::new();
        sr.push(Command::Hello, &[3.into()]);
        assert_eq!(sr.request(), b"*2\r\n$5\r\nHELLO\r\n$1\r\n3\r\n");
    }

    #[test]
    fn test_push_range() {
        let mut sr = Serializer::new();
        sr.push_range(Command::Rpush, "a", 1..=3);
        assert_eq!(
            sr.request(),
            b"*5\r\n$5\r\nRPUSH\r\n$1\r\na\r\n$1\r\n1\r\n$1\r\n2\r\n$1\r\n3\r\n"
        );
        // one command on the wire, one tag recorded
        assert_eq!(sr.commands().len(), 1);
    }

    #[test]
    fn test_push_map() {
        let mut sr = Serializer::new();
        sr.push_map(Command::Hset, "d", [("field1", "value1"), ("field2", "value2")]);
        assert_eq!(
            sr.request(),
            b"*6\r\n$4\r\nHSET\r\n$1\r\nd\r\n$6\r\nfield1\r\n$6\r\nvalue1\r\n$6\r\nfield2\r\n$6\r\nvalue2\r\n"
                .as_slice()
        );
    }

    #[test]
    fn test_canonical_argument_text() {
        let mut sr = Serializer::new();
        sr.push(Command::Set, &["k".into(), true.into()]);
        sr.push(Command::Set, &["k".into(), 1.5f64.into()]);
        sr.push(Command::Set, &["k".into(), (-42i64).into()]);
        let text = String::from_utf8(sr.request().to_vec()).unwrap();
        assert!(text.contains("$1\r\n1\r\n"));
        assert!(text.contains("$3\r\n1.5\r\n"));
        assert!(text.contains("$3\r\n-42\r\n"));
    }

    #[test]
    fn test_tag_order_matches_wire_order() {
        let mut sr = Serializer::new();
        sr.push(Command::Flushall, &[]);
        sr.push_range(Command::Rpush, "a", [1, 2, 3]);
        sr.push(Command::Llen, &["a".into()]);
        let tags: Vec<Command> = sr.take_commands().into_iter().collect();
        assert_eq!(tags, vec![Command::Flushall, Command::Rpush, Command::Llen]);
    }

    #[test]
    fn test_subscribe_records_no_tag() {
        let mut sr = Serializer::new();
        sr.push(Command::Subscribe, &["channel".into()]);
        sr.push(Command::Publish, &["channel".into(), "message".into()]);
        assert_eq!(sr.commands().len(), 1);
        assert_eq!(sr.commands().front(), Some(&Command::Publish));
    }

    #[test]
    fn test_binary_safe_argument() {
        let mut sr = Serializer::new();
        sr.push(Command::Set, &["k".into(), b"a\r\nb".as_slice().into()]);
        assert_eq!(
            sr.request(),
            b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$4\r\na\r\nb\r\n"
        );
    }
}
