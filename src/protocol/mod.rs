//! RESP3 wire protocol: data model, parser and serializer
//!
//! Replies are represented as a flat, pre-order stream of [`Node`]s rather
//! than an owned value tree. Aggregate headers carry their element count and
//! every node records its nesting depth, so the implicit tree can be walked
//! (or ignored) without allocating per level. The [`Parser`] produces one
//! complete reply per invocation; the [`Serializer`] builds pipelined
//! requests in the inline array form the server accepts on any protocol
//! version.

pub mod parser;
pub mod serializer;

pub use parser::Parser;
pub use serializer::{Arg, Serializer};

use crate::core::error::RespResult;
use bytes::Bytes;
use std::fmt;

pub(crate) const CRLF: &[u8] = b"\r\n";

/// The RESP3 data type of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RespType {
    /// Simple string: `+OK\r\n`
    SimpleString,
    /// Simple error: `-ERR message\r\n`
    SimpleError,
    /// Blob string: `$5\r\nhello\r\n`
    BlobString,
    /// Blob error: `!21\r\nSYNTAX invalid syntax\r\n`
    BlobError,
    /// Verbatim string: `=15\r\ntxt:Some string\r\n`
    VerbatimString,
    /// Number (integer): `:123\r\n`
    Number,
    /// Double: `,1.23\r\n`
    Double,
    /// Big number: `(3492890328409238509324850943850943825024385\r\n`
    BigNumber,
    /// Boolean: `#t\r\n` or `#f\r\n`
    Boolean,
    /// Null: `_\r\n` (also `$-1\r\n` / `*-1\r\n`)
    Null,
    /// Array header: `*3\r\n`
    Array,
    /// Map header: `%2\r\n` (element count is the pair count)
    Map,
    /// Set header: `~3\r\n`
    Set,
    /// Attribute header: `|1\r\n`; decorates the item that follows it
    Attribute,
    /// Push header: `>4\r\n`; server-initiated, outside the request FIFO
    Push,
    /// Streamed string header: `$?\r\n`
    StreamedString,
    /// One chunk of a streamed string: `;4\r\ndata\r\n`
    StreamedStringPart,
}

impl RespType {
    /// Whether this type is a counted aggregate header
    #[must_use]
    pub const fn is_aggregate(self) -> bool {
        matches!(
            self,
            Self::Array | Self::Map | Self::Set | Self::Push | Self::Attribute
        )
    }

    /// Whether the aggregate counts pairs, doubling its child node count
    #[must_use]
    pub const fn is_pair_aggregate(self) -> bool {
        matches!(self, Self::Map | Self::Attribute)
    }

    /// Human-readable type name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SimpleString => "simple-string",
            Self::SimpleError => "simple-error",
            Self::BlobString => "blob-string",
            Self::BlobError => "blob-error",
            Self::VerbatimString => "verbatim-string",
            Self::Number => "number",
            Self::Double => "double",
            Self::BigNumber => "big-number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Array => "array",
            Self::Map => "map",
            Self::Set => "set",
            Self::Attribute => "attribute",
            Self::Push => "push",
            Self::StreamedString => "streamed-string",
            Self::StreamedStringPart => "streamed-string-part",
        }
    }
}

impl fmt::Display for RespType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One element of a reply's pre-order node stream
///
/// Leaves carry their raw payload in `value`; aggregate headers carry the
/// element count they promise in `aggregate_size`. Payloads are binary-safe:
/// a blob may contain `\r\n` anywhere, only the declared length delimits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Data type of this node
    pub kind: RespType,
    /// Element count for aggregate headers (pair count for maps and
    /// attributes); zero for leaves
    pub aggregate_size: usize,
    /// Nesting depth; the top-level item of a reply sits at depth 0
    pub depth: usize,
    /// Raw payload for leaves; empty for aggregate headers
    pub value: Bytes,
}

impl Node {
    /// Create a leaf node
    #[must_use]
    pub fn leaf(kind: RespType, depth: usize, value: impl Into<Bytes>) -> Self {
        Self {
            kind,
            aggregate_size: 0,
            depth,
            value: value.into(),
        }
    }

    /// Create an aggregate header node
    #[must_use]
    pub fn header(kind: RespType, aggregate_size: usize, depth: usize) -> Self {
        Self {
            kind,
            aggregate_size,
            depth,
            value: Bytes::new(),
        }
    }

    /// Whether this node opens a counted aggregate
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        self.kind.is_aggregate()
    }

    /// Number of child nodes this header promises
    ///
    /// Maps and attributes count pairs, so their child count is twice the
    /// aggregate size. Leaves promise no children.
    #[must_use]
    pub fn child_count(&self) -> usize {
        if self.kind.is_pair_aggregate() {
            2 * self.aggregate_size
        } else if self.kind.is_aggregate() {
            self.aggregate_size
        } else {
            0
        }
    }

    /// The payload as UTF-8, if it is valid
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }

    /// Split a verbatim string payload into its encoding and content
    ///
    /// Returns `None` unless this node is a verbatim string with the
    /// `enc:content` layout.
    #[must_use]
    pub fn verbatim_parts(&self) -> Option<(&str, &[u8])> {
        if self.kind != RespType::VerbatimString {
            return None;
        }
        let colon = self.value.iter().position(|&b| b == b':')?;
        let encoding = std::str::from_utf8(&self.value[..colon]).ok()?;
        Some((encoding, &self.value[colon + 1..]))
    }
}

/// A sink the parser emits nodes into
///
/// The engine's resident sink is a plain `Vec<Node>`; the typed adapters in
/// [`crate::adapter`] implement this as well.
pub trait NodeSink {
    /// Accept the next node of the reply being parsed
    ///
    /// # Errors
    ///
    /// Returns an error when the node cannot be represented by this sink;
    /// such errors abort the current reply but not the connection.
    fn on_node(&mut self, node: Node) -> RespResult<()>;
}

impl NodeSink for Vec<Node> {
    fn on_node(&mut self, node: Node) -> RespResult<()> {
        self.push(node);
        Ok(())
    }
}
