//! Typed reply adapters
//!
//! An adapter is a [`NodeSink`] that folds the node stream of one reply into
//! a caller-chosen value: a scalar, a flat sequence, map entries, or nothing
//! at all. The engine itself always collects the raw node list; these sinks
//! are applied to that list (or fed directly by the parser) to obtain typed
//! results. Every adapter tolerates a leading attribute block by skipping
//! its subtree.
//!
//! Conversion failures are reported as [`RespError::Type`] and are scoped to
//! the reply being adapted; the connection is unaffected.

use crate::core::error::{RespError, RespResult};
use crate::protocol::{Node, NodeSink, RespType};
use bytes::Bytes;

/// The raw reply representation: every node, structure preserved through
/// `depth` and `aggregate_size`
pub type NodeList = Vec<Node>;

/// Convert one leaf node into a typed value
pub trait FromNode: Sized {
    /// Parse the node's payload
    ///
    /// # Errors
    ///
    /// Returns `RespError::Type` when the payload cannot represent `Self`.
    fn from_node(node: &Node) -> RespResult<Self>;
}

fn text(node: &Node) -> RespResult<&str> {
    std::str::from_utf8(&node.value)
        .map_err(|_| RespError::Type(format!("{} payload is not valid UTF-8", node.kind)))
}

impl FromNode for String {
    fn from_node(node: &Node) -> RespResult<Self> {
        if let Some((_, content)) = node.verbatim_parts() {
            return String::from_utf8(content.to_vec())
                .map_err(|_| RespError::Type("verbatim payload is not valid UTF-8".to_string()));
        }
        Ok(text(node)?.to_string())
    }
}

impl FromNode for Bytes {
    fn from_node(node: &Node) -> RespResult<Self> {
        Ok(node.value.clone())
    }
}

impl FromNode for Vec<u8> {
    fn from_node(node: &Node) -> RespResult<Self> {
        Ok(node.value.to_vec())
    }
}

impl FromNode for f64 {
    fn from_node(node: &Node) -> RespResult<Self> {
        let text = text(node)?;
        text.parse::<f64>()
            .map_err(|e| RespError::Type(format!("cannot parse '{}' as f64: {}", text, e)))
    }
}

impl FromNode for bool {
    fn from_node(node: &Node) -> RespResult<Self> {
        match (node.kind, node.value.as_ref()) {
            (RespType::Boolean, b"t") => Ok(true),
            (RespType::Boolean, b"f") => Ok(false),
            (_, b"1") => Ok(true),
            (_, b"0") => Ok(false),
            _ => Err(RespError::Type(format!(
                "cannot interpret {} as bool",
                node.kind
            ))),
        }
    }
}

macro_rules! from_node_int {
    ($($ty:ty),*) => {
        $(
            impl FromNode for $ty {
                fn from_node(node: &Node) -> RespResult<Self> {
                    let text = text(node)?;
                    text.parse::<$ty>().map_err(|e| {
                        RespError::Type(format!(
                            "cannot parse '{}' as {}: {}",
                            text,
                            stringify!($ty),
                            e
                        ))
                    })
                }
            }
        )*
    };
}

from_node_int!(i64, i32, u32, u64, usize);

/// Tracks and swallows the node subtree of a leading attribute block
#[derive(Debug, Default)]
struct AttributeSkip {
    remaining: usize,
}

impl AttributeSkip {
    /// Returns `true` when the node belongs to attribute metadata and should
    /// not reach the adapter proper.
    fn swallow(&mut self, node: &Node) -> bool {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.remaining += node.child_count();
            true
        } else if node.kind == RespType::Attribute {
            self.remaining = node.child_count();
            true
        } else {
            false
        }
    }
}

/// Discards the reply
#[derive(Debug, Default)]
pub struct Ignore;

impl NodeSink for Ignore {
    fn on_node(&mut self, _node: Node) -> RespResult<()> {
        Ok(())
    }
}

/// Adapts a single-leaf reply into one `T`
///
/// A null reply yields `None`. Aggregate and streamed replies are rejected.
#[derive(Debug)]
pub struct Scalar<T> {
    value: Option<T>,
    seen: bool,
    attrs: AttributeSkip,
}

impl<T> Default for Scalar<T> {
    fn default() -> Self {
        Self {
            value: None,
            seen: false,
            attrs: AttributeSkip::default(),
        }
    }
}

impl<T> Scalar<T> {
    /// Create an empty scalar sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The adapted value; `None` for a null reply
    pub fn into_inner(self) -> Option<T> {
        self.value
    }
}

impl<T: FromNode> NodeSink for Scalar<T> {
    fn on_node(&mut self, node: Node) -> RespResult<()> {
        if self.attrs.swallow(&node) {
            return Ok(());
        }
        if node.is_aggregate()
            || matches!(
                node.kind,
                RespType::StreamedString | RespType::StreamedStringPart
            )
        {
            return Err(RespError::Type(format!(
                "expected a scalar reply, found {}",
                node.kind
            )));
        }
        if self.seen {
            return Err(RespError::Type(
                "expected exactly one element in scalar reply".to_string(),
            ));
        }
        self.seen = true;
        if node.kind != RespType::Null {
            self.value = Some(T::from_node(&node)?);
        }
        Ok(())
    }
}

/// Adapts a flat array or set reply into a `Vec<T>`
///
/// A bare leaf is accepted as a one-element sequence: some server versions
/// answer `LPOP` with a single blob string where others answer with an
/// array, and neither shape should be rejected. A null reply yields an
/// empty sequence.
#[derive(Debug)]
pub struct Sequence<T> {
    items: Vec<T>,
    header_seen: bool,
    attrs: AttributeSkip,
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            header_seen: false,
            attrs: AttributeSkip::default(),
        }
    }
}

impl<T> Sequence<T> {
    /// Create an empty sequence sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The adapted elements
    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T: FromNode> NodeSink for Sequence<T> {
    fn on_node(&mut self, node: Node) -> RespResult<()> {
        if self.attrs.swallow(&node) {
            return Ok(());
        }
        if !self.header_seen {
            return match node.kind {
                RespType::Array | RespType::Set | RespType::Push => {
                    self.header_seen = true;
                    Ok(())
                }
                RespType::Null => Ok(()),
                RespType::Map | RespType::Attribute => Err(RespError::Type(format!(
                    "expected a sequence reply, found {}",
                    node.kind
                ))),
                RespType::StreamedString | RespType::StreamedStringPart => {
                    Err(RespError::Type(
                        "streamed string cannot adapt to a sequence".to_string(),
                    ))
                }
                _ => {
                    self.items.push(T::from_node(&node)?);
                    Ok(())
                }
            };
        }
        if node.is_aggregate() {
            return Err(RespError::Type(format!(
                "nested {} in flat sequence",
                node.kind
            )));
        }
        if node.kind == RespType::Null {
            return Err(RespError::Type("null element in sequence".to_string()));
        }
        self.items.push(T::from_node(&node)?);
        Ok(())
    }
}

/// Adapts a map reply into insertion-ordered `(K, V)` entries
#[derive(Debug)]
pub struct Pairs<K, V> {
    entries: Vec<(K, V)>,
    pending_key: Option<K>,
    header_seen: bool,
    attrs: AttributeSkip,
}

impl<K, V> Default for Pairs<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            pending_key: None,
            header_seen: false,
            attrs: AttributeSkip::default(),
        }
    }
}

impl<K, V> Pairs<K, V> {
    /// Create an empty pair sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The adapted entries, in server order
    pub fn into_inner(self) -> Vec<(K, V)> {
        self.entries
    }
}

impl<K: FromNode, V: FromNode> NodeSink for Pairs<K, V> {
    fn on_node(&mut self, node: Node) -> RespResult<()> {
        if self.attrs.swallow(&node) {
            return Ok(());
        }
        if !self.header_seen {
            return match node.kind {
                RespType::Map => {
                    self.header_seen = true;
                    Ok(())
                }
                RespType::Null => Ok(()),
                other => Err(RespError::Type(format!(
                    "expected a map reply, found {}",
                    other
                ))),
            };
        }
        if node.is_aggregate() {
            return Err(RespError::Type(format!(
                "nested {} in flat map",
                node.kind
            )));
        }
        match self.pending_key.take() {
            None => {
                self.pending_key = Some(K::from_node(&node)?);
            }
            Some(key) => {
                self.entries.push((key, V::from_node(&node)?));
            }
        }
        Ok(())
    }
}

/// Feed an already-collected reply through a sink
///
/// # Errors
///
/// Propagates the first sink error.
pub fn adapt<S: NodeSink>(nodes: &[Node], sink: &mut S) -> RespResult<()> {
    for node in nodes {
        sink.on_node(node.clone())?;
    }
    Ok(())
}

/// Adapt a reply into a single optional value
///
/// # Errors
///
/// Returns `RespError::Type` when the reply is not a scalar.
pub fn scalar<T: FromNode>(nodes: &[Node]) -> RespResult<Option<T>> {
    let mut sink = Scalar::new();
    adapt(nodes, &mut sink)?;
    Ok(sink.into_inner())
}

/// Adapt a reply into a typed list
///
/// # Errors
///
/// Returns `RespError::Type` when the reply is not a flat sequence.
pub fn sequence<T: FromNode>(nodes: &[Node]) -> RespResult<Vec<T>> {
    let mut sink = Sequence::new();
    adapt(nodes, &mut sink)?;
    Ok(sink.into_inner())
}

/// Adapt a reply into insertion-ordered map entries
///
/// # Errors
///
/// Returns `RespError::Type` when the reply is not a flat map.
pub fn pairs<K: FromNode, V: FromNode>(nodes: &[Node]) -> RespResult<Vec<(K, V)>> {
    let mut sink = Pairs::new();
    adapt(nodes, &mut sink)?;
    Ok(sink.into_inner())
}

/// The first node of the reply proper, past any leading attribute metadata
#[must_use]
pub fn payload(nodes: &[Node]) -> Option<&Node> {
    let mut skip = AttributeSkip::default();
    nodes.iter().find(|node| !skip.swallow(node))
}
