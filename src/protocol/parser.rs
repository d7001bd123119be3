//! Iterative RESP3 parser
//!
//! The parser consumes exactly one complete top-level reply per invocation,
//! emitting its pre-order node stream into a [`NodeSink`]. Incomplete input
//! is reported as `Ok(None)`; the caller reads more bytes and retries the
//! whole reply (the sink must be reset between attempts). Malformed input
//! and unknown type markers are fatal.
//!
//! Aggregates are traversed with an explicit stack instead of recursion, so
//! arbitrarily deep replies cannot exhaust the call stack. Map and attribute
//! frames account for two child nodes per counted pair. Streamed frames
//! carry no count: a streamed string closes on its `;0` chunk, a streamed
//! aggregate on the `.` sentinel. An attribute never occupies a slot in its
//! parent; the item that follows it lands in the same position.

use crate::core::error::{RespError, RespResult};
use crate::protocol::{Node, NodeSink, RespType};
use bytes::Bytes;

/// Stack frame for one open aggregate. `remaining` is `None` for streamed
/// frames, which are closed by their terminator instead of a count.
struct Frame {
    kind: RespType,
    remaining: Option<usize>,
    depth: usize,
}

/// RESP3 reply parser
pub struct Parser;

impl Parser {
    /// Parse one complete top-level reply from `buf` into `sink`.
    ///
    /// Returns `Ok(Some(consumed))` with the number of bytes the reply
    /// occupied, or `Ok(None)` when the buffer does not yet hold a complete
    /// reply; in that case nodes may already have been emitted and the
    /// sink must be cleared before retrying with more data.
    ///
    /// # Errors
    ///
    /// `RespError::Protocol` for malformed data, `RespError::UnsupportedType`
    /// for unknown type markers; both are fatal for the connection. Sink
    /// errors are propagated as-is.
    pub fn parse(buf: &[u8], sink: &mut dyn NodeSink) -> RespResult<Option<usize>> {
        let mut pos = 0usize;
        let mut stack: Vec<Frame> = Vec::new();

        loop {
            let depth = stack.last().map_or(0, |f| f.depth + 1);
            let Some(&marker) = buf.get(pos) else {
                return Ok(None);
            };
            pos += 1;

            // An open streamed string accepts nothing but chunks.
            if let Some(top) = stack.last() {
                if top.kind == RespType::StreamedString && marker != b';' {
                    return Err(RespError::Protocol(format!(
                        "expected streamed string chunk, found marker {:?}",
                        marker as char
                    )));
                }
            }

            let complete = match marker {
                b'+' | b'-' | b':' | b',' | b'(' | b'#' | b'_' => {
                    let Some((line, next)) = read_line(buf, pos) else {
                        return Ok(None);
                    };
                    pos = next;
                    let kind = validated_line_kind(marker, line)?;
                    sink.on_node(Node::leaf(kind, depth, Bytes::copy_from_slice(line)))?;
                    close_item(&mut stack)
                }
                b'$' | b'!' | b'=' => {
                    let Some((line, next)) = read_line(buf, pos) else {
                        return Ok(None);
                    };
                    pos = next;
                    if line == b"?" {
                        if marker != b'$' {
                            return Err(RespError::Protocol(format!(
                                "marker {:?} cannot open a stream",
                                marker as char
                            )));
                        }
                        sink.on_node(Node::header(RespType::StreamedString, 0, depth))?;
                        stack.push(Frame {
                            kind: RespType::StreamedString,
                            remaining: None,
                            depth,
                        });
                        false
                    } else {
                        let len = parse_int(line, "blob length")?;
                        if len == -1 && marker == b'$' {
                            sink.on_node(Node::leaf(RespType::Null, depth, Bytes::new()))?;
                            close_item(&mut stack)
                        } else if len < 0 {
                            return Err(RespError::Protocol(format!(
                                "invalid blob length {}",
                                len
                            )));
                        } else {
                            let Some(payload) = read_blob(buf, &mut pos, len as usize)? else {
                                return Ok(None);
                            };
                            let kind = match marker {
                                b'$' => RespType::BlobString,
                                b'!' => RespType::BlobError,
                                _ => RespType::VerbatimString,
                            };
                            if kind == RespType::VerbatimString {
                                validate_verbatim(&payload)?;
                            }
                            sink.on_node(Node::leaf(kind, depth, payload))?;
                            close_item(&mut stack)
                        }
                    }
                }
                b'*' | b'%' | b'~' | b'>' | b'|' => {
                    let Some((line, next)) = read_line(buf, pos) else {
                        return Ok(None);
                    };
                    pos = next;
                    let kind = match marker {
                        b'*' => RespType::Array,
                        b'%' => RespType::Map,
                        b'~' => RespType::Set,
                        b'>' => RespType::Push,
                        _ => RespType::Attribute,
                    };
                    if line == b"?" {
                        if matches!(kind, RespType::Push | RespType::Attribute) {
                            return Err(RespError::Protocol(format!(
                                "{} cannot be streamed",
                                kind
                            )));
                        }
                        sink.on_node(Node::header(kind, 0, depth))?;
                        stack.push(Frame {
                            kind,
                            remaining: None,
                            depth,
                        });
                        false
                    } else {
                        let n = parse_int(line, "aggregate count")?;
                        if n == -1 && kind == RespType::Array {
                            // RESP2-style null aggregate
                            sink.on_node(Node::leaf(RespType::Null, depth, Bytes::new()))?;
                            close_item(&mut stack)
                        } else if n < 0 {
                            return Err(RespError::Protocol(format!(
                                "invalid aggregate count {}",
                                n
                            )));
                        } else {
                            let n = n as usize;
                            sink.on_node(Node::header(kind, n, depth))?;
                            let children = if kind.is_pair_aggregate() { 2 * n } else { n };
                            if children > 0 {
                                stack.push(Frame {
                                    kind,
                                    remaining: Some(children),
                                    depth,
                                });
                                false
                            } else if kind == RespType::Attribute {
                                // an empty attribute still decorates the next item
                                false
                            } else {
                                close_item(&mut stack)
                            }
                        }
                    }
                }
                b';' => {
                    let streamed = matches!(
                        stack.last(),
                        Some(f) if f.kind == RespType::StreamedString
                    );
                    if !streamed {
                        return Err(RespError::Protocol(
                            "string chunk outside a streamed string".to_string(),
                        ));
                    }
                    let Some((line, next)) = read_line(buf, pos) else {
                        return Ok(None);
                    };
                    pos = next;
                    let len = parse_int(line, "chunk length")?;
                    if len < 0 {
                        return Err(RespError::Protocol(format!("invalid chunk length {}", len)));
                    }
                    if len == 0 {
                        stack.pop();
                        close_item(&mut stack)
                    } else {
                        let Some(payload) = read_blob(buf, &mut pos, len as usize)? else {
                            return Ok(None);
                        };
                        sink.on_node(Node::leaf(RespType::StreamedStringPart, depth, payload))?;
                        // the enclosing frame is unbounded; chunks do not count down
                        false
                    }
                }
                b'.' => {
                    let Some((line, next)) = read_line(buf, pos) else {
                        return Ok(None);
                    };
                    pos = next;
                    if !line.is_empty() {
                        return Err(RespError::Protocol(
                            "malformed end-of-aggregate sentinel".to_string(),
                        ));
                    }
                    let streamed_aggregate = matches!(
                        stack.last(),
                        Some(f) if f.remaining.is_none() && f.kind != RespType::StreamedString
                    );
                    if !streamed_aggregate {
                        return Err(RespError::Protocol(
                            "end-of-aggregate sentinel outside a streamed aggregate".to_string(),
                        ));
                    }
                    stack.pop();
                    close_item(&mut stack)
                }
                other => return Err(RespError::UnsupportedType(other as char)),
            };

            if complete {
                return Ok(Some(pos));
            }
        }
    }
}

/// Account for one completed item at the current level, popping every frame
/// it fills up. Returns `true` when a top-level item (other than an
/// attribute, which decorates its successor) has been completed.
fn close_item(stack: &mut Vec<Frame>) -> bool {
    loop {
        let Some(top) = stack.last_mut() else {
            return true;
        };
        let Some(rem) = top.remaining.as_mut() else {
            // streamed frame: only its terminator pops it
            return false;
        };
        *rem -= 1;
        if *rem > 0 {
            return false;
        }
        let kind = top.kind;
        stack.pop();
        if kind == RespType::Attribute {
            // the decorated item follows in the same slot
            return false;
        }
        // the popped aggregate is itself one item of its parent
    }
}

fn read_line(buf: &[u8], start: usize) -> Option<(&[u8], usize)> {
    let haystack = buf.get(start..)?;
    let at = haystack.windows(2).position(|w| w == b"\r\n")?;
    Some((&haystack[..at], start + at + 2))
}

/// Read a length-delimited payload plus its trailing CRLF, advancing `pos`.
/// The payload may contain any bytes, including `\r\n`.
fn read_blob(buf: &[u8], pos: &mut usize, len: usize) -> RespResult<Option<Bytes>> {
    let Some(window) = buf.get(*pos..) else {
        return Ok(None);
    };
    if window.len() < len + 2 {
        return Ok(None);
    }
    if &window[len..len + 2] != b"\r\n" {
        return Err(RespError::Protocol("missing blob terminator".to_string()));
    }
    let payload = Bytes::copy_from_slice(&window[..len]);
    *pos += len + 2;
    Ok(Some(payload))
}

fn parse_int(line: &[u8], what: &str) -> RespResult<i64> {
    let text = std::str::from_utf8(line)
        .map_err(|_| RespError::Protocol(format!("non-ASCII {}", what)))?;
    text.parse::<i64>()
        .map_err(|e| RespError::Protocol(format!("invalid {} '{}': {}", what, text, e)))
}

/// Validate a line-framed leaf and map its marker to a node kind.
fn validated_line_kind(marker: u8, line: &[u8]) -> RespResult<RespType> {
    match marker {
        b'+' => Ok(RespType::SimpleString),
        b'-' => Ok(RespType::SimpleError),
        b':' => {
            parse_int(line, "number")?;
            Ok(RespType::Number)
        }
        b',' => {
            let text = std::str::from_utf8(line)
                .map_err(|_| RespError::Protocol("non-ASCII double".to_string()))?;
            text.parse::<f64>()
                .map_err(|e| RespError::Protocol(format!("invalid double '{}': {}", text, e)))?;
            Ok(RespType::Double)
        }
        b'(' => {
            let digits = match line.first() {
                Some(b'+' | b'-') => &line[1..],
                _ => line,
            };
            if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
                return Err(RespError::Protocol("invalid big number".to_string()));
            }
            Ok(RespType::BigNumber)
        }
        b'#' => {
            if line != b"t" && line != b"f" {
                return Err(RespError::Protocol(format!(
                    "invalid boolean {:?}",
                    String::from_utf8_lossy(line)
                )));
            }
            Ok(RespType::Boolean)
        }
        _ => {
            if !line.is_empty() {
                return Err(RespError::Protocol("malformed null".to_string()));
            }
            Ok(RespType::Null)
        }
    }
}

fn validate_verbatim(payload: &[u8]) -> RespResult<()> {
    if payload.len() < 4 || payload[3] != b':' {
        return Err(RespError::Protocol(
            "verbatim string missing encoding prefix".to_string(),
        ));
    }
    Ok(())
}
