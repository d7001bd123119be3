//! Wire-level tests for the RESP3 parser

use redis_wire::{Node, Parser, RespError, RespType};

fn parse(input: &[u8]) -> (Vec<Node>, usize) {
    let mut nodes = Vec::new();
    let consumed = Parser::parse(input, &mut nodes)
        .expect("parse failed")
        .expect("input was incomplete");
    (nodes, consumed)
}

fn parse_err(input: &[u8]) -> RespError {
    let mut nodes = Vec::new();
    Parser::parse(input, &mut nodes).expect_err("expected a parse failure")
}

fn leaf(kind: RespType, depth: usize, value: &str) -> Node {
    Node::leaf(kind, depth, value.to_string())
}

fn blob(depth: usize, value: &str) -> Node {
    leaf(RespType::BlobString, depth, value)
}

#[test]
fn test_leaf_types() {
    assert_eq!(parse(b"+OK\r\n").0, vec![leaf(RespType::SimpleString, 0, "OK")]);
    assert_eq!(
        parse(b"-ERR unknown command\r\n").0,
        vec![leaf(RespType::SimpleError, 0, "ERR unknown command")]
    );
    assert_eq!(parse(b":-42\r\n").0, vec![leaf(RespType::Number, 0, "-42")]);
    assert_eq!(parse(b"#t\r\n").0, vec![leaf(RespType::Boolean, 0, "t")]);
    assert_eq!(parse(b"#f\r\n").0, vec![leaf(RespType::Boolean, 0, "f")]);
    assert_eq!(parse(b"_\r\n").0, vec![leaf(RespType::Null, 0, "")]);
    assert_eq!(
        parse(b"(3492890328409238509324850943850943825024385\r\n").0,
        vec![leaf(
            RespType::BigNumber,
            0,
            "3492890328409238509324850943850943825024385"
        )]
    );
    assert_eq!(
        parse(b"!21\r\nSYNTAX invalid syntax\r\n").0,
        vec![leaf(RespType::BlobError, 0, "SYNTAX invalid syntax")]
    );
    assert_eq!(
        parse(b"=15\r\ntxt:Some string\r\n").0,
        vec![leaf(RespType::VerbatimString, 0, "txt:Some string")]
    );
}

#[test]
fn test_doubles_including_non_finite() {
    assert_eq!(parse(b",1.23\r\n").0, vec![leaf(RespType::Double, 0, "1.23")]);
    assert_eq!(parse(b",inf\r\n").0, vec![leaf(RespType::Double, 0, "inf")]);
    assert_eq!(parse(b",-inf\r\n").0, vec![leaf(RespType::Double, 0, "-inf")]);
    assert_eq!(parse(b",nan\r\n").0, vec![leaf(RespType::Double, 0, "nan")]);
}

#[test]
fn test_zero_length_blob() {
    let (nodes, consumed) = parse(b"$0\r\n\r\n");
    assert_eq!(consumed, 6);
    assert_eq!(nodes, vec![blob(0, "")]);
}

#[test]
fn test_null_aggregates() {
    assert_eq!(parse(b"$-1\r\n").0, vec![leaf(RespType::Null, 0, "")]);
    assert_eq!(parse(b"*-1\r\n").0, vec![leaf(RespType::Null, 0, "")]);
}

#[test]
fn test_empty_array_has_no_children() {
    let (nodes, consumed) = parse(b"*0\r\n");
    assert_eq!(consumed, 4);
    assert_eq!(nodes, vec![Node::header(RespType::Array, 0, 0)]);
}

#[test]
fn test_flat_array() {
    let (nodes, _) =
        parse(b"*6\r\n$1\r\n1\r\n$1\r\n2\r\n$1\r\n3\r\n$1\r\n4\r\n$1\r\n5\r\n$1\r\n6\r\n");
    let mut expected = vec![Node::header(RespType::Array, 6, 0)];
    for i in 1..=6 {
        expected.push(blob(1, &i.to_string()));
    }
    assert_eq!(nodes, expected);
}

#[test]
fn test_map_counts_pairs() {
    let (nodes, _) =
        parse(b"%2\r\n$6\r\nfield1\r\n$6\r\nvalue1\r\n$6\r\nfield2\r\n$6\r\nvalue2\r\n");
    assert_eq!(
        nodes,
        vec![
            Node::header(RespType::Map, 2, 0),
            blob(1, "field1"),
            blob(1, "value1"),
            blob(1, "field2"),
            blob(1, "value2"),
        ]
    );
}

#[test]
fn test_set() {
    let (nodes, _) = parse(b"~3\r\n$1\r\n1\r\n$1\r\n2\r\n$1\r\n3\r\n");
    assert_eq!(
        nodes,
        vec![
            Node::header(RespType::Set, 3, 0),
            blob(1, "1"),
            blob(1, "2"),
            blob(1, "3"),
        ]
    );
}

#[test]
fn test_push_frame() {
    let (nodes, _) = parse(b">3\r\n$9\r\nsubscribe\r\n$7\r\nchannel\r\n:1\r\n");
    assert_eq!(
        nodes,
        vec![
            Node::header(RespType::Push, 3, 0),
            blob(1, "subscribe"),
            blob(1, "channel"),
            leaf(RespType::Number, 1, "1"),
        ]
    );
}

#[test]
fn test_transaction_reply_tree() {
    // EXEC reply: [PONG, [4, 5], PONG]
    let (nodes, _) = parse(b"*3\r\n+PONG\r\n*2\r\n$1\r\n4\r\n$1\r\n5\r\n+PONG\r\n");
    assert_eq!(
        nodes,
        vec![
            Node::header(RespType::Array, 3, 0),
            leaf(RespType::SimpleString, 1, "PONG"),
            Node::header(RespType::Array, 2, 1),
            blob(2, "4"),
            blob(2, "5"),
            leaf(RespType::SimpleString, 1, "PONG"),
        ]
    );
}

#[test]
fn test_deeply_nested_aggregates() {
    let (nodes, _) = parse(b"*1\r\n*1\r\n*1\r\n:7\r\n");
    assert_eq!(
        nodes,
        vec![
            Node::header(RespType::Array, 1, 0),
            Node::header(RespType::Array, 1, 1),
            Node::header(RespType::Array, 1, 2),
            leaf(RespType::Number, 3, "7"),
        ]
    );
}

#[test]
fn test_attribute_precedes_decorated_item() {
    let (nodes, consumed) = parse(b"|1\r\n$3\r\nttl\r\n:3600\r\n+OK\r\n");
    assert_eq!(
        nodes,
        vec![
            Node::header(RespType::Attribute, 1, 0),
            blob(1, "ttl"),
            leaf(RespType::Number, 1, "3600"),
            leaf(RespType::SimpleString, 0, "OK"),
        ]
    );
    // the attribute and its value are one reply
    assert_eq!(consumed, b"|1\r\n$3\r\nttl\r\n:3600\r\n+OK\r\n".len());
}

#[test]
fn test_attribute_inside_aggregate() {
    let (nodes, _) = parse(b"*2\r\n|1\r\n$1\r\nk\r\n:1\r\n:10\r\n:20\r\n");
    assert_eq!(
        nodes,
        vec![
            Node::header(RespType::Array, 2, 0),
            Node::header(RespType::Attribute, 1, 1),
            blob(2, "k"),
            leaf(RespType::Number, 2, "1"),
            leaf(RespType::Number, 1, "10"),
            leaf(RespType::Number, 1, "20"),
        ]
    );
}

#[test]
fn test_streamed_string_chunks() {
    let wire = b"$?\r\n;2\r\naa\r\n;2\r\nbb\r\n;3\r\nccc\r\n;0\r\n";
    let (nodes, consumed) = parse(wire);
    assert_eq!(consumed, wire.len());
    assert_eq!(
        nodes,
        vec![
            Node::header(RespType::StreamedString, 0, 0),
            leaf(RespType::StreamedStringPart, 1, "aa"),
            leaf(RespType::StreamedStringPart, 1, "bb"),
            leaf(RespType::StreamedStringPart, 1, "ccc"),
        ]
    );
}

#[test]
fn test_streamed_string_inside_array() {
    let (nodes, _) = parse(b"*2\r\n$?\r\n;2\r\nhi\r\n;0\r\n:5\r\n");
    assert_eq!(
        nodes,
        vec![
            Node::header(RespType::Array, 2, 0),
            Node::header(RespType::StreamedString, 0, 1),
            leaf(RespType::StreamedStringPart, 2, "hi"),
            leaf(RespType::Number, 1, "5"),
        ]
    );
}

#[test]
fn test_streamed_aggregates() {
    let (nodes, _) = parse(b"*?\r\n:1\r\n:2\r\n.\r\n");
    assert_eq!(
        nodes,
        vec![
            Node::header(RespType::Array, 0, 0),
            leaf(RespType::Number, 1, "1"),
            leaf(RespType::Number, 1, "2"),
        ]
    );

    let (nodes, _) = parse(b"%?\r\n+a\r\n:1\r\n+b\r\n:2\r\n.\r\n");
    assert_eq!(
        nodes,
        vec![
            Node::header(RespType::Map, 0, 0),
            leaf(RespType::SimpleString, 1, "a"),
            leaf(RespType::Number, 1, "1"),
            leaf(RespType::SimpleString, 1, "b"),
            leaf(RespType::Number, 1, "2"),
        ]
    );

    let (nodes, _) = parse(b"~?\r\n+one\r\n.\r\n");
    assert_eq!(
        nodes,
        vec![
            Node::header(RespType::Set, 0, 0),
            leaf(RespType::SimpleString, 1, "one"),
        ]
    );
}

#[test]
fn test_streamed_aggregate_nested_in_counted() {
    let (nodes, _) = parse(b"*2\r\n*?\r\n:1\r\n.\r\n:9\r\n");
    assert_eq!(
        nodes,
        vec![
            Node::header(RespType::Array, 2, 0),
            Node::header(RespType::Array, 0, 1),
            leaf(RespType::Number, 2, "1"),
            leaf(RespType::Number, 1, "9"),
        ]
    );
}

#[test]
fn test_binary_payload_with_embedded_separators() {
    let mut payload = vec![b'a'; 10_000];
    payload[30] = b'\r';
    payload[31] = b'\n';

    let mut wire = format!("${}\r\n", payload.len()).into_bytes();
    wire.extend_from_slice(&payload);
    wire.extend_from_slice(b"\r\n");

    let (nodes, consumed) = parse(&wire);
    assert_eq!(consumed, wire.len());
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].kind, RespType::BlobString);
    assert_eq!(nodes[0].value.as_ref(), payload.as_slice());
}

#[test]
fn test_incomplete_input_at_every_boundary() {
    let wire = b"*2\r\n$5\r\nhello\r\n:42\r\n";
    for cut in 0..wire.len() {
        let mut nodes = Vec::new();
        let outcome = Parser::parse(&wire[..cut], &mut nodes).expect("prefix must not fail");
        assert!(outcome.is_none(), "prefix of {} bytes parsed as complete", cut);
    }
    let (nodes, consumed) = parse(wire);
    assert_eq!(consumed, wire.len());
    assert_eq!(nodes.len(), 3);
}

#[test]
fn test_back_to_back_replies_consume_separately() {
    let wire = b"+OK\r\n:7\r\n";
    let (first, consumed) = parse(wire);
    assert_eq!(first, vec![leaf(RespType::SimpleString, 0, "OK")]);
    let (second, _) = parse(&wire[consumed..]);
    assert_eq!(second, vec![leaf(RespType::Number, 0, "7")]);
}

#[test]
fn test_protocol_errors() {
    assert!(matches!(parse_err(b"*abc\r\n"), RespError::Protocol(_)));
    assert!(matches!(parse_err(b"#x\r\n"), RespError::Protocol(_)));
    assert!(matches!(parse_err(b",zzz\r\n"), RespError::Protocol(_)));
    assert!(matches!(parse_err(b"(12a\r\n"), RespError::Protocol(_)));
    assert!(matches!(parse_err(b"$3\r\nabcXY"), RespError::Protocol(_)));
    assert!(matches!(parse_err(b"%-2\r\n"), RespError::Protocol(_)));
    // sentinel with no streamed aggregate open
    assert!(matches!(parse_err(b".\r\n"), RespError::Protocol(_)));
    // chunk with no streamed string open
    assert!(matches!(parse_err(b";2\r\naa\r\n"), RespError::Protocol(_)));
}

#[test]
fn test_unsupported_marker() {
    assert!(matches!(parse_err(b"@boom\r\n"), RespError::UnsupportedType('@')));
}

/// Re-encode a non-streamed node stream back to wire bytes.
fn rewire(nodes: &[Node]) -> Vec<u8> {
    let mut out = Vec::new();
    for node in nodes {
        match node.kind {
            RespType::SimpleString => line(&mut out, b'+', &node.value),
            RespType::SimpleError => line(&mut out, b'-', &node.value),
            RespType::Number => line(&mut out, b':', &node.value),
            RespType::Double => line(&mut out, b',', &node.value),
            RespType::BigNumber => line(&mut out, b'(', &node.value),
            RespType::Boolean => line(&mut out, b'#', &node.value),
            RespType::Null => out.extend_from_slice(b"_\r\n"),
            RespType::BlobString => bulk(&mut out, b'$', &node.value),
            RespType::BlobError => bulk(&mut out, b'!', &node.value),
            RespType::VerbatimString => bulk(&mut out, b'=', &node.value),
            RespType::Array => line(&mut out, b'*', node.aggregate_size.to_string().as_bytes()),
            RespType::Map => line(&mut out, b'%', node.aggregate_size.to_string().as_bytes()),
            RespType::Set => line(&mut out, b'~', node.aggregate_size.to_string().as_bytes()),
            RespType::Push => line(&mut out, b'>', node.aggregate_size.to_string().as_bytes()),
            RespType::Attribute => {
                line(&mut out, b'|', node.aggregate_size.to_string().as_bytes());
            }
            RespType::StreamedString | RespType::StreamedStringPart => {
                panic!("streamed types have no canonical counted form")
            }
        }
    }
    out
}

fn line(out: &mut Vec<u8>, marker: u8, payload: &[u8]) {
    out.push(marker);
    out.extend_from_slice(payload);
    out.extend_from_slice(b"\r\n");
}

fn bulk(out: &mut Vec<u8>, marker: u8, payload: &[u8]) {
    out.push(marker);
    out.extend_from_slice(payload.len().to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(payload);
    out.extend_from_slice(b"\r\n");
}

#[test]
fn test_canonical_reserialization_round_trip() {
    let wire: &[u8] = b"|1\r\n$4\r\nmeta\r\n:9\r\n*4\r\n+PONG\r\n%1\r\n$1\r\nk\r\n~2\r\n:1\r\n:2\r\n#t\r\n,3.25\r\n";
    let (nodes, consumed) = parse(wire);
    assert_eq!(consumed, wire.len());
    assert_eq!(rewire(&nodes), wire);
}
