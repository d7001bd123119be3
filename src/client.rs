//! The pipelined request/response engine
//!
//! One [`Client`] drives one connection. All connection state (the parser
//! buffer, the in-flight command FIFO, the write queue) is owned by the
//! single task executing [`Client::run`], so no locking is involved.
//! Submissions from other tasks cross over on an mpsc channel through a
//! cloneable [`ClientHandle`].
//!
//! The engine speaks `HELLO` first on every connection, then matches each
//! complete non-push reply to the oldest in-flight command tag and hands the
//! pair to the reply handler. Push frames bypass the FIFO entirely and go to
//! the push handler (or a [`PushStream`]). A reply carrying a server error
//! is an ordinary reply; only malformed data, I/O failures and cancellation
//! terminate the connection.
//!
//! # Example
//!
//! ```no_run
//! use redis_wire::{Client, Command, ConnectionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new(ConnectionConfig::default());
//!     client.set_reply_handler(|cmd, reply| {
//!         println!("{} -> {:?}", cmd, reply);
//!     });
//!     client.send(Command::Ping, &[]);
//!     client.send(Command::Quit, &[]);
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

use crate::adapter;
use crate::command::Command;
use crate::connection;
use crate::core::{
    config::ConnectionConfig,
    error::{RespError, RespResult},
};
use crate::protocol::{Arg, Node, Parser, RespType, Serializer};
use bytes::{Buf, Bytes, BytesMut};
use futures_util::Stream;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Disconnected,
    Handshaking,
    Running,
    Draining,
    Closed,
}

type ReplyHandler = Box<dyn FnMut(Command, RespResult<Vec<Node>>) + Send>;
type PushHandler = Box<dyn FnMut(Vec<Node>) + Send>;

enum Submission {
    Write { bytes: Bytes, tags: Vec<Command> },
    Cancel,
}

/// Cloneable handle for submitting commands to a running engine
///
/// Sends are fire-and-forget: completion is observed through the reply
/// handler registered on the [`Client`].
#[derive(Clone)]
pub struct ClientHandle {
    tx: mpsc::UnboundedSender<Submission>,
}

impl ClientHandle {
    /// Enqueue one command
    ///
    /// # Errors
    ///
    /// Returns `RespError::Cancelled` when the engine is gone.
    pub fn send(&self, cmd: Command, args: &[Arg]) -> RespResult<()> {
        let mut sr = Serializer::new();
        sr.push(cmd, args);
        self.submit(sr)
    }

    /// Enqueue one command with a key and a variable-length tail
    ///
    /// # Errors
    ///
    /// Returns `RespError::Cancelled` when the engine is gone.
    pub fn send_range<I>(&self, cmd: Command, key: &str, items: I) -> RespResult<()>
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        let mut sr = Serializer::new();
        sr.push_range(cmd, key, items);
        self.submit(sr)
    }

    /// Enqueue one command with a key and alternating field/value pairs
    ///
    /// # Errors
    ///
    /// Returns `RespError::Cancelled` when the engine is gone.
    pub fn send_map<I, K, V>(&self, cmd: Command, key: &str, entries: I) -> RespResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Arg>,
        V: Into<Arg>,
    {
        let mut sr = Serializer::new();
        sr.push_map(cmd, key, entries);
        self.submit(sr)
    }

    /// Cancel the connection; pending submissions fail with `Cancelled`
    pub fn cancel(&self) {
        let _ = self.tx.send(Submission::Cancel);
    }

    fn submit(&self, mut sr: Serializer) -> RespResult<()> {
        let bytes = sr.take_request();
        let tags = sr.take_commands().into_iter().collect();
        self.tx
            .send(Submission::Write { bytes, tags })
            .map_err(|_| RespError::Cancelled)
    }
}

/// Server push frames as an asynchronous stream
///
/// Obtained from [`Client::push_stream`]; each item is the node list of one
/// push frame, in arrival order.
pub struct PushStream {
    rx: mpsc::UnboundedReceiver<Vec<Node>>,
}

impl PushStream {
    /// Receive the next push frame, or `None` once the engine is gone
    pub async fn next_frame(&mut self) -> Option<Vec<Node>> {
        self.rx.recv().await
    }
}

impl Stream for PushStream {
    type Item = Vec<Node>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// A pipelined RESP3 client engine bound to one connection
pub struct Client {
    config: ConnectionConfig,
    state: State,
    /// Tags of submitted commands still awaiting a reply, oldest first
    pending: VecDeque<Command>,
    /// Request bytes queued before the connection is running
    outbox: BytesMut,
    quit_queued: bool,
    reply_handler: Option<ReplyHandler>,
    push_handler: Option<PushHandler>,
    push_tx: Option<mpsc::UnboundedSender<Vec<Node>>>,
    tx: mpsc::UnboundedSender<Submission>,
    rx: mpsc::UnboundedReceiver<Submission>,
}

impl Client {
    /// Create a new engine in the disconnected state
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            state: State::Disconnected,
            pending: VecDeque::new(),
            outbox: BytesMut::new(),
            quit_queued: false,
            reply_handler: None,
            push_handler: None,
            push_tx: None,
            tx,
            rx,
        }
    }

    /// A cloneable handle for cross-task submission and cancellation
    #[must_use]
    pub fn handle(&self) -> ClientHandle {
        ClientHandle {
            tx: self.tx.clone(),
        }
    }

    /// Register the reply callback, invoked once per non-push reply with the
    /// originating command tag and the reply's node list
    ///
    /// Pending commands receive `Err(RespError::Cancelled)` when the
    /// connection terminates before their reply arrives.
    pub fn set_reply_handler<F>(&mut self, handler: F)
    where
        F: FnMut(Command, RespResult<Vec<Node>>) + Send + 'static,
    {
        self.reply_handler = Some(Box::new(handler));
    }

    /// Register the push callback, invoked once per server push frame
    pub fn set_push_handler<F>(&mut self, handler: F)
    where
        F: FnMut(Vec<Node>) + Send + 'static,
    {
        self.push_handler = Some(Box::new(handler));
    }

    /// Receive push frames as a stream instead of a callback
    ///
    /// Takes precedence over a registered push handler until the stream is
    /// dropped.
    pub fn push_stream(&mut self) -> PushStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push_tx = Some(tx);
        PushStream { rx }
    }

    /// Enqueue one command; completion is signaled through the reply handler
    pub fn send(&mut self, cmd: Command, args: &[Arg]) {
        let mut sr = Serializer::new();
        sr.push(cmd, args);
        self.enqueue(sr);
    }

    /// Enqueue one command with a key and a variable-length tail
    pub fn send_range<I>(&mut self, cmd: Command, key: &str, items: I)
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        let mut sr = Serializer::new();
        sr.push_range(cmd, key, items);
        self.enqueue(sr);
    }

    /// Enqueue one command with a key and alternating field/value pairs
    pub fn send_map<I, K, V>(&mut self, cmd: Command, key: &str, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Arg>,
        V: Into<Arg>,
    {
        let mut sr = Serializer::new();
        sr.push_map(cmd, key, entries);
        self.enqueue(sr);
    }

    /// Cancel the connection; `run` returns and pending submissions fail
    /// with `Cancelled`
    pub fn cancel(&self) {
        let _ = self.tx.send(Submission::Cancel);
    }

    /// Connect to the configured endpoint and drive the connection until it
    /// closes
    ///
    /// # Errors
    ///
    /// Connect, protocol and I/O failures. A drained `QUIT` shutdown and an
    /// explicit cancel both return `Ok(())`.
    pub async fn run(&mut self) -> RespResult<()> {
        let stream = connection::connect(&self.config).await?;
        self.run_on(stream).await
    }

    /// Drive the connection over an already-established byte-stream
    ///
    /// Sends the `HELLO` handshake first, then enters the steady state:
    /// drain the write queue, parse replies, route them. Returns when the
    /// connection closes.
    ///
    /// # Errors
    ///
    /// Protocol and I/O failures; see [`Client::run`].
    pub async fn run_on<S>(&mut self, stream: S) -> RespResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        // The handshake goes on the wire before anything already queued.
        let mut sr = Serializer::new();
        sr.push(
            Command::Hello,
            &[Arg::Int(i64::from(self.config.protocol_version))],
        );
        let hello = sr.take_request();
        let mut outbox = BytesMut::with_capacity(hello.len() + self.outbox.len());
        outbox.extend_from_slice(&hello);
        outbox.extend_from_slice(&self.outbox);
        self.outbox.clear();
        self.pending.push_front(Command::Hello);
        self.state = State::Handshaking;
        debug!("handshaking, {} commands queued", self.pending.len());

        let (mut rd, mut wr) = tokio::io::split(stream);
        let mut read_buf = BytesMut::with_capacity(8192);
        let mut nodes: Vec<Node> = Vec::new();

        loop {
            tokio::select! {
                maybe = self.rx.recv() => {
                    match maybe {
                        Some(Submission::Write { bytes, tags }) => {
                            if self.quit_queued || self.state == State::Draining {
                                warn!("dropping submission issued after QUIT");
                            } else {
                                if tags.contains(&Command::Quit) {
                                    self.quit_queued = true;
                                }
                                outbox.extend_from_slice(&bytes);
                                self.pending.extend(tags);
                            }
                        }
                        Some(Submission::Cancel) => {
                            info!("connection cancelled");
                            self.fail_pending();
                            self.state = State::Closed;
                            return Ok(());
                        }
                        // the engine holds a sender, so the channel stays open
                        None => {}
                    }
                }
                written = wr.write_buf(&mut outbox), if !outbox.is_empty() => {
                    if let Err(e) = written {
                        self.fail_pending();
                        self.state = State::Closed;
                        return Err(RespError::Io(e));
                    }
                }
                read = rd.read_buf(&mut read_buf) => {
                    let n = match read {
                        Ok(n) => n,
                        Err(e) => {
                            self.fail_pending();
                            self.state = State::Closed;
                            return Err(RespError::Io(e));
                        }
                    };
                    if n == 0 {
                        let drained = self.state == State::Draining;
                        self.fail_pending();
                        self.state = State::Closed;
                        if drained {
                            debug!("connection drained");
                            return Ok(());
                        }
                        return Err(RespError::Connection(
                            "connection closed by server".to_string(),
                        ));
                    }
                    loop {
                        nodes.clear();
                        match Parser::parse(&read_buf, &mut nodes) {
                            Ok(Some(consumed)) => {
                                read_buf.advance(consumed);
                                let reply = std::mem::take(&mut nodes);
                                if let Err(e) = self.dispatch(reply) {
                                    self.fail_pending();
                                    self.state = State::Closed;
                                    return Err(e);
                                }
                            }
                            Ok(None) => break,
                            Err(e) => {
                                warn!("fatal protocol failure: {}", e);
                                self.fail_pending();
                                self.state = State::Closed;
                                return Err(e);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Serialize locally and queue bytes plus tags for the next run
    fn enqueue(&mut self, mut sr: Serializer) {
        if self.quit_queued || matches!(self.state, State::Draining | State::Closed) {
            warn!("dropping submission issued after QUIT");
            return;
        }
        let tags = sr.take_commands();
        if tags.contains(&Command::Quit) {
            self.quit_queued = true;
        }
        self.outbox.extend_from_slice(&sr.take_request());
        self.pending.extend(tags);
    }

    /// Route one complete top-level reply
    fn dispatch(&mut self, nodes: Vec<Node>) -> RespResult<()> {
        let (top_kind, top_value) = match adapter::payload(&nodes) {
            Some(node) => (node.kind, node.value.clone()),
            None => return Err(RespError::Protocol("empty reply".to_string())),
        };

        if top_kind == RespType::Push {
            self.deliver_push(nodes);
            return Ok(());
        }

        let Some(tag) = self.pending.pop_front() else {
            return Err(RespError::Protocol(
                "reply without a matching command".to_string(),
            ));
        };

        if self.state == State::Handshaking {
            if matches!(top_kind, RespType::SimpleError | RespType::BlobError) {
                return Err(RespError::Connection(format!(
                    "HELLO rejected: {}",
                    String::from_utf8_lossy(&top_value)
                )));
            }
            info!(
                "handshake complete, protocol version {}",
                self.config.protocol_version
            );
            self.state = State::Running;
        }

        if tag == Command::Quit {
            debug!("QUIT acknowledged, draining");
            self.state = State::Draining;
        }

        if let Some(handler) = self.reply_handler.as_mut() {
            handler(tag, Ok(nodes));
        } else {
            debug!("no reply handler registered, dropping {} reply", tag);
        }
        Ok(())
    }

    fn deliver_push(&mut self, nodes: Vec<Node>) {
        let nodes = if let Some(tx) = &self.push_tx {
            match tx.send(nodes) {
                Ok(()) => return,
                Err(mpsc::error::SendError(nodes)) => {
                    debug!("push stream dropped, falling back to push handler");
                    self.push_tx = None;
                    nodes
                }
            }
        } else {
            nodes
        };
        if let Some(handler) = self.push_handler.as_mut() {
            handler(nodes);
        } else {
            debug!("dropping unsolicited push frame");
        }
    }

    /// Fail every still-queued tag with `Cancelled`, oldest first
    fn fail_pending(&mut self) {
        while let Some(tag) = self.pending.pop_front() {
            if let Some(handler) = self.reply_handler.as_mut() {
                handler(tag, Err(RespError::Cancelled));
            }
        }
    }
}
