//! Asynchronous pipelined RESP3 client engine for Redis 6+
//!
//! `redis-wire` drives a single multiplexed connection: commands are
//! serialized into a pipelined request stream, replies are parsed into a
//! flat node tree and routed back to the submitting command in FIFO order,
//! and server-initiated push frames are delivered out of band.
//!
//! # Features
//!
//! - Full RESP3 codec: deeply nested aggregates, streamed strings and
//!   aggregates, attributes, pushes, binary-safe blobs
//! - Pipelining over one connection with FIFO reply matching
//! - Typed reply adapters (scalar, sequence, map entries, raw nodes)
//! - Mandatory `HELLO` handshake, graceful `QUIT` drain, cooperative
//!   cancellation
//! - Async/await support with Tokio
//!
//! # Quick Start
//!
//! ```no_run
//! use redis_wire::{adapter, Client, Command, ConnectionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new(ConnectionConfig::default());
//!     client.set_reply_handler(|cmd, reply| {
//!         if let (Command::Get, Ok(nodes)) = (cmd, reply) {
//!             let value = adapter::scalar::<String>(&nodes).ok().flatten();
//!             println!("GET -> {:?}", value);
//!         }
//!     });
//!
//!     client.send(Command::Set, &["mykey".into(), "myvalue".into()]);
//!     client.send(Command::Get, &["mykey".into()]);
//!     client.send(Command::Quit, &[]);
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

#![deny(warnings)]
#![warn(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::future_not_send)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]

pub mod adapter;
pub mod client;
pub mod command;
pub mod connection;
pub mod core;
pub mod protocol;

pub use client::{Client, ClientHandle, PushStream};
pub use command::Command;
pub use crate::core::{
    config::ConnectionConfig,
    error::{RespError, RespResult},
};
pub use protocol::{Arg, Node, NodeSink, Parser, RespType, Serializer};
