//! TCP connection setup
//!
//! The engine owns the byte-stream for the lifetime of a connection; this
//! module only produces it. Connect is guarded by the configured timeout,
//! keepalive is applied through `socket2`, and Nagle is disabled since the
//! engine already batches writes itself.

use crate::core::{
    config::ConnectionConfig,
    error::{RespError, RespResult},
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Open a TCP connection to the configured endpoint
///
/// # Errors
///
/// `RespError::Timeout` when the connect timeout elapses,
/// `RespError::Connection` when the connect itself fails.
pub async fn connect(config: &ConnectionConfig) -> RespResult<TcpStream> {
    let addr = config.addr();
    debug!("connecting to {}", addr);

    let stream = timeout(config.connect_timeout, TcpStream::connect(addr.as_str()))
        .await
        .map_err(|_| RespError::Timeout)?
        .map_err(|e| RespError::Connection(format!("failed to connect to {}: {}", addr, e)))?;

    let stream = if let Some(keepalive) = config.tcp_keepalive {
        let socket = socket2::Socket::from(stream.into_std()?);
        let params = socket2::TcpKeepalive::new().with_time(keepalive);
        socket
            .set_tcp_keepalive(&params)
            .map_err(|e| RespError::Connection(format!("failed to set TCP keepalive: {}", e)))?;
        TcpStream::from_std(socket.into())?
    } else {
        stream
    };

    stream.set_nodelay(true)?;
    debug!("connected to {}", addr);
    Ok(stream)
}
