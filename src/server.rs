//! TCP listener front end

use std::net::SocketAddr;

use futures::StreamExt;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ServerConfig;
use crate::dispatcher::{DispatchStats, Dispatcher};
use crate::sink::SharedSink;
use crate::{IngestError, Result};

/// Bound telemetry listener.
pub struct Server {
    listener: TcpListener,
    read_buffer_size: usize,
}

impl Server {
    /// Bind the listener described by `config`.
    ///
    /// This is the only fallible step of serving; once bound, every failure
    /// is contained to the connection it happened on.
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let addr = config.socket_addr();
        let listener =
            TcpListener::bind(addr).await.map_err(|e| IngestError::bind_failed(addr, e))?;
        info!("Telemetry listener bound to {}", listener.local_addr()?);
        Ok(Self { listener, read_buffer_size: config.read_buffer_size })
    }

    /// Address the listener actually bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `cancel` fires, one session per connection.
    pub async fn run(self, sink: SharedSink, cancel: CancellationToken) -> DispatchStats {
        let dispatcher = Dispatcher::new(sink).with_read_buffer_size(self.read_buffer_size);
        let connections = TcpListenerStream::new(self.listener).map(|accepted| {
            accepted.map(|stream| {
                let peer = stream
                    .peer_addr()
                    .map(|addr| addr.to_string())
                    .unwrap_or_else(|_| String::from("<unknown>"));
                (stream, peer)
            })
        });
        dispatcher.run(connections, cancel).await
    }
}
