//! TCP transport layer for the task server.
//!
//! Accepts connections, gates them through the admission pool and runs each
//! admitted connection as its own session task.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::context::ServerContext;
use crate::error::StartupError;

use super::session::Session;

/// Manages the TCP transport layer.
pub struct Transport {
    listener: TcpListener,
    ctx: ServerContext,
}

impl Transport {
    /// Bind the configured address. Failure here is fatal to the server.
    pub async fn bind(ctx: ServerContext) -> Result<Self, StartupError> {
        let addr = ctx.config.bind_addr();
        let listener = match TcpListener::bind(addr.as_str()).await {
            Ok(listener) => listener,
            Err(source) => return Err(StartupError::Bind { addr, source }),
        };

        Ok(Self { listener, ctx })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn context(&self) -> &ServerContext {
        &self.ctx
    }

    /// Accept connections until the process exits.
    ///
    /// The accept loop itself waits for a free admission slot before spawning
    /// a session, so at most `MaxConcurrentConnections` sessions run at once.
    /// Accept errors are logged and never end the loop.
    pub async fn listen(self) -> anyhow::Result<()> {
        let admission = &self.ctx.admission;
        info!(
            addr = %self.local_addr()?,
            max_connections = admission.capacity(),
            "Task server listening"
        );

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    continue;
                }
            };

            if admission.available() == 0 {
                info!(
                    peer = %peer_addr,
                    in_use = admission.in_use(),
                    "All connection slots busy, holding connection"
                );
            }
            let slot = admission
                .acquire()
                .await
                .context("Admission pool closed")?;
            debug!(peer = %peer_addr, in_use = admission.in_use(), "Client admitted");

            let session = Session::new(stream, peer_addr, &self.ctx, slot);
            tokio::spawn(session.run());
        }
    }
}
