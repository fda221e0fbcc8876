//! Task server and client over TCP.
//!
//! ## Architecture
//!
//! - `protocol`: request/response envelopes
//! - `admission`: counting pool bounding concurrent sessions
//! - `transport`: TCP listener with admission control
//! - `session`: per-connection welcome/read/dispatch/write loop
//! - `client`: client for talking to the server

mod admission;
pub mod client;
mod protocol;
mod session;
mod transport;

use std::net::SocketAddr;

use crate::config::ServerConfig;
use crate::context::ServerContext;
use crate::error::StartupError;
use transport::Transport;

pub use admission::{AdmissionPool, AdmissionSlot};
pub use client::{Connection, TaskClient};
pub use protocol::{INTERNAL_ERROR, INVALID_JSON, MESSAGE_TOO_LARGE, Request, Response};
pub use session::CloseReason;

/// Server that exposes the task registry to TCP clients.
pub struct TaskServer {
    transport: Transport,
}

impl TaskServer {
    /// Bind the configured address without accepting yet.
    pub async fn bind(config: ServerConfig) -> Result<Self, StartupError> {
        let ctx = ServerContext::new(config);
        let transport = Transport::bind(ctx).await?;
        Ok(Self { transport })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    pub fn admission(&self) -> AdmissionPool {
        self.transport.context().admission.clone()
    }

    /// Serve connections. Only returns on an unrecoverable listener fault.
    pub async fn serve(self) -> anyhow::Result<()> {
        self.transport.listen().await
    }
}
