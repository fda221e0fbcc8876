//! Error types shared across the server, the task registry and the driver.
//!
//! Only [`StartupError`] is fatal. Everything else is scoped to a single
//! request, session or logical client.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::tasks::{InputShape, Task};

/// Failures that abort a process before it starts serving or driving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("failed to load configuration: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read manifest {}: {source}", .path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest: {0}")]
    ManifestParse(#[source] serde_json::Error),

    #[error("no request for task {0} in manifest")]
    MissingTask(i64),
}

impl From<figment::Error> for StartupError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

/// A request that decoded fine but could not be computed.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown task number: {0}")]
    UnknownTask(i64),

    #[error("invalid input format for task {task}: expected {expected}: {source}")]
    InvalidInput {
        task: Task,
        expected: InputShape,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid arguments for task {task}: {reason}")]
    InvalidArguments { task: Task, reason: String },

    #[error("arithmetic overflow in task {0}")]
    Overflow(Task),

    #[error("failed to encode result: {0}")]
    Encode(#[source] serde_json::Error),
}

impl DispatchError {
    pub(crate) fn invalid(task: Task, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            task,
            reason: reason.into(),
        }
    }
}

/// Transport faults that end one server-side session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Failures of one logical client in the driver.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("communication error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server closed the connection")]
    Closed,

    #[error("failed to serialize request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to parse response: {0}")]
    Decode(#[source] serde_json::Error),
}
