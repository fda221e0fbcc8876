//! Client for the task server.
//!
//! A [`Connection`] reads the welcome line on connect, then exchanges one
//! request line for one response line per call.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

use crate::error::ClientError;

use super::protocol::{Request, Response};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Dials the task server.
#[derive(Debug, Clone)]
pub struct TaskClient {
    addr: String,
    connect_timeout: Duration,
}

/// An open session with the server.
pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    welcome: String,
}

impl TaskClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Dial the server and consume its welcome line.
    pub async fn connect(&self) -> Result<Connection, ClientError> {
        let stream = match timeout(self.connect_timeout, TcpStream::connect(self.addr.as_str())).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(ClientError::Connect {
                    addr: self.addr.clone(),
                    source,
                });
            }
            Err(_) => {
                return Err(ClientError::ConnectTimeout {
                    addr: self.addr.clone(),
                    timeout: self.connect_timeout,
                });
            }
        };

        let (reader, writer) = stream.into_split();
        let mut connection = Connection {
            reader: BufReader::new(reader),
            writer,
            welcome: String::new(),
        };
        connection.welcome = connection.read_line().await?;
        Ok(connection)
    }

    /// Send a single request on a fresh connection.
    pub async fn request(&self, request: &Request) -> Result<Response, ClientError> {
        let mut connection = self.connect().await?;
        connection.call(request).await
    }
}

impl Connection {
    /// The welcome line, without its newline.
    pub fn welcome(&self) -> &str {
        &self.welcome
    }

    /// Send one request and wait for its response. Error envelopes are
    /// returned as `Ok(Response::Error { .. })`.
    pub async fn call(&mut self, request: &Request) -> Result<Response, ClientError> {
        let line = serde_json::to_string(request).map_err(ClientError::Encode)?;
        self.send_line(&line).await?;
        self.read_response().await
    }

    /// Write `line` followed by a newline, as-is.
    pub async fn send_line(&mut self, line: &str) -> Result<(), ClientError> {
        let mut framed = String::with_capacity(line.len() + 1);
        framed.push_str(line);
        framed.push('\n');
        self.writer.write_all(framed.as_bytes()).await?;
        Ok(())
    }

    pub async fn read_response(&mut self) -> Result<Response, ClientError> {
        let line = self.read_line().await?;
        serde_json::from_str(&line).map_err(ClientError::Decode)
    }

    async fn read_line(&mut self) -> Result<String, ClientError> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            return Err(ClientError::Closed);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(line)
    }
}
