//! Server side of one client connection.
//!
//! A session writes the welcome line, then loops: read one line, decode it,
//! dispatch it, write the response. The next line is never read before the
//! current response has been written. Malformed or undispatchable requests are
//! answered with an error envelope and the loop continues; only transport
//! faults (EOF, idle timeout, oversized line, failed write) end the session.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, FramedRead};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::context::ServerContext;
use crate::error::SessionError;
use crate::tasks;

use super::admission::AdmissionSlot;
use super::protocol::{Request, Response};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    PeerClosed,
    IdleTimeout,
    MessageTooLarge,
    ReadFailed,
    WelcomeFailed,
    WriteFailed,
}

impl CloseReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PeerClosed => "peer closed",
            Self::IdleTimeout => "idle timeout",
            Self::MessageTooLarge => "message too large",
            Self::ReadFailed => "read failed",
            Self::WelcomeFailed => "welcome failed",
            Self::WriteFailed => "write failed",
        }
    }
}

enum Frame {
    Line(Bytes),
    Closed(CloseReason),
}

/// Newline framing with a length cap. Bytes left after the last newline when
/// the peer closes are not a request and are dropped.
struct LineCodec(AnyDelimiterCodec);

impl LineCodec {
    fn new(max_length: usize) -> Self {
        Self(AnyDelimiterCodec::new_with_max_length(
            b"\n".to_vec(),
            Vec::new(),
            max_length,
        ))
    }
}

impl Decoder for LineCodec {
    type Item = Bytes;
    type Error = AnyDelimiterCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>, Self::Error> {
        self.0.decode(buf)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>, Self::Error> {
        let line = self.0.decode(buf)?;
        if line.is_none() {
            buf.clear();
        }
        Ok(line)
    }
}

pub(crate) struct Session {
    peer: SocketAddr,
    frames: FramedRead<OwnedReadHalf, LineCodec>,
    writer: OwnedWriteHalf,
    config: Arc<ServerConfig>,
    handled: u64,
    // Dropped together with the socket halves when the session ends.
    _slot: AdmissionSlot,
}

impl Session {
    pub(crate) fn new(
        stream: TcpStream,
        peer: SocketAddr,
        ctx: &ServerContext,
        slot: AdmissionSlot,
    ) -> Self {
        let (reader, writer) = stream.into_split();

        Self {
            peer,
            frames: FramedRead::new(reader, LineCodec::new(ctx.config.max_message_size)),
            writer,
            config: ctx.config.clone(),
            handled: 0,
            _slot: slot,
        }
    }

    /// Drive the session to completion. Consumes the session so the socket
    /// and the admission slot are released on return.
    pub(crate) async fn run(mut self) -> CloseReason {
        info!(peer = %self.peer, "Session opened");
        let reason = self.serve().await;
        info!(
            peer = %self.peer,
            requests = self.handled,
            reason = reason.as_str(),
            "Session closed"
        );
        reason
    }

    async fn serve(&mut self) -> CloseReason {
        let welcome = format!("{}\n", self.config.welcome_message);
        if let Err(e) = self.write(welcome.as_bytes()).await {
            warn!(peer = %self.peer, error = %e, "Failed to send welcome message");
            return CloseReason::WelcomeFailed;
        }

        loop {
            let line = match self.next_frame().await {
                Frame::Line(line) => line,
                Frame::Closed(CloseReason::MessageTooLarge) => {
                    warn!(
                        peer = %self.peer,
                        limit = self.config.max_message_size,
                        "Request exceeds maximum message size"
                    );
                    if let Err(e) = self.respond(&Response::message_too_large()).await {
                        debug!(peer = %self.peer, error = %e, "Failed to send size error");
                    }
                    return CloseReason::MessageTooLarge;
                }
                Frame::Closed(reason) => return reason,
            };

            let response = self.handle_line(&line);
            if let Err(e) = self.respond(&response).await {
                warn!(peer = %self.peer, error = %e, "Failed to send response");
                return CloseReason::WriteFailed;
            }
            self.handled += 1;
        }
    }

    /// Read the next line under a fresh idle deadline.
    async fn next_frame(&mut self) -> Frame {
        let idle = self.config.idle_timeout();
        match timeout(idle, self.frames.next()).await {
            Err(_) => Frame::Closed(CloseReason::IdleTimeout),
            Ok(None) => Frame::Closed(CloseReason::PeerClosed),
            Ok(Some(Ok(line))) => Frame::Line(line),
            Ok(Some(Err(AnyDelimiterCodecError::MaxChunkLengthExceeded))) => {
                Frame::Closed(CloseReason::MessageTooLarge)
            }
            Ok(Some(Err(AnyDelimiterCodecError::Io(e)))) => {
                debug!(peer = %self.peer, error = %e, "Read error");
                Frame::Closed(CloseReason::ReadFailed)
            }
        }
    }

    fn handle_line(&self, line: &[u8]) -> Response {
        // A bare `null` is well-formed JSON and is treated like `{}`.
        let request = match serde_json::from_slice::<Option<Request>>(line) {
            Ok(request) => request.unwrap_or_default(),
            Err(e) => {
                warn!(
                    peer = %self.peer,
                    error = %e,
                    line = %String::from_utf8_lossy(line),
                    "Invalid request"
                );
                return Response::invalid_json();
            }
        };

        debug!(
            peer = %self.peer,
            task = request.task,
            client_id = request.client_id,
            input = %request.input,
            "Processing request"
        );

        let (task, client_id) = (request.task, request.client_id);
        match tasks::dispatch(task, request.input) {
            Ok(result) => Response::success(result),
            Err(e) => {
                warn!(peer = %self.peer, task, client_id, error = %e, "Dispatch failed");
                Response::internal_error()
            }
        }
    }

    async fn respond(&mut self, response: &Response) -> Result<(), SessionError> {
        let line = response.to_line().map_err(SessionError::Encode)?;
        self.write(line.as_bytes()).await?;
        debug!(peer = %self.peer, response = %line.trim_end(), "Response sent");
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        let deadline = self.config.idle_timeout();
        match timeout(deadline, self.writer.write_all(bytes)).await {
            Ok(result) => result.map_err(SessionError::Write),
            Err(_) => Err(SessionError::WriteTimeout(deadline)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unterminated_tail_is_dropped_at_eof() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::from(&b"{\"task\":3}\n{\"task\":4"[..]);

        assert_eq!(
            codec.decode_eof(&mut buf).unwrap(),
            Some(Bytes::from_static(b"{\"task\":3}"))
        );
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_line_waits_for_newline() {
        let mut codec = LineCodec::new(64);
        let mut buf = BytesMut::from(&b"{\"task\""[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b":1}\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Bytes::from_static(b"{\"task\":1}"))
        );
    }
}
