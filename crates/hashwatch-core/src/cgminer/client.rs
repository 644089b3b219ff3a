//! TCP client for the cgminer API.
//!
//! The protocol has no framing: the miner writes its reply and may or may not
//! close the socket or end with `|`. A reply is considered complete when
//! bytes have arrived and the line then stays quiet for the quiescence
//! interval, when the peer closes, or when the size cap is reached. The read
//! loop as a whole is bounded by `read_loop`.

use std::time::Duration;

use log::debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout};

use super::Command;
use super::parser;
use super::readings::AvalonReadings;
use crate::config::TcpTimeouts;
use crate::error::FetchError;

const READ_CHUNK: usize = 1024;

/// Client for one Avalon Nano. Holds no connection between calls.
#[derive(Debug, Clone)]
pub struct CgminerClient {
    host: String,
    port: u16,
    timeouts: TcpTimeouts,
}

impl CgminerClient {
    pub fn new(host: impl Into<String>, port: u16, timeouts: TcpTimeouts) -> Self {
        Self {
            host: host.into(),
            port,
            timeouts,
        }
    }

    /// `host:port`, as used in error messages and logs.
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Send one command on a fresh connection and return the raw reply text.
    ///
    /// The connection is dropped (and so closed) on every return path.
    pub async fn send(&self, command: Command) -> Result<String, FetchError> {
        let target = self.target();
        let io = self.timeouts.io;

        let mut stream = match timeout(io, TcpStream::connect(target.as_str())).await {
            Err(_) => return Err(FetchError::Timeout { target, after: io }),
            Ok(Err(e)) => {
                return Err(FetchError::Unreachable {
                    target,
                    source: Box::new(e),
                });
            }
            Ok(Ok(stream)) => stream,
        };

        match timeout(io, stream.write_all(command.as_str().as_bytes())).await {
            Err(_) => return Err(FetchError::Timeout { target, after: io }),
            Ok(Err(e)) => {
                return Err(FetchError::Unreachable {
                    target,
                    source: Box::new(e),
                });
            }
            Ok(Ok(())) => {}
        }

        let bytes = match read_response(&mut stream, &self.timeouts).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                return Err(FetchError::Timeout {
                    target,
                    after: self.timeouts.read_loop,
                });
            }
            Err(e) => {
                return Err(FetchError::Unreachable {
                    target,
                    source: Box::new(e),
                });
            }
        };
        drop(stream);

        let text = String::from_utf8_lossy(&bytes).into_owned();
        if text
            .trim_matches(|c: char| c == '\0' || c.is_whitespace())
            .is_empty()
        {
            return Err(FetchError::EmptyResponse { target });
        }
        Ok(text)
    }

    /// Run the four-command acquisition and merge the replies.
    ///
    /// `summary` is primary: a transport failure or a reply without a
    /// `SUMMARY` section fails the acquisition. Failures of the later
    /// commands are logged and leave their fields absent.
    pub async fn acquire(&self) -> Result<AvalonReadings, FetchError> {
        let [primary, rest @ ..] = Command::ACQUISITION_ORDER;

        let raw = self.send(primary).await?;
        let mut readings = parser::parse(&raw, primary);
        if readings.summary.is_none() {
            return Err(FetchError::ProtocolMismatch {
                target: self.target(),
                command: primary.as_str(),
                expected: "SUMMARY",
            });
        }

        for command in rest {
            match self.send(command).await {
                Ok(raw) => {
                    let partial = parser::parse(&raw, command);
                    if command == Command::Estats && partial.estats.is_none() {
                        debug!("{}: estats reply has no MM ID0 sub-record", self.target());
                    }
                    readings.merge(partial);
                }
                Err(e) => debug!("{}: `{command}` skipped ({}): {e}", self.target(), e.kind()),
            }
        }
        Ok(readings)
    }
}

/// Drain the reply. `Ok(None)` means nothing arrived before the deadline.
async fn read_response(
    stream: &mut TcpStream,
    timeouts: &TcpTimeouts,
) -> std::io::Result<Option<Vec<u8>>> {
    let deadline = Instant::now() + timeouts.read_loop;
    let mut buf = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    while buf.len() < timeouts.max_response_bytes {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining == Duration::ZERO {
            break;
        }
        let wait = if buf.is_empty() {
            remaining
        } else {
            timeouts.quiescence.min(remaining)
        };

        match timeout(wait, stream.read(&mut chunk)).await {
            // Quiet for the whole window.
            Err(_) => break,
            Ok(Ok(0)) => return Ok(Some(buf)),
            Ok(Ok(n)) => {
                let room = timeouts.max_response_bytes - buf.len();
                buf.extend_from_slice(&chunk[..n.min(room)]);
            }
            Ok(Err(e)) if buf.is_empty() => return Err(e),
            Ok(Err(_)) => break,
        }
    }

    if buf.is_empty() {
        Ok(None)
    } else {
        Ok(Some(buf))
    }
}
