//! Stop-and-wait request/response transport.
//!
//! [`ReliableTransport`] owns the socket, the server address, the one-bit
//! [`SessionState`] and the [`RetryPolicy`].  It does not know what a
//! request means; callers hand it encoded bytes built with the sequence bit
//! from [`ReliableTransport::expected_seq`] and get back the body of the
//! matching reply.
//!
//! # Stop-and-wait contract
//! - At most **one** request is outstanding.  `send` takes `&mut self`, so
//!   two callers cannot interleave on one transport.
//! - Each attempt transmits the request, then waits up to `timeout` for any
//!   datagram on the socket.
//! - A reply whose sequence digit equals the expected bit completes the
//!   exchange: the bit toggles and the body is returned.
//! - A timeout, a mismatched digit, or an undecodable header moves on to the
//!   next attempt, which resends the request.  A mismatch does not keep
//!   waiting out the rest of the window.
//! - A transient receive error (a stale ICMP report, an interrupted read)
//!   does not end the attempt; the wait resumes until the same deadline.
//! - After `retries` attempts the exchange fails with
//!   [`TransportError::Unresponsive`] and the bit is left alone.
//! - The reply checksum is never verified.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::time::{timeout_at, Instant};

use crate::config::{ClientConfig, ConfigError, RetryPolicy};
use crate::packet::{Datagram, PacketError, SeqBit};
use crate::socket::{Socket, SocketError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an exchange produced no usable payload.
///
/// The `Display` text of every variant is suitable as a status line.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No matching reply after every attempt.
    #[error("ERROR server does not respond")]
    Unresponsive { attempts: u32 },
    /// A matching reply arrived but its body could not be decoded.
    #[error("ERROR malformed response: {0}")]
    Malformed(PacketError),
    #[error("ERROR {0}")]
    Socket(#[from] SocketError),
    #[error("ERROR {0}")]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// The sequence bit the next reply must carry.
///
/// Changed only by a validated round trip; retries and failed exchanges leave
/// it untouched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    expected: SeqBit,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expected(&self) -> SeqBit {
        self.expected
    }

    fn matches(&self, seq: SeqBit) -> bool {
        seq == self.expected
    }

    fn advance(&mut self) {
        self.expected = self.expected.toggled();
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Running counters for one transport.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransportStats {
    /// Calls to `send`.
    pub requests: u64,
    /// Datagrams put on the wire, retransmissions included.
    pub transmissions: u64,
    /// Exchanges completed with a matching reply.
    pub delivered: u64,
    /// Attempts that ended with no datagram before the deadline.
    pub timeouts: u64,
    /// Replies carrying the wrong sequence digit.
    pub mismatches: u64,
    /// Datagrams with an unreadable header or a non-UTF-8 body.
    pub malformed: u64,
    /// Exchanges that ran out of attempts.
    pub unresponsive: u64,
}

// ---------------------------------------------------------------------------
// ReliableTransport
// ---------------------------------------------------------------------------

/// What one attempt's wait produced.
enum Outcome {
    Matched(Datagram),
    Retry,
}

/// Stop-and-wait client transport for one server.
#[derive(Debug)]
pub struct ReliableTransport {
    socket: Socket,
    server: SocketAddr,
    session: SessionState,
    policy: RetryPolicy,
    stats: TransportStats,
}

impl ReliableTransport {
    /// Wrap an already-bound socket.
    pub fn new(
        socket: Socket,
        server: SocketAddr,
        policy: RetryPolicy,
    ) -> Result<Self, TransportError> {
        policy.validate()?;
        Ok(Self {
            socket,
            server,
            session: SessionState::new(),
            policy,
            stats: TransportStats::default(),
        })
    }

    /// Validate `config`, resolve the server and bind an ephemeral socket.
    pub async fn connect(config: &ClientConfig) -> Result<Self, TransportError> {
        config.validate()?;
        let server = config.server_addr().await?;
        let socket = Socket::bind_for(server).await?;
        log::info!(
            "[arq] {} → {} (retries={} timeout={:?}, worst case {:?})",
            socket.local_addr,
            server,
            config.retry.retries,
            config.retry.timeout,
            config.retry.worst_case()
        );
        Self::new(socket, server, config.retry)
    }

    /// The bit the next request must be built with.
    pub fn expected_seq(&self) -> SeqBit {
        self.session.expected()
    }

    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    /// Run one stop-and-wait exchange and return the reply body.
    ///
    /// Blocks the calling task for at most `retries × timeout`.
    pub async fn send(&mut self, request: &[u8]) -> Result<String, TransportError> {
        self.stats.requests += 1;
        let retries = self.policy.retries;

        for attempt in 1..=retries {
            self.socket.send_to(request, self.server).await?;
            self.stats.transmissions += 1;
            log::debug!(
                "[arq] → seq={} len={} attempt={attempt}/{retries}",
                self.session.expected(),
                request.len()
            );

            if let Outcome::Matched(reply) = self.await_reply().await? {
                self.session.advance();
                self.stats.delivered += 1;
                log::debug!(
                    "[arq] ← seq={} len={} on attempt {attempt}",
                    reply.header.seq,
                    reply.body.len()
                );
                return match reply.body_text() {
                    Ok(text) => Ok(text.to_string()),
                    Err(e) => {
                        self.stats.malformed += 1;
                        log::warn!("[arq] matching reply with undecodable body: {e}");
                        Err(TransportError::Malformed(e))
                    }
                };
            }
        }

        self.stats.unresponsive += 1;
        log::warn!(
            "[arq] no reply for seq={} after {retries} attempt(s)",
            self.session.expected()
        );
        Err(TransportError::Unresponsive { attempts: retries })
    }

    /// Wait until this attempt's deadline for a datagram and classify it.
    async fn await_reply(&mut self) -> Result<Outcome, TransportError> {
        let deadline = Instant::now() + self.policy.timeout;
        let bytes = loop {
            match timeout_at(deadline, self.socket.recv_raw()).await {
                Err(_) => {
                    self.stats.timeouts += 1;
                    log::debug!("[arq] timeout after {:?}", self.policy.timeout);
                    return Ok(Outcome::Retry);
                }
                Ok(Ok((bytes, _from))) => break bytes,
                Ok(Err(SocketError::Io(e))) if is_transient_io_error(&e) => {
                    log::debug!("[arq] transient receive error: {e}; still waiting");
                }
                Ok(Err(e)) => return Err(e.into()),
            }
        };

        match Datagram::decode(&bytes) {
            Ok(reply) if self.session.matches(reply.header.seq) => Ok(Outcome::Matched(reply)),
            Ok(reply) => {
                self.stats.mismatches += 1;
                log::debug!(
                    "[arq] ← stale seq={} (want {}); resending",
                    reply.header.seq,
                    self.session.expected()
                );
                Ok(Outcome::Retry)
            }
            Err(e) => {
                self.stats.malformed += 1;
                log::warn!("[arq] discarding malformed datagram: {e}");
                Ok(Outcome::Retry)
            }
        }
    }
}

/// Returns true if the error is likely transient (a later attempt may succeed).
///
/// Some platforms surface an ICMP port-unreachable from an earlier send as a
/// receive error on the next read.
fn is_transient_io_error(e: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        e.kind(),
        ErrorKind::TimedOut
            | ErrorKind::WouldBlock
            | ErrorKind::Interrupted
            | ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    #[test]
    fn session_starts_at_zero_and_toggles() {
        let mut s = SessionState::new();
        assert_eq!(s.expected(), SeqBit::Zero);
        assert!(s.matches(SeqBit::Zero));
        assert!(!s.matches(SeqBit::One));
        s.advance();
        assert_eq!(s.expected(), SeqBit::One);
        s.advance();
        assert_eq!(s.expected(), SeqBit::Zero);
    }

    #[test]
    fn unresponsive_displays_fixed_status() {
        let e = TransportError::Unresponsive { attempts: 3 };
        assert_eq!(e.to_string(), "ERROR server does not respond");
    }

    #[test]
    fn transient_errors_classified() {
        assert!(is_transient_io_error(&io::Error::from(io::ErrorKind::ConnectionRefused)));
        assert!(is_transient_io_error(&io::Error::from(io::ErrorKind::Interrupted)));
        assert!(!is_transient_io_error(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }

    #[tokio::test]
    async fn new_rejects_invalid_policy() {
        let socket = Socket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let server = "127.0.0.1:9".parse().unwrap();
        let policy = RetryPolicy {
            retries: 0,
            timeout: Duration::from_millis(10),
        };
        let err = ReliableTransport::new(socket, server, policy).unwrap_err();
        assert!(matches!(err, TransportError::Config(ConfigError::ZeroRetries)));
    }
}
