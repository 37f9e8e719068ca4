//! In-process board server with fault injection.
//!
//! Real networks drop and delay datagrams.  To exercise the stop-and-wait
//! transport without depending on actual network conditions, [`SimServer`]
//! runs a small message board on a loopback socket and can misbehave on
//! purpose:
//!
//! | Fault            | Effect on one request                                  |
//! |------------------|--------------------------------------------------------|
//! | `Drop`           | Request silently discarded, nothing stored.            |
//! | `WrongSeq`       | Request handled, reply sent with the other seq digit.  |
//! | `Garbage`        | Two-byte reply that cannot hold a header.              |
//! | `Reply(body)`    | Correct header, arbitrary body, nothing stored.        |
//! | random loss      | `Drop` with probability `loss_rate` (seeded RNG).      |
//!
//! Scripted faults are consumed one per received request, before random
//! loss is considered.
//!
//! Like a well-behaved board server, the simulator tolerates retransmissions:
//! a request carrying the same sequence digit as the last one handled for
//! that peer gets the cached reply and is not applied twice.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::message::{BoardEntry, Message, MessageError};
use crate::packet::{Datagram, SeqBit, MARKER};
use crate::socket::{Socket, SocketError};

/// Fault-model configuration.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Probability in `[0.0, 1.0]` that a request is silently dropped.
    pub loss_rate: f64,
    /// Seed for the loss RNG so runs are reproducible.
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // No faults by default; the simulator is a plain board server.
        Self {
            loss_rate: 0.0,
            seed: 0,
        }
    }
}

/// A scripted misbehaviour for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    Drop,
    WrongSeq,
    Garbage,
    Reply(String),
}

/// State shared between the server task and its handle.
struct Board {
    entries: Vec<BoardEntry>,
    faults: VecDeque<Fault>,
    received: u64,
    /// Last handled sequence digit and reply body per peer.
    last: HashMap<SocketAddr, (SeqBit, Vec<u8>)>,
    rng: StdRng,
    loss_rate: f64,
}

impl Board {
    fn new(config: &SimulatorConfig) -> Self {
        let loss_rate = if (0.0..=1.0).contains(&config.loss_rate) {
            config.loss_rate
        } else {
            log::warn!("[sim] loss_rate {} out of range; using 0", config.loss_rate);
            0.0
        };
        Self {
            entries: Vec::new(),
            faults: VecDeque::new(),
            received: 0,
            last: HashMap::new(),
            rng: StdRng::seed_from_u64(config.seed),
            loss_rate,
        }
    }

    /// Decide what to send back for one raw request.  `None` means stay silent.
    fn handle(&mut self, bytes: &[u8], peer: SocketAddr) -> Option<Vec<u8>> {
        self.received += 1;

        let fault = self.faults.pop_front().or_else(|| {
            (self.loss_rate > 0.0 && self.rng.random_bool(self.loss_rate)).then_some(Fault::Drop)
        });

        let request = match Datagram::decode(bytes) {
            Ok(d) => d,
            Err(e) => {
                log::debug!("[sim] ignoring undecodable request from {peer}: {e}");
                return None;
            }
        };
        let seq = request.header.seq;

        match &fault {
            Some(Fault::Drop) => {
                log::debug!("[sim] dropping seq={seq} from {peer}");
                return None;
            }
            Some(Fault::Garbage) => return Some(vec![MARKER, seq.as_ascii()]),
            Some(Fault::Reply(body)) => {
                return Some(Datagram::new(seq, body.as_bytes().to_vec()).encode());
            }
            Some(Fault::WrongSeq) | None => {}
        }

        let replay = match self.last.get(&peer) {
            Some((last_seq, cached)) if *last_seq == seq => Some(cached.clone()),
            _ => None,
        };
        let body = match replay {
            Some(cached) => {
                log::debug!("[sim] duplicate seq={seq} from {peer}; replaying reply");
                cached
            }
            None => {
                let body = self.apply(&request);
                self.last.insert(peer, (seq, body.clone()));
                body
            }
        };

        let reply_seq = if fault == Some(Fault::WrongSeq) {
            seq.toggled()
        } else {
            seq
        };
        Some(Datagram::new(reply_seq, body).encode())
    }

    fn apply(&mut self, request: &Datagram) -> Vec<u8> {
        let Ok(text) = request.body_text() else {
            return Message::ErrorText("ERROR malformed request".into())
                .encode()
                .into_bytes();
        };
        let reply = match Message::decode_request(text) {
            Ok(Message::Get) => Message::OkMessages(self.entries.clone()),
            Ok(Message::Post { user, text }) => {
                self.entries.push(BoardEntry {
                    time: clock_now(),
                    user,
                    text,
                });
                Message::OkPlain
            }
            Ok(_) => Message::ErrorText("ERROR unexpected message".into()),
            Err(MessageError::UnknownCommand(_)) => {
                Message::ErrorText("ERROR unknown command".into())
            }
            Err(MessageError::MissingSeparator) => {
                Message::ErrorText("ERROR malformed request".into())
            }
        };
        reply.encode().into_bytes()
    }
}

/// `HH:MM:SS` in UTC.
fn clock_now() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let day = secs % 86_400;
    format!("{:02}:{:02}:{:02}", day / 3600, day % 3600 / 60, day % 60)
}

// ---------------------------------------------------------------------------
// SimServer
// ---------------------------------------------------------------------------

/// Handle to a running simulated board.
pub struct SimServer {
    /// Address the server socket is bound to.
    pub local_addr: SocketAddr,
    board: Arc<Mutex<Board>>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SimServer {
    /// Bind `addr` and start serving in a background task.
    pub async fn spawn(addr: SocketAddr, config: SimulatorConfig) -> Result<Self, SocketError> {
        let socket = Socket::bind(addr).await?;
        let local_addr = socket.local_addr;
        let board = Arc::new(Mutex::new(Board::new(&config)));
        let (shutdown, mut stop) = oneshot::channel();

        let shared = Arc::clone(&board);
        let task = tokio::spawn(async move {
            log::info!("[sim] board listening on {local_addr}");
            loop {
                let (bytes, peer) = tokio::select! {
                    _ = &mut stop => break,
                    received = socket.recv_raw() => match received {
                        Ok(r) => r,
                        Err(e) => {
                            log::warn!("[sim] receive failed: {e}");
                            continue;
                        }
                    },
                };
                let reply = lock(&shared).handle(&bytes, peer);
                if let Some(reply) = reply {
                    if let Err(e) = socket.send_to(&reply, peer).await {
                        log::warn!("[sim] reply to {peer} failed: {e}");
                    }
                }
            }
            log::info!("[sim] board on {local_addr} stopped");
        });

        Ok(Self {
            local_addr,
            board,
            shutdown,
            task,
        })
    }

    /// Queue a fault for the next request that has none queued ahead of it.
    pub fn push_fault(&self, fault: Fault) {
        lock(&self.board).faults.push_back(fault);
    }

    /// Datagrams received so far, retransmissions and dropped ones included.
    pub fn received(&self) -> u64 {
        lock(&self.board).received
    }

    /// Snapshot of the stored entries.
    pub fn entries(&self) -> Vec<BoardEntry> {
        lock(&self.board).entries.clone()
    }

    /// Stop the server task and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            log::warn!("[sim] server task ended abnormally: {e}");
        }
    }
}

fn lock(board: &Mutex<Board>) -> MutexGuard<'_, Board> {
    board.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
