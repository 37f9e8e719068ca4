//! `messenger-client` — a stop-and-wait message board client over UDP.
//!
//! # Architecture
//!
//! ```text
//!  Operation ──▶ request::build ──bytes──┐
//!                                        ▼
//!                          ┌───────────────────────────┐
//!                          │     ReliableTransport     │
//!                          │ (seq bit + retry/timeout) │
//!                          └─────────────┬─────────────┘
//!                              body text │  ▲ datagrams
//!                                        ▼  │
//!  ParsedResponse ◀── response::parse    Socket (tokio UdpSocket)
//! ```
//!
//! [`client::BoardClient`] strings the three stages together for one user
//! and turns results into display updates.
//!
//! Each module has a single responsibility:
//! - [`packet`]     — wire format: header, sequence bit, XOR checksum
//! - [`message`]    — typed request/response bodies and their text codec
//! - [`request`]    — operation → request bytes
//! - [`transport`]  — stop-and-wait send/await/validate/retry loop
//! - [`response`]   — response body → display-ready result
//! - [`client`]     — controller and status lines
//! - [`config`]     — server address and retry policy
//! - [`socket`]     — async UDP socket abstraction
//! - [`simulator`]  — fault-injecting board server for tests and demos

pub mod client;
pub mod config;
pub mod message;
pub mod packet;
pub mod request;
pub mod response;
pub mod simulator;
pub mod socket;
pub mod transport;

pub use client::{BoardClient, BoardUpdate};
pub use config::{ClientConfig, RetryPolicy};
pub use request::Operation;
pub use response::ParsedResponse;
pub use transport::{ReliableTransport, TransportError};
