//! Request framing.
//!
//! Turns a user action into the exact bytes the transport puts on the wire.
//! Building a request is a pure function of the operation and the current
//! sequence bit; the transport decides which bit that is.

use crate::message::Message;
use crate::packet::{Datagram, SeqBit};

/// A logical request, built once per user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Retrieve every message stored on the board.
    Fetch,
    /// Store `text` under `user`.
    Post { user: String, text: String },
}

impl From<Operation> for Message {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Fetch => Message::Get,
            Operation::Post { user, text } => Message::Post { user, text },
        }
    }
}

/// Serialise `op` into header + body bytes carrying sequence bit `seq`.
pub fn build(op: &Operation, seq: SeqBit) -> Vec<u8> {
    let body = Message::from(op.clone()).encode();
    Datagram::new(seq, body.into_bytes()).encode()
}
