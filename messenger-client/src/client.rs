//! Board controller: user actions in, display updates out.
//!
//! [`BoardClient`] ties the request builder, the transport and the response
//! parser together for one user.  It never renders anything itself; each
//! call returns a [`BoardUpdate`] that a front end can show as a message
//! list and a status line.

use std::time::Duration;

use crate::config::ClientConfig;
use crate::request::{self, Operation};
use crate::response::{self, ParsedResponse};
use crate::transport::{ReliableTransport, TransportError, TransportStats};

/// How often a front end should poll the board.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Longest user name the board server is known to display in full.
pub const MAX_USER_LEN: usize = 8;

/// What a front end should show after one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardUpdate {
    /// Replacement message list, present only after a successful fetch.
    pub messages: Option<Vec<String>>,
    /// One-line status.
    pub status: String,
}

impl BoardUpdate {
    fn status(status: impl Into<String>) -> Self {
        Self {
            messages: None,
            status: status.into(),
        }
    }
}

/// Controller for one user talking to one board.
#[derive(Debug)]
pub struct BoardClient {
    user: String,
    transport: ReliableTransport,
}

impl BoardClient {
    pub fn new(user: impl Into<String>, transport: ReliableTransport) -> Self {
        let user = user.into();
        if user.chars().count() > MAX_USER_LEN {
            log::warn!("user name {user:?} is longer than {MAX_USER_LEN} characters");
        }
        Self { user, transport }
    }

    /// Resolve and bind from `config`, then wrap the transport.
    pub async fn connect(
        user: impl Into<String>,
        config: &ClientConfig,
    ) -> Result<Self, TransportError> {
        let transport = ReliableTransport::connect(config).await?;
        Ok(Self::new(user, transport))
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn stats(&self) -> TransportStats {
        self.transport.stats()
    }

    /// Build, send and parse one operation.
    pub async fn request(&mut self, op: &Operation) -> Result<ParsedResponse, TransportError> {
        let bytes = request::build(op, self.transport.expected_seq());
        let payload = self.transport.send(&bytes).await?;
        Ok(response::parse(&payload))
    }

    /// Fetch the whole board.
    pub async fn fetch(&mut self) -> BoardUpdate {
        match self.request(&Operation::Fetch).await {
            Ok(ParsedResponse::Ok { messages }) => BoardUpdate {
                status: format!("{} messages retrieved", messages.len()),
                messages: Some(messages),
            },
            Ok(ParsedResponse::OkPlain) => BoardUpdate {
                status: "0 messages retrieved".to_string(),
                messages: Some(Vec::new()),
            },
            Ok(ParsedResponse::Error { text }) => BoardUpdate::status(text),
            Err(e) => BoardUpdate::status(e.to_string()),
        }
    }

    /// Post `text` under this client's user name.
    ///
    /// Empty text is not sent.  Any `OK` reply counts as sent, including a
    /// full listing, which some servers return right after recovering from a
    /// period of unresponsiveness.
    pub async fn post(&mut self, text: &str) -> Option<BoardUpdate> {
        if text.is_empty() {
            return None;
        }
        let op = Operation::Post {
            user: self.user.clone(),
            text: text.to_string(),
        };
        let update = match self.request(&op).await {
            Ok(ParsedResponse::Error { text }) => BoardUpdate::status(text),
            Ok(_) => BoardUpdate::status("Message Sent"),
            Err(e) => BoardUpdate::status(e.to_string()),
        };
        Some(update)
    }
}
