//! Body codec for board requests and responses.
//!
//! [`Message`] is the single typed view of every body the protocol carries,
//! in either direction.  [`Message::encode`] and the two `decode_*`
//! functions are the only places that know the textual layout:
//!
//! ```text
//!  request   GET
//!  request   POST {user}::{text}
//!  response  OK
//!  response  OK{time}::{user}::{text}::{time}::{user}::{text}...
//!  response  anything else (error text, passed through)
//! ```
//!
//! Fields are joined with [`FIELD_SEP`] and nothing is escaped.  A `::`
//! inside a user name breaks the `POST` split; a `::` inside a message text
//! shifts every later field of a fetch listing.  Both are limitations of the
//! wire format, not of this codec.

use thiserror::Error;

/// Separator between fields of a `POST` body and of a fetch listing.
pub const FIELD_SEP: &str = "::";

/// Status prefix of every successful response.
pub const OK_STATUS: &str = "OK";

const GET_COMMAND: &str = "GET";
const POST_PREFIX: &str = "POST ";

/// One stored board posting as it appears in a fetch listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardEntry {
    pub time: String,
    pub user: String,
    pub text: String,
}

impl BoardEntry {
    /// The three fields joined by single spaces, ready for display.
    pub fn display_line(&self) -> String {
        format!("{} {} {}", self.time, self.user, self.text)
    }
}

/// Every body the protocol can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Fetch-all request.
    Get,
    /// Post request.
    Post { user: String, text: String },
    /// Successful fetch carrying at least one entry.
    OkMessages(Vec<BoardEntry>),
    /// Bare `OK`.
    OkPlain,
    /// Any response that does not start with `OK`.
    ErrorText(String),
}

impl Message {
    /// Serialise to the body text that follows the datagram header.
    ///
    /// An empty `OkMessages` list encodes as bare `OK` and therefore decodes
    /// back as [`Message::OkPlain`].
    pub fn encode(&self) -> String {
        match self {
            Message::Get => GET_COMMAND.to_string(),
            Message::Post { user, text } => format!("{POST_PREFIX}{user}{FIELD_SEP}{text}"),
            Message::OkMessages(entries) => {
                let fields: Vec<&str> = entries
                    .iter()
                    .flat_map(|e| [e.time.as_str(), e.user.as_str(), e.text.as_str()])
                    .collect();
                format!("{OK_STATUS}{}", fields.join(FIELD_SEP))
            }
            Message::OkPlain => OK_STATUS.to_string(),
            Message::ErrorText(text) => text.clone(),
        }
    }

    /// Parse a request body.  Used by the server side of the protocol.
    ///
    /// `POST` splits at the first separator, so the user name cannot contain
    /// `::` but the text may.
    pub fn decode_request(body: &str) -> Result<Self, MessageError> {
        if body == GET_COMMAND {
            return Ok(Message::Get);
        }
        if let Some(rest) = body.strip_prefix(POST_PREFIX) {
            let (user, text) = rest
                .split_once(FIELD_SEP)
                .ok_or(MessageError::MissingSeparator)?;
            return Ok(Message::Post {
                user: user.to_string(),
                text: text.to_string(),
            });
        }
        Err(MessageError::UnknownCommand(body.to_string()))
    }

    /// Parse a response body.  Never fails: anything that is not an `OK`
    /// status is an [`Message::ErrorText`].
    ///
    /// An `OK` status followed by nothing but whitespace is
    /// [`Message::OkPlain`].  Otherwise one optional space is skipped (servers
    /// write `"OK "` before a listing), the rest is split on `::` and grouped
    /// into triples.  A trailing group with fewer than three fields is dropped.
    pub fn decode_response(body: &str) -> Self {
        let Some(rest) = body.strip_prefix(OK_STATUS) else {
            return Message::ErrorText(body.to_string());
        };
        if rest.trim().is_empty() {
            return Message::OkPlain;
        }
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        let fields: Vec<&str> = rest.split(FIELD_SEP).collect();
        let chunks = fields.chunks_exact(3);
        if !chunks.remainder().is_empty() {
            log::debug!(
                "dropping {} trailing field(s) of an incomplete entry",
                chunks.remainder().len()
            );
        }
        let entries = chunks
            .map(|c| BoardEntry {
                time: c[0].to_string(),
                user: c[1].to_string(),
                text: c[2].to_string(),
            })
            .collect();
        Message::OkMessages(entries)
    }
}

/// Errors from [`Message::decode_request`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),
    #[error("POST body has no '::' between user and text")]
    MissingSeparator,
}
