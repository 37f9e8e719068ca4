//! Response decoding for display.

use crate::message::Message;

/// What a response body means to the display layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    /// Fetch listing, one display line per stored message, in server order.
    Ok { messages: Vec<String> },
    /// Bare `OK` (post acknowledgement or an empty board).
    OkPlain,
    /// Server error text, verbatim.
    Error { text: String },
}

impl From<Message> for ParsedResponse {
    fn from(msg: Message) -> Self {
        match msg {
            Message::OkMessages(entries) => ParsedResponse::Ok {
                messages: entries.iter().map(|e| e.display_line()).collect(),
            },
            Message::OkPlain => ParsedResponse::OkPlain,
            Message::ErrorText(text) => ParsedResponse::Error { text },
            // Unreachable from `parse`: `decode_response` never yields a
            // request.  A request converted directly reads as an error.
            request @ (Message::Get | Message::Post { .. }) => ParsedResponse::Error {
                text: request.encode(),
            },
        }
    }
}

/// Decode a response body (header already stripped by the transport).
pub fn parse(payload: &str) -> ParsedResponse {
    Message::decode_response(payload).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> ParsedResponse {
        ParsedResponse::Ok {
            messages: v.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn listing_is_grouped_into_triples() {
        assert_eq!(
            parse("OKt1::u1::m1::t2::u2::m2"),
            lines(&["t1 u1 m1", "t2 u2 m2"])
        );
    }

    #[test]
    fn incomplete_trailing_group_is_dropped() {
        assert_eq!(parse("OKt1::u1"), lines(&[]));
    }

    #[test]
    fn listing_after_status_space() {
        assert_eq!(
            parse("OK 09:15::ann::morning all"),
            lines(&["09:15 ann morning all"])
        );
    }

    #[test]
    fn bare_ok_is_plain() {
        assert_eq!(parse("OK"), ParsedResponse::OkPlain);
    }

    #[test]
    fn ok_followed_by_whitespace_is_plain() {
        assert_eq!(parse("OK "), ParsedResponse::OkPlain);
        assert_eq!(parse("OK\n"), ParsedResponse::OkPlain);
        // Not whitespace: one incomplete entry, dropped.
        assert_eq!(parse("OKfoo"), lines(&[]));
    }

    #[test]
    fn non_ok_is_passed_through_verbatim() {
        assert_eq!(
            parse("ERROR message too long"),
            ParsedResponse::Error {
                text: "ERROR message too long".into()
            }
        );
        assert_eq!(parse(""), ParsedResponse::Error { text: String::new() });
    }

    #[test]
    fn request_converted_directly_reads_as_error() {
        assert_eq!(
            ParsedResponse::from(Message::Get),
            ParsedResponse::Error { text: "GET".into() }
        );
        let post = Message::Post {
            user: "ann".into(),
            text: "hi".into(),
        };
        assert_eq!(
            ParsedResponse::from(post),
            ParsedResponse::Error {
                text: "POST ann::hi".into()
            }
        );
    }
}
