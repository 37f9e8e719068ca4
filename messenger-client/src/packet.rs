//! Wire-format definitions for board datagrams.
//!
//! Every datagram exchanged with the board server is a [`Datagram`]: a fixed
//! three-byte [`Header`] followed by a UTF-8 body.  This module is
//! responsible for:
//! - Defining the on-wire layout (marker, sequence digit, checksum).
//! - Serialising a [`Datagram`] into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back into a [`Datagram`], returning
//!   errors for truncated or malformed input.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! ```text
//!  0               1               2               3 ...
//! +---------------+---------------+---------------+----------------------+
//! |  Marker 'C'   | '0' or '1'    |   Checksum    |  UTF-8 body ...      |
//! +---------------+---------------+---------------+----------------------+
//! ```
//!
//! Total header size: [`HEADER_LEN`] = 3 bytes.  There is no length field;
//! framing relies on datagram boundaries.  The checksum is the XOR-fold of
//! every body byte.

use thiserror::Error;

/// Marker byte that opens every datagram.
pub const MARKER: u8 = b'C';

/// Byte length of the fixed-size header on the wire.
pub const HEADER_LEN: usize = 3;

/// Largest datagram the client will read; longer datagrams are truncated.
pub const MAX_DATAGRAM: usize = 1400;

// Byte offsets of each field within the serialised header.
const OFF_MARKER: usize = 0;
const OFF_SEQ: usize = 1;
const OFF_CHECKSUM: usize = 2;

// ---------------------------------------------------------------------------
// SeqBit
// ---------------------------------------------------------------------------

/// The one-bit sequence number, carried on the wire as an ASCII digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SeqBit {
    #[default]
    Zero,
    One,
}

impl SeqBit {
    /// The other bit.
    pub fn toggled(self) -> Self {
        match self {
            SeqBit::Zero => SeqBit::One,
            SeqBit::One => SeqBit::Zero,
        }
    }

    /// ASCII digit written into the header.
    pub fn as_ascii(self) -> u8 {
        match self {
            SeqBit::Zero => b'0',
            SeqBit::One => b'1',
        }
    }

    /// Parse the header digit; anything other than `'0'` or `'1'` is rejected.
    pub fn from_ascii(byte: u8) -> Result<Self, PacketError> {
        match byte {
            b'0' => Ok(SeqBit::Zero),
            b'1' => Ok(SeqBit::One),
            other => Err(PacketError::BadSequence(other)),
        }
    }
}

impl std::fmt::Display for SeqBit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ascii() as char)
    }
}

// ---------------------------------------------------------------------------
// Header / Datagram
// ---------------------------------------------------------------------------

/// Fixed-size datagram header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Always [`MARKER`] on encode.  Not checked on decode.
    pub marker: u8,
    /// Sequence bit of the request this datagram belongs to.
    pub seq: SeqBit,
    /// XOR-fold of the body.
    ///
    /// On encode this is computed from the body and any stored value is
    /// ignored.  On decode it is carried through as received and never
    /// verified.
    pub checksum: u8,
}

/// A complete datagram: header + body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub header: Header,
    pub body: Vec<u8>,
}

impl Datagram {
    /// Build a datagram for `body`, filling in the marker and checksum.
    pub fn new(seq: SeqBit, body: Vec<u8>) -> Self {
        Self {
            header: Header {
                marker: MARKER,
                seq,
                checksum: checksum(&body),
            },
            body,
        }
    }

    /// Serialise this datagram into a newly allocated byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_LEN + self.body.len()];
        buf[OFF_MARKER] = MARKER;
        buf[OFF_SEQ] = self.header.seq.as_ascii();
        buf[OFF_CHECKSUM] = checksum(&self.body);
        buf[HEADER_LEN..].copy_from_slice(&self.body);
        buf
    }

    /// Parse a [`Datagram`] from a raw byte slice.
    ///
    /// Returns [`Err`] if `buf` is shorter than [`HEADER_LEN`] or the sequence
    /// byte is not an ASCII `'0'`/`'1'`.  The checksum is not verified.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < HEADER_LEN {
            return Err(PacketError::BufferTooShort(buf.len()));
        }
        let seq = SeqBit::from_ascii(buf[OFF_SEQ])?;
        Ok(Datagram {
            header: Header {
                marker: buf[OFF_MARKER],
                seq,
                checksum: buf[OFF_CHECKSUM],
            },
            body: buf[HEADER_LEN..].to_vec(),
        })
    }

    /// Decode the body as UTF-8.
    pub fn body_text(&self) -> Result<&str, PacketError> {
        std::str::from_utf8(&self.body).map_err(|_| PacketError::InvalidUtf8)
    }
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("datagram of {0} bytes is shorter than the 3-byte header")]
    BufferTooShort(usize),
    #[error("sequence byte {0:#04x} is not an ASCII '0' or '1'")]
    BadSequence(u8),
    #[error("datagram body is not valid UTF-8")]
    InvalidUtf8,
}

/// XOR-fold every byte of `data` into one byte.  An empty slice folds to 0.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}
