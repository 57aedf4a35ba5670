//! FTP Transfer modes
//!
//! Transfer type negotiation (TYPE) and the streaming line-ending
//! conversion used for ASCII transfers.

use std::fmt;

/// Representation type of transferred file content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferType {
    /// Network form uses CRLF line endings; stored form uses LF
    Ascii,
    /// Raw byte copy
    #[default]
    Binary,
}

impl TransferType {
    /// Parse the argument of a TYPE command.
    ///
    /// Accepts `A`, `A N`, `I` and `L 8`; anything else is unsupported.
    pub fn from_type_argument(arg: &str) -> Option<Self> {
        let mut parts = arg.split_whitespace().map(|p| p.to_ascii_uppercase());
        let kind = parts.next()?;
        let param = parts.next();
        if parts.next().is_some() {
            return None;
        }
        match (kind.as_str(), param.as_deref()) {
            ("A", None) | ("A", Some("N")) => Some(TransferType::Ascii),
            ("I", None) | ("L", Some("8")) => Some(TransferType::Binary),
            _ => None,
        }
    }
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferType::Ascii => f.write_str("ASCII"),
            TransferType::Binary => f.write_str("BINARY"),
        }
    }
}

/// Converts stored LF line endings to CRLF, chunk by chunk.
#[derive(Debug, Default)]
pub struct AsciiEncoder {
    last: Option<u8>,
}

impl AsciiEncoder {
    pub fn encode(&mut self, input: &[u8], out: &mut Vec<u8>) {
        for &b in input {
            if b == b'\n' && self.last != Some(b'\r') {
                out.push(b'\r');
            }
            out.push(b);
            self.last = Some(b);
        }
    }
}

/// Converts network CRLF line endings to LF, chunk by chunk.
///
/// A CR at the end of a chunk is held back until the next byte is known.
#[derive(Debug, Default)]
pub struct AsciiDecoder {
    pending_cr: bool,
}

impl AsciiDecoder {
    pub fn decode(&mut self, input: &[u8], out: &mut Vec<u8>) {
        for &b in input {
            if self.pending_cr {
                self.pending_cr = false;
                if b == b'\n' {
                    out.push(b'\n');
                    continue;
                }
                out.push(b'\r');
            }
            if b == b'\r' {
                self.pending_cr = true;
            } else {
                out.push(b);
            }
        }
    }

    /// Flush a trailing CR once the stream has ended.
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        if self.pending_cr {
            self.pending_cr = false;
            out.push(b'\r');
        }
    }
}
