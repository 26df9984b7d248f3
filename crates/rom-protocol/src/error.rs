//! Error types for ROM search protocol parsing and encoding

use thiserror::Error;

/// Errors that can occur while parsing protocol data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A read slot was answered with something other than `'0'` or `'1'`
    #[error("invalid response byte: 0x{0:02X}")]
    InvalidResponse(u8),

    /// A digit value outside `0b00..=0b11`
    #[error("invalid digit: 0b{0:b}")]
    InvalidDigit(u8),

    /// Identifier bit sequence longer than the widest supported id
    #[error("identifier too long: {0} bits")]
    IdTooLong(usize),

    /// Identifier width outside the supported range
    #[error("invalid identifier width: {0}")]
    InvalidWidth(u8),
}

/// Higher-level protocol errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A command arrived that the current bus state does not accept
    #[error("unexpected command: {0}")]
    UnexpectedCommand(String),
}
