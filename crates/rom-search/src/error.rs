//! Error types for the search engine

use rom_protocol::{Digit, ParseError, ProtocolError};
use thiserror::Error;

/// Broad class of a search failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The bus answered something the protocol does not allow
    Protocol,
    /// The channel to the bus failed or closed
    Channel,
    /// A branch outgrew the identifier width
    Capacity,
}

/// Errors that abort a search run
///
/// None of these are retried: in a closed two-party protocol each one means
/// an invariant is already broken.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Protocol error (bad response byte, bad digit)
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Replaying a stored prefix produced a different digit than when it was built
    #[error("replay diverged at bit {position}: expected {expected}, bus reported {observed}")]
    ReplayDiverged {
        /// Bit position of the mismatch
        position: usize,
        /// Digit recorded when the prefix was resolved
        expected: Digit,
        /// Digit seen on replay
        observed: Digit,
    },

    /// I/O error on the bus channel
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bus closed the channel while a response was pending
    #[error("bus closed the channel")]
    ChannelClosed,

    /// The engine was asked to drive a branch the frontier does not hold
    #[error("no branch {0} in the frontier")]
    UnknownBranch(usize),

    /// A branch would grow beyond the widest identifier
    #[error("branch would exceed {max_bits} bits")]
    CapacityExceeded {
        /// Configured width limit
        max_bits: u8,
    },
}

impl SearchError {
    /// Which class of fault this is
    pub fn kind(&self) -> FaultKind {
        match self {
            SearchError::Protocol(_)
            | SearchError::ReplayDiverged { .. }
            | SearchError::UnknownBranch(_) => FaultKind::Protocol,
            SearchError::Io(_) | SearchError::ChannelClosed => FaultKind::Channel,
            SearchError::CapacityExceeded { .. } => FaultKind::Capacity,
        }
    }
}

impl From<ParseError> for SearchError {
    fn from(err: ParseError) -> Self {
        SearchError::Protocol(ProtocolError::Parse(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            SearchError::from(ParseError::InvalidDigit(7)).kind(),
            FaultKind::Protocol
        );
        assert_eq!(SearchError::ChannelClosed.kind(), FaultKind::Channel);
        assert_eq!(SearchError::UnknownBranch(3).kind(), FaultKind::Protocol);
        assert_eq!(
            SearchError::from(std::io::Error::other("boom")).kind(),
            FaultKind::Channel
        );
        assert_eq!(
            SearchError::CapacityExceeded { max_bits: 64 }.kind(),
            FaultKind::Capacity
        );
    }

    #[test]
    fn test_messages() {
        let err = SearchError::ReplayDiverged {
            position: 2,
            expected: Digit::Contested,
            observed: Digit::ForcedOne,
        };
        assert_eq!(
            err.to_string(),
            "replay diverged at bit 2: expected 00, bus reported 10"
        );
        assert_eq!(
            SearchError::from(ParseError::InvalidResponse(b'x')).to_string(),
            "protocol error: parse error: invalid response byte: 0x78"
        );
    }
}
