//! ROM Search Protocol Library
//!
//! This crate provides the line vocabulary shared by the two roles of a
//! simulated 1-Wire style bus:
//!
//! - **Commands** (engine → bus): single ASCII bytes (`R`, `S`, `r`, `0`, `1`, `V`, `Q`)
//! - **Responses** (bus → engine): one ASCII bit (`'0'` / `'1'`) per read slot
//! - **Digits**: the two-bit classification built from a true/complement read pair
//! - **Identifiers**: fixed-width ROM ids received least-significant bit first
//!
//! # Architecture
//!
//! The bus side parses a byte stream with the streaming [`CommandCodec`]; the
//! engine side encodes [`Command`]s and folds pairs of response bits into a
//! [`Digit`]. Neither side ever sees the other's internal state; all a search
//! engine learns about the devices comes from the wired-AND of their answers.
//!
//! # Example
//!
//! ```rust
//! use rom_protocol::{Command, CommandCodec, Digit, EncodeCommand, ProtocolCodec};
//!
//! let mut codec = CommandCodec::new();
//! codec.push_bytes(b"RSr");
//!
//! assert_eq!(codec.next_command(), Some(Command::Reset));
//! assert_eq!(codec.next_command(), Some(Command::Search));
//! assert_eq!(codec.next_command(), Some(Command::Read));
//! assert_eq!(Command::WriteBit(true).encode(), b"1".to_vec());
//!
//! // both devices answered 1, nobody answered 0 on the complement read
//! assert_eq!(Digit::from_reads(true, false), Digit::ForcedOne);
//! ```

pub mod command;
pub mod digit;
pub mod display;
pub mod error;
pub mod rom_id;

pub use command::{encode_response, parse_response, Command, CommandCodec};
pub use digit::Digit;
pub use error::{ParseError, ProtocolError};
pub use rom_id::{RomId, MAX_ROM_BITS, MIN_ROM_BITS};

/// Trait for codecs that parse an incoming byte stream
pub trait ProtocolCodec {
    /// The command type produced by this codec
    type Command;

    /// Push raw bytes into the codec's buffer
    fn push_bytes(&mut self, data: &[u8]);

    /// Try to extract the next complete command from the buffer
    fn next_command(&mut self) -> Option<Self::Command>;

    /// Clear the internal buffer
    fn clear(&mut self);
}

/// Trait for commands that can be encoded to bytes
pub trait EncodeCommand {
    /// Encode this command to its wire format
    fn encode(&self) -> Vec<u8>;
}
