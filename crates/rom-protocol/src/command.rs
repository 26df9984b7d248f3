//! Line commands and read-slot responses
//!
//! Every command is a single ASCII byte, so the codec never has to wait for a
//! terminator: each byte pushed into it is one command. Bytes that are not part
//! of the vocabulary surface as [`Command::Unknown`] and are left for the bus
//! to ignore.
//!
//! # Commands
//! - `R` - Reset the bus
//! - `S` - Select ROM search
//! - `r` - Read slot
//! - `0` / `1` - Broadcast the resolved bit
//! - `V` - Toggle verbose tracing on the bus
//! - `Q` - Quit

use std::collections::VecDeque;
use std::fmt;

use crate::error::ParseError;
use crate::{EncodeCommand, ProtocolCodec};

/// Maximum number of bytes buffered before the oldest are discarded
const MAX_BUFFERED: usize = 4096;

/// A command sent from the search engine to the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// Reset: reactivate every device, cursor back to bit 0
    Reset,
    /// Enter ROM search mode
    Search,
    /// Request one read slot
    Read,
    /// Broadcast the bit chosen for the current position
    WriteBit(bool),
    /// Toggle the bus's verbose tracing
    Verbose,
    /// Terminate the bus
    Quit,
    /// Byte outside the command vocabulary
    Unknown(u8),
}

impl Command {
    /// Decode a single command byte
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'R' => Command::Reset,
            b'S' => Command::Search,
            b'r' => Command::Read,
            b'0' => Command::WriteBit(false),
            b'1' => Command::WriteBit(true),
            b'V' => Command::Verbose,
            b'Q' => Command::Quit,
            other => Command::Unknown(other),
        }
    }

    /// The single byte this command is sent as
    pub fn as_byte(&self) -> u8 {
        match self {
            Command::Reset => b'R',
            Command::Search => b'S',
            Command::Read => b'r',
            Command::WriteBit(false) => b'0',
            Command::WriteBit(true) => b'1',
            Command::Verbose => b'V',
            Command::Quit => b'Q',
            Command::Unknown(byte) => *byte,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Unknown(byte) => write!(f, "unknown (0x{:02X})", byte),
            cmd => write!(f, "{}", cmd.as_byte() as char),
        }
    }
}

impl EncodeCommand for Command {
    fn encode(&self) -> Vec<u8> {
        vec![self.as_byte()]
    }
}

/// Streaming command codec for the bus side of the line
pub struct CommandCodec {
    buffer: VecDeque<u8>,
}

impl CommandCodec {
    /// Create a new command codec
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(64),
        }
    }

    /// Number of bytes waiting to be decoded
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for CommandCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolCodec for CommandCodec {
    type Command = Command;

    fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend(data);

        // A peer that never waits for answers can outrun us; keep the newest bytes
        if self.buffer.len() > MAX_BUFFERED {
            let dropped = self.buffer.len() - MAX_BUFFERED;
            tracing::warn!("Command buffer overflow, dropping {} oldest bytes", dropped);
            self.buffer.drain(..dropped);
        }
    }

    fn next_command(&mut self) -> Option<Command> {
        self.buffer.pop_front().map(Command::from_byte)
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Encode the wired-AND result of a read slot
pub fn encode_response(bit: bool) -> u8 {
    if bit {
        b'1'
    } else {
        b'0'
    }
}

/// Parse the answer to a read slot
pub fn parse_response(byte: u8) -> Result<bool, ParseError> {
    match byte {
        b'0' => Ok(false),
        b'1' => Ok(true),
        other => Err(ParseError::InvalidResponse(other)),
    }
}
