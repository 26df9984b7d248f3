//! Half-duplex link to the bus
//!
//! Generic over the I/O type so the engine can talk to anything that speaks
//! the line protocol; the simulator is reached through `DuplexStream` from
//! `tokio::io::duplex()`. Every read slot is answered before the next command
//! is sent, so there is never more than one request outstanding.

use std::io::ErrorKind;

use rom_protocol::{parse_response, Command, Digit, EncodeCommand};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::SearchError;

/// Engine side of the line
pub struct BusLink<T> {
    io: T,
    read_pairs: u64,
}

impl<T> BusLink<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a byte stream connected to a bus
    pub fn new(io: T) -> Self {
        Self { io, read_pairs: 0 }
    }

    /// Send one command
    pub async fn send(&mut self, command: Command) -> Result<(), SearchError> {
        trace!("=> {}", command);
        self.io.write_all(&command.encode()).await?;
        self.io.flush().await?;
        Ok(())
    }

    /// Issue one read slot and wait for its answer
    pub async fn read_bit(&mut self) -> Result<bool, SearchError> {
        self.send(Command::Read).await?;

        let mut byte = [0u8; 1];
        match self.io.read_exact(&mut byte).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(SearchError::ChannelClosed)
            }
            Err(e) => return Err(e.into()),
        }
        trace!("<= {}", byte[0] as char);

        Ok(parse_response(byte[0])?)
    }

    /// Issue a true/complement read pair and classify it
    pub async fn read_digit(&mut self) -> Result<Digit, SearchError> {
        let mut bits = 0u8;
        for shift in [1u8, 0] {
            if self.read_bit().await? {
                bits |= 1 << shift;
            }
        }
        self.read_pairs += 1;
        Ok(Digit::from_bits(bits)?)
    }

    /// Read pairs issued over this link
    pub fn read_pairs(&self) -> u64 {
        self.read_pairs
    }

    /// Recover the underlying stream
    pub fn into_inner(self) -> T {
        self.io
    }
}
