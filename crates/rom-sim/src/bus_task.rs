//! Bus simulator actor task
//!
//! This module provides a pure async task that owns a [`BusSimulator`] and
//! serves it over a byte stream. The task uses a select! loop to:
//! - Read command bytes from the stream and answer read slots
//! - Handle shutdown and tracing commands from a channel
//!
//! The task ends when the engine sends `Q`, when the stream closes, or when a
//! shutdown arrives on the control channel.

use std::io;

use rom_protocol::{encode_response, CommandCodec, ProtocolCodec};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bus::{BusReply, BusSimulator};

/// Commands that can be sent to a running bus task
#[derive(Debug, Clone)]
pub enum BusTaskCommand {
    /// Force verbose tracing on or off
    SetVerbose(bool),
    /// Shutdown the bus task
    Shutdown,
}

/// Run the bus simulator task
///
/// Returns the simulator so callers can inspect its final state.
pub async fn run_bus_task<S>(
    mut stream: S,
    mut bus: BusSimulator,
    mut cmd_rx: mpsc::Receiver<BusTaskCommand>,
) -> io::Result<BusSimulator>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut codec = CommandCodec::new();
    let mut buf = [0u8; 256];

    info!(
        "Starting bus task: {} devices, {} bits",
        bus.devices().len(),
        bus.width()
    );
    bus.log_device_table();

    'serve: loop {
        tokio::select! {
            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!("Bus stream closed");
                        break;
                    }
                    Ok(n) => {
                        codec.push_bytes(&buf[..n]);
                        while let Some(cmd) = codec.next_command() {
                            match bus.process(cmd) {
                                Ok(BusReply::Silent) => {}
                                Ok(BusReply::Bit(level)) => {
                                    stream.write_all(&[encode_response(level)]).await?;
                                    stream.flush().await?;
                                }
                                Ok(BusReply::Quit) => {
                                    info!("Quit received");
                                    break 'serve;
                                }
                                Err(e) => {
                                    debug!("Ignoring {}: {}", cmd, e);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Bus stream error: {}", e);
                        return Err(e);
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(BusTaskCommand::SetVerbose(verbose)) => {
                        info!("Bus verbose tracing set to {}", verbose);
                        bus.set_verbose(verbose);
                    }
                    Some(BusTaskCommand::Shutdown) => {
                        info!("Shutdown requested for bus");
                        break;
                    }
                    None => {
                        debug!("Command channel closed for bus");
                        break;
                    }
                }
            }
        }
    }

    info!("Bus task ended after {} read slots", bus.read_slots());
    Ok(bus)
}
