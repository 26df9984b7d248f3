//! Simulated open-drain bus
//!
//! The bus owns every [`VirtualDevice`] and is the only thing that mutates
//! their candidate flags. It reacts to one [`Command`] at a time:
//!
//! ```text
//! Idle --R--> Reset --S--> Searching
//!
//! Searching: AwaitTrueRead --r--> AwaitComplementRead --r--> AwaitBitWrite --0/1--> AwaitTrueRead
//! ```
//!
//! A read slot answers with the wired-AND of the active devices' bit at the
//! cursor (or its complement on the second read of the pair). A bit write
//! eliminates every active device that disagrees and advances the cursor; once
//! the cursor reaches the id width every device drops off the line, so the next
//! read pair comes back as `11`.

use std::collections::HashSet;

use rom_protocol::display::{format_bit, format_bits_msb_first, format_decimal};
use rom_protocol::rom_id::width_mask;
use rom_protocol::{Command, ProtocolError, RomId, MAX_ROM_BITS, MIN_ROM_BITS};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::device::VirtualDevice;
use crate::error::SimError;

/// Log at info when the bus is verbose, at debug otherwise
macro_rules! bus_trace {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            info!($($arg)+);
        } else {
            debug!($($arg)+);
        }
    };
}

/// Description of a simulated bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Identifier width in bits
    pub width: u8,
    /// Device identifiers
    pub devices: Vec<u64>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            width: 8,
            devices: vec![0x01],
        }
    }
}

/// Which ROM function the bus is executing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusMode {
    /// Nothing selected since power-up
    Idle,
    /// Reset seen, no ROM function selected yet
    Reset,
    /// ROM search selected
    Searching,
}

/// Position within the read/read/write cycle of one bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Next read returns the true bit
    AwaitTrueRead,
    /// Next read returns the complement bit
    AwaitComplementRead,
    /// Waiting for the engine to broadcast its chosen bit
    AwaitBitWrite,
}

/// Outcome of processing one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusReply {
    /// Nothing to send back
    Silent,
    /// Answer a read slot with this line level
    Bit(bool),
    /// The engine asked the bus to terminate
    Quit,
}

/// The shared line and every device attached to it
#[derive(Debug)]
pub struct BusSimulator {
    width: u8,
    devices: Vec<VirtualDevice>,
    mode: BusMode,
    slot: SlotState,
    cursor: u8,
    verbose: bool,
    /// Read slots answered since creation (for test verification)
    read_slots: u64,
}

impl BusSimulator {
    /// Create a bus of `width`-bit devices
    pub fn new(width: u8, ids: &[u64]) -> Result<Self, SimError> {
        if !(MIN_ROM_BITS..=MAX_ROM_BITS).contains(&width) {
            return Err(SimError::InvalidWidth(width));
        }
        if ids.is_empty() {
            return Err(SimError::NoDevices);
        }

        let mask = width_mask(width);
        let mut seen = HashSet::with_capacity(ids.len());
        let mut devices = Vec::with_capacity(ids.len());
        for &value in ids {
            if value & !mask != 0 {
                return Err(SimError::ValueTooWide { value, width });
            }
            if !seen.insert(value) {
                return Err(SimError::DuplicateId(value));
            }
            let id = RomId::new(value, width).map_err(|_| SimError::InvalidWidth(width))?;
            devices.push(VirtualDevice::new(id));
        }

        Ok(Self {
            width,
            devices,
            mode: BusMode::Idle,
            slot: SlotState::AwaitTrueRead,
            cursor: 0,
            verbose: false,
            read_slots: 0,
        })
    }

    /// Create a bus from configuration
    pub fn from_config(config: &BusConfig) -> Result<Self, SimError> {
        Self::new(config.width, &config.devices)
    }

    /// Identifier width in bits
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Devices on the bus, in configuration order
    pub fn devices(&self) -> &[VirtualDevice] {
        &self.devices
    }

    /// Number of devices still answering
    pub fn active_count(&self) -> usize {
        self.devices.iter().filter(|d| d.is_active()).count()
    }

    /// Current ROM function
    pub fn mode(&self) -> BusMode {
        self.mode
    }

    /// Current position in the read/read/write cycle
    pub fn slot(&self) -> SlotState {
        self.slot
    }

    /// Bit position the next read pair refers to
    pub fn cursor(&self) -> u8 {
        self.cursor
    }

    /// Whether verbose tracing is on
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Turn verbose tracing on or off
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Read slots answered so far
    pub fn read_slots(&self) -> u64 {
        self.read_slots
    }

    /// Process one command from the engine
    ///
    /// Out-of-sequence traffic is rejected with [`ProtocolError::UnexpectedCommand`]
    /// and leaves the bus untouched; callers are expected to log it and carry on,
    /// since a real line gives no feedback either.
    pub fn process(&mut self, command: Command) -> Result<BusReply, ProtocolError> {
        bus_trace!(
            self.verbose,
            "bus: command {} (cursor {}, slot {:?})",
            command,
            self.cursor,
            self.slot
        );

        match command {
            Command::Quit => Ok(BusReply::Quit),
            Command::Reset => {
                self.reset();
                Ok(BusReply::Silent)
            }
            Command::Search => {
                self.mode = BusMode::Searching;
                Ok(BusReply::Silent)
            }
            Command::Verbose => {
                self.verbose = !self.verbose;
                info!("bus: verbose tracing {}", if self.verbose { "on" } else { "off" });
                if self.verbose {
                    self.log_device_table();
                }
                Ok(BusReply::Silent)
            }
            Command::Read => self.read_slot().map(BusReply::Bit),
            Command::WriteBit(bit) => {
                self.write_bit(bit)?;
                Ok(BusReply::Silent)
            }
            Command::Unknown(byte) => Err(ProtocolError::UnexpectedCommand(format!(
                "unknown byte 0x{:02X}",
                byte
            ))),
        }
    }

    /// Put every device back on the line and rewind the cursor
    pub fn reset(&mut self) {
        self.mode = BusMode::Reset;
        self.slot = SlotState::AwaitTrueRead;
        self.cursor = 0;
        for device in &mut self.devices {
            device.activate();
        }
        if self.verbose {
            self.log_device_table();
        }
    }

    /// Wired-AND of every device's level at the cursor
    pub fn line_level(&self, complement: bool) -> bool {
        self.devices
            .iter()
            .all(|d| d.line_level(self.cursor, complement))
    }

    fn read_slot(&mut self) -> Result<bool, ProtocolError> {
        if self.mode != BusMode::Searching {
            return Err(ProtocolError::UnexpectedCommand(
                "read slot outside ROM search".into(),
            ));
        }

        let complement = match self.slot {
            SlotState::AwaitTrueRead => false,
            SlotState::AwaitComplementRead => true,
            SlotState::AwaitBitWrite => {
                return Err(ProtocolError::UnexpectedCommand(
                    "third read slot before a bit write".into(),
                ))
            }
        };

        if self.verbose {
            for (index, device) in self.devices.iter().enumerate() {
                if device.is_active() {
                    info!(
                        "bus:   in search [{:02}] {}bit:{}",
                        index,
                        if complement { '~' } else { ' ' },
                        u8::from(device.line_level(self.cursor, complement))
                    );
                }
            }
        }

        let level = self.line_level(complement);
        self.slot = if complement {
            SlotState::AwaitBitWrite
        } else {
            SlotState::AwaitComplementRead
        };
        self.read_slots += 1;

        bus_trace!(self.verbose, "bus:   <= {}", u8::from(level));
        Ok(level)
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), ProtocolError> {
        if self.mode != BusMode::Searching || self.slot != SlotState::AwaitBitWrite {
            return Err(ProtocolError::UnexpectedCommand(format!(
                "bit write {} while {:?}/{:?}",
                u8::from(bit),
                self.mode,
                self.slot
            )));
        }

        let cursor = self.cursor;
        let verbose = self.verbose;
        for (index, device) in self.devices.iter_mut().enumerate() {
            if device.is_active() && !device.matches(cursor, bit) {
                bus_trace!(verbose, "bus:   removing: {:02}", index);
                device.deactivate();
            }
        }

        // stays at the width; further cycles keep reading as exhausted
        self.cursor = self.cursor.saturating_add(1).min(self.width);
        if self.cursor >= self.width {
            bus_trace!(self.verbose, "bus:   all {} bits consumed", self.width);
            for device in &mut self.devices {
                device.deactivate();
            }
        }
        self.slot = SlotState::AwaitTrueRead;
        Ok(())
    }

    /// Render the active devices, one line each
    pub fn device_table(&self) -> Vec<String> {
        self.devices
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_active())
            .map(|(index, d)| {
                let value = d.id().value();
                format!(
                    "devices[{:02}] = {} (0b{})  current bit pos:{:02} → {}",
                    index,
                    format_decimal(value, self.width),
                    format_bits_msb_first(value, self.width),
                    self.cursor,
                    format_bit(value, self.cursor)
                )
            })
            .collect()
    }

    /// Log the device table at info level
    pub fn log_device_table(&self) {
        info!("bus: {} devices, {} bits", self.devices.len(), self.width);
        for line in self.device_table() {
            info!("bus: {}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn searching_bus(width: u8, ids: &[u64]) -> BusSimulator {
        let mut bus = BusSimulator::new(width, ids).unwrap();
        bus.process(Command::Reset).unwrap();
        bus.process(Command::Search).unwrap();
        bus
    }

    fn read_pair(bus: &mut BusSimulator) -> (bool, bool) {
        let first = bus.process(Command::Read).unwrap();
        let second = bus.process(Command::Read).unwrap();
        match (first, second) {
            (BusReply::Bit(a), BusReply::Bit(b)) => (a, b),
            other => panic!("expected two bits, got {:?}", other),
        }
    }

    #[test]
    fn test_new_validates_input() {
        assert!(matches!(BusSimulator::new(8, &[]), Err(SimError::NoDevices)));
        assert!(matches!(
            BusSimulator::new(1, &[0]),
            Err(SimError::InvalidWidth(1))
        ));
        assert!(matches!(
            BusSimulator::new(65, &[0]),
            Err(SimError::InvalidWidth(65))
        ));
        assert!(matches!(
            BusSimulator::new(2, &[4]),
            Err(SimError::ValueTooWide { value: 4, width: 2 })
        ));
        assert!(matches!(
            BusSimulator::new(4, &[3, 5, 3]),
            Err(SimError::DuplicateId(3))
        ));
        assert!(BusSimulator::new(64, &[u64::MAX, 0]).is_ok());
    }

    #[test]
    fn test_state_machine() {
        let mut bus = BusSimulator::new(3, &[0b001]).unwrap();
        assert_eq!(bus.mode(), BusMode::Idle);

        bus.process(Command::Reset).unwrap();
        assert_eq!(bus.mode(), BusMode::Reset);

        bus.process(Command::Search).unwrap();
        assert_eq!(bus.mode(), BusMode::Searching);
        assert_eq!(bus.slot(), SlotState::AwaitTrueRead);

        bus.process(Command::Read).unwrap();
        assert_eq!(bus.slot(), SlotState::AwaitComplementRead);
        bus.process(Command::Read).unwrap();
        assert_eq!(bus.slot(), SlotState::AwaitBitWrite);
        bus.process(Command::WriteBit(true)).unwrap();
        assert_eq!(bus.slot(), SlotState::AwaitTrueRead);
        assert_eq!(bus.cursor(), 1);
    }

    #[test]
    fn test_read_outside_search_is_rejected() {
        let mut bus = BusSimulator::new(3, &[0b001]).unwrap();
        bus.process(Command::Reset).unwrap();
        assert!(bus.process(Command::Read).is_err());
        assert_eq!(bus.read_slots(), 0);
    }

    #[test]
    fn test_out_of_sequence_traffic_is_rejected() {
        let mut bus = searching_bus(3, &[0b001, 0b011]);

        // write before any read
        assert!(bus.process(Command::WriteBit(true)).is_err());
        assert_eq!(bus.cursor(), 0);

        read_pair(&mut bus);
        // third read in a row
        assert!(bus.process(Command::Read).is_err());
        assert_eq!(bus.slot(), SlotState::AwaitBitWrite);
        assert_eq!(bus.active_count(), 2);
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        let mut bus = searching_bus(3, &[0b001]);
        assert!(bus.process(Command::Unknown(b'x')).is_err());
        assert_eq!(bus.slot(), SlotState::AwaitTrueRead);
    }

    #[test]
    fn test_quit() {
        let mut bus = BusSimulator::new(3, &[0b001]).unwrap();
        assert_eq!(bus.process(Command::Quit).unwrap(), BusReply::Quit);
    }

    #[test]
    fn test_two_device_walk() {
        let mut bus = searching_bus(3, &[0b001, 0b011]);

        // bit 0: both 1 → forced one
        assert_eq!(read_pair(&mut bus), (true, false));
        bus.process(Command::WriteBit(true)).unwrap();
        assert_eq!(bus.active_count(), 2);

        // bit 1: 0 vs 1 → contested
        assert_eq!(read_pair(&mut bus), (false, false));
        bus.process(Command::WriteBit(false)).unwrap();
        assert_eq!(bus.active_count(), 1);
        assert!(bus.devices()[0].is_active());
        assert!(!bus.devices()[1].is_active());

        // bit 2: only 0b001 left → forced zero
        assert_eq!(read_pair(&mut bus), (false, true));
        bus.process(Command::WriteBit(false)).unwrap();

        // width consumed → exhausted
        assert_eq!(bus.active_count(), 0);
        assert_eq!(read_pair(&mut bus), (true, true));
    }

    #[test]
    fn test_cycles_past_the_width_stay_exhausted() {
        let mut bus = searching_bus(2, &[1]);

        assert_eq!(read_pair(&mut bus), (true, false));
        bus.process(Command::WriteBit(true)).unwrap();
        assert_eq!(read_pair(&mut bus), (false, true));
        bus.process(Command::WriteBit(false)).unwrap();

        for _ in 0..300 {
            assert_eq!(read_pair(&mut bus), (true, true));
            bus.process(Command::WriteBit(false)).unwrap();
        }
        assert_eq!(bus.cursor(), 2);
        assert_eq!(bus.active_count(), 0);

        bus.process(Command::Reset).unwrap();
        bus.process(Command::Search).unwrap();
        assert_eq!(read_pair(&mut bus), (true, false));
    }

    #[test]
    fn test_elimination_is_monotonic_until_reset() {
        let mut bus = searching_bus(3, &[0b000, 0b001]);

        read_pair(&mut bus);
        bus.process(Command::WriteBit(true)).unwrap();
        assert!(!bus.devices()[0].is_active());

        // a later bit that device 0 would match does not bring it back
        read_pair(&mut bus);
        bus.process(Command::WriteBit(false)).unwrap();
        assert!(!bus.devices()[0].is_active());
        assert!(bus.devices()[1].is_active());

        bus.process(Command::Reset).unwrap();
        assert_eq!(bus.active_count(), 2);
        assert_eq!(bus.cursor(), 0);
    }

    #[test]
    fn test_reset_mid_cycle() {
        let mut bus = searching_bus(3, &[0b001]);
        bus.process(Command::Read).unwrap();
        bus.process(Command::Reset).unwrap();
        bus.process(Command::Search).unwrap();
        assert_eq!(bus.slot(), SlotState::AwaitTrueRead);
        assert_eq!(read_pair(&mut bus), (true, false));
    }

    #[test]
    fn test_verbose_toggle() {
        let mut bus = BusSimulator::new(3, &[0b001]).unwrap();
        assert!(!bus.verbose());
        bus.process(Command::Verbose).unwrap();
        assert!(bus.verbose());
        bus.process(Command::Verbose).unwrap();
        assert!(!bus.verbose());
    }

    #[test]
    fn test_device_table() {
        let mut bus = searching_bus(8, &[3, 200]);
        let table = bus.device_table();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table[0],
            "devices[00] = 003 (0b00000011)  current bit pos:00 → 1"
        );

        read_pair(&mut bus);
        bus.process(Command::WriteBit(true)).unwrap();
        assert_eq!(bus.device_table().len(), 1);
    }

    #[test]
    fn test_from_config() {
        let config = BusConfig {
            width: 4,
            devices: vec![1, 2, 3],
        };
        let bus = BusSimulator::from_config(&config).unwrap();
        assert_eq!(bus.width(), 4);
        assert_eq!(bus.devices().len(), 3);
    }

    proptest! {
        #[test]
        fn read_pair_is_and_of_active_bits(
            ids in prop::collection::hash_set(0u64..256, 1..12),
            writes in prop::collection::vec(any::<bool>(), 0..8),
        ) {
            let ids: Vec<u64> = ids.into_iter().collect();
            let mut bus = searching_bus(8, &ids);

            for &bit in &writes {
                let cursor = bus.cursor();
                let active: Vec<u64> = bus
                    .devices()
                    .iter()
                    .filter(|d| d.is_active())
                    .map(|d| d.id().value())
                    .collect();
                let expect_true = active.iter().all(|v| (v >> cursor) & 1 == 1);
                let expect_comp = active.iter().all(|v| (v >> cursor) & 1 == 0);

                prop_assert_eq!(read_pair(&mut bus), (expect_true, expect_comp));

                let before: Vec<bool> = bus.devices().iter().map(|d| d.is_active()).collect();
                bus.process(Command::WriteBit(bit)).unwrap();
                for (was, dev) in before.iter().zip(bus.devices()) {
                    // never reactivated by a write
                    prop_assert!(*was || !dev.is_active());
                }
            }
        }
    }
}
