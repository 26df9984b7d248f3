//! ROM Search Bus Simulation Library
//!
//! This crate simulates the far side of a 1-Wire style line so a search
//! engine can be exercised without hardware. It includes:
//!
//! - **VirtualDevice**: one device with a fixed id and a per-search candidate flag
//! - **BusSimulator**: the open-drain line shared by every device, answering
//!   read slots with the wired-AND of the active devices
//! - **run_bus_task**: an async task serving the bus over a byte stream
//! - **population**: loading device ids from a file or generating them randomly
//!
//! # Example
//!
//! ```rust
//! use rom_protocol::Command;
//! use rom_sim::{BusReply, BusSimulator};
//!
//! let mut bus = BusSimulator::new(3, &[0b001, 0b011]).unwrap();
//!
//! bus.process(Command::Reset).unwrap();
//! bus.process(Command::Search).unwrap();
//!
//! // both devices carry a 1 at bit 0
//! assert_eq!(bus.process(Command::Read).unwrap(), BusReply::Bit(true));
//! assert_eq!(bus.process(Command::Read).unwrap(), BusReply::Bit(false));
//! ```

pub mod bus;
pub mod bus_task;
pub mod device;
pub mod error;
pub mod population;

pub use bus::{BusConfig, BusMode, BusReply, BusSimulator, SlotState};
pub use bus_task::{run_bus_task, BusTaskCommand};
pub use device::VirtualDevice;
pub use error::SimError;
pub use population::{
    load_population, parse_population, random_population, seeded_population, MAX_RANDOM_DEVICES,
};
