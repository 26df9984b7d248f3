//! Virtual devices on the simulated line

use rom_protocol::RomId;

/// A single device attached to the bus
///
/// The id never changes. The `active` flag tracks whether the device is still
/// a candidate for the branch currently being driven: it is set on every bus
/// reset and cleared as soon as the device's bits stop matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualDevice {
    id: RomId,
    active: bool,
}

impl VirtualDevice {
    /// Create a new device, active until the first elimination
    pub fn new(id: RomId) -> Self {
        Self { id, active: true }
    }

    /// The device's identifier
    pub fn id(&self) -> RomId {
        self.id
    }

    /// Whether the device is still answering read slots
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Put the device back on the line
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Take the device off the line until the next reset
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// The level this device drives in a read slot at bit `pos`
    ///
    /// An inactive device, or one read past its width, leaves the line to the
    /// pull-up and reads as 1 regardless of `complement`.
    pub fn line_level(&self, pos: u8, complement: bool) -> bool {
        if !self.active {
            return true;
        }
        match self.id.bit(pos) {
            Some(bit) => bit != complement,
            None => true,
        }
    }

    /// Whether the device's true bit at `pos` equals `bit`
    pub fn matches(&self, pos: u8, bit: bool) -> bool {
        self.id.bit(pos) == Some(bit)
    }
}
