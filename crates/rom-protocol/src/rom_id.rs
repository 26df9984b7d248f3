//! Fixed-width ROM identifiers
//!
//! Bits arrive on the line least-significant first, so index `j` of the bit
//! sequence is bit `j` of the value. An id of width W is equally well described
//! by its W received bits or by its unsigned value; [`RomId`] converts freely
//! between the two.

use std::fmt;

use crate::error::ParseError;

/// Narrowest identifier the bus supports
pub const MIN_ROM_BITS: u8 = 2;

/// Widest identifier the bus supports
pub const MAX_ROM_BITS: u8 = 64;

/// A complete device identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RomId {
    value: u64,
    width: u8,
}

impl RomId {
    /// Create an id from its value, masking off anything above `width` bits
    pub fn new(value: u64, width: u8) -> Result<Self, ParseError> {
        if width == 0 || width > MAX_ROM_BITS {
            return Err(ParseError::InvalidWidth(width));
        }
        Ok(Self {
            value: value & width_mask(width),
            width,
        })
    }

    /// Reconstruct an id from bits in receipt order (LSB first)
    pub fn from_bits(bits: &[bool]) -> Result<Self, ParseError> {
        if bits.len() > MAX_ROM_BITS as usize {
            return Err(ParseError::IdTooLong(bits.len()));
        }
        if bits.is_empty() {
            return Err(ParseError::InvalidWidth(0));
        }

        let value = bits
            .iter()
            .enumerate()
            .filter(|(_, &bit)| bit)
            .fold(0u64, |acc, (j, _)| acc | (1u64 << j));

        Ok(Self {
            value,
            width: bits.len() as u8,
        })
    }

    /// The unsigned value
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Width in bits
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Bit `j`, or `None` past the id's width
    pub fn bit(&self, j: u8) -> Option<bool> {
        (j < self.width).then(|| (self.value >> j) & 1 == 1)
    }

    /// Bits in receipt order (LSB first)
    pub fn bits(&self) -> Vec<bool> {
        (0..self.width).map(|j| (self.value >> j) & 1 == 1).collect()
    }
}

impl fmt::Display for RomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::display::format_rom_id(self))
    }
}

/// Mask covering the low `width` bits
pub fn width_mask(width: u8) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_bits_lsb_first() {
        // received 1, 0, 0 → 0b001
        let id = RomId::from_bits(&[true, false, false]).unwrap();
        assert_eq!(id.value(), 1);
        assert_eq!(id.width(), 3);

        // received 1, 1, 0 → 0b011
        let id = RomId::from_bits(&[true, true, false]).unwrap();
        assert_eq!(id.value(), 3);
    }

    #[test]
    fn test_from_bits_limits() {
        assert_eq!(RomId::from_bits(&[]), Err(ParseError::InvalidWidth(0)));
        assert_eq!(
            RomId::from_bits(&[false; 65]),
            Err(ParseError::IdTooLong(65))
        );
        let full = RomId::from_bits(&[true; 64]).unwrap();
        assert_eq!(full.value(), u64::MAX);
    }

    #[test]
    fn test_new_masks_value() {
        let id = RomId::new(0xFF, 4).unwrap();
        assert_eq!(id.value(), 0x0F);
        assert!(RomId::new(1, 0).is_err());
        assert!(RomId::new(1, 65).is_err());
    }

    #[test]
    fn test_bit_access() {
        let id = RomId::new(0b101, 3).unwrap();
        assert_eq!(id.bit(0), Some(true));
        assert_eq!(id.bit(1), Some(false));
        assert_eq!(id.bit(2), Some(true));
        assert_eq!(id.bit(3), None);
    }

    #[test]
    fn test_width_mask() {
        assert_eq!(width_mask(2), 0b11);
        assert_eq!(width_mask(8), 0xFF);
        assert_eq!(width_mask(64), u64::MAX);
    }

    proptest! {
        #[test]
        fn value_and_bits_agree(value: u64, width in 1u8..=64) {
            let id = RomId::new(value, width).unwrap();
            let bits = id.bits();
            prop_assert_eq!(bits.len(), width as usize);
            for (j, bit) in bits.iter().enumerate() {
                prop_assert_eq!(*bit, (id.value() >> j) & 1 == 1);
            }
            prop_assert_eq!(RomId::from_bits(&bits).unwrap(), id);
        }
    }
}
