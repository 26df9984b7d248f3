//! Read-pair classification
//!
//! A search engine learns about bit position `n` by issuing two read slots: the
//! first returns the wired-AND of every active device's bit `n`, the second the
//! wired-AND of the complements. The pair, first read as the high bit, is the
//! digit:
//!
//! | digit | meaning |
//! |-------|---------|
//! | `00`  | contested: devices disagree |
//! | `01`  | every active device has a 0 |
//! | `10`  | every active device has a 1 |
//! | `11`  | no device is active |

use std::fmt;

use crate::error::ParseError;

/// Two-bit classification of one bit position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Digit {
    /// `00`: at least one active device has 0 and at least one has 1
    Contested,
    /// `01`: every active device has 0
    ForcedZero,
    /// `10`: every active device has 1
    ForcedOne,
    /// `11`: nothing left on the line for this branch
    Exhausted,
}

impl Digit {
    /// Build a digit from the true and complement reads
    pub fn from_reads(true_read: bool, complement_read: bool) -> Self {
        match (true_read, complement_read) {
            (false, false) => Digit::Contested,
            (false, true) => Digit::ForcedZero,
            (true, false) => Digit::ForcedOne,
            (true, true) => Digit::Exhausted,
        }
    }

    /// Decode the numeric form (`0b00..=0b11`)
    pub fn from_bits(bits: u8) -> Result<Self, ParseError> {
        match bits {
            0b00 => Ok(Digit::Contested),
            0b01 => Ok(Digit::ForcedZero),
            0b10 => Ok(Digit::ForcedOne),
            0b11 => Ok(Digit::Exhausted),
            other => Err(ParseError::InvalidDigit(other)),
        }
    }

    /// Numeric form, first read in the high bit
    pub fn bits(&self) -> u8 {
        match self {
            Digit::Contested => 0b00,
            Digit::ForcedZero => 0b01,
            Digit::ForcedOne => 0b10,
            Digit::Exhausted => 0b11,
        }
    }

    /// The bit every active device agrees on, if they agree
    pub fn forced_bit(&self) -> Option<bool> {
        match self {
            Digit::ForcedZero => Some(false),
            Digit::ForcedOne => Some(true),
            Digit::Contested | Digit::Exhausted => None,
        }
    }

    /// Whether at least one active device carries `bit` at this position
    pub fn admits(&self, bit: bool) -> bool {
        match self {
            Digit::Contested => true,
            Digit::ForcedZero => !bit,
            Digit::ForcedOne => bit,
            Digit::Exhausted => false,
        }
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02b}", self.bits())
    }
}
