//! Error types for the bus simulator

use thiserror::Error;

/// Errors that can occur while building a simulated bus
#[derive(Debug, Error)]
pub enum SimError {
    /// A bus needs at least one device
    #[error("no devices on the bus")]
    NoDevices,

    /// Identifier width outside 2..=64
    #[error("invalid identifier width {0} (expected 2..=64)")]
    InvalidWidth(u8),

    /// Identifier does not fit in the bus width
    #[error("identifier {value} does not fit in {width} bits")]
    ValueTooWide { value: u64, width: u8 },

    /// Two devices share an identifier
    #[error("duplicate identifier: {0}")]
    DuplicateId(u64),

    /// Population file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Population file line could not be parsed
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// Population file lists fewer ids than it declares
    #[error("expected {expected} identifiers, found {found}")]
    CountMismatch { expected: usize, found: usize },

    /// Too many devices requested for the id space to generate them randomly
    #[error(
        "{width} bits is not enough to randomly generate {requested} devices \
         (increase the bit size or reduce the device count to {max} or less)"
    )]
    InsufficientIdSpace { requested: usize, width: u8, max: u64 },

    /// Random population limit above what the generator will produce
    #[error("cannot randomly generate up to {requested} devices (at most {max})")]
    TooManyDevices { requested: usize, max: usize },
}
