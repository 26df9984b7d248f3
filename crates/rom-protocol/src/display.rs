//! Human-readable rendering of identifiers
//!
//! Ids are printed most-significant bit first followed by the zero-padded
//! decimal value, e.g. `00000011...003` for the 8-bit id 3. The decimal column
//! is sized so that every id of a given width lines up.

use crate::rom_id::RomId;

/// Decimal column width used for ids of `bits` bits
///
/// Roughly the number of decimal digits in `2^bits - 1`, plus one spare column.
pub fn decimal_width(bits: u8) -> usize {
    match bits {
        0 => 0,
        1..=4 => 2,
        5..=8 => 3,
        9..=12 => 4,
        13..=16 => 5,
        17..=20 => 7,
        21..=24 => 8,
        25..=28 => 9,
        29..=32 => 10,
        33..=36 => 11,
        37..=40 => 13,
        41..=44 => 14,
        45..=48 => 15,
        49..=52 => 16,
        53..=56 => 17,
        57..=60 => 19,
        _ => 20,
    }
}

/// Render the low `width` bits of `value`, most-significant first
pub fn format_bits_msb_first(value: u64, width: u8) -> String {
    (0..width.min(64))
        .rev()
        .map(|pos| if (value >> pos) & 1 == 1 { '1' } else { '0' })
        .collect()
}

/// Render a single bit of `value`
pub fn format_bit(value: u64, pos: u8) -> char {
    if pos < 64 && (value >> pos) & 1 == 1 {
        '1'
    } else {
        '0'
    }
}

/// Render an identifier as `bits...decimal`
pub fn format_rom_id(id: &RomId) -> String {
    format!(
        "{}...{:0width$}",
        format_bits_msb_first(id.value(), id.width()),
        id.value(),
        width = decimal_width(id.width())
    )
}

/// Render a zero-padded decimal value for ids of `bits` bits
pub fn format_decimal(value: u64, bits: u8) -> String {
    format!("{:0width$}", value, width = decimal_width(bits))
}
