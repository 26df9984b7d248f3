//! Device populations for the simulated bus
//!
//! A population is either read from a text file or generated at random.
//!
//! # File format
//! ```text
//! <number of devices>
//! <number of bits>
//! <unique id>        (one line per device)
//! ```
//! Numbers are decimal or `0x`-prefixed hex. Blank lines are skipped.

use std::collections::HashSet;
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rom_protocol::rom_id::width_mask;
use rom_protocol::{MAX_ROM_BITS, MIN_ROM_BITS};
use tracing::{debug, info};

use crate::bus::BusConfig;
use crate::error::SimError;

/// Most devices a random population may ask for
pub const MAX_RANDOM_DEVICES: usize = 1 << 16;

/// Load a population file
pub fn load_population(path: impl AsRef<Path>) -> Result<BusConfig, SimError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let config = parse_population(&text)?;
    info!(
        "Loaded {} devices ({} bits) from {}",
        config.devices.len(),
        config.width,
        path.display()
    );
    Ok(config)
}

/// Parse the contents of a population file
pub fn parse_population(text: &str) -> Result<BusConfig, SimError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let (line, field) = lines.next().ok_or(SimError::Parse {
        line: 1,
        reason: "missing device count".into(),
    })?;
    let count = usize::try_from(parse_number(field, line)?).map_err(|_| SimError::Parse {
        line,
        reason: format!("device count out of range: {}", field),
    })?;

    let (line, field) = lines.next().ok_or(SimError::Parse {
        line: line + 1,
        reason: "missing bit size".into(),
    })?;
    let width = u8::try_from(parse_number(field, line)?).map_err(|_| SimError::Parse {
        line,
        reason: format!("bit size out of range: {}", field),
    })?;

    // the declared count is untrusted; grow with the lines actually present
    let mut devices = Vec::new();
    for (line, field) in lines.by_ref().take(count) {
        devices.push(parse_number(field, line)?);
    }
    if devices.len() < count {
        return Err(SimError::CountMismatch {
            expected: count,
            found: devices.len(),
        });
    }
    if let Some((line, _)) = lines.next() {
        debug!("Ignoring trailing data from line {}", line);
    }

    Ok(BusConfig { width, devices })
}

fn parse_number(field: &str, line: usize) -> Result<u64, SimError> {
    let parsed = match field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => field.parse::<u64>(),
    };
    parsed.map_err(|e| SimError::Parse {
        line,
        reason: format!("invalid number {:?}: {}", field, e),
    })
}

/// Generate between 1 and `max_devices` unique random ids of `width` bits
///
/// The id space must be at least twice the device limit, otherwise picking
/// unique ids by rejection would crawl. The limit itself is capped at
/// [`MAX_RANDOM_DEVICES`].
pub fn random_population<R: Rng>(
    rng: &mut R,
    width: u8,
    max_devices: usize,
) -> Result<BusConfig, SimError> {
    if !(MIN_ROM_BITS..=MAX_ROM_BITS).contains(&width) {
        return Err(SimError::InvalidWidth(width));
    }
    if max_devices == 0 {
        return Err(SimError::NoDevices);
    }
    if max_devices > MAX_RANDOM_DEVICES {
        return Err(SimError::TooManyDevices {
            requested: max_devices,
            max: MAX_RANDOM_DEVICES,
        });
    }

    let mask = width_mask(width);
    if max_devices as u64 > (mask >> 1) {
        return Err(SimError::InsufficientIdSpace {
            requested: max_devices,
            width,
            max: mask >> 1,
        });
    }

    let count = rng.gen_range(1..=max_devices);
    let mut seen = HashSet::with_capacity(count);
    let mut devices = Vec::with_capacity(count);
    while devices.len() < count {
        let value = rng.gen::<u64>() & mask;
        if seen.insert(value) {
            devices.push(value);
        }
    }

    info!("Generated {} random devices ({} bits)", count, width);
    Ok(BusConfig { width, devices })
}

/// Generate a reproducible random population from a seed
pub fn seeded_population(
    seed: u64,
    width: u8,
    max_devices: usize,
) -> Result<BusConfig, SimError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    random_population(&mut rng, width, max_devices)
}
