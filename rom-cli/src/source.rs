//! Where the simulated devices come from

use std::path::PathBuf;

use rom_sim::{load_population, random_population, seeded_population, BusConfig, SimError};
use tracing::{info, warn};

/// Source of the device population for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopulationSource {
    /// Ids listed in a population file
    File(PathBuf),
    /// Randomly generated ids
    Random {
        width: u8,
        max_devices: usize,
        seed: Option<u64>,
    },
}

impl PopulationSource {
    /// Pick the source from the command line
    ///
    /// A population file always wins; a bit size or device limit given
    /// alongside it is ignored with a warning.
    pub fn select(
        file: Option<PathBuf>,
        bitsize: Option<u8>,
        max_devices: Option<usize>,
        seed: Option<u64>,
    ) -> Self {
        match file {
            Some(path) => {
                if bitsize.is_some() || max_devices.is_some() {
                    warn!(
                        "--bitsize/--max-devices are ignored when loading ids from {}",
                        path.display()
                    );
                }
                if seed.is_some() {
                    warn!("--seed is ignored when loading ids from {}", path.display());
                }
                Self::File(path)
            }
            None => Self::Random {
                width: bitsize.unwrap_or(DEFAULT_BITSIZE),
                max_devices: max_devices.unwrap_or(DEFAULT_MAX_DEVICES),
                seed,
            },
        }
    }

    /// Build the bus description
    pub fn resolve(&self) -> Result<BusConfig, SimError> {
        match self {
            Self::File(path) => load_population(path),
            Self::Random {
                width,
                max_devices,
                seed: Some(seed),
            } => {
                info!("Generating devices from seed {}", seed);
                seeded_population(*seed, *width, *max_devices)
            }
            Self::Random {
                width,
                max_devices,
                seed: None,
            } => random_population(&mut rand::thread_rng(), *width, *max_devices),
        }
    }
}

/// Default identifier width for random populations
pub const DEFAULT_BITSIZE: u8 = 8;

/// Default device limit for random populations
pub const DEFAULT_MAX_DEVICES: usize = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_wins_over_random_options() {
        let source = PopulationSource::select(Some("ids.txt".into()), Some(16), Some(4), None);
        assert_eq!(source, PopulationSource::File("ids.txt".into()));
    }

    #[test]
    fn test_random_defaults() {
        let source = PopulationSource::select(None, None, None, None);
        assert_eq!(
            source,
            PopulationSource::Random {
                width: DEFAULT_BITSIZE,
                max_devices: DEFAULT_MAX_DEVICES,
                seed: None,
            }
        );
        let config = source.resolve().unwrap();
        assert_eq!(config.width, 8);
        assert!((1..=8).contains(&config.devices.len()));
    }

    #[test]
    fn test_seed_is_reproducible() {
        let source = PopulationSource::select(None, Some(12), Some(6), Some(42));
        assert_eq!(source.resolve().unwrap(), source.resolve().unwrap());
    }

    #[test]
    fn test_missing_file() {
        let source = PopulationSource::File("/nonexistent/romsearch/ids.txt".into());
        assert!(matches!(source.resolve(), Err(SimError::Io(_))));
    }

    #[test]
    fn test_huge_device_limit() {
        let source = PopulationSource::select(None, Some(64), Some(1_000_000_000_000), Some(5));
        assert!(matches!(
            source.resolve(),
            Err(SimError::TooManyDevices { .. })
        ));
    }

    #[test]
    fn test_id_space_too_small() {
        let source = PopulationSource::select(None, Some(2), Some(8), Some(1));
        assert!(matches!(
            source.resolve(),
            Err(SimError::InsufficientIdSpace { .. })
        ));
    }
}
