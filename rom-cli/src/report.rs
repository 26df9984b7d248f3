//! Search results as printed by the binary

use rom_protocol::display::format_rom_id;
use rom_search::{DiscoveredId, Frontier, SearchStats};
use serde::{Deserialize, Serialize};

/// Everything a finished search found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchReport {
    /// Identifiers in discovery order
    pub devices: Vec<DiscoveredId>,
    /// Counters from the engine
    pub stats: SearchStats,
}

impl SearchReport {
    pub fn new(frontier: &Frontier, stats: SearchStats) -> Self {
        Self {
            devices: frontier.discovered().collect(),
            stats,
        }
    }

    /// One line per device: bits MSB first, then the zero-padded value
    pub fn lines(&self) -> Vec<String> {
        self.devices
            .iter()
            .filter_map(DiscoveredId::rom_id)
            .map(|id| format_rom_id(&id))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
