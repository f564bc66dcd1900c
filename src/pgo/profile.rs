//! The profile file (§6): per-PC measurements fed back into the layout
//! pass. Loaded directly with no schema version negotiation, unlike the
//! TAS format — a stale profile just makes for a worse layout, never a
//! parse failure worth guarding against.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::Map;
use crate::error::CoreResult;

/// Measured execution data for one module, keyed by the PC values the
/// emulator observed during a representative run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Profile {
    /// How often a PC's block executed, relative to the module's busiest
    /// block (normalized so the hottest entry is near `1.0`).
    pub block_frequency: Map<u16, f64>,
    /// How lopsided a conditional branch at this PC was: `-1.0` always
    /// falls through, `+1.0` always taken.
    pub branch_bias: Map<u16, f64>,
    /// Static loop nesting depth at this PC (0 = not in a loop).
    pub loop_depth: Map<u16, u8>,
    /// Page-sized memory regions actually touched during the run.
    pub working_set: Vec<u16>,
    /// PCs where a TRUE-SMC/SMC patch fired at least once.
    pub smc_hotspots: Vec<u16>,
}

impl Profile {
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> CoreResult<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// The frequency threshold above which a block counts as "hot" for a
    /// given percentile (§4.13, e.g. top 10% -> `percentile = 0.90`).
    pub fn hot_threshold(&self, percentile: f64) -> f64 {
        let mut values: Vec<f64> = self.block_frequency.values().copied().collect();
        if values.is_empty() {
            return f64::INFINITY;
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let idx = ((values.len() as f64 - 1.0) * percentile.clamp(0.0, 1.0)).round() as usize;
        values[idx.min(values.len() - 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hot_threshold_on_an_empty_profile_excludes_everything() {
        let profile = Profile::default();
        assert_eq!(profile.hot_threshold(0.9), f64::INFINITY);
    }

    #[test]
    fn hot_threshold_picks_the_requested_percentile() {
        let mut profile = Profile::default();
        for (pc, freq) in [(1u16, 0.1), (2, 0.5), (3, 0.9), (4, 1.0)] {
            profile.block_frequency.insert(pc, freq);
        }
        let threshold = profile.hot_threshold(0.75);
        assert!(threshold >= 0.9);
    }

    #[test]
    fn round_trips_through_json() {
        let dir = std::env::temp_dir().join(format!("minzc-profile-{}", std::process::id()));
        let mut profile = Profile::default();
        profile.block_frequency.insert(100, 0.8);
        profile.smc_hotspots.push(200);
        profile.save(&dir).unwrap();
        let loaded = Profile::load(&dir).unwrap();
        assert_eq!(loaded.block_frequency.get(&100), Some(&0.8));
        assert_eq!(loaded.smc_hotspots, vec![200]);
        let _ = std::fs::remove_file(&dir);
    }
}
