//! Optimization level, target platform tag, and pipeline thresholds (§4.15,
//! §6). Mirrors the teacher's `smolc::Output` pattern of a `clap::ValueEnum`
//! driving which part of the pipeline a CLI invocation exercises.

use clap::ValueEnum;

/// Which MIR passes the driver includes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Default)]
pub enum OptLevel {
    /// No passes run at all.
    None,
    /// Constant folding, DCE, MIR peephole, tail-recursion elimination.
    #[default]
    Basic,
    /// Everything in `Basic` plus inlining, scheduling, TRUE-SMC, SMC, and
    /// the ASM-level peephole/scheduler/PGO layout.
    Full,
}

/// Target platform tag (§6). Each variant corresponds to an entry in the
/// platform memory-map table consulted by the PGO layout pass (§4.13).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
#[allow(clippy::upper_case_acronyms)]
pub enum Target {
    Spectrum,
    Pentagon,
    Scorpion,
    Kay,
    Profi,
    Atm,
    Timex,
    Sam,
    Msx,
    Msx2,
    Amstrad,
    Cpm,
}

impl Target {
    /// The platform-table key used by [`crate::pgo::platform`].
    pub fn tag(self) -> &'static str {
        match self {
            Target::Spectrum => "spectrum",
            Target::Pentagon => "pentagon",
            Target::Scorpion => "scorpion",
            Target::Kay => "kay",
            Target::Profi => "profi",
            Target::Atm => "atm",
            Target::Timex => "timex",
            Target::Sam => "sam",
            Target::Msx => "msx",
            Target::Msx2 => "msx2",
            Target::Amstrad => "amstrad",
            Target::Cpm => "cpm",
        }
    }
}

/// Tunable thresholds for the pipeline, with the defaults named throughout
/// §4. Kept as one struct (rather than scattering constants through each
/// pass) so a CLI or test can override them without touching pass code.
#[derive(Clone, Copy, Debug)]
pub struct PipelineConfig {
    /// Cap on MIR fixed-point rounds (§4.1 default 10).
    pub max_mir_iterations: usize,
    /// Cap on ASM peephole sweeps (§4.11 default 5).
    pub max_asm_iterations: usize,
    /// Inliner size threshold in instructions (§4.5 default 10).
    pub inline_size_threshold: usize,
    /// Minimum read count for a value to become SMC-tracked (§4.8, "≥2 uses").
    pub smc_min_reads: usize,
    /// Maximum write count for a value to remain SMC-tracked (§4.8, "≤3").
    pub smc_max_writes: usize,
    /// Cost-function weights for the multi-level driver's accept/reject
    /// decision (§4.1): cycles, size in bytes, peak live-register count.
    pub cost_weight_cycles: f64,
    pub cost_weight_size: f64,
    pub cost_weight_pressure: f64,
    /// Top-percentile threshold for "hot" classification in PGO (§4.13,
    /// default top 10%).
    pub hot_threshold_percentile: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            max_mir_iterations: 10,
            max_asm_iterations: 5,
            inline_size_threshold: 10,
            smc_min_reads: 2,
            smc_max_writes: 3,
            cost_weight_cycles: 1.0,
            cost_weight_size: 0.25,
            cost_weight_pressure: 2.0,
            hot_threshold_percentile: 0.90,
        }
    }
}
