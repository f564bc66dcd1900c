//! C3 — the pass framework (§4.1): the `Pass` trait, a fixed-point driver
//! with an oscillation guard, and a multi-level cost-accepting driver that
//! can wrap AST- and ASM-level passes around the MIR loop.

use log::{debug, trace, warn};

use crate::analysis::peak_pressure;
use crate::config::PipelineConfig;
use crate::error::{CoreError, CoreResult};
use crate::ir::Module;

/// A single optimization pass over a [`Module`].
///
/// `run` returns whether it changed the module; the driver reapplies the
/// full pass list until a whole round reports no change, capped at
/// `PipelineConfig::max_mir_iterations`. Errors are fatal and are reported
/// with the name of the pass that produced them (§4.1).
pub trait Pass {
    fn name(&self) -> &'static str;

    fn run(&mut self, module: &mut Module) -> CoreResult<bool>;

    /// A handful of passes (DCE when size did not grow, lambda lifting) are
    /// unconditionally accepted by the multi-level driver regardless of
    /// what the cost model says (§4.1). Default: no.
    fn always_accept(&self) -> bool {
        false
    }
}

/// Applies a fixed, ordered list of passes to a module until a whole round
/// makes no change, capped at `config.max_mir_iterations` (§4.1 default
/// 10).
pub struct PassDriver {
    passes: Vec<Box<dyn Pass>>,
}

impl PassDriver {
    pub fn new(passes: Vec<Box<dyn Pass>>) -> Self {
        PassDriver { passes }
    }

    /// Run every pass in order, repeating the whole list until a round
    /// makes no change or the iteration cap is hit. Returns the number of
    /// rounds actually run.
    pub fn run_to_fixed_point(
        &mut self,
        module: &mut Module,
        config: &PipelineConfig,
    ) -> CoreResult<usize> {
        for round in 0..config.max_mir_iterations {
            let mut changed_this_round = false;
            for pass in &mut self.passes {
                match pass.run(module) {
                    Ok(changed) => {
                        if changed {
                            debug!("pass `{}` changed the module (round {round})", pass.name());
                            changed_this_round = true;
                        } else {
                            trace!("pass `{}` made no change (round {round})", pass.name());
                        }
                    }
                    Err(e) => {
                        warn!("pass `{}` failed: {e}", pass.name());
                        return Err(e);
                    }
                }
            }
            if !changed_this_round {
                return Ok(round + 1);
            }
        }
        Ok(config.max_mir_iterations)
    }
}

/// A scalar cost estimate for a module or function: a weighted sum of
/// estimated cycles, size in bytes, and peak live-register pressure
/// (§4.1).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Cost {
    pub cycles: f64,
    pub size_bytes: f64,
    pub pressure: f64,
}

impl Cost {
    pub fn weighted(&self, config: &PipelineConfig) -> f64 {
        self.cycles * config.cost_weight_cycles
            + self.size_bytes * config.cost_weight_size
            + self.pressure * config.cost_weight_pressure
    }

    /// Estimate the cost of a single function: instruction count stands in
    /// for both a rough cycle estimate and byte size (one MIR instruction
    /// is assumed to lower to one Z80 instruction on average pre-codegen;
    /// the ASM-level cost model in [`crate::asm::cycles`] is the precise
    /// one used once real assembly exists), plus peak register pressure.
    pub fn estimate(f: &crate::ir::Function) -> Cost {
        let n = f.instructions.len() as f64;
        Cost {
            cycles: n * 4.0, // a flat average T-state estimate pre-codegen
            size_bytes: n * 3.0,
            pressure: peak_pressure(f) as f64,
        }
    }
}

/// Tracks the last four cost samples of a fixed-point loop and detects
/// oscillation: alternation between exactly two values (§4.1, §7).
#[derive(Default)]
pub struct OscillationGuard {
    samples: std::collections::VecDeque<f64>,
}

impl OscillationGuard {
    pub fn new() -> Self {
        OscillationGuard::default()
    }

    /// Record a new sample. Returns `true` if the last four samples
    /// alternate between two values (a b a b).
    pub fn push(&mut self, cost: f64) -> bool {
        self.samples.push_back(cost);
        if self.samples.len() > 4 {
            self.samples.pop_front();
        }
        if self.samples.len() < 4 {
            return false;
        }
        let v: Vec<f64> = self.samples.iter().copied().collect();
        let eps = 1e-9;
        (v[0] - v[2]).abs() < eps && (v[1] - v[3]).abs() < eps && (v[0] - v[1]).abs() > eps
    }
}

/// A pass level: which IR the pass operates on, for the multi-level
/// driver's orchestration around the MIR fixed-point loop (§4.1).
pub enum Level {
    /// An AST-level pass (e.g. lambda lifting), run before lowering.
    Ast,
    /// The MIR fixed-point loop itself.
    Mir,
    /// An ASM-level pass (peephole, scheduler), run after codegen.
    Asm,
}

/// Orchestrates AST/MIR/ASM-level passes, accepting or rejecting each
/// pass's result based on the weighted [`Cost`] before and after, with a
/// tie-break preferring fewer live registers over smaller size (§4.1).
pub struct MultiLevelDriver {
    pub config: PipelineConfig,
    guard: OscillationGuard,
}

impl MultiLevelDriver {
    pub fn new(config: PipelineConfig) -> Self {
        MultiLevelDriver {
            config,
            guard: OscillationGuard::new(),
        }
    }

    /// Decide whether to accept a pass's result for a single function,
    /// given the cost before and after. A change is accepted when the
    /// post-cost is strictly lower, or equal but winning the tie-break
    /// (fewer live registers, then smaller size).
    pub fn accept(&self, before: Cost, after: Cost) -> bool {
        let wb = before.weighted(&self.config);
        let wa = after.weighted(&self.config);
        if wa < wb {
            return true;
        }
        if (wa - wb).abs() < 1e-9 {
            if after.pressure < before.pressure {
                return true;
            }
            if (after.pressure - before.pressure).abs() < 1e-9 && after.size_bytes < before.size_bytes
            {
                return true;
            }
        }
        false
    }

    /// Run one MIR-level pass over a single function's module-wide effect,
    /// recording a cost sample for oscillation detection and returning
    /// whether the net module cost after running it should be accepted.
    /// Unconditionally-accepted passes (`Pass::always_accept`) skip the
    /// cost comparison entirely.
    pub fn run_accepting(
        &mut self,
        pass: &mut dyn Pass,
        module: &mut Module,
    ) -> CoreResult<bool> {
        let snapshot = module.clone();
        let changed = pass.run(module)?;
        if !changed {
            return Ok(false);
        }
        if pass.always_accept() {
            debug!("pass `{}` unconditionally accepted", pass.name());
            return Ok(true);
        }

        // Accept or reject per function, not as a flat module-wide total —
        // one function regressing shouldn't be masked by another improving.
        let mut any_accepted = false;
        let mut after_total = 0.0;
        for f in module.functions_mut() {
            let Some(before_fn) = snapshot.function(f.name) else {
                // the pass created a function with no prior snapshot to
                // compare against (none in the current pass list do this).
                any_accepted = true;
                after_total += Cost::estimate(f).weighted(&self.config);
                continue;
            };
            let before_cost = Cost::estimate(before_fn);
            let after_cost = Cost::estimate(f);
            if self.accept(before_cost, after_cost) {
                any_accepted = true;
                after_total += after_cost.weighted(&self.config);
            } else {
                debug!(
                    "pass `{}` rejected on `{}`: cost rose from {} to {}",
                    pass.name(),
                    f.name,
                    before_cost.weighted(&self.config),
                    after_cost.weighted(&self.config)
                );
                *f = before_fn.clone();
                after_total += before_cost.weighted(&self.config);
            }
        }

        if self.guard.push(after_total) {
            warn!(
                "cost oscillation detected after pass `{}`, stopping at current state",
                pass.name()
            );
            return Err(CoreError::Oscillation {
                pass: pass.name().to_string(),
            });
        }

        Ok(any_accepted)
    }
}

impl PassDriver {
    /// Like [`Self::run_to_fixed_point`], but each pass's result is gated
    /// through `multi_level`'s per-function cost accept/reject decision
    /// (§4.1) instead of being applied unconditionally.
    pub fn run_to_fixed_point_accepting(
        &mut self,
        module: &mut Module,
        config: &PipelineConfig,
        multi_level: &mut MultiLevelDriver,
    ) -> CoreResult<usize> {
        for round in 0..config.max_mir_iterations {
            let mut changed_this_round = false;
            for pass in &mut self.passes {
                match multi_level.run_accepting(pass.as_mut(), module) {
                    Ok(changed) => {
                        if changed {
                            debug!("pass `{}` accepted (round {round})", pass.name());
                            changed_this_round = true;
                        } else {
                            trace!("pass `{}` made no change or was rejected (round {round})", pass.name());
                        }
                    }
                    Err(e) => {
                        warn!("pass `{}` failed: {e}", pass.name());
                        return Err(e);
                    }
                }
            }
            if !changed_this_round {
                return Ok(round + 1);
            }
        }
        Ok(config.max_mir_iterations)
    }
}
