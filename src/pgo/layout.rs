//! Hot/warm/cold classification and memory-region packing (§4.13): turn a
//! [`Profile`] and a [`PlatformEntry`] into a placement per function, hot
//! code preferring non-contended regions so its cycles aren't taxed by
//! video-bus arbitration.

use crate::common::{Id, Map};
use crate::config::PipelineConfig;
use crate::ir::module::Module;
use crate::pgo::platform::PlatformEntry;
use crate::pgo::profile::Profile;

/// Rough bytes-per-instruction used only to size regions for packing; the
/// external codegen/assembler produces the real figure once it lowers MIR.
const AVG_INSTRUCTION_BYTES: usize = 3;

/// Packed functions are rounded up to this boundary (§4.13) so a hot
/// function's entry point never straddles whatever alignment the external
/// assembler assumes for call targets.
const PACKING_ALIGNMENT: usize = 16;

fn align_up(n: usize, alignment: usize) -> usize {
    (n + alignment - 1) / alignment * alignment
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Temperature {
    Hot,
    Warm,
    Cold,
}

fn classify(freq: f64, hot_threshold: f64, cold_threshold: f64) -> Temperature {
    if freq >= hot_threshold {
        Temperature::Hot
    } else if freq <= cold_threshold {
        Temperature::Cold
    } else {
        Temperature::Warm
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    pub function: Id,
    pub region: &'static str,
    pub temperature: Temperature,
}

#[derive(Clone, Debug, Default)]
pub struct LayoutPlan {
    pub placements: Vec<Placement>,
}

impl LayoutPlan {
    pub fn region_of(&self, function: Id) -> Option<&'static str> {
        self.placements.iter().find(|p| p.function == function).map(|p| p.region)
    }
}

/// Build a placement plan. `function_pc` maps each function to the PC its
/// profile data was keyed under; functions with no entry are treated as
/// never-measured (cold).
pub fn plan(
    module: &Module,
    profile: &Profile,
    function_pc: &Map<Id, u16>,
    platform: &PlatformEntry,
    config: &PipelineConfig,
) -> LayoutPlan {
    let hot_threshold = profile.hot_threshold(config.hot_threshold_percentile);
    let cold_threshold = if hot_threshold.is_finite() { hot_threshold * 0.1 } else { 0.0 };

    // The hot score is the raw block frequency multiplied by (1 + loop
    // depth) (§4.13): a block inside a loop executes its own frequency's
    // worth of instructions on every outer iteration, so a nested loop body
    // is hotter than its raw per-block count alone suggests.
    let mut entries: Vec<(Id, f64, usize)> = module
        .functions()
        .map(|f| {
            let pc = function_pc.get(&f.name);
            let freq = pc
                .and_then(|pc| profile.block_frequency.get(pc))
                .copied()
                .unwrap_or(0.0);
            let loop_depth = pc.and_then(|pc| profile.loop_depth.get(pc)).copied().unwrap_or(0);
            let weighted_freq = freq * (1.0 + loop_depth as f64);
            (f.name, weighted_freq, f.instructions.len() * AVG_INSTRUCTION_BYTES)
        })
        .collect();
    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    // Regions are packed highest-priority first, falling back to
    // non-contended-before-contended when two regions tie on priority
    // (§4.13).
    let mut regions: Vec<(&'static str, usize, usize)> = platform
        .regions
        .iter()
        .map(|r| (r.name, (r.end - r.start + 1) as usize, 0usize))
        .collect();
    regions.sort_by(|&(name_a, _, _), &(name_b, _, _)| {
        let a = platform.regions.iter().find(|r| r.name == name_a).expect("region listed above");
        let b = platform.regions.iter().find(|r| r.name == name_b).expect("region listed above");
        b.priority.cmp(&a.priority).then(a.contended.cmp(&b.contended))
    });

    let mut placements = Vec::with_capacity(entries.len());
    for (name, freq, size) in entries {
        let temperature = classify(freq, hot_threshold, cold_threshold);
        let chosen = regions
            .iter_mut()
            .find(|(_, capacity, used)| *used + size <= *capacity)
            .unwrap_or_else(|| regions.last_mut().expect("platform has at least one region"));
        chosen.2 = align_up(chosen.2 + size, PACKING_ALIGNMENT);
        placements.push(Placement {
            function: name,
            region: chosen.0,
            temperature,
        });
    }
    LayoutPlan { placements }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::intern;
    use crate::ir::function::Function;
    use crate::pgo::platform::lookup;

    fn module_with(names: &[&str], body_len: usize) -> Module {
        let mut module = Module::new();
        for name in names {
            let mut f = Function::new(intern(*name), vec![]);
            for _ in 0..body_len {
                f.instructions.push(crate::ir::instr::Instruction::label_def(intern("x")));
            }
            module.add_function(f);
        }
        module
    }

    #[test]
    fn hot_function_prefers_a_non_contended_region() {
        let module = module_with(&["hot_fn", "cold_fn"], 2);
        let mut profile = Profile::default();
        profile.block_frequency.insert(1, 1.0);
        profile.block_frequency.insert(2, 0.0);
        let mut function_pc = Map::new();
        function_pc.insert(intern("hot_fn"), 1);
        function_pc.insert(intern("cold_fn"), 2);
        let platform = lookup("spectrum").unwrap();
        let config = PipelineConfig::default();

        let result = plan(&module, &profile, &function_pc, platform, &config);
        let hot_placement = result.placements.iter().find(|p| p.function == intern("hot_fn")).unwrap();
        assert_eq!(hot_placement.temperature, Temperature::Hot);
        assert_eq!(hot_placement.region, "rom");
    }

    #[test]
    fn a_deeper_loop_nesting_packs_before_an_equally_frequent_flat_block() {
        let module = module_with(&["nested_fn", "flat_fn"], 2);
        let mut profile = Profile::default();
        profile.block_frequency.insert(1, 0.5);
        profile.block_frequency.insert(2, 0.5);
        profile.loop_depth.insert(1, 2);
        let mut function_pc = Map::new();
        function_pc.insert(intern("nested_fn"), 1);
        function_pc.insert(intern("flat_fn"), 2);
        let platform = lookup("cpm").unwrap();
        let config = PipelineConfig::default();

        let result = plan(&module, &profile, &function_pc, platform, &config);
        let nested_idx = result.placements.iter().position(|p| p.function == intern("nested_fn")).unwrap();
        let flat_idx = result.placements.iter().position(|p| p.function == intern("flat_fn")).unwrap();
        assert!(nested_idx < flat_idx, "loop-depth-weighted function should pack first");
    }

    #[test]
    fn packed_functions_are_rounded_up_to_the_alignment_boundary() {
        let module = module_with(&["a", "b"], 1);
        let profile = Profile::default();
        let function_pc = Map::new();
        let platform = lookup("cpm").unwrap();
        let config = PipelineConfig::default();

        plan(&module, &profile, &function_pc, platform, &config);
        assert_eq!(align_up(1, PACKING_ALIGNMENT), 16);
        assert_eq!(align_up(16, PACKING_ALIGNMENT), 16);
        assert_eq!(align_up(17, PACKING_ALIGNMENT), 32);
    }
}
