//! C4 — the MIR and scheduling passes (§4.2-§4.13).

pub mod call_return;
pub mod const_fold;
pub mod dce;
pub mod inline;
pub mod peephole;
pub mod regalloc;
pub mod scheduler;
pub mod smc;
pub mod tail_recursion;
pub mod true_smc;

pub use call_return::CallReturn;
pub use const_fold::ConstFold;
pub use dce::Dce;
pub use inline::Inline;
pub use peephole::MirPeephole;
pub use regalloc::RegAlloc;
pub use scheduler::{ListScheduler, ReorderForPeephole};
pub use smc::Smc;
pub use tail_recursion::TailRecursion;
pub use true_smc::TrueSmc;

use crate::config::{OptLevel, PipelineConfig};
use crate::pass::Pass;

/// Build the ordered pass list for a given optimization level (§4.15).
pub fn pass_list(level: OptLevel, config: &PipelineConfig) -> Vec<Box<dyn Pass>> {
    match level {
        OptLevel::None => Vec::new(),
        OptLevel::Basic => vec![
            Box::new(ConstFold::new()),
            Box::new(Dce::new()),
            Box::new(MirPeephole::new(config.max_mir_iterations)),
            Box::new(TailRecursion::new()),
        ],
        OptLevel::Full => vec![
            Box::new(ConstFold::new()),
            Box::new(Dce::new()),
            Box::new(MirPeephole::new(config.max_mir_iterations)),
            Box::new(TailRecursion::new()),
            Box::new(Inline::new(config)),
            Box::new(CallReturn::new()),
            Box::new(TrueSmc::new()),
            Box::new(Smc::new(config)),
            Box::new(ListScheduler::new()),
            Box::new(ReorderForPeephole::new()),
            Box::new(RegAlloc::new()),
            Box::new(Dce::new()),
        ],
    }
}
