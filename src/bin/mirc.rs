//! The demo compiler binary: takes a source file, an optimization level, an
//! optional target platform tag, and an emit kind.
//!
//! run with `--help` for more info.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use minzc_core::asm::{self, AsmPeephole};
use minzc_core::back;
use minzc_core::config::{OptLevel, PipelineConfig, Target};
use minzc_core::diagnostics::DiagnosticCollector;
use minzc_core::front::{lower, parse};
use minzc_core::pass::{MultiLevelDriver, PassDriver};
use minzc_core::passes::pass_list;
use minzc_core::pgo;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// the input file
    file: String,
    /// what to print
    #[arg(value_enum, short, long, default_value_t = Emit::Asm)]
    emit: Emit,
    /// which MIR passes to run
    #[arg(value_enum, short = 'O', long, default_value_t = OptLevel::Basic)]
    opt: OptLevel,
    /// the target platform tag, consulted by PGO layout at `-O full`
    #[arg(value_enum, short, long)]
    target: Option<Target>,
    /// a PGO profile JSON file, consulted when `--target` is given
    #[arg(long)]
    profile: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
enum Emit {
    /// the optimized MIR, one line per instruction
    Mir,
    /// the assembly text after peephole and reordering
    Asm,
    /// the TRUE-SMC patch table, as JSON
    PatchTable,
    /// classified peephole diagnostics, as JSON
    Diagnostics,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let source = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading input file `{}`", args.file))?;

    let program = parse(&source).map_err(|e| anyhow::anyhow!("{e}"))?;
    let mut module = lower(&program);

    let config = PipelineConfig::default();
    let mut driver = PassDriver::new(pass_list(args.opt, &config));
    let mut multi_level = MultiLevelDriver::new(config);
    driver
        .run_to_fixed_point_accepting(&mut module, &config, &mut multi_level)
        .context("running the MIR pass pipeline")?;

    if let (Some(target), OptLevel::Full) = (args.target, args.opt) {
        let platform = pgo::lookup_platform(target.tag())
            .with_context(|| format!("no platform table entry for target `{}`", target.tag()))?;
        let profile = match &args.profile {
            Some(path) => pgo::Profile::load(path).context("loading PGO profile")?,
            None => pgo::Profile::default(),
        };
        let function_pc = minzc_core::common::Map::default();
        let plan = pgo::plan(&module, &profile, &function_pc, platform, &config);
        log::debug!("PGO layout: {} functions placed", plan.placements.len());
    }

    match args.emit {
        Emit::Mir => {
            for f in module.functions() {
                println!("{}:", f.name);
                for insn in &f.instructions {
                    println!("  {insn:?}");
                }
            }
        }
        Emit::Asm => {
            let raw = back::emit_module(&module);
            let peephole = AsmPeephole::new(&config);
            let (rewritten, _matches) = peephole.rewrite(&raw);
            println!("{}", asm::reorder(&rewritten));
        }
        Emit::PatchTable => {
            println!("{}", serde_json::to_string_pretty(&module.patch_table)?);
        }
        Emit::Diagnostics => {
            let raw = back::emit_module(&module);
            let peephole = AsmPeephole::new(&config);
            let (rewritten, matches) = peephole.rewrite(&raw);
            let lines: Vec<String> = rewritten.lines().map(str::to_string).collect();
            let mut collector = DiagnosticCollector::new();
            collector.record(&matches, None, &lines);
            println!("{}", serde_json::to_string_pretty(collector.events())?);
        }
    }

    Ok(())
}
