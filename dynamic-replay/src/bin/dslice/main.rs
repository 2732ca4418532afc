use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dslice::prelude::*;
use dslice_replay::ReplayBackend;
use tracing::info;
use tracing_subscriber::filter::EnvFilter;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Symbols {
    None,
    Lines,
    Variables,
}

impl From<Symbols> for SymbolLevel {
    fn from(symbols: Symbols) -> Self {
        match symbols {
            Symbols::None => SymbolLevel::None,
            Symbols::Lines => SymbolLevel::Lines,
            Symbols::Variables => SymbolLevel::Variables,
        }
    }
}

/// Computes a dynamic backward slice over a recorded execution.
#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Recording to replay (JSON).
    recording: PathBuf,

    /// Seed the slice from the signal that terminated the recording
    #[arg(long)]
    crashed: bool,

    /// Track a register (`$eax`), memory operand (`DWORD PTR [ebp-0xc]`) or
    /// address expression. May be repeated.
    #[arg(short, long = "track")]
    track: Vec<String>,

    /// Stop once the tracked operand with this 1-based index is written
    #[arg(long)]
    follow: Option<usize>,

    /// Print each slice instruction as it is found
    #[arg(long)]
    step: bool,

    /// Write the slice to this file, one instruction per line
    #[arg(long)]
    save: Option<PathBuf>,

    /// List operands of every sliced instruction, including call/ret/leave
    #[arg(short, long)]
    verbose: bool,

    /// Debug information attached to instructions and operands
    #[arg(long, value_enum)]
    symbol_level: Option<Symbols>,

    /// Keep stack, frame and instruction pointers in the slice
    #[arg(long)]
    monitor_stack: bool,

    /// JSON slice configuration; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emits debug logs as JSON (DSLICE_LOG env var is still used to determine what is logged)
    #[arg(long)]
    debug_json: bool,
}

fn load_config(args: &Args) -> Result<SliceConfig> {
    let mut config: SliceConfig = match &args.config {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open config {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => SliceConfig::default(),
    };
    if let Some(level) = args.symbol_level {
        config.symbol_level = level.into();
    }
    if args.monitor_stack {
        config.monitor_stack = true;
    }
    Ok(config)
}

#[cfg(feature = "plugins")]
fn hook_registry() -> HookRegistry {
    let mut hooks = HookRegistry::new();
    dslice::plugins::register_all(&mut hooks);
    hooks
}

#[cfg(not(feature = "plugins"))]
fn hook_registry() -> HookRegistry {
    HookRegistry::new()
}

fn main() -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("DSLICE_LOG"))
        .with_writer(std::io::stderr);

    let args = Args::parse();

    if args.debug_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = load_config(&args)?;
    let hide_frame_instructions = config.hide_frame_instructions;
    let backend = ReplayBackend::open(&args.recording)
        .with_context(|| format!("failed to load {}", args.recording.display()))?;

    let hooks = hook_registry();

    let mut slicer = if args.crashed {
        let (slicer, report) = Slicer::crashed(backend, hooks, config)
            .context("failed to start a crashed session")?;
        info!(?report, "seeded from termination signal");
        slicer
    } else {
        Slicer::new(backend, hooks, config).context("failed to start a session")?
    };

    for expression in &args.track {
        slicer
            .session_mut()
            .add_expression(expression)
            .with_context(|| format!("failed to track `{expression}`"))?;
    }

    if let Some(index) = args.follow {
        let index = index.checked_sub(1).context("operand indices start at 1")?;
        slicer
            .session_mut()
            .state_mut()
            .set_followed(Some(index))
            .with_context(|| format!("cannot follow operand {}", index + 1))?;
    }

    print!("{}", slicer.session().state().operand_listing());

    let mode = if args.step { StepMode::Step } else { StepMode::Run };
    loop {
        let outcome = slicer.compute(mode).context("slice failed")?;
        println!("{outcome}");
        if outcome != Outcome::InstructionFound {
            break;
        }
        if let Some(insn) = slicer.session().state().instructions().last() {
            println!("{}", insn.display(args.verbose));
        }
    }

    print!(
        "{}",
        slicer.session().state().instruction_listing(
            1,
            None,
            args.verbose,
            hide_frame_instructions
        )
    );

    if let Some(path) = &args.save {
        slicer
            .session()
            .save(path)
            .with_context(|| format!("failed to save slice to {}", path.display()))?;
    }

    Ok(())
}
