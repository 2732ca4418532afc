//! Initial tracked operands derived from how the program terminated.

use std::fmt;

use tracing::{info, warn};

use crate::error::SliceError;
use crate::operand::{Operand, Register};
use crate::slicer::Session;
use crate::Hex;

/// Terminating signal, Linux numbering.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Signal {
    Abort,
    Bus,
    SegmentationFault,
    FloatingPoint,
    Other(i32),
}

impl Signal {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            6 => Self::Abort,
            7 => Self::Bus,
            8 => Self::FloatingPoint,
            11 => Self::SegmentationFault,
            other => Self::Other(other),
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            Self::Abort => 6,
            Self::Bus => 7,
            Self::FloatingPoint => 8,
            Self::SegmentationFault => 11,
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => f.write_str("SIGABRT"),
            Self::Bus => f.write_str("SIGBUS"),
            Self::SegmentationFault => f.write_str("SIGSEGV"),
            Self::FloatingPoint => f.write_str("SIGFPE"),
            Self::Other(raw) => write!(f, "signal {raw}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedReport {
    /// Nothing seeded; session-start hooks are expected to take over.
    Abort,
    /// The program counter left executable memory; the instruction pointer
    /// is tracked.
    InvalidProgramCounter { pc: u64 },
    InvalidAccess {
        signal: Signal,
        seeded: usize,
        monitor_stack: bool,
    },
    Arithmetic { seeded: usize },
    Unhandled(Signal),
}

impl SeedReport {
    pub fn is_handled(&self) -> bool {
        !matches!(self, Self::Unhandled(_))
    }
}

/// Mnemonics whose faults come from the stack itself, so every source
/// operand is suspect.
fn is_stack_fault(mnemonic: &str) -> bool {
    matches!(mnemonic, "ret" | "leave" | "pop" | "push")
}

pub(crate) fn seed(session: &mut Session) -> Result<SeedReport, SliceError> {
    let signal = Signal::from_raw(session.backend().termination_signal()?);
    session.state_mut().set_signal(signal);
    info!("signal: {signal}");

    if signal == Signal::Abort {
        return Ok(SeedReport::Abort);
    }

    let pc = session.backend().program_counter()?;
    session.state_mut().set_pc(pc);

    // A program counter outside executable memory is seeded the same way
    // whichever signal reported it, so it is checked before classification.
    if !session.backend().is_address_executable(pc) {
        let arch = session.semantics().arch();
        let (name, group) = arch
            .register(arch.instruction_pointer)
            .ok_or_else(|| SliceError::InvalidExpression(arch.instruction_pointer.to_owned()))?;
        session
            .state_mut()
            .add_operand(Operand::register(Register::new(name, group), pc));
        session.semantics_mut().set_monitor_stack(true);
        info!("$pc ({}) is invalid", Hex(pc));
        return Ok(SeedReport::InvalidProgramCounter { pc });
    }

    let report = match signal {
        Signal::Bus | Signal::SegmentationFault | Signal::FloatingPoint => {
            let mut faulting = session.decode(pc);
            session.locate(&mut faulting);
            info!("faulting instruction: {faulting}");

            let arithmetic = signal == Signal::FloatingPoint;
            let stack_fault = !arithmetic && is_stack_fault(faulting.mnemonic());

            let mut seeded = 0;
            let mut monitor_stack = false;
            let suspects: Vec<Operand> = faulting
                .sources()
                .iter()
                .filter(|operand| {
                    stack_fault || (operand.is_register() && operand.is_memory_access())
                })
                .cloned()
                .collect();

            for operand in suspects {
                let pointer = operand
                    .as_register()
                    .map_or(false, |r| session.semantics().arch().is_pointer_group(&r.group()));
                if session.state_mut().add_operand(operand) {
                    seeded += 1;
                }
                if pointer && !arithmetic {
                    monitor_stack = true;
                }
            }
            session.state_mut().push_instruction(faulting);

            if monitor_stack {
                info!("monitoring stack");
                session.semantics_mut().set_monitor_stack(true);
            }

            if arithmetic {
                SeedReport::Arithmetic { seeded }
            } else {
                SeedReport::InvalidAccess {
                    signal,
                    seeded,
                    monitor_stack,
                }
            }
        }
        _ => {
            warn!("unhandled signal {} : {signal}", signal.raw());
            SeedReport::Unhandled(signal)
        }
    };

    Ok(report)
}
