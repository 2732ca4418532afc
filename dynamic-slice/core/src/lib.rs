//! Core components of the dynamic backward slicer.
//!
//! A slice starts from a set of tracked locations (registers and memory
//! bytes) at some point of a recorded execution and walks the recording
//! backwards, collecting every instruction that wrote one of them. The
//! `slicer` module drives that walk through a [`backend::Backend`], which owns
//! the recording. Instructions are decoded by `semantics`, a table mapping
//! x86 mnemonics to the operands they read and write, with memory operands
//! resolved to individual bytes by `resolver`.
//!
//! Sessions started from a crash are seeded by `seed` according to the
//! terminating signal. Collaborators extend the engine through the `hooks`
//! module without touching the walk itself.

pub mod architecture;
pub mod backend;
pub mod config;
pub mod error;
pub mod eval;
pub mod export;
pub mod hooks;
pub mod instruction;
pub mod operand;
pub mod resolver;
pub mod seed;
pub mod semantics;
pub mod slice;
pub mod slicer;

#[cfg(test)]
pub(crate) mod test_fixture;

pub mod prelude {
    pub use super::architecture::{Architecture, X86, X86_64};

    pub use super::backend::{Backend, BackendError};

    pub use super::config::{SliceConfig, SymbolLevel};

    pub use super::error::SliceError;

    pub use super::hooks::{HookRegistry, MatchEvent, OperandHook};

    pub use super::instruction::{Instruction, SourceLocation};

    pub use super::operand::{Direction, Operand, Register};

    pub use super::seed::{SeedReport, Signal};

    pub use super::slicer::{Outcome, Session, Slicer, StepMode};
}

#[derive(Copy, Clone)]
pub(crate) struct Hex<T>(pub(crate) T);

impl std::fmt::Display for Hex<u64> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
