//! Triage for programs that aborted inside glibc's corruption checks.
//!
//! When a `SIGABRT` is raised from `__malloc_assert` or `__stack_chk_fail`,
//! the abort itself carries no faulting operand. [`AbortTriage`] walks back to
//! the check that failed (the `cmp` before the call to `__malloc_assert`, or
//! the canary `xor` before `__stack_chk_fail`), seeds the slice from it and
//! attaches operand hooks that stop the slice at the first instruction
//! writing the corrupted memory.

use std::cell::Cell;
use std::rc::Rc;

use dslice_core::error::SliceError;
use dslice_core::hooks::{HookRegistry, MatchEvent, OperandHook, SessionStartHook};
use dslice_core::operand::Operand;
use dslice_core::seed::Signal;
use dslice_core::slicer::Session;

use tracing::{info, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Corruption {
    Heap,
    Stack,
}

impl Corruption {
    /// Which check raised the abort, judging by the current call stack.
    pub fn detect(session: &Session) -> Option<Self> {
        [Self::Heap, Self::Stack]
            .into_iter()
            .find(|kind| session.backend().is_pc_inside_function(kind.function()))
    }

    pub fn function(self) -> &'static str {
        match self {
            Self::Heap => "__malloc_assert",
            Self::Stack => "__stack_chk_fail",
        }
    }

    /// Mnemonic of the check whose result led to the abort.
    pub fn trigger(self) -> &'static str {
        match self {
            Self::Heap => "cmp",
            Self::Stack => "xor",
        }
    }

    fn region(self) -> &'static str {
        match self {
            Self::Heap => "heap",
            Self::Stack => "stack",
        }
    }
}

fn mnemonic(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or_default()
}

/// Step back until `found` accepts the disassembly at the program counter.
/// Returns `false` if history runs out first.
fn rewind_until<F>(session: &mut Session, mut found: F) -> Result<bool, SliceError>
where
    F: FnMut(&str) -> bool,
{
    loop {
        if !session.reverse_step()? {
            return Ok(false);
        }
        let pc = session.state().pc();
        if found(&session.backend().disassemble(pc)?) {
            return Ok(true);
        }
    }
}

/// State shared by every hook attached for one aborted session.
#[derive(Debug)]
struct Tracker {
    corruption: Corruption,
    found: Cell<bool>,
}

/// Give `operand` the strategy for its kind. Immediates are never tracked.
fn attach(tracker: &Rc<Tracker>, operand: &mut Operand) {
    if operand.is_memory() {
        operand.set_hook(Rc::new(MemoryStrategy(tracker.clone())));
    } else if operand.is_register() {
        operand.set_hook(Rc::new(RegisterStrategy(tracker.clone())));
    }
}

/// Keeps the hooks alive through register dataflow.
struct RegisterStrategy(Rc<Tracker>);

impl OperandHook for RegisterStrategy {
    fn name(&self) -> &str {
        "abrt-register"
    }

    fn on_match(&self, event: &mut MatchEvent<'_>) {
        for operand in event.new_sources.iter_mut() {
            attach(&self.0, operand);
        }
    }
}

/// Reports the first write to tracked memory outside the allocator.
struct MemoryStrategy(Rc<Tracker>);

impl OperandHook for MemoryStrategy {
    fn name(&self) -> &str {
        "abrt-memory"
    }

    fn on_match(&self, event: &mut MatchEvent<'_>) {
        let tracker = &self.0;
        if tracker.corruption == Corruption::Heap
            && event.session.backend().is_pc_inside_file("malloc.c")
        {
            for operand in event.new_sources.iter_mut() {
                attach(tracker, operand);
            }
            return;
        }

        if tracker.found.replace(true) {
            return;
        }

        let region = tracker.corruption.region();
        event
            .instruction
            .annotate(&format!("Cause of {region} corruption"));
        info!("this instruction caused the {region} corruption:");
        info!("{}", event.instruction);
        event.session.stop();
    }
}

/// Session-start hook seeding aborted sessions from the failed check.
#[derive(Debug, Default)]
pub struct AbortTriage;

impl AbortTriage {
    pub fn new() -> Self {
        Self
    }

    fn triage(&self, session: &mut Session) -> Result<(), SliceError> {
        if session.state().signal() != Some(Signal::Abort) {
            return Ok(());
        }

        let Some(corruption) = Corruption::detect(session) else {
            info!("not inside a supported function");
            return Ok(());
        };
        let function = corruption.function();
        let trigger = corruption.trigger();
        info!("{} was corrupted somehow", corruption.region());
        info!("ABRT signal raised by {function}()");
        info!("searching for {trigger} instruction that led to signal...");

        if !rewind_until(session, |text| {
            mnemonic(text) == "call" && text.contains(function)
        })? {
            info!("could not find call to {function}()");
            return Ok(());
        }

        if !rewind_until(session, |text| mnemonic(text) == trigger)? {
            info!("could not find {trigger} instruction");
            return Ok(());
        }

        session.add_current_instruction()?;

        let tracker = Rc::new(Tracker {
            corruption,
            found: Cell::new(false),
        });
        for operand in session.state_mut().tracked_mut().iter_mut() {
            attach(&tracker, operand);
        }
        session.reverse_step()?;
        info!("ready to compute slice");
        Ok(())
    }
}

impl SessionStartHook for AbortTriage {
    fn on_session_start(&mut self, session: &mut Session) {
        if let Err(err) = self.triage(session) {
            warn!(error = %err, "abort triage failed");
        }
    }
}

/// Register the abort triage with `hooks`.
pub fn register(hooks: &mut HookRegistry) {
    hooks.register_session_start_hook(AbortTriage::new());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checks_and_triggers() {
        assert_eq!(Corruption::Heap.function(), "__malloc_assert");
        assert_eq!(Corruption::Heap.trigger(), "cmp");
        assert_eq!(Corruption::Stack.function(), "__stack_chk_fail");
        assert_eq!(Corruption::Stack.trigger(), "xor");
    }

    #[test]
    fn mnemonic_is_first_word() {
        assert_eq!(mnemonic("call   0x8048350 <__stack_chk_fail@plt>"), "call");
        assert_eq!(mnemonic("  xor    edx,DWORD PTR gs:0x14"), "xor");
        assert_eq!(mnemonic(""), "");
    }

    #[test]
    fn registration_adds_a_session_start_hook() {
        let mut hooks = HookRegistry::new();
        assert!(hooks.is_empty());
        register(&mut hooks);
        assert!(!hooks.is_empty());
    }
}
