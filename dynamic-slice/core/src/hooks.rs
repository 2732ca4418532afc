//! Extension points for the slicing engine.
//!
//! Hooks are registered once on a [`HookRegistry`] and handed to the
//! [`Slicer`](crate::slicer::Slicer). Match hooks run for every relevant
//! instruction, session-start hooks run once after a crashed session has been
//! seeded, and operand hooks are attached to individual operands and run when
//! that operand is matched.

use crate::instruction::Instruction;
use crate::operand::Operand;
use crate::slicer::Session;

/// Everything a hook may inspect or change when an instruction writes a
/// tracked operand.
pub struct MatchEvent<'a> {
    pub instruction: &'a mut Instruction,
    pub matches: &'a [Operand],
    /// Operands about to replace the matched ones in the tracked set.
    pub new_sources: &'a mut Vec<Operand>,
    pub session: &'a mut Session,
}

pub trait MatchHook {
    fn on_match(&mut self, event: &mut MatchEvent<'_>);
}

impl<F> MatchHook for F
where
    F: FnMut(&mut MatchEvent<'_>),
{
    fn on_match(&mut self, event: &mut MatchEvent<'_>) {
        self(event)
    }
}

pub trait SessionStartHook {
    fn on_session_start(&mut self, session: &mut Session);
}

impl<F> SessionStartHook for F
where
    F: FnMut(&mut Session),
{
    fn on_session_start(&mut self, session: &mut Session) {
        self(session)
    }
}

/// Per-operand strategy. Shared between operands with `Rc`, so any state
/// lives behind interior mutability.
pub trait OperandHook {
    fn name(&self) -> &str;

    fn on_match(&self, event: &mut MatchEvent<'_>);
}

#[derive(Default)]
pub struct HookRegistry {
    match_hooks: Vec<Box<dyn MatchHook>>,
    session_start_hooks: Vec<Box<dyn SessionStartHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_match_hook<H>(&mut self, hook: H)
    where
        H: MatchHook + 'static,
    {
        self.match_hooks.push(Box::new(hook));
    }

    pub fn register_session_start_hook<H>(&mut self, hook: H)
    where
        H: SessionStartHook + 'static,
    {
        self.session_start_hooks.push(Box::new(hook));
    }

    pub fn is_empty(&self) -> bool {
        self.match_hooks.is_empty() && self.session_start_hooks.is_empty()
    }

    pub(crate) fn run_match_hooks(&mut self, event: &mut MatchEvent<'_>) {
        for hook in self.match_hooks.iter_mut() {
            hook.on_match(event);
        }
    }

    pub(crate) fn run_session_start_hooks(&mut self, session: &mut Session) {
        for hook in self.session_start_hooks.iter_mut() {
            hook.on_session_start(session);
        }
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("match_hooks", &self.match_hooks.len())
            .field("session_start_hooks", &self.session_start_hooks.len())
            .finish()
    }
}
