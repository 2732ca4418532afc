//! The backward slicing engine.
//!
//! A [`Slicer`] owns a [`Session`] (backend, decode state, slice state) and
//! the [`HookRegistry`] it was built with. [`Slicer::compute`] walks the
//! recorded history backwards from the current position: every instruction
//! that writes a tracked operand joins the slice, its destinations stop being
//! tracked and its sources start being tracked.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tracing::{debug, info, trace_span};

use crate::architecture::Architecture;
use crate::backend::Backend;
use crate::config::SliceConfig;
use crate::error::SliceError;
use crate::export::{write_listing, ExportError, TextExport};
use crate::hooks::{HookRegistry, MatchEvent};
use crate::instruction::{Instruction, SourceLocation};
use crate::operand::{Direction, Operand, Register};
use crate::resolver::Classifier;
use crate::seed::{self, SeedReport};
use crate::semantics::Semantics;
use crate::slice::SliceState;
use crate::Hex;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StepMode {
    /// Continue until the slice completes or history runs out.
    Run,
    /// Stop after the next instruction that joins the slice.
    Step,
}

/// Why [`Slicer::compute`] returned.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoOperands,
    OperandExhausted,
    HistoryExhausted,
    InstructionFound,
    FollowedMatched,
    Stopped,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NoOperands => "no operands to track",
            Self::OperandExhausted => "slice complete",
            Self::HistoryExhausted => "reached end of recording",
            Self::InstructionFound => "next slice instruction found",
            Self::FollowedMatched => "followed operand matched",
            Self::Stopped => "slice stopped",
        })
    }
}

/// Backend plus everything that changes while slicing. Hooks receive the
/// session mutably.
pub struct Session {
    backend: Box<dyn Backend>,
    semantics: Semantics,
    state: SliceState,
    config: SliceConfig,
    decoded: Option<(u64, bool)>,
}

impl Session {
    pub fn new(backend: Box<dyn Backend>, config: SliceConfig) -> Result<Self, SliceError> {
        let arch = Architecture::from_name(&backend.architecture_name())?;
        let mut semantics = Semantics::new(arch);
        semantics.set_monitor_stack(config.monitor_stack);

        let mut state = SliceState::new();
        state.set_pc(backend.program_counter()?);

        Ok(Self {
            backend,
            semantics,
            state,
            config,
            decoded: None,
        })
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn Backend {
        self.backend.as_mut()
    }

    pub fn semantics(&self) -> &Semantics {
        &self.semantics
    }

    pub fn semantics_mut(&mut self) -> &mut Semantics {
        &mut self.semantics
    }

    pub fn state(&self) -> &SliceState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SliceState {
        &mut self.state
    }

    pub fn config(&self) -> &SliceConfig {
        &self.config
    }

    pub fn stop(&mut self) {
        self.state.stop();
    }

    /// Decode the instruction at `pc` with the current decode state.
    pub fn decode(&mut self, pc: u64) -> Instruction {
        let instruction = self.semantics.decode(self.backend.as_ref(), pc);
        self.decoded = Some((pc, instruction.is_repeating()));
        instruction
    }

    pub fn source_location(&self) -> Option<SourceLocation> {
        if self.config.lines() {
            self.backend.source_location()
        } else {
            None
        }
    }

    /// Attach the source location and operand symbols the configured symbol
    /// level asks for.
    pub(crate) fn locate(&self, instruction: &mut Instruction) {
        instruction.set_location(self.source_location());
        self.annotate_symbols(instruction.operands_mut());
    }

    pub(crate) fn annotate_symbols<'o, I>(&self, operands: I)
    where
        I: IntoIterator<Item = &'o mut Operand>,
    {
        if !self.config.variables() {
            return;
        }
        for operand in operands {
            if let Some(address) = operand.address() {
                operand.set_symbol(self.backend.symbol_for_address(address));
            }
        }
    }

    /// Operands an instruction contributes to the tracked set.
    pub(crate) fn trackable_sources(&self, instruction: &Instruction) -> Vec<Operand> {
        instruction
            .sources()
            .iter()
            .filter(|operand| !self.semantics.is_ignored(operand))
            .cloned()
            .collect()
    }

    /// Step one instruction back. Returns `false` once history is exhausted:
    /// the program counter did not move and, for an instruction that repeats
    /// in place, neither did its counter register.
    pub fn reverse_step(&mut self) -> Result<bool, SliceError> {
        self.semantics.record_return(self.backend.as_ref());
        let last_pc = self.state.pc();
        let last_count = self.counter();
        self.backend.step_backward()?;
        let pc = self.backend.program_counter()?;
        self.state.set_pc(pc);

        if pc != last_pc {
            return Ok(true);
        }

        let repeating = match self.decoded {
            Some((decoded, repeating)) if decoded == last_pc => repeating,
            _ => self
                .backend
                .disassemble(last_pc)
                .map(|text| text.trim_start().starts_with("rep"))
                .unwrap_or(false),
        };
        let moved = repeating && last_count.is_some() && self.counter() != last_count;
        if !moved {
            info!("reached end of recording");
        }
        Ok(moved)
    }

    fn counter(&self) -> Option<u64> {
        let expression = format!("${}", self.semantics.arch().counter);
        self.backend.evaluate_expression(&expression).ok()
    }

    /// Add the instruction at the current position to the slice and track
    /// its sources.
    pub fn add_current_instruction(&mut self) -> Result<(), SliceError> {
        let pc = self.backend.program_counter()?;
        self.state.set_pc(pc);
        let mut instruction = self.decode(pc);
        self.locate(&mut instruction);

        for operand in self.trackable_sources(&instruction) {
            self.state.add_operand(operand);
        }
        info!("added instruction: {}", instruction.text());
        self.state.push_instruction(instruction);
        Ok(())
    }

    /// Track the value named by `expression`: `$name` for a register, an
    /// Intel memory operand (`DWORD PTR [ebp-0xc]`) for its bytes, or any
    /// other expression for the single byte at that address. Returns how many
    /// operands were newly tracked.
    pub fn add_expression(&mut self, expression: &str) -> Result<usize, SliceError> {
        let expression = expression.trim();
        let arch = self.semantics.arch();
        let invalid = || SliceError::InvalidExpression(expression.to_owned());

        let mut operands = if let Some(name) = expression.strip_prefix('$') {
            let (name, group) = arch.register(name).ok_or_else(invalid)?;
            let value = self.backend.evaluate_expression(&format!("${name}"))?;
            vec![Operand::register(Register::new(name, group), value)]
        } else if expression.contains("PTR") || expression.starts_with('[') {
            let mut scratch = Instruction::new(self.state.pc(), expression, None, "");
            Classifier::new(arch, self.backend.as_ref(), &mut scratch)
                .argument(expression, Direction::SOURCE);
            let bytes: Vec<Operand> = scratch
                .sources()
                .iter()
                .filter(|operand| operand.is_memory())
                .cloned()
                .collect();
            if bytes.is_empty() {
                return Err(invalid());
            }
            bytes
        } else {
            let address = self.backend.evaluate_expression_as_address(expression)?;
            let value = self.backend.read_memory_byte(address)?;
            vec![Operand::memory(address, value)]
        };

        self.annotate_symbols(&mut operands);
        Ok(operands
            .into_iter()
            .filter(|operand| self.state.add_operand(operand.clone()))
            .count())
    }

    /// Write the sliced instructions to `path`, one per line.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SliceError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(ExportError::from)?;
        let mut export = TextExport::new(BufWriter::new(file));
        write_listing(&mut export, self.state.instructions())?;
        info!(path = %path.display(), "slice saved");
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("arch", &self.semantics.arch().name)
            .field("state", &self.state)
            .field("config", &self.config)
            .finish()
    }
}

#[derive(Debug)]
pub struct Slicer {
    session: Session,
    hooks: HookRegistry,
}

impl Slicer {
    pub fn new<B>(backend: B, hooks: HookRegistry, config: SliceConfig) -> Result<Self, SliceError>
    where
        B: Backend + 'static,
    {
        Ok(Self {
            session: Session::new(Box::new(backend), config)?,
            hooks,
        })
    }

    /// Start a session at a crash: seed the tracked set from the terminating
    /// signal, step back past the faulting instruction and run the
    /// session-start hooks.
    pub fn crashed<B>(
        backend: B,
        hooks: HookRegistry,
        config: SliceConfig,
    ) -> Result<(Self, SeedReport), SliceError>
    where
        B: Backend + 'static,
    {
        let mut slicer = Self::new(backend, hooks, config)?;
        let report = seed::seed(&mut slicer.session)?;
        if report.is_handled() {
            slicer.session.reverse_step()?;
            slicer.hooks.run_session_start_hooks(&mut slicer.session);
        }
        Ok((slicer, report))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn compute(&mut self, mode: StepMode) -> Result<Outcome, SliceError> {
        if self.session.state.tracked().is_empty() {
            info!("no operands to track");
            return Ok(Outcome::NoOperands);
        }

        self.session.state.resume();
        let pc = self.session.backend.program_counter()?;
        self.session.state.set_pc(pc);

        loop {
            if !self.session.state.is_running() {
                info!("slice stopped");
                return Ok(Outcome::Stopped);
            }

            let pc = self.session.state.pc();
            let _span = trace_span!("compute", pc = %Hex(pc)).entered();

            let instruction = self.session.decode(pc);
            let (relevant, followed) = self.process(instruction);

            if self.session.state.tracked().is_empty() {
                info!("slice complete");
                return Ok(Outcome::OperandExhausted);
            }

            if !self.session.reverse_step()? {
                return Ok(Outcome::HistoryExhausted);
            }

            if followed {
                if let Some(insn) = self.session.state.instructions().last() {
                    info!("followed operand written at: {insn}");
                }
                return Ok(Outcome::FollowedMatched);
            }

            if relevant && mode == StepMode::Step {
                if let Some(insn) = self.session.state.instructions().last() {
                    info!("next slice instruction: {insn}");
                }
                return Ok(Outcome::InstructionFound);
            }
        }
    }

    /// Match one decoded instruction against the tracked set. Returns whether
    /// it joined the slice and whether it wrote the followed operand.
    fn process(&mut self, mut instruction: Instruction) -> (bool, bool) {
        let Self { session, hooks } = self;

        let matches: Vec<Operand> = session
            .state
            .tracked()
            .iter()
            .filter(|tracked| instruction.destinations().contains(tracked))
            .cloned()
            .collect();
        if matches.is_empty() {
            return (false, false);
        }

        let followed = session
            .state
            .followed()
            .map_or(false, |followed| matches.contains(followed));
        if followed {
            session.state.clear_followed();
        }

        session.locate(&mut instruction);
        let mut new_sources = session.trackable_sources(&instruction);

        {
            let mut event = MatchEvent {
                instruction: &mut instruction,
                matches: &matches,
                new_sources: &mut new_sources,
                session: &mut *session,
            };
            hooks.run_match_hooks(&mut event);
            for operand in &matches {
                if let Some(hook) = operand.hook().cloned() {
                    hook.on_match(&mut event);
                }
            }
        }

        let sources = instruction.sources();
        let tracked = session.state.tracked_mut();
        tracked.retain(|t| !matches.contains(t) && !sources.contains(t));
        tracked.extend(new_sources);

        debug!("{}", instruction.display(false));
        session.state.push_instruction(instruction);
        (true, followed)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::hooks::OperandHook;
    use crate::test_fixture::ScriptedBackend;

    fn slicer(backend: ScriptedBackend) -> Slicer {
        Slicer::new(backend, HookRegistry::new(), SliceConfig::default()).unwrap()
    }

    fn scenario_a() -> ScriptedBackend {
        ScriptedBackend::x86()
            .register("ebp", 0xbfff_f000)
            .memory(0xbfff_effc, &[7, 0, 0, 0])
            .step(0x8048400, "mov    eax,DWORD PTR [ebp-0x4]")
            .step(0x8048403, "add    eax,0x1")
            .step(0x8048406, "nop")
    }

    #[test]
    fn move_retires_register_and_tracks_memory() {
        let mut slicer = slicer(scenario_a().register("eax", 8));
        slicer.session_mut().add_expression("$eax").unwrap();
        assert_eq!(slicer.compute(StepMode::Run).unwrap(), Outcome::HistoryExhausted);

        let state = slicer.session().state();
        let texts: Vec<_> = state.instructions().iter().map(Instruction::text).collect();
        assert_eq!(texts, vec!["add    eax,0x1", "mov    eax,DWORD PTR [ebp-0x4]"]);

        let addresses: Vec<_> = state.tracked().iter().filter_map(Operand::address).collect();
        assert_eq!(addresses, vec![0xbfff_effc, 0xbfff_effd, 0xbfff_effe, 0xbfff_efff]);
        assert!(state.tracked().iter().all(|o| !o.is_register()));
    }

    #[test]
    fn step_mode_stops_at_each_relevant_instruction() {
        let mut slicer = slicer(scenario_a());
        slicer.session_mut().add_expression("$eax").unwrap();
        assert_eq!(slicer.compute(StepMode::Step).unwrap(), Outcome::InstructionFound);
        assert_eq!(slicer.session().state().instructions().len(), 1);
        assert_eq!(slicer.session().state().pc(), 0x8048400);
        assert_eq!(slicer.compute(StepMode::Step).unwrap(), Outcome::HistoryExhausted);
        assert_eq!(slicer.session().state().instructions().len(), 2);
    }

    #[test]
    fn history_exhaustion_leaves_tracked_set() {
        let backend = ScriptedBackend::x86().step(0x1000, "mov    ebx,ecx");
        let mut slicer = slicer(backend);
        slicer.session_mut().add_expression("$edx").unwrap();
        assert_eq!(slicer.compute(StepMode::Run).unwrap(), Outcome::HistoryExhausted);
        let tracked: Vec<_> = slicer.session().state().tracked().iter().cloned().collect();
        assert_eq!(tracked.len(), 1);
        assert_eq!(tracked[0].as_register().map(|r| r.name()), Some("edx"));
    }

    #[test]
    fn constant_source_exhausts_operands() {
        let backend = ScriptedBackend::x86()
            .step(0x1000, "mov    ecx,0x10")
            .step(0x1005, "mov    ebx,ecx")
            .step(0x1007, "nop");
        let mut slicer = slicer(backend);
        slicer.session_mut().add_expression("$ebx").unwrap();
        assert_eq!(slicer.compute(StepMode::Run).unwrap(), Outcome::OperandExhausted);
        assert_eq!(slicer.session().state().instructions().len(), 2);
        assert_eq!(slicer.session().state().pc(), 0x1000);
    }

    #[test]
    fn no_operands() {
        let mut slicer = slicer(scenario_a());
        assert_eq!(slicer.compute(StepMode::Run).unwrap(), Outcome::NoOperands);
    }

    #[test]
    fn unknown_mnemonic_is_irrelevant() {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let mut hooks = HookRegistry::new();
        hooks.register_match_hook(move |_: &mut MatchEvent<'_>| seen.set(seen.get() + 1));

        let backend = ScriptedBackend::x86()
            .step(0x0ffe, "nop")
            .step(0x1000, "mov    eax,ebx")
            .step(0x1002, "xyz123 eax,ecx")
            .step(0x1004, "nop");
        let mut slicer = Slicer::new(backend, hooks, SliceConfig::default()).unwrap();
        slicer.session_mut().add_expression("$eax").unwrap();
        assert_eq!(slicer.compute(StepMode::Step).unwrap(), Outcome::InstructionFound);

        let insns = slicer.session().state().instructions();
        assert_eq!(insns.len(), 1);
        assert_eq!(insns[0].pc(), 0x1000);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn followed_operand_stops_computation() {
        let backend = ScriptedBackend::x86()
            .step(0x0ffe, "nop")
            .step(0x1000, "mov    ecx,edx")
            .step(0x1002, "mov    ebx,esi")
            .step(0x1004, "nop");
        let mut slicer = slicer(backend);
        slicer.session_mut().add_expression("$ebx").unwrap();
        slicer.session_mut().add_expression("$ecx").unwrap();
        slicer.session_mut().state_mut().set_followed(Some(1)).unwrap();

        assert_eq!(slicer.compute(StepMode::Run).unwrap(), Outcome::FollowedMatched);
        assert!(slicer.session().state().followed().is_none());
        assert_eq!(slicer.session().state().instructions().len(), 2);
    }

    #[test]
    fn retired_followed_operand_is_not_resurrected() {
        let backend = ScriptedBackend::x86()
            .step(0x0ffa, "nop")
            .step(0x0ffc, "mov    ebx,eax")
            .step(0x1000, "mov    ecx,edx")
            .step(0x1002, "mov    ebx,esi")
            .step(0x1004, "nop");
        let mut slicer = slicer(backend);
        slicer.session_mut().add_expression("$ebx").unwrap();
        slicer.session_mut().add_expression("$ecx").unwrap();
        slicer.session_mut().state_mut().set_followed(Some(0)).unwrap();
        assert_eq!(slicer.compute(StepMode::Run).unwrap(), Outcome::FollowedMatched);

        assert_eq!(slicer.session_mut().add_expression("$ebx").unwrap(), 1);
        assert!(slicer.session().state().followed().is_none());
        assert_eq!(slicer.compute(StepMode::Run).unwrap(), Outcome::HistoryExhausted);
        assert!(slicer.session().state().followed().is_none());

        let pcs: Vec<_> = slicer
            .session()
            .state()
            .instructions()
            .iter()
            .map(Instruction::pc)
            .collect();
        assert_eq!(pcs, vec![0x1002, 0x1000, 0x0ffc]);
    }

    #[test]
    fn stop_request_is_honoured() {
        let mut hooks = HookRegistry::new();
        hooks.register_match_hook(|event: &mut MatchEvent<'_>| event.session.stop());
        let backend = ScriptedBackend::x86()
            .step(0x1000, "mov    ecx,edx")
            .step(0x1002, "mov    ebx,ecx")
            .step(0x1004, "nop");
        let mut slicer = Slicer::new(backend, hooks, SliceConfig::default()).unwrap();
        slicer.session_mut().add_expression("$ebx").unwrap();
        assert_eq!(slicer.compute(StepMode::Run).unwrap(), Outcome::Stopped);
        assert_eq!(slicer.session().state().instructions().len(), 1);
    }

    #[test]
    fn match_hook_can_rewrite_new_sources() {
        let mut hooks = HookRegistry::new();
        hooks.register_match_hook(|event: &mut MatchEvent<'_>| {
            event.new_sources.clear();
            event.instruction.annotate("pruned");
        });
        let backend = ScriptedBackend::x86()
            .step(0x1000, "mov    ebx,ecx")
            .step(0x1002, "nop");
        let mut slicer = Slicer::new(backend, hooks, SliceConfig::default()).unwrap();
        slicer.session_mut().add_expression("$ebx").unwrap();
        assert_eq!(slicer.compute(StepMode::Run).unwrap(), Outcome::OperandExhausted);
        assert_eq!(slicer.session().state().instructions()[0].comment(), "pruned");
    }

    struct Counting(Cell<usize>);

    impl OperandHook for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn on_match(&self, event: &mut MatchEvent<'_>) {
            self.0.set(self.0.get() + 1);
            assert_eq!(event.matches.len(), 1);
        }
    }

    #[test]
    fn operand_hooks_run_for_their_operand() {
        let backend = ScriptedBackend::x86()
            .step(0x1000, "mov    ebx,ecx")
            .step(0x1002, "mov    edx,eax")
            .step(0x1004, "nop");
        let mut slicer = slicer(backend);
        let session = slicer.session_mut();
        session.add_expression("$ebx").unwrap();
        session.add_expression("$edx").unwrap();

        let hook = Rc::new(Counting(Cell::new(0)));
        let mut ebx = session.state().tracked().get(0).cloned().unwrap();
        ebx.set_hook(hook.clone());
        session.state_mut().remove_operand(0).unwrap();
        session.state_mut().add_operand(ebx);

        slicer.compute(StepMode::Run).unwrap();
        assert_eq!(hook.0.get(), 1);
    }

    #[test]
    fn repeated_instruction_does_not_end_history() {
        let backend = ScriptedBackend::x86()
            .register("edi", 0x2000)
            .register("ecx", 1)
            .memory(0x2000, &[0, 0, 0, 0])
            .step(0x1000, "mov    eax,edx")
            .step(0x1002, "rep stos DWORD PTR es:[edi],eax")
            .step_register("ecx", 2)
            .step(0x1002, "rep stos DWORD PTR es:[edi],eax")
            .step(0x1004, "nop");
        let mut slicer = slicer(backend);
        slicer.session_mut().add_expression("0x2000").unwrap();
        assert_eq!(slicer.compute(StepMode::Run).unwrap(), Outcome::HistoryExhausted);
        let pcs: Vec<_> = slicer
            .session()
            .state()
            .instructions()
            .iter()
            .map(Instruction::pc)
            .collect();
        assert_eq!(pcs, vec![0x1002, 0x1002, 0x1000]);
    }

    #[test]
    fn repeated_instruction_at_history_start_ends_history() {
        let backend = ScriptedBackend::x86()
            .register("edi", 0x2000)
            .register("ecx", 4)
            .memory(0x2000, &[0, 0, 0, 0])
            .step(0x1000, "rep stos DWORD PTR es:[edi],eax");
        let mut slicer = slicer(backend);
        slicer.session_mut().add_expression("$ecx").unwrap();
        assert_eq!(slicer.compute(StepMode::Run).unwrap(), Outcome::HistoryExhausted);
        assert_eq!(slicer.session().state().instructions().len(), 1);
        assert_eq!(slicer.session().state().pc(), 0x1000);
    }

    #[test]
    fn memory_expressions() {
        let backend = ScriptedBackend::x86()
            .register("ebp", 0x100)
            .memory(0xf0, &[1, 2, 3, 4])
            .step(0x1000, "nop");
        let mut slicer = slicer(backend);
        let session = slicer.session_mut();
        assert_eq!(session.add_expression("DWORD PTR [ebp-0x10]").unwrap(), 4);
        assert_eq!(session.add_expression("0xf1").unwrap(), 0);
        assert!(matches!(
            session.add_expression("$notareg"),
            Err(SliceError::InvalidExpression(_))
        ));
        assert!(session.add_expression("0x5000").is_err());
        assert_eq!(session.state().tracked().len(), 4);
    }

    fn annotated(level: crate::config::SymbolLevel) -> Slicer {
        let backend = ScriptedBackend::x86()
            .register("ebx", 0x804a000)
            .memory(0x804a000, &[1])
            .symbol(0x804a000, "counter")
            .location(0x1000, "main.c", 12, "main")
            .step(0x0ffe, "nop")
            .step(0x1000, "mov    BYTE PTR [ebx],cl")
            .step(0x1002, "nop");
        let config = SliceConfig {
            symbol_level: level,
            ..SliceConfig::default()
        };
        let mut slicer = Slicer::new(backend, HookRegistry::new(), config).unwrap();
        slicer.session_mut().add_expression("0x804a000").unwrap();
        slicer
    }

    #[test]
    fn symbol_level_controls_annotations() {
        use crate::config::SymbolLevel;

        let mut slicer = annotated(SymbolLevel::Variables);
        let tracked = slicer.session().state().tracked().get(0).cloned().unwrap();
        assert_eq!(tracked.symbol(), Some("counter"));
        assert_eq!(slicer.compute(StepMode::Run).unwrap(), Outcome::HistoryExhausted);
        let insn = &slicer.session().state().instructions()[0];
        assert_eq!(insn.location().map(|l| l.line), Some(12));
        assert!(insn.to_string().starts_with("main.c:12 main 0x1000:"));

        let mut slicer = annotated(SymbolLevel::None);
        assert_eq!(slicer.session().state().tracked().get(0).unwrap().symbol(), None);
        slicer.compute(StepMode::Run).unwrap();
        assert!(slicer.session().state().instructions()[0].location().is_none());
    }

    #[test]
    fn add_current_instruction_tracks_sources() {
        let backend = ScriptedBackend::x86()
            .register("ebp", 0x100)
            .step(0x1000, "mov    DWORD PTR [ebp-0x8],ecx");
        let mut slicer = slicer(backend);
        slicer.session_mut().add_current_instruction().unwrap();
        let state = slicer.session().state();
        assert_eq!(state.instructions().len(), 1);
        let tracked: Vec<_> = state
            .tracked()
            .iter()
            .filter_map(|o| o.as_register().map(|r| r.name()))
            .collect();
        assert_eq!(tracked, vec!["ecx"]);
    }
}
