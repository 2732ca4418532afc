use std::fmt::Write;

use tracing::info;

use crate::error::SliceError;
use crate::instruction::Instruction;
use crate::operand::Operand;
use crate::seed::Signal;

/// Operands being traced backwards. Insertion ignores duplicates under
/// operand equality, so immediates are never stored.
#[derive(Debug, Clone, Default)]
pub struct TrackedOperands(Vec<Operand>);

impl TrackedOperands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `operand` unless an equal one is tracked. Returns whether it was
    /// added.
    pub fn insert(&mut self, operand: Operand) -> bool {
        if operand.is_immediate() || self.contains(&operand) {
            return false;
        }
        self.0.push(operand);
        true
    }

    pub fn contains(&self, operand: &Operand) -> bool {
        self.0.iter().any(|o| o == operand)
    }

    pub fn get(&self, index: usize) -> Option<&Operand> {
        self.0.get(index)
    }

    pub fn remove(&mut self, index: usize) -> Option<Operand> {
        (index < self.0.len()).then(|| self.0.remove(index))
    }

    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&Operand) -> bool,
    {
        self.0.retain(f)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operand> {
        self.0.iter()
    }

    /// Operand locations cannot change through an `Operand`, so mutating
    /// symbols and hooks keeps the set deduplicated.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Extend<Operand> for TrackedOperands {
    fn extend<T: IntoIterator<Item = Operand>>(&mut self, iter: T) {
        for operand in iter {
            self.insert(operand);
        }
    }
}

/// The mutable state of a slicing session.
#[derive(Debug)]
pub struct SliceState {
    tracked: TrackedOperands,
    instructions: Vec<Instruction>,
    followed: Option<Operand>,
    signal: Option<Signal>,
    pc: u64,
    keep_going: bool,
}

impl Default for SliceState {
    fn default() -> Self {
        Self {
            tracked: TrackedOperands::new(),
            instructions: Vec::new(),
            followed: None,
            signal: None,
            pc: 0,
            keep_going: true,
        }
    }
}

impl SliceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked(&self) -> &TrackedOperands {
        &self.tracked
    }

    pub fn tracked_mut(&mut self) -> &mut TrackedOperands {
        &mut self.tracked
    }

    pub fn add_operand(&mut self, operand: Operand) -> bool {
        let text = operand.to_string();
        let added = self.tracked.insert(operand);
        if added {
            info!("tracking {text}");
        }
        added
    }

    pub fn remove_operand(&mut self, index: usize) -> Result<Operand, SliceError> {
        let len = self.tracked.len();
        let operand = self
            .tracked
            .remove(index)
            .ok_or(SliceError::InvalidOperandIndex { index, len })?;
        if self.followed.as_ref() == Some(&operand) {
            self.followed = None;
        }
        info!("removed operand ({}): {operand}", index + 1);
        Ok(operand)
    }

    /// Follow the tracked operand at `index`, or stop following with `None`.
    pub fn set_followed(&mut self, index: Option<usize>) -> Result<(), SliceError> {
        self.followed = match index {
            Some(index) => Some(
                self.tracked
                    .get(index)
                    .cloned()
                    .ok_or(SliceError::InvalidOperandIndex {
                        index,
                        len: self.tracked.len(),
                    })?,
            ),
            None => None,
        };
        Ok(())
    }

    pub fn followed(&self) -> Option<&Operand> {
        self.followed.as_ref()
    }

    pub(crate) fn clear_followed(&mut self) {
        self.followed = None;
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub(crate) fn push_instruction(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn remove_instruction(&mut self, index: usize) -> Result<Instruction, SliceError> {
        if index >= self.instructions.len() {
            return Err(SliceError::InvalidInstructionIndex {
                index,
                len: self.instructions.len(),
            });
        }
        let instruction = self.instructions.remove(index);
        info!("removed instruction ({}): {}", index + 1, instruction.text());
        Ok(instruction)
    }

    pub fn signal(&self) -> Option<Signal> {
        self.signal
    }

    pub(crate) fn set_signal(&mut self, signal: Signal) {
        self.signal = Some(signal);
    }

    pub fn pc(&self) -> u64 {
        self.pc
    }

    pub(crate) fn set_pc(&mut self, pc: u64) {
        self.pc = pc;
    }

    /// Ask a running computation to stop before its next iteration.
    pub fn stop(&mut self) {
        self.keep_going = false;
    }

    pub fn is_running(&self) -> bool {
        self.keep_going
    }

    pub(crate) fn resume(&mut self) {
        self.keep_going = true;
    }

    pub fn operand_listing(&self) -> String {
        let mut out = String::from("--- operand list ---\n");
        for (i, operand) in self.tracked.iter().enumerate() {
            let _ = write!(out, "{}\t{operand}", i + 1);
            if self.followed.as_ref() == Some(operand) {
                out.push_str(" (following)");
            }
            out.push('\n');
        }
        out
    }

    /// List `count` instructions starting at the 1-based `start`. Frame
    /// bookkeeping (`call`, `ret`, `leave`) is left out when
    /// `hide_frame_instructions` is set and the listing is not verbose.
    pub fn instruction_listing(
        &self,
        start: usize,
        count: Option<usize>,
        verbose: bool,
        hide_frame_instructions: bool,
    ) -> String {
        let mut out = String::from("--- slice instructions ---\n");
        if self.instructions.is_empty() {
            out.push_str("no instructions\n");
            return out;
        }

        let first = start.saturating_sub(1);
        let last = count.map_or(self.instructions.len(), |c| first.saturating_add(c));
        for (i, insn) in self
            .instructions
            .iter()
            .enumerate()
            .skip(first)
            .take(last.saturating_sub(first))
        {
            if hide_frame_instructions
                && !verbose
                && matches!(insn.mnemonic(), "call" | "ret" | "leave")
            {
                continue;
            }
            let _ = writeln!(out, "{}\t{}", i + 1, insn.display(verbose));
        }
        out
    }
}
