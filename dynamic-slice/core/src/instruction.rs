use std::fmt;

use serde::{Deserialize, Serialize};

use crate::operand::{Direction, Operand};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub symbol: String,
}

/// A decoded instruction with its source and destination operands.
#[derive(Debug, Clone)]
pub struct Instruction {
    pc: u64,
    text: String,
    prefix: Option<String>,
    mnemonic: String,
    sources: Vec<Operand>,
    destinations: Vec<Operand>,
    location: Option<SourceLocation>,
    comment: String,
}

impl Instruction {
    pub fn new(pc: u64, text: &str, prefix: Option<&str>, mnemonic: &str) -> Self {
        Self {
            pc,
            text: text.trim().to_owned(),
            prefix: prefix.map(str::to_owned),
            mnemonic: mnemonic.to_owned(),
            sources: Vec::new(),
            destinations: Vec::new(),
            location: None,
            comment: String::new(),
        }
    }

    pub fn pc(&self) -> u64 {
        self.pc
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// `rep`-family prefixed instructions may leave the program counter in
    /// place while stepping.
    pub fn is_repeating(&self) -> bool {
        self.prefix.as_deref().map_or(false, |p| p.starts_with("rep"))
    }

    pub fn sources(&self) -> &[Operand] {
        &self.sources
    }

    pub fn destinations(&self) -> &[Operand] {
        &self.destinations
    }

    pub fn add_operand(&mut self, operand: Operand, direction: Direction) {
        if direction.contains(Direction::SOURCE) {
            self.sources.push(operand.clone());
        }
        if direction.contains(Direction::DESTINATION) {
            self.destinations.push(operand);
        }
    }

    pub(crate) fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        self.sources.iter_mut().chain(self.destinations.iter_mut())
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    pub fn set_location(&mut self, location: Option<SourceLocation>) {
        self.location = location;
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Append a note to the instruction's comment.
    pub fn annotate(&mut self, note: &str) {
        if !self.comment.is_empty() {
            self.comment.push(' ');
        }
        self.comment.push_str(note);
    }

    pub fn display(&self, verbose: bool) -> InstructionDisplay<'_> {
        InstructionDisplay {
            instruction: self,
            verbose,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.display(false), f)
    }
}

pub struct InstructionDisplay<'a> {
    instruction: &'a Instruction,
    verbose: bool,
}

fn write_list(f: &mut fmt::Formatter<'_>, operands: &[Operand]) -> fmt::Result {
    write!(f, "[")?;
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{operand}")?;
    }
    write!(f, "]")
}

impl fmt::Display for InstructionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let insn = self.instruction;
        match &insn.location {
            Some(loc) if !loc.file.is_empty() => write!(
                f,
                "{}:{} {} {:#x}: {}",
                loc.file, loc.line, loc.symbol, insn.pc, insn.text
            )?,
            _ => write!(f, "{:#x}: {}", insn.pc, insn.text)?,
        }

        if self.verbose {
            write!(f, "\n\t")?;
            write_list(f, &insn.sources)?;
            write!(f, " -> ")?;
            write_list(f, &insn.destinations)?;
        }

        let mut symbols = insn
            .sources
            .iter()
            .chain(insn.destinations.iter())
            .filter_map(Operand::symbol)
            .peekable();
        if symbols.peek().is_some() {
            write!(f, " //")?;
            for symbol in symbols {
                write!(f, " {symbol}")?;
            }
        }

        if !insn.comment.is_empty() {
            write!(f, " # {}", insn.comment)?;
        }
        Ok(())
    }
}
