use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use dslice::architecture::{ArchDescription, Architecture};
use dslice::backend::{Backend, BackendError};
use dslice::eval;
use dslice::instruction::SourceLocation;

use hashbrown::HashMap;
use tracing::debug;

use crate::error::ReplayError;
use crate::recording::{Frame, Recording, Step};

/// Replays a [`Recording`], positioned on its newest step.
#[derive(Debug)]
pub struct ReplayBackend {
    recording: Recording,
    arch: &'static ArchDescription,
    image: HashMap<u64, u8>,
    cursor: usize,
}

impl ReplayBackend {
    pub fn new(recording: Recording) -> Result<Self, ReplayError> {
        if recording.steps.is_empty() {
            return Err(ReplayError::EmptyRecording);
        }
        let arch = Architecture::from_name(&recording.arch)
            .map_err(|_| ReplayError::UnsupportedArchitecture(recording.arch.clone()))?
            .description();
        let image = recording
            .memory
            .iter()
            .map(|(address, byte)| (address.0, *byte))
            .collect();
        let cursor = recording.steps.len() - 1;

        debug!(
            arch = arch.name,
            steps = recording.steps.len(),
            "loaded recording"
        );

        Ok(Self {
            recording,
            arch,
            image,
            cursor,
        })
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReplayError> {
        Self::new(serde_json::from_reader(reader)?)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReplayError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    /// Index of the current step, 0 being the oldest.
    pub fn position(&self) -> usize {
        self.cursor
    }

    fn step(&self) -> &Step {
        &self.recording.steps[self.cursor]
    }

    fn frames(&self) -> &[Frame] {
        &self.step().frames
    }

    /// Latest value named `name` at or before the current step.
    fn recorded(&self, name: &str) -> Option<u64> {
        self.recording.steps[..=self.cursor]
            .iter()
            .rev()
            .find_map(|step| step.registers.get(name))
            .map(|word| word.0)
    }

    fn register_value(&self, name: &str) -> Option<u64> {
        if let Some(value) = self.recorded(name) {
            return Some(value);
        }
        let group = self.arch.group(name)?;
        let Some((shift, mask)) = subregister(group.canonical(), name) else {
            // Registers outside the general purpose file are only known when
            // recorded.
            return Some(0);
        };
        // Names are listed widest first.
        let parent = group
            .names()
            .iter()
            .take_while(|&&wider| wider != name)
            .filter(|&&wider| !is_high_byte(wider))
            .find_map(|&wider| self.recorded(wider))
            .unwrap_or(0);
        Some((parent >> shift) & mask)
    }

    fn symbol_containing(&self, address: u64) -> Option<&str> {
        self.recording
            .symbols
            .iter()
            .find(|symbol| symbol.contains(address))
            .map(|symbol| symbol.name.as_str())
    }
}

fn is_high_byte(name: &str) -> bool {
    matches!(name, "ah" | "bh" | "ch" | "dh")
}

/// Bit offset and mask of `name` inside the full register `canonical`, for
/// general purpose registers.
fn subregister(canonical: &str, name: &str) -> Option<(u32, u64)> {
    if name == canonical {
        return Some((0, u64::MAX));
    }
    let numbered = name.starts_with('r') && name[1..].starts_with(|c: char| c.is_ascii_digit());
    let (shift, bits) = match name {
        _ if is_high_byte(name) => (8, 8),
        _ if numbered && name.ends_with('d') => (0, 32),
        _ if numbered && name.ends_with('w') => (0, 16),
        _ if numbered && (name.ends_with('b') || name.ends_with('l')) => (0, 8),
        _ if name.len() >= 2 && name.ends_with('l') => (0, 8),
        _ if name.len() == 3 && name.starts_with('e') => (0, 32),
        _ if name.len() == 2 => (0, 16),
        _ => return None,
    };
    Some((shift, (1u64 << bits) - 1))
}

impl Backend for ReplayBackend {
    fn program_counter(&self) -> Result<u64, BackendError> {
        Ok(self.step().pc.0)
    }

    fn step_backward(&mut self) -> Result<(), BackendError> {
        self.cursor = self.cursor.saturating_sub(1);
        Ok(())
    }

    fn step_forward(&mut self) -> Result<(), BackendError> {
        if self.cursor + 1 < self.recording.steps.len() {
            self.cursor += 1;
        }
        Ok(())
    }

    fn architecture_name(&self) -> String {
        self.recording.arch.clone()
    }

    fn disassemble(&self, address: u64) -> Result<String, BackendError> {
        self.recording
            .steps
            .iter()
            .find(|step| step.pc.0 == address)
            .map(|step| step.asm.clone())
            .ok_or_else(|| BackendError::failed_to_disassemble(address, None))
    }

    fn read_memory_byte(&self, address: u64) -> Result<u8, BackendError> {
        self.recording.steps[..self.cursor]
            .iter()
            .rev()
            .find_map(|step| {
                step.writes
                    .iter()
                    .rev()
                    .find(|(written, _)| written.0 == address)
                    .map(|(_, byte)| *byte)
            })
            .or_else(|| self.image.get(&address).copied())
            .ok_or_else(|| BackendError::failed_to_read_memory(address, None))
    }

    fn evaluate_expression(&self, expression: &str) -> Result<u64, BackendError> {
        eval::evaluate(expression, |name| self.register_value(name))
            .map_err(|err| BackendError::failed_to_evaluate(expression, Some(Box::new(err))))
    }

    fn source_location(&self) -> Option<SourceLocation> {
        let step = self.step();
        if step.file.is_empty() {
            return None;
        }
        let symbol = match self.frames().first() {
            Some(frame) => frame.function.clone(),
            None => self
                .symbol_containing(step.pc.0)
                .unwrap_or_default()
                .to_owned(),
        };
        Some(SourceLocation {
            file: step.file.clone(),
            line: step.line,
            symbol,
        })
    }

    fn symbol_for_address(&self, address: u64) -> Option<String> {
        let symbol = self
            .recording
            .symbols
            .iter()
            .find(|symbol| symbol.contains(address))?;
        match address - symbol.start.0 {
            0 => Some(symbol.name.clone()),
            offset => Some(format!("{}+{offset:#x}", symbol.name)),
        }
    }

    fn is_address_executable(&self, address: u64) -> bool {
        if self.recording.executable.is_empty() {
            return self.recording.steps.iter().any(|step| step.pc.0 == address);
        }
        self.recording
            .executable
            .iter()
            .any(|(start, end)| start.0 <= address && address < end.0)
    }

    fn termination_signal(&self) -> Result<i32, BackendError> {
        self.recording
            .signal
            .ok_or(BackendError::Unsupported("report a termination signal"))
    }

    fn is_pc_inside_function(&self, name: &str) -> bool {
        if self.frames().is_empty() {
            return self.symbol_containing(self.step().pc.0) == Some(name);
        }
        self.frames().iter().any(|frame| frame.function == name)
    }

    fn is_pc_inside_file(&self, name: &str) -> bool {
        if self.frames().is_empty() {
            return self.step().file == name;
        }
        self.frames().iter().any(|frame| frame.file == name)
    }
}
