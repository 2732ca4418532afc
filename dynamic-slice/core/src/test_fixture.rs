//! A programmable backend for unit tests.

use hashbrown::HashMap;

use crate::architecture::{ArchDescription, X86_64_DESCRIPTION, X86_DESCRIPTION};
use crate::backend::{Backend, BackendError};
use crate::eval;
use crate::instruction::SourceLocation;

/// Serves a fixed backward history. Memory does not change while stepping and
/// registers only do where a step overrides them; unset registers known to
/// the architecture read as zero.
/// Every address is executable until a range is given.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedBackend {
    name: &'static str,
    arch: &'static ArchDescription,
    registers: HashMap<String, u64>,
    memory: HashMap<u64, u8>,
    disassembly: HashMap<u64, String>,
    history: Vec<u64>,
    overrides: Vec<HashMap<String, u64>>,
    cursor: usize,
    signal: i32,
    executable: Vec<(u64, u64)>,
    symbols: HashMap<u64, String>,
    locations: HashMap<u64, SourceLocation>,
}

impl ScriptedBackend {
    fn new(name: &'static str, arch: &'static ArchDescription) -> Self {
        Self {
            name,
            arch,
            registers: HashMap::new(),
            memory: HashMap::new(),
            disassembly: HashMap::new(),
            history: Vec::new(),
            overrides: Vec::new(),
            cursor: 0,
            signal: 0,
            executable: Vec::new(),
            symbols: HashMap::new(),
            locations: HashMap::new(),
        }
    }

    pub fn x86() -> Self {
        Self::new("i386", &X86_DESCRIPTION)
    }

    pub fn x86_64() -> Self {
        Self::new("i386:x86-64", &X86_64_DESCRIPTION)
    }

    pub fn register(mut self, name: &str, value: u64) -> Self {
        self.registers.insert(name.to_owned(), value);
        self
    }

    pub fn memory(mut self, address: u64, bytes: &[u8]) -> Self {
        for (offset, byte) in bytes.iter().enumerate() {
            self.memory.insert(address + offset as u64, *byte);
        }
        self
    }

    pub fn disassembly(mut self, pc: u64, text: &str) -> Self {
        self.disassembly.insert(pc, text.to_owned());
        self
    }

    /// Append a newer instruction to the history and move to it.
    pub fn step(mut self, pc: u64, text: &str) -> Self {
        self.history.push(pc);
        self.overrides.push(HashMap::new());
        self.cursor = self.history.len() - 1;
        self.disassembly(pc, text)
    }

    /// Give `name` a value that only holds while positioned on the newest
    /// step.
    pub fn step_register(mut self, name: &str, value: u64) -> Self {
        if let Some(overrides) = self.overrides.last_mut() {
            overrides.insert(name.to_owned(), value);
        }
        self
    }

    pub fn signal(mut self, signal: i32) -> Self {
        self.signal = signal;
        self
    }

    pub fn executable(mut self, start: u64, end: u64) -> Self {
        self.executable.push((start, end));
        self
    }

    pub fn symbol(mut self, address: u64, name: &str) -> Self {
        self.symbols.insert(address, name.to_owned());
        self
    }

    pub fn location(mut self, pc: u64, file: &str, line: u32, symbol: &str) -> Self {
        self.locations.insert(
            pc,
            SourceLocation {
                file: file.to_owned(),
                line,
                symbol: symbol.to_owned(),
            },
        );
        self
    }

    fn register_value(&self, name: &str) -> Option<u64> {
        let overrides = self.overrides.get(self.cursor);
        if let Some(value) = overrides.and_then(|o| o.get(name)) {
            return Some(*value);
        }
        if let Some(value) = self.registers.get(name) {
            return Some(*value);
        }
        let group = self.arch.group(name)?;
        Some(self.registers.get(group.canonical()).copied().unwrap_or(0))
    }

    fn pc(&self) -> u64 {
        self.history.get(self.cursor).copied().unwrap_or(0)
    }
}

impl Backend for ScriptedBackend {
    fn program_counter(&self) -> Result<u64, BackendError> {
        Ok(self.pc())
    }

    fn step_backward(&mut self) -> Result<(), BackendError> {
        self.cursor = self.cursor.saturating_sub(1);
        Ok(())
    }

    fn step_forward(&mut self) -> Result<(), BackendError> {
        if self.cursor + 1 < self.history.len() {
            self.cursor += 1;
        }
        Ok(())
    }

    fn architecture_name(&self) -> String {
        self.name.to_owned()
    }

    fn disassemble(&self, address: u64) -> Result<String, BackendError> {
        self.disassembly
            .get(&address)
            .cloned()
            .ok_or_else(|| BackendError::failed_to_disassemble(address, None))
    }

    fn read_memory_byte(&self, address: u64) -> Result<u8, BackendError> {
        self.memory
            .get(&address)
            .copied()
            .ok_or_else(|| BackendError::failed_to_read_memory(address, None))
    }

    fn evaluate_expression(&self, expression: &str) -> Result<u64, BackendError> {
        eval::evaluate(expression, |name| self.register_value(name))
            .map_err(|err| BackendError::failed_to_evaluate(expression, Some(Box::new(err))))
    }

    fn source_location(&self) -> Option<SourceLocation> {
        self.locations.get(&self.pc()).cloned()
    }

    fn symbol_for_address(&self, address: u64) -> Option<String> {
        self.symbols.get(&address).cloned()
    }

    fn is_address_executable(&self, address: u64) -> bool {
        self.executable.is_empty()
            || self
                .executable
                .iter()
                .any(|&(start, end)| start <= address && address < end)
    }

    fn termination_signal(&self) -> Result<i32, BackendError> {
        Ok(self.signal)
    }
}
