//! The interface the slicer drives. A backend owns the recorded execution
//! and answers questions about the state at its current position.

use crate::instruction::SourceLocation;

type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("failed to step {direction}")]
    FailedToStep {
        direction: &'static str,
        #[source]
        source: Option<SourceError>,
    },

    #[error("no instruction at {pc:#x?}")]
    FailedToDisassemble {
        pc: u64,
        #[source]
        source: Option<SourceError>,
    },

    #[error("failed to read memory at {address:#x?}")]
    FailedToReadMemory {
        address: u64,
        #[source]
        source: Option<SourceError>,
    },

    #[error("failed to evaluate `{expression}`")]
    FailedToEvaluate {
        expression: String,
        #[source]
        source: Option<SourceError>,
    },

    #[error("backend cannot {0}")]
    Unsupported(&'static str),
}

impl BackendError {
    pub fn failed_to_step(direction: &'static str, source: Option<SourceError>) -> Self {
        Self::FailedToStep { direction, source }
    }

    pub fn failed_to_disassemble(pc: u64, source: Option<SourceError>) -> Self {
        Self::FailedToDisassemble { pc, source }
    }

    pub fn failed_to_read_memory(address: u64, source: Option<SourceError>) -> Self {
        Self::FailedToReadMemory { address, source }
    }

    pub fn failed_to_evaluate(expression: &str, source: Option<SourceError>) -> Self {
        Self::FailedToEvaluate {
            expression: String::from(expression),
            source,
        }
    }
}

pub trait Backend {
    fn program_counter(&self) -> Result<u64, BackendError>;

    /// Move one instruction back in the recorded history. Reaching the start
    /// of history is not an error; the program counter just stops changing.
    fn step_backward(&mut self) -> Result<(), BackendError>;

    fn step_forward(&mut self) -> Result<(), BackendError>;

    fn architecture_name(&self) -> String;

    /// Intel-syntax text for the instruction at `address`.
    fn disassemble(&self, address: u64) -> Result<String, BackendError>;

    fn read_memory_byte(&self, address: u64) -> Result<u8, BackendError>;

    /// Evaluate an expression where `$name` refers to a register.
    fn evaluate_expression(&self, expression: &str) -> Result<u64, BackendError>;

    fn evaluate_expression_as_address(&self, expression: &str) -> Result<u64, BackendError> {
        self.evaluate_expression(expression)
    }

    fn source_location(&self) -> Option<SourceLocation>;

    fn symbol_for_address(&self, address: u64) -> Option<String>;

    fn is_address_executable(&self, address: u64) -> bool;

    /// Raw number of the signal that terminated the program.
    fn termination_signal(&self) -> Result<i32, BackendError>;

    fn is_pc_inside_function(&self, _name: &str) -> bool {
        false
    }

    fn is_pc_inside_file(&self, _name: &str) -> bool {
        false
    }
}
