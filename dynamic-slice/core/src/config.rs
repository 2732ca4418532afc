use serde::{Deserialize, Serialize};

/// How much debug information to attach to sliced instructions and operands.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolLevel {
    None,
    /// Source file and line for every sliced instruction.
    Lines,
    /// Lines, plus symbol lookups for memory operands.
    Variables,
}

impl Default for SymbolLevel {
    fn default() -> Self {
        Self::Lines
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceConfig {
    pub symbol_level: SymbolLevel,
    pub monitor_stack: bool,
    pub hide_frame_instructions: bool,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            symbol_level: SymbolLevel::default(),
            monitor_stack: false,
            hide_frame_instructions: true,
        }
    }
}

impl SliceConfig {
    pub fn lines(&self) -> bool {
        self.symbol_level >= SymbolLevel::Lines
    }

    pub fn variables(&self) -> bool {
        self.symbol_level >= SymbolLevel::Variables
    }
}
