//! On-disk format of a recorded execution.
//!
//! A recording is a JSON document listing the executed instructions oldest
//! first, each with the register values observed before it ran and the memory
//! it wrote. Addresses and values may be written as JSON numbers or as
//! `"0x..."` strings.

use std::fmt;

use hashbrown::HashMap;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// A 64-bit address or value.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Word(pub u64);

impl Serialize for Word {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

struct WordVisitor;

impl<'de> Visitor<'de> for WordVisitor {
    type Value = Word;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an unsigned integer or a \"0x\" prefixed hex string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Word, E> {
        Ok(Word(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Word, E> {
        Ok(Word(v as u64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Word, E> {
        let digits = v
            .strip_prefix("0x")
            .or_else(|| v.strip_prefix("0X"))
            .ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))?;
        u64::from_str_radix(digits, 16)
            .map(Word)
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for Word {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(WordVisitor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub start: Word,
    pub end: Word,
}

impl Symbol {
    pub fn contains(&self, address: u64) -> bool {
        self.start.0 <= address && address < self.end.0
    }
}

/// One entry of the call stack at a step, innermost first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Frame {
    pub function: String,
    pub file: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Step {
    pub pc: Word,
    pub asm: String,
    /// Register values before the instruction executed. Registers not named
    /// keep their value from earlier steps.
    pub registers: HashMap<String, Word>,
    /// Bytes the instruction wrote.
    pub writes: Vec<(Word, u8)>,
    pub file: String,
    pub line: u32,
    pub frames: Vec<Frame>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub arch: String,
    #[serde(default)]
    pub signal: Option<i32>,
    /// Executable address ranges, end exclusive.
    #[serde(default)]
    pub executable: Vec<(Word, Word)>,
    #[serde(default)]
    pub symbols: Vec<Symbol>,
    /// Memory image before the first step.
    #[serde(default)]
    pub memory: Vec<(Word, u8)>,
    pub steps: Vec<Step>,
}
