//! Turning textual operands into [`Operand`]s.
//!
//! The resolver walks an Intel-syntax addressing expression, substitutes
//! registers, asks the backend to evaluate the result and emits one memory
//! operand per byte touched. Registers used to form the address become
//! sources of the instruction. Anything it cannot make sense of is a decode
//! gap: logged, never an error.

use tracing::{trace, warn};

use crate::architecture::ArchDescription;
use crate::backend::Backend;
use crate::eval;
use crate::instruction::Instruction;
use crate::operand::{Direction, Operand, Register};
use crate::Hex;

/// Byte width named by an Intel size keyword.
pub fn size_keyword(word: &str) -> Option<u64> {
    match word {
        "BYTE" => Some(1),
        "WORD" => Some(2),
        "DWORD" => Some(4),
        "FWORD" => Some(6),
        "QWORD" => Some(8),
        "TBYTE" | "TWORD" => Some(10),
        "XMMWORD" | "OWORD" => Some(16),
        "YMMWORD" => Some(32),
        _ => None,
    }
}

fn segment_prefix(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.len() >= 3 && bytes[2] == b':' && bytes[1] == b's' {
        Some(&text[..2])
    } else {
        None
    }
}

fn is_skipped_segment(segment: &str) -> bool {
    segment == "fs" || segment == "gs"
}

/// Adds the operands of one instruction as they are classified.
pub(crate) struct Classifier<'a> {
    arch: &'static ArchDescription,
    backend: &'a dyn Backend,
    instruction: &'a mut Instruction,
    target: Option<u64>,
}

impl<'a> Classifier<'a> {
    pub fn new(
        arch: &'static ArchDescription,
        backend: &'a dyn Backend,
        instruction: &'a mut Instruction,
    ) -> Self {
        Self {
            arch,
            backend,
            instruction,
            target: None,
        }
    }

    /// Address the disassembler computed for an instruction-pointer relative
    /// operand (`# 0x601040 <counter>`).
    pub fn with_target(mut self, target: Option<u64>) -> Self {
        self.target = target;
        self
    }

    pub fn arch(&self) -> &'static ArchDescription {
        self.arch
    }

    pub fn instruction(&mut self) -> &mut Instruction {
        self.instruction
    }

    /// Width assumed for a memory operand without a size keyword.
    pub fn default_width(&self) -> u64 {
        self.arch.pointer_width
    }

    pub fn evaluate(&self, expression: &str) -> u64 {
        self.backend
            .evaluate_expression(expression)
            .unwrap_or_else(|err| {
                warn!(%expression, error = %err, "failed to evaluate, assuming 0");
                0
            })
    }

    pub fn evaluate_address(&self, expression: &str) -> u64 {
        self.backend
            .evaluate_expression_as_address(expression)
            .unwrap_or_else(|err| {
                warn!(%expression, error = %err, "failed to evaluate address, assuming 0");
                0
            })
    }

    fn read_byte(&self, address: u64) -> u8 {
        self.backend.read_memory_byte(address).unwrap_or_else(|err| {
            warn!(address = %Hex(address), error = %err, "unreadable memory, assuming 0");
            0
        })
    }

    /// Register operand for `name`, or `None` if the target has no such
    /// register.
    pub fn register_operand(&self, name: &str) -> Option<Operand> {
        let (name, group) = self.arch.register(name)?;
        let value = self.evaluate(&format!("${name}"));
        Some(Operand::register(Register::new(name, group), value))
    }

    /// Add the register `name` in `direction`, ignoring unknown names.
    pub fn register(&mut self, name: &str, direction: Direction) {
        match self.register_operand(name) {
            Some(operand) => self.instruction.add_operand(operand, direction),
            None => trace!(%name, "unknown register"),
        }
    }

    /// Classify one textual argument and add the resulting operands.
    pub fn argument(&mut self, text: &str, direction: Direction) {
        let text = text.trim();
        if text.is_empty() {
            trace!(pc = self.instruction.pc(), "missing operand");
            return;
        }

        if text.contains("fs:") || text.contains("gs:") {
            trace!(%text, "skipping segment-relative operand");
            return;
        }

        if segment_prefix(text).is_some() && text[3..].starts_with("0x") || text.starts_with('[') {
            let width = self.default_width();
            self.memory(text, width, direction);
        } else if text.contains("PTR") {
            let mut words = text.split_whitespace();
            let keyword = words.next().unwrap_or_default();
            let width = size_keyword(keyword).unwrap_or_else(|| {
                warn!(%keyword, "unknown size keyword");
                0
            });
            let expression = words
                .skip_while(|w| *w != "PTR")
                .skip(1)
                .collect::<Vec<_>>()
                .join(" ");
            self.memory(&expression, width, direction);
        } else if text.as_bytes()[0].is_ascii_digit() {
            match eval::number(text) {
                Some((value, _)) => self
                    .instruction
                    .add_operand(Operand::immediate(value), direction),
                None => trace!(%text, "malformed immediate"),
            }
        } else if self.arch.is_zero_register(text) {
            self.instruction
                .add_operand(Operand::immediate(0), direction);
        } else if let Some(operand) = self.register_operand(text) {
            self.instruction.add_operand(operand, direction);
        } else {
            trace!(%text, "unknown operand");
        }
    }

    /// Resolve a memory expression (`[ebp-0x10]`, `es:[edi]`, `ds:0x804a000`)
    /// and add `width` byte operands starting at its address.
    pub fn memory(&mut self, expression: &str, width: u64, direction: Direction) {
        let body = expression.trim();
        let body = body.split(']').next().unwrap_or_default();
        let mut resolved = String::new();
        let mut relative = false;
        let mut pos = 0;

        while pos < body.len() {
            let rest = &body[pos..];
            match rest.as_bytes()[0] {
                b'[' | b' ' => {
                    pos += 1;
                    continue;
                }
                c @ (b'+' | b'-' | b'*') => {
                    resolved.push(char::from(c));
                    pos += 1;
                    continue;
                }
                b'0'..=b'9' => match eval::number(rest) {
                    Some((_, len)) => {
                        resolved.push_str(&rest[..len]);
                        pos += len;
                        continue;
                    }
                    None => {
                        trace!(%expression, "malformed number in address");
                        return;
                    }
                },
                _ => {}
            }

            if let Some(segment) = segment_prefix(rest) {
                if is_skipped_segment(segment) {
                    trace!(%expression, "skipping segment-relative address");
                    return;
                }
                pos += 3;
                continue;
            }

            if let Some(zero) = self.arch.zero_register_prefix(rest) {
                resolved.push('0');
                pos += zero.len();
                continue;
            }

            if let Some((name, group)) = self.arch.register_prefix(rest) {
                let register = Register::new(name, group);
                relative |= group.contains(self.arch.instruction_pointer);
                let value = if self.arch.is_pointer_group(&group) {
                    let value = self.evaluate_address(&format!("${name}"));
                    resolved.push_str(&format!("{value:#x}"));
                    value
                } else {
                    resolved.push('$');
                    resolved.push_str(name);
                    self.evaluate(&format!("${name}"))
                };
                self.instruction
                    .add_operand(Operand::address_register(register, value), Direction::SOURCE);
                pos += name.len();
                continue;
            }

            trace!(%expression, at = %rest, "unknown token in address");
            return;
        }

        if resolved.is_empty() {
            trace!(%expression, "empty address expression");
            return;
        }

        // Instruction-pointer relative addresses are formed from the next
        // instruction, which only the disassembler knows.
        let base = match self.target {
            Some(target) if relative => target,
            _ => self.evaluate_address(&resolved),
        };
        for offset in 0..width {
            let address = base.wrapping_add(offset);
            let value = self.read_byte(address);
            self.instruction
                .add_operand(Operand::memory(address, value), direction);
        }
    }
}
