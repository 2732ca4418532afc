use std::fmt;
use std::rc::Rc;

use crate::architecture::RegisterGroup;
use crate::hooks::OperandHook;

bitflags::bitflags! {
    /// How an instruction uses an operand.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct Direction: u8 {
        const SOURCE = 0b01;
        const DESTINATION = 0b10;
        const BOTH = Self::SOURCE.bits() | Self::DESTINATION.bits();
    }
}

/// A register as named in the disassembly, together with its alias group.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Register {
    name: &'static str,
    group: RegisterGroup,
}

impl Register {
    pub fn new(name: &'static str, group: RegisterGroup) -> Self {
        Self { name, group }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> RegisterGroup {
        self.group
    }
}

#[derive(Debug, Copy, Clone)]
pub enum Location {
    Register(Register),
    /// One byte of memory.
    Memory(u64),
    Immediate,
}

/// A single value read or written by an instruction.
///
/// Equality is identity of storage: registers compare by alias group and
/// memory by address. Immediates never compare equal to anything, so they
/// can never be tracked or matched.
#[derive(Clone)]
pub struct Operand {
    location: Location,
    value: u64,
    is_memory_access: bool,
    symbol: Option<String>,
    hook: Option<Rc<dyn OperandHook>>,
}

impl Operand {
    fn with_location(location: Location, value: u64) -> Self {
        Self {
            location,
            value,
            is_memory_access: false,
            symbol: None,
            hook: None,
        }
    }

    pub fn register(register: Register, value: u64) -> Self {
        Self::with_location(Location::Register(register), value)
    }

    /// A register read while forming a memory address.
    pub fn address_register(register: Register, value: u64) -> Self {
        Self {
            is_memory_access: true,
            ..Self::register(register, value)
        }
    }

    pub fn memory(address: u64, value: u8) -> Self {
        Self::with_location(Location::Memory(address), u64::from(value))
    }

    pub fn immediate(value: u64) -> Self {
        Self::with_location(Location::Immediate, value)
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn is_memory_access(&self) -> bool {
        self.is_memory_access
    }

    pub fn as_register(&self) -> Option<&Register> {
        match &self.location {
            Location::Register(register) => Some(register),
            _ => None,
        }
    }

    pub fn address(&self) -> Option<u64> {
        match self.location {
            Location::Memory(address) => Some(address),
            _ => None,
        }
    }

    pub fn is_register(&self) -> bool {
        matches!(self.location, Location::Register(_))
    }

    pub fn is_memory(&self) -> bool {
        matches!(self.location, Location::Memory(_))
    }

    pub fn is_immediate(&self) -> bool {
        matches!(self.location, Location::Immediate)
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn set_symbol(&mut self, symbol: Option<String>) {
        self.symbol = symbol;
    }

    pub fn hook(&self) -> Option<&Rc<dyn OperandHook>> {
        self.hook.as_ref()
    }

    pub fn set_hook(&mut self, hook: Rc<dyn OperandHook>) {
        self.hook = Some(hook);
    }

    pub fn clear_hook(&mut self) {
        self.hook = None;
    }
}

impl PartialEq for Operand {
    fn eq(&self, other: &Self) -> bool {
        match (&self.location, &other.location) {
            (Location::Register(a), Location::Register(b)) => a.group == b.group,
            (Location::Memory(a), Location::Memory(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Location::Register(register) => write!(f, "${}:{:#x}", register.name, self.value)?,
            Location::Memory(address) => write!(f, "{:#x}:{:#x}", address, self.value)?,
            Location::Immediate => write!(f, "{:#x}", self.value)?,
        }
        if let Some(symbol) = &self.symbol {
            write!(f, " // {symbol}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operand")
            .field("location", &self.location)
            .field("value", &format_args!("{:#x}", self.value))
            .field("is_memory_access", &self.is_memory_access)
            .field("symbol", &self.symbol)
            .field("hook", &self.hook.as_ref().map(|h| h.name().to_owned()))
            .finish()
    }
}
