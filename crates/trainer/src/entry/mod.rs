//! A single watched memory location, as specified on the command line.

mod parser;

pub use self::parser::{ParseError, Parser};

use crate::{error::Error, Address, ProcessMemory, Type};
use std::{fmt, str};

/// The 1-based position of an entry among all address arguments.
///
/// Used by other entries to refer to the value of this one, like `R1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefId(usize);

impl RefId {
    /// Construct a new reference id. Returns `None` for `0`.
    pub fn new(id: usize) -> Option<Self> {
        if id == 0 {
            return None;
        }

        Some(Self(id))
    }

    /// The reference id of the entry stored at the given 0-based index.
    pub fn from_index(index: usize) -> Self {
        Self(index + 1)
    }

    /// The 0-based index that the entry is stored at.
    pub fn index(self) -> usize {
        self.0 - 1
    }

    /// The raw, 1-based id.
    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "R{}", self.0)
    }
}

/// The value to write to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryValue {
    /// A literal value.
    Literal(i64),
    /// The current value of another entry.
    Reference(RefId),
}

impl fmt::Display for EntryValue {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(fmt, "{}", value),
            Self::Reference(id) => fmt::Display::fmt(id, fmt),
        }
    }
}

/// A parsed address expression, like `+##S:402F=R1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    /// If the address is relative to the base of the main module.
    pub is_offset: bool,
    /// How many times the address has to be dereferenced to find the value.
    pub pointer_levels: usize,
    /// The type the location is being treated as.
    pub ty: Type,
    /// The address as written.
    pub address: Address,
    /// The value to write, or `None` if the entry is only monitored.
    pub value: Option<EntryValue>,
}

impl Entry {
    /// Parse an address expression.
    ///
    /// The grammar is `[+][#...][Type:]Address[=Value]`, where `Value` is a
    /// decimal number, a `0x`-prefixed hex number (both optionally negated
    /// with `-`), or a reference to another entry like `R1`.
    pub fn parse(input: &str) -> Result<Entry, ParseError> {
        Parser::new(input).parse()
    }

    /// If the address is a pointer that has to be followed.
    pub fn is_pointer(&self) -> bool {
        self.pointer_levels > 0
    }

    /// If the entry is only read, and never written to.
    pub fn is_monitor_only(&self) -> bool {
        self.value.is_none()
    }

    /// If the value to write is the value of another entry.
    pub fn is_reference(&self) -> bool {
        self.reference().is_some()
    }

    /// The entry that this entry takes its value from, if any.
    pub fn reference(&self) -> Option<RefId> {
        match self.value {
            Some(EntryValue::Reference(id)) => Some(id),
            _ => None,
        }
    }

    /// Resolve the concrete address of the entry in the given process.
    ///
    /// This is not cached, since pointers along the way might change at any
    /// time.
    pub fn resolve<M>(&self, memory: &M) -> Result<Address, Error>
    where
        M: ?Sized + ProcessMemory,
    {
        let width = memory.pointer_width();
        let mut current = width.truncate(self.address);

        if self.is_offset {
            let base = memory.main_module_base()?;
            log::debug!("calculating offset {:X} from base {}", current, base);
            current = width.wrapping_add(current, base);
        }

        for _ in 0..self.pointer_levels {
            log::debug!("resolving pointer {}", current);
            current = width.truncate(memory.read_pointer(current)?);
        }

        Ok(current)
    }

    /// Resolve the entry and read its current value.
    pub fn read<M>(&self, memory: &M) -> Result<(Address, i64), Error>
    where
        M: ?Sized + ProcessMemory,
    {
        let address = self.resolve(memory)?;
        log::debug!("reading {} at {}", self.ty, address);
        let value = memory.read_value(self.ty, address)?;
        Ok((address, value))
    }
}

impl str::FromStr for Entry {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Entry::parse(s)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_offset {
            write!(fmt, "+")?;
        }

        for _ in 0..self.pointer_levels {
            write!(fmt, "#")?;
        }

        if self.ty != Type::default() {
            write!(fmt, "{}:", self.ty.letter())?;
        }

        write!(fmt, "{:X}", self.address)?;

        if let Some(value) = &self.value {
            write!(fmt, "={}", value)?;
        }

        Ok(())
    }
}
