//! Watch and patch values in the memory of a running process.
//!
//! <br>
//!
//! ## Usage
//!
//! ```text
//! trainer <[/L:]ProcessName|ProcessId> [/V] [/O] [<address> ...]
//! ```
//!
//! The first argument which is not a switch names the process to attach to,
//! either as an executable name ending in `.exe` or as a process id. Prefix it
//! with `/L:` to launch a new instance of the executable instead.
//!
//! Every following argument is an _address expression_. Expressions are
//! numbered from `1` in the order they are given, and every cycle the trainer
//! first writes all expressions which have a value, and then shows the current
//! value of all of them. This repeats every 100 milliseconds until the process
//! exits, unless `/O` is given in which case only a single cycle is run.
//!
//! <br>
//!
//! ## Address expressions
//!
//! ```text
//! [+][#...][Type:]Address[=Value]
//! ```
//!
//! * `+` - The address is an offset from the base of the main module.
//! * `#` - The address holds a pointer which is followed to find the value.
//!   Repeat for pointers to pointers.
//! * `Type` - One of `B` (8-bit unsigned), `S` (16-bit), `I` (32-bit, the
//!   default) or `L` (64-bit).
//! * `Address` - The address in hexadecimal, without a `0x` prefix.
//! * `Value` - The value to write. Either a decimal number, a `0x`-prefixed
//!   hexadecimal number, or `R<n>` to write the current value of expression
//!   `n`. Numbers can be negated with a leading `-`.
//!
//! Without a value the location is only shown.
//!
//! For example:
//!
//! ```text
//! trainer game.exe +##I:402F #B:85B3E=0x10 +S:10=R1
//! ```

#[cfg(windows)]
#[macro_use]
mod utils;
mod address;
mod entries;
mod entry;
mod error;
pub mod info;
mod memory;
pub mod monitor;
pub mod opts;
#[cfg(windows)]
mod module;
#[cfg(windows)]
mod process;
#[cfg(windows)]
pub mod system;
mod token;
mod ty;
#[cfg(not(windows))]
mod unsupported;

pub type ProcessId = u32;

pub use self::address::Address;
pub use self::entries::Entries;
pub use self::entry::{Entry, EntryValue, ParseError, RefId};
pub use self::error::Error;
pub use self::info::ProcessDetails;
pub use self::memory::{PointerWidth, ProcessMemory};
pub use self::monitor::Monitor;
#[cfg(windows)]
pub use self::module::Module;
#[cfg(windows)]
pub use self::process::Process;
pub use self::token::Token;
pub use self::ty::Type;
#[cfg(not(windows))]
pub use self::unsupported::Process;
