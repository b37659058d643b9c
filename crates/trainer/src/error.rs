use crate::{entry::ParseError, Address, ProcessId, RefId};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("system error: {0}")]
    System(#[source] io::Error),
    #[error("process memory access is not supported on this platform")]
    Unsupported,
    #[error("{0}")]
    InvalidArguments(String),
    #[error("invalid process id: {0}")]
    InvalidProcessId(String),
    #[error("attempted to launch a process id")]
    LaunchProcessId,
    #[error("invalid address argument: {0}")]
    Parse(String, #[source] ParseError),
    #[error("entry {0} references {1}, but only {2} addresses were specified")]
    ReferenceOutOfRange(RefId, RefId, usize),
    #[error("entry {0} is part of a reference cycle")]
    ReferenceCycle(RefId),
    #[error("can't find a running process `{0}`")]
    ProcessNotFound(String),
    #[error("failed to open process {0}")]
    OpenProcess(ProcessId, #[source] io::Error),
    #[error("can't launch process `{0}`")]
    Launch(String, #[source] io::Error),
    #[error("process has exited")]
    ProcessExited,
    #[error("process has no main module")]
    MissingMainModule,
    #[error("failed to read memory at {0}")]
    ReadUnderflow(Address),
    #[error("failed to write memory at {0}")]
    WriteUnderflow(Address),
    #[error("process reported an invalid time")]
    InvalidTime,
    #[error("failed to convert number to address")]
    AddressConversion,
    #[error("failed to convert string to address")]
    AddressFromStr,
}

impl Error {
    /// Get last system error.
    pub fn last_system_error() -> Self {
        Self::System(io::Error::last_os_error())
    }

    /// Access the underlying raw OS error.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::System(e) | Self::OpenProcess(_, e) | Self::Launch(_, e) => e.raw_os_error(),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::System(error)
    }
}
