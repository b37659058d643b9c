//! Stand-in for process access on platforms other than Windows.
//!
//! A `Process` can never be constructed here, so everything that requires one
//! is statically unreachable.

use std::{path::PathBuf, time::Duration};

use crate::{
    error::Error,
    info::{MemoryUsage, PriorityClass, ProcessDetails, Window},
    Address, PointerWidth, ProcessId, ProcessMemory,
};

use chrono::{DateTime, Local};

#[derive(Debug)]
pub enum Process {}

impl Process {
    pub fn open(_: ProcessId) -> Result<Process, Error> {
        Err(Error::Unsupported)
    }

    pub fn find_by_name(_: &str) -> Result<Process, Error> {
        Err(Error::Unsupported)
    }

    pub fn launch(_: &str) -> Result<Process, Error> {
        Err(Error::Unsupported)
    }

    pub fn process_id(&self) -> ProcessId {
        match *self {}
    }

    pub fn module_base_name(&self) -> Result<String, Error> {
        match *self {}
    }
}

impl ProcessMemory for Process {
    fn read_memory(&self, _: Address, _: &mut [u8]) -> Result<(), Error> {
        match *self {}
    }

    fn write_memory(&self, _: Address, _: &[u8]) -> Result<(), Error> {
        match *self {}
    }

    fn main_module_base(&self) -> Result<Address, Error> {
        match *self {}
    }

    fn pointer_width(&self) -> PointerWidth {
        match *self {}
    }

    fn is_alive(&self) -> bool {
        match *self {}
    }
}

impl ProcessDetails for Process {
    fn name(&self) -> Result<String, Error> {
        match *self {}
    }

    fn file_name(&self) -> Result<PathBuf, Error> {
        match *self {}
    }

    fn raw_handle(&self) -> usize {
        match *self {}
    }

    fn priority_class(&self) -> Result<PriorityClass, Error> {
        match *self {}
    }

    fn main_window(&self) -> Result<Option<Window>, Error> {
        match *self {}
    }

    fn memory_usage(&self) -> Result<MemoryUsage, Error> {
        match *self {}
    }

    fn start_time(&self) -> Result<DateTime<Local>, Error> {
        match *self {}
    }

    fn processor_time(&self) -> Result<Duration, Error> {
        match *self {}
    }
}

#[cfg(test)]
mod tests {
    use super::Process;
    use crate::error::Error;

    #[test]
    fn opening_is_unsupported() {
        assert!(matches!(Process::open(1), Err(Error::Unsupported)));
        assert!(matches!(Process::find_by_name("game.exe"), Err(Error::Unsupported)));
        assert!(matches!(Process::launch("game.exe"), Err(Error::Unsupported)));
    }
}
