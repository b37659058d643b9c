//! Utilities to query the system for things.

use crate::{error::Error, utils, ProcessId};

use winapi::um::{psapi, sysinfoapi, winnt};

/// Enumerate all processes, returning their corresponding pids.
pub fn processes() -> Result<Vec<ProcessId>, Error> {
    utils::array(0x400, |buf, size, needed| unsafe {
        psapi::EnumProcesses(buf, size, needed)
    })
}

/// Get general system information.
pub fn info() -> Info {
    use std::mem;

    let mut out: sysinfoapi::SYSTEM_INFO = unsafe { mem::zeroed() };
    unsafe { sysinfoapi::GetNativeSystemInfo(&mut out as sysinfoapi::LPSYSTEM_INFO) };

    let arch = match unsafe { out.u.s() }.wProcessorArchitecture {
        winnt::PROCESSOR_ARCHITECTURE_AMD64 => Arch::Amd64,
        _ => Arch::Other,
    };

    Info { arch }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Amd64,
    Other,
}

impl Arch {
    pub fn is_64bit(self) -> bool {
        match self {
            Arch::Amd64 => true,
            Arch::Other => false,
        }
    }
}

#[derive(Debug)]
pub struct Info {
    pub arch: Arch,
}
