use std::{convert::TryFrom, fmt, path::PathBuf};

use crate::{error::Error, process::Process, utils, Address};

use winapi::{
    shared::minwindef::{DWORD, HMODULE},
    um::psapi,
};

/// A module loaded into a process.
pub struct Module<'a> {
    process: &'a Process,
    module: HMODULE,
}

impl fmt::Debug for Module<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Module")
            .field("module", &(self.module as usize))
            .finish()
    }
}

impl<'a> Module<'a> {
    /// Construct a new module.
    ///
    /// This constructor is internal, and is used by `Process`.
    pub(crate) fn new(process: &'a Process, module: HMODULE) -> Self {
        Self { process, module }
    }

    /// Get the full path to the file of the module.
    pub fn file_name(&self) -> Result<PathBuf, Error> {
        let name = utils::string(|buf, len| unsafe {
            psapi::GetModuleFileNameExW(**self.process.handle(), self.module, buf, len)
        })?;

        Ok(PathBuf::from(name))
    }

    /// Get the address that the module is loaded at.
    pub fn base(&self) -> Result<Address, Error> {
        use std::mem;

        let mut out: psapi::MODULEINFO = unsafe { mem::zeroed() };

        checked!(psapi::GetModuleInformation(
            **self.process.handle(),
            self.module,
            &mut out as psapi::LPMODULEINFO,
            mem::size_of::<psapi::MODULEINFO>() as DWORD,
        ))?;

        Address::try_from(out.lpBaseOfDll)
    }
}
