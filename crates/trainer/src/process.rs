//! Access to a running Windows process.

use std::{
    ffi::OsStr,
    fmt, mem,
    path::{Path, PathBuf},
    process::Command,
    ptr,
    time::Duration,
};

use crate::{
    error::Error,
    info::{MemoryUsage, PriorityClass, ProcessDetails, Window},
    module::Module,
    system, utils, Address, PointerWidth, ProcessId, ProcessMemory,
};

use chrono::{DateTime, Local, TimeZone as _};
use winapi::{
    shared::{
        basetsd::SIZE_T,
        minwindef::{BOOL, DWORD, FALSE, FILETIME, HMODULE, LPARAM, LPCVOID, LPVOID, PBOOL, TRUE},
        windef::HWND,
        winerror,
    },
    um::{memoryapi, processthreadsapi, psapi, winbase, winnt, winuser, wow64apiset},
};

/// Exit code reported for processes which are still running.
const STILL_ACTIVE: DWORD = 259;

/// Seconds between the Windows epoch (1601) and the Unix epoch (1970).
const EPOCH_DIFFERENCE: i64 = 11_644_473_600;

/// A handle to an open process.
pub struct Process {
    process_id: ProcessId,
    handle: utils::Handle,
    width: PointerWidth,
}

impl Process {
    pub fn builder() -> OpenProcessBuilder {
        OpenProcessBuilder::default()
    }

    /// Open the process with the given id with enough access to read and
    /// write its memory.
    pub fn open(process_id: ProcessId) -> Result<Process, Error> {
        Self::builder()
            .query_information()
            .vm_read()
            .vm_write()
            .vm_operation()
            .build(process_id)
    }

    /// Find the running process with the given executable name, and open it.
    ///
    /// The name is compared case-insensitively. If multiple processes match,
    /// the one with the highest process id is picked.
    pub fn find_by_name(name: &str) -> Result<Process, Error> {
        let wanted = Path::new(name)
            .file_name()
            .unwrap_or_else(|| OsStr::new(name))
            .to_string_lossy()
            .to_lowercase();

        let mut found = None;

        for pid in system::processes()? {
            // NB: the idle process can't be opened.
            if pid == 0 {
                continue;
            }

            let process = match Self::builder().query_information().vm_read().build(pid) {
                Ok(process) => process,
                Err(e) => {
                    log::debug!("skipping process {}: {}", pid, e);
                    continue;
                }
            };

            let process_name = match process.module_base_name() {
                Ok(process_name) => process_name,
                Err(..) => continue,
            };

            if process_name.to_lowercase() == wanted {
                log::debug!("found process {} named {}", pid, process_name);
                found = Some(found.map_or(pid, |current: ProcessId| current.max(pid)));
            }
        }

        match found {
            Some(pid) => Self::open(pid),
            None => Err(Error::ProcessNotFound(name.to_string())),
        }
    }

    /// Launch a new instance of the given executable and open it.
    ///
    /// Executables without a path are looked up in `PATH`.
    pub fn launch(path: &str) -> Result<Process, Error> {
        log::debug!("launching {}", path);

        let child = Command::new(path)
            .spawn()
            .map_err(|e| Error::Launch(path.to_string(), e))?;

        Self::open(child.id())
    }

    /// Get the process ID.
    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    /// Access the underlying handle.
    pub(crate) fn handle(&self) -> &utils::Handle {
        &self.handle
    }

    /// Get the name of the main module of the process.
    pub fn module_base_name(&self) -> Result<String, Error> {
        let name = utils::string(|buf, len| unsafe {
            psapi::GetModuleBaseNameW(*self.handle, ptr::null_mut(), buf, len)
        })?;

        Ok(name.to_string_lossy().into_owned())
    }

    /// Enumerate all modules, starting with the main module.
    pub fn modules(&self) -> Result<Vec<Module<'_>>, Error> {
        let modules = utils::array::<HMODULE>(0x100, |buf, size, needed| unsafe {
            psapi::EnumProcessModules(*self.handle, buf, size, needed)
        })?;

        Ok(modules.into_iter().map(|m| Module::new(self, m)).collect())
    }

    /// The module of the executable that started the process.
    pub fn main_module(&self) -> Result<Module<'_>, Error> {
        self.modules()?
            .into_iter()
            .next()
            .ok_or(Error::MissingMainModule)
    }

    /// Test if the process is a 32-bit process running under WOW64 compatibility.
    pub fn is_wow64(&self) -> Result<bool, Error> {
        let mut out: BOOL = FALSE;
        checked!(wow64apiset::IsWow64Process(*self.handle, &mut out as PBOOL))?;
        Ok(out == TRUE)
    }

    /// Detect the width of pointers in the process.
    fn detect_pointer_width(&self) -> Result<PointerWidth, Error> {
        if cfg!(target_pointer_width = "32") || self.is_wow64()? {
            return Ok(PointerWidth::Four);
        }

        if system::info().arch.is_64bit() {
            Ok(PointerWidth::Eight)
        } else {
            Ok(PointerWidth::Four)
        }
    }

    fn times(&self) -> Result<[FILETIME; 4], Error> {
        let mut times: [FILETIME; 4] = unsafe { mem::zeroed() };
        let [creation, exit, kernel, user] = &mut times;

        checked!(processthreadsapi::GetProcessTimes(
            *self.handle,
            creation,
            exit,
            kernel,
            user
        ))?;

        Ok(times)
    }
}

impl ProcessMemory for Process {
    fn read_memory(&self, address: Address, buf: &mut [u8]) -> Result<(), Error> {
        let mut bytes_read: SIZE_T = 0;

        let result = checked!(memoryapi::ReadProcessMemory(
            *self.handle,
            address.as_ptr::<winapi::ctypes::c_void>()? as LPCVOID,
            buf.as_mut_ptr() as LPVOID,
            buf.len() as SIZE_T,
            &mut bytes_read as *mut SIZE_T,
        ));

        match result {
            Ok(()) if bytes_read == buf.len() => Ok(()),
            Ok(()) => Err(Error::ReadUnderflow(address)),
            Err(ref e) if e.raw_os_error() == Some(winerror::ERROR_PARTIAL_COPY as i32) => {
                Err(Error::ReadUnderflow(address))
            }
            Err(e) => Err(e),
        }
    }

    fn write_memory(&self, address: Address, buf: &[u8]) -> Result<(), Error> {
        let mut bytes_written: SIZE_T = 0;

        let result = checked!(memoryapi::WriteProcessMemory(
            *self.handle,
            address.as_mut_ptr::<winapi::ctypes::c_void>()? as LPVOID,
            buf.as_ptr() as LPCVOID,
            buf.len() as SIZE_T,
            &mut bytes_written as *mut SIZE_T,
        ));

        match result {
            Ok(()) if bytes_written == buf.len() => Ok(()),
            Ok(()) => Err(Error::WriteUnderflow(address)),
            Err(ref e) if e.raw_os_error() == Some(winerror::ERROR_PARTIAL_COPY as i32) => {
                Err(Error::WriteUnderflow(address))
            }
            Err(e) => Err(e),
        }
    }

    fn main_module_base(&self) -> Result<Address, Error> {
        self.main_module()?.base()
    }

    fn pointer_width(&self) -> PointerWidth {
        self.width
    }

    fn is_alive(&self) -> bool {
        let mut code: DWORD = 0;

        match checked!(processthreadsapi::GetExitCodeProcess(
            *self.handle,
            &mut code as *mut DWORD
        )) {
            Ok(()) => code == STILL_ACTIVE,
            Err(e) => {
                log::debug!("failed to get exit code of process: {}", e);
                false
            }
        }
    }
}

impl ProcessDetails for Process {
    fn name(&self) -> Result<String, Error> {
        self.module_base_name()
    }

    fn file_name(&self) -> Result<PathBuf, Error> {
        self.main_module()?.file_name()
    }

    fn raw_handle(&self) -> usize {
        *self.handle as usize
    }

    fn priority_class(&self) -> Result<PriorityClass, Error> {
        let class = unsafe { processthreadsapi::GetPriorityClass(*self.handle) };

        Ok(match class {
            0 => return Err(Error::last_system_error()),
            winbase::IDLE_PRIORITY_CLASS => PriorityClass::Idle,
            winbase::BELOW_NORMAL_PRIORITY_CLASS => PriorityClass::BelowNormal,
            winbase::NORMAL_PRIORITY_CLASS => PriorityClass::Normal,
            winbase::ABOVE_NORMAL_PRIORITY_CLASS => PriorityClass::AboveNormal,
            winbase::HIGH_PRIORITY_CLASS => PriorityClass::High,
            winbase::REALTIME_PRIORITY_CLASS => PriorityClass::RealTime,
            other => PriorityClass::Other(other),
        })
    }

    fn main_window(&self) -> Result<Option<Window>, Error> {
        let mut search = WindowSearch {
            process_id: self.process_id,
            found: ptr::null_mut(),
        };

        unsafe {
            winuser::EnumWindows(
                Some(find_main_window),
                &mut search as *mut WindowSearch as LPARAM,
            );
        }

        if search.found.is_null() {
            return Ok(None);
        }

        let title = unsafe {
            let mut buf = [0u16; 512];
            let len = winuser::GetWindowTextW(search.found, buf.as_mut_ptr(), buf.len() as i32);
            String::from_utf16_lossy(&buf[..len.max(0) as usize])
        };

        Ok(Some(Window {
            handle: search.found as usize,
            title,
        }))
    }

    fn memory_usage(&self) -> Result<MemoryUsage, Error> {
        let mut counters: psapi::PROCESS_MEMORY_COUNTERS_EX = unsafe { mem::zeroed() };

        checked!(psapi::GetProcessMemoryInfo(
            *self.handle,
            &mut counters as *mut psapi::PROCESS_MEMORY_COUNTERS_EX
                as psapi::PPROCESS_MEMORY_COUNTERS,
            mem::size_of::<psapi::PROCESS_MEMORY_COUNTERS_EX>() as DWORD,
        ))?;

        Ok(MemoryUsage {
            private: counters.PrivateUsage as u64,
            paged: counters.PagefileUsage as u64,
        })
    }

    fn start_time(&self) -> Result<DateTime<Local>, Error> {
        let [creation, ..] = self.times()?;
        let ticks = filetime_ticks(&creation);

        let secs = (ticks / 10_000_000) as i64 - EPOCH_DIFFERENCE;
        let nanos = (ticks % 10_000_000) as u32 * 100;

        Local
            .timestamp_opt(secs, nanos)
            .single()
            .ok_or(Error::InvalidTime)
    }

    fn processor_time(&self) -> Result<Duration, Error> {
        let [_, _, kernel, user] = self.times()?;
        let ticks = filetime_ticks(&kernel) + filetime_ticks(&user);
        Ok(Duration::from_nanos(ticks.saturating_mul(100)))
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Process")
            .field("process_id", &self.process_id)
            .field("width", &self.width)
            .finish()
    }
}

/// Number of 100-nanosecond intervals in a file time.
fn filetime_ticks(time: &FILETIME) -> u64 {
    (u64::from(time.dwHighDateTime) << 32) | u64::from(time.dwLowDateTime)
}

struct WindowSearch {
    process_id: ProcessId,
    found: HWND,
}

/// Pick the first visible, unowned top-level window of the process.
unsafe extern "system" fn find_main_window(hwnd: HWND, param: LPARAM) -> BOOL {
    let search = &mut *(param as *mut WindowSearch);

    let mut process_id: DWORD = 0;
    winuser::GetWindowThreadProcessId(hwnd, &mut process_id);

    if process_id != search.process_id
        || winuser::IsWindowVisible(hwnd) == FALSE
        || !winuser::GetWindow(hwnd, winuser::GW_OWNER).is_null()
    {
        return TRUE;
    }

    search.found = hwnd;
    FALSE
}

/// Builder to open a process.
#[derive(Default)]
pub struct OpenProcessBuilder {
    desired_access: DWORD,
}

impl OpenProcessBuilder {
    /// Set the query information flag.
    pub fn query_information(self) -> Self {
        OpenProcessBuilder {
            desired_access: self.desired_access | winnt::PROCESS_QUERY_INFORMATION,
        }
    }

    /// Set the VM Read flag.
    pub fn vm_read(self) -> Self {
        OpenProcessBuilder {
            desired_access: self.desired_access | winnt::PROCESS_VM_READ,
        }
    }

    /// Set the VM Write flag.
    pub fn vm_write(self) -> Self {
        OpenProcessBuilder {
            desired_access: self.desired_access | winnt::PROCESS_VM_WRITE,
        }
    }

    /// Set the VM Operation flag, required by writes.
    pub fn vm_operation(self) -> Self {
        OpenProcessBuilder {
            desired_access: self.desired_access | winnt::PROCESS_VM_OPERATION,
        }
    }

    /// Build the process handle.
    pub fn build(self, process_id: ProcessId) -> Result<Process, Error> {
        let handle =
            unsafe { processthreadsapi::OpenProcess(self.desired_access, FALSE, process_id) };

        if handle.is_null() {
            let e = std::io::Error::last_os_error();

            return Err(match e.raw_os_error().map(|n| n as u32) {
                Some(winerror::ERROR_INVALID_PARAMETER) => {
                    Error::ProcessNotFound(process_id.to_string())
                }
                _ => Error::OpenProcess(process_id, e),
            });
        }

        let mut process = Process {
            process_id,
            handle: utils::Handle::new(handle),
            width: PointerWidth::default(),
        };

        process.width = process.detect_pointer_width()?;
        log::debug!("opened process {} with {:?} pointers", process_id, process.width);
        Ok(process)
    }
}
