use std::{ffi::OsString, ops};

use crate::error::Error;

use winapi::{
    shared::minwindef::{BOOL, DWORD, LPDWORD, TRUE},
    um::winnt,
};

/// Evaluate the checked expression.
macro_rules! checked {
    ($expr:expr) => {
        match unsafe { $expr } {
            winapi::shared::minwindef::FALSE => Err($crate::error::Error::last_system_error()),
            _ => Ok(()),
        }
    };
}

/// Call a function that fills a wide string buffer and returns its length.
pub fn string(cb: impl Fn(winnt::LPWSTR, DWORD) -> DWORD) -> Result<OsString, Error> {
    use std::os::windows::ffi::OsStringExt;

    let mut buf: [winnt::WCHAR; 1024] = [0u16; 1024];

    let out = cb(buf.as_mut_ptr(), buf.len() as DWORD);

    if out == 0 {
        return Err(Error::last_system_error());
    }

    Ok(OsString::from_wide(&buf[..(out as usize)]))
}

/// Call a function that returns an array, growing the buffer until it fits.
///
/// The callback receives the buffer, its size in bytes, and where to store
/// the number of bytes needed. `T` must be valid when zeroed.
pub fn array<T>(
    initial: usize,
    cb: impl Fn(*mut T, DWORD, LPDWORD) -> BOOL,
) -> Result<Vec<T>, Error>
where
    T: Copy,
{
    use std::mem;

    let mut len = initial;

    loop {
        let mut buf: Vec<T> = vec![unsafe { mem::zeroed() }; len];
        let size = (buf.len() * mem::size_of::<T>()) as DWORD;
        let mut needed: DWORD = 0;

        if cb(buf.as_mut_ptr(), size, &mut needed as LPDWORD) != TRUE {
            return Err(Error::last_system_error());
        }

        if needed >= size {
            len = usize::max(len * 2, needed as usize / mem::size_of::<T>() + 1);
            continue;
        }

        buf.truncate(needed as usize / mem::size_of::<T>());
        return Ok(buf);
    }
}

/// Wrapper for handle that takes care of drop.
pub struct Handle(winnt::HANDLE);

impl Handle {
    pub fn new(handle: winnt::HANDLE) -> Self {
        Handle(handle)
    }
}

impl ops::Deref for Handle {
    type Target = winnt::HANDLE;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        use winapi::um::handleapi;

        if unsafe { handleapi::CloseHandle(self.0) } != TRUE {
            log::warn!(
                "failed to close handle: {}",
                std::io::Error::last_os_error()
            );
        }
    }
}

unsafe impl Sync for Handle {}
unsafe impl Send for Handle {}
