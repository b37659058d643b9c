//! The capability to access the memory of another process.

use crate::{error::Error, Address, Type};
use byteorder::{ByteOrder as _, LittleEndian};

/// The width of a pointer in the target process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerWidth {
    /// A 32-bit process, including 32-bit processes running under WOW64.
    Four,
    /// A native 64-bit process.
    Eight,
}

impl PointerWidth {
    /// The size of a pointer in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
        }
    }

    /// Truncate an address so that it fits a pointer of this width.
    pub fn truncate(self, address: Address) -> Address {
        match self {
            Self::Four => Address::new(address.as_u64() & u64::from(u32::max_value())),
            Self::Eight => address,
        }
    }

    /// Add two addresses, wrapping around at the pointer width.
    pub fn wrapping_add(self, a: Address, b: Address) -> Address {
        self.truncate(a.wrapping_add(b))
    }

    /// Decode a pointer from a buffer of exactly `size()` bytes.
    pub fn decode(self, buf: &[u8]) -> Address {
        match self {
            Self::Four => Address::from(LittleEndian::read_u32(buf)),
            Self::Eight => Address::from(LittleEndian::read_u64(buf)),
        }
    }
}

impl Default for PointerWidth {
    fn default() -> Self {
        Self::Four
    }
}

/// Read and write access to the memory of a process.
///
/// Every operation might fail, since the process can go away at any point in
/// time. Failures are always reported as errors, and never as zeroed values.
pub trait ProcessMemory {
    /// Fill the buffer with memory read from the given address.
    fn read_memory(&self, address: Address, buf: &mut [u8]) -> Result<(), Error>;

    /// Write the buffer to the given address.
    fn write_memory(&self, address: Address, buf: &[u8]) -> Result<(), Error>;

    /// The address that the main module of the process is loaded at.
    fn main_module_base(&self) -> Result<Address, Error>;

    /// The width of pointers in the process.
    fn pointer_width(&self) -> PointerWidth;

    /// Test if the process is still running.
    fn is_alive(&self) -> bool;

    /// Read a pointer from the given address.
    fn read_pointer(&self, address: Address) -> Result<Address, Error> {
        let width = self.pointer_width();
        let mut buf = [0u8; 8];
        let buf = &mut buf[..width.size()];
        self.read_memory(address, buf)?;
        Ok(width.decode(buf))
    }

    /// Read a value of the given type.
    fn read_value(&self, ty: Type, address: Address) -> Result<i64, Error> {
        let mut buf = [0u8; 8];
        let buf = &mut buf[..ty.size()];
        self.read_memory(address, buf)?;
        Ok(ty.decode(buf))
    }

    /// Write a value of the given type, truncating it if it doesn't fit.
    fn write_value(&self, ty: Type, address: Address, value: i64) -> Result<(), Error> {
        let mut buf = [0u8; 8];
        let buf = &mut buf[..ty.size()];
        ty.encode(buf, value);
        self.write_memory(address, buf)
    }
}

impl<P> ProcessMemory for &P
where
    P: ?Sized + ProcessMemory,
{
    fn read_memory(&self, address: Address, buf: &mut [u8]) -> Result<(), Error> {
        (**self).read_memory(address, buf)
    }

    fn write_memory(&self, address: Address, buf: &[u8]) -> Result<(), Error> {
        (**self).write_memory(address, buf)
    }

    fn main_module_base(&self) -> Result<Address, Error> {
        (**self).main_module_base()
    }

    fn pointer_width(&self) -> PointerWidth {
        (**self).pointer_width()
    }

    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{PointerWidth, ProcessMemory};
    use crate::{error::Error, Address, Type};
    use hashbrown::HashMap;
    use std::cell::{Cell, RefCell};

    /// Process memory backed by a sparse map of bytes.
    ///
    /// Reading or writing a byte which hasn't been mapped fails, like an
    /// access to an unmapped page would.
    pub(crate) struct FakeMemory {
        bytes: RefCell<HashMap<u64, u8>>,
        base: Option<Address>,
        width: PointerWidth,
        alive_checks: Cell<Option<usize>>,
        pub(crate) writes: RefCell<Vec<(Address, Vec<u8>)>>,
    }

    impl FakeMemory {
        pub(crate) fn new(width: PointerWidth) -> Self {
            Self {
                bytes: RefCell::new(HashMap::new()),
                base: None,
                width,
                alive_checks: Cell::new(None),
                writes: RefCell::new(Vec::new()),
            }
        }

        /// Set the base address of the main module.
        pub(crate) fn with_base(self, base: u64) -> Self {
            Self {
                base: Some(Address::new(base)),
                ..self
            }
        }

        /// Report the process as exited after `n` liveness checks.
        pub(crate) fn exit_after(&self, n: usize) {
            self.alive_checks.set(Some(n));
        }

        /// Map a zeroed region of memory.
        pub(crate) fn map(&self, address: u64, len: usize) {
            let mut bytes = self.bytes.borrow_mut();

            for n in 0..len as u64 {
                bytes.insert(address + n, 0);
            }
        }

        /// Map and store a value of the given type.
        pub(crate) fn poke(&self, ty: Type, address: u64, value: i64) {
            let mut buf = vec![0u8; ty.size()];
            ty.encode(&mut buf, value);
            self.store(address, &buf);
        }

        /// Map and store a pointer.
        pub(crate) fn poke_pointer(&self, address: u64, pointer: u64) {
            let ty = match self.width {
                PointerWidth::Four => Type::I32,
                PointerWidth::Eight => Type::I64,
            };

            self.poke(ty, address, pointer as i64);
        }

        /// Read a value without going through the trait.
        pub(crate) fn peek(&self, ty: Type, address: u64) -> Option<i64> {
            let bytes = self.bytes.borrow();
            let mut buf = vec![0u8; ty.size()];

            for (n, b) in buf.iter_mut().enumerate() {
                *b = *bytes.get(&(address + n as u64))?;
            }

            Some(ty.decode(&buf))
        }

        fn store(&self, address: u64, buf: &[u8]) {
            let mut bytes = self.bytes.borrow_mut();

            for (n, b) in buf.iter().enumerate() {
                bytes.insert(address + n as u64, *b);
            }
        }
    }

    impl ProcessMemory for FakeMemory {
        fn read_memory(&self, address: Address, buf: &mut [u8]) -> Result<(), Error> {
            let bytes = self.bytes.borrow();

            for (n, b) in buf.iter_mut().enumerate() {
                *b = match bytes.get(&(address.as_u64() + n as u64)) {
                    Some(b) => *b,
                    None => return Err(Error::ReadUnderflow(address)),
                };
            }

            Ok(())
        }

        fn write_memory(&self, address: Address, buf: &[u8]) -> Result<(), Error> {
            {
                let bytes = self.bytes.borrow();

                for n in 0..buf.len() as u64 {
                    if !bytes.contains_key(&(address.as_u64() + n)) {
                        return Err(Error::WriteUnderflow(address));
                    }
                }
            }

            self.store(address.as_u64(), buf);
            self.writes.borrow_mut().push((address, buf.to_vec()));
            Ok(())
        }

        fn main_module_base(&self) -> Result<Address, Error> {
            self.base.ok_or(Error::MissingMainModule)
        }

        fn pointer_width(&self) -> PointerWidth {
            self.width
        }

        fn is_alive(&self) -> bool {
            match self.alive_checks.get() {
                Some(0) => false,
                Some(n) => {
                    self.alive_checks.set(Some(n - 1));
                    true
                }
                None => true,
            }
        }
    }

    #[test]
    fn typed_access() -> Result<(), Error> {
        let memory = FakeMemory::new(PointerWidth::Four);
        memory.map(0x1000, 8);

        memory.write_value(Type::I16, Address::new(0x1000), 70000)?;
        assert_eq!(70000 - 65536, memory.read_value(Type::I16, Address::new(0x1000))?);

        memory.write_value(Type::U8, Address::new(0x1004), -2)?;
        assert_eq!(254, memory.read_value(Type::U8, Address::new(0x1004))?);
        Ok(())
    }

    #[test]
    fn unmapped_access_fails() {
        let memory = FakeMemory::new(PointerWidth::Four);
        memory.map(0x1000, 2);

        assert!(memory.read_value(Type::I32, Address::new(0x1000)).is_err());
        assert!(memory.write_value(Type::I32, Address::new(0x1000), 1).is_err());
        assert!(memory.writes.borrow().is_empty());
    }

    #[test]
    fn pointer_widths() -> Result<(), Error> {
        let narrow = FakeMemory::new(PointerWidth::Four);
        narrow.poke_pointer(0x10, 0xDEAD_BEEF);
        assert_eq!(Address::new(0xDEAD_BEEF), narrow.read_pointer(Address::new(0x10))?);

        let wide = FakeMemory::new(PointerWidth::Eight);
        wide.poke_pointer(0x10, 0x7FF6_0000_1000);
        assert_eq!(Address::new(0x7FF6_0000_1000), wide.read_pointer(Address::new(0x10))?);

        assert_eq!(
            Address::new(0x10),
            PointerWidth::Four.wrapping_add(Address::new(0xFFFF_FFF0), Address::new(0x20))
        );
        Ok(())
    }
}
