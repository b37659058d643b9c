//! Abstraction to help deal with virtual addresses.

use crate::error::Error;

use std::{
    convert::{TryFrom, TryInto},
    fmt, str,
};

#[derive(Clone, Default, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct Address(pub(crate) u64);

impl Address {
    /// Construct a new address.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Construct a null pointer.
    pub const fn null() -> Self {
        Self(0)
    }

    /// Access the raw numeric value of the address.
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Add two addresses, wrapping around on overflow.
    pub fn wrapping_add(self, other: Address) -> Self {
        Address(self.0.wrapping_add(other.0))
    }

    /// Try to convert into a native pointer.
    pub fn as_ptr<T>(self) -> Result<*const T, Error> {
        let value = usize::try_from(self.0).map_err(|_| Error::AddressConversion)?;
        Ok(value as *const T)
    }

    /// Try to convert into a native mutable pointer.
    pub fn as_mut_ptr<T>(self) -> Result<*mut T, Error> {
        let value = usize::try_from(self.0).map_err(|_| Error::AddressConversion)?;
        Ok(value as *mut T)
    }
}

/// Parse an address from a plain hexadecimal string.
///
/// Unlike `u64::from_str_radix`, this does not accept a leading sign, and
/// neither does it accept a `0x` prefix.
impl str::FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::AddressFromStr);
        }

        Ok(Address(
            u64::from_str_radix(s, 16).map_err(|_| Error::AddressFromStr)?,
        ))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "0x{:08X}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, fmt)
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, fmt)
    }
}

impl From<u32> for Address {
    fn from(value: u32) -> Self {
        Address(u64::from(value))
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Address(value)
    }
}

impl<T> TryFrom<*mut T> for Address {
    type Error = Error;

    fn try_from(value: *mut T) -> Result<Self, Self::Error> {
        Ok(Address(
            (value as usize)
                .try_into()
                .map_err(|_| Error::AddressConversion)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::Address;
    use crate::error::Error;
    use std::convert::TryFrom as _;

    #[test]
    fn parse_plain_hex() -> Result<(), Error> {
        assert_eq!(Address::new(0x402F), "402F".parse::<Address>()?);
        assert_eq!(Address::new(0x85B3E), "85b3e".parse::<Address>()?);
        assert_eq!(
            Address::new(u64::max_value()),
            "FFFFFFFFFFFFFFFF".parse::<Address>()?
        );
        Ok(())
    }

    #[test]
    fn parse_rejects_prefixes_and_signs() {
        assert!("".parse::<Address>().is_err());
        assert!("0x10".parse::<Address>().is_err());
        assert!("+10".parse::<Address>().is_err());
        assert!("-10".parse::<Address>().is_err());
        assert!("10G".parse::<Address>().is_err());
        assert!("10000000000000000".parse::<Address>().is_err());
    }

    #[test]
    fn converts_module_pointers() -> Result<(), Error> {
        let base = 0x40_0000usize as *mut u8;
        assert_eq!(Address::new(0x40_0000), Address::try_from(base)?);
        assert_eq!(base as *const u8, Address::new(0x40_0000).as_ptr::<u8>()?);
        Ok(())
    }

    #[test]
    fn display_is_padded() {
        assert_eq!("0x0000402F", Address::new(0x402F).to_string());
        assert_eq!("0x1122334455", Address::new(0x11_2233_4455).to_string());
    }
}
