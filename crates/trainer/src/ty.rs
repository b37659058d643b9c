use byteorder::{ByteOrder as _, LittleEndian};
use std::{fmt, mem};

/// The type of a watched value.
///
/// The single byte type is treated as unsigned, every wider type is signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// `B:`, an unsigned byte.
    U8,
    /// `S:`, a signed 16-bit short.
    I16,
    /// `I:`, a signed 32-bit integer.
    I32,
    /// `L:`, a signed 64-bit long.
    I64,
}

impl Type {
    /// Look up a type from the letter used in an address expression.
    pub fn from_letter(c: char) -> Option<Self> {
        Some(match c.to_ascii_uppercase() {
            'B' => Self::U8,
            'S' => Self::I16,
            'I' => Self::I32,
            'L' => Self::I64,
            _ => return None,
        })
    }

    /// The letter used to specify this type in an address expression.
    pub fn letter(self) -> char {
        match self {
            Self::U8 => 'B',
            Self::I16 => 'S',
            Self::I32 => 'I',
            Self::I64 => 'L',
        }
    }

    /// The in-memory size of the type.
    #[inline]
    pub fn size(self) -> usize {
        match self {
            Self::U8 => mem::size_of::<u8>(),
            Self::I16 => mem::size_of::<i16>(),
            Self::I32 => mem::size_of::<i32>(),
            Self::I64 => mem::size_of::<i64>(),
        }
    }

    /// Decode the given buffer into a value.
    ///
    /// The buffer must be exactly `size()` bytes long.
    pub fn decode(self, buf: &[u8]) -> i64 {
        debug_assert_eq!(buf.len(), self.size());

        match self {
            Self::U8 => i64::from(buf[0]),
            Self::I16 => i64::from(LittleEndian::read_i16(buf)),
            Self::I32 => i64::from(LittleEndian::read_i32(buf)),
            Self::I64 => LittleEndian::read_i64(buf),
        }
    }

    /// Encode the value into the given buffer.
    ///
    /// Values which do not fit are truncated to their low-order bits.
    pub fn encode(self, buf: &mut [u8], value: i64) {
        debug_assert_eq!(buf.len(), self.size());

        match self {
            Self::U8 => buf[0] = value as u8,
            Self::I16 => LittleEndian::write_i16(buf, value as i16),
            Self::I32 => LittleEndian::write_i32(buf, value as i32),
            Self::I64 => LittleEndian::write_i64(buf, value),
        }
    }
}

impl Default for Type {
    fn default() -> Self {
        Self::I32
    }
}

impl fmt::Display for Type {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = match *self {
            Type::U8 => "u8",
            Type::I16 => "i16",
            Type::I32 => "i32",
            Type::I64 => "i64",
        };

        fmt::Display::fmt(o, fmt)
    }
}

#[cfg(test)]
mod tests {
    use super::Type;

    fn roundtrip(ty: Type, value: i64) -> i64 {
        let mut buf = vec![0u8; ty.size()];
        ty.encode(&mut buf, value);
        ty.decode(&buf)
    }

    #[test]
    fn letters() {
        assert_eq!(Some(Type::U8), Type::from_letter('b'));
        assert_eq!(Some(Type::I16), Type::from_letter('S'));
        assert_eq!(Some(Type::I32), Type::from_letter('i'));
        assert_eq!(Some(Type::I64), Type::from_letter('L'));
        assert_eq!(None, Type::from_letter('Q'));
        assert_eq!(Type::I32, Type::default());
    }

    #[test]
    fn byte_is_unsigned() {
        assert_eq!(255, roundtrip(Type::U8, -1));
        assert_eq!(0x34, roundtrip(Type::U8, 0x1234));
        assert_eq!(200, Type::U8.decode(&[200]));
    }

    #[test]
    fn short_wraps_around() {
        for &v in &[0i64, 1, -1, 32767, 32768, -32769, 65535, 0x1_2345, 0x7FFF_FFFF_FFFF] {
            let expected = (v + (1 << 15)).rem_euclid(1 << 16) - (1 << 15);
            assert_eq!(expected, roundtrip(Type::I16, v), "value: {}", v);
        }
    }

    #[test]
    fn wider_types_are_sign_extended() {
        assert_eq!(-1, roundtrip(Type::I32, 0xFFFF_FFFF));
        assert_eq!(i64::from(i32::min_value()), roundtrip(Type::I32, 0x8000_0000));
        assert_eq!(i64::min_value(), roundtrip(Type::I64, i64::min_value()));
        assert_eq!(-1000, roundtrip(Type::I64, -1000));
    }

    #[test]
    fn little_endian_layout() {
        let mut buf = [0u8; 4];
        Type::I32.encode(&mut buf, 1000);
        assert_eq!([0xE8, 0x03, 0x00, 0x00], buf);
    }
}
