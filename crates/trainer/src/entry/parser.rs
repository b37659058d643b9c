use crate::{Address, Entry, EntryValue, RefId, Type};
use std::borrow::Cow;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{}", description)]
pub struct ParseError {
    /// Description of the error.
    description: Cow<'static, str>,
    /// Offset into the expression which caused the error.
    pos: usize,
}

impl ParseError {
    /// Description of the error.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Byte offset into the expression where the error was detected.
    pub fn pos(&self) -> usize {
        self.pos
    }
}

/// Parser for a single address expression, like `+##S:402F=R1`.
#[derive(Debug)]
pub struct Parser<'a> {
    /// The raw input.
    input: &'a str,
    /// Current position in the input.
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Construct a new parser for the given string.
    pub fn new(input: &'a str) -> Parser<'a> {
        Parser { input, pos: 0 }
    }

    /// The remaining, unconsumed input.
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Peek a single character.
    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Advance the parser `n` bytes.
    fn step_n(&mut self, n: usize) {
        self.pos = usize::min(self.pos + n, self.input.len());
    }

    /// Consume every leading occurrence of `c` and return how many there were.
    fn eat_while(&mut self, c: char) -> usize {
        let mut count = 0;

        while self.peek() == Some(c) {
            self.step_n(c.len_utf8());
            count += 1;
        }

        count
    }

    /// Format an error with a correct description and position.
    fn err(&self, description: impl Into<Cow<'static, str>>) -> ParseError {
        self.err_at(self.pos, description)
    }

    fn err_at(&self, pos: usize, description: impl Into<Cow<'static, str>>) -> ParseError {
        ParseError {
            description: description.into(),
            pos,
        }
    }

    /// Parse the whole input into an entry.
    pub fn parse(mut self) -> Result<Entry, ParseError> {
        log::debug!("processing address argument: {}", self.input);

        let is_offset = match self.eat_while('+') {
            0 => false,
            1 => true,
            _ => return Err(self.err("offset marker `+` specified more than once")),
        };

        if is_offset {
            log::debug!("address is a base address offset");
        }

        let pointer_levels = self.eat_while('#');

        if pointer_levels > 0 {
            log::debug!("address is a pointer with {} levels", pointer_levels);
        }

        let ty = self.scan_type()?;

        let (address, value) = match self.rest().find('=') {
            Some(index) => {
                let rest = self.rest();
                let value_pos = self.pos + index + 1;
                let value = self.scan_value(value_pos, &rest[index + 1..])?;
                (&rest[..index], Some(value))
            }
            None => {
                log::debug!("address is only monitored");
                (self.rest(), None)
            }
        };

        let address = address
            .parse::<Address>()
            .map_err(|_| self.err(format!("invalid address `{}`", address)))?;

        Ok(Entry {
            is_offset,
            pointer_levels,
            ty,
            address,
            value,
        })
    }

    /// Scan an optional `X:` type prefix.
    fn scan_type(&mut self) -> Result<Type, ParseError> {
        if self.rest().find(':') != Some(1) {
            return Ok(Type::default());
        }

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Type::default()),
        };

        let ty = Type::from_letter(c)
            .ok_or_else(|| self.err(format!("invalid value type `{}`", c)))?;
        log::debug!("address has type specifier: {}", ty);
        self.step_n(2);
        Ok(ty)
    }

    /// Scan the value expression after `=`.
    fn scan_value(&self, pos: usize, expr: &str) -> Result<EntryValue, ParseError> {
        log::debug!("address is written to with: {}", expr);

        // any number of leading `-` negate a literal once, and are ignored
        // for references.
        let negative = expr.starts_with('-');
        let expr = expr.trim_start_matches('-');

        if let Some(value) = parse_number(expr, negative) {
            return Ok(EntryValue::Literal(value));
        }

        let id = match expr.strip_prefix(|c: char| c == 'R' || c == 'r') {
            Some(id) => id,
            None => return Err(self.err_at(pos, format!("invalid value `{}`", expr))),
        };

        let id = if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
            id.parse::<usize>().ok().and_then(RefId::new)
        } else {
            None
        };

        match id {
            Some(id) => Ok(EntryValue::Reference(id)),
            None => Err(self.err_at(pos, format!("invalid reference `{}`", expr))),
        }
    }
}

/// Parse an unsigned decimal or `0x`-prefixed hex number, negating it if
/// requested.
///
/// Hex numbers are reinterpreted as 64-bit two's complement, so
/// `0xFFFFFFFFFFFFFFFF` is `-1`.
fn parse_number(s: &str, negative: bool) -> Option<i64> {
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => {
            if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return None;
            }

            u64::from_str_radix(hex, 16).ok()? as i64
        }
        None => {
            if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }

            let value = s.parse::<u64>().ok()?;

            // NB: `i64::MIN` only has a magnitude when negated.
            match (negative, value) {
                (true, v) if v == 1 << 63 => return Some(i64::min_value()),
                (_, v) if v > i64::max_value() as u64 => return None,
                (_, v) => v as i64,
            }
        }
    };

    Some(if negative { value.wrapping_neg() } else { value })
}
