//! Python literal parsing for fixture files
//!
//! Fixture inputs and outputs are frequently stored as Python source
//! literals (`"[(1, 2), (3, 4)]"`). This module parses the literal subset
//! fixtures use: `None`, booleans, integers, floats, strings (with
//! prefixes, escapes and implicit concatenation), lists, tuples, sets and
//! dicts. Tuples stay distinguishable so a tuple input can be unpacked
//! into positional arguments.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Error produced when a literal cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid literal at offset {offset}: {message}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

/// A parsed Python literal.
#[derive(Debug, Clone, PartialEq)]
pub enum PyLiteral {
    None,
    Bool(bool),
    Int(i64),
    /// Integer outside the 64-bit range, as decimal digits with optional sign.
    BigInt(String),
    Float(f64),
    Str(String),
    List(Vec<PyLiteral>),
    Tuple(Vec<PyLiteral>),
    Set(Vec<PyLiteral>),
    Dict(Vec<(PyLiteral, PyLiteral)>),
}

impl PyLiteral {
    /// JSON view; tuples and sets become arrays, non-string dict keys are
    /// rendered to strings. Set elements are ordered by their compact JSON
    /// text so the view does not depend on how the literal was written.
    pub fn into_json(self) -> Value {
        match self {
            PyLiteral::None => Value::Null,
            PyLiteral::Bool(b) => Value::Bool(b),
            PyLiteral::Int(i) => Value::Number(i.into()),
            PyLiteral::BigInt(digits) => digits
                .parse::<Number>()
                .map(Value::Number)
                .unwrap_or(Value::Null),
            PyLiteral::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            PyLiteral::Str(s) => Value::String(s),
            PyLiteral::List(items) | PyLiteral::Tuple(items) => {
                Value::Array(items.into_iter().map(PyLiteral::into_json).collect())
            }
            PyLiteral::Set(items) => {
                let mut values: Vec<Value> = items.into_iter().map(PyLiteral::into_json).collect();
                values.sort_by_cached_key(|v| v.to_string());
                Value::Array(values)
            }
            PyLiteral::Dict(pairs) => {
                let mut map = Map::new();
                for (k, v) in pairs {
                    let key = match k.into_json() {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    map.insert(key, v.into_json());
                }
                Value::Object(map)
            }
        }
    }
}

/// Parse a complete Python literal expression.
///
/// A bare comma-separated sequence at the top level (`1, 2`) is a tuple,
/// matching the interpreter's own rules.
pub fn parse_literal(src: &str) -> Result<PyLiteral, LiteralError> {
    let mut parser = Parser {
        chars: src.chars().collect(),
        pos: 0,
    };
    let value = parser.parse_sequence_or_value()?;
    parser.skip_ws();
    if parser.pos != parser.chars.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if c == '\\' && self.peek_at(1) == Some('\n') {
                self.pos += 2;
            } else {
                break;
            }
        }
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), LiteralError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{c}'")))
        }
    }

    fn parse_sequence_or_value(&mut self) -> Result<PyLiteral, LiteralError> {
        let first = self.parse_value()?;
        if !self.eat(',') {
            return Ok(first);
        }
        let mut items = vec![first];
        loop {
            self.skip_ws();
            if self.peek().is_none() {
                break;
            }
            items.push(self.parse_value()?);
            if !self.eat(',') {
                break;
            }
        }
        Ok(PyLiteral::Tuple(items))
    }

    fn parse_value(&mut self) -> Result<PyLiteral, LiteralError> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('[') => {
                self.pos += 1;
                let items = self.parse_items(']')?;
                Ok(PyLiteral::List(items.0))
            }
            Some('(') => {
                self.pos += 1;
                let (items, trailing_comma) = self.parse_items(')')?;
                if items.len() == 1 && !trailing_comma {
                    Ok(items.into_iter().next().unwrap_or(PyLiteral::None))
                } else {
                    Ok(PyLiteral::Tuple(items))
                }
            }
            Some('{') => {
                self.pos += 1;
                self.parse_brace()
            }
            Some('-') | Some('+') => {
                let negative = self.peek() == Some('-');
                self.pos += 1;
                match self.parse_value()? {
                    PyLiteral::Int(i) if negative => Ok(PyLiteral::Int(-i)),
                    PyLiteral::BigInt(digits) if negative => Ok(PyLiteral::BigInt(format!("-{digits}"))),
                    PyLiteral::Float(f) if negative => Ok(PyLiteral::Float(-f)),
                    v @ (PyLiteral::Int(_) | PyLiteral::BigInt(_) | PyLiteral::Float(_)) => Ok(v),
                    _ => Err(self.error("unary sign applied to a non-number")),
                }
            }
            Some(c) if c.is_ascii_digit() || (c == '.' && self.next_is_digit()) => {
                self.parse_number()
            }
            Some(c) if c == '\'' || c == '"' || self.at_string_prefix() => self.parse_strings(),
            Some(c) if c.is_alphabetic() || c == '_' => self.parse_name(),
            Some(c) => Err(self.error(format!("unexpected character '{c}'"))),
        }
    }

    fn next_is_digit(&self) -> bool {
        self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
    }

    /// Comma-separated values up to `close`. Returns whether the list
    /// ended with a trailing comma.
    fn parse_items(&mut self, close: char) -> Result<(Vec<PyLiteral>, bool), LiteralError> {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            if self.eat(close) {
                return Ok((items, trailing_comma));
            }
            items.push(self.parse_value()?);
            trailing_comma = self.eat(',');
            if !trailing_comma {
                self.expect(close)?;
                return Ok((items, false));
            }
        }
    }

    fn parse_brace(&mut self) -> Result<PyLiteral, LiteralError> {
        if self.eat('}') {
            return Ok(PyLiteral::Dict(Vec::new()));
        }
        let first = self.parse_value()?;
        if self.eat(':') {
            let mut pairs = vec![(first, self.parse_value()?)];
            while self.eat(',') {
                if self.eat('}') {
                    return Ok(PyLiteral::Dict(pairs));
                }
                let key = self.parse_value()?;
                self.expect(':')?;
                pairs.push((key, self.parse_value()?));
            }
            self.expect('}')?;
            Ok(PyLiteral::Dict(pairs))
        } else {
            let mut items = vec![first];
            while self.eat(',') {
                if self.eat('}') {
                    return Ok(PyLiteral::Set(items));
                }
                items.push(self.parse_value()?);
            }
            self.expect('}')?;
            Ok(PyLiteral::Set(items))
        }
    }

    fn parse_name(&mut self) -> Result<PyLiteral, LiteralError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        match name.as_str() {
            "None" => Ok(PyLiteral::None),
            "True" => Ok(PyLiteral::Bool(true)),
            "False" => Ok(PyLiteral::Bool(false)),
            _ => {
                self.pos = start;
                Err(self.error(format!("'{name}' is not a literal")))
            }
        }
    }

    fn parse_number(&mut self) -> Result<PyLiteral, LiteralError> {
        let start = self.pos;
        if self.peek() == Some('0') {
            let radix = match self.peek_at(1) {
                Some('x') | Some('X') => Some(16),
                Some('o') | Some('O') => Some(8),
                Some('b') | Some('B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.pos += 2;
                let digits_start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| c.is_digit(radix) || c == '_')
                {
                    self.pos += 1;
                }
                let digits: String = self.chars[digits_start..self.pos]
                    .iter()
                    .filter(|c| **c != '_')
                    .collect();
                return match i64::from_str_radix(&digits, radix) {
                    Ok(i) => Ok(PyLiteral::Int(i)),
                    Err(e) => to_decimal(&digits, radix)
                        .map(PyLiteral::BigInt)
                        .ok_or_else(|| self.error(e.to_string())),
                };
            }
        }

        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => self.pos += 1,
                '.' if !is_float => {
                    is_float = true;
                    self.pos += 1;
                }
                'e' | 'E' => {
                    is_float = true;
                    self.pos += 1;
                    if matches!(self.peek(), Some('+') | Some('-')) {
                        self.pos += 1;
                    }
                }
                'j' | 'J' => return Err(self.error("complex literals are not supported")),
                _ => break,
            }
        }
        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        if !is_float {
            return match text.parse::<i64>() {
                Ok(i) => Ok(PyLiteral::Int(i)),
                Err(_) => to_decimal(&text, 10)
                    .map(PyLiteral::BigInt)
                    .ok_or_else(|| self.error(format!("bad number '{text}'"))),
            };
        }
        text.parse::<f64>()
            .map(PyLiteral::Float)
            .map_err(|e| self.error(format!("bad number '{text}': {e}")))
    }

    fn at_string_prefix(&self) -> bool {
        let mut n = 0;
        while let Some(c) = self.peek_at(n) {
            if matches!(c.to_ascii_lowercase(), 'r' | 'b' | 'u') && n < 2 {
                n += 1;
            } else {
                return n > 0 && (c == '\'' || c == '"');
            }
        }
        false
    }

    /// One or more adjacent string literals, concatenated.
    fn parse_strings(&mut self) -> Result<PyLiteral, LiteralError> {
        let mut out = self.parse_string()?;
        loop {
            let save = self.pos;
            self.skip_ws();
            if matches!(self.peek(), Some('\'') | Some('"')) || self.at_string_prefix() {
                out.push_str(&self.parse_string()?);
            } else {
                self.pos = save;
                return Ok(PyLiteral::Str(out));
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, LiteralError> {
        let mut raw = false;
        while let Some(c) = self.peek() {
            match c.to_ascii_lowercase() {
                'r' => raw = true,
                'b' | 'u' => {}
                _ => break,
            }
            self.pos += 1;
        }
        let quote = self.peek().ok_or_else(|| self.error("expected string"))?;
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        let mut out = String::new();
        loop {
            let c = self
                .peek()
                .ok_or_else(|| self.error("unterminated string"))?;
            if c == quote {
                if !triple {
                    self.pos += 1;
                    return Ok(out);
                }
                if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                    self.pos += 3;
                    return Ok(out);
                }
            }
            if c == '\n' && !triple {
                return Err(self.error("newline in single-quoted string"));
            }
            self.pos += 1;
            if c != '\\' {
                out.push(c);
                continue;
            }
            let esc = self
                .peek()
                .ok_or_else(|| self.error("unterminated escape"))?;
            self.pos += 1;
            if raw {
                out.push('\\');
                out.push(esc);
                continue;
            }
            match esc {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '0' => out.push('\0'),
                'a' => out.push('\u{7}'),
                'b' => out.push('\u{8}'),
                'f' => out.push('\u{c}'),
                'v' => out.push('\u{b}'),
                '\\' | '\'' | '"' => out.push(esc),
                '\n' => {}
                'x' => out.push(self.parse_hex_escape(2)?),
                'u' => out.push(self.parse_hex_escape(4)?),
                'U' => out.push(self.parse_hex_escape(8)?),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            }
        }
    }

    fn parse_hex_escape(&mut self, width: usize) -> Result<char, LiteralError> {
        if self.pos + width > self.chars.len() {
            return Err(self.error("truncated escape"));
        }
        let hex: String = self.chars[self.pos..self.pos + width].iter().collect();
        let code = u32::from_str_radix(&hex, 16).map_err(|e| self.error(e.to_string()))?;
        self.pos += width;
        char::from_u32(code).ok_or_else(|| self.error(format!("invalid code point {code:#x}")))
    }
}

/// Decimal digits of the unsigned integer `digits` written in `radix`.
/// `None` for an empty or invalid digit string.
fn to_decimal(digits: &str, radix: u32) -> Option<String> {
    const BASE: u64 = 1_000_000_000;
    if digits.is_empty() {
        return None;
    }
    // Little-endian limbs in base 10^9.
    let mut limbs: Vec<u64> = vec![0];
    for c in digits.chars() {
        let mut carry = u64::from(c.to_digit(radix)?);
        for limb in limbs.iter_mut() {
            let v = *limb * u64::from(radix) + carry;
            *limb = v % BASE;
            carry = v / BASE;
        }
        while carry > 0 {
            limbs.push(carry % BASE);
            carry /= BASE;
        }
    }
    let mut out = limbs.last()?.to_string();
    for limb in limbs.iter().rev().skip(1) {
        out.push_str(&format!("{limb:09}"));
    }
    Some(out)
}
