//! A closed grammar for dict-style literals.
//!
//! Tool implementations written against dynamic runtimes sometimes return the
//! printed form of their result mapping instead of JSON, e.g.
//! `{'success': True, 'images': ('QUJD',), 'error': None}`. This module reads that
//! notation into a [`serde_json::Value`]. It accepts only literals: quoted strings
//! (single, double or triple quoted, with adjacent strings concatenated), numbers,
//! `True`, `False`, `None`, lists, tuples and mappings. There are no names, calls or
//! operators beyond a leading sign on numbers, so nothing is ever evaluated.
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Deepest container nesting accepted before giving up
pub const MAX_DEPTH: usize = 128;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LiteralError {
    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("invalid number literal {0:?}")]
    InvalidNumber(String),

    #[error("invalid escape sequence at offset {0}")]
    InvalidEscape(usize),

    #[error("unhashable mapping key at offset {0}")]
    UnhashableKey(usize),

    #[error("nesting deeper than {} levels", MAX_DEPTH)]
    TooDeep,
}

type LiteralResult<T> = Result<T, LiteralError>;

/// Parse `text` as a single literal, allowing surrounding whitespace
pub fn parse_literal(text: &str) -> LiteralResult<Value> {
    let mut parser = Parser::new(text);
    let value = parser.value()?;
    parser.skip_whitespace();
    match parser.peek() {
        None => Ok(value),
        Some(found) => Err(LiteralError::UnexpectedChar {
            found,
            offset: parser.pos,
        }),
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn next(&mut self) -> LiteralResult<char> {
        let c = self.peek().ok_or(LiteralError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(c)
    }

    fn unexpected(&self) -> LiteralError {
        match self.peek() {
            Some(found) => LiteralError::UnexpectedChar {
                found,
                offset: self.pos,
            },
            None => LiteralError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, expected: char) -> LiteralResult<()> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if c == '\\' && self.peek_at(1) == Some('\n') {
                // explicit line joining
                self.pos += 2;
            } else {
                break;
            }
        }
    }

    fn value(&mut self) -> LiteralResult<Value> {
        self.skip_whitespace();
        match self.peek() {
            Some('{') => self.nested(Self::mapping),
            Some('[') => self.nested(|p| p.sequence('[', ']')),
            Some('(') => self.nested(Self::parenthesized),
            Some('\'') | Some('"') => self.strings().map(Value::String),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.keyword(),
            _ => Err(self.unexpected()),
        }
    }

    fn nested<F>(&mut self, parse: F) -> LiteralResult<Value>
    where
        F: FnOnce(&mut Self) -> LiteralResult<Value>,
    {
        if self.depth >= MAX_DEPTH {
            return Err(LiteralError::TooDeep);
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn keyword(&mut self) -> LiteralResult<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            _ => Err(LiteralError::UnexpectedChar {
                found: self.chars[start],
                offset: start,
            }),
        }
    }

    /// Items separated by commas, with an optional trailing comma
    fn items(&mut self, close: char) -> LiteralResult<(Vec<Value>, bool)> {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok((items, trailing_comma));
            }
            items.push(self.value()?);
            self.skip_whitespace();
            match self.next()? {
                ',' => trailing_comma = true,
                c if c == close => return Ok((items, false)),
                found => {
                    return Err(LiteralError::UnexpectedChar {
                        found,
                        offset: self.pos - 1,
                    })
                }
            }
        }
    }

    fn sequence(&mut self, open: char, close: char) -> LiteralResult<Value> {
        self.expect(open)?;
        let (items, _) = self.items(close)?;
        Ok(Value::Array(items))
    }

    /// A tuple, or a single parenthesized value when there is no comma
    fn parenthesized(&mut self) -> LiteralResult<Value> {
        self.expect('(')?;
        let (mut items, trailing_comma) = self.items(')')?;
        if items.len() == 1 && !trailing_comma {
            Ok(items.remove(0))
        } else {
            Ok(Value::Array(items))
        }
    }

    fn mapping(&mut self) -> LiteralResult<Value> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key_offset = self.pos;
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => "null".to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(LiteralError::UnhashableKey(key_offset))
                }
            };
            self.skip_whitespace();
            self.expect(':')?;
            let value = self.value()?;
            map.insert(key, value);
            self.skip_whitespace();
            match self.next()? {
                ',' => continue,
                '}' => return Ok(Value::Object(map)),
                found => {
                    return Err(LiteralError::UnexpectedChar {
                        found,
                        offset: self.pos - 1,
                    })
                }
            }
        }
    }

    /// One or more adjacent string literals, concatenated
    fn strings(&mut self) -> LiteralResult<String> {
        let mut out = self.string()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('\'') | Some('"') => out.push_str(&self.string()?),
                _ => return Ok(out),
            }
        }
    }

    fn string(&mut self) -> LiteralResult<String> {
        let quote = self.next()?;
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut out = String::new();
        loop {
            let c = self.next()?;
            if c == quote {
                if !triple {
                    return Ok(out);
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.pos += 2;
                    return Ok(out);
                }
                out.push(c);
            } else if c == '\\' {
                self.escape(&mut out)?;
            } else if c == '\n' && !triple {
                return Err(LiteralError::UnexpectedChar {
                    found: c,
                    offset: self.pos - 1,
                });
            } else {
                out.push(c);
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> LiteralResult<()> {
        let offset = self.pos - 1;
        match self.next()? {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            'x' => out.push(self.hex_char(2, offset)?),
            'u' => out.push(self.hex_char(4, offset)?),
            'U' => out.push(self.hex_char(8, offset)?),
            other => {
                // unknown escapes are kept verbatim
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_char(&mut self, digits: usize, offset: usize) -> LiteralResult<char> {
        let mut code: u32 = 0;
        for _ in 0..digits {
            let digit = self
                .next()?
                .to_digit(16)
                .ok_or(LiteralError::InvalidEscape(offset))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or(LiteralError::InvalidEscape(offset))
    }

    fn number(&mut self) -> LiteralResult<Value> {
        let start = self.pos;
        let mut negative = false;
        while let Some(sign @ ('-' | '+')) = self.peek() {
            if sign == '-' {
                negative = !negative;
            }
            self.pos += 1;
            self.skip_whitespace();
        }

        let body_start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_'))
            || (matches!(self.peek(), Some('-' | '+'))
                && matches!(self.chars.get(self.pos.wrapping_sub(1)), Some('e' | 'E'))
                && !self.is_hex_body(body_start))
        {
            self.pos += 1;
        }
        let body: String = self.chars[body_start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        let literal: String = self.chars[start..self.pos].iter().collect();
        let invalid = || LiteralError::InvalidNumber(literal.clone());

        if body.is_empty() {
            return Err(invalid());
        }

        let radix = match body.get(..2) {
            Some("0x") | Some("0X") => Some(16),
            Some("0o") | Some("0O") => Some(8),
            Some("0b") | Some("0B") => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            let magnitude = u64::from_str_radix(&body[2..], radix).map_err(|_| invalid())?;
            return integer(magnitude, negative).ok_or_else(invalid);
        }

        if body.chars().all(|c| c.is_ascii_digit()) {
            if let Some(value) = body.parse::<u64>().ok().and_then(|m| integer(m, negative)) {
                return Ok(value);
            }
        }

        if !body.starts_with(|c: char| c.is_ascii_digit() || c == '.')
            || body.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
        {
            return Err(invalid());
        }
        let magnitude: f64 = body.parse().map_err(|_| invalid())?;
        let signed = if negative { -magnitude } else { magnitude };
        Number::from_f64(signed)
            .filter(|_| signed.is_finite())
            .map(Value::Number)
            .ok_or_else(invalid)
    }

    fn is_hex_body(&self, body_start: usize) -> bool {
        matches!(
            (self.chars.get(body_start), self.chars.get(body_start + 1)),
            (Some('0'), Some('x' | 'X'))
        )
    }
}

/// A signed integer from its magnitude, when it fits in `i64` (or `u64` if positive)
fn integer(magnitude: u64, negative: bool) -> Option<Value> {
    if !negative {
        return Some(Value::Number(Number::from(magnitude)));
    }
    let signed = i64::try_from(-i128::from(magnitude)).ok()?;
    Some(Value::Number(Number::from(signed)))
}
