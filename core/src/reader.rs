//! Single-pass reader for the SWANK s-expression dialect.
//!
//! One mutable cursor over a decoded character buffer. `read()` consumes
//! exactly one top-level datum and leaves trailing whitespace alone, so a
//! caller can pull several data out of the same buffer.
//!
//! Dialect notes, in dispatch order:
//! - `(` or `'(` opens a list; a three-element list whose middle element is
//!   the bare symbol `.` collapses to a cons cell.
//! - `"` opens a string; the content between the quotes is kept verbatim,
//!   a `"` counting as escaped when the character right before it is `\`.
//! - `t` / `nil` (optionally `'`-prefixed) at a word boundary are booleans.
//! - digits (optionally signed, optionally with one `.` fraction) followed
//!   by a delimiter are numbers; `)` and end of input count as delimiters.
//! - anything else runs to whitespace or `)` and becomes a symbol, leading
//!   `'` or `:` included in the lexeme.

use thiserror::Error;

use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("unterminated string literal at position {pos}")]
    UnterminatedString { pos: usize },
    #[error("unterminated list at position {pos}")]
    UnterminatedList { pos: usize },
    #[error("unbalanced close paren at position {pos}")]
    UnbalancedParen { pos: usize },
    #[error("malformed number at position {pos}")]
    BadNumber { pos: usize },
    #[error("unexpected end of input at position {pos}")]
    Eof { pos: usize },
}

impl ReadError {
    /// Character position the reader stopped at, for debug envelopes.
    pub fn position(&self) -> usize {
        match self {
            ReadError::UnterminatedString { pos }
            | ReadError::UnterminatedList { pos }
            | ReadError::UnbalancedParen { pos }
            | ReadError::BadNumber { pos }
            | ReadError::Eof { pos } => *pos,
        }
    }
}

/// Read one datum from `input`.
pub fn read_str(input: &str) -> Result<Value, ReadError> {
    Reader::new(input).read()
}

pub struct Reader {
    chars: Vec<char>,
    pos: usize,
}

impl Reader {
    pub fn new(input: &str) -> Reader {
        Reader {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    /// Current cursor position, in characters.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Consume and return the next datum.
    pub fn read(&mut self) -> Result<Value, ReadError> {
        self.skip_whitespace_and_comments();
        match self.current() {
            None => Err(ReadError::Eof { pos: self.pos }),
            Some('(') => self.read_list(false),
            Some('\'') if self.peek(1) == Some('(') => self.read_list(true),
            Some('"') => self.read_string(),
            Some(')') => Err(ReadError::UnbalancedParen { pos: self.pos }),
            Some(_) => {
                if self.bool_ahead() {
                    Ok(self.read_bool())
                } else if self.number_ahead() {
                    self.read_number()
                } else {
                    Ok(self.read_symbol())
                }
            }
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.current().is_some_and(|c| c.is_whitespace()) {
                self.pos += 1;
            }
            if self.current() == Some(';') {
                while self.current().is_some_and(|c| c != '\n') {
                    self.pos += 1;
                }
            } else {
                return;
            }
        }
    }

    /// Word boundary for booleans: end of input or a non-word character.
    fn word_boundary(&self, offset: usize) -> bool {
        match self.peek(offset) {
            None => true,
            Some(c) => !(c.is_alphanumeric() || c == '_'),
        }
    }

    fn bool_ahead(&self) -> bool {
        let skip = usize::from(self.current() == Some('\''));
        if self.peek(skip) == Some('t') {
            return self.word_boundary(skip + 1);
        }
        if self.peek(skip) == Some('n')
            && self.peek(skip + 1) == Some('i')
            && self.peek(skip + 2) == Some('l')
        {
            return self.word_boundary(skip + 3);
        }
        false
    }

    fn read_bool(&mut self) -> Value {
        if self.current() == Some('\'') {
            self.pos += 1;
        }
        if self.current() == Some('t') {
            self.pos += 1;
            Value::T
        } else {
            self.pos += 3;
            Value::Nil
        }
    }

    /// Number lookahead: optional `-`, digits, optionally `.` and more
    /// digits, then a delimiter that is neither a word character nor `.`.
    fn number_ahead(&self) -> bool {
        let mut offset = usize::from(self.current() == Some('-'));
        if !self.peek(offset).is_some_and(|c| c.is_ascii_digit()) {
            return false;
        }
        while self.peek(offset).is_some_and(|c| c.is_ascii_digit()) {
            offset += 1;
        }
        if self.peek(offset) == Some('.') && self.peek(offset + 1).is_some_and(|c| c.is_ascii_digit()) {
            offset += 1;
            while self.peek(offset).is_some_and(|c| c.is_ascii_digit()) {
                offset += 1;
            }
        }
        match self.peek(offset) {
            None => true,
            Some('.') => false,
            Some(c) => !(c.is_alphanumeric() || c == '_'),
        }
    }

    fn read_number(&mut self) -> Result<Value, ReadError> {
        let start = self.pos;
        if self.current() == Some('-') {
            self.pos += 1;
        }
        let mut dots = 0usize;
        while let Some(c) = self.current() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else if c == '.' {
                dots += 1;
                self.pos += 1;
            } else {
                break;
            }
        }
        let lexeme: String = self.chars[start..self.pos].iter().collect();
        if lexeme.is_empty() || dots > 1 {
            return Err(ReadError::BadNumber { pos: start });
        }
        if dots == 1 {
            lexeme
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| ReadError::BadNumber { pos: start })
        } else {
            lexeme
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| ReadError::BadNumber { pos: start })
        }
    }

    fn read_list(&mut self, quoted: bool) -> Result<Value, ReadError> {
        let start = self.pos;
        if quoted {
            self.pos += 1;
        }
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            match self.current() {
                None => return Err(ReadError::UnterminatedList { pos: start }),
                Some(')') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => items.push(self.read()?),
            }
        }
        // Dotted pair: exactly (a . b). The collapse wins over the quote.
        if items.len() == 3 && items[1] == Value::Symbol(".".to_string()) {
            let cdr = items.pop().unwrap();
            items.pop();
            let car = items.pop().unwrap();
            return Ok(Value::cons(car, cdr));
        }
        let list = Value::List(items);
        Ok(if quoted { Value::quoted(list) } else { list })
    }

    fn read_string(&mut self) -> Result<Value, ReadError> {
        let start = self.pos;
        self.pos += 1;
        let content_start = self.pos;
        loop {
            match self.current() {
                None => return Err(ReadError::UnterminatedString { pos: start }),
                Some('"') if self.pos == content_start || self.chars[self.pos - 1] != '\\' => break,
                Some(_) => self.pos += 1,
            }
        }
        let content: String = self.chars[content_start..self.pos].iter().collect();
        self.pos += 1;
        Ok(Value::Str(content))
    }

    fn read_symbol(&mut self) -> Value {
        let start = self.pos;
        while self.current().is_some_and(|c| !c.is_whitespace() && c != ')') {
            self.pos += 1;
        }
        let lexeme: String = self.chars[start..self.pos].iter().collect();
        Value::Symbol(lexeme)
    }
}
