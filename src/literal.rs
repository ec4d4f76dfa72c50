//! Strict reader and writer for the list-valued columns of the interchange
//! file, which hold Python-style literals such as `[47, 43, 51]` or
//! `[('United States', '48.83%'), ('Others', '29.88%')]`.
//!
//! Only integers, quoted strings, lists and tuples are understood; anything
//! else is rejected, and each column is checked against its expected shape.

use crate::error::FormatError;

const MAX_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Str(String),
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error<T>(&self, reason: impl Into<String>) -> Result<T, FormatError> {
        Err(FormatError::Literal {
            offset: self.pos,
            reason: reason.into(),
        })
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn value(&mut self, depth: usize) -> Result<Literal, FormatError> {
        if depth > MAX_DEPTH {
            return self.error("nesting too deep");
        }
        self.skip_whitespace();
        match self.peek() {
            Some('[') => {
                self.bump();
                self.sequence(']', depth).map(|items| Literal::List(items.0))
            }
            Some('(') => {
                self.bump();
                let (items, trailing_comma) = self.sequence(')', depth)?;
                if items.len() == 1 && !trailing_comma {
                    // `(x)` is just a parenthesized value.
                    Ok(items.into_iter().next().unwrap_or(Literal::Tuple(Vec::new())))
                } else {
                    Ok(Literal::Tuple(items))
                }
            }
            Some(quote @ ('\'' | '"')) => {
                self.bump();
                self.string(quote).map(Literal::Str)
            }
            Some(c) if c == '-' || c == '+' || c.is_ascii_digit() => self.integer(),
            Some(c) => self.error(format!("unexpected character {c:?}")),
            None => self.error("unexpected end of input"),
        }
    }

    fn sequence(&mut self, close: char, depth: usize) -> Result<(Vec<Literal>, bool), FormatError> {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.bump();
                return Ok((items, trailing_comma));
            }
            items.push(self.value(depth + 1)?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => trailing_comma = true,
                Some(c) if c == close => return Ok((items, false)),
                Some(c) => return self.error(format!("expected ',' or {close:?}, found {c:?}")),
                None => return self.error(format!("missing closing {close:?}")),
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<String, FormatError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('\\') => out.push('\\'),
                    Some('\'') => out.push('\''),
                    Some('"') => out.push('"'),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => return self.error(format!("unsupported escape \\{c}")),
                    None => return self.error("unterminated string"),
                },
                Some(c) => out.push(c),
                None => return self.error("unterminated string"),
            }
        }
    }

    fn integer(&mut self) -> Result<Literal, FormatError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        let text = &self.input[start..self.pos];
        match text.parse::<i64>() {
            Ok(value) => Ok(Literal::Int(value)),
            Err(_) => {
                self.pos = start;
                self.error(format!("invalid integer {text:?}"))
            }
        }
    }
}

/// Parses one literal, which must span the whole input.
pub fn parse(input: &str) -> Result<Literal, FormatError> {
    let mut parser = Parser { input, pos: 0 };
    let value = parser.value(0)?;
    parser.skip_whitespace();
    if parser.pos != input.len() {
        return parser.error("trailing characters");
    }
    Ok(value)
}

fn shape_error<T>(expected: &str, found: &Literal) -> Result<T, FormatError> {
    Err(FormatError::Literal {
        offset: 0,
        reason: format!("expected {expected}, found {found:?}"),
    })
}

fn list(input: &str) -> Result<Vec<Literal>, FormatError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    match parse(input)? {
        Literal::List(items) | Literal::Tuple(items) => Ok(items),
        other => shape_error("a list", &other),
    }
}

fn string_item(item: Literal) -> Result<String, FormatError> {
    match item {
        Literal::Str(s) => Ok(s),
        other => shape_error("a string", &other),
    }
}

/// Reads a list of integers, e.g. `[47, 43, 51]`. A blank cell is an empty
/// list.
pub fn int_list(input: &str) -> Result<Vec<i64>, FormatError> {
    list(input)?
        .into_iter()
        .map(|item| match item {
            Literal::Int(value) => Ok(value),
            other => shape_error("an integer", &other),
        })
        .collect()
}

/// Reads a list of strings, e.g. `['2.8M', '3.0M']`.
pub fn str_list(input: &str) -> Result<Vec<String>, FormatError> {
    list(input)?.into_iter().map(string_item).collect()
}

/// Reads a list of string pairs, e.g. `[('India', '8.87%')]`.
pub fn pair_list(input: &str) -> Result<Vec<(String, String)>, FormatError> {
    list(input)?
        .into_iter()
        .map(|item| match item {
            Literal::Tuple(pair) | Literal::List(pair) if pair.len() == 2 => {
                let mut pair = pair.into_iter();
                match (pair.next(), pair.next()) {
                    (Some(first), Some(second)) => Ok((string_item(first)?, string_item(second)?)),
                    _ => Err(FormatError::Literal {
                        offset: 0,
                        reason: "expected a pair".to_string(),
                    }),
                }
            }
            other => shape_error("a pair of strings", &other),
        })
        .collect()
}

fn quote(value: &str) -> String {
    let delimiter = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(delimiter);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}

pub fn encode_int_list(values: &[i64]) -> String {
    let items: Vec<String> = values.iter().map(i64::to_string).collect();
    format!("[{}]", items.join(", "))
}

pub fn encode_str_list(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| quote(v)).collect();
    format!("[{}]", items.join(", "))
}

pub fn encode_pair_list(values: &[(String, String)]) -> String {
    let items: Vec<String> = values
        .iter()
        .map(|(first, second)| format!("({}, {})", quote(first), quote(second)))
        .collect();
    format!("[{}]", items.join(", "))
}
