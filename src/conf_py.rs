//! Reader for the declarative subset of a Sphinx `conf.py`
//!
//! Only top-level `name = <literal>` assignments are read. Literals are
//! strings, integers, `True`/`False`/`None`, and lists, tuples or dicts built
//! from them. Imports, function definitions, indented blocks and assignments
//! whose right-hand side is an expression are skipped. Nothing is executed.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde_json::{Map, Number, Value};

use crate::declaration::is_recognized_key;
use crate::error::ConfigurationError;

lazy_static! {
    /// Regex for a simple top-level assignment `name = rest`
    static ref ASSIGNMENT_REGEX: Regex =
        Regex::new(r"(?s)^([A-Za-z_][A-Za-z0-9_]*)\s*=(.*)$").unwrap();

    /// Regex for in-place changes such as `name += ...`, `name.append(...)`, `name[0] = ...`
    static ref MUTATION_REGEX: Regex =
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*(?:[-+|]=|\.|\[)").unwrap();
}

/// A logical statement, possibly spanning several physical lines
#[derive(Debug)]
struct Statement {
    line: usize,
    indented: bool,
    text: String,
}

/// Parse every literal assignment of a `conf.py` into a mapping.
/// Later assignments to the same name replace earlier ones.
pub fn parse_assignments(
    source: &str,
    source_name: &str,
) -> Result<Map<String, Value>, ConfigurationError> {
    let mut assignments = Map::new();

    let unreadable = |statement: &Statement, name: &str, reason: &str| {
        ConfigurationError::parse(
            source_name,
            format!(
                "line {}: '{}' {}; it cannot be read without executing conf.py",
                statement.line, name, reason
            ),
        )
    };

    for statement in split_statements(source) {
        if let Some(captures) = MUTATION_REGEX.captures(&statement.text) {
            if is_recognized_key(&captures[1]) {
                return Err(unreadable(&statement, &captures[1], "is modified in place"));
            }
        }

        let Some(captures) = ASSIGNMENT_REGEX.captures(&statement.text) else {
            debug!(
                "{}:{}: skipping non-assignment statement",
                source_name, statement.line
            );
            continue;
        };

        let name = &captures[1];
        let rhs = &captures[2];
        if rhs.starts_with('=') {
            // comparison expression, not an assignment
            continue;
        }

        if statement.indented {
            if is_recognized_key(name) {
                return Err(unreadable(&statement, name, "is assigned inside a block"));
            }
            continue;
        }

        match parse_literal(rhs) {
            Ok(value) => {
                assignments.insert(name.to_string(), value);
            }
            Err(LiteralError::NotLiteral) if is_recognized_key(name) => {
                return Err(unreadable(&statement, name, "is not a literal value"));
            }
            Err(LiteralError::NotLiteral) => {
                debug!(
                    "{}:{}: skipping '{}', value is not a literal",
                    source_name, statement.line, name
                );
            }
            Err(LiteralError::Malformed(message)) => {
                return Err(ConfigurationError::parse(
                    source_name,
                    format!("line {}: '{}': {}", statement.line, name, message),
                ));
            }
        }
    }

    Ok(assignments)
}

/// Split source into logical statements. Newlines inside brackets, strings,
/// or after a backslash continuation do not end a statement.
fn split_statements(source: &str) -> Vec<Statement> {
    let chars: Vec<char> = source.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut line = 1;
    let mut start_line = 1;
    let mut depth = 0usize;
    let mut quote: Option<(char, bool)> = None;
    let mut i = 0;

    let mut flush = |current: &mut String, start_line: usize| {
        if !current.trim().is_empty() {
            statements.push(Statement {
                line: start_line,
                indented: current.starts_with([' ', '\t']),
                text: current.trim().to_string(),
            });
        }
        current.clear();
    };

    while i < chars.len() {
        let c = chars[i];

        if let Some((q, triple)) = quote {
            if c == '\n' && !triple {
                // unterminated single-line string; let the literal parser report it
                quote = None;
            } else {
                current.push(c);
                if c == '\\' && i + 1 < chars.len() {
                    current.push(chars[i + 1]);
                    if chars[i + 1] == '\n' {
                        line += 1;
                    }
                    i += 2;
                    continue;
                }
                if c == '\n' {
                    line += 1;
                }
                if c == q {
                    if !triple {
                        quote = None;
                    } else if chars.get(i + 1) == Some(&q) && chars.get(i + 2) == Some(&q) {
                        current.push(q);
                        current.push(q);
                        quote = None;
                        i += 3;
                        continue;
                    }
                }
                i += 1;
                continue;
            }
        }

        match c {
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '"' | '\'' => {
                let triple = chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c);
                let width = if triple { 3 } else { 1 };
                for _ in 0..width {
                    current.push(c);
                }
                quote = Some((c, triple));
                i += width;
                continue;
            }
            '\\' if chars.get(i + 1) == Some(&'\n') => {
                current.push(' ');
                line += 1;
                i += 2;
                continue;
            }
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            '\n' => {
                line += 1;
                if depth == 0 {
                    flush(&mut current, start_line);
                    start_line = line;
                    i += 1;
                    continue;
                }
            }
            _ => {}
        }

        current.push(c);
        i += 1;
    }
    flush(&mut current, start_line);

    statements
}

#[derive(Debug, PartialEq)]
enum LiteralError {
    /// The value is an expression this reader does not evaluate
    NotLiteral,
    /// The value starts like a literal but is broken
    Malformed(String),
}

fn parse_literal(text: &str) -> Result<Value, LiteralError> {
    let mut parser = LiteralParser {
        chars: text.chars().collect(),
        pos: 0,
    };
    let value = parser.value()?;
    parser.skip_whitespace();
    if parser.pos < parser.chars.len() {
        // e.g. `"a" + "b"` or `"%s" % version`
        return Err(LiteralError::NotLiteral);
    }
    Ok(value)
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        self.skip_whitespace();
        match self.peek() {
            _ if self.at_string_start() => self.string_literal(),
            Some('[') => self.sequence(']'),
            Some('(') => self.sequence(')'),
            Some('{') => self.dict(),
            Some(c) if c.is_ascii_digit() || c == '-' => self.integer(),
            Some(c) if c.is_alphabetic() || c == '_' => self.keyword(),
            Some(_) => Err(LiteralError::NotLiteral),
            None => Err(LiteralError::Malformed("missing value".to_string())),
        }
    }

    /// Whether a string literal, optionally `r`/`u` prefixed, starts here
    fn at_string_start(&self) -> bool {
        match self.peek() {
            Some('"') | Some('\'') => true,
            Some('r') | Some('R') | Some('u') | Some('U') => {
                matches!(self.chars.get(self.pos + 1), Some('"') | Some('\''))
            }
            _ => false,
        }
    }

    /// One string literal, or several adjacent ones joined as Python does
    fn string_literal(&mut self) -> Result<Value, LiteralError> {
        let mut out = self.prefixed_string()?;
        loop {
            let before = self.pos;
            self.skip_whitespace();
            if !self.at_string_start() {
                self.pos = before;
                return Ok(Value::String(out));
            }
            out.push_str(&self.prefixed_string()?);
        }
    }

    fn prefixed_string(&mut self) -> Result<String, LiteralError> {
        let raw = matches!(self.peek(), Some('r') | Some('R'));
        if matches!(self.peek(), Some(c) if c.is_alphabetic()) {
            self.pos += 1;
        }
        self.string(raw)
    }

    fn string(&mut self, raw: bool) -> Result<String, LiteralError> {
        let Some(quote) = self.peek() else {
            return Err(LiteralError::Malformed("expected a string".to_string()));
        };
        let triple = self.chars.get(self.pos + 1) == Some(&quote)
            && self.chars.get(self.pos + 2) == Some(&quote);
        self.pos += if triple { 3 } else { 1 };

        let mut out = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(LiteralError::Malformed("unterminated string".to_string()));
            };
            self.pos += 1;

            if c == '\\' {
                let Some(escaped) = self.peek() else {
                    return Err(LiteralError::Malformed("unterminated string".to_string()));
                };
                self.pos += 1;
                if raw {
                    out.push('\\');
                    out.push(escaped);
                } else {
                    self.escape(escaped, &mut out)?;
                }
                continue;
            }

            if c == quote {
                if !triple {
                    return Ok(out);
                }
                if self.peek() == Some(quote) && self.chars.get(self.pos + 1) == Some(&quote) {
                    self.pos += 2;
                    return Ok(out);
                }
            }

            if c == '\n' && !triple {
                return Err(LiteralError::Malformed("unterminated string".to_string()));
            }
            out.push(c);
        }
    }

    /// Decode the escape sequence whose first character after `\` is `escaped`
    fn escape(&mut self, escaped: char, out: &mut String) -> Result<(), LiteralError> {
        match escaped {
            '\n' => {}
            '\\' | '\'' | '"' => out.push(escaped),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            '0'..='7' => {
                let mut code = escaped.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            code = code * 8 + digit;
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                out.push(self.code_point(code, escaped)?);
            }
            'x' => {
                let code = self.hex_digits(2, escaped)?;
                out.push(self.code_point(code, escaped)?);
            }
            'u' => {
                let code = self.hex_digits(4, escaped)?;
                out.push(self.code_point(code, escaped)?);
            }
            'U' => {
                let code = self.hex_digits(8, escaped)?;
                out.push(self.code_point(code, escaped)?);
            }
            // \N{NAME} needs the Unicode name database
            'N' => return Err(LiteralError::NotLiteral),
            // unknown escapes keep their backslash
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_digits(&mut self, count: usize, escape: char) -> Result<u32, LiteralError> {
        let mut code = 0u32;
        for _ in 0..count {
            let digit = self.peek().and_then(|c| c.to_digit(16)).ok_or_else(|| {
                LiteralError::Malformed(format!("truncated \\{} escape", escape))
            })?;
            code = code * 16 + digit;
            self.pos += 1;
        }
        Ok(code)
    }

    fn code_point(&self, code: u32, escape: char) -> Result<char, LiteralError> {
        char::from_u32(code).ok_or_else(|| {
            LiteralError::Malformed(format!("\\{} escape is not a valid character", escape))
        })
    }

    fn sequence(&mut self, close: char) -> Result<Value, LiteralError> {
        self.pos += 1;
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(c) if c == close => {
                    self.pos += 1;
                    // `(x)` is just `x`; only `(x,)` makes a tuple
                    if close == ')' && items.len() == 1 && !saw_comma {
                        return Ok(items.remove(0));
                    }
                    return Ok(Value::Array(items));
                }
                None => {
                    return Err(LiteralError::Malformed(format!("missing closing '{}'", close)))
                }
                _ => {}
            }

            items.push(self.value()?);

            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    saw_comma = true;
                    self.pos += 1;
                }
                Some(c) if c == close => {}
                Some(c) => {
                    return Err(LiteralError::Malformed(format!(
                        "expected ',' or '{}', found '{}'",
                        close, c
                    )))
                }
                None => {
                    return Err(LiteralError::Malformed(format!("missing closing '{}'", close)))
                }
            }
        }
    }

    fn dict(&mut self) -> Result<Value, LiteralError> {
        self.pos += 1;
        let mut map = Map::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('}') => {
                    self.pos += 1;
                    return Ok(Value::Object(map));
                }
                Some(_) if self.at_string_start() => {}
                // non-string keys and `**spread` are left to Python
                Some(_) => return Err(LiteralError::NotLiteral),
                None => return Err(LiteralError::Malformed("missing closing '}'".to_string())),
            }

            let key = match self.string_literal()? {
                Value::String(key) => key,
                _ => return Err(LiteralError::NotLiteral),
            };
            self.skip_whitespace();
            if self.peek() != Some(':') {
                return Err(LiteralError::Malformed(format!(
                    "expected ':' after key '{}'",
                    key
                )));
            }
            self.pos += 1;
            let value = self.value()?;
            map.insert(key, value);

            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {}
                Some(c) => {
                    return Err(LiteralError::Malformed(format!(
                        "expected ',' or '}}', found '{}'",
                        c
                    )))
                }
                None => return Err(LiteralError::Malformed("missing closing '}'".to_string())),
            }
        }
    }

    fn integer(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '_') {
            self.pos += 1;
        }
        if matches!(self.peek(), Some(c) if c == '.' || c.is_alphabetic()) {
            // floats and hex literals are left to Python
            return Err(LiteralError::NotLiteral);
        }
        let digits: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        digits
            .parse::<i64>()
            .map(|n| Value::Number(Number::from(n)))
            .map_err(|_| LiteralError::NotLiteral)
    }

    fn keyword(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            _ => Err(LiteralError::NotLiteral),
        }
    }
}
