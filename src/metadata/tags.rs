//! Recursive-descent parser for metadata tags in documentation text.
//!
//! ```text
//! tag     := '@' Name [ '(' params? ')' ]
//! params  := pair (',' pair)* | value
//! pair    := ident '=' value
//! value   := string | number | true | false | null | array | tag
//! array   := '{' [ entry (',' entry)* [','] ] '}'
//! entry   := [ key '=' ] value
//! ```
//!
//! A tag starts with `@` followed by an upper-case letter, at the start of the
//! text or after whitespace. The parameter list must follow the name directly.
//! A single positional parameter is bound to the implicit `value` field.
//! Everything that is not a tag is ignored.

use thiserror::Error;

/// Implicit field every metadata type carries.
pub const VALUE_FIELD: &str = "value";

const MAX_NESTING: usize = 32;

/// A parsed parameter value, before metadata types are resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<TagValue>),
    Map(Vec<(String, TagValue)>),
    Tag(RawTag),
}

/// A tag as written: short name plus parameters in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTag {
    pub name: String,
    pub params: Vec<(String, TagValue)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("offset {offset}: {message}")]
pub struct TagSyntaxError {
    pub offset: usize,
    pub message: String,
}

/// Parse every tag found in `text`, in order of appearance.
///
/// # Errors
///
/// Returns a [`TagSyntaxError`] for the first malformed parameter list.
pub fn parse_tags(text: &str) -> Result<Vec<RawTag>, TagSyntaxError> {
    let mut parser = Parser { src: text, pos: 0 };
    let mut tags = Vec::new();
    while parser.seek_tag() {
        tags.push(parser.tag(0)?);
    }
    Ok(tags)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, TagSyntaxError> {
        Err(TagSyntaxError {
            offset: self.pos,
            message: message.into(),
        })
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char) -> Result<(), TagSyntaxError> {
        match self.peek() {
            Some(c) if c == want => {
                self.bump();
                Ok(())
            }
            Some(c) => self.error(format!("expected `{want}`, found `{c}`")),
            None => self.error(format!("expected `{want}`, found end of text")),
        }
    }

    /// Move to the next `@Name` that starts a tag.
    fn seek_tag(&mut self) -> bool {
        let mut prev: Option<char> = if self.pos == 0 {
            None
        } else {
            self.src[..self.pos].chars().next_back()
        };
        while let Some(c) = self.peek() {
            let boundary = prev.map_or(true, |p| p.is_whitespace() || p == '*');
            if c == '@' && boundary && self.peek_second().is_some_and(|n| n.is_ascii_uppercase()) {
                return true;
            }
            prev = Some(c);
            self.bump();
        }
        false
    }

    fn ident(&mut self) -> Option<&str> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                self.bump();
            }
            _ => return None,
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        Some(&self.src[start..self.pos])
    }

    fn tag(&mut self, depth: usize) -> Result<RawTag, TagSyntaxError> {
        if depth > MAX_NESTING {
            return self.error("tags nested too deeply");
        }
        self.expect('@')?;
        let Some(name) = self.ident().map(str::to_string) else {
            return self.error("expected tag name after `@`");
        };
        let params = if self.peek() == Some('(') {
            self.params(depth)?
        } else {
            Vec::new()
        };
        Ok(RawTag { name, params })
    }

    fn params(&mut self, depth: usize) -> Result<Vec<(String, TagValue)>, TagSyntaxError> {
        self.expect('(')?;
        self.skip_ws();
        if self.peek() == Some(')') {
            self.bump();
            return Ok(Vec::new());
        }
        let mut params = Vec::new();
        if self.at_pair_key() {
            loop {
                self.skip_ws();
                let Some(key) = self.ident().map(str::to_string) else {
                    return self.error("expected parameter name");
                };
                self.skip_ws();
                self.expect('=')?;
                self.skip_ws();
                let value = self.value(depth + 1)?;
                params.push((key, value));
                self.skip_ws();
                if self.peek() == Some(',') {
                    self.bump();
                    continue;
                }
                break;
            }
        } else {
            let value = self.value(depth + 1)?;
            params.push((VALUE_FIELD.to_string(), value));
            self.skip_ws();
        }
        self.expect(')')?;
        Ok(params)
    }

    /// Whether the cursor sits on `ident =`.
    fn at_pair_key(&mut self) -> bool {
        let saved = self.pos;
        let has_ident = self.ident().is_some();
        let is_pair = has_ident && {
            self.skip_ws();
            self.peek() == Some('=')
        };
        self.pos = saved;
        is_pair
    }

    fn value(&mut self, depth: usize) -> Result<TagValue, TagSyntaxError> {
        if depth > MAX_NESTING {
            return self.error("parameters nested too deeply");
        }
        match self.peek() {
            Some('"' | '\'') => self.string().map(TagValue::Str),
            Some('{') => self.array(depth),
            Some('@') => self.tag(depth).map(TagValue::Tag),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_ascii_alphabetic() => {
                let start = self.pos;
                let word = self.ident().unwrap_or_default().to_ascii_lowercase();
                match word.as_str() {
                    "true" => Ok(TagValue::Bool(true)),
                    "false" => Ok(TagValue::Bool(false)),
                    "null" => Ok(TagValue::Null),
                    _ => {
                        self.pos = start;
                        self.error(format!("unexpected identifier `{word}`"))
                    }
                }
            }
            Some(c) => self.error(format!("unexpected character `{c}`")),
            None => self.error("unexpected end of text"),
        }
    }

    fn string(&mut self) -> Result<String, TagSyntaxError> {
        let start = self.pos;
        let Some(quote) = self.bump() else {
            return self.error("expected string");
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(c) if c == quote || c == '\\' => out.push(c),
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => break,
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => break,
            }
        }
        Err(TagSyntaxError {
            offset: start,
            message: "unterminated string".to_string(),
        })
    }

    fn number(&mut self) -> Result<TagValue, TagSyntaxError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        let mut seen_dot = false;
        let mut seen_digit = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                seen_digit = true;
            } else if c == '.' && !seen_dot {
                seen_dot = true;
            } else {
                break;
            }
            self.bump();
        }
        let text = &self.src[start..self.pos];
        if !seen_digit {
            self.pos = start;
            return self.error(format!("malformed number `{text}`"));
        }
        if !seen_dot {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(TagValue::Int(i));
            }
        }
        match text.parse::<f64>() {
            Ok(f) => Ok(TagValue::Float(f)),
            Err(_) => {
                self.pos = start;
                self.error(format!("malformed number `{text}`"))
            }
        }
    }

    fn array(&mut self, depth: usize) -> Result<TagValue, TagSyntaxError> {
        self.expect('{')?;
        let mut entries: Vec<(Option<String>, TagValue)> = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                break;
            }
            let key = self.array_key()?;
            self.skip_ws();
            let value = self.value(depth + 1)?;
            entries.push((key, value));
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {
                    self.bump();
                    break;
                }
                Some(c) => return self.error(format!("expected `,` or `}}`, found `{c}`")),
                None => return self.error("unterminated array"),
            }
        }
        if entries.iter().all(|(k, _)| k.is_none()) {
            return Ok(TagValue::List(entries.into_iter().map(|(_, v)| v).collect()));
        }
        let map = entries
            .into_iter()
            .enumerate()
            .map(|(i, (k, v))| (k.unwrap_or_else(|| i.to_string()), v))
            .collect();
        Ok(TagValue::Map(map))
    }

    /// Optional `key =` prefix of an array entry. The key may be an
    /// identifier, a quoted string or an integer.
    fn array_key(&mut self) -> Result<Option<String>, TagSyntaxError> {
        let saved = self.pos;
        let key = match self.peek() {
            Some('"' | '\'') => self.string().ok(),
            Some(c) if c.is_ascii_digit() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
                Some(self.src[start..self.pos].to_string())
            }
            _ => self.ident().map(str::to_string),
        };
        if let Some(key) = key {
            self.skip_ws();
            if self.peek() == Some('=') {
                self.bump();
                return Ok(Some(key));
            }
        }
        self.pos = saved;
        Ok(None)
    }
}
