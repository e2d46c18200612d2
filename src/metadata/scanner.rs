//! Structural scanner extracting documentation blocks from Rust source text.
//!
//! The scanner does not parse Rust. It tokenizes just enough to find doc
//! blocks and the declaration that directly follows them: `struct`, `enum`,
//! `trait` (types), `fn` inside an `impl` or `trait` body (methods) and
//! `name:` inside a struct body (properties). Modifiers and attributes between
//! the doc block and the declaration are transparent; any other token drops
//! the pending block.

use std::collections::{HashMap, HashSet};

use super::decl::DeclarationId;
use super::error::MetadataError;

/// Result of scanning one source unit.
#[derive(Debug, Default)]
pub(crate) struct ScannedUnit {
    /// Types declared or implemented in the unit
    pub types: HashSet<String>,
    pub docs: HashMap<DeclarationId, String>,
    /// First failure; declarations before it are still recorded
    pub error: Option<MetadataError>,
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Punct(char),
    Literal,
    Doc(String),
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    line: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Body {
    Struct(String),
    Impl(String),
    Other,
}

pub(crate) fn scan(unit: &str, text: &str) -> ScannedUnit {
    let (tokens, lex_error) = Lexer::new(unit, text).run();
    let mut scanned = ScannedUnit::default();
    let walk_error = Walker::new(unit, &tokens, &mut scanned).run().err();
    scanned.error = walk_error.or(lex_error);
    scanned
}

struct Lexer<'a> {
    unit: &'a str,
    chars: Vec<char>,
    pos: usize,
    line: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(unit: &'a str, text: &str) -> Self {
        Self {
            unit,
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            tokens: Vec::new(),
        }
    }

    fn at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.at(0)?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn push(&mut self, tok: Tok, line: usize) {
        self.tokens.push(Token { tok, line });
    }

    fn malformed(&self, line: usize, reason: &str) -> MetadataError {
        MetadataError::MalformedSource {
            unit: self.unit.to_string(),
            line,
            reason: reason.to_string(),
        }
    }

    fn run(mut self) -> (Vec<Token>, Option<MetadataError>) {
        let error = self.lex().err();
        (self.tokens, error)
    }

    fn lex(&mut self) -> Result<(), MetadataError> {
        while let Some(c) = self.at(0) {
            let line = self.line;
            match c {
                c if c.is_whitespace() => {
                    self.advance();
                }
                '/' if self.at(1) == Some('/') => self.line_comment(line),
                '/' if self.at(1) == Some('*') => self.block_comment(line)?,
                '"' => {
                    self.quoted(line)?;
                    self.push(Tok::Literal, line);
                }
                '\'' => self.quote_or_lifetime(line)?,
                c if c.is_ascii_digit() => {
                    while self
                        .at(0)
                        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
                    {
                        self.advance();
                    }
                    self.push(Tok::Literal, line);
                }
                c if c.is_alphabetic() || c == '_' => {
                    let ident = self.ident();
                    if (ident == "r" || ident == "br")
                        && matches!(self.at(0), Some('"' | '#'))
                    {
                        self.raw_string(line)?;
                        self.push(Tok::Literal, line);
                    } else {
                        self.push(Tok::Ident(ident), line);
                    }
                }
                other => {
                    self.advance();
                    self.push(Tok::Punct(other), line);
                }
            }
        }
        Ok(())
    }

    fn ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.at(0) {
            if c.is_alphanumeric() || c == '_' {
                out.push(c);
                self.advance();
            } else {
                break;
            }
        }
        out
    }

    fn line_comment(&mut self, line: usize) {
        let mut body = String::new();
        while let Some(c) = self.at(0) {
            if c == '\n' {
                break;
            }
            body.push(c);
            self.advance();
        }
        if let Some(rest) = body.strip_prefix("///") {
            if !rest.starts_with('/') {
                let rest = rest.strip_prefix(' ').unwrap_or(rest);
                self.push(Tok::Doc(rest.trim_end().to_string()), line);
            }
        }
    }

    fn block_comment(&mut self, line: usize) -> Result<(), MetadataError> {
        let is_doc = self.at(2) == Some('*') && !matches!(self.at(3), Some('*' | '/'));
        self.advance();
        self.advance();
        let mut depth = 1usize;
        let mut body = String::new();
        while depth > 0 {
            match (self.at(0), self.at(1)) {
                (Some('*'), Some('/')) => {
                    depth -= 1;
                    self.advance();
                    self.advance();
                    if depth > 0 {
                        body.push_str("*/");
                    }
                }
                (Some('/'), Some('*')) => {
                    depth += 1;
                    self.advance();
                    self.advance();
                    body.push_str("/*");
                }
                (Some(c), _) => {
                    body.push(c);
                    self.advance();
                }
                (None, _) => return Err(self.malformed(line, "unterminated block comment")),
            }
        }
        if is_doc {
            let text = body.strip_prefix('*').unwrap_or(&body);
            self.push(Tok::Doc(clean_block(text)), line);
        }
        Ok(())
    }

    fn quoted(&mut self, line: usize) -> Result<(), MetadataError> {
        self.advance();
        loop {
            match self.advance() {
                Some('\\') => {
                    self.advance();
                }
                Some('"') => return Ok(()),
                Some(_) => {}
                None => return Err(self.malformed(line, "unterminated string literal")),
            }
        }
    }

    fn raw_string(&mut self, line: usize) -> Result<(), MetadataError> {
        let mut hashes = 0usize;
        while self.at(0) == Some('#') {
            hashes += 1;
            self.advance();
        }
        if self.advance() != Some('"') {
            return Err(self.malformed(line, "malformed raw string literal"));
        }
        loop {
            match self.advance() {
                Some('"') => {
                    let closing = (0..hashes).all(|i| self.at(i) == Some('#'));
                    if closing {
                        for _ in 0..hashes {
                            self.advance();
                        }
                        return Ok(());
                    }
                }
                Some(_) => {}
                None => return Err(self.malformed(line, "unterminated raw string literal")),
            }
        }
    }

    fn quote_or_lifetime(&mut self, line: usize) -> Result<(), MetadataError> {
        let is_char = self.at(1) == Some('\\') || self.at(2) == Some('\'');
        self.advance();
        if !is_char {
            self.ident();
            self.push(Tok::Literal, line);
            return Ok(());
        }
        loop {
            match self.advance() {
                Some('\\') => {
                    self.advance();
                }
                Some('\'') => break,
                Some('\n') | None => return Err(self.malformed(line, "unterminated character literal")),
                Some(_) => {}
            }
        }
        self.push(Tok::Literal, line);
        Ok(())
    }
}

/// Strip the decoration of a `/** */` body: leading `*` and one space per line.
fn clean_block(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(|l| {
            let l = l.trim_start();
            let l = l.strip_prefix('*').unwrap_or(l);
            l.strip_prefix(' ').unwrap_or(l).trim_end()
        })
        .collect();
    lines.join("\n").trim().to_string()
}

struct Walker<'a> {
    unit: &'a str,
    tokens: &'a [Token],
    out: &'a mut ScannedUnit,
    pos: usize,
    pending: Option<String>,
    bodies: Vec<Body>,
    next_body: Option<Body>,
}

impl<'a> Walker<'a> {
    fn new(unit: &'a str, tokens: &'a [Token], out: &'a mut ScannedUnit) -> Self {
        Self {
            unit,
            tokens,
            out,
            pos: 0,
            pending: None,
            bodies: Vec::new(),
            next_body: None,
        }
    }

    fn tok(&self, offset: usize) -> Option<&Tok> {
        self.tokens.get(self.pos + offset).map(|t| &t.tok)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |t| t.line)
    }

    fn ident_at(&self, offset: usize) -> Option<&str> {
        match self.tok(offset) {
            Some(Tok::Ident(s)) => Some(s),
            _ => None,
        }
    }

    fn malformed(&self, reason: &str) -> MetadataError {
        MetadataError::MalformedSource {
            unit: self.unit.to_string(),
            line: self.line(),
            reason: reason.to_string(),
        }
    }

    fn run(mut self) -> Result<(), MetadataError> {
        while let Some(tok) = self.tok(0).cloned() {
            match tok {
                Tok::Doc(text) => {
                    self.pending = Some(match self.pending.take() {
                        Some(prev) => format!("{prev}\n{text}"),
                        None => text,
                    });
                    self.pos += 1;
                }
                Tok::Punct('#') => {
                    self.pos += 1;
                    if self.tok(0) == Some(&Tok::Punct('!')) {
                        self.pos += 1;
                    }
                    if self.tok(0) == Some(&Tok::Punct('[')) {
                        self.skip_group('[', ']');
                    } else {
                        self.pending = None;
                    }
                }
                Tok::Punct('{') => {
                    let body = self.next_body.take().unwrap_or(Body::Other);
                    self.bodies.push(body);
                    self.pending = None;
                    self.pos += 1;
                }
                Tok::Punct('}') => {
                    self.bodies.pop();
                    self.pending = None;
                    self.pos += 1;
                }
                Tok::Punct(';') => {
                    self.next_body = None;
                    self.pending = None;
                    self.pos += 1;
                }
                Tok::Ident(word) => self.ident(&word)?,
                _ => {
                    self.pending = None;
                    self.pos += 1;
                }
            }
        }
        Ok(())
    }

    fn ident(&mut self, word: &str) -> Result<(), MetadataError> {
        match word {
            "pub" => {
                self.pos += 1;
                if self.tok(0) == Some(&Tok::Punct('(')) {
                    self.skip_group('(', ')');
                }
            }
            "async" | "unsafe" | "default" => self.pos += 1,
            "extern" => {
                self.pos += 1;
                if self.tok(0) == Some(&Tok::Literal) {
                    self.pos += 1;
                }
            }
            "const" => {
                let modifier = matches!(
                    self.ident_at(1),
                    Some("fn" | "unsafe" | "async" | "extern")
                );
                if !modifier {
                    self.pending = None;
                }
                self.pos += 1;
            }
            "struct" | "enum" | "union" | "trait" => {
                let Some(name) = self.ident_at(1).map(str::to_string) else {
                    return Err(self.malformed(&format!("`{word}` without a name")));
                };
                self.out.types.insert(name.clone());
                if let Some(doc) = self.pending.take() {
                    self.out.docs.insert(DeclarationId::of_type(name.as_str()), doc);
                }
                self.next_body = Some(match word {
                    "struct" => Body::Struct(name),
                    "trait" => Body::Impl(name),
                    _ => Body::Other,
                });
                self.pos += 2;
            }
            "impl" if self.at_item_boundary() => self.impl_header()?,
            // `impl Trait` in argument or return position
            "impl" => self.pos += 1,
            "fn" => {
                let Some(name) = self.ident_at(1).map(str::to_string) else {
                    return Err(self.malformed("`fn` without a name"));
                };
                let doc = self.pending.take();
                if let (Some(Body::Impl(owner)), Some(doc)) = (self.bodies.last(), doc) {
                    self.out
                        .docs
                        .insert(DeclarationId::method(owner.as_str(), name), doc);
                }
                self.next_body = Some(Body::Other);
                self.pos += 2;
            }
            name => {
                let doc = self.pending.take();
                let is_field = self.tok(1) == Some(&Tok::Punct(':'))
                    && self.tok(2) != Some(&Tok::Punct(':'));
                if let (Some(Body::Struct(owner)), Some(doc), true) =
                    (self.bodies.last(), doc, is_field)
                {
                    self.out
                        .docs
                        .insert(DeclarationId::property(owner.as_str(), name), doc);
                }
                self.pos += 1;
            }
        }
        Ok(())
    }

    /// Whether the current token starts an item: the previous significant
    /// token ends one (or opens a block), or is an item modifier.
    fn at_item_boundary(&self) -> bool {
        let previous = self.tokens[..self.pos]
            .iter()
            .rev()
            .find(|t| !matches!(t.tok, Tok::Doc(_)));
        match previous.map(|t| &t.tok) {
            None | Some(Tok::Punct('}' | ';' | ']' | '{')) => true,
            Some(Tok::Ident(word)) => matches!(word.as_str(), "unsafe" | "pub" | "default"),
            _ => false,
        }
    }

    /// `impl [<..>] [Trait for] Type [<..>] [where ..] {`
    fn impl_header(&mut self) -> Result<(), MetadataError> {
        let doc = self.pending.take();
        self.pos += 1;
        if self.tok(0) == Some(&Tok::Punct('<')) {
            self.skip_group('<', '>');
        }
        let mut last_ident: Option<String> = None;
        let mut self_type: Option<String> = None;
        while let Some(tok) = self.tok(0).cloned() {
            match tok {
                Tok::Punct('{') | Tok::Punct(';') => break,
                Tok::Punct('<') => self.skip_group('<', '>'),
                Tok::Ident(word) if word == "for" => {
                    last_ident = None;
                    self.pos += 1;
                }
                Tok::Ident(word) if word == "where" => {
                    self_type = last_ident.take();
                    while !matches!(self.tok(0), None | Some(Tok::Punct('{' | ';'))) {
                        self.pos += 1;
                    }
                }
                Tok::Ident(word) => {
                    if word != "dyn" {
                        last_ident = Some(word);
                    }
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
        let Some(owner) = self_type.or(last_ident) else {
            return Err(self.malformed("`impl` without a type"));
        };
        self.out.types.insert(owner.clone());
        if let Some(doc) = doc {
            self.out
                .docs
                .entry(DeclarationId::of_type(owner.as_str()))
                .or_insert(doc);
        }
        self.next_body = Some(Body::Impl(owner));
        Ok(())
    }

    /// Skip a balanced group starting at the current `open` token.
    fn skip_group(&mut self, open: char, close: char) {
        let tokens = self.tokens;
        let mut depth = 0usize;
        while let Some(token) = tokens.get(self.pos) {
            match token.tok {
                Tok::Punct(c) if c == open => depth += 1,
                Tok::Punct(c) if c == close => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.pos += 1;
                        return;
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
    }
}
