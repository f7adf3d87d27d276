//! Tokenizer for Kite script.
//!
//! The scanner is a cursor over the source text: each [`ScannerState::scan`]
//! call advances to the next token and exposes its kind, span and cooked
//! value. Newlines are not tokens; instead every token records whether a
//! line break preceded it, which the parser uses to end statements.

use crate::token::SyntaxKind;
use kite_common::diagnostics::diagnostic_codes;
use kite_common::Diagnostic;

/// Scanner state machine.
pub struct ScannerState {
    text: String,
    file_name: String,
    pos: usize,
    token: SyntaxKind,
    token_start: usize,
    token_value: String,
    preceding_line_break: bool,
    diagnostics: Vec<Diagnostic>,
}

impl ScannerState {
    pub fn new(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        ScannerState {
            text: text.into(),
            file_name: file_name.into(),
            pos: 0,
            token: SyntaxKind::Unknown,
            token_start: 0,
            token_value: String::new(),
            preceding_line_break: false,
            diagnostics: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn token(&self) -> SyntaxKind {
        self.token
    }

    pub fn token_start(&self) -> u32 {
        self.token_start as u32
    }

    pub fn token_end(&self) -> u32 {
        self.pos as u32
    }

    /// Identifier text, digits of an integer, or the unescaped contents of
    /// a string literal.
    pub fn token_value(&self) -> &str {
        &self.token_value
    }

    pub fn token_text(&self) -> &str {
        &self.text[self.token_start..self.pos]
    }

    pub fn has_preceding_line_break(&self) -> bool {
        self.preceding_line_break
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.text.as_bytes().get(self.pos + offset).copied()
    }

    fn error(&mut self, start: usize, end: usize, code: u32, args: &[&str]) {
        self.diagnostics.push(Diagnostic::from_code(
            &self.file_name,
            start as u32,
            (end - start) as u32,
            code,
            args,
        ));
    }

    /// Advance to the next token and return its kind.
    pub fn scan(&mut self) -> SyntaxKind {
        self.preceding_line_break = false;
        self.token_value.clear();
        self.skip_trivia();
        self.token_start = self.pos;
        let Some(ch) = self.peek() else {
            self.token = SyntaxKind::EndOfFile;
            return self.token;
        };
        self.token = match ch {
            c if c.is_ascii_digit() => self.scan_number(),
            c if c == '_' || c.is_alphabetic() => self.scan_identifier(),
            '"' => self.scan_string(),
            _ => self.scan_punctuation(ch),
        };
        self.token
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek_at(0) {
                Some(b'\n') => {
                    self.preceding_line_break = true;
                    self.pos += 1;
                }
                Some(b' ' | b'\t' | b'\r') => self.pos += 1,
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    let rest = &self.text.as_bytes()[self.pos..];
                    self.pos += memchr::memchr(b'\n', rest).unwrap_or(rest.len());
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let rest = &self.text[self.pos + 2..];
                    match rest.find("*/") {
                        Some(end) => {
                            if rest[..end].contains('\n') {
                                self.preceding_line_break = true;
                            }
                            self.pos += end + 4;
                        }
                        None => {
                            // Reported at end of input so the REPL keeps reading.
                            let len = self.text.len();
                            self.pos = len;
                            self.error(len, len, diagnostic_codes::UNTERMINATED_COMMENT, &[]);
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn scan_number(&mut self) -> SyntaxKind {
        while let Some(c) = self.peek_at(0) {
            match c {
                b'0'..=b'9' => self.token_value.push(c as char),
                b'_' => {}
                _ => break,
            }
            self.pos += 1;
        }
        SyntaxKind::IntLiteral
    }

    fn scan_identifier(&mut self) -> SyntaxKind {
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        let text = &self.text[self.token_start..self.pos];
        if let Some(keyword) = SyntaxKind::keyword(text) {
            return keyword;
        }
        self.token_value.push_str(text);
        SyntaxKind::Identifier
    }

    fn scan_string(&mut self) -> SyntaxKind {
        self.pos += 1;
        loop {
            let Some(c) = self.peek() else {
                self.unterminated_string();
                break;
            };
            match c {
                '"' => {
                    self.pos += 1;
                    break;
                }
                '\n' => {
                    self.unterminated_string();
                    break;
                }
                '\\' => self.scan_escape(),
                _ => {
                    self.token_value.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }
        SyntaxKind::StringLiteral
    }

    fn unterminated_string(&mut self) {
        let (start, end) = (self.token_start, self.pos);
        self.error(start, end, diagnostic_codes::UNTERMINATED_STRING, &[]);
    }

    fn scan_escape(&mut self) {
        let start = self.pos;
        self.pos += 1;
        let Some(c) = self.peek() else {
            return;
        };
        self.pos += c.len_utf8();
        let cooked = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            '0' => '\0',
            '\\' | '"' | '\'' | '$' => c,
            'u' => {
                let digits = self.text.get(self.pos..self.pos + 4).unwrap_or("");
                match u32::from_str_radix(digits, 16).ok().and_then(char::from_u32) {
                    Some(ch) if digits.len() == 4 => {
                        self.pos += 4;
                        ch
                    }
                    _ => {
                        let end = self.pos;
                        self.error(start, end, diagnostic_codes::INVALID_CHARACTER, &["\\u"]);
                        return;
                    }
                }
            }
            other => {
                let end = self.pos;
                let text = format!("\\{other}");
                self.error(start, end, diagnostic_codes::INVALID_CHARACTER, &[&text]);
                return;
            }
        };
        self.token_value.push(cooked);
    }

    fn scan_punctuation(&mut self, ch: char) -> SyntaxKind {
        let next = self.peek_at(1);
        let (kind, len) = match (ch, next) {
            ('(', _) => (SyntaxKind::OpenParen, 1),
            (')', _) => (SyntaxKind::CloseParen, 1),
            ('{', _) => (SyntaxKind::OpenBrace, 1),
            ('}', _) => (SyntaxKind::CloseBrace, 1),
            (',', _) => (SyntaxKind::Comma, 1),
            ('.', _) => (SyntaxKind::Dot, 1),
            (':', _) => (SyntaxKind::Colon, 1),
            (';', _) => (SyntaxKind::Semicolon, 1),
            ('+', _) => (SyntaxKind::Plus, 1),
            ('*', _) => (SyntaxKind::Asterisk, 1),
            ('/', _) => (SyntaxKind::Slash, 1),
            ('%', _) => (SyntaxKind::Percent, 1),
            ('-', Some(b'>')) => (SyntaxKind::Arrow, 2),
            ('-', _) => (SyntaxKind::Minus, 1),
            ('<', Some(b'=')) => (SyntaxKind::LessThanEquals, 2),
            ('<', _) => (SyntaxKind::LessThan, 1),
            ('>', Some(b'=')) => (SyntaxKind::GreaterThanEquals, 2),
            ('>', _) => (SyntaxKind::GreaterThan, 1),
            ('=', Some(b'=')) => (SyntaxKind::EqualsEquals, 2),
            ('=', _) => (SyntaxKind::Equals, 1),
            ('!', Some(b'=')) => (SyntaxKind::ExclamationEquals, 2),
            ('!', _) => (SyntaxKind::Exclamation, 1),
            ('?', Some(b':')) => (SyntaxKind::QuestionColon, 2),
            ('?', _) => (SyntaxKind::Question, 1),
            ('&', Some(b'&')) => (SyntaxKind::AmpersandAmpersand, 2),
            ('|', Some(b'|')) => (SyntaxKind::BarBar, 2),
            _ => {
                let start = self.pos;
                self.pos += ch.len_utf8();
                let end = self.pos;
                self.error(start, end, diagnostic_codes::INVALID_CHARACTER, &[&ch.to_string()]);
                return SyntaxKind::Unknown;
            }
        };
        self.pos += len;
        kind
    }
}

#[cfg(test)]
#[path = "../tests/scanner_tests.rs"]
mod scanner_tests;
