//! Module `scanner` implements a one‑pass, streaming UTF‑8 lexer for the Quill language.
//!
//! It transforms a byte slice (`&[u8]`) into a sequence of [`Token`]s, skipping whitespace
//! and comments, and emitting exactly one `EOF` token at the end. Designed as a `FusedIterator`,
//! it can be chained safely with other iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a [u8]) -> Scanner<'a>`
//!   Create a new lexer over the input buffer.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token, QuillError>` on each `.next()`, where `Ok(token)` is a scanned
//!   token and `Err` reports a lexing error with line information.
//!
//! # Core Phases
//!
//! 1. **Skipping**: whitespace, newlines (incrementing the line counter), and `//`
//!    comments (bulk-skipped to the next newline via `memchr`).
//! 2. **Recognition**: single and double character operators, string literals
//!    (multi-line allowed, unterminated reported), numeric literals with an optional
//!    fractional part, identifiers/keywords resolved through a perfect‑hash map.
//! 3. **Emission**: one token per call with an owned lexeme slice; a sole `EOF`
//!    token at end of input, then `None` forever.

use crate::error::{QuillError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// A single pass **scanner / lexer** that converts raw UTF‑8 bytes into a
/// sequence of [`Token`]s. Lexemes are copied out of the buffer, so the
/// emitted tokens own their text.
pub struct Scanner<'a> {
    src: &'a [u8],  // entire source file (memory‑mapped by the driver)
    start: usize,   // index of the *first* byte of the current lexeme
    curr: usize,    // index *one past* the last byte examined
    line: usize,    // 1‑based line counter (\n increments)
    finished: bool, // EOF token already emitted
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a [u8]) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
            finished: false,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.src.len()
    }

    #[inline(always)]
    fn peek(&self) -> Option<u8> {
        self.src.get(self.curr).copied()
    }

    #[inline(always)]
    fn peek_next(&self) -> Option<u8> {
        self.src.get(self.curr + 1).copied()
    }

    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let byte = self.src[self.curr];
        self.curr += 1;
        byte
    }

    /// Consume the next byte if it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.curr += 1;
            true
        } else {
            false
        }
    }

    // ───────────────────────────── skipping ─────────────────────────────────

    /// Skip whitespace and `//` comments. Newlines bump the line counter;
    /// comments are bulk-skipped with `memchr`.
    fn skip_ignored(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\r') | Some(b'\t') => {
                    self.curr += 1;
                }

                Some(b'\n') => {
                    self.curr += 1;
                    self.line += 1;
                }

                Some(b'/') if self.peek_next() == Some(b'/') => {
                    match memchr(b'\n', &self.src[self.curr..]) {
                        // leave the newline for the next loop iteration
                        Some(offset) => self.curr += offset,
                        None => self.curr = self.src.len(),
                    }
                }

                _ => break,
            }
        }
    }

    // ───────────────────────────── literals ─────────────────────────────────

    /// Scan a string literal. The opening quote is already consumed.
    /// Multi-line strings are allowed; escapes are not interpreted.
    fn string(&mut self) -> Result<TokenType> {
        while let Some(byte) = self.peek() {
            match byte {
                b'"' => {
                    self.curr += 1;
                    let content = &self.src[self.start + 1..self.curr - 1];
                    return Ok(TokenType::STRING(
                        String::from_utf8_lossy(content).into_owned(),
                    ));
                }

                b'\n' => {
                    self.line += 1;
                    self.curr += 1;
                }

                _ => self.curr += 1,
            }
        }

        Err(QuillError::lex(self.line, "Unterminated string."))
    }

    /// Scan a numeric literal: integer part plus optional fraction. A
    /// trailing `.` without a digit after it is left for the `DOT` token.
    fn number(&mut self) -> TokenType {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.curr += 1;
        }

        if self.peek() == Some(b'.') && matches!(self.peek_next(), Some(b'0'..=b'9')) {
            self.curr += 1;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.curr += 1;
            }
        }

        let lexeme = std::str::from_utf8(&self.src[self.start..self.curr]).unwrap_or("0");
        TokenType::NUMBER(lexeme.parse().unwrap_or(0.0))
    }

    /// Scan an identifier or keyword.
    fn identifier(&mut self) -> TokenType {
        while matches!(
            self.peek(),
            Some(b'a'..=b'z') | Some(b'A'..=b'Z') | Some(b'0'..=b'9') | Some(b'_')
        ) {
            self.curr += 1;
        }

        match KEYWORDS.get(&self.src[self.start..self.curr]) {
            Some(keyword) => keyword.clone(),
            None => TokenType::IDENTIFIER,
        }
    }

    /// Take the current lexeme out of the buffer.
    fn lexeme(&self) -> String {
        String::from_utf8_lossy(&self.src[self.start..self.curr]).into_owned()
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_ignored();
        self.start = self.curr;

        if self.is_at_end() {
            if self.finished {
                return None;
            }
            self.finished = true;

            debug!("Emitting EOF at line {}", self.line);

            return Some(Ok(Token::new(TokenType::EOF, String::new(), self.line)));
        }

        let byte = self.advance();
        let token_type = match byte {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            // '//' comments never reach this point; see skip_ignored
            b'/' => TokenType::SLASH,

            b'!' => {
                if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                }
            }

            b'=' => {
                if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                }
            }

            b'<' => {
                if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                }
            }

            b'>' => {
                if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                }
            }

            b'"' => match self.string() {
                Ok(token_type) => token_type,
                Err(error) => return Some(Err(error)),
            },

            b'0'..=b'9' => self.number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            other => {
                return Some(Err(QuillError::lex(
                    self.line,
                    format!("Unexpected character: {}", other as char),
                )));
            }
        };

        Some(Ok(Token::new(token_type, self.lexeme(), self.line)))
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
