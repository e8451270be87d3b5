//! Module `scanner` implements a one‑pass, streaming lexer for the Cox language.
//!
//! It transforms a source string into a sequence of [`Token`]s, skipping whitespace
//! and comments, and emitting exactly one `EOF` token at the end. Designed as a `FusedIterator`,
//! it can be chained safely with other iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str) -> Scanner<'a>`
//!   Create a new lexer over the input buffer.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token, CoxError>` on each `.next()`. Errors are reported in
//!   place and scanning continues with the next byte.
//!
//! - `scan(src) -> (Vec<Token>, Vec<CoxError>)`
//!   Drains a scanner, splitting tokens from diagnostics.
//!
//! # Token Recognition (`scan_token`)
//!
//! - Single‑character tokens: `(`, `)`, `{`, `}`, `[`, `]`, `,`, `.`, `;`, `:`, `?`, `^`, `~`.
//! - One‑or‑two character operators: `!=`, `==`, `<=`, `>=`, `<<`, `>>`, `&&`, `||`,
//!   `++`, `--`, `+=`, `-=`, `*=`, `/=`.
//! - Comments: `//` to end of line, `/* … */` up to the first `*/`.
//! - String literals: `"` … `"`; a backslash makes the next character part of
//!   the literal verbatim (no escape decoding).
//! - Interpolated strings: `$"…"` are handed to [`crate::interpolation`].
//! - Numeric literals: integer and optional fractional part.
//! - Identifiers/keywords: alphanumeric/_ sequences, resolved via a perfect‑hash `KEYWORDS` map.
//!
//! # Example
//!
//! ```rust
//! use cox::scanner::Scanner;
//!
//! let mut scanner = Scanner::new("print 123; // example");
//! for result in &mut scanner {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("{}", err),
//!     }
//! }
//! ```

use std::collections::VecDeque;
use std::iter::FusedIterator;

use crate::error::{CoxError, Result};
use crate::interpolation;
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::{memchr, memchr_iter, memmem};
use phf::phf_map;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"break"  => TokenType::BREAK,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"for"    => TokenType::FOR,
    b"func"   => TokenType::FUNC,
    b"if"     => TokenType::IF,
    b"null"   => TokenType::NULL,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// Scan a whole source unit, separating tokens from lexical errors.
pub fn scan(src: &str) -> (Vec<Token>, Vec<CoxError>) {
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<CoxError> = Vec::new();

    for item in Scanner::new(src) {
        match item {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    info!(
        "Scanned {} token(s) with {} error(s)",
        tokens.len(),
        errors.len()
    );

    (tokens, errors)
}

/// A single pass **scanner / lexer** that converts source text into a
/// sequence of [`Token`]s.
pub struct Scanner<'a> {
    text: &'a str,                      // entire source unit
    src: &'a [u8],                      // byte view of `text`
    start: usize,                       // index of the *first* byte of the current lexeme
    curr: usize,                        // index *one past* the last byte examined
    line: usize,                        // 1‑based line counter (\n increments)
    pending: Option<TokenType>,         // recognised token kind waiting to be emitted
    queued: VecDeque<Result<Token>>,    // burst produced by an interpolated string
    emit_eof: bool,                     // nested scans omit the EOF marker
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a str) -> Self {
        Self::with_line(src, 1)
    }

    /// Create a lexer whose line counter starts at `line`. Used for the
    /// expression segments of an interpolated string.
    pub fn with_line(src: &'a str, line: usize) -> Self {
        info!("Scanner created over {} bytes at line {}", src.len(), line);

        Self {
            text: src,
            src: src.as_bytes(),
            start: 0,
            curr: 0,
            line,
            pending: None,
            queued: VecDeque::new(),
            emit_eof: true,
        }
    }

    /// Do not emit the trailing `EOF` token.
    pub fn without_eof(mut self) -> Self {
        self.emit_eof = false;
        self
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    /// Return the length of the input slice.
    #[inline(always)]
    const fn len(&self) -> usize {
        self.src.len()
    }

    /// Are we at (or past) the end of input?
    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it.  *Panics* if called at EOF – higher‑level
    /// code always guards with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` if past EOF
    /// to avoid branching at call‑site.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.src[self.curr]
        }
    }

    /// Peek one byte beyond [`peek`].  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.src[self.curr + 1]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Pick between a one‑byte token and its `=`‑suffixed or doubled forms.
    #[inline]
    fn either(&mut self, expected: u8, matched: TokenType, otherwise: TokenType) -> TokenType {
        if self.match_byte(expected) {
            matched
        } else {
            otherwise
        }
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* token starting at `self.curr`.  If the lexeme produces an
    /// actual token the kind is stored in `self.pending`.  Whitespace and
    /// comments are skipped by returning `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        let tt: TokenType = match b {
            // ── single‑character punctuators ──────────────────────────────
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b'[' => TokenType::LEFT_BRACKET,
            b']' => TokenType::RIGHT_BRACKET,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b';' => TokenType::SEMICOLON,
            b':' => TokenType::COLON,
            b'?' => TokenType::QUESTION,
            b'^' => TokenType::BIT_XOR,
            b'~' => TokenType::BIT_NOT,

            // ── increment / compound assignment ──────────────────────────
            b'-' => {
                if self.match_byte(b'-') {
                    TokenType::MINUS_MINUS
                } else {
                    self.either(b'=', TokenType::MINUS_EQUAL, TokenType::MINUS)
                }
            }

            b'+' => {
                if self.match_byte(b'+') {
                    TokenType::PLUS_PLUS
                } else {
                    self.either(b'=', TokenType::PLUS_EQUAL, TokenType::PLUS)
                }
            }

            b'*' => self.either(b'=', TokenType::STAR_EQUAL, TokenType::STAR),

            // ── logical vs. bitwise (doubling decides) ───────────────────
            b'&' => self.either(b'&', TokenType::AND, TokenType::BIT_AND),
            b'|' => self.either(b'|', TokenType::OR, TokenType::BIT_OR),

            // ── comparison / equality / shifts ───────────────────────────
            b'!' => self.either(b'=', TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.either(b'=', TokenType::EQUAL_EQUAL, TokenType::EQUAL),

            b'<' => {
                if self.match_byte(b'<') {
                    TokenType::LEFT_SHIFT
                } else {
                    self.either(b'=', TokenType::LESS_EQUAL, TokenType::LESS)
                }
            }

            b'>' => {
                if self.match_byte(b'>') {
                    TokenType::RIGHT_SHIFT
                } else {
                    self.either(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER)
                }
            }

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => {
                return Ok(()); // skip insignificants
            }

            b'\n' => {
                self.line += 1; // track for diagnostics

                return Ok(());
            }

            // ── slash: '/=', comments, or division ───────────────────────
            b'/' => {
                if self.match_byte(b'=') {
                    TokenType::SLASH_EQUAL
                } else if self.match_byte(b'/') {
                    // Fast‑forward to next newline using `memchr`.
                    if let Some(pos) = memchr(b'\n', &self.src[self.curr..]) {
                        self.curr += pos;
                    } else {
                        self.curr = self.len();
                    }

                    return Ok(());
                } else if self.match_byte(b'*') {
                    return self.skip_block_comment();
                } else {
                    TokenType::SLASH
                }
            }

            // ── string literal " … " ─────────────────────────────────────
            b'"' => {
                return self.parse_string();
            }

            // ── interpolated string $" … " ───────────────────────────────
            b'$' => {
                return self.parse_interpolated();
            }

            // ── number literal (digit‑leading) ───────────────────────────
            b'0'..=b'9' => self.parse_number(),

            // ── identifiers / keywords (alpha or underscore‑leading) ─────
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.parse_identifier(),

            // ── unexpected character ─────────────────────────────────────
            _ => {
                // Step over the whole code point so one bad character yields one error.
                let c: char = self.text[self.start..].chars().next().unwrap_or('\u{FFFD}');
                self.curr = self.start + c.len_utf8();

                return Err(CoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", c),
                ));
            }
        };

        self.pending = Some(tt);

        Ok(())
    }

    /// Skip a `/* … */` comment. The comment ends at the first `*/`; nesting
    /// is not recognised.
    fn skip_block_comment(&mut self) -> Result<()> {
        let rest: &[u8] = &self.src[self.curr..];

        match memmem::find(rest, b"*/") {
            Some(pos) => {
                self.line += memchr_iter(b'\n', &rest[..pos]).count();
                self.curr += pos + 2;

                Ok(())
            }

            None => {
                self.line += memchr_iter(b'\n', rest).count();
                self.curr = self.len();

                Err(CoxError::lex(
                    self.line,
                    "Unterminated block comment, expected '*/'.",
                ))
            }
        }
    }

    /// Consume a string body up to and including the closing quote.
    ///
    /// A backslash makes the following byte part of the body whatever it is,
    /// so `\"` does not terminate the literal.
    fn consume_string_body(&mut self) -> Result<()> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.peek() == b'\\' {
                self.advance();

                if self.is_at_end() {
                    break;
                }
            }

            if self.advance() == b'\n' {
                self.line += 1; // multi‑line strings are allowed
            }
        }

        if self.is_at_end() {
            return Err(CoxError::lex(self.line, "Unterminated string."));
        }

        self.advance(); // consume closing quote

        Ok(())
    }

    /// Parse a double‑quoted string literal.
    ///
    /// * `self.start` still points to the opening `"`.
    /// * When we return, `self.curr` points **past** the closing `"`.
    fn parse_string(&mut self) -> Result<()> {
        self.consume_string_body()?;

        // Slice excluding the surrounding quotes.
        let s: &str = &self.text[self.start + 1..self.curr - 1];

        self.pending = Some(TokenType::STRING(s.to_owned()));

        Ok(())
    }

    /// Parse `$"…"`. The body is re-scanned by the interpolation pass and its
    /// tokens are queued for emission.
    fn parse_interpolated(&mut self) -> Result<()> {
        if !self.match_byte(b'"') {
            return Err(CoxError::lex(self.line, "Expected '\"' after '$'."));
        }

        let first_line: usize = self.line;

        self.consume_string_body()?;

        let body: &str = &self.text[self.start + 2..self.curr - 1];

        debug!("Interpolated string body on line {}: {:?}", first_line, body);

        self.queued.extend(interpolation::scan(body, first_line));

        Ok(())
    }

    /// Parse a numeric literal (`123`, `3.14`).  Fractions are optional.
    fn parse_number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // Optional fractional part.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let s: &str = &self.text[self.start..self.curr];
        let n: f64 = s.parse::<f64>().unwrap_or(0.0); // parse never fails (checked digits)

        TokenType::NUMBER(n)
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn parse_identifier(&mut self) -> TokenType {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let slice: &[u8] = &self.src[self.start..self.curr];

        KEYWORDS
            .get(slice)
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        // Loop until we either emit a token, hit EOF, or see an error.
        loop {
            // 1. Drain tokens produced by an interpolated string first.
            if let Some(item) = self.queued.pop_front() {
                return Some(item);
            }

            if self.curr > self.len() {
                return None; // already yielded EOF
            }

            // 2. EOF guard – emit exactly one EOF then terminate.
            if self.curr == self.len() {
                self.curr += 1; // ensure fused semantics

                if !self.emit_eof {
                    return None;
                }

                return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
            }

            // 3. Reset per‑token state.
            self.start = self.curr;
            self.pending = None;

            // 4. Attempt to scan a token.
            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            // 5. If a real token was recognised, build and return it.
            if let Some(tt) = self.pending.take() {
                let lex: &str = &self.text[self.start..self.curr];

                return Some(Ok(Token::new(tt, lex, self.line)));
            }
            // Otherwise it was whitespace / comment / a queued burst → continue loop.
        }
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
