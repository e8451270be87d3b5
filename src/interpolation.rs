//! Second scanning pass for interpolated strings.
//!
//! The main scanner hands over the raw body of a `$"…"` literal. This pass
//! splits it into literal runs and `{…}` expression segments and produces:
//!
//! ```text
//! INTERPOLATION_START  STRING  LEFT_BRACE …segment tokens… RIGHT_BRACE  STRING …  INTERPOLATION_END
//! ```
//!
//! Segment tokens come from a nested [`Scanner`] over the segment text
//! (braces included), so `{value,alignment:format}` reaches the parser as
//! ordinary tokens. A segment ends at the first `}`.
//!
//! Inside literal runs `{{` stands for a single `{`, and a backslash keeps
//! the following character verbatim (it never opens a segment).

use log::debug;
use memchr::{memchr, memchr_iter};

use crate::error::{CoxError, Result};
use crate::scanner::Scanner;
use crate::token::{Token, TokenType};

/// Scan the body of an interpolated string that started on `line`.
pub fn scan(body: &str, line: usize) -> Vec<Result<Token>> {
    InterpolationScanner::new(body, line).run()
}

struct InterpolationScanner<'a> {
    text: &'a str,
    curr: usize,
    line: usize,
    run: String,
    run_start: usize,
    run_line: usize,
    out: Vec<Result<Token>>,
}

impl<'a> InterpolationScanner<'a> {
    fn new(text: &'a str, line: usize) -> Self {
        Self {
            text,
            curr: 0,
            line,
            run: String::new(),
            run_start: 0,
            run_line: line,
            out: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Result<Token>> {
        self.out
            .push(Ok(Token::new(TokenType::INTERPOLATION_START, "$\"", self.line)));

        let bytes: &[u8] = self.text.as_bytes();

        while self.curr < bytes.len() {
            match bytes[self.curr] {
                b'\\' => {
                    self.push_char(); // the backslash itself

                    if self.curr < bytes.len() {
                        self.push_char(); // escaped character, verbatim
                    }
                }

                b'{' if bytes.get(self.curr + 1) == Some(&b'{') => {
                    self.run.push('{');
                    self.curr += 2;
                }

                b'{' => {
                    self.flush_run();

                    if !self.segment() {
                        break;
                    }
                }

                _ => self.push_char(),
            }
        }

        self.flush_run();

        self.out
            .push(Ok(Token::new(TokenType::INTERPOLATION_END, "\"", self.line)));

        debug!("Interpolation produced {} item(s)", self.out.len());

        self.out
    }

    /// Append the character at `curr` to the current literal run.
    fn push_char(&mut self) {
        if let Some(c) = self.text[self.curr..].chars().next() {
            if c == '\n' {
                self.line += 1;
            }

            self.run.push(c);
            self.curr += c.len_utf8();
        }
    }

    /// Emit the pending literal run as a `STRING` token, if any.
    fn flush_run(&mut self) {
        if !self.run.is_empty() {
            let raw: &str = &self.text[self.run_start..self.curr];
            let value: String = std::mem::take(&mut self.run);

            self.out.push(Ok(Token::new(
                TokenType::STRING(value),
                raw,
                self.run_line,
            )));
        }

        self.run_start = self.curr;
        self.run_line = self.line;
    }

    /// Re-scan one `{…}` segment. Returns `false` when the segment is
    /// unterminated and the rest of the body was consumed.
    fn segment(&mut self) -> bool {
        let rest: &[u8] = &self.text.as_bytes()[self.curr..];

        let Some(close) = memchr(b'}', rest) else {
            self.out.push(Err(CoxError::lex(
                self.line,
                "Unterminated interpolation segment, expected '}'.",
            )));
            self.curr = self.text.len();
            self.run_start = self.curr;

            return false;
        };

        let segment: &str = &self.text[self.curr..self.curr + close + 1];

        debug!("Re-scanning interpolation segment {:?}", segment);

        self.out
            .extend(Scanner::with_line(segment, self.line).without_eof());

        self.line += memchr_iter(b'\n', segment.as_bytes()).count();
        self.curr += close + 1;
        self.run_start = self.curr;
        self.run_line = self.line;

        true
    }
}
