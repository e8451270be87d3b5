//! Centralised error hierarchy for the **Cox interpreter**.
//!
//! Every pipeline stage (scanner, parser, resolver, interpreter) converts its
//! failure modes into one of the variants defined here. Static stages hand
//! back a `Vec<CoxError>` alongside their best-effort output; the interpreter
//! stops at the first runtime error and returns it.
//!
//! The module **does not** print diagnostics itself

use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error, located at the offending token.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        line: usize,
        location: String,
    },

    /// Static‑analysis failure reported by the resolver.
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        line: usize,
        location: String,
    },

    /// Runtime evaluation error. Always attributed to a token's line.
    #[error("{message}\n[line {line}]")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
}

impl CoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        CoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        CoxError::Parse {
            message,
            line: token.line,
            location: location_of(token),
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        CoxError::Resolve {
            message,
            line: token.line,
            location: location_of(token),
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", token.line, message);

        CoxError::Runtime {
            message,
            line: token.line,
        }
    }

    /// Lexical, syntax and resolution errors. These map to exit code 65.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            CoxError::Lex { .. } | CoxError::Parse { .. } | CoxError::Resolve { .. }
        )
    }

    /// The bare message without the line prefix.
    pub fn message(&self) -> String {
        match self {
            CoxError::Lex { message, .. }
            | CoxError::Parse { message, .. }
            | CoxError::Resolve { message, .. }
            | CoxError::Runtime { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Source line, when the error carries one.
    pub fn line(&self) -> Option<usize> {
        match self {
            CoxError::Lex { line, .. }
            | CoxError::Parse { line, .. }
            | CoxError::Resolve { line, .. }
            | CoxError::Runtime { line, .. } => Some(*line),
            _ => None,
        }
    }
}

fn location_of(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, CoxError>;
