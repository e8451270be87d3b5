//! One source unit through the whole pipeline:
//! Scan → Parse → Resolve → Interpret.
//!
//! A [`Session`] owns a single interpreter, so globals defined by one unit
//! stay visible to the next (the REPL runs each line as its own unit).

use std::io::Write;

use log::{debug, info};
use thiserror::Error;

use crate::error::CoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::resolve;
use crate::scanner::scan;

/// Exit code for lexical, syntax and resolution errors.
pub const EXIT_STATIC: i32 = 65;

/// Exit code for runtime errors.
pub const EXIT_RUNTIME: i32 = 70;

/// Why a unit did not run to completion.
#[derive(Debug, Error)]
pub enum RunError {
    /// Every static error found in the unit. Nothing was executed.
    #[error("{} static error(s)", .0.len())]
    Static(Vec<CoxError>),

    /// The first runtime error. Execution of the unit stopped there.
    #[error(transparent)]
    Runtime(CoxError),
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Static(_) => EXIT_STATIC,
            RunError::Runtime(_) => EXIT_RUNTIME,
        }
    }

    /// The individual diagnostics, in report order.
    pub fn errors(&self) -> Vec<&CoxError> {
        match self {
            RunError::Static(errors) => errors.iter().collect(),
            RunError::Runtime(error) => vec![error],
        }
    }
}

pub struct Session {
    interpreter: Interpreter,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            interpreter: Interpreter::new(),
        }
    }

    /// A session whose `print` output goes to `out`.
    pub fn with_writer<W: Write + 'static>(out: W) -> Self {
        Session {
            interpreter: Interpreter::with_writer(out),
        }
    }

    pub fn run(&mut self, source: &str) -> Result<(), RunError> {
        info!("Running unit of {} byte(s)", source.len());

        let (tokens, mut errors) = scan(source);
        debug!("Scanned {} token(s)", tokens.len());

        let (statements, parse_errors) = Parser::new(tokens).parse();
        errors.extend(parse_errors);

        // Resolution needs a well-formed tree.
        if !errors.is_empty() {
            return Err(RunError::Static(errors));
        }

        let (locals, resolve_errors) = resolve(&statements);

        if !resolve_errors.is_empty() {
            return Err(RunError::Static(resolve_errors));
        }

        self.interpreter
            .interpret(&statements, locals)
            .map_err(RunError::Runtime)
    }
}
