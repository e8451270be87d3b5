use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use cox::ast::Stmt;
use cox::ast_printer::AstPrinter;
use cox::error::CoxError;
use cox::parser::Parser;
use cox::runner::{RunError, Session, EXIT_RUNTIME, EXIT_STATIC};
use cox::scanner::{scan, Scanner};
use cox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Cox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to a file
    #[arg(long, global = true)]
    log: bool,

    /// Where log records go when --log is given
    #[arg(long, global = true, default_value = "cox.log")]
    log_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a file, printing one token per line
    Tokenize {
        filename: PathBuf,

        /// Print tokens as JSON objects
        #[arg(long)]
        json: bool,
    },

    /// Parses a file and prints the program back as source
    Parse { filename: PathBuf },

    /// Runs a file as a Cox program; starts the REPL without one
    Run { filename: Option<PathBuf> },
}

/// Maps the file and validates it as UTF‑8.
fn read_source(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file: File =
        File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    let len: u64 = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();

    // Zero-length mappings are rejected on some platforms.
    if len == 0 {
        info!("{:?} is empty", filename);
        return Ok(String::new());
    }

    // SAFETY: the map is read once, immediately copied, and dropped before
    // anything else could observe a concurrent truncation.
    let map: Mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map file {:?}", filename))?;

    let text: &str = std::str::from_utf8(&map)
        .map_err(CoxError::from)
        .with_context(|| format!("File {:?} is not valid UTF-8", filename))?;

    info!("Read {} bytes from {:?}", len, filename);

    Ok(text.to_owned())
}

fn init_logger(path: &Path) -> Result<()> {
    let log_file: File =
        File::create(path).with_context(|| format!("Failed to create {:?}", path))?;

    Builder::new()
        .format(|buf, record| {
            let module: &str = record.module_path().unwrap_or("<unnamed>");
            let module: &str = module.strip_prefix("cox::").unwrap_or(module);

            writeln!(
                buf,
                "{} [{}:{}] - {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Debug) // RUST_LOG overrides
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to {:?}", path);

    Ok(())
}

fn report<'a>(errors: impl IntoIterator<Item = &'a CoxError>) {
    for error in errors {
        debug!("Reporting: {}", error);
        eprintln!("{}", error);
    }
}

fn tokenize(filename: &Path, json: bool) -> Result<u8> {
    let source: String = read_source(filename)?;
    let mut tokenized: bool = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => {
                if json {
                    println!("{}", serde_json::to_string(&token)?);
                } else {
                    println!("{}", token);
                }
            }

            Err(e) => {
                tokenized = false;
                report([&e]);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC);
        return Ok(EXIT_STATIC as u8);
    }

    info!("Tokenization completed successfully");

    Ok(0)
}

fn parse(filename: &Path) -> Result<u8> {
    let source: String = read_source(filename)?;

    let (tokens, mut errors): (Vec<Token>, Vec<CoxError>) = scan(&source);
    let (statements, parse_errors): (Vec<Stmt>, Vec<CoxError>) = Parser::new(tokens).parse();
    errors.extend(parse_errors);

    if !errors.is_empty() {
        report(&errors);
        return Ok(EXIT_STATIC as u8);
    }

    print!("{}", AstPrinter::new().print_program(&statements));

    info!("Parse subcommand completed");

    Ok(0)
}

fn run_file(filename: &Path) -> Result<u8> {
    let source: String = read_source(filename)?;

    // For logging only
    info!("Provided input:\n {}", source);

    match Session::new().run(&source) {
        Ok(()) => {
            info!("Program executed successfully");
            Ok(0)
        }

        Err(e) => {
            report(e.errors());
            Ok(e.exit_code() as u8)
        }
    }
}

/// One line per unit; a blank line or end of input leaves. Static errors
/// only affect their own line, a runtime error marks the whole session.
fn repl() -> Result<u8> {
    info!("Starting REPL");

    let mut session: Session = Session::new();
    let mut had_runtime_error: bool = false;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        let line: String = match lines.next() {
            Some(line) => line.context("Failed to read from stdin")?,
            None => break,
        };

        if line.trim().is_empty() {
            break;
        }

        if let Err(e) = session.run(&line) {
            report(e.errors());

            if let RunError::Runtime(_) = e {
                had_runtime_error = true;
            }
        }
    }

    info!("Leaving REPL");

    Ok(if had_runtime_error {
        EXIT_RUNTIME as u8
    } else {
        0
    })
}

fn main() -> Result<ExitCode> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger(&args.log_file)?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    let code: u8 = match &args.commands {
        Some(Commands::Tokenize { filename, json }) => tokenize(filename, *json)?,
        Some(Commands::Parse { filename }) => parse(filename)?,
        Some(Commands::Run {
            filename: Some(filename),
        }) => run_file(filename)?,
        Some(Commands::Run { filename: None }) | None => repl()?,
    };

    Ok(ExitCode::from(code))
}
