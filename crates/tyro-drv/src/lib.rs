//! The `tyro` command-line driver: argument parsing, source reading, and
//! dispatch across the pipeline's partial-run flags and the full `run`
//! path.

use std::io::Read as _;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tyro_bc::render_ir;
use tyro_par::ParseError;
use tyro_util::error::{LexerError, ParserError, StaticError, VMError};
use tyro_vm::VM;

/// `tyro [option] [file]` — at most one of the mode flags may be given;
/// their absence means "run the program."
#[derive(Parser, Debug)]
#[command(name = "tyro")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Lexer, parser, checker, and VM for the tyro language")]
struct Cli {
    /// Display token information and stop.
    #[arg(long, conflicts_with_all = ["parse", "print", "check", "ir"])]
    lex: bool,

    /// Check for syntax errors and stop.
    #[arg(long, conflicts_with_all = ["lex", "print", "check", "ir"])]
    parse: bool,

    /// Pretty-print the parsed program and stop.
    #[arg(long, conflicts_with_all = ["lex", "parse", "check", "ir"])]
    print: bool,

    /// Statically check the program and stop.
    #[arg(long, conflicts_with_all = ["lex", "parse", "print", "ir"])]
    check: bool,

    /// Print the compiled bytecode and stop.
    #[arg(long, conflicts_with_all = ["lex", "parse", "print", "check"])]
    ir: bool,

    /// Source file to read; standard input is used when omitted.
    file: Option<PathBuf>,
}

/// Every failure the driver can report, each labeled `"<Label> Error:
/// <message>"`.
#[derive(Debug)]
enum DriverError {
    Lexer(LexerError),
    Parser(ParserError),
    Static(StaticError),
    Vm(VMError),
    Usage(String),
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverError::Lexer(e) => write!(f, "Lexer Error: {e}"),
            DriverError::Parser(e) => write!(f, "Parser Error: {e}"),
            DriverError::Static(e) => write!(f, "Static Error: {e}"),
            DriverError::Vm(e) => write!(f, "VM Error: {e}"),
            DriverError::Usage(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<ParseError> for DriverError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Lex(e) => DriverError::Lexer(e),
            ParseError::Syntax(e) => DriverError::Parser(e),
        }
    }
}

impl From<StaticError> for DriverError {
    fn from(e: StaticError) -> Self {
        DriverError::Static(e)
    }
}

impl From<VMError> for DriverError {
    fn from(e: VMError) -> Self {
        DriverError::Vm(e)
    }
}

/// Parses arguments, reads the source, runs the selected pipeline stage,
/// and returns the process exit code. `clap` itself handles `--help`/
/// `--version` (exit 0) and malformed argument usage (exit 2) before this
/// ever runs.
pub fn run() -> i32 {
    init_logging();
    let cli = Cli::parse();

    let source = match read_source(cli.file.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let result = if cli.lex {
        run_lex(&source)
    } else if cli.parse {
        run_parse(&source)
    } else if cli.print {
        run_print(&source)
    } else if cli.check {
        run_check(&source)
    } else if cli.ir {
        run_ir(&source)
    } else {
        run_program(&source)
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off")))
        .with_target(false)
        .try_init();
}

fn read_source(file: Option<&std::path::Path>) -> Result<String, DriverError> {
    match file {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            DriverError::Usage(format!("error: cannot read '{}': {e}", path.display()))
        }),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| DriverError::Usage(format!("error: cannot read standard input: {e}")))?;
            Ok(buf)
        }
    }
}

fn run_lex(source: &str) -> Result<(), DriverError> {
    let mut lexer = tyro_lex::Lexer::new(source);
    loop {
        let token = lexer.next_token().map_err(DriverError::Lexer)?;
        let is_eos = token.kind == tyro_lex::TokenKind::Eos;
        println!("{token}");
        if is_eos {
            break;
        }
    }
    tracing::debug!("lex complete");
    Ok(())
}

fn run_parse(source: &str) -> Result<(), DriverError> {
    tyro_par::parse(source)?;
    tracing::debug!("parse complete");
    Ok(())
}

fn run_print(source: &str) -> Result<(), DriverError> {
    let program = tyro_par::parse(source)?;
    print!("{}", tyro_par::pretty_print(&program));
    Ok(())
}

fn run_check(source: &str) -> Result<(), DriverError> {
    let program = tyro_par::parse(source)?;
    tyro_sem::check_program(&program)?;
    tracing::debug!("check complete");
    Ok(())
}

fn run_ir(source: &str) -> Result<(), DriverError> {
    let program = tyro_par::parse(source)?;
    let checked = tyro_sem::check_program(&program)?;
    let frames = tyro_bc::generate(&program, &checked);
    tracing::debug!(frame_count = frames.len(), "codegen complete");
    println!("{}", render_ir(&frames));
    Ok(())
}

fn run_program(source: &str) -> Result<(), DriverError> {
    let program = tyro_par::parse(source)?;
    let checked = tyro_sem::check_program(&program)?;
    let frames = tyro_bc::generate(&program, &checked);
    tracing::debug!(frame_count = frames.len(), "codegen complete");
    let mut vm = VM::new(frames);
    vm.run()?;
    tracing::debug!("vm halted");
    Ok(())
}
