use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use quill::ast_printer::AstPrinter;
use quill::interpreter::Interpreter;
use quill::parser::Parser;
use quill::resolver::Resolver;
use quill::scanner::Scanner;
use quill::stmt::Stmt;
use quill::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Quill language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Emit the token stream as JSON instead of plain text
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file and prints the AST of each statement
    Parse { filename: Option<PathBuf> },

    /// Runs input from a file as a Quill program
    Run { filename: Option<PathBuf> },

    /// Starts an interactive prompt
    Repl,
}

/// Reads the contents of a file into a Vec<u8> through a memory map.
fn read_file(filename: &PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let metadata = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?;

    // zero-length files cannot be mapped
    if metadata.len() == 0 {
        return Ok(Vec::new());
    }

    let mmap =
        unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    info!("Mapped {} bytes from {:?}", mmap.len(), filename);

    Ok(mmap.to_vec())
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with timestamp and source line
    Builder::new()
        .format(|buf, record| {
            // Strip 'quill::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("quill::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{} {}:{}] - {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Scan a whole buffer, reporting lexical errors as they occur.
fn scan_source(source: &[u8]) -> (Vec<Token>, bool) {
    let mut tokens = Vec::new();
    let mut had_error = false;

    for result in Scanner::new(source) {
        match result {
            Ok(token) => {
                debug!("Scanned token: {}", token);
                tokens.push(token);
            }

            Err(error) => {
                had_error = true;
                debug!("Lex error: {}", error);
                eprintln!("{}", error);
            }
        }
    }

    (tokens, had_error)
}

/// Parse a token stream, reporting every syntax error.
fn parse_tokens(parser: &mut Parser) -> (Vec<Stmt>, bool) {
    let statements = parser.parse();

    let had_error = !parser.errors().is_empty();
    for error in parser.errors() {
        eprintln!("{}", error);
    }

    (statements, had_error)
}

/// Full scan → parse → resolve → interpret pipeline for a source file.
/// Exit code 65 for static errors, 70 for runtime errors.
fn run_program(source: &[u8]) {
    let (tokens, had_lex_error) = scan_source(source);
    if had_lex_error {
        debug!("Lexing failed, exiting with code 65");
        std::process::exit(65);
    }

    let mut parser = Parser::new(tokens);
    let (statements, had_parse_error) = parse_tokens(&mut parser);
    if had_parse_error {
        debug!("Parsing failed, exiting with code 65");
        std::process::exit(65);
    }

    let mut resolver = Resolver::new();
    resolver.resolve(&statements);
    let (locals, resolve_errors) = resolver.finish();

    if !resolve_errors.is_empty() {
        for error in &resolve_errors {
            eprintln!("{}", error);
        }
        debug!("Resolution failed, exiting with code 65");
        std::process::exit(65);
    }

    let mut interpreter = Interpreter::new();
    interpreter.resolve(locals);

    match interpreter.interpret(&statements) {
        Ok(()) => {
            info!("Program executed successfully");
        }

        Err(error) => {
            debug!("Runtime error: {}", error);
            eprintln!("{}", error);
            std::process::exit(70);
        }
    }
}

/// Interactive prompt sharing one persistent interpreter. Static errors are
/// reported and the session continues; an empty line or end of input exits.
fn run_prompt() -> Result<()> {
    info!("Starting REPL");

    let mut interpreter = Interpreter::new();
    let mut next_id = 0;
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let line = line.trim_end();
        if line.is_empty() {
            break;
        }

        let (tokens, had_lex_error) = scan_source(line.as_bytes());
        if had_lex_error {
            continue;
        }

        // ids keep increasing across lines so resolved bindings from
        // earlier lines are never clobbered
        let mut parser = Parser::with_id_base(tokens, next_id);
        let (statements, had_parse_error) = parse_tokens(&mut parser);
        next_id = parser.next_id();
        if had_parse_error {
            continue;
        }

        let mut resolver = Resolver::new();
        resolver.resolve(&statements);
        let (locals, resolve_errors) = resolver.finish();

        if !resolve_errors.is_empty() {
            for error in &resolve_errors {
                eprintln!("{}", error);
            }
            continue;
        }

        interpreter.resolve(locals);

        if let Err(error) = interpreter.interpret(&statements) {
            eprintln!("{}", error);
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => match filename {
            Some(filename) => {
                info!("Running Tokenize subcommand");

                let buf = read_file(&filename)?;
                let (tokens, had_error) = scan_source(&buf);

                if json {
                    println!("{}", serde_json::to_string_pretty(&tokens)?);
                } else {
                    for token in &tokens {
                        println!("{}", token);
                    }
                }

                if had_error {
                    debug!("Tokenization failed, exiting with code 65");
                    std::process::exit(65);
                }

                info!("Tokenization completed successfully");
            }

            None => {
                info!("No filepath provided for Tokenize");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Parse { filename } => match filename {
            Some(filename) => {
                info!("Running Parse subcommand");

                let buf = read_file(&filename)?;
                let (tokens, had_lex_error) = scan_source(&buf);
                if had_lex_error {
                    std::process::exit(65);
                }

                let mut parser = Parser::new(tokens);
                let (statements, had_parse_error) = parse_tokens(&mut parser);
                if had_parse_error {
                    std::process::exit(65);
                }

                for statement in &statements {
                    println!("{}", AstPrinter::print_stmt(statement));
                }

                info!("Parse subcommand completed");
            }

            None => {
                info!("No filepath provided for Parse");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Run { filename } => match filename {
            Some(filename) => {
                info!("Running Run subcommand");

                let buf = read_file(&filename)?;
                run_program(&buf);
            }

            None => {
                info!("No filepath provided for Run");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Repl => {
            run_prompt()?;
        }
    }

    Ok(())
}
