use std::{io::Write, path::Path};

use clap::{Args, Parser, Subcommand};
use rustc_hash::FxHashMap;

use lark::{
    interpreter::{Interpreter, RuntimeError, SystemHost},
    parser, tokenizer,
};

#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Repl)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a .lark source file.
    Run(RunArgs),
    /// Interpret one line at a time.
    Repl,
}

#[derive(Debug, Args)]
struct RunArgs {
    file: String,
}

fn main() {
    let args = Cli::parse();

    match args.command() {
        Command::Repl => {
            repl_command();
        }
        Command::Run(args) => {
            run_command(args);
        }
    }
}

fn run_command(args: &RunArgs) {
    let source = match std::fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Cannot read {}: {}", args.file, e);
            std::process::exit(1);
        }
    };

    match interpret(&source, sibling_sources(Path::new(&args.file))) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Every `.lark` file next to the entry file is importable by its stem.
fn sibling_sources(file: &Path) -> FxHashMap<String, String> {
    let mut sources = FxHashMap::default();

    let dir = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Ok(entries) = std::fs::read_dir(dir) else {
        return sources;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "lark") {
            if let (Some(name), Ok(text)) = (
                path.file_name().and_then(|name| name.to_str()),
                std::fs::read_to_string(&path),
            ) {
                sources.insert(name.to_string(), text);
            }
        }
    }

    sources
}

fn repl_command() {
    println!("Welcome to the Lark REPL!");
    println!("EOF to exit. (Ctrl+D on *nix, Ctrl+Z on Windows)");

    loop {
        let mut input = String::new();

        print!("> ");
        std::io::stdout()
            .flush()
            .expect("should be able to flush stdout");

        let read = std::io::stdin()
            .read_line(&mut input)
            .expect("should be able to read line from stdin");

        if read == 0 {
            break;
        }

        let source = input.trim();
        if source.is_empty() {
            continue;
        }
        match interpret(source, FxHashMap::default()) {
            Ok(output) => {
                if !output.is_empty() {
                    println!("{}", output);
                }
            }
            Err(e) => {
                println!("Error: {}", e)
            }
        }
    }
}

fn interpret(source: &str, sources: FxHashMap<String, String>) -> Result<String, RuntimeError> {
    let tokens = tokenizer::tokens(source);
    let program = parser::program(&tokens)?;
    let mut interpreter = Interpreter::new(sources, Box::new(SystemHost));
    interpreter.run(&program)
}
