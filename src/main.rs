mod ast;
mod error;
mod interpreter;
mod lexer;
mod parser;
mod types;

use clap::Parser;
use interpreter::Interpreter;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "es1", version, about = "A first-edition ECMAScript interpreter")]
struct Cli {
    /// Script file to execute
    file: Option<PathBuf>,

    /// Evaluate inline source
    #[arg(short = 'e', long = "eval")]
    eval: Option<String>,
}

fn execute(source: &str, file: &str) -> ExitCode {
    let program = match parser::parse(source, file) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(1);
        }
    };
    let mut interp = Interpreter::new(&program);
    match interp.run(&program) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.render());
            ExitCode::from(1)
        }
    }
}

fn run_file(path: &Path) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {e}", path.display());
            return ExitCode::from(1);
        }
    };
    execute(&source, &path.display().to_string())
}

fn run_repl() -> ExitCode {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("es1 v{}", env!("CARGO_PKG_VERSION"));
    println!("Type statements. Press Ctrl-D to exit.");

    let empty = ast::Program { body: Vec::new() };
    let mut interp = Interpreter::new(&empty);

    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let program = match parser::parse(trimmed, "repl") {
                    Ok(p) => p,
                    Err(e) => {
                        eprintln!("{e}");
                        continue;
                    }
                };
                interp.hoist_program(&program);
                for s in &program.body {
                    println!("{s}");
                    match interp.eval_statement(s) {
                        Ok(c) => println!("{}", c.value()),
                        Err(e) => {
                            eprintln!("{}", e.render());
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                eprintln!("Read error: {e}");
                return ExitCode::from(1);
            }
        }
    }

    println!();
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if let Some(code) = &cli.eval {
        return execute(code, "eval");
    }

    if let Some(path) = &cli.file {
        return run_file(path);
    }

    run_repl()
}
