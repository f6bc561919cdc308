// xp - Command-line runner and REPL for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use xp_vm::{DEFAULT_STACK_CAPACITY, VM, VmConfig, disassemble};

/// Run XP programs, evaluate expressions, or start a REPL.
#[derive(Debug, Parser)]
#[command(name = "xp", version, about)]
struct Cli {
    /// Source file to run
    file: Option<PathBuf>,

    /// Evaluate an expression instead of a file
    #[arg(short, long, value_name = "EXPR", conflicts_with = "file")]
    eval: Option<String>,

    /// Print the disassembled bytecode before running
    #[arg(short, long)]
    disassemble: bool,

    /// Operand stack capacity, in values
    #[arg(long, value_name = "N", default_value_t = DEFAULT_STACK_CAPACITY)]
    stack_size: usize,

    /// Increase log verbosity (-v debug, -vv trace). XP_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut vm = VM::with_config(VmConfig {
        stack_capacity: cli.stack_size,
    });

    if let Some(source) = &cli.eval {
        return run_source(&mut vm, source, cli.disassemble);
    }
    if let Some(path) = &cli.file {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Error reading '{}'", path.display()))?;
        return run_source(&mut vm, &source, cli.disassemble)
            .with_context(|| format!("Error in '{}'", path.display()));
    }
    run_repl(&mut vm, cli.disassemble)
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("XP_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Compile and run one program, printing its value.
fn run_source(vm: &mut VM, source: &str, show_code: bool) -> anyhow::Result<()> {
    let code = vm.compile(source)?;
    if show_code {
        println!("{}", disassemble(&code, Some(vm.globals())));
    }
    let result = vm.run(code)?;
    println!("{}", result);
    Ok(())
}

/// Run the interactive REPL. Every line shares the same VM, so globals persist.
fn run_repl(vm: &mut VM, show_code: bool) -> anyhow::Result<()> {
    println!("XP v{}", env!("CARGO_PKG_VERSION"));
    let mut editor = DefaultEditor::new()?;

    loop {
        match editor.readline("xp> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                if let Err(e) = run_source(vm, line, show_code) {
                    eprintln!("Error: {}", e);
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    debug!("leaving REPL");
    Ok(())
}
