//! mug CLI
//!
//! Command-line driver for the compiler: `mug [-s|-c] [-o <out>] <source>`.
//! `-o`/`-p` are the only real flags, an unrecognized flag prints a warning
//! and is otherwise ignored, and a second positional argument is a hard
//! error.
//!
//! Built on `clap`'s derive API. Two behaviours need help clap's derive
//! macros don't give for free:
//!
//! - **"later `-s`/`-c` wins"** is exactly what clap's `overrides_with`
//!   attribute models — each flag names the other as the argument it
//!   overrides, and clap resolves the winner by the order they appeared on
//!   the command line, not by declaration order.
//! - **"unrecognized flag warns instead of erroring"** has no clap
//!   attribute at all, since clap's whole job is to turn unknown flags into
//!   hard errors. [`strip_unknown_flags`] runs a narrow pre-pass that only
//!   recognizes the three flags this CLI defines and warns-and-drops
//!   anything else shaped like a flag, before the (now-clean) argument list
//!   reaches clap for the real parse.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use mug::{CompileError, CompilerConfig, EmitStage};

/// `mug [-s|-c] [-o <out>] <source>` — a single-binary compiler CLI.
#[derive(ClapParser, Debug)]
#[command(name = "mug", version, about = "Compiles a source file to x86-64 NASM assembly")]
struct Cli {
    /// Stop after emitting NASM assembly (out.s by default).
    #[arg(short = 's', overrides_with = "object")]
    assembly: bool,

    /// Stop after assembling an object file (out.o by default).
    #[arg(short = 'c', overrides_with = "assembly")]
    object: bool,

    /// Write output here instead of the stage's default name.
    #[arg(short = 'o', value_name = "OUT")]
    output: Option<PathBuf>,

    /// Source file to compile.
    source: Option<PathBuf>,
}

impl Cli {
    fn emit_stage(&self) -> EmitStage {
        if self.object {
            EmitStage::Object
        } else if self.assembly {
            EmitStage::Assembly
        } else {
            EmitStage::Executable
        }
    }
}

/// The only flags this CLI understands. Anything else starting with `-` is
/// warned about and dropped before clap ever sees it, so an unrecognized
/// flag yields a warning and is ignored rather than a hard parse error.
const KNOWN_FLAGS: [&str; 3] = ["-s", "-c", "-o"];

/// Drops any `-x`-shaped argument clap wasn't told about, printing a warning
/// for each. `-o`'s attached-value form (`-ofoo.s`) and its separate-value
/// form (`-o foo.s`) are both recognized by prefix; the latter's value token
/// is left alone since it doesn't itself start with `-`.
fn strip_unknown_flags(args: Vec<String>) -> Vec<String> {
    args.into_iter()
        .filter(|arg| {
            if !arg.starts_with('-') || arg == "-" {
                return true;
            }
            let known = KNOWN_FLAGS.iter().any(|k| arg == k) || arg.starts_with("-o");
            if !known {
                eprintln!("warning: unrecognized parameter {arg}");
            }
            known
        })
        .collect()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let raw_args: Vec<String> = std::env::args().collect();
    if raw_args.len() < 2 {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        let _ = cmd.print_help();
        println!();
        return ExitCode::SUCCESS;
    }

    let mut args = vec![raw_args[0].clone()];
    args.extend(strip_unknown_flags(raw_args[1..].to_vec()));

    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(err) => {
            eprint!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let Some(source) = cli.source.clone() else {
        eprintln!("error: source file not given");
        return ExitCode::FAILURE;
    };

    let mut config = CompilerConfig::new().with_emit_stage(cli.emit_stage());
    if let Some(path) = cli.output.clone() {
        config = config.with_output_path(path);
    }

    match mug::compile_file(&source, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ CompileError::Io { .. }) | Err(err @ CompileError::Toolchain { .. }) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
        Err(err) => {
            // Diagnostics/CodeGen failures are reported by the library
            // itself; the process still exits 0 in that case.
            eprintln!("error: {err}");
            ExitCode::SUCCESS
        }
    }
}
