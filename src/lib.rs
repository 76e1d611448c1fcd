//! mug — AOT compiler for a small statically typed imperative language.
//!
//! Reads one source file and lowers it through the pipeline:
//! `Tokens → Parser → AST → TypeChecker → IR → (RegAlloc ⟷ Emitter) → .s`.
//! This crate owns that pipeline only; the assembler and linker stages
//! (`-c`/default executable mode) are driven as external processes rather
//! than reimplemented.
//!
//! # Example
//!
//! ```rust,ignore
//! use mug::{CompilerConfig, EmitStage, compile_file};
//! use std::path::Path;
//!
//! let config = CompilerConfig::new().with_emit_stage(EmitStage::Assembly);
//! compile_file(Path::new("hello.mug"), &config)?;
//! ```

pub mod arena;
pub mod ast;
pub mod config;
pub mod emit;
pub mod error;
pub mod intern;
pub mod ir;
pub mod parser;
pub mod regalloc;
pub mod scope;
pub mod token;
pub mod typechecker;
pub mod types;

pub use ast::Program;
pub use config::{CompilerConfig, ConfigFile, EmitStage};
pub use error::{CompileError, Diagnostic, ErrorContext};
pub use ir::{gen_ir, Ir};
pub use parser::Parser;
pub use typechecker::TypeChecker;

use std::fs;
use std::path::Path;
use std::process::Command;

use crate::arena::Arena;
use crate::intern::Interner;

/// Compiles a source file per `config`, writing output to
/// [`CompilerConfig::resolved_output_path`].
///
/// Stops on first failure: parsing halts at its first syntax error, type
/// checking at its first semantic error, and neither IR generation nor
/// emission runs if either predecessor produced any diagnostics. That case
/// still returns `Ok(())` — the diagnostics themselves are not a process
/// failure, only I/O and usage errors are.
pub fn compile_file(source_path: &Path, config: &CompilerConfig) -> Result<(), CompileError> {
    let source = fs::read_to_string(source_path).map_err(|source| CompileError::Io {
        path: source_path.to_path_buf(),
        source,
    })?;
    compile_source(&source, config)
}

/// As [`compile_file`], but takes source text directly (used by the test
/// suite and by [`compile_file`] itself).
pub fn compile_source(source: &str, config: &CompilerConfig) -> Result<(), CompileError> {
    let arena = Arena::new();
    let mut interner = Interner::new();

    let tokens = {
        let _span = tracing::debug_span!("lex").entered();
        let tokens = token::tokenize(source, &mut interner);
        tracing::debug!(count = tokens.len(), "tokenized");
        tokens
    };

    let (program, parse_errors) = {
        let _span = tracing::debug_span!("parse").entered();
        let parser = Parser::new(tokens, &arena, config.max_errors);
        let (program, errors) = parser.parse();
        tracing::debug!(
            top_level = program.top_level.len(),
            errors = errors.count(),
            "parsed"
        );
        (program, errors)
    };
    if parse_errors.has_errors() {
        report_diagnostics(&parse_errors);
        return Ok(());
    }

    let check_errors = {
        let _span = tracing::debug_span!("check").entered();
        let checker = TypeChecker::new(&mut interner, config.max_errors);
        let errors = checker.check(&program);
        tracing::debug!(errors = errors.count(), "type checked");
        errors
    };
    if check_errors.has_errors() {
        report_diagnostics(&check_errors);
        return Ok(());
    }

    let ir = {
        let _span = tracing::debug_span!("gen_ir").entered();
        let ir = gen_ir(&program, &mut interner);
        tracing::info!(routines = ir.routines.len(), "generated IR");
        ir
    };

    let asm = {
        let _span = tracing::debug_span!("gen_asm").entered();
        let asm = emit::Emitter::new(&interner).emit_program(&ir);
        tracing::info!(bytes = asm.len(), "emitted assembly");
        asm
    };

    write_output(&asm, config)
}

fn report_diagnostics(errors: &ErrorContext) {
    let mut buf = String::new();
    let _ = errors.print_to(&mut buf);
    eprint!("{buf}");
}

fn write_output(asm: &str, config: &CompilerConfig) -> Result<(), CompileError> {
    match config.emit_stage {
        EmitStage::Assembly => {
            let path = config.resolved_output_path();
            fs::write(&path, asm).map_err(|source| CompileError::Io { path, source })
        }
        EmitStage::Object => {
            let obj_path = config.resolved_output_path();
            let asm_path = obj_path.with_extension("s");
            write_asm(&asm_path, asm)?;
            run_assembler(config, &asm_path, &obj_path)
        }
        EmitStage::Executable => {
            let exe_path = config.resolved_output_path();
            let asm_path = exe_path.with_extension("s");
            let obj_path = exe_path.with_extension("o");
            write_asm(&asm_path, asm)?;
            run_assembler(config, &asm_path, &obj_path)?;
            run_linker(config, &obj_path, &exe_path)
        }
    }
}

fn write_asm(path: &Path, asm: &str) -> Result<(), CompileError> {
    fs::write(path, asm).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Assembles `input` into `output` via the configured external assembler
/// (default `nasm`, Windows x64 object format). Invoked, not reimplemented.
fn run_assembler(config: &CompilerConfig, input: &Path, output: &Path) -> Result<(), CompileError> {
    let status = Command::new(&config.assembler)
        .arg("-f")
        .arg("win64")
        .arg("-o")
        .arg(output)
        .arg(input)
        .status()
        .map_err(|e| CompileError::Toolchain {
            tool: config.assembler.clone(),
            detail: e.to_string(),
        })?;
    if !status.success() {
        return Err(CompileError::Toolchain {
            tool: config.assembler.clone(),
            detail: format!("exited with {status}"),
        });
    }
    Ok(())
}

/// Links `input` into `output` via the configured external linker (default
/// `link`). Invoked, not reimplemented.
fn run_linker(config: &CompilerConfig, input: &Path, output: &Path) -> Result<(), CompileError> {
    let status = Command::new(&config.linker)
        .arg(input)
        .arg(format!("/OUT:{}", output.display()))
        .status()
        .map_err(|e| CompileError::Toolchain {
            tool: config.linker.clone(),
            detail: e.to_string(),
        })?;
    if !status.success() {
        return Err(CompileError::Toolchain {
            tool: config.linker.clone(),
            detail: format!("exited with {status}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn assembly_stage_writes_a_dot_s_file_and_nothing_else() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("hello.s");
        let config = CompilerConfig::new()
            .with_emit_stage(EmitStage::Assembly)
            .with_output_path(out.clone());
        compile_source("function main() -> int { return 0; }", &config).unwrap();
        let text = fs::read_to_string(&out).unwrap();
        assert!(text.contains("global main"));
        assert!(!dir.path().join("hello.o").exists());
    }

    #[test]
    fn diagnostics_suppress_output_but_still_return_ok() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("bad.s");
        let config = CompilerConfig::new()
            .with_emit_stage(EmitStage::Assembly)
            .with_output_path(out.clone());
        let result = compile_source("function f() { return 1; }", &config);
        assert!(result.is_ok());
        assert!(!out.exists());
    }

    #[test]
    fn missing_source_file_is_an_io_error() {
        let config = CompilerConfig::new();
        let result = compile_file(Path::new("/nonexistent/path/does-not-exist.mug"), &config);
        assert!(matches!(result, Err(CompileError::Io { .. })));
    }
}
