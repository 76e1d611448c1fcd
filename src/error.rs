//! Error types shared across the pipeline.
//!
//! A small enum with a hand-written `Display`/`std::error::Error` impl and
//! `From` conversions for `?`-propagation, rather than pulling in
//! `anyhow`/`thiserror`.

use std::fmt;
use std::path::PathBuf;

/// One compiler diagnostic: a syntax or semantic error at a source location.
///
/// Formatted by [`ErrorContext`] as `error:<line>:<column>: <message>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(line: u32, column: u32, message: impl Into<String>) -> Self {
        Diagnostic {
            line,
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error:{}:{}: {}", self.line, self.column, self.message)
    }
}

/// Accumulates diagnostics during parsing and type checking.
///
/// Counts every error pushed but only *prints* up to `max_print` of them
/// (default 10), so a source file with thousands of errors doesn't flood
/// the terminal.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    errors: Vec<Diagnostic>,
    max_print: usize,
}

impl ErrorContext {
    pub fn new(max_print: usize) -> Self {
        ErrorContext {
            errors: Vec::new(),
            max_print,
        }
    }

    pub fn push(&mut self, line: u32, column: u32, message: impl Into<String>) {
        self.errors.push(Diagnostic::new(line, column, message));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn count(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    /// Writes up to `max_print` diagnostics to `out`, then a summary line if
    /// any were suppressed.
    pub fn print_to(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        for diag in self.errors.iter().take(self.max_print) {
            writeln!(out, "{diag}")?;
        }
        if self.errors.len() > self.max_print {
            writeln!(
                out,
                "...{} more error(s) not shown",
                self.errors.len() - self.max_print
            )?;
        }
        Ok(())
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        ErrorContext::new(10)
    }
}

/// Top-level failure of a `compile_file`/`compile_file_with_config` call.
#[derive(Debug)]
pub enum CompileError {
    /// Source file could not be read.
    Io { path: PathBuf, source: std::io::Error },
    /// Lexing, parsing, or type checking produced one or more diagnostics.
    Diagnostics(ErrorContext),
    /// Code generation failed for a reason that isn't a user-facing source
    /// diagnostic (e.g. an internal invariant was violated).
    CodeGen(String),
    /// Invoking `nasm`/the linker failed or returned non-zero.
    Toolchain { tool: String, detail: String },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Io { path, source } => {
                write!(f, "could not read {}: {}", path.display(), source)
            }
            CompileError::Diagnostics(ec) => {
                let mut buf = String::new();
                let _ = ec.print_to(&mut buf);
                write!(f, "{buf}")
            }
            CompileError::CodeGen(msg) => write!(f, "codegen error: {msg}"),
            CompileError::Toolchain { tool, detail } => {
                write!(f, "{tool} failed: {detail}")
            }
        }
    }
}

impl std::error::Error for CompileError {}

impl From<ErrorContext> for CompileError {
    fn from(ec: ErrorContext) -> Self {
        CompileError::Diagnostics(ec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_formats_like_original_prefix() {
        let d = Diagnostic::new(3, 7, "unexpected token");
        assert_eq!(d.to_string(), "error:3:7: unexpected token");
    }

    #[test]
    fn error_context_caps_printed_errors() {
        let mut ec = ErrorContext::new(2);
        for i in 0..5 {
            ec.push(i, 0, "boom");
        }
        assert_eq!(ec.count(), 5);
        let mut buf = String::new();
        ec.print_to(&mut buf).unwrap();
        assert_eq!(buf.lines().count(), 3); // 2 errors + summary line
    }

    #[test]
    fn empty_context_has_no_errors() {
        let ec = ErrorContext::default();
        assert!(!ec.has_errors());
    }
}
