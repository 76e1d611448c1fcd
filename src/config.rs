//! Compiler configuration.
//!
//! A builder-style `CompilerConfig` plus an optional TOML project file
//! merged underneath explicit CLI flags, using `serde` + `toml` for the
//! deserialization.

use std::path::PathBuf;

use serde::Deserialize;

/// Which pipeline stage to stop after, selected by `-s`/`-c` on the CLI.
/// `Executable` is the default: hand the `.o` to an external linker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitStage {
    Assembly,
    Object,
    #[default]
    Executable,
}

impl EmitStage {
    /// The default output filename for this stage, used when `-o` is
    /// omitted: `out.s`, `out.o`, `out.exe`.
    pub fn default_output_name(self) -> &'static str {
        match self {
            EmitStage::Assembly => "out.s",
            EmitStage::Object => "out.o",
            EmitStage::Executable => "out.exe",
        }
    }
}

/// Compiler configuration: the diagnostic cap, which stage to stop at, where
/// to write output, and the external assembler/linker to invoke for the
/// later stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Diagnostic print cap (configurable, default 10).
    pub max_errors: usize,
    pub emit_stage: EmitStage,
    pub output_path: Option<PathBuf>,
    /// External assembler invoked for `Object`/`Executable` stages.
    pub assembler: String,
    /// External linker invoked for the `Executable` stage.
    pub linker: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            max_errors: 10,
            emit_stage: EmitStage::default(),
            output_path: None,
            assembler: "nasm".to_string(),
            linker: "link".to_string(),
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors;
        self
    }

    pub fn with_emit_stage(mut self, emit_stage: EmitStage) -> Self {
        self.emit_stage = emit_stage;
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_assembler(mut self, assembler: impl Into<String>) -> Self {
        self.assembler = assembler.into();
        self
    }

    pub fn with_linker(mut self, linker: impl Into<String>) -> Self {
        self.linker = linker.into();
        self
    }

    /// Resolves the output path: the explicit `-o`, or this stage's default
    /// filename.
    pub fn resolved_output_path(&self) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.emit_stage.default_output_name()))
    }

    /// Merges an optional project-wide `mug.toml` underneath whatever's
    /// already set on `self` — fields this config already carries a
    /// non-default value for are left alone, so TOML only fills gaps
    /// underneath explicit CLI flags.
    pub fn merge_toml(mut self, toml: &ConfigFile) -> Self {
        if let Some(max_errors) = toml.max_errors {
            self.max_errors = max_errors;
        }
        if let Some(assembler) = &toml.assembler {
            self.assembler = assembler.clone();
        }
        if let Some(linker) = &toml.linker {
            self.linker = linker.clone();
        }
        self
    }
}

/// The on-disk shape of an optional `mug.toml` project file. All fields
/// optional: an absent file, or an absent field, just falls back to
/// [`CompilerConfig::default`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub max_errors: Option<usize>,
    pub assembler: Option<String>,
    pub linker: Option<String>,
}

impl ConfigFile {
    pub fn from_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.max_errors, 10);
        assert_eq!(config.emit_stage, EmitStage::Executable);
        assert_eq!(config.resolved_output_path(), PathBuf::from("out.exe"));
    }

    #[test]
    fn each_stage_has_its_own_default_output_name() {
        assert_eq!(EmitStage::Assembly.default_output_name(), "out.s");
        assert_eq!(EmitStage::Object.default_output_name(), "out.o");
        assert_eq!(EmitStage::Executable.default_output_name(), "out.exe");
    }

    #[test]
    fn explicit_output_path_overrides_the_stage_default() {
        let config = CompilerConfig::new()
            .with_emit_stage(EmitStage::Assembly)
            .with_output_path("foo.s");
        assert_eq!(config.resolved_output_path(), PathBuf::from("foo.s"));
    }

    #[test]
    fn toml_config_merges_underneath_existing_values() {
        let toml = ConfigFile::from_str("max_errors = 25\nassembler = \"yasm\"\n").unwrap();
        let config = CompilerConfig::new().merge_toml(&toml);
        assert_eq!(config.max_errors, 25);
        assert_eq!(config.assembler, "yasm");
        assert_eq!(config.linker, "link");
    }

    #[test]
    fn empty_toml_changes_nothing() {
        let toml = ConfigFile::from_str("").unwrap();
        let config = CompilerConfig::new().merge_toml(&toml);
        assert_eq!(config, CompilerConfig::default());
    }
}
