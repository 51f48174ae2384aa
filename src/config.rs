//! Configuration for the filter compiler.
//!
//! This module provides configuration types for controlling the compilation
//! pipeline: pass selection and iteration limits ([`CompilerConfig`]),
//! template constants and storage naming of the generated C code
//! ([`EmitConfig`]) and the external compiler invocation ([`ToolchainConfig`]).

use std::{collections::HashMap, path::PathBuf};

/// Configuration for the compilation pipeline.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Maximum nesting of if/while constructs (default: 64).
    pub max_nesting_depth: usize,

    /// Check SSA well-formedness and use lists after construction and
    /// after optimization (default: true).
    pub verify_ssa: bool,

    /// Log the IR at debug level after construction and after optimization
    /// (default: false).
    pub dump_ir: bool,

    /// Maximum iterations of the optimization pass sequence (default: 16).
    pub max_pass_iterations: usize,

    /// Enable the color fusion pass.
    pub enable_color_fusion: bool,

    /// Enable the copy propagation pass.
    pub enable_copy_propagation: bool,

    /// Enable the dead code elimination pass.
    pub enable_dead_code_elimination: bool,

    /// Enable invariance analysis.
    ///
    /// When disabled every value is classified fully variant, so all code
    /// lands in the per-element region and nothing is cached.
    pub enable_invariance_analysis: bool,

    /// Settings of the generated C code.
    pub emit: EmitConfig,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 64,
            verify_ssa: true,
            dump_ir: false,
            max_pass_iterations: 16,
            enable_color_fusion: true,
            enable_copy_propagation: true,
            enable_dead_code_elimination: true,
            enable_invariance_analysis: true,
            emit: EmitConfig::default(),
        }
    }
}

impl CompilerConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that translates without optimizing.
    ///
    /// All passes and the invariance analysis are off; verification stays on.
    #[must_use]
    pub fn unoptimized() -> Self {
        Self {
            enable_color_fusion: false,
            enable_copy_propagation: false,
            enable_dead_code_elimination: false,
            enable_invariance_analysis: false,
            ..Self::default()
        }
    }

    /// Returns true if any optimization pass is enabled.
    #[must_use]
    pub fn any_pass_enabled(&self) -> bool {
        self.enable_color_fusion
            || self.enable_copy_propagation
            || self.enable_dead_code_elimination
    }
}

/// Settings of the generated C code.
#[derive(Debug, Clone)]
pub struct EmitConfig {
    /// Maximum tuple length, substituted for `$l` (default: 9).
    pub tuple_length: usize,

    /// Points of a user curve table, substituted for `$p` (default: 1024).
    pub curve_points: usize,

    /// Points of a user gradient table, substituted for `$q` (default: 1024).
    pub gradient_points: usize,

    /// Access prefix of values cached once per invocation (default: `xy_vars->`).
    pub xy_prefix: String,

    /// Access prefix of values cached per column (default: `y_vars->`).
    pub y_prefix: String,

    /// Access prefix of values cached per row (default: empty, they are
    /// locals of the row scope).
    pub x_prefix: String,

    /// Host-specific markers substituted verbatim, such as platform flags.
    pub extra_markers: HashMap<String, String>,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            tuple_length: 9,
            curve_points: 1024,
            gradient_points: 1024,
            xy_prefix: "xy_vars->".to_string(),
            y_prefix: "y_vars->".to_string(),
            x_prefix: String::new(),
            extra_markers: HashMap::new(),
        }
    }
}

impl EmitConfig {
    /// Adds a host-specific marker, builder style.
    #[must_use]
    pub fn with_marker(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_markers.insert(name.into(), value.into());
        self
    }
}

/// Configuration of the external C toolchain.
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    /// Compiler command (default: `cc`).
    pub compiler: String,

    /// Flags compiling the translation unit to an object (default: `-O2 -c -fPIC`).
    pub compile_flags: Vec<String>,

    /// Flags linking the object into a shared library (default: `-shared`).
    pub link_flags: Vec<String>,

    /// Directory receiving the source, object and library.
    ///
    /// Defaults to the system temp directory.
    pub work_dir: Option<PathBuf>,

    /// Stem of the generated file names (default: `filter`).
    pub file_stem: String,

    /// Symbol the loaded library is entered through (default: `filter_init`).
    pub entry_symbol: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: "cc".to_string(),
            compile_flags: vec!["-O2".to_string(), "-c".to_string(), "-fPIC".to_string()],
            link_flags: vec!["-shared".to_string()],
            work_dir: None,
            file_stem: "filter".to_string(),
            entry_symbol: "filter_init".to_string(),
        }
    }
}

impl ToolchainConfig {
    /// The directory files are written to.
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
