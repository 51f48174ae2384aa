//! Handoff of the translation unit to an external C toolchain.
//!
//! [`CcToolchain`] writes the source into the work directory, compiles it to
//! an object and links a shared library, the way a `cc`-compatible driver
//! does. Loading the library and resolving its entry point is up to the
//! host, through a [`ModuleLoader`].
//!
//! Every failure in here is recoverable: the host can still interpret the
//! filter instead. A failed build leaves nothing behind in the work
//! directory; a successful one leaves the source and the library until
//! [`CompiledModule::remove`].

use std::{
    fs, io,
    path::{Path, PathBuf},
    process::Command,
    sync::atomic::{AtomicUsize, Ordering},
};

use tracing::{debug, info, warn};

use crate::{config::ToolchainConfig, error::ToolchainStage, Error, Result};

static NEXT_MODULE: AtomicUsize = AtomicUsize::new(1);

/// A shared library built from a translation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledModule {
    /// The shared library.
    pub library: PathBuf,
    /// The translation unit it was built from, kept for inspection.
    pub source: PathBuf,
    /// Symbol the library is entered through.
    pub entry_symbol: String,
}

impl CompiledModule {
    /// Deletes the library and the source from the work directory.
    ///
    /// Call this once the host has unloaded the module.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileError`] if a file exists but cannot be removed.
    pub fn remove(self) -> Result<()> {
        remove_artifact(&self.library)?;
        remove_artifact(&self.source)?;
        Ok(())
    }
}

/// Removes a build file; one that is already gone is not an error.
fn remove_artifact(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Removes build files after a build, logging the ones that stay behind.
fn discard_artifacts(paths: &[&Path]) {
    for path in paths {
        if let Err(e) = remove_artifact(path) {
            warn!(path = %path.display(), error = %e, "cannot remove build artifact");
        }
    }
}

/// Builds a loadable module from C source.
pub trait Toolchain {
    /// Compiles and links `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Toolchain`] when a build step fails and
    /// [`Error::FileError`] when the work directory is not writable.
    fn build(&self, source: &str) -> Result<CompiledModule>;
}

/// Loads a built module and resolves its entry point. Implemented by the host.
pub trait ModuleLoader {
    /// The host's handle to a loaded filter.
    type Module;

    /// Loads `module`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] when the library cannot be opened or lacks
    /// the entry symbol.
    fn load(&self, module: &CompiledModule) -> Result<Self::Module>;
}

/// A toolchain driving a `cc`-compatible compiler command.
#[derive(Debug, Clone, Default)]
pub struct CcToolchain {
    config: ToolchainConfig,
}

impl CcToolchain {
    /// Creates a toolchain with the given settings.
    #[must_use]
    pub fn new(config: ToolchainConfig) -> Self {
        CcToolchain { config }
    }

    /// The settings in use.
    #[must_use]
    pub fn config(&self) -> &ToolchainConfig {
        &self.config
    }

    fn run(&self, stage: ToolchainStage, flags: &[String], output: &Path, input: &Path) -> Result<()> {
        let compiler = &self.config.compiler;
        debug!(%stage, compiler = %compiler, output = %output.display(), "running toolchain");

        let result = Command::new(compiler)
            .args(flags)
            .arg("-o")
            .arg(output)
            .arg(input)
            .output()
            .map_err(|e| Error::Toolchain {
                stage,
                message: format!("cannot run `{compiler}`: {e}"),
            })?;

        if result.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&result.stderr);
        let message = match stderr.trim() {
            "" => format!("`{compiler}` exited with {}", result.status),
            diagnostics => diagnostics.to_string(),
        };
        Err(Error::Toolchain { stage, message })
    }
}

impl Toolchain for CcToolchain {
    fn build(&self, source: &str) -> Result<CompiledModule> {
        let dir = self.config.work_dir();
        fs::create_dir_all(&dir)?;

        let stem = format!(
            "{}{}_{}",
            self.config.file_stem,
            std::process::id(),
            NEXT_MODULE.fetch_add(1, Ordering::Relaxed)
        );
        let source_path = dir.join(format!("{stem}.c"));
        let object_path = dir.join(format!("{stem}.o"));
        let library_path = dir.join(format!("{stem}.so"));

        fs::write(&source_path, source)?;
        let built = self
            .run(
                ToolchainStage::Compile,
                &self.config.compile_flags,
                &object_path,
                &source_path,
            )
            .and_then(|()| {
                self.run(
                    ToolchainStage::Link,
                    &self.config.link_flags,
                    &library_path,
                    &object_path,
                )
            });

        if let Err(err) = built {
            discard_artifacts(&[
                object_path.as_path(),
                library_path.as_path(),
                source_path.as_path(),
            ]);
            return Err(err);
        }
        discard_artifacts(&[object_path.as_path()]);

        info!(library = %library_path.display(), "filter module built");
        Ok(CompiledModule {
            library: library_path,
            source: source_path,
            entry_symbol: self.config.entry_symbol.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toolchain(compiler: &str, dir: &Path) -> CcToolchain {
        CcToolchain::new(ToolchainConfig {
            compiler: compiler.to_string(),
            work_dir: Some(dir.to_path_buf()),
            ..ToolchainConfig::default()
        })
    }

    #[test]
    fn test_missing_compiler_is_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let err = toolchain("filterc-no-such-compiler", dir.path())
            .build("int x;\n")
            .unwrap_err();

        assert!(err.is_recoverable());
        assert!(matches!(
            err,
            Error::Toolchain {
                stage: ToolchainStage::Compile,
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_compiler_reports_stage() {
        let dir = tempfile::tempdir().unwrap();
        let err = toolchain("false", dir.path()).build("int x;\n").unwrap_err();
        match err {
            Error::Toolchain { stage, message } => {
                assert_eq!(stage, ToolchainStage::Compile);
                assert!(message.contains("exited with"));
            }
            other => panic!("expected toolchain error, got {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_source_lands_in_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let module = toolchain("true", dir.path()).build("int x;\n").unwrap();

        assert_eq!(fs::read_to_string(&module.source).unwrap(), "int x;\n");
        assert!(module.library.starts_with(dir.path()));
        assert_eq!(module.library.extension().unwrap(), "so");
        assert_eq!(module.entry_symbol, "filter_init");
    }

    fn files_in(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_build_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        toolchain("false", dir.path()).build("int x;\n").unwrap_err();
        assert_eq!(files_in(dir.path()), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_removed_module_clears_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let module = toolchain("true", dir.path()).build("int x;\n").unwrap();
        // `true` writes no library; removal still succeeds
        assert_eq!(files_in(dir.path()), 1);
        module.remove().unwrap();
        assert_eq!(files_in(dir.path()), 0);
    }

    #[test]
    fn test_missing_artifact_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone.o");
        remove_artifact(&gone).unwrap();
        discard_artifacts(&[gone.as_path()]);
    }
}
