use std::fmt;

use thiserror::Error;

/// Builds an [`Error::InvalidSsa`] with the source location of the failed check.
macro_rules! invalid_ssa {
    // Single string version
    ($msg:expr) => {
        crate::Error::InvalidSsa {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::InvalidSsa {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

pub(crate) use invalid_ssa;

/// The external build step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainStage {
    /// Translating the emitted source into an object file.
    Compile,
    /// Linking the object file into a loadable shared library.
    Link,
}

impl fmt::Display for ToolchainStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolchainStage::Compile => write!(f, "compile"),
            ToolchainStage::Link => write!(f, "link"),
        }
    }
}

/// The generic Error type, which covers every failure a compilation can surface.
///
/// Two classes exist. Fatal errors abort the compilation because the input
/// exceeded a hard limit, the template is unusable, or the IR failed
/// verification. Recoverable errors come from the external toolchain; the
/// caller may fall back to interpreting the program instead.
///
/// # Error Categories
///
/// ## Fatal
/// - [`Error::NestingTooDeep`] - Construct stack overflow while building SSA
/// - [`Error::UnknownMarker`] - Template references a marker nobody provides
/// - [`Error::MalformedTemplate`] - Template ends inside a marker or the name is too long
/// - [`Error::InvalidSsa`] - Verification found a broken SSA invariant
///
/// ## Recoverable
/// - [`Error::Toolchain`] - The compiler or linker rejected the translation unit
/// - [`Error::Load`] - The shared library could not be loaded
/// - [`Error::FileError`] - Work directory I/O failed
///
/// # Examples
///
/// ```rust
/// use filterc::Error;
///
/// fn handle(result: filterc::Result<()>) {
///     match result {
///         Ok(()) => {}
///         Err(e) if e.is_recoverable() => eprintln!("falling back to interpreter: {e}"),
///         Err(e) => panic!("compilation aborted: {e}"),
///     }
/// }
/// # handle(Ok(()));
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// If/while constructs are nested deeper than the builder's construct stack allows.
    #[error("Construct nesting exceeds the maximum depth of {0}")]
    NestingTooDeep(usize),

    /// The template contains `$name` for a marker that has no substitution.
    #[error("Unknown template marker `${0}`")]
    UnknownMarker(String),

    /// The template could not be scanned.
    #[error("Malformed template - {0}")]
    MalformedTemplate(String),

    /// The IR violates SSA form or its use lists are out of sync.
    ///
    /// # Fields
    ///
    /// * `message` - Which check failed and on which value or statement
    /// * `file` - Source file of the failed check
    /// * `line` - Source line of the failed check
    #[error("Invalid SSA - {file}:{line}: {message}")]
    InvalidSsa {
        /// What the verifier found
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The external toolchain failed to build the translation unit.
    #[error("Toolchain {stage} step failed: {message}")]
    Toolchain {
        /// Which step failed
        stage: ToolchainStage,
        /// Captured diagnostic output
        message: String,
    },

    /// The built module could not be loaded or lacks the entry point.
    #[error("Failed to load compiled module - {0}")]
    Load(String),

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if the caller may fall back to another execution strategy.
    ///
    /// Only failures at the external toolchain boundary are recoverable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Toolchain { .. } | Error::Load(_) | Error::FileError(_)
        )
    }
}
