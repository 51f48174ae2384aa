//! From analyzed SSA to a loadable module.
//!
//! - [`slice`] marks the statements each code region needs
//! - [`emit`] prints regions and declarations as C
//! - [`template`] splices them into the host's C template
//! - [`toolchain`] compiles and links the result

pub mod emit;
pub mod slice;
pub mod template;
pub mod toolchain;

pub use emit::{is_value_needed, CEmitter};
pub use template::{expand_template, MAX_MARKER_LENGTH};
pub use toolchain::{CcToolchain, CompiledModule, ModuleLoader, Toolchain};
