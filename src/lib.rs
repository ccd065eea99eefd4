//! A code generator that compiles a Protocol Buffers descriptor set into
//! static-allocation-friendly field descriptor tables, in the style of the
//! nanopb generator: per-field storage-class decisions, symbolic
//! worst-case encoded sizes, and deterministic C header/source emission.

pub mod annotations;
pub mod cli;
pub mod descriptor;
pub mod driver;
pub mod emit;
pub mod error;
pub mod model;
pub mod name;
pub mod options_file;
pub mod plugin;
pub mod size;
pub mod toposort;

pub use error::{Error, Result};
