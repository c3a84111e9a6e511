//! Compiler core that turns a bound script into a graph of blocks and
//! wires.
//!
//! The pipeline is roughly:
//!
//!   bound tree (from an external binder)
//!     -> analysis  (call counts, recursion, scopes)
//!     -> lower     (labels + gotos, folding, dead code)
//!     -> extract   (effects hoisted out of expressions)
//!     -> inline    (call-site expansion)
//!     -> rename    (program-wide unique storage names)
//!     -> emit      (blocks, values and wires for a placer and builder)
//!
//! Parsing, binding, block placement and serialization live outside
//! this crate; see [`graph::Placer`] and [`graph::Builder`] for the
//! output side.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Bound tree: types, values, symbols
// ---------------------------------------------------------------------

pub mod types;
pub mod value;
pub mod symbols;
pub mod bound;
pub mod rewrite;
pub mod names;

// ---------------------------------------------------------------------
// Builtins and the block catalog
// ---------------------------------------------------------------------

pub mod builtins;
pub mod graph;
pub mod blocks;

// ---------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------

pub mod analysis;
pub mod cfg;
pub mod lower;
pub mod extract;
pub mod inline;
pub mod rename;
pub mod emit;

// ---------------------------------------------------------------------
// Configuration and orchestration
// ---------------------------------------------------------------------

pub mod config;
pub mod compiler;

#[cfg(test)]
mod interpret;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use analysis::AnalysisResult;
pub use compiler::{BoundProgram, CompilationArtifact, compile, prepare};
pub use config::{Capabilities, CompileOptions, EmitOptions, InlineMode};
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use error::CoreError;
