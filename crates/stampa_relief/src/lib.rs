//! Relief - The sculptured AST surface for stampa templates.
//!
//! This crate defines the template AST, the compiler options, the strategy
//! traits third parties extend (`CompileModule`, `DirectiveHandler`), and
//! the diagnostics types threaded through every stage.

pub mod ast;
pub mod context;
pub mod errors;
pub mod options;

pub use ast::*;
pub use context::TransformContext;
pub use errors::{CompilerError, Diagnostic, Severity};
pub use options::{CompileModule, CompilerOptions, DirectiveHandler, WhitespaceMode};
