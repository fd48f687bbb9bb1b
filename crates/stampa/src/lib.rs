//! Stampa - a markup-template to render-function compiler.
//!
//! The facade over the pipeline crates: [`Compiler`] merges per-call
//! overrides onto a platform base configuration and drives scan/build,
//! optimize and generate; [`detect_errors`] re-validates every embedded
//! expression of a finished tree; [`RenderCache`] turns templates into
//! cached, validated render artifacts.
//!
//! ```
//! let result = stampa::compile("<div>{{ msg }}</div>");
//! assert_eq!(result.render, "with(this){return _c('div',[_v(_s(msg))])}");
//! ```

pub mod compile;
pub mod detect_errors;
pub mod to_render;

pub use compile::{CompileOverrides, CompiledResult, Compiler};
pub use detect_errors::detect_errors;
pub use to_render::{RenderArtifact, RenderCache};

pub use stampa_atelier_dom::base_options;
pub use stampa_relief::{
    AstNode, CompilerError, CompilerOptions, Diagnostic, ElementFlags, ElementNode, Severity,
    WhitespaceMode,
};

/// Compile with the web platform configuration and default options.
pub fn compile(template: &str) -> CompiledResult {
    Compiler::web().compile(template)
}
