//! Atelier core - the transform and code generation studio.
//!
//! Takes the built AST through the static optimizer and emits the render
//! function body plus hoisted static render functions. Platform-specific
//! modules and directives plug in through the option surface; this crate
//! carries only the platform-neutral passes and the base directive
//! handlers (`v-bind`/`v-on` object forms, `v-cloak`).

pub mod codegen;
pub mod directives;
pub mod optimizer;

pub use codegen::events::gen_handlers;
pub use codegen::{generate, CodegenState, GeneratedRender, SkipFlags};
pub use directives::base_directives;
pub use optimizer::optimize;
