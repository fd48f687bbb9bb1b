//! Armature - The structural parser framework for stampa templates.
//!
//! The forgiving tag scanner, the interpolation and filter parsers, and the
//! AST builder with its directive-processing rules live here.

pub mod builder;
pub mod filter_parser;
pub mod helpers;
pub mod model;
pub mod scanner;
pub mod text_parser;

pub use builder::{build_template, process_element, AstBuilder};
pub use filter_parser::parse_filters;
pub use model::{gen_assignment_code, parse_model, ModelParseResult};
pub use scanner::{scan_template, OpenTag, ScanSink, TagScanner};
pub use text_parser::{parse_text, TextParseResult};
