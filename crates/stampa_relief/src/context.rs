//! Per-compile transform context.
//!
//! One context is created per compile invocation and threaded through the
//! builder, module hooks and directive handlers. It replaces the original
//! implementation's file-scope mutable state.

use stampa_carton::{SourceRange, String};

use crate::errors::Diagnostic;
use crate::options::CompilerOptions;

pub struct TransformContext<'o> {
    pub options: &'o CompilerOptions,
    pub diagnostics: Vec<Diagnostic>,
    /// Inside a `v-pre` subtree: directive interpretation disabled.
    pub in_v_pre: bool,
    /// Inside a whitespace-preserving element.
    pub in_pre: bool,
    /// Loop aliases of enclosing `v-for` elements, innermost last.
    pub for_aliases: Vec<String>,
    warned_root: bool,
}

impl<'o> TransformContext<'o> {
    pub fn new(options: &'o CompilerOptions) -> Self {
        Self {
            options,
            diagnostics: Vec::new(),
            in_v_pre: false,
            in_pre: false,
            for_aliases: Vec::new(),
            warned_root: false,
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        if let Some(sink) = self.options.on_warn {
            sink(&diagnostic);
        }
        self.diagnostics.push(diagnostic);
    }

    fn ranged(&self, range: SourceRange) -> Option<SourceRange> {
        self.options.output_source_range.then_some(range)
    }

    pub fn warn(&mut self, message: impl Into<std::string::String>, range: SourceRange) {
        let range = self.ranged(range);
        self.report(Diagnostic::error(message, range));
    }

    pub fn tip(&mut self, message: impl Into<std::string::String>, range: SourceRange) {
        let range = self.ranged(range);
        self.report(Diagnostic::tip(message, range));
    }

    /// Root-shape problems are reported once per compile, whichever
    /// candidate root triggers them first.
    pub fn warn_once(&mut self, message: impl Into<std::string::String>, range: SourceRange) {
        if !self.warned_root {
            self.warned_root = true;
            self.warn(message, range);
        }
    }

    /// Whether an expression refers to an alias of any enclosing `v-for`.
    pub fn is_for_alias(&self, expr: &str) -> bool {
        self.for_aliases.iter().any(|a| a.as_str() == expr)
    }
}
