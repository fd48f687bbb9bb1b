//! Compiler options and extension traits.
//!
//! Platform behavior enters the compiler exclusively through this surface:
//! predicates as plain function pointers, plus named strategy objects for
//! module hooks and compile-time directives.

use std::sync::Arc;

use stampa_carton::{FxHashMap, String};

use crate::ast::{Directive, ElementNode};
use crate::context::TransformContext;

/// Whitespace handling strategy for text between tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhitespaceMode {
    /// Collapse whitespace-only text nodes, drop the ones containing
    /// newlines.
    #[default]
    Condense,
    /// Keep whitespace-only text as a single space.
    Preserve,
}

/// A cross-cutting compile module. Hooks run in registration order at the
/// documented points of the build/codegen pipeline.
pub trait CompileModule: Send + Sync {
    /// Runs before structural directive processing. May return a
    /// replacement element that takes the original's place.
    fn pre_transform(
        &self,
        _el: &mut ElementNode,
        _cx: &mut TransformContext<'_>,
    ) -> Option<ElementNode> {
        None
    }

    /// Runs during generic attribute processing, before `process_attrs`.
    fn transform(&self, _el: &mut ElementNode, _cx: &mut TransformContext<'_>) {}

    /// Runs after the element is closed and fully processed.
    fn post_transform(&self, _el: &mut ElementNode, _cx: &mut TransformContext<'_>) {}

    /// Contributes `key: value,` fragments to the element's data object.
    fn gen_data(&self, _el: &ElementNode) -> std::string::String {
        std::string::String::new()
    }

    /// Wraps the final generated expression for an element.
    fn wrap_final(&self, _el: &ElementNode, code: std::string::String) -> std::string::String {
        code
    }
}

/// Compile-time handler for a named directive. Runs during AST build; may
/// mutate the element (synthesize props, handlers, bindings). Returns
/// whether a runtime directive object must still be emitted.
pub trait DirectiveHandler: Send + Sync {
    fn handle(
        &self,
        el: &mut ElementNode,
        dir: &Directive,
        cx: &mut TransformContext<'_>,
    ) -> bool;
}

/// Full compiler configuration. Platform bindings supply the predicates;
/// callers layer overrides on top via the driver.
#[derive(Clone)]
pub struct CompilerOptions {
    /// Interpolation delimiters; `None` means the default `{{` / `}}`.
    pub delimiters: Option<(String, String)>,
    pub whitespace: WhitespaceMode,
    /// Tags that never take an end tag.
    pub is_void_tag: fn(&str) -> bool,
    /// Tags whose end tag is implied by an identical following sibling.
    pub can_leave_open: fn(&str) -> bool,
    /// Attributes that must be bound as DOM properties: (tag, type, name).
    pub must_use_prop: fn(&str, Option<&str>, &str) -> bool,
    pub is_reserved_tag: fn(&str) -> bool,
    pub get_namespace: fn(&str) -> Option<&'static str>,
    pub is_pre_tag: fn(&str) -> bool,
    /// Side-effecting tags that are never rendered: (tag, type attribute).
    pub is_forbidden_tag: fn(&str, Option<&str>) -> bool,
    /// Apply HTML content-model quirks (implied `</p>`, left-open tags).
    pub expect_html: bool,
    /// Ordered module hooks; caller modules concatenate after base ones.
    pub modules: Vec<Arc<dyn CompileModule>>,
    /// Named compile-time directives; caller entries shadow base ones.
    pub directives: FxHashMap<String, Arc<dyn DirectiveHandler>>,
    /// Run the static optimizer.
    pub optimize: bool,
    /// Preserve comments as AST nodes.
    pub comments: bool,
    /// Attach byte ranges to diagnostics.
    pub output_source_range: bool,
    /// External warning sink, invoked for every diagnostic as it is
    /// reported.
    pub on_warn: Option<fn(&crate::errors::Diagnostic)>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            delimiters: None,
            whitespace: WhitespaceMode::default(),
            is_void_tag: stampa_carton::is_void_tag,
            can_leave_open: stampa_carton::can_leave_open,
            must_use_prop: stampa_carton::must_use_prop,
            is_reserved_tag: stampa_carton::is_reserved_tag,
            get_namespace: stampa_carton::get_tag_namespace,
            is_pre_tag: stampa_carton::is_pre_tag,
            is_forbidden_tag: stampa_carton::is_forbidden_tag,
            expect_html: true,
            modules: Vec::new(),
            directives: FxHashMap::default(),
            optimize: true,
            comments: false,
            output_source_range: false,
            on_warn: None,
        }
    }
}

impl CompilerOptions {
    /// The effective interpolation delimiters.
    pub fn delimiter_pair(&self) -> (&str, &str) {
        match &self.delimiters {
            Some((open, close)) => (open.as_str(), close.as_str()),
            None => ("{{", "}}"),
        }
    }
}
