//! Compiler driver.
//!
//! Holds the platform base configuration and merges per-call overrides
//! onto it: override modules concatenate after base modules, override
//! directives shadow base entries by name, scalar options replace.

use std::sync::Arc;

use stampa_armature::build_template;
use stampa_atelier_core::{generate, optimize};
use stampa_carton::FxHashMap;
use stampa_relief::{
    CompileModule, CompilerError, CompilerOptions, DirectiveHandler, ElementNode, Severity,
    TransformContext, WhitespaceMode,
};

/// Per-call option overrides.
#[derive(Default)]
pub struct CompileOverrides {
    pub delimiters: Option<(stampa_carton::String, stampa_carton::String)>,
    pub whitespace: Option<WhitespaceMode>,
    pub modules: Vec<Arc<dyn CompileModule>>,
    pub directives: FxHashMap<stampa_carton::String, Arc<dyn DirectiveHandler>>,
    pub optimize: Option<bool>,
    pub comments: Option<bool>,
    pub output_source_range: Option<bool>,
}

pub struct CompiledResult {
    pub ast: Option<Box<ElementNode>>,
    /// Render function body, `with(this){return …}`.
    pub render: std::string::String,
    pub static_renders: Vec<std::string::String>,
    pub errors: Vec<CompilerError>,
    pub tips: Vec<CompilerError>,
}

pub struct Compiler {
    base: CompilerOptions,
}

impl Compiler {
    pub fn new(base: CompilerOptions) -> Self {
        Self { base }
    }

    /// A compiler with the web platform configuration.
    pub fn web() -> Self {
        Self::new(stampa_atelier_dom::base_options())
    }

    pub fn compile(&self, template: &str) -> CompiledResult {
        self.compile_with(template, CompileOverrides::default())
    }

    pub fn compile_with(&self, template: &str, overrides: CompileOverrides) -> CompiledResult {
        let options = self.merge(overrides);

        // Surrounding whitespace never affects output; diagnostics are
        // shifted back to the caller's byte offsets.
        let trimmed_start = template.trim_start();
        let leading = (template.len() - trimmed_start.len()) as u32;
        let source = trimmed_start.trim_end();

        let mut cx = TransformContext::new(&options);
        let mut root = build_template(source, &options, &mut cx);
        if options.optimize {
            if let Some(root) = root.as_deref_mut() {
                optimize(root, &options);
            }
        }
        let generated = generate(root.as_deref(), &options);

        let mut errors = Vec::new();
        let mut tips = Vec::new();
        for diagnostic in cx.diagnostics.into_iter().chain(generated.diagnostics) {
            let mut error = diagnostic.error;
            if leading > 0 {
                error = error.offset(leading);
            }
            match diagnostic.severity {
                Severity::Error => errors.push(error),
                Severity::Tip => tips.push(error),
            }
        }

        CompiledResult {
            ast: root,
            render: generated.render,
            static_renders: generated.static_render_fns,
            errors,
            tips,
        }
    }

    fn merge(&self, overrides: CompileOverrides) -> CompilerOptions {
        let mut options = self.base.clone();
        if overrides.delimiters.is_some() {
            options.delimiters = overrides.delimiters;
        }
        if let Some(whitespace) = overrides.whitespace {
            options.whitespace = whitespace;
        }
        options.modules.extend(overrides.modules);
        options.directives.extend(overrides.directives);
        if let Some(optimize) = overrides.optimize {
            options.optimize = optimize;
        }
        if let Some(comments) = overrides.comments {
            options.comments = comments;
        }
        if let Some(output_source_range) = overrides.output_source_range {
            options.output_source_range = output_source_range;
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stampa_relief::{Directive, ElementFlags};

    #[test]
    fn test_trimmed_input_offsets_ranges() {
        let compiler = Compiler::web();
        let overrides = CompileOverrides {
            output_source_range: Some(true),
            ..Default::default()
        };
        let result = compiler.compile_with("   <div><div v-else/></div>", overrides);
        let error = result
            .errors
            .iter()
            .find(|e| e.message.contains("v-else"))
            .expect("v-else error");
        // Points at the inner element in the caller's coordinates.
        assert_eq!(error.start, Some(8));
    }

    #[test]
    fn test_ranges_absent_by_default() {
        let result = Compiler::web().compile("<div><div v-else/></div>");
        let error = result.errors.iter().find(|e| e.message.contains("v-else")).unwrap();
        assert_eq!(error.start, None);
    }

    #[test]
    fn test_optimize_override_disables_hoisting() {
        let compiler = Compiler::web();
        let overrides = CompileOverrides {
            optimize: Some(false),
            ..Default::default()
        };
        let result = compiler.compile_with("<div><p>a</p><p>b</p></div>", overrides);
        assert!(result.static_renders.is_empty());
        assert!(!result.render.contains("_m("));
    }

    #[test]
    fn test_delimiters_override() {
        let compiler = Compiler::web();
        let overrides = CompileOverrides {
            delimiters: Some(("[[".into(), "]]".into())),
            ..Default::default()
        };
        let result = compiler.compile_with("<div>[[ msg ]]</div>", overrides);
        assert!(result.render.contains("_v(_s(msg))"));
    }

    #[test]
    fn test_override_directive_shadows_base() {
        struct Swallow;
        impl DirectiveHandler for Swallow {
            fn handle(
                &self,
                _el: &mut ElementNode,
                _dir: &Directive,
                _cx: &mut TransformContext<'_>,
            ) -> bool {
                false
            }
        }
        let mut directives: FxHashMap<stampa_carton::String, Arc<dyn DirectiveHandler>> =
            FxHashMap::default();
        directives.insert("model".into(), Arc::new(Swallow));
        let overrides = CompileOverrides {
            directives,
            ..Default::default()
        };
        let result = Compiler::web().compile_with("<input v-model=\"a\">", overrides);
        let input = result.ast.as_ref().unwrap();
        assert!(input.dom_props.is_empty());
        assert!(!input.directives[0].needs_runtime);
    }

    #[test]
    fn test_comments_override() {
        let overrides = CompileOverrides {
            comments: Some(true),
            ..Default::default()
        };
        let result = Compiler::web().compile_with("<div><!-- note --></div>", overrides);
        // The comment-only tree is hoisted whole.
        assert!(result.static_renders[0].contains("_e(\" note \")"));
    }

    #[test]
    fn test_whitespace_preserve() {
        let source = "<div><span>a</span>\n<span>b</span></div>";
        let condensed = Compiler::web().compile(source);
        assert!(!condensed.static_renders[0].contains("_v(\" \")"));

        let overrides = CompileOverrides {
            whitespace: Some(WhitespaceMode::Preserve),
            ..Default::default()
        };
        let preserved = Compiler::web().compile_with(source, overrides);
        assert!(preserved.static_renders[0].contains("_v(\" \")"));
    }

    #[test]
    fn test_pre_flag_survives_to_result_ast() {
        let result = Compiler::web().compile("<div v-pre>{{ raw }}</div>");
        let root = result.ast.as_ref().unwrap();
        assert!(root.has_flag(ElementFlags::PRE));
        assert!(result.render.contains("{{ raw }}"));
    }
}
