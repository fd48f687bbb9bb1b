//! Render-artifact adapter.
//!
//! Turns template sources into validated render artifacts and memoizes
//! them. Diagnostics accumulate next to a best-effort render; the
//! empty-`div` fallback is reserved for the one case where no render
//! body was produced at all.

use std::sync::Arc;

use dashmap::DashMap;

use crate::compile::{CompileOverrides, CompiledResult, Compiler};
use crate::detect_errors::detect_errors;
use stampa_relief::CompilerError;

const FALLBACK_RENDER: &str = "with(this){return _c(\"div\")}";

pub struct RenderArtifact {
    pub render: std::string::String,
    pub static_renders: Vec<std::string::String>,
    pub errors: Vec<CompilerError>,
    pub tips: Vec<CompilerError>,
}

type CacheKey = (std::string::String, std::string::String);

pub struct RenderCache {
    compiler: Compiler,
    cache: DashMap<CacheKey, Arc<RenderArtifact>>,
}

impl RenderCache {
    pub fn new(compiler: Compiler) -> Self {
        Self {
            compiler,
            cache: DashMap::new(),
        }
    }

    pub fn web() -> Self {
        Self::new(Compiler::web())
    }

    /// Compile (or recall) the artifact for a template. Concurrent misses
    /// on the same key may compile twice; last insert wins, both results
    /// are equivalent.
    pub fn to_render(
        &self,
        template: &str,
        delimiters: Option<(&str, &str)>,
    ) -> Arc<RenderArtifact> {
        let key: CacheKey = (
            delimiters
                .map(|(open, close)| format!("{}{}", open, close))
                .unwrap_or_default(),
            template.to_owned(),
        );
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }

        let overrides = CompileOverrides {
            delimiters: delimiters.map(|(open, close)| (open.into(), close.into())),
            ..Default::default()
        };
        let compiled = self.compiler.compile_with(template, overrides);
        let artifact = Arc::new(build_artifact(compiled));
        self.cache.insert(key, artifact.clone());
        artifact
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

fn build_artifact(compiled: CompiledResult) -> RenderArtifact {
    let mut errors = compiled.errors;
    errors.extend(detect_errors(compiled.ast.as_deref()));

    if compiled.render.is_empty() {
        // Generation returning nothing is an internal failure, distinct
        // from template diagnostics.
        errors.push(CompilerError::new("failed to generate render function", None));
        RenderArtifact {
            render: FALLBACK_RENDER.to_owned(),
            static_renders: Vec::new(),
            errors,
            tips: compiled.tips,
        }
    } else {
        RenderArtifact {
            render: compiled.render,
            static_renders: compiled.static_renders,
            errors,
            tips: compiled.tips,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_template_keeps_render() {
        let cache = RenderCache::web();
        let artifact = cache.to_render("<div>{{ msg }}</div>", None);
        assert_eq!(artifact.render, "with(this){return _c('div',[_v(_s(msg))])}");
        assert!(artifact.errors.is_empty());
    }

    #[test]
    fn test_broken_template_keeps_render_with_errors() {
        let cache = RenderCache::web();
        let artifact = cache.to_render("<div>{{ var a }}</div>", None);
        assert_eq!(
            artifact.render,
            "with(this){return _c('div',[_v(_s(var a))])}"
        );
        assert!(artifact
            .errors
            .iter()
            .any(|e| e.message.contains("avoid using JavaScript keyword")));
        assert!(!artifact
            .errors
            .iter()
            .any(|e| e.message.contains("failed to generate render function")));
    }

    #[test]
    fn test_warning_only_template_keeps_content() {
        let cache = RenderCache::web();
        let artifact = cache.to_render("<div id=\"a\" id=\"b\">x</div>", None);
        assert!(artifact.render.contains("_v(\"x\")"));
        assert!(artifact
            .errors
            .iter()
            .any(|e| e.message.contains("duplicate attribute")));
    }

    #[test]
    fn test_results_are_cached() {
        let cache = RenderCache::web();
        let first = cache.to_render("<div>x</div>", None);
        let second = cache.to_render("<div>x</div>", None);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_delimiters_partition_the_cache() {
        let cache = RenderCache::web();
        let plain = cache.to_render("<div>[[ a ]]</div>", None);
        let custom = cache.to_render("<div>[[ a ]]</div>", Some(("[[", "]]")));
        assert_eq!(cache.len(), 2);
        assert!(!plain.render.contains("_s(a)"));
        assert!(custom.render.contains("_s(a)"));
    }
}
