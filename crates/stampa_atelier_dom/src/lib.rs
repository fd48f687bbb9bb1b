//! Atelier dom - the web platform binding.
//!
//! Supplies the class/style compile modules, the `<input v-model>` dynamic
//! type pre-transform, and the `v-model`/`v-text`/`v-html` directive
//! handlers. [`base_options`] assembles the full web compiler configuration
//! from these plus the platform-neutral base directives.

pub mod directives;
pub mod modules;

use std::sync::Arc;

use stampa_atelier_core::base_directives;
use stampa_carton::FxHashMap;
use stampa_relief::{CompileModule, CompilerOptions, DirectiveHandler};

use crate::directives::{HtmlDirective, ModelDirective, TextDirective};
use crate::modules::{ClassModule, InputModelExpansion, StyleModule};

pub fn platform_modules() -> Vec<Arc<dyn CompileModule>> {
    vec![
        Arc::new(ClassModule),
        Arc::new(StyleModule),
        Arc::new(InputModelExpansion),
    ]
}

pub fn platform_directives() -> FxHashMap<stampa_carton::String, Arc<dyn DirectiveHandler>> {
    let mut map: FxHashMap<stampa_carton::String, Arc<dyn DirectiveHandler>> =
        FxHashMap::default();
    map.insert("model".into(), Arc::new(ModelDirective));
    map.insert("text".into(), Arc::new(TextDirective));
    map.insert("html".into(), Arc::new(HtmlDirective));
    map
}

/// The complete web compiler configuration.
pub fn base_options() -> CompilerOptions {
    let mut options = CompilerOptions::default();
    options.modules = platform_modules();
    options.directives = base_directives();
    options.directives.extend(platform_directives());
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use stampa_armature::build_template;
    use stampa_atelier_core::generate;
    use stampa_relief::TransformContext;

    #[test]
    fn test_base_options_carry_all_directives() {
        let options = base_options();
        for name in ["bind", "on", "cloak", "model", "text", "html"] {
            assert!(options.directives.contains_key(name), "missing {}", name);
        }
        assert_eq!(options.modules.len(), 3);
    }

    #[test]
    fn test_full_web_pipeline() {
        let options = base_options();
        let mut cx = TransformContext::new(&options);
        let root = build_template(
            "<div class=\"box\" :style=\"s\"><input v-model=\"msg\"></div>",
            &options,
            &mut cx,
        );
        let result = generate(root.as_deref(), &options);
        assert!(result.render.contains("staticClass:\"box\""));
        assert!(result.render.contains("style:(s)"));
        assert!(result.render.contains("domProps:{\"value\":(msg)}"));
    }
}
