//! Base compile-time directives, available on every platform.
//!
//! The object forms `v-bind="obj"` and `v-on="obj"` record wrap
//! instructions consumed by the data generator; `v-cloak` is compile-time
//! only. None of them need a runtime directive object.

use std::sync::Arc;

use stampa_carton::FxHashMap;
use stampa_relief::{Directive, DirectiveHandler, ElementNode, ObjectBind, TransformContext};

struct BindDirective;

impl DirectiveHandler for BindDirective {
    fn handle(
        &self,
        el: &mut ElementNode,
        dir: &Directive,
        _cx: &mut TransformContext<'_>,
    ) -> bool {
        if let Some(exp) = &dir.expression {
            el.object_bind = Some(ObjectBind {
                exp: exp.clone(),
                prop: dir.has_modifier("prop"),
                sync: dir.has_modifier("sync"),
            });
        }
        false
    }
}

struct OnDirective;

impl DirectiveHandler for OnDirective {
    fn handle(
        &self,
        el: &mut ElementNode,
        dir: &Directive,
        _cx: &mut TransformContext<'_>,
    ) -> bool {
        el.listeners_bind = dir.expression.clone();
        false
    }
}

struct CloakDirective;

impl DirectiveHandler for CloakDirective {
    fn handle(
        &self,
        _el: &mut ElementNode,
        _dir: &Directive,
        _cx: &mut TransformContext<'_>,
    ) -> bool {
        false
    }
}

pub fn base_directives() -> FxHashMap<stampa_carton::String, Arc<dyn DirectiveHandler>> {
    let mut map: FxHashMap<stampa_carton::String, Arc<dyn DirectiveHandler>> =
        FxHashMap::default();
    map.insert("bind".into(), Arc::new(BindDirective));
    map.insert("on".into(), Arc::new(OnDirective));
    map.insert("cloak".into(), Arc::new(CloakDirective));
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use stampa_armature::build_template;
    use stampa_relief::CompilerOptions;

    fn build(template: &str) -> Box<ElementNode> {
        let mut options = CompilerOptions::default();
        options.directives = base_directives();
        let mut cx = TransformContext::new(&options);
        build_template(template, &options, &mut cx).expect("no root")
    }

    #[test]
    fn test_object_bind() {
        let root = build("<div v-bind=\"obj\"/>");
        let bind = root.object_bind.as_ref().unwrap();
        assert_eq!(bind.exp, "obj");
        assert!(!bind.prop);
        // Consumed at compile time, no runtime directive left.
        assert!(!root.directives[0].needs_runtime);
    }

    #[test]
    fn test_object_bind_prop_modifier() {
        let root = build("<div v-bind.prop=\"obj\"/>");
        assert!(root.object_bind.as_ref().unwrap().prop);
    }

    #[test]
    fn test_object_listeners() {
        let root = build("<div v-on=\"listeners\"/>");
        assert_eq!(root.listeners_bind.as_deref(), Some("listeners"));
        assert!(!root.directives[0].needs_runtime);
    }

    #[test]
    fn test_cloak_is_compile_time_only() {
        let root = build("<div v-cloak/>");
        assert!(!root.directives[0].needs_runtime);
    }
}
