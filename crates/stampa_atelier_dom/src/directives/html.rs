//! `v-html`: an `innerHTML` property binding.

use stampa_armature::helpers::add_prop;
use stampa_relief::{Directive, DirectiveHandler, ElementNode, TransformContext};

pub struct HtmlDirective;

impl DirectiveHandler for HtmlDirective {
    fn handle(
        &self,
        el: &mut ElementNode,
        dir: &Directive,
        _cx: &mut TransformContext<'_>,
    ) -> bool {
        if let Some(exp) = &dir.expression {
            add_prop(
                el,
                "innerHTML".into(),
                format!("_s({})", exp).into(),
                dir.range,
                false,
            );
        }
        false
    }
}
