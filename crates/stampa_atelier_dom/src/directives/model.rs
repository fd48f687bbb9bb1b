//! `v-model` on native form elements and components.
//!
//! Every branch expands into a value binding plus an important update
//! handler built from `gen_assignment_code`. Native inputs additionally
//! keep the runtime directive for composition-event and option bookkeeping;
//! components carry the triple in `el.model` instead.

use stampa_armature::helpers::{add_handler, add_prop, get_binding_attr};
use stampa_armature::model::{gen_assignment_code, gen_component_model};
use stampa_relief::{Directive, DirectiveHandler, ElementNode, TransformContext};

/// Range inputs fire too often for `input`; the runtime rewires this token
/// to the right event per patch.
const RANGE_TOKEN: &str = "__r";

pub struct ModelDirective;

impl DirectiveHandler for ModelDirective {
    fn handle(
        &self,
        el: &mut ElementNode,
        dir: &Directive,
        cx: &mut TransformContext<'_>,
    ) -> bool {
        let Some(value) = dir.expression.clone() else {
            return false;
        };
        let value = value.as_str();

        if el.component_is.is_some() {
            gen_component_model(el, value, &dir.modifiers);
            return false;
        }

        let tag = el.tag.clone();
        let input_type = el.attr_value("type").map(|t| t.to_owned());
        match tag.as_str() {
            "select" => gen_select_model(el, dir, value, cx),
            "input" if input_type.as_deref() == Some("checkbox") => {
                gen_checkbox_model(el, dir, value, cx)
            }
            "input" if input_type.as_deref() == Some("radio") => {
                gen_radio_model(el, dir, value, cx)
            }
            "input" | "textarea" => {
                gen_default_model(el, dir, value, input_type.as_deref(), cx)
            }
            _ if !(cx.options.is_reserved_tag)(&tag) => {
                gen_component_model(el, value, &dir.modifiers);
                return false;
            }
            _ => {
                cx.warn(
                    format!(
                        "<{} v-model=\"{}\">: v-model is not supported on this element type. \
                         If you are working with contenteditable, it's recommended to wrap a \
                         library dedicated for that purpose inside a custom component.",
                        tag, value
                    ),
                    dir.range,
                );
            }
        }
        true
    }
}

fn gen_checkbox_model(
    el: &mut ElementNode,
    dir: &Directive,
    value: &str,
    cx: &mut TransformContext<'_>,
) {
    let number = dir.has_modifier("number");
    let value_binding =
        get_binding_attr(el, "value", true).unwrap_or_else(|| "null".to_owned());
    let true_value =
        get_binding_attr(el, "true-value", true).unwrap_or_else(|| "true".to_owned());
    let false_value =
        get_binding_attr(el, "false-value", true).unwrap_or_else(|| "false".to_owned());

    let checked_alt = if true_value == "true" {
        format!(":({})", value)
    } else {
        format!(":_q({},{})", value, true_value)
    };
    add_prop(
        el,
        "checked".into(),
        format!(
            "Array.isArray({v})?_i({v},{vb})>-1{alt}",
            v = value,
            vb = value_binding,
            alt = checked_alt
        )
        .into(),
        dir.range,
        false,
    );

    let item = if number {
        format!("_n({})", value_binding)
    } else {
        value_binding
    };
    let handler = format!(
        "var $$a={v},$$el=$event.target,$$c=$$el.checked?({tv}):({fv});\
         if(Array.isArray($$a)){{var $$v={item},$$i=_i($$a,$$v);\
         if($$el.checked){{$$i<0&&({add})}}\
         else{{$$i>-1&&({remove})}}\
         }}else{{{set}}}",
        v = value,
        tv = true_value,
        fv = false_value,
        item = item,
        add = gen_assignment_code(value, "$$a.concat([$$v])"),
        remove = gen_assignment_code(value, "$$a.slice(0,$$i).concat($$a.slice($$i+1))"),
        set = gen_assignment_code(value, "$$c"),
    );
    add_handler(el, "change", &handler, Vec::new(), true, dir.range, false, cx);
}

fn gen_radio_model(
    el: &mut ElementNode,
    dir: &Directive,
    value: &str,
    cx: &mut TransformContext<'_>,
) {
    let number = dir.has_modifier("number");
    let mut value_binding =
        get_binding_attr(el, "value", true).unwrap_or_else(|| "null".to_owned());
    if number {
        value_binding = format!("_n({})", value_binding);
    }
    add_prop(
        el,
        "checked".into(),
        format!("_q({},{})", value, value_binding).into(),
        dir.range,
        false,
    );
    add_handler(
        el,
        "change",
        &gen_assignment_code(value, &value_binding),
        Vec::new(),
        true,
        dir.range,
        false,
        cx,
    );
}

fn gen_select_model(
    el: &mut ElementNode,
    dir: &Directive,
    value: &str,
    cx: &mut TransformContext<'_>,
) {
    let number = dir.has_modifier("number");
    let selected_val = format!(
        "Array.prototype.filter.call($event.target.options,function(o){{return o.selected}})\
         .map(function(o){{var val = \"_value\" in o ? o._value : o.value;return {}}})",
        if number { "_n(val)" } else { "val" }
    );
    let assignment = gen_assignment_code(
        value,
        "$event.target.multiple ? $$selectedVal : $$selectedVal[0]",
    );
    let code = format!("var $$selectedVal = {}; {}", selected_val, assignment);
    add_handler(el, "change", &code, Vec::new(), true, dir.range, false, cx);
}

fn gen_default_model(
    el: &mut ElementNode,
    dir: &Directive,
    value: &str,
    input_type: Option<&str>,
    cx: &mut TransformContext<'_>,
) {
    // A manual value binding fights with the one synthesized here.
    if input_type != Some("range") {
        let conflicting = [":value", "v-bind:value"]
            .iter()
            .find_map(|name| el.raw_attr(name).map(|a| (*name, a.value.clone(), a.range)));
        if let Some((name, bound, range)) = conflicting {
            cx.warn(
                format!(
                    "{}=\"{}\" conflicts with v-model on the same element because the \
                     latter already expands to a value binding internally",
                    name, bound
                ),
                range,
            );
        }
    }

    let lazy = dir.has_modifier("lazy");
    let number = dir.has_modifier("number");
    let trim = dir.has_modifier("trim");
    let composition_guard = !lazy && input_type != Some("range");
    let event = if lazy {
        "change"
    } else if input_type == Some("range") {
        RANGE_TOKEN
    } else {
        "input"
    };

    let mut value_expression = "$event.target.value".to_owned();
    if trim {
        value_expression = "$event.target.value.trim()".to_owned();
    }
    if number {
        value_expression = format!("_n({})", value_expression);
    }

    let mut code = gen_assignment_code(value, &value_expression);
    if composition_guard {
        code = format!("if($event.target.composing)return;{}", code);
    }

    add_prop(
        el,
        "value".into(),
        format!("({})", value).into(),
        dir.range,
        false,
    );
    add_handler(el, event, &code, Vec::new(), true, dir.range, false, cx);
    if trim || number {
        add_handler(el, "blur", "$forceUpdate()", Vec::new(), false, dir.range, false, cx);
    }
}

#[cfg(test)]
mod tests {
    use crate::base_options;
    use stampa_armature::build_template;
    use stampa_atelier_core::generate;
    use stampa_relief::{ElementNode, TransformContext};

    fn build(template: &str) -> Box<ElementNode> {
        let options = base_options();
        let mut cx = TransformContext::new(&options);
        build_template(template, &options, &mut cx).expect("root")
    }

    fn render(template: &str) -> String {
        let options = base_options();
        let mut cx = TransformContext::new(&options);
        let root = build_template(template, &options, &mut cx);
        generate(root.as_deref(), &options).render
    }

    #[test]
    fn test_text_input() {
        let root = build("<input v-model=\"msg\">");
        assert!(root.dom_props.iter().any(|p| p.name == "value" && p.value == "(msg)"));
        let (name, handlers) = &root.events.0[0];
        assert_eq!(name, "input");
        assert_eq!(
            handlers[0].value,
            "if($event.target.composing)return;msg=$event.target.value"
        );
        // Composition handling lives in the runtime directive.
        assert!(root.directives[0].needs_runtime);
    }

    #[test]
    fn test_lazy_modifier_uses_change() {
        let root = build("<input v-model.lazy=\"msg\">");
        let (name, handlers) = &root.events.0[0];
        assert_eq!(name, "change");
        assert_eq!(handlers[0].value, "msg=$event.target.value");
    }

    #[test]
    fn test_trim_and_number_add_blur_refresh() {
        let root = build("<input v-model.trim.number=\"msg\">");
        let (name, handlers) = &root.events.0[0];
        assert_eq!(name, "input");
        assert!(handlers[0].value.contains("_n($event.target.value.trim())"));
        assert!(root.events.0.iter().any(|(n, h)| n == "blur" && h[0].value == "$forceUpdate()"));
    }

    #[test]
    fn test_range_uses_runtime_token() {
        let root = build("<input type=\"range\" v-model=\"n\">");
        assert_eq!(root.events.0[0].0, "__r");
        assert!(!root.events.0[0].1[0].value.contains("composing"));
    }

    #[test]
    fn test_checkbox() {
        let root = build("<input type=\"checkbox\" v-model=\"done\">");
        let checked = root.dom_props.iter().find(|p| p.name == "checked").unwrap();
        assert_eq!(
            checked.value,
            "Array.isArray(done)?_i(done,null)>-1:(done)"
        );
        let (name, handlers) = &root.events.0[0];
        assert_eq!(name, "change");
        assert!(handlers[0].value.starts_with("var $$a=done,$$el=$event.target"));
        assert!(handlers[0].value.ends_with("else{done=$$c}"));
    }

    #[test]
    fn test_checkbox_custom_true_value() {
        let root = build("<input type=\"checkbox\" v-model=\"v\" :true-value=\"yes\">");
        let checked = root.dom_props.iter().find(|p| p.name == "checked").unwrap();
        assert!(checked.value.ends_with(":_q(v,yes)"));
    }

    #[test]
    fn test_radio() {
        let root = build("<input type=\"radio\" v-model=\"picked\" value=\"a\">");
        let checked = root.dom_props.iter().find(|p| p.name == "checked").unwrap();
        assert_eq!(checked.value, "_q(picked,\"a\")");
        assert_eq!(root.events.0[0].1[0].value, "picked=\"a\"");
    }

    #[test]
    fn test_select() {
        let root = build("<select v-model=\"choice\"><option>a</option></select>");
        let (name, handlers) = &root.events.0[0];
        assert_eq!(name, "change");
        assert!(handlers[0].value.starts_with("var $$selectedVal = Array.prototype.filter"));
        assert!(handlers[0]
            .value
            .ends_with("choice=$event.target.multiple ? $$selectedVal : $$selectedVal[0]"));
    }

    #[test]
    fn test_keyed_target_uses_set() {
        let root = build("<input v-model=\"obj[key]\">");
        let (_, handlers) = &root.events.0[0];
        assert!(handlers[0].value.contains("$set(obj, key, $event.target.value)"));
    }

    #[test]
    fn test_component_model_triple() {
        let root = build("<my-input v-model=\"msg\"/>");
        let model = root.model.as_ref().unwrap();
        assert_eq!(model.value, "(msg)");
        assert_eq!(model.expression, "\"msg\"");
        assert!(model.callback.starts_with("function ($$v)"));
        // No runtime directive for component v-model.
        assert!(!root.directives[0].needs_runtime);
    }

    #[test]
    fn test_value_conflict_warns() {
        let options = base_options();
        let mut cx = TransformContext::new(&options);
        build_template("<input v-model=\"a\" :value=\"b\">", &options, &mut cx);
        assert!(cx
            .diagnostics
            .iter()
            .any(|d| d.error.message.contains("conflicts with v-model")));
    }

    #[test]
    fn test_unsupported_element_warns() {
        let options = base_options();
        let mut cx = TransformContext::new(&options);
        build_template("<span v-model=\"a\">x</span>", &options, &mut cx);
        assert!(cx
            .diagnostics
            .iter()
            .any(|d| d.error.message.contains("not supported on this element type")));
    }

    #[test]
    fn test_render_emits_model_directive_descriptor() {
        let code = render("<input v-model=\"msg\">");
        assert!(code.contains(
            "directives:[{name:\"model\",rawName:\"v-model\",value:(msg),expression:\"msg\"}]"
        ));
        assert!(code.contains("domProps:{\"value\":(msg)}"));
    }
}
