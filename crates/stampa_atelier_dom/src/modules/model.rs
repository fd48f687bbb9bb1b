//! `<input v-model>` with a bound `type`.
//!
//! The checkbox and radio codepaths of `v-model` differ from the text
//! one, so an input whose type is only known at runtime is expanded ahead
//! of structural processing into a three-arm conditional chain: checkbox,
//! radio, and everything else with the original type binding restored.

use stampa_armature::builder::{add_if_condition, process_element, process_for};
use stampa_armature::helpers::{get_and_remove_attr, get_binding_attr};
use stampa_relief::{
    AttributeRaw, CompileModule, ElementNode, IfBlock, IfCondition, TransformContext,
};

pub struct InputModelExpansion;

impl CompileModule for InputModelExpansion {
    fn pre_transform(
        &self,
        el: &mut ElementNode,
        cx: &mut TransformContext<'_>,
    ) -> Option<ElementNode> {
        if el.tag != "input" || !el.attrs_map.contains_key("v-model") {
            return None;
        }

        let mut type_binding = None;
        if el.attrs_map.contains_key(":type") || el.attrs_map.contains_key("v-bind:type") {
            type_binding = get_binding_attr(el, "type", false);
        }
        if el.attrs_map.get("type").is_none() && type_binding.is_none() {
            if let Some(bind) = el.attr_value("v-bind") {
                type_binding = Some(format!("({}).type", bind));
            }
        }
        let type_binding = type_binding?;

        // The chain position of the original element transfers to the
        // expansion, so its own conditional attributes come off first.
        let if_condition = get_and_remove_attr(el, "v-if", true);
        let if_extra = if_condition
            .as_ref()
            .map(|c| format!("&&({})", c))
            .unwrap_or_default();
        let has_else = get_and_remove_attr(el, "v-else", true).is_some();
        let else_if_condition = get_and_remove_attr(el, "v-else-if", true);

        let mut checkbox = clone_branch(el);
        process_for(&mut checkbox, cx);
        // All three arms render inside the first arm's loop, so its alias
        // is in scope for the whole expansion.
        let pushed_alias = match &checkbox.for_info {
            Some(info) => {
                cx.for_aliases.push(info.alias.clone());
                true
            }
            None => false,
        };
        add_raw_attr(&mut checkbox, "type", "checkbox");
        process_element(&mut checkbox, None, cx);
        checkbox.if_expr = Some(format!("({})==='checkbox'{}", type_binding, if_extra).into());
        let checkbox_exp = checkbox.if_expr.clone();
        add_if_condition(
            &mut checkbox,
            IfCondition {
                exp: checkbox_exp,
                block: IfBlock::This,
            },
        );

        // The remaining arms share the checkbox arm's v-for, so their own
        // copy is dropped.
        let mut radio = clone_branch(el);
        get_and_remove_attr(&mut radio, "v-for", true);
        add_raw_attr(&mut radio, "type", "radio");
        process_element(&mut radio, None, cx);
        add_if_condition(
            &mut checkbox,
            IfCondition {
                exp: Some(format!("({})==='radio'{}", type_binding, if_extra).into()),
                block: IfBlock::Element(Box::new(radio)),
            },
        );

        let mut other = clone_branch(el);
        get_and_remove_attr(&mut other, "v-for", true);
        add_raw_attr(&mut other, ":type", &type_binding);
        process_element(&mut other, None, cx);
        add_if_condition(
            &mut checkbox,
            IfCondition {
                exp: if_condition,
                block: IfBlock::Element(Box::new(other)),
            },
        );

        if pushed_alias {
            cx.for_aliases.pop();
        }

        if has_else {
            checkbox.is_else = true;
        } else if let Some(exp) = else_if_condition {
            checkbox.else_if_expr = Some(exp);
        }

        Some(checkbox)
    }
}

fn clone_branch(el: &ElementNode) -> ElementNode {
    let mut clone = ElementNode::new(el.tag.clone(), el.range);
    clone.ns = el.ns.clone();
    clone.attrs_list = el.attrs_list.clone();
    clone.attrs_map = el.attrs_map.clone();
    clone.raw_attrs_map = el.raw_attrs_map.clone();
    clone
}

fn add_raw_attr(el: &mut ElementNode, name: &str, value: &str) {
    let attr = AttributeRaw {
        name: name.into(),
        value: value.into(),
        range: el.range,
    };
    el.attrs_map.insert(attr.name.clone(), attr.value.clone());
    el.raw_attrs_map.insert(attr.name.clone(), attr.clone());
    el.attrs_list.push(attr);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_options;
    use stampa_armature::build_template;
    use stampa_relief::ElementFlags;

    fn build(template: &str) -> Box<ElementNode> {
        let options = base_options();
        let mut cx = TransformContext::new(&options);
        build_template(template, &options, &mut cx).expect("root")
    }

    #[test]
    fn test_dynamic_type_expands_to_three_arms() {
        let root = build("<div><input v-model=\"val\" :type=\"kind\"></div>");
        let input = root.children[0].as_element().unwrap();
        assert_eq!(input.if_conditions.len(), 3);
        assert_eq!(
            input.if_expr.as_deref(),
            Some("(kind)==='checkbox'")
        );
        let IfBlock::Element(radio) = &input.if_conditions[1].block else {
            panic!("expected spliced radio arm");
        };
        assert_eq!(radio.attr_value("type"), Some("radio"));
        // The fallback arm keeps the runtime type binding.
        let IfBlock::Element(other) = &input.if_conditions[2].block else {
            panic!("expected spliced fallback arm");
        };
        assert!(other.attrs.iter().any(|a| a.name == "type" && a.value == "kind"));
        assert!(input.if_conditions[2].exp.is_none());
    }

    #[test]
    fn test_own_v_if_is_folded_into_arm_conditions() {
        let root = build("<div><input v-model=\"v\" :type=\"t\" v-if=\"ok\"></div>");
        let input = root.children[0].as_element().unwrap();
        assert_eq!(input.if_expr.as_deref(), Some("(t)==='checkbox'&&(ok)"));
        assert_eq!(input.if_conditions[2].exp.as_deref(), Some("ok"));
    }

    #[test]
    fn test_v_for_only_on_first_arm() {
        let root = build("<div><input v-model=\"v\" :type=\"t\" v-for=\"i in l\"></div>");
        let input = root.children[0].as_element().unwrap();
        assert!(input.for_info.is_some());
        let IfBlock::Element(radio) = &input.if_conditions[1].block else {
            panic!("expected spliced radio arm");
        };
        assert!(radio.for_info.is_none());
    }

    #[test]
    fn test_static_type_is_left_alone() {
        let root = build("<div><input v-model=\"v\" type=\"checkbox\"></div>");
        let input = root.children[0].as_element().unwrap();
        assert!(input.if_conditions.is_empty());
        assert!(input.dom_props.iter().any(|p| p.name == "checked"));
    }

    #[test]
    fn test_v_bind_object_type_is_used() {
        let root = build("<div><input v-model=\"v\" v-bind=\"attrs\"></div>");
        let input = root.children[0].as_element().unwrap();
        assert_eq!(
            input.if_expr.as_deref(),
            Some("((attrs).type)==='checkbox'")
        );
    }

    #[test]
    fn test_arms_are_fully_processed() {
        let root = build("<div><input v-model=\"v\" :type=\"t\"></div>");
        let input = root.children[0].as_element().unwrap();
        assert!(input.is_rendered());
        assert!(!input.has_flag(ElementFlags::PLAIN));
    }
}
