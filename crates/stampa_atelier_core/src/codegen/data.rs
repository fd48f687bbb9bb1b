//! Element data object generation.
//!
//! Assembles the `{key:...,attrs:{...},on:{...}}` data argument of `_c`,
//! including the trailing wraps for dynamic attribute names (`_b` with
//! `_d`), object `v-bind` (`_b`) and object `v-on` (`_g`).

use stampa_armature::builder::EMPTY_SLOT_SCOPE_TOKEN;
use stampa_armature::helpers::quote_json;
use stampa_relief::{AstNode, BoundAttr, ElementFlags, ElementNode};

use crate::codegen::events::gen_handlers;
use crate::codegen::{
    gen_children, gen_element, gen_for, gen_if, generate, BranchGen, CodegenState, SkipFlags,
};

pub(crate) fn gen_data(el: &ElementNode, state: &mut CodegenState<'_>) -> String {
    let mut data = String::from("{");

    // Runtime directives first: they may be destroyed before other
    // properties are touched during patch.
    if let Some(dirs) = gen_directives(el) {
        data.push_str(&dirs);
        data.push(',');
    }

    if let Some(key) = &el.key {
        data.push_str(&format!("key:{},", key));
    }
    if let Some(ref_expr) = &el.ref_expr {
        data.push_str(&format!("ref:{},", ref_expr));
    }
    if el.has_flag(ElementFlags::REF_IN_FOR) {
        data.push_str("refInFor:true,");
    }
    if el.has_flag(ElementFlags::PRE) {
        data.push_str("pre:true,");
    }
    // Components rendered as `<component is>` keep the original tag for
    // selector-based styling.
    if el.component_is.is_some() {
        data.push_str(&format!("tag:\"{}\",", el.tag));
    }

    for module in &state.options.modules {
        data.push_str(&module.gen_data(el));
    }

    let static_attrs: Vec<&BoundAttr> = el.attrs.iter().filter(|a| !a.dynamic).collect();
    if !static_attrs.is_empty() {
        data.push_str(&format!("attrs:{},", gen_bound_props(&static_attrs)));
    }
    if !el.dom_props.is_empty() {
        let props: Vec<&BoundAttr> = el.dom_props.iter().collect();
        data.push_str(&format!("domProps:{},", gen_bound_props(&props)));
    }
    if !el.events.is_empty() {
        data.push_str(&gen_handlers(&el.events, false));
        data.push(',');
    }
    if !el.native_events.is_empty() {
        data.push_str(&gen_handlers(&el.native_events, true));
        data.push(',');
    }

    // Non-scoped slot target; scoped targets live in the slot table.
    if el.slot_scope.is_none() {
        if let Some(target) = &el.slot_target {
            data.push_str(&format!("slot:{},", target));
        }
    }
    if !el.scoped_slots.is_empty() {
        data.push_str(&gen_scoped_slots(el, state));
        data.push(',');
    }
    if let Some(model) = &el.model {
        data.push_str(&format!(
            "model:{{value:{},callback:{},expression:{}}},",
            model.value, model.callback, model.expression
        ));
    }
    if el.has_flag(ElementFlags::INLINE_TEMPLATE) {
        if let Some(inline) = gen_inline_template(el, state) {
            data.push_str(&inline);
            data.push(',');
        }
    }

    let mut data = format!("{}}}", data.trim_end_matches(','));

    let dynamic_attrs: Vec<&BoundAttr> = el.attrs.iter().filter(|a| a.dynamic).collect();
    if !dynamic_attrs.is_empty() {
        data = format!(
            "_b({},\"{}\",{})",
            data,
            el.tag,
            gen_bound_props(&dynamic_attrs)
        );
    }
    if let Some(bind) = &el.object_bind {
        data = format!(
            "_b({},'{}',{},{}{})",
            data,
            el.tag,
            bind.exp,
            bind.prop,
            if bind.sync { ",true" } else { "" }
        );
    }
    if let Some(listeners) = &el.listeners_bind {
        data = format!("_g({},{})", data, listeners);
    }

    data
}

fn gen_bound_props(props: &[&BoundAttr]) -> String {
    let triples: Vec<(String, String, bool)> = props
        .iter()
        .map(|p| (p.name.to_string(), p.value.to_string(), p.dynamic))
        .collect();
    gen_props(&triples)
}

/// Emit a props object; dynamic-named entries go through `_d` so the
/// runtime can resolve the names per render.
pub(crate) fn gen_props(props: &[(String, String, bool)]) -> String {
    let mut static_props = String::new();
    let mut dynamic_props = String::new();
    for (name, value, dynamic) in props {
        let value = transform_special_newlines(value);
        if *dynamic {
            dynamic_props.push_str(&format!("{},{},", name, value));
        } else {
            static_props.push_str(&format!("\"{}\":{},", name, value));
        }
    }
    let static_props = format!("{{{}}}", static_props.trim_end_matches(','));
    if dynamic_props.is_empty() {
        static_props
    } else {
        format!("_d({},[{}])", static_props, dynamic_props.trim_end_matches(','))
    }
}

/// U+2028 and U+2029 are valid JSON but terminate a JavaScript string
/// literal, so they must stay escaped in generated source.
pub(crate) fn transform_special_newlines(value: &str) -> String {
    if !value.contains(['\u{2028}', '\u{2029}']) {
        return value.to_owned();
    }
    value.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029")
}

fn gen_directives(el: &ElementNode) -> Option<String> {
    let runtime: Vec<_> = el.directives.iter().filter(|d| d.needs_runtime).collect();
    if runtime.is_empty() {
        return None;
    }

    let mut res = String::from("directives:[");
    for dir in runtime {
        res.push_str(&format!(
            "{{name:{},rawName:{}",
            quote_json(&dir.name),
            quote_json(&dir.raw_name)
        ));
        if let Some(exp) = &dir.expression {
            res.push_str(&format!(",value:({}),expression:{}", exp, quote_json(exp)));
        }
        if let Some(arg) = &dir.arg {
            if dir.dynamic_arg {
                res.push_str(&format!(",arg:{}", arg));
            } else {
                res.push_str(&format!(",arg:\"{}\"", arg));
            }
        }
        if !dir.modifiers.is_empty() {
            let mods: Vec<_> = dir
                .modifiers
                .iter()
                .map(|m| format!("{}:true", quote_json(m)))
                .collect();
            res.push_str(&format!(",modifiers:{{{}}}", mods.join(",")));
        }
        res.push_str("},");
    }
    Some(format!("{}]", res.trim_end_matches(',')))
}

fn gen_inline_template(el: &ElementNode, state: &mut CodegenState<'_>) -> Option<String> {
    let inline_root = el.children.first().and_then(AstNode::as_element);
    if el.children.len() != 1 || inline_root.is_none() {
        state.warn(
            "Inline-template components must have exactly one child element.",
            el.range,
        );
    }
    let inline_root = inline_root?;

    let sub = generate(Some(inline_root), state.options);
    state.diagnostics.extend(sub.diagnostics);
    let static_fns: Vec<_> = sub
        .static_render_fns
        .iter()
        .map(|code| format!("function(){{{}}}", code))
        .collect();
    Some(format!(
        "inlineTemplate:{{render:function(){{{}}},staticRenderFns:[{}]}}",
        sub.render,
        static_fns.join(",")
    ))
}

fn contains_slot_child(el: &ElementNode) -> bool {
    el.is_slot_outlet()
        || el
            .children
            .iter()
            .filter_map(AstNode::as_element)
            .any(contains_slot_child)
}

fn gen_scoped_slots(el: &ElementNode, state: &mut CodegenState<'_>) -> String {
    // Slot functions are cached by default; anything that can change which
    // content a key resolves to forces a re-render of the child instead.
    let mut needs_force_update = el.for_info.is_some()
        || el.scoped_slots.iter().any(|slot| {
            slot.dynamic
                || slot.element.if_expr.is_some()
                || slot.element.for_info.is_some()
                || contains_slot_child(&slot.element)
        });

    // A conditional chain can swap between two sets of identically-keyed
    // slots; a content hash gives each set its own cache identity.
    let mut needs_key = el.if_expr.is_some();

    if !needs_force_update {
        for ancestor in state.ancestors.iter().rev() {
            if ancestor.scoped_slot || ancestor.in_for {
                needs_force_update = true;
                break;
            }
            if ancestor.has_if {
                needs_key = true;
            }
        }
    }

    let slots: Vec<_> = el
        .scoped_slots
        .iter()
        .map(|slot| gen_scoped_slot(&slot.element, SkipFlags::empty(), state))
        .collect();
    let slots = slots.join(",");

    if needs_force_update {
        format!("scopedSlots:_u([{}],null,true)", slots)
    } else if needs_key {
        format!(
            "scopedSlots:_u([{}],null,false,{})",
            slots,
            content_hash(&slots)
        )
    } else {
        format!("scopedSlots:_u([{}])", slots)
    }
}

pub(crate) fn gen_scoped_slot(
    el: &ElementNode,
    skip: SkipFlags,
    state: &mut CodegenState<'_>,
) -> String {
    let legacy = el.attrs_map.contains_key("slot-scope");
    if el.if_expr.is_some() && !skip.contains(SkipFlags::IF) && !legacy {
        return gen_if(el, skip, state, BranchGen::ScopedSlot, "null");
    }
    if el.for_info.is_some() && !skip.contains(SkipFlags::FOR) {
        return gen_for(el, skip, state, BranchGen::ScopedSlot);
    }

    let scope = match el.slot_scope.as_deref() {
        None | Some(EMPTY_SLOT_SCOPE_TOKEN) => "",
        Some(scope) => scope,
    };

    let body = if el.is_template() {
        let children =
            gen_children(el, state, false).unwrap_or_else(|| "undefined".to_owned());
        match (&el.if_expr, legacy) {
            // Legacy syntax keeps the condition inside the slot function so
            // the parent still re-renders on its flip.
            (Some(condition), true) => format!("({})?{}:undefined", condition, children),
            _ => children,
        }
    } else {
        gen_element(el, skip, state)
    };

    let key = el.slot_target.as_deref().unwrap_or("\"default\"");
    let proxy = if scope.is_empty() { ",proxy:true" } else { "" };
    format!(
        "{{key:{},fn:function({}){{return {}}}{}}}",
        key, scope, body, proxy
    )
}

/// djb2 over UTF-16 code units, scanned back to front. Stable across
/// compilations of the same slot content.
fn content_hash(s: &str) -> u32 {
    let units: Vec<u16> = s.encode_utf16().collect();
    let mut hash: u32 = 5381;
    for unit in units.into_iter().rev() {
        hash = hash.wrapping_mul(33) ^ u32::from(unit);
    }
    hash
}
