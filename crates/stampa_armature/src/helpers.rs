//! Attribute accessors and element mutation helpers used by the builder
//! and by compile-time directive handlers.

use regex::Regex;
use stampa_carton::{SourceRange, String};
use stampa_relief::{
    AttributeRaw, BoundAttr, Directive, ElementFlags, ElementNode, EventHandler, TransformContext,
};

use crate::filter_parser::parse_filters;

/// JSON string literal for embedding text in generated code.
pub fn quote_json(s: &str) -> std::string::String {
    serde_json::Value::String(s.to_owned()).to_string()
}

/// Take a raw attribute by name. The value stays in `attrs_map` unless
/// `remove_from_map` is set, so later passes can still observe it.
pub fn get_and_remove_attr(
    el: &mut ElementNode,
    name: &str,
    remove_from_map: bool,
) -> Option<String> {
    let value = el.attrs_map.get(name).cloned()?;
    if let Some(pos) = el.attrs_list.iter().position(|a| a.name.as_str() == name) {
        el.attrs_list.remove(pos);
    }
    if remove_from_map {
        el.attrs_map.remove(name);
    }
    Some(value)
}

/// Take the first raw attribute whose name matches `pattern`.
pub fn get_and_remove_attr_by_regex(el: &mut ElementNode, pattern: &Regex) -> Option<AttributeRaw> {
    let pos = el
        .attrs_list
        .iter()
        .position(|a| pattern.is_match(&a.name))?;
    Some(el.attrs_list.remove(pos))
}

/// Resolve a possibly-bound attribute: `:name`/`v-bind:name` wins and goes
/// through the filter parser; a static `name` is returned as a quoted
/// literal when `get_static` allows it.
pub fn get_binding_attr(
    el: &mut ElementNode,
    name: &str,
    get_static: bool,
) -> Option<std::string::String> {
    let dynamic = get_and_remove_attr(el, &format!(":{}", name), false)
        .or_else(|| get_and_remove_attr(el, &format!("v-bind:{}", name), false));
    if let Some(value) = dynamic {
        return Some(parse_filters(&value));
    }
    if get_static {
        if let Some(value) = get_and_remove_attr(el, name, false) {
            return Some(quote_json(&value));
        }
    }
    None
}

pub fn add_attr(el: &mut ElementNode, name: String, value: String, range: SourceRange, dynamic: bool) {
    el.attrs.push(BoundAttr {
        name,
        value,
        dynamic,
        range,
    });
    el.clear_flag(ElementFlags::PLAIN);
}

pub fn add_prop(el: &mut ElementNode, name: String, value: String, range: SourceRange, dynamic: bool) {
    el.dom_props.push(BoundAttr {
        name,
        value,
        dynamic,
        range,
    });
    el.clear_flag(ElementFlags::PLAIN);
}

pub fn add_directive(el: &mut ElementNode, dir: Directive) {
    el.directives.push(dir);
    el.clear_flag(ElementFlags::PLAIN);
}

/// Fold a capture/once/passive marker into the event name. Dynamic names
/// defer the concatenation to runtime via `_p`.
pub fn prepend_modifier_marker(marker: char, name: &str, dynamic: bool) -> std::string::String {
    if dynamic {
        format!("_p({},\"{}\")", name, marker)
    } else {
        format!("{}{}", marker, name)
    }
}

fn take_modifier(modifiers: &mut Vec<String>, name: &str) -> bool {
    match modifiers.iter().position(|m| m.as_str() == name) {
        Some(pos) => {
            modifiers.remove(pos);
            true
        }
        None => false,
    }
}

/// Register an event handler, folding mouse-button and sigil modifiers into
/// the event name. `important` handlers run before existing ones.
#[allow(clippy::too_many_arguments)]
pub fn add_handler(
    el: &mut ElementNode,
    name: &str,
    value: &str,
    mut modifiers: Vec<String>,
    important: bool,
    range: SourceRange,
    dynamic: bool,
    cx: &mut TransformContext<'_>,
) {
    if modifiers.iter().any(|m| m == "prevent") && modifiers.iter().any(|m| m == "passive") {
        cx.warn(
            "passive and prevent can't be used together. Passive handler can't prevent default event.",
            range,
        );
    }

    // The right and middle buttons only fire contextmenu/mouseup.
    let mut name = name.to_owned();
    if modifiers.iter().any(|m| m == "right") {
        if dynamic {
            name = format!("({})==='click'?'contextmenu':({})", name, name);
        } else if name == "click" {
            name = "contextmenu".to_owned();
            take_modifier(&mut modifiers, "right");
        }
    } else if modifiers.iter().any(|m| m == "middle") {
        if dynamic {
            name = format!("({})==='click'?'mouseup':({})", name, name);
        } else if name == "click" {
            name = "mouseup".to_owned();
        }
    }

    if take_modifier(&mut modifiers, "capture") {
        name = prepend_modifier_marker('!', &name, dynamic);
    }
    if take_modifier(&mut modifiers, "once") {
        name = prepend_modifier_marker('~', &name, dynamic);
    }
    if take_modifier(&mut modifiers, "passive") {
        name = prepend_modifier_marker('&', &name, dynamic);
    }

    let native = take_modifier(&mut modifiers, "native");
    let events = if native {
        &mut el.native_events
    } else {
        &mut el.events
    };

    let handler = EventHandler {
        value: value.trim().into(),
        dynamic,
        modifiers,
        range,
    };

    match events.get_mut(&name) {
        Some(handlers) => {
            if important {
                handlers.insert(0, handler);
            } else {
                handlers.push(handler);
            }
        }
        None => events.insert(name.into(), vec![handler]),
    }

    el.clear_flag(ElementFlags::PLAIN);
}

#[cfg(test)]
mod tests {
    use super::*;
    use stampa_relief::CompilerOptions;

    fn element_with_attrs(attrs: &[(&str, &str)]) -> ElementNode {
        let mut el = ElementNode::new("div", SourceRange::STUB);
        for (name, value) in attrs {
            let attr = AttributeRaw {
                name: (*name).into(),
                value: (*value).into(),
                range: SourceRange::STUB,
            };
            el.attrs_map.insert(attr.name.clone(), attr.value.clone());
            el.raw_attrs_map.insert(attr.name.clone(), attr.clone());
            el.attrs_list.push(attr);
        }
        el
    }

    #[test]
    fn test_get_and_remove_attr() {
        let mut el = element_with_attrs(&[("id", "app")]);
        assert_eq!(get_and_remove_attr(&mut el, "id", false).as_deref(), Some("app"));
        assert!(el.attrs_list.is_empty());
        // Map retains the value for later passes.
        assert_eq!(el.attr_value("id"), Some("app"));
        assert!(get_and_remove_attr(&mut el, "missing", false).is_none());
    }

    #[test]
    fn test_get_binding_attr_prefers_dynamic() {
        let mut el = element_with_attrs(&[(":key", "item.id"), ("key", "static")]);
        assert_eq!(get_binding_attr(&mut el, "key", true).as_deref(), Some("item.id"));

        let mut el = element_with_attrs(&[("key", "static")]);
        assert_eq!(get_binding_attr(&mut el, "key", true).as_deref(), Some("\"static\""));
        assert_eq!(get_binding_attr(&mut el, "key", false), None);
    }

    #[test]
    fn test_add_handler_sigils() {
        let options = CompilerOptions::default();
        let mut cx = TransformContext::new(&options);
        let mut el = ElementNode::new("div", SourceRange::STUB);
        add_handler(
            &mut el,
            "click",
            "go",
            vec!["capture".into(), "once".into()],
            false,
            SourceRange::STUB,
            false,
            &mut cx,
        );
        let (name, handlers) = &el.events.0[0];
        assert_eq!(name, "~!click");
        assert!(handlers[0].modifiers.is_empty());
    }

    #[test]
    fn test_add_handler_right_button() {
        let options = CompilerOptions::default();
        let mut cx = TransformContext::new(&options);
        let mut el = ElementNode::new("div", SourceRange::STUB);
        add_handler(
            &mut el,
            "click",
            "go",
            vec!["right".into()],
            false,
            SourceRange::STUB,
            false,
            &mut cx,
        );
        assert_eq!(el.events.0[0].0, "contextmenu");
    }

    #[test]
    fn test_add_handler_native_and_important() {
        let options = CompilerOptions::default();
        let mut cx = TransformContext::new(&options);
        let mut el = ElementNode::new("my-comp", SourceRange::STUB);
        add_handler(&mut el, "click", "a", vec!["native".into()], false, SourceRange::STUB, false, &mut cx);
        add_handler(&mut el, "click", "b", vec!["native".into()], true, SourceRange::STUB, false, &mut cx);
        assert!(el.events.is_empty());
        let handlers = el.native_events.get_mut("click").unwrap();
        assert_eq!(handlers[0].value, "b");
        assert_eq!(handlers[1].value, "a");
    }

    #[test]
    fn test_prevent_passive_conflict_warns() {
        let options = CompilerOptions::default();
        let mut cx = TransformContext::new(&options);
        let mut el = ElementNode::new("div", SourceRange::STUB);
        add_handler(
            &mut el,
            "scroll",
            "go",
            vec!["prevent".into(), "passive".into()],
            false,
            SourceRange::STUB,
            false,
            &mut cx,
        );
        assert_eq!(cx.diagnostics.len(), 1);
    }

    #[test]
    fn test_dynamic_modifier_marker() {
        assert_eq!(prepend_modifier_marker('!', "event", true), "_p(event,\"!\")");
        assert_eq!(prepend_modifier_marker('!', "click", false), "!click");
    }
}
