//! Static subtree optimizer.
//!
//! Two passes over the finished AST: the first flags every node that can
//! never change, the second elects static roots, the subtrees worth
//! hoisting into their own render functions. Both passes only flip
//! `STATIC*` flags; the tree shape is untouched.

use stampa_relief::{AstNode, CompilerOptions, ElementFlags, ElementNode, IfBlock};

pub fn optimize(root: &mut ElementNode, options: &CompilerOptions) {
    mark_static_element(root, false, options);
    mark_static_roots(root, false);
}

/// Whether an element is inherently static, before considering children.
/// `template_for` is true for direct children of `<template v-for>`
/// chains, which must stay dynamic so list updates re-render them.
fn is_static_element(el: &ElementNode, template_for: bool, options: &CompilerOptions) -> bool {
    if el.has_flag(ElementFlags::PRE) {
        return true;
    }
    !el.has_flag(ElementFlags::HAS_BINDINGS)
        && el.if_expr.is_none()
        && el.else_if_expr.is_none()
        && !el.is_else
        && el.for_info.is_none()
        && !matches!(el.tag.as_str(), "slot" | "component")
        && (options.is_reserved_tag)(&el.tag)
        && !template_for
        && !el.has_flag(ElementFlags::ONCE)
        && !el.has_flag(ElementFlags::INLINE_TEMPLATE)
        && !el.has_flag(ElementFlags::FORBIDDEN)
        && el.key.is_none()
        && el.ref_expr.is_none()
        && el.slot_name.is_none()
        && el.slot_target.is_none()
        && el.slot_scope.is_none()
        && el.scoped_slots.is_empty()
        && el.component_is.is_none()
        && el.events.is_empty()
        && el.native_events.is_empty()
        && el.directives.is_empty()
        && el.dom_props.is_empty()
        && el.class_binding.is_none()
        && el.style_binding.is_none()
        && el.model.is_none()
        && el.object_bind.is_none()
        && el.listeners_bind.is_none()
}

fn mark_static_node(node: &mut AstNode, template_for: bool, options: &CompilerOptions) -> bool {
    match node {
        AstNode::Element(el) => {
            mark_static_element(el, template_for, options);
            el.has_flag(ElementFlags::STATIC)
        }
        AstNode::Text(t) => {
            t.is_static = t.expression.is_none();
            t.is_static
        }
        AstNode::Comment(_) => true,
    }
}

fn mark_static_element(el: &mut ElementNode, template_for: bool, options: &CompilerOptions) {
    let mut is_static = is_static_element(el, template_for, options);

    // Component slot content is left unmarked: it may be re-rendered by
    // the child and must never be hoisted by the parent.
    let descend = (options.is_reserved_tag)(&el.tag)
        || el.tag == "slot"
        || el.attrs_map.contains_key("inline-template");
    if descend {
        let child_template_for = el.is_template() && (el.for_info.is_some() || template_for);
        for child in &mut el.children {
            if !mark_static_node(child, child_template_for, options) {
                is_static = false;
            }
        }
        for condition in &mut el.if_conditions {
            if let IfBlock::Element(block) = &mut condition.block {
                mark_static_element(block, template_for, options);
                if !block.has_flag(ElementFlags::STATIC) {
                    is_static = false;
                }
            }
        }
    }

    if is_static {
        el.set_flag(ElementFlags::STATIC);
    }
}

fn mark_static_roots(el: &mut ElementNode, in_for: bool) {
    if (el.has_flag(ElementFlags::STATIC) || el.has_flag(ElementFlags::ONCE)) && in_for {
        el.set_flag(ElementFlags::STATIC_IN_FOR);
    }

    // A static root must amortize its own render function: a lone text
    // child is cheaper to re-create inline than to hoist.
    if el.has_flag(ElementFlags::STATIC) && !el.children.is_empty() {
        let only_text_child =
            el.children.len() == 1 && matches!(el.children[0], AstNode::Text(_));
        if !only_text_child {
            el.set_flag(ElementFlags::STATIC_ROOT);
            return;
        }
    }

    let child_in_for = in_for || el.for_info.is_some();
    for child in &mut el.children {
        if let Some(child_el) = child.as_element_mut() {
            mark_static_roots(child_el, child_in_for);
        }
    }
    for condition in &mut el.if_conditions {
        if let IfBlock::Element(block) = &mut condition.block {
            mark_static_roots(block, in_for);
        }
    }
}
