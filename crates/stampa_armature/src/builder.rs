//! AST builder.
//!
//! Consumes scanner events and produces the element tree, applying the
//! structural directives (`v-pre`, `v-for`, `v-if`, `v-once`) at open time
//! and the generic element processing (key, ref, slots, component,
//! attributes) at close time, when the element's subtree is complete.
//! Parent context lives only on the open-element stack; nodes never point
//! back at their parents.

use once_cell::sync::Lazy;
use regex::Regex;
use stampa_carton::{camelize, hyphenate, SourceRange, String};
use stampa_relief::{
    AstNode, AttributeRaw, BoundAttr, CommentNode, CompilerOptions, Directive, ElementFlags,
    ElementNode, ForInfo, IfBlock, IfCondition, ScopedSlotEntry, TextNode, TransformContext,
    WhitespaceMode,
};

use crate::filter_parser::parse_filters;
use crate::helpers::{
    add_attr, add_directive, add_handler, add_prop, get_and_remove_attr,
    get_and_remove_attr_by_regex, get_binding_attr, quote_json,
};
use crate::model::gen_assignment_code;
use crate::scanner::{scan_template, OpenTag, ScanSink};
use crate::text_parser::parse_text;

static DIR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v-|^@|^:|^\.|^#").unwrap());
static BIND_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:|^\.|^v-bind:").unwrap());
static ON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@|^v-on:").unwrap());
static SLOT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v-slot(:|$)|^#").unwrap());
static FOR_ALIAS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\s\S]*?)\s+(?:in|of)\s+([\s\S]*)").unwrap());
static FOR_ITERATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",([^,\}\]]*)(?:,([^,\}\]]*))?$").unwrap());
static STRIP_PARENS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(|\)$").unwrap());
static DYNAMIC_ARG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[.*\]$").unwrap());
static IE_NS_BUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^xmlns:NS\d+").unwrap());
static IE_NS_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^NS\d+:").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\n\x0C]+").unwrap());

/// Placeholder scope for `v-slot` without a value; distinguishes
/// `v-slot:name` from a plain `slot="name"` at codegen time.
pub const EMPTY_SLOT_SCOPE_TOKEN: &str = "_empty_";

/// Build the template into an element tree. `None` when the template holds
/// no root element at all.
pub fn build_template(
    source: &str,
    options: &CompilerOptions,
    cx: &mut TransformContext<'_>,
) -> Option<Box<ElementNode>> {
    let mut builder = AstBuilder::new(source, options);
    scan_template(source, options, &mut builder, cx);
    builder.into_root()
}

struct PendingElement {
    el: ElementNode,
    /// Whether this element pushed its `v-for` alias onto the context.
    pushed_alias: bool,
}

/// Scan-event receiver that assembles the tree.
pub struct AstBuilder<'s, 'o> {
    source: &'s str,
    options: &'o CompilerOptions,
    root: Option<Box<ElementNode>>,
    stack: Vec<PendingElement>,
}

impl<'s, 'o> AstBuilder<'s, 'o> {
    pub fn new(source: &'s str, options: &'o CompilerOptions) -> Self {
        Self {
            source,
            options,
            root: None,
            stack: Vec::new(),
        }
    }

    pub fn into_root(self) -> Option<Box<ElementNode>> {
        self.root
    }

    fn close_element(&mut self, pending: PendingElement, cx: &mut TransformContext<'_>) {
        let PendingElement {
            mut el,
            pushed_alias,
        } = pending;

        if !cx.in_pre {
            trim_ending_whitespace(&mut el);
        }

        if !cx.in_v_pre && !el.is_rendered() {
            let parent = self.stack.last().map(|p| &p.el);
            process_element(&mut el, parent, cx);
        }

        if pushed_alias {
            cx.for_aliases.pop();
        }
        if el.has_flag(ElementFlags::PRE) {
            cx.in_v_pre = false;
        }
        if (self.options.is_pre_tag)(&el.tag) {
            cx.in_pre = false;
        }

        let modules = self.options.modules.clone();
        for module in &modules {
            module.post_transform(&mut el, cx);
        }

        if self.stack.is_empty() {
            match &mut self.root {
                None => {
                    check_root_constraints(&el, cx);
                    self.root = Some(Box::new(el));
                }
                Some(root) => {
                    // Additional roots are only legal as arms of the first
                    // root's conditional chain.
                    if root.if_expr.is_some() && (el.else_if_expr.is_some() || el.is_else) {
                        check_root_constraints(&el, cx);
                        let exp = el.else_if_expr.as_ref().map(|e| e.as_str().to_owned());
                        add_if_condition(
                            root,
                            IfCondition {
                                exp: exp.map(Into::into),
                                block: IfBlock::Element(Box::new(el)),
                            },
                        );
                    } else {
                        cx.warn_once(
                            "Component template should contain exactly one root element. \
                             If you are using v-if on multiple elements, use v-else-if \
                             to chain them instead.",
                            el.range,
                        );
                    }
                }
            }
            return;
        }

        if el.has_flag(ElementFlags::FORBIDDEN) {
            return;
        }
        let Some(parent) = self.stack.last_mut().map(|p| &mut p.el) else {
            return;
        };

        if el.else_if_expr.is_some() || el.is_else {
            process_if_conditions(el, parent, cx);
        } else if el.slot_scope.is_some() {
            // Legacy scoped slot: owned by the enclosing component's slot
            // table, not its children.
            let key = el
                .slot_target
                .clone()
                .unwrap_or_else(|| "\"default\"".into());
            let dynamic = el.has_flag(ElementFlags::SLOT_TARGET_DYNAMIC);
            parent.scoped_slots.push(ScopedSlotEntry {
                key,
                dynamic,
                element: Box::new(el),
            });
        } else {
            parent.children.push(AstNode::Element(Box::new(el)));
        }
    }
}

impl ScanSink for AstBuilder<'_, '_> {
    fn open_tag(&mut self, tag: OpenTag, cx: &mut TransformContext<'_>) {
        let OpenTag {
            tag,
            mut attrs,
            self_closing,
            range,
        } = tag;

        let ns = self
            .stack
            .last()
            .and_then(|p| p.el.ns.clone())
            .or_else(|| (self.options.get_namespace)(&tag).map(String::from));

        // IE serializes svg subtrees with synthetic xmlns:NS attributes.
        if ns.as_deref() == Some("svg") {
            attrs = guard_ie_svg_attrs(attrs);
        }

        let mut el = ElementNode::new(tag, range);
        el.ns = ns;
        for attr in attrs {
            if el.attrs_map.contains_key(&attr.name) {
                cx.warn(format!("duplicate attribute: {}", attr.name), attr.range);
            }
            el.attrs_map.insert(attr.name.clone(), attr.value.clone());
            el.raw_attrs_map.insert(attr.name.clone(), attr.clone());
            el.attrs_list.push(attr);
        }

        if (self.options.is_forbidden_tag)(&el.tag, el.attr_value("type")) {
            el.set_flag(ElementFlags::FORBIDDEN);
            cx.warn(
                format!(
                    "Templates should only be responsible for mapping the state to the UI. \
                     Avoid placing tags with side-effects in your templates, such as <{}>, \
                     as they will not be parsed.",
                    el.tag
                ),
                range,
            );
        }

        let modules = self.options.modules.clone();
        for module in &modules {
            if let Some(replacement) = module.pre_transform(&mut el, cx) {
                el = replacement;
            }
        }

        if !cx.in_v_pre {
            process_pre(&mut el, cx);
        }
        if (self.options.is_pre_tag)(&el.tag) {
            cx.in_pre = true;
        }

        if cx.in_v_pre {
            process_raw_attrs(&mut el);
        } else if !el.is_rendered() {
            process_for(&mut el, cx);
            process_if(&mut el, cx);
            process_once(&mut el);
        }

        let mut pushed_alias = false;
        if let Some(info) = &el.for_info {
            cx.for_aliases.push(info.alias.clone());
            pushed_alias = true;
        }

        let pending = PendingElement { el, pushed_alias };
        if self_closing {
            self.close_element(pending, cx);
        } else {
            self.stack.push(pending);
        }
    }

    fn close_tag(&mut self, _tag: &str, range: SourceRange, cx: &mut TransformContext<'_>) {
        // The scanner's stack discipline guarantees this matches our top.
        let Some(mut pending) = self.stack.pop() else {
            return;
        };
        pending.el.range.end = range.end;
        self.close_element(pending, cx);
    }

    fn text(&mut self, content: &str, range: SourceRange, cx: &mut TransformContext<'_>) {
        let Some(parent) = self.stack.last_mut().map(|p| &mut p.el) else {
            if content == self.source {
                cx.warn_once(
                    "Component template requires a root element, rather than just text.",
                    range,
                );
            } else if !content.trim().is_empty() {
                cx.warn_once(
                    format!(
                        "text \"{}\" outside root element will be ignored.",
                        content.trim()
                    ),
                    range,
                );
            }
            return;
        };

        // IE repeats a textarea's placeholder as its text content.
        if parent.tag == "textarea" && parent.attr_value("placeholder") == Some(content) {
            return;
        }

        let text: std::string::String = if cx.in_pre || !content.trim().is_empty() {
            content.to_owned()
        } else if parent.children.is_empty() {
            // Whitespace-only first child collapses to nothing.
            std::string::String::new()
        } else {
            match self.options.whitespace {
                WhitespaceMode::Condense => {
                    if content.contains('\n') {
                        std::string::String::new()
                    } else {
                        " ".to_owned()
                    }
                }
                WhitespaceMode::Preserve => " ".to_owned(),
            }
        };
        if text.is_empty() {
            return;
        }

        let text = if !cx.in_pre && self.options.whitespace == WhitespaceMode::Condense {
            WHITESPACE_RE.replace_all(&text, " ").into_owned()
        } else {
            text
        };

        let parsed = if !cx.in_v_pre && text != " " {
            parse_text(&text, self.options.delimiter_pair())
        } else {
            None
        };

        let child = match parsed {
            Some(res) => Some(AstNode::Text(TextNode {
                content: text.as_str().into(),
                expression: Some(res.expression.into()),
                tokens: res.tokens,
                is_static: false,
                range,
            })),
            None => {
                let last_is_space = matches!(
                    parent.children.last(),
                    Some(AstNode::Text(t)) if t.content == " "
                );
                (text != " " || parent.children.is_empty() || !last_is_space)
                    .then(|| AstNode::Text(TextNode::literal(text.as_str(), range)))
            }
        };
        if let Some(child) = child {
            parent.children.push(child);
        }
    }

    fn comment(&mut self, content: &str, range: SourceRange, _cx: &mut TransformContext<'_>) {
        if let Some(parent) = self.stack.last_mut() {
            parent.el.children.push(AstNode::Comment(CommentNode {
                content: content.into(),
                range,
            }));
        }
    }
}

fn trim_ending_whitespace(el: &mut ElementNode) {
    while matches!(
        el.children.last(),
        Some(AstNode::Text(t)) if t.expression.is_none() && t.content == " "
    ) {
        el.children.pop();
    }
}

fn check_root_constraints(el: &ElementNode, cx: &mut TransformContext<'_>) {
    if el.tag == "slot" || el.tag == "template" {
        cx.warn_once(
            format!(
                "Cannot use <{}> as component root element because it may contain multiple nodes.",
                el.tag
            ),
            el.range,
        );
    }
    if el.for_info.is_some() {
        cx.warn_once(
            "Cannot use v-for on stateful component root element because it renders \
             multiple elements.",
            el.range,
        );
    }
}

fn guard_ie_svg_attrs(attrs: Vec<AttributeRaw>) -> Vec<AttributeRaw> {
    attrs
        .into_iter()
        .filter_map(|mut attr| {
            if IE_NS_BUG_RE.is_match(&attr.name) {
                return None;
            }
            if let Some(m) = IE_NS_PREFIX_RE.find(&attr.name) {
                attr.name = attr.name[m.end()..].into();
            }
            Some(attr)
        })
        .collect()
}

/// Range of `:name`/`v-bind:name`/`name`, whichever was written.
fn binding_attr_range(el: &ElementNode, name: &str) -> SourceRange {
    el.raw_attr(&format!(":{}", name))
        .or_else(|| el.raw_attr(&format!("v-bind:{}", name)))
        .or_else(|| el.raw_attr(name))
        .map(|a| a.range)
        .unwrap_or(el.range)
}

fn maybe_component(el: &ElementNode, cx: &TransformContext<'_>) -> bool {
    if el.component_is.is_some()
        || el.attrs_map.contains_key(":is")
        || el.attrs_map.contains_key("v-bind:is")
    {
        return true;
    }
    match el.attr_value("is") {
        Some(is_value) => !(cx.options.is_reserved_tag)(is_value),
        None => !(cx.options.is_reserved_tag)(&el.tag),
    }
}

pub fn process_pre(el: &mut ElementNode, cx: &mut TransformContext<'_>) {
    if get_and_remove_attr(el, "v-pre", false).is_some() {
        el.set_flag(ElementFlags::PRE);
        cx.in_v_pre = true;
    }
}

/// Inside `v-pre`, every attribute is a literal.
pub fn process_raw_attrs(el: &mut ElementNode) {
    if !el.attrs_list.is_empty() {
        el.attrs = el
            .attrs_list
            .iter()
            .map(|a| BoundAttr {
                name: a.name.clone(),
                value: quote_json(&a.value).into(),
                dynamic: false,
                range: a.range,
            })
            .collect();
    } else if !el.has_flag(ElementFlags::PRE) {
        el.set_flag(ElementFlags::PLAIN);
    }
}

pub fn process_for(el: &mut ElementNode, cx: &mut TransformContext<'_>) {
    if let Some(exp) = get_and_remove_attr(el, "v-for", false) {
        match parse_for(&exp) {
            Some(info) => {
                if el.mark_structural(stampa_relief::StructuralMarks::FOR) {
                    el.for_info = Some(info);
                }
            }
            None => cx.warn(
                format!("Invalid v-for expression: {}", exp),
                el.attr_range("v-for"),
            ),
        }
    }
}

pub fn parse_for(exp: &str) -> Option<ForInfo> {
    let caps = FOR_ALIAS_RE.captures(exp)?;
    let for_expr = caps[2].trim().to_owned();
    let alias_raw = caps[1].trim().to_owned();
    let alias = STRIP_PARENS_RE.replace_all(&alias_raw, "").into_owned();

    let mut info = ForInfo {
        for_expr: for_expr.into(),
        alias: alias.trim().into(),
        iterator1: None,
        iterator2: None,
    };
    if let Some(it) = FOR_ITERATOR_RE.captures(&alias) {
        let whole = it.get(0).map(|m| m.start()).unwrap_or(alias.len());
        info.alias = alias[..whole].trim().into();
        info.iterator1 = Some(it[1].trim().into());
        if let Some(i2) = it.get(2) {
            info.iterator2 = Some(i2.as_str().trim().into());
        }
    }
    Some(info)
}

pub fn process_if(el: &mut ElementNode, _cx: &mut TransformContext<'_>) {
    if let Some(exp) = get_and_remove_attr(el, "v-if", false) {
        if el.mark_structural(stampa_relief::StructuralMarks::IF) {
            el.if_expr = Some(exp.clone());
            add_if_condition(
                el,
                IfCondition {
                    exp: Some(exp),
                    block: IfBlock::This,
                },
            );
        }
    } else {
        if get_and_remove_attr(el, "v-else", false).is_some() {
            el.is_else = true;
        }
        if let Some(exp) = get_and_remove_attr(el, "v-else-if", false) {
            el.else_if_expr = Some(exp);
        }
    }
}

pub fn add_if_condition(el: &mut ElementNode, condition: IfCondition) {
    el.if_conditions.push(condition);
}

fn process_if_conditions(el: ElementNode, parent: &mut ElementNode, cx: &mut TransformContext<'_>) {
    // Drop text between the arms of the chain.
    loop {
        match parent.children.last() {
            Some(AstNode::Element(_)) | None => break,
            Some(AstNode::Text(t)) => {
                if !t.content.trim().is_empty() {
                    cx.warn(
                        format!(
                            "text \"{}\" between v-if and v-else(-if) will be ignored.",
                            t.content.trim()
                        ),
                        t.range,
                    );
                }
                parent.children.pop();
            }
            Some(AstNode::Comment(_)) => {
                parent.children.pop();
            }
        }
    }

    match parent.children.last_mut().and_then(|c| c.as_element_mut()) {
        Some(prev) if prev.if_expr.is_some() => {
            let exp = el.else_if_expr.clone();
            add_if_condition(
                prev,
                IfCondition {
                    exp,
                    block: IfBlock::Element(Box::new(el)),
                },
            );
        }
        _ => {
            let label = match &el.else_if_expr {
                Some(exp) => format!("else-if=\"{}\"", exp),
                None => "else".to_owned(),
            };
            cx.warn(
                format!(
                    "v-{} used on element <{}> without corresponding v-if.",
                    label, el.tag
                ),
                el.range,
            );
        }
    }
}

pub fn process_once(el: &mut ElementNode) {
    if el.attrs_map.contains_key("v-once") {
        get_and_remove_attr(el, "v-once", false);
        if el.mark_structural(stampa_relief::StructuralMarks::ONCE) {
            el.set_flag(ElementFlags::ONCE);
        }
    }
}

/// The generic per-element pass, run once the subtree is complete. `parent`
/// is the enclosing open element when one exists; module pre-transforms may
/// call this without one.
pub fn process_element(
    el: &mut ElementNode,
    parent: Option<&ElementNode>,
    cx: &mut TransformContext<'_>,
) {
    process_key(el, parent, cx);

    // A node with nothing but structural directives takes the minimal
    // codegen path.
    if el.key.is_none() && el.scoped_slots.is_empty() && el.attrs_list.is_empty() {
        el.set_flag(ElementFlags::PLAIN);
    }

    process_ref(el, cx);
    process_slot_content(el, parent, cx);
    process_slot_outlet(el, cx);
    process_component(el);

    let modules = cx.options.modules.clone();
    for module in &modules {
        module.transform(el, cx);
    }

    process_attrs(el, cx);
    el.mark_rendered();
}

fn process_key(el: &mut ElementNode, parent: Option<&ElementNode>, cx: &mut TransformContext<'_>) {
    let Some(exp) = get_binding_attr(el, "key", true) else {
        return;
    };
    if el.is_template() {
        cx.warn(
            "<template> cannot be keyed. Place the key on real elements instead.",
            binding_attr_range(el, "key"),
        );
    }
    if let Some(info) = &el.for_info {
        let iterator = info.iterator2.as_ref().or(info.iterator1.as_ref());
        if iterator.is_some_and(|it| it.as_str() == exp)
            && parent.is_some_and(|p| p.tag == "transition-group")
        {
            cx.warn(
                "Do not use v-for index as key on <transition-group> children, \
                 this is the same as not using keys.",
                binding_attr_range(el, "key"),
            );
        }
    }
    el.key = Some(exp.into());
}

fn process_ref(el: &mut ElementNode, cx: &mut TransformContext<'_>) {
    if let Some(r) = get_binding_attr(el, "ref", true) {
        el.ref_expr = Some(r.into());
        if !cx.for_aliases.is_empty() {
            el.set_flag(ElementFlags::REF_IN_FOR);
        }
    }
}

fn get_slot_name(
    binding: &AttributeRaw,
    cx: &mut TransformContext<'_>,
) -> (std::string::String, bool) {
    let mut name = SLOT_RE.replace(&binding.name, "").into_owned();
    if name.is_empty() {
        if binding.name.starts_with('#') {
            cx.warn(
                "v-slot shorthand syntax requires a slot name.",
                binding.range,
            );
        } else {
            name = "default".to_owned();
        }
    }
    if DYNAMIC_ARG_RE.is_match(&name) {
        (format!("({})", &name[1..name.len() - 1]), true)
    } else {
        (format!("\"{}\"", name), false)
    }
}

fn process_slot_content(
    el: &mut ElementNode,
    parent: Option<&ElementNode>,
    cx: &mut TransformContext<'_>,
) {
    if el.is_template() {
        let mut slot_scope = get_and_remove_attr(el, "scope", false);
        if slot_scope.is_some() {
            cx.tip(
                "the \"scope\" attribute for scoped slots have been deprecated and \
                 replaced by \"slot-scope\" since 2.5. The new \"slot-scope\" attribute \
                 can also be used on plain elements in addition to <template> to denote \
                 scoped slots.",
                el.attr_range("scope"),
            );
        }
        if slot_scope.is_none() {
            slot_scope = get_and_remove_attr(el, "slot-scope", false);
        }
        el.slot_scope = slot_scope;
    } else if let Some(scope) = get_and_remove_attr(el, "slot-scope", false) {
        if el.for_info.is_some() {
            cx.tip(
                format!(
                    "Ambiguous combined usage of slot-scope and v-for on <{}> \
                     (v-for takes higher priority). Use a wrapper <template> for the \
                     scoped slot to make it clearer.",
                    el.tag
                ),
                el.attr_range("slot-scope"),
            );
        }
        el.slot_scope = Some(scope);
    }

    // Legacy slot="name" target.
    if let Some(target) = get_binding_attr(el, "slot", true) {
        el.slot_target = Some(if target == "\"\"" {
            "\"default\"".into()
        } else {
            target.as_str().into()
        });
        if el.attrs_map.contains_key(":slot") || el.attrs_map.contains_key("v-bind:slot") {
            el.set_flag(ElementFlags::SLOT_TARGET_DYNAMIC);
        }
        // Shadow DOM native slot attr, except on scoped-slot templates.
        if !el.is_template() && el.slot_scope.is_none() {
            let range = binding_attr_range(el, "slot");
            let value = el.slot_target.clone().unwrap_or_default();
            add_attr(el, "slot".into(), value, range, false);
        }
    }

    // Unified v-slot syntax.
    if el.is_template() {
        if let Some(binding) = get_and_remove_attr_by_regex(el, &SLOT_RE) {
            if el.slot_target.is_some() || el.slot_scope.is_some() {
                cx.warn("Unexpected mixed usage of different slot syntaxes.", el.range);
            }
            if let Some(p) = parent {
                if !maybe_component(p, cx) {
                    cx.warn(
                        "<template v-slot> can only appear at the root level inside \
                         the receiving component",
                        el.range,
                    );
                }
            }
            let (name, dynamic) = get_slot_name(&binding, cx);
            el.slot_target = Some(name.into());
            if dynamic {
                el.set_flag(ElementFlags::SLOT_TARGET_DYNAMIC);
            }
            el.slot_scope = Some(if binding.value.is_empty() {
                EMPTY_SLOT_SCOPE_TOKEN.into()
            } else {
                binding.value
            });
        }
    } else if let Some(binding) = get_and_remove_attr_by_regex(el, &SLOT_RE) {
        // v-slot on the component itself denotes the default slot; its
        // children move into a synthetic <template> container.
        if !maybe_component(el, cx) {
            cx.warn(
                "v-slot can only be used on components or <template>.",
                binding.range,
            );
        }
        if el.slot_scope.is_some() || el.slot_target.is_some() {
            cx.warn("Unexpected mixed usage of different slot syntaxes.", el.range);
        }
        if !el.scoped_slots.is_empty() {
            cx.warn(
                "To avoid scope ambiguity, the default slot should also use \
                 <template> syntax when there are other named slots.",
                binding.range,
            );
        }

        let (name, dynamic) = get_slot_name(&binding, cx);
        let mut container = ElementNode::new("template", binding.range);
        container.slot_target = Some(name.as_str().into());
        if dynamic {
            container.set_flag(ElementFlags::SLOT_TARGET_DYNAMIC);
        }
        container.slot_scope = Some(if binding.value.is_empty() {
            EMPTY_SLOT_SCOPE_TOKEN.into()
        } else {
            binding.value
        });
        container.children = std::mem::take(&mut el.children);
        el.scoped_slots.push(ScopedSlotEntry {
            key: name.into(),
            dynamic,
            element: Box::new(container),
        });
        el.clear_flag(ElementFlags::PLAIN);
    }
}

fn process_slot_outlet(el: &mut ElementNode, cx: &mut TransformContext<'_>) {
    if el.is_slot_outlet() {
        el.slot_name = get_binding_attr(el, "name", true).map(Into::into);
        if el.key.is_some() {
            cx.warn(
                "`key` does not work on <slot> because slots are abstract outlets \
                 and can possibly expand into multiple elements. \
                 Use the key on a wrapping element instead.",
                binding_attr_range(el, "key"),
            );
        }
    }
}

fn process_component(el: &mut ElementNode) {
    if let Some(binding) = get_binding_attr(el, "is", true) {
        el.component_is = Some(binding.into());
    }
    if get_and_remove_attr(el, "inline-template", false).is_some() {
        el.set_flag(ElementFlags::INLINE_TEMPLATE);
    }
}

/// Split trailing `.modifier` segments off an attribute name, leaving any
/// bracketed dynamic argument intact.
fn split_modifiers(name: &str) -> (usize, Vec<String>) {
    let tail_start = name.rfind(']').map(|i| i + 1).unwrap_or(0);
    match name[tail_start..].find('.') {
        Some(dot) => {
            let cut = tail_start + dot;
            let modifiers = name[cut + 1..]
                .split('.')
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect();
            (cut, modifiers)
        }
        None => (name.len(), Vec::new()),
    }
}

fn process_attrs(el: &mut ElementNode, cx: &mut TransformContext<'_>) {
    // Directive handlers invoked below may claim upcoming attributes
    // (v-model takes `value`/`true-value`/`false-value`), so the live list
    // is drained front to back instead of snapshotted.
    while !el.attrs_list.is_empty() {
        let attr = el.attrs_list.remove(0);
        let raw_name = attr.name.as_str();
        let range = attr.range;

        if !DIR_RE.is_match(raw_name) {
            // Literal attribute.
            if parse_text(&attr.value, cx.options.delimiter_pair()).is_some() {
                cx.warn(
                    format!(
                        "{}=\"{}\": Interpolation inside attributes has been removed. \
                         Use v-bind or the colon shorthand instead. For example, \
                         instead of <div id=\"{{{{ val }}}}\">, use <div :id=\"val\">.",
                        raw_name, attr.value
                    ),
                    range,
                );
            }
            add_attr(
                el,
                attr.name.clone(),
                quote_json(&attr.value).into(),
                range,
                false,
            );
            // Firefox does not update the muted attribute via setAttribute.
            if el.component_is.is_none()
                && raw_name == "muted"
                && (cx.options.must_use_prop)(
                    &el.tag,
                    el.attr_value("type").map(|t| t.to_owned()).as_deref(),
                    "muted",
                )
            {
                add_prop(el, "muted".into(), "true".into(), range, false);
            }
            continue;
        }

        el.set_flag(ElementFlags::HAS_BINDINGS);
        el.clear_flag(ElementFlags::PLAIN);

        // Modifiers attach past the directive prefix and any dynamic
        // argument brackets.
        let prefix_len = raw_name.len() - DIR_RE.replace(raw_name, "").len();
        let (cut, mut modifiers) = split_modifiers(&raw_name[prefix_len..]);
        let name = raw_name[..prefix_len + cut].to_owned();
        if raw_name.starts_with('.') {
            modifiers.push("prop".into());
        }

        if BIND_RE.is_match(&name) {
            let bare = BIND_RE.replace(&name, "").into_owned();
            let value = parse_filters(&attr.value);
            let is_dynamic = DYNAMIC_ARG_RE.is_match(&bare);
            let mut bare = if is_dynamic {
                bare[1..bare.len() - 1].to_owned()
            } else {
                bare
            };
            if value.trim().is_empty() {
                cx.warn(
                    format!(
                        "The value for a v-bind expression cannot be empty. Found in \"v-bind:{}\"",
                        bare
                    ),
                    range,
                );
            }

            let has_prop = modifiers.iter().any(|m| m == "prop");
            if has_prop && !is_dynamic {
                bare = camelize(&bare).to_string();
                if bare == "innerHtml" {
                    bare = "innerHTML".to_owned();
                }
            }
            if modifiers.iter().any(|m| m == "camel") && !is_dynamic {
                bare = camelize(&bare).to_string();
            }
            if modifiers.iter().any(|m| m == "sync") {
                let sync_gen = gen_assignment_code(&value, "$event");
                if !is_dynamic {
                    add_handler(
                        el,
                        &format!("update:{}", camelize(&bare)),
                        &sync_gen,
                        Vec::new(),
                        false,
                        range,
                        false,
                        cx,
                    );
                    if hyphenate(&bare) != camelize(&bare) {
                        add_handler(
                            el,
                            &format!("update:{}", hyphenate(&bare)),
                            &sync_gen,
                            Vec::new(),
                            false,
                            range,
                            false,
                            cx,
                        );
                    }
                } else {
                    add_handler(
                        el,
                        &format!("\"update:\"+({})", bare),
                        &sync_gen,
                        Vec::new(),
                        false,
                        range,
                        true,
                        cx,
                    );
                }
            }

            let as_prop = has_prop
                || (el.component_is.is_none()
                    && (cx.options.must_use_prop)(
                        &el.tag,
                        el.attr_value("type").map(|t| t.to_owned()).as_deref(),
                        &bare,
                    ));
            if as_prop {
                add_prop(el, bare.into(), value.into(), range, is_dynamic);
            } else {
                add_attr(el, bare.into(), value.into(), range, is_dynamic);
            }
        } else if ON_RE.is_match(&name) {
            let bare = ON_RE.replace(&name, "").into_owned();
            let is_dynamic = DYNAMIC_ARG_RE.is_match(&bare);
            let bare = if is_dynamic {
                bare[1..bare.len() - 1].to_owned()
            } else {
                bare
            };
            add_handler(el, &bare, &attr.value, modifiers, false, range, is_dynamic, cx);
        } else {
            // Generic directive, with an optional (possibly dynamic) arg.
            let bare = DIR_RE.replace(&name, "").into_owned();
            let (dir_name, arg, dynamic_arg) = match bare.find(':') {
                Some(i) => {
                    let arg = bare[i + 1..].to_owned();
                    let dir_name = bare[..i].to_owned();
                    if DYNAMIC_ARG_RE.is_match(&arg) {
                        (dir_name, Some(arg[1..arg.len() - 1].to_owned()), true)
                    } else {
                        (dir_name, Some(arg), false)
                    }
                }
                None => (bare, None, false),
            };

            if dir_name == "model" && cx.is_for_alias(attr.value.trim()) {
                cx.warn(
                    format!(
                        "<{} v-model=\"{}\">: You are binding v-model directly to a \
                         v-for iteration alias. This will not be able to modify the \
                         v-for source array because writing to the alias is like \
                         modifying a function local variable. Consider using an array \
                         of objects and use v-model on an object property instead.",
                        el.tag, attr.value
                    ),
                    range,
                );
            }

            let mut dir = Directive {
                name: dir_name.as_str().into(),
                raw_name: attr.name.clone(),
                expression: (!attr.value.is_empty()).then(|| attr.value.clone()),
                arg: arg.map(Into::into),
                dynamic_arg,
                modifiers,
                range,
                needs_runtime: true,
            };
            if let Some(handler) = cx.options.directives.get(dir_name.as_str()).cloned() {
                dir.needs_runtime = handler.handle(el, &dir, cx);
            }
            add_directive(el, dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stampa_relief::Severity;

    fn build(template: &str) -> (Option<Box<ElementNode>>, Vec<std::string::String>) {
        let options = CompilerOptions::default();
        let mut cx = TransformContext::new(&options);
        let root = build_template(template, &options, &mut cx);
        let warnings = cx
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.error.message.clone())
            .collect();
        (root, warnings)
    }

    fn build_ok(template: &str) -> Box<ElementNode> {
        let (root, warnings) = build(template);
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
        root.expect("no root element")
    }

    #[test]
    fn test_simple_tree() {
        let root = build_ok("<div><p>hi</p></div>");
        assert_eq!(root.tag, "div");
        assert_eq!(root.children.len(), 1);
        let p = root.children[0].as_element().unwrap();
        assert_eq!(p.tag, "p");
        assert!(matches!(&p.children[0], AstNode::Text(t) if t.content == "hi"));
    }

    #[test]
    fn test_interpolation_child() {
        let root = build_ok("<div>{{ msg }}</div>");
        let AstNode::Text(t) = &root.children[0] else {
            panic!("expected text child");
        };
        assert_eq!(t.expression.as_deref(), Some("_s(msg)"));
    }

    #[test]
    fn test_v_for_parsing() {
        let root = build_ok("<ul><li v-for=\"(item, index) in items\">x</li></ul>");
        let li = root.children[0].as_element().unwrap();
        let info = li.for_info.as_ref().unwrap();
        assert_eq!(info.for_expr, "items");
        assert_eq!(info.alias, "item");
        assert_eq!(info.iterator1.as_deref(), Some("index"));
        assert_eq!(info.iterator2, None);
    }

    #[test]
    fn test_v_for_object_iterators() {
        let info = parse_for("(value, key, index) in object").unwrap();
        assert_eq!(info.alias, "value");
        assert_eq!(info.iterator1.as_deref(), Some("key"));
        assert_eq!(info.iterator2.as_deref(), Some("index"));
    }

    #[test]
    fn test_v_for_of_and_destructuring() {
        let info = parse_for("{ foo, bar } of list").unwrap();
        assert_eq!(info.for_expr, "list");
        assert_eq!(info.alias, "{ foo, bar }");
    }

    #[test]
    fn test_invalid_v_for_warns() {
        let (_, warnings) = build("<div><p v-for=\"items\">x</p></div>");
        assert!(warnings.iter().any(|w| w.contains("Invalid v-for expression")));
    }

    #[test]
    fn test_if_chain_is_spliced_into_owner() {
        let root =
            build_ok("<div><p v-if=\"a\">1</p><p v-else-if=\"b\">2</p><p v-else>3</p></div>");
        assert_eq!(root.children.len(), 1);
        let owner = root.children[0].as_element().unwrap();
        assert_eq!(owner.if_conditions.len(), 3);
        assert!(matches!(owner.if_conditions[0].block, IfBlock::This));
        assert_eq!(owner.if_conditions[1].exp.as_deref(), Some("b"));
        assert_eq!(owner.if_conditions[2].exp, None);
    }

    #[test]
    fn test_v_else_without_v_if_warns() {
        let (_, warnings) = build("<div><p v-else>x</p></div>");
        assert!(warnings
            .iter()
            .any(|w| w.contains("used on element <p> without corresponding v-if")));
    }

    #[test]
    fn test_multiple_roots_warn() {
        let (_, warnings) = build("<div/><div/>");
        assert!(warnings
            .iter()
            .any(|w| w.contains("exactly one root element")));
    }

    #[test]
    fn test_conditional_roots_allowed() {
        let (root, warnings) = build("<p v-if=\"a\">1</p><p v-else>2</p>");
        assert!(warnings.is_empty());
        assert_eq!(root.unwrap().if_conditions.len(), 2);
    }

    #[test]
    fn test_v_for_root_warns() {
        let (_, warnings) = build("<div v-for=\"i in list\"/>");
        assert!(warnings
            .iter()
            .any(|w| w.contains("Cannot use v-for on stateful component root")));
    }

    #[test]
    fn test_text_only_template_warns() {
        let (root, warnings) = build("just text");
        assert!(root.is_none());
        assert!(warnings
            .iter()
            .any(|w| w.contains("requires a root element")));
    }

    #[test]
    fn test_duplicate_attribute_warns() {
        let (root, warnings) = build("<div id=\"a\" id=\"b\"/>");
        assert_eq!(
            warnings.iter().filter(|w| w.contains("duplicate attribute")).count(),
            1
        );
        // Last write wins in the deduplicated map.
        assert_eq!(root.unwrap().attr_value("id"), Some("b"));
    }

    #[test]
    fn test_v_bind_and_shorthand() {
        let root = build_ok("<div :id=\"dynamicId\" v-bind:title=\"t\"/>");
        assert_eq!(root.attrs.len(), 2);
        assert_eq!(root.attrs[0].name, "id");
        assert_eq!(root.attrs[0].value, "dynamicId");
        assert!(!root.attrs[0].dynamic);
    }

    #[test]
    fn test_v_bind_prop_modifier() {
        let root = build_ok("<div :text-content.prop=\"text\"/>");
        assert_eq!(root.dom_props.len(), 1);
        assert_eq!(root.dom_props[0].name, "textContent");
    }

    #[test]
    fn test_v_bind_sync_expands_to_update_handler() {
        let root = build_ok("<my-comp :foo.sync=\"bar\"/>");
        let handlers = root
            .events
            .iter()
            .map(|(n, _)| n.as_str())
            .collect::<Vec<_>>();
        assert_eq!(handlers, ["update:foo"]);
        assert_eq!(root.events.0[0].1[0].value, "bar=$event");
    }

    #[test]
    fn test_must_use_prop_binding() {
        let root = build_ok("<input :value=\"msg\"/>");
        assert_eq!(root.dom_props.len(), 1);
        assert_eq!(root.dom_props[0].name, "value");
        assert!(root.attrs.is_empty());
    }

    #[test]
    fn test_event_shorthand_and_modifiers() {
        let root = build_ok("<div @click.stop=\"go\" v-on:keyup.enter=\"submit\"/>");
        let names: Vec<_> = root.events.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["click", "keyup"]);
        assert_eq!(root.events.0[0].1[0].modifiers, vec!["stop"]);
    }

    #[test]
    fn test_dynamic_event_name() {
        let root = build_ok("<div @[event]=\"go\"/>");
        assert_eq!(root.events.0[0].0, "event");
        assert!(root.events.0[0].1[0].dynamic);
    }

    #[test]
    fn test_generic_directive_with_arg_and_modifiers() {
        let root = build_ok("<div v-custom:arg.a.b=\"value\"/>");
        assert_eq!(root.directives.len(), 1);
        let dir = &root.directives[0];
        assert_eq!(dir.name, "custom");
        assert_eq!(dir.arg.as_deref(), Some("arg"));
        assert!(!dir.dynamic_arg);
        assert_eq!(dir.modifiers, vec!["a", "b"]);
        assert!(dir.needs_runtime);
    }

    #[test]
    fn test_literal_attr_interpolation_warns() {
        let (_, warnings) = build("<div id=\"{{ val }}\"/>");
        assert!(warnings
            .iter()
            .any(|w| w.contains("Interpolation inside attributes has been removed")));
    }

    #[test]
    fn test_v_pre_keeps_raw_attrs() {
        let root = build_ok("<div v-pre><p :id=\"a\">{{ raw }}</p></div>");
        let p = root.children[0].as_element().unwrap();
        assert_eq!(p.attrs.len(), 1);
        assert_eq!(p.attrs[0].name, ":id");
        assert_eq!(p.attrs[0].value, "\"a\"");
        assert!(matches!(&p.children[0], AstNode::Text(t) if t.expression.is_none()));
    }

    #[test]
    fn test_v_once_flag() {
        let root = build_ok("<div v-once/>");
        assert!(root.has_flag(ElementFlags::ONCE));
    }

    #[test]
    fn test_slot_outlet_name() {
        let root = build_ok("<div><slot name=\"header\"/></div>");
        let slot = root.children[0].as_element().unwrap();
        assert_eq!(slot.slot_name.as_deref(), Some("\"header\""));
    }

    #[test]
    fn test_v_slot_on_template() {
        let root = build_ok(
            "<my-comp><template v-slot:header=\"{ item }\">{{ item }}</template></my-comp>",
        );
        assert_eq!(root.scoped_slots.len(), 1);
        let entry = &root.scoped_slots[0];
        assert_eq!(entry.key, "\"header\"");
        assert!(!entry.dynamic);
        assert_eq!(entry.element.slot_scope.as_deref(), Some("{ item }"));
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_v_slot_shorthand_with_destructuring() {
        let root = build_ok("<my-comp><template #foo=\"{x}\">{{ x }}</template></my-comp>");
        let entry = &root.scoped_slots[0];
        assert_eq!(entry.key, "\"foo\"");
        assert_eq!(entry.element.slot_scope.as_deref(), Some("{x}"));
    }

    #[test]
    fn test_dynamic_slot_name() {
        let root = build_ok("<my-comp><template v-slot:[name]>x</template></my-comp>");
        let entry = &root.scoped_slots[0];
        assert_eq!(entry.key, "(name)");
        assert!(entry.dynamic);
        assert_eq!(entry.element.slot_scope.as_deref(), Some(EMPTY_SLOT_SCOPE_TOKEN));
    }

    #[test]
    fn test_default_slot_on_component() {
        let root = build_ok("<my-comp v-slot=\"{ item }\">{{ item }}</my-comp>");
        assert_eq!(root.scoped_slots.len(), 1);
        let entry = &root.scoped_slots[0];
        assert_eq!(entry.key, "\"default\"");
        assert!(entry.element.is_template());
        assert_eq!(entry.element.children.len(), 1);
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_v_slot_on_plain_element_warns() {
        let (_, warnings) = build("<div v-slot=\"x\">y</div>");
        assert!(warnings
            .iter()
            .any(|w| w.contains("v-slot can only be used on components")));
    }

    #[test]
    fn test_legacy_slot_scope() {
        let root =
            build_ok("<my-comp><template slot-scope=\"props\">{{ props.a }}</template></my-comp>");
        assert_eq!(root.scoped_slots.len(), 1);
        assert_eq!(root.scoped_slots[0].key, "\"default\"");
        assert_eq!(
            root.scoped_slots[0].element.slot_scope.as_deref(),
            Some("props")
        );
    }

    #[test]
    fn test_legacy_slot_target() {
        let root = build_ok("<my-comp><p slot=\"header\">x</p></my-comp>");
        let p = root.children[0].as_element().unwrap();
        assert_eq!(p.slot_target.as_deref(), Some("\"header\""));
        // The native slot attribute shadow is preserved.
        assert!(p.attrs.iter().any(|a| a.name == "slot"));
    }

    #[test]
    fn test_component_is_and_inline_template() {
        let root = build_ok("<component :is=\"view\" inline-template>x</component>");
        assert_eq!(root.component_is.as_deref(), Some("view"));
        assert!(root.has_flag(ElementFlags::INLINE_TEMPLATE));
    }

    #[test]
    fn test_key_and_ref() {
        let root = build_ok("<ul><li v-for=\"i in list\" :key=\"i.id\" ref=\"item\">x</li></ul>");
        let li = root.children[0].as_element().unwrap();
        assert_eq!(li.key.as_deref(), Some("i.id"));
        assert_eq!(li.ref_expr.as_deref(), Some("\"item\""));
        assert!(li.has_flag(ElementFlags::REF_IN_FOR));
    }

    #[test]
    fn test_template_key_warns() {
        let (_, warnings) = build("<div><template :key=\"k\">x</template></div>");
        assert!(warnings.iter().any(|w| w.contains("<template> cannot be keyed")));
    }

    #[test]
    fn test_v_model_on_for_alias_warns() {
        let (_, warnings) =
            build("<div><div v-for=\"item in items\"><input v-model=\"item\"/></div></div>");
        assert!(warnings
            .iter()
            .any(|w| w.contains("binding v-model directly to a v-for iteration alias")));
    }

    #[test]
    fn test_forbidden_tag_is_dropped() {
        let (root, warnings) = build("<div><style>.a{}</style><p>x</p></div>");
        assert!(warnings.iter().any(|w| w.contains("side-effects")));
        let root = root.unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].as_element().unwrap().tag, "p");
    }

    #[test]
    fn test_whitespace_condense() {
        let root = build_ok("<div>\n  <p>a</p>\n  <p>b</p>\n</div>");
        // Newline-bearing whitespace between elements is dropped entirely.
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn test_whitespace_between_inline_elements() {
        let root = build_ok("<div><b>a</b> <i>b</i></div>");
        assert_eq!(root.children.len(), 3);
        assert!(matches!(&root.children[1], AstNode::Text(t) if t.content == " "));
    }

    #[test]
    fn test_pre_preserves_whitespace() {
        let root = build_ok("<pre>  indented\n  text</pre>");
        let AstNode::Text(t) = &root.children[0] else {
            panic!("expected text");
        };
        assert!(t.content.contains("  indented"));
    }

    #[test]
    fn test_structural_processing_is_idempotent() {
        let mut el = ElementNode::new("div", SourceRange::STUB);
        el.attrs_map.insert("v-if".into(), "ok".into());
        let options = CompilerOptions::default();
        let mut cx = TransformContext::new(&options);
        process_if(&mut el, &mut cx);
        process_if(&mut el, &mut cx);
        assert_eq!(el.if_conditions.len(), 1);
    }
}
