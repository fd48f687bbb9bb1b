//! Render-function code generation.
//!
//! Recursive descent over the optimized AST, emitting runtime helper
//! calls (`_c`, `_v`, `_l`, `_t`, ...). The tree is read-only here:
//! instead of marking nodes as processed, each dispatch passes value-typed
//! [`SkipFlags`] down the recursion so structural wrappers are applied
//! exactly once.

pub mod data;
pub mod events;

use bitflags::bitflags;
use stampa_carton::{camelize, CompactString, SourceRange};
use stampa_relief::{
    AstNode, CompilerOptions, Diagnostic, ElementFlags, ElementNode, IfBlock, IfCondition,
};

use crate::codegen::data::{gen_data, gen_props, gen_scoped_slot, transform_special_newlines};
use stampa_armature::helpers::quote_json;

bitflags! {
    /// Structural wrappers already applied on the current element.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SkipFlags: u8 {
        const STATIC = 1;
        const ONCE = 1 << 1;
        const FOR = 1 << 2;
        const IF = 1 << 3;
    }
}

/// Enclosing-element facts needed by scoped-slot generation.
pub(crate) struct AncestorInfo {
    pub scoped_slot: bool,
    pub in_for: bool,
    pub has_if: bool,
}

pub struct CodegenState<'o> {
    pub options: &'o CompilerOptions,
    pub static_render_fns: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub once_id: usize,
    /// Inside a `v-pre` subtree.
    pub pre: bool,
    /// Keys of enclosing `v-for` elements, innermost last.
    pub(crate) for_keys: Vec<Option<CompactString>>,
    pub(crate) ancestors: Vec<AncestorInfo>,
}

impl<'o> CodegenState<'o> {
    pub fn new(options: &'o CompilerOptions) -> Self {
        Self {
            options,
            static_render_fns: Vec::new(),
            diagnostics: Vec::new(),
            once_id: 0,
            pre: false,
            for_keys: Vec::new(),
            ancestors: Vec::new(),
        }
    }

    fn ranged(&self, range: SourceRange) -> Option<SourceRange> {
        self.options.output_source_range.then_some(range)
    }

    pub fn warn(&mut self, message: impl Into<String>, range: SourceRange) {
        let range = self.ranged(range);
        self.diagnostics.push(Diagnostic::error(message, range));
    }

    pub fn tip(&mut self, message: impl Into<String>, range: SourceRange) {
        let range = self.ranged(range);
        self.diagnostics.push(Diagnostic::tip(message, range));
    }

    pub fn maybe_component(&self, el: &ElementNode) -> bool {
        el.component_is.is_some() || !(self.options.is_reserved_tag)(&el.tag)
    }
}

pub struct GeneratedRender {
    /// Render function body, wrapped in `with(this){...}`.
    pub render: String,
    pub static_render_fns: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn generate(root: Option<&ElementNode>, options: &CompilerOptions) -> GeneratedRender {
    let mut state = CodegenState::new(options);
    let code = match root {
        Some(el) if el.tag == "script" => "null".to_owned(),
        Some(el) => gen_element(el, SkipFlags::empty(), &mut state),
        None => "_c(\"div\")".to_owned(),
    };
    GeneratedRender {
        render: format!("with(this){{return {}}}", code),
        static_render_fns: state.static_render_fns,
        diagnostics: state.diagnostics,
    }
}

/// Which generator the conditional/loop wrappers delegate the element body
/// to. Scoped slots reuse the `v-if`/`v-for` machinery around their slot
/// function instead of a plain vnode expression.
#[derive(Clone, Copy)]
pub(crate) enum BranchGen {
    Element,
    ScopedSlot,
}

pub fn gen_element(el: &ElementNode, skip: SkipFlags, state: &mut CodegenState<'_>) -> String {
    let outer_pre = state.pre;
    if el.has_flag(ElementFlags::PRE) {
        state.pre = true;
    }

    let code = if el.has_flag(ElementFlags::STATIC_ROOT) && !skip.contains(SkipFlags::STATIC) {
        gen_static(el, skip, state)
    } else if el.has_flag(ElementFlags::ONCE) && !skip.contains(SkipFlags::ONCE) {
        gen_once(el, skip, state)
    } else if el.for_info.is_some() && !skip.contains(SkipFlags::FOR) {
        gen_for(el, skip, state, BranchGen::Element)
    } else if el.if_expr.is_some() && !skip.contains(SkipFlags::IF) {
        gen_if(el, skip, state, BranchGen::Element, "_e()")
    } else if el.is_template() && el.slot_target.is_none() && !state.pre {
        gen_children(el, state, false).unwrap_or_else(|| "void 0".to_owned())
    } else if el.is_slot_outlet() {
        gen_slot(el, state)
    } else {
        let mut code = match &el.component_is {
            Some(component) => gen_component(component, el, state),
            None => {
                let data = (!el.has_flag(ElementFlags::PLAIN)
                    || (state.pre && state.maybe_component(el)))
                    .then(|| gen_data(el, state));
                let children = if el.has_flag(ElementFlags::INLINE_TEMPLATE) {
                    None
                } else {
                    gen_children(el, state, true)
                };
                format!(
                    "_c('{}'{}{})",
                    el.tag,
                    data.map(|d| format!(",{}", d)).unwrap_or_default(),
                    children.map(|c| format!(",{}", c)).unwrap_or_default(),
                )
            }
        };
        let modules = state.options.modules.clone();
        for module in &modules {
            code = module.wrap_final(el, code);
        }
        code
    };

    state.pre = outer_pre;
    code
}

/// Hoist a static subtree into its own render function, referenced with
/// `_m(index)`.
fn gen_static(el: &ElementNode, skip: SkipFlags, state: &mut CodegenState<'_>) -> String {
    let body = gen_element(el, skip | SkipFlags::STATIC, state);
    state
        .static_render_fns
        .push(format!("with(this){{return {}}}", body));
    format!(
        "_m({}{})",
        state.static_render_fns.len() - 1,
        if el.has_flag(ElementFlags::STATIC_IN_FOR) {
            ",true"
        } else {
            ""
        }
    )
}

fn gen_once(el: &ElementNode, skip: SkipFlags, state: &mut CodegenState<'_>) -> String {
    if el.if_expr.is_some() && !skip.contains(SkipFlags::IF) {
        return gen_if(el, skip, state, BranchGen::Element, "_e()");
    }
    if el.has_flag(ElementFlags::STATIC_IN_FOR) {
        // The enclosing v-for must be keyed so the once-cache has an
        // identity to attach to.
        let key = state.for_keys.last().cloned().flatten();
        match key {
            Some(key) => {
                let body = gen_element(el, skip | SkipFlags::ONCE, state);
                let id = state.once_id;
                state.once_id += 1;
                format!("_o({},{},{})", body, id, key)
            }
            None => {
                state.warn(
                    "v-once can only be used inside v-for that is keyed.",
                    el.range,
                );
                gen_element(el, skip | SkipFlags::ONCE, state)
            }
        }
    } else {
        gen_static(el, skip | SkipFlags::ONCE, state)
    }
}

pub(crate) fn gen_if(
    el: &ElementNode,
    skip: SkipFlags,
    state: &mut CodegenState<'_>,
    gen: BranchGen,
    alt_empty: &str,
) -> String {
    gen_if_conditions(&el.if_conditions, el, skip, state, gen, alt_empty)
}

fn gen_if_conditions(
    conditions: &[IfCondition],
    owner: &ElementNode,
    skip: SkipFlags,
    state: &mut CodegenState<'_>,
    gen: BranchGen,
    alt_empty: &str,
) -> String {
    let Some((condition, rest)) = conditions.split_first() else {
        return alt_empty.to_owned();
    };

    let block: &ElementNode = match &condition.block {
        IfBlock::This => owner,
        IfBlock::Element(el) => el,
    };
    let branch = gen_ternary_exp(block, skip | SkipFlags::IF, state, gen);

    match &condition.exp {
        Some(exp) => format!(
            "({})?{}:{}",
            exp,
            branch,
            gen_if_conditions(rest, owner, skip, state, gen, alt_empty)
        ),
        None => branch,
    }
}

// v-if paired with v-once yields (a)?_m(0):_m(1).
fn gen_ternary_exp(
    el: &ElementNode,
    skip: SkipFlags,
    state: &mut CodegenState<'_>,
    gen: BranchGen,
) -> String {
    match gen {
        BranchGen::ScopedSlot => gen_scoped_slot(el, skip, state),
        BranchGen::Element => {
            if el.has_flag(ElementFlags::ONCE) && !skip.contains(SkipFlags::ONCE) {
                gen_once(el, skip, state)
            } else {
                gen_element(el, skip, state)
            }
        }
    }
}

pub(crate) fn gen_for(
    el: &ElementNode,
    skip: SkipFlags,
    state: &mut CodegenState<'_>,
    gen: BranchGen,
) -> String {
    let Some(info) = &el.for_info else {
        return gen_element(el, skip | SkipFlags::FOR, state);
    };

    if state.maybe_component(el)
        && el.tag != "slot"
        && el.tag != "template"
        && el.key.is_none()
    {
        state.tip(
            format!(
                "<{} v-for=\"{} in {}\">: component lists rendered with v-for should \
                 have explicit keys. See https://vuejs.org/guide/list.html#key for \
                 more details.",
                el.tag, info.alias, info.for_expr
            ),
            el.attr_range("v-for"),
        );
    }

    let iterator1 = info
        .iterator1
        .as_ref()
        .map(|i| format!(",{}", i))
        .unwrap_or_default();
    let iterator2 = info
        .iterator2
        .as_ref()
        .map(|i| format!(",{}", i))
        .unwrap_or_default();

    state.for_keys.push(el.key.clone());
    let body = match gen {
        BranchGen::Element => gen_element(el, skip | SkipFlags::FOR, state),
        BranchGen::ScopedSlot => gen_scoped_slot(el, skip | SkipFlags::FOR, state),
    };
    state.for_keys.pop();

    format!(
        "_l(({}),function({}{}{}){{return {}}})",
        info.for_expr, info.alias, iterator1, iterator2, body
    )
}

fn needs_normalization(el: &ElementNode) -> bool {
    el.for_info.is_some() || el.tag == "template" || el.tag == "slot"
}

fn condition_blocks<'a>(el: &'a ElementNode) -> Vec<&'a ElementNode> {
    let mut blocks = vec![el];
    for condition in &el.if_conditions {
        if let IfBlock::Element(block) = &condition.block {
            blocks.push(block);
        }
    }
    blocks
}

/// Determine the runtime children-normalization level: 0 no normalization
/// needed, 1 simple (possible nested arrays from components), 2 full (any
/// child may produce arrays or primitives).
fn get_normalization_type(children: &[AstNode], state: &CodegenState<'_>) -> u8 {
    let mut res = 0;
    for child in children {
        let Some(el) = child.as_element() else { continue };
        let blocks = condition_blocks(el);
        if blocks.iter().any(|b| needs_normalization(b)) {
            return 2;
        }
        if blocks.iter().any(|b| state.maybe_component(b)) {
            res = 1;
        }
    }
    res
}

pub(crate) fn gen_children(
    el: &ElementNode,
    state: &mut CodegenState<'_>,
    check_skip: bool,
) -> Option<String> {
    if el.children.is_empty() {
        return None;
    }

    state.ancestors.push(AncestorInfo {
        scoped_slot: el
            .slot_scope
            .as_deref()
            .is_some_and(|s| s != stampa_armature::builder::EMPTY_SLOT_SCOPE_TOKEN),
        in_for: el.for_info.is_some(),
        has_if: el.if_expr.is_some(),
    });

    // A sole v-for child can skip the wrapping array.
    let code = if el.children.len() == 1 {
        let only = &el.children[0];
        match only.as_element() {
            Some(child)
                if child.for_info.is_some()
                    && child.tag != "template"
                    && child.tag != "slot" =>
            {
                let normalization = if check_skip {
                    if state.maybe_component(child) {
                        ",1"
                    } else {
                        ",0"
                    }
                } else {
                    ""
                };
                Some(format!(
                    "{}{}",
                    gen_element(child, SkipFlags::empty(), state),
                    normalization
                ))
            }
            _ => None,
        }
    } else {
        None
    };

    let code = code.unwrap_or_else(|| {
        let normalization = if check_skip {
            get_normalization_type(&el.children, state)
        } else {
            0
        };
        let parts: Vec<_> = el
            .children
            .iter()
            .map(|child| gen_node(child, state))
            .collect();
        format!(
            "[{}]{}",
            parts.join(","),
            if normalization != 0 {
                format!(",{}", normalization)
            } else {
                String::new()
            }
        )
    });

    state.ancestors.pop();
    Some(code)
}

fn gen_node(node: &AstNode, state: &mut CodegenState<'_>) -> String {
    match node {
        AstNode::Element(el) => gen_element(el, SkipFlags::empty(), state),
        AstNode::Text(t) => match &t.expression {
            Some(exp) => format!("_v({})", exp),
            None => format!("_v({})", transform_special_newlines(&quote_json(&t.content))),
        },
        AstNode::Comment(c) => format!("_e({})", quote_json(&c.content)),
    }
}

fn gen_slot(el: &ElementNode, state: &mut CodegenState<'_>) -> String {
    let slot_name = el.slot_name.as_deref().unwrap_or("\"default\"");
    let children = gen_children(el, state, false);

    let mut res = format!("_t({}", slot_name);
    if let Some(children) = &children {
        res.push_str(&format!(",function(){{return {}}}", children));
    }

    // Attributes on the outlet become the scoped-slot props, camelized.
    let attrs = (!el.attrs.is_empty()).then(|| {
        let props: Vec<_> = el
            .attrs
            .iter()
            .map(|a| {
                (
                    camelize(&a.name).to_string(),
                    a.value.as_str().to_owned(),
                    a.dynamic,
                )
            })
            .collect();
        gen_props(&props)
    });
    let bind = el.attr_value("v-bind");
    if (attrs.is_some() || bind.is_some()) && children.is_none() {
        res.push_str(",null");
    }
    if let Some(attrs) = &attrs {
        res.push_str(&format!(",{}", attrs));
    }
    if let Some(bind) = bind {
        if attrs.is_none() {
            res.push_str(",null");
        }
        res.push_str(&format!(",{}", bind));
    }
    res.push(')');
    res
}

fn gen_component(
    component: &str,
    el: &ElementNode,
    state: &mut CodegenState<'_>,
) -> String {
    let data = gen_data(el, state);
    let children = if el.has_flag(ElementFlags::INLINE_TEMPLATE) {
        None
    } else {
        gen_children(el, state, true)
    };
    format!(
        "_c({},{}{})",
        component,
        data,
        children.map(|c| format!(",{}", c)).unwrap_or_default(),
    )
}
