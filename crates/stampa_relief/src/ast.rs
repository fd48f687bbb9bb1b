//! Template AST node types.
//!
//! The tree is built by the armature builder, flagged by the optimizer and
//! read (never mutated) by the code generator. Every node is exclusively
//! owned by its parent; the builder's open-element stack is the only place
//! parent context exists.

use bitflags::bitflags;
use serde::Serialize;
use stampa_carton::{FxHashMap, SourceRange, String};

/// A template AST node.
#[derive(Debug, Clone, Serialize)]
pub enum AstNode {
    Element(Box<ElementNode>),
    Text(TextNode),
    Comment(CommentNode),
}

impl AstNode {
    pub fn range(&self) -> SourceRange {
        match self {
            AstNode::Element(el) => el.range,
            AstNode::Text(t) => t.range,
            AstNode::Comment(c) => c.range,
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            AstNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut ElementNode> {
        match self {
            AstNode::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Whether this is a whitespace-only literal text node.
    pub fn is_blank_text(&self) -> bool {
        match self {
            AstNode::Text(t) => t.expression.is_none() && t.content.trim().is_empty(),
            _ => false,
        }
    }
}

/// One segment of an interpolated text node.
#[derive(Debug, Clone, Serialize)]
pub enum TextToken {
    /// Literal run, stored unquoted.
    Literal(String),
    /// Wrapped display expression, e.g. `_s(msg)`.
    Expression(String),
}

/// Text node: either a literal string or an interpolation token list with
/// one combined display expression.
#[derive(Debug, Clone, Serialize)]
pub struct TextNode {
    pub content: String,
    /// `+`-joined display expression; `None` for literal text.
    pub expression: Option<String>,
    pub tokens: Vec<TextToken>,
    pub is_static: bool,
    pub range: SourceRange,
}

impl TextNode {
    pub fn literal(content: impl Into<String>, range: SourceRange) -> Self {
        Self {
            content: content.into(),
            expression: None,
            tokens: Vec::new(),
            is_static: false,
            range,
        }
    }
}

/// Comment node, kept only when comment preservation is on.
#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    pub content: String,
    pub range: SourceRange,
}

/// Raw attribute as scanned from a start tag, before any directive
/// interpretation.
#[derive(Debug, Clone, Serialize)]
pub struct AttributeRaw {
    pub name: String,
    pub value: String,
    pub range: SourceRange,
}

/// Attribute or DOM property after directive processing. `dynamic` marks a
/// bracketed dynamic-argument name.
#[derive(Debug, Clone, Serialize)]
pub struct BoundAttr {
    pub name: String,
    pub value: String,
    pub dynamic: bool,
    pub range: SourceRange,
}

/// A single event handler entry.
#[derive(Debug, Clone, Serialize)]
pub struct EventHandler {
    pub value: String,
    /// Whether the event name is a dynamic expression.
    pub dynamic: bool,
    /// Remaining guard modifiers; the capture/once/passive trio is folded
    /// into the event-name sigil before storage.
    pub modifiers: Vec<String>,
    pub range: SourceRange,
}

/// Insertion-ordered event map. Order matters for byte-identical output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HandlerMap(pub Vec<(String, Vec<EventHandler>)>);

impl HandlerMap {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Vec<EventHandler>> {
        self.0
            .iter_mut()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, v)| v)
    }

    pub fn insert(&mut self, name: String, handlers: Vec<EventHandler>) {
        self.0.push((name, handlers));
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Vec<EventHandler>)> {
        self.0.iter()
    }
}

/// Generic directive descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct Directive {
    pub name: String,
    pub raw_name: String,
    pub expression: Option<String>,
    pub arg: Option<String>,
    pub dynamic_arg: bool,
    pub modifiers: Vec<String>,
    pub range: SourceRange,
    /// Whether a runtime directive object must still be emitted, decided by
    /// the registered compile-time handler (defaults to true).
    pub needs_runtime: bool,
}

impl Directive {
    pub fn has_modifier(&self, name: &str) -> bool {
        self.modifiers.iter().any(|m| m.as_str() == name)
    }
}

/// Parsed `v-for` binding.
#[derive(Debug, Clone, Serialize)]
pub struct ForInfo {
    /// The iterated source expression.
    pub for_expr: String,
    pub alias: String,
    pub iterator1: Option<String>,
    pub iterator2: Option<String>,
}

/// One arm of a conditional chain. The primary `v-if` node is the sole
/// owner of the chain; its own arm references itself through
/// [`IfBlock::This`], spliced `v-else(-if)` siblings are owned here.
#[derive(Debug, Clone, Serialize)]
pub struct IfCondition {
    pub exp: Option<String>,
    pub block: IfBlock,
}

#[derive(Debug, Clone, Serialize)]
pub enum IfBlock {
    This,
    Element(Box<ElementNode>),
}

/// Named scoped-slot entry registered on the slot's owning component.
#[derive(Debug, Clone, Serialize)]
pub struct ScopedSlotEntry {
    /// Slot key expression: a quoted literal or a dynamic expression.
    pub key: String,
    pub dynamic: bool,
    pub element: Box<ElementNode>,
}

/// Two-way binding triple for `v-model` on a component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentModel {
    pub value: String,
    pub expression: String,
    pub callback: String,
}

/// Argless `v-bind="obj"` wrap, applied as a trailing `_b(...)` call.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectBind {
    pub exp: String,
    pub prop: bool,
    pub sync: bool,
}

bitflags! {
    /// Boolean element facts that survive across pipeline stages.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ElementFlags: u16 {
        /// Inside (or carrying) `v-pre`.
        const PRE = 1;
        const ONCE = 1 << 1;
        /// No key, no scoped slots, no remaining attributes: minimal code path.
        const PLAIN = 1 << 2;
        /// Side-effecting tag, never rendered.
        const FORBIDDEN = 1 << 3;
        const HAS_BINDINGS = 1 << 4;
        const STATIC = 1 << 5;
        const STATIC_ROOT = 1 << 6;
        const STATIC_IN_FOR = 1 << 7;
        const REF_IN_FOR = 1 << 8;
        const INLINE_TEMPLATE = 1 << 9;
        const SLOT_TARGET_DYNAMIC = 1 << 10;
    }
}

impl Serialize for ElementFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.bits())
    }
}

bitflags! {
    /// Structural directives already applied to a node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StructuralMarks: u8 {
        const FOR = 1;
        const IF = 1 << 1;
        const ONCE = 1 << 2;
    }
}

impl Serialize for StructuralMarks {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

/// Explicit node processing state. Replaces per-directive "processed"
/// booleans: a transform applied twice is a detectable no-op, not a silent
/// double application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeState {
    Unprocessed,
    Structural(StructuralMarks),
    Rendered,
}

impl Default for NodeState {
    fn default() -> Self {
        NodeState::Unprocessed
    }
}

/// Element node. Directive-derived fields start empty and are filled during
/// AST build; the optimizer only flips `STATIC*` flags.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ElementNode {
    pub tag: String,
    pub ns: Option<String>,
    /// Ordered raw attribute list as scanned.
    pub attrs_list: Vec<AttributeRaw>,
    /// Deduplicated name -> value map, last write wins.
    pub attrs_map: FxHashMap<String, String>,
    /// Name -> raw attribute, for diagnostic ranges.
    pub raw_attrs_map: FxHashMap<String, AttributeRaw>,
    pub children: Vec<AstNode>,
    pub range: SourceRange,
    pub state: NodeState,
    pub flags: ElementFlags,

    // Conditional chain. `if_expr`/`else_if_expr`/`is_else` mirror the raw
    // directives; `if_conditions` exists only on the chain owner.
    pub if_expr: Option<String>,
    pub else_if_expr: Option<String>,
    pub is_else: bool,
    pub if_conditions: Vec<IfCondition>,

    pub for_info: Option<ForInfo>,

    pub key: Option<String>,
    pub ref_expr: Option<String>,

    /// `<slot>` outlet name expression.
    pub slot_name: Option<String>,
    /// Target slot this element's content goes into.
    pub slot_target: Option<String>,
    pub slot_scope: Option<String>,
    pub scoped_slots: Vec<ScopedSlotEntry>,

    /// Dynamic component binding (`is`).
    pub component_is: Option<String>,

    pub attrs: Vec<BoundAttr>,
    pub dom_props: Vec<BoundAttr>,
    pub events: HandlerMap,
    pub native_events: HandlerMap,
    pub directives: Vec<Directive>,

    // Module-contributed fields (web platform class/style modules).
    pub static_class: Option<String>,
    pub class_binding: Option<String>,
    pub static_style: Option<String>,
    pub style_binding: Option<String>,

    pub model: Option<ComponentModel>,
    pub object_bind: Option<ObjectBind>,
    /// Argless `v-on="obj"` listeners, applied as a trailing `_g(...)`.
    pub listeners_bind: Option<String>,
}

impl ElementNode {
    pub fn new(tag: impl Into<String>, range: SourceRange) -> Self {
        Self {
            tag: tag.into(),
            range,
            ..Default::default()
        }
    }

    pub fn has_flag(&self, flag: ElementFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn set_flag(&mut self, flag: ElementFlags) {
        self.flags.insert(flag);
    }

    pub fn clear_flag(&mut self, flag: ElementFlags) {
        self.flags.remove(flag);
    }

    /// Record a structural directive application. Returns false when the
    /// node already carries the mark or has finished generic processing —
    /// the caller must treat that as a no-op.
    pub fn mark_structural(&mut self, mark: StructuralMarks) -> bool {
        match self.state {
            NodeState::Rendered => false,
            NodeState::Unprocessed => {
                self.state = NodeState::Structural(mark);
                true
            }
            NodeState::Structural(marks) => {
                if marks.contains(mark) {
                    return false;
                }
                self.state = NodeState::Structural(marks | mark);
                true
            }
        }
    }

    pub fn is_rendered(&self) -> bool {
        self.state == NodeState::Rendered
    }

    pub fn mark_rendered(&mut self) {
        self.state = NodeState::Rendered;
    }

    pub fn is_template(&self) -> bool {
        self.tag == "template"
    }

    pub fn is_slot_outlet(&self) -> bool {
        self.tag == "slot"
    }

    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attrs_map.get(name).map(|v| v.as_str())
    }

    pub fn raw_attr(&self, name: &str) -> Option<&AttributeRaw> {
        self.raw_attrs_map.get(name)
    }

    /// Range of a named attribute, falling back to the element range.
    pub fn attr_range(&self, name: &str) -> SourceRange {
        self.raw_attr(name).map(|a| a.range).unwrap_or(self.range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_marks_guard_reentry() {
        let mut el = ElementNode::new("div", SourceRange::STUB);
        assert!(el.mark_structural(StructuralMarks::FOR));
        assert!(!el.mark_structural(StructuralMarks::FOR));
        assert!(el.mark_structural(StructuralMarks::IF));
        el.mark_rendered();
        assert!(!el.mark_structural(StructuralMarks::ONCE));
    }

    #[test]
    fn test_handler_map_preserves_insertion_order() {
        let mut map = HandlerMap::default();
        map.insert("click".into(), vec![]);
        map.insert("input".into(), vec![]);
        let names: Vec<_> = map.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["click", "input"]);
    }
}
