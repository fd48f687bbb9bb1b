//! Static HTML/SVG tag configuration.
//!
//! These tables back the scanner and builder predicates: which tags are
//! void, which end tags are implied, which elements hold raw text, which
//! tags are platform-reserved, and which attributes must be bound as DOM
//! properties rather than attributes.

use phf::{phf_set, Set as PhfSet};

/// Void elements: no end tag ever.
pub static VOID_TAGS: PhfSet<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "frame", "hr", "img", "input",
    "isindex", "keygen", "link", "meta", "param", "source", "track", "wbr",
};

/// Elements whose end tag may be omitted when a sibling of the same kind
/// starts (e.g. a new `<li>` implicitly closes the previous one).
pub static IMPLIED_END_TAGS: PhfSet<&'static str> = phf_set! {
    "colgroup", "dd", "dt", "li", "options", "p", "td", "tfoot", "th",
    "thead", "tr", "source",
};

/// HTML5 non-phrasing content. An open `<p>` is implicitly closed when one
/// of these starts.
pub static NON_PHRASING_TAGS: PhfSet<&'static str> = phf_set! {
    "address", "article", "aside", "base", "blockquote", "body", "caption",
    "col", "colgroup", "dd", "details", "dialog", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3",
    "h4", "h5", "h6", "head", "header", "hgroup", "hr", "html", "legend",
    "li", "menuitem", "meta", "optgroup", "option", "param", "rp", "rt",
    "source", "style", "summary", "tbody", "td", "tfoot", "th", "thead",
    "title", "tr", "track",
};

/// Elements whose content is consumed verbatim, never scanned for tags.
pub static RAW_TEXT_TAGS: PhfSet<&'static str> = phf_set! {
    "script", "style", "textarea",
};

static HTML_TAGS: PhfSet<&'static str> = phf_set! {
    "html", "body", "base", "head", "link", "meta", "style", "title",
    "address", "article", "aside", "footer", "header", "h1", "h2", "h3",
    "h4", "h5", "h6", "hgroup", "nav", "section", "div", "dd", "dl", "dt",
    "figcaption", "figure", "picture", "hr", "img", "li", "main", "ol", "p",
    "pre", "ul", "a", "b", "abbr", "bdi", "bdo", "br", "cite", "code",
    "data", "dfn", "em", "i", "kbd", "mark", "q", "rp", "rt", "rtc", "ruby",
    "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u",
    "var", "wbr", "area", "audio", "map", "track", "video", "embed",
    "object", "param", "source", "canvas", "script", "noscript", "del",
    "ins", "caption", "col", "colgroup", "table", "thead", "tbody", "td",
    "th", "tr", "button", "datalist", "fieldset", "form", "input", "label",
    "legend", "meter", "optgroup", "option", "output", "progress", "select",
    "textarea", "details", "dialog", "menu", "menuitem", "summary",
    "content", "element", "shadow", "template", "blockquote", "iframe",
    "tfoot",
};

static SVG_TAGS: PhfSet<&'static str> = phf_set! {
    "svg", "animate", "circle", "clippath", "cursor", "defs", "desc",
    "ellipse", "filter", "font-face", "foreignobject", "g", "glyph",
    "image", "line", "marker", "mask", "missing-glyph", "path", "pattern",
    "polygon", "polyline", "rect", "switch", "symbol", "text", "textpath",
    "tspan", "use", "view",
};

/// Compiler built-ins that never reach the platform.
pub static BUILTIN_TAGS: PhfSet<&'static str> = phf_set! {
    "slot", "component",
};

/// Whether a tag never takes an end tag.
pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(tag)
}

/// Whether a tag's end tag may be left out before an identical sibling.
pub fn can_leave_open(tag: &str) -> bool {
    IMPLIED_END_TAGS.contains(tag)
}

/// Whether a tag belongs to the platform (HTML or SVG).
pub fn is_reserved_tag(tag: &str) -> bool {
    let lower = tag.to_ascii_lowercase();
    HTML_TAGS.contains(lower.as_str()) || SVG_TAGS.contains(lower.as_str())
}

/// Whether an element's body is raw text.
pub fn is_raw_text_tag(tag: &str) -> bool {
    RAW_TEXT_TAGS.contains(tag)
}

/// Whether a tag preserves whitespace.
pub fn is_pre_tag(tag: &str) -> bool {
    tag == "pre"
}

/// Namespace resolution for SVG and MathML subtrees.
pub fn get_tag_namespace(tag: &str) -> Option<&'static str> {
    if SVG_TAGS.contains(tag.to_ascii_lowercase().as_str()) {
        return Some("svg");
    }
    // MathML only supports the root element with partial support, matching
    // browser behavior.
    if tag == "math" {
        return Some("math");
    }
    None
}

static ACCEPT_VALUE_TAGS: PhfSet<&'static str> = phf_set! {
    "input", "textarea", "option", "select", "progress",
};

/// Attributes that must be bound as DOM properties.
///
/// `type_attr` is the literal `type` attribute of the element when present,
/// used to exempt `<input type="button">` from value-as-property.
pub fn must_use_prop(tag: &str, type_attr: Option<&str>, attr: &str) -> bool {
    (attr == "value" && ACCEPT_VALUE_TAGS.contains(tag) && type_attr != Some("button"))
        || (attr == "selected" && tag == "option")
        || (attr == "checked" && tag == "input")
        || (attr == "muted" && tag == "video")
}

/// Tags that produce side effects when declared inside a template and are
/// therefore never rendered: `<style>` and plain-JS `<script>`.
pub fn is_forbidden_tag(tag: &str, type_attr: Option<&str>) -> bool {
    match tag {
        "style" => true,
        "script" => matches!(type_attr, None | Some("text/javascript")),
        _ => false,
    }
}
