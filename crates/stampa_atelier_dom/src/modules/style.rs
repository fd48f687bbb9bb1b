//! Static `style` extraction and `:style` binding.
//!
//! Static style text is normalized into a JSON object at compile time so
//! the runtime can merge it with the binding without re-parsing CSS text.

use stampa_armature::helpers::{get_and_remove_attr, get_binding_attr, quote_json};
use stampa_armature::parse_text;
use stampa_relief::{CompileModule, ElementNode, TransformContext};

pub struct StyleModule;

impl CompileModule for StyleModule {
    fn transform(&self, el: &mut ElementNode, cx: &mut TransformContext<'_>) {
        if let Some(static_style) = get_and_remove_attr(el, "style", false) {
            if parse_text(&static_style, cx.options.delimiter_pair()).is_some() {
                cx.warn(
                    format!(
                        "style=\"{}\": Interpolation inside attributes has been removed. \
                         Use v-bind or the colon shorthand instead. For example, \
                         instead of <div style=\"{{{{ val }}}}\">, use <div :style=\"val\">.",
                        static_style
                    ),
                    el.attr_range("style"),
                );
            }
            el.static_style = Some(parse_style_text(&static_style).into());
        }
        if let Some(binding) = get_binding_attr(el, "style", false) {
            el.style_binding = Some(binding.into());
        }
    }

    fn gen_data(&self, el: &ElementNode) -> std::string::String {
        let mut data = std::string::String::new();
        if let Some(static_style) = &el.static_style {
            data.push_str(&format!("staticStyle:{},", static_style));
        }
        if let Some(binding) = &el.style_binding {
            data.push_str(&format!("style:({}),", binding));
        }
        data
    }
}

/// `color: red; background: url(a;b)` -> `{"color":"red","background":"url(a;b)"}`.
/// Declarations split on `;` outside parentheses; the first `:` separates
/// property from value so data URIs survive.
fn parse_style_text(style: &str) -> std::string::String {
    let mut out = std::string::String::from("{");
    for declaration in split_declarations(style) {
        if let Some((property, value)) = declaration.split_once(':') {
            let (property, value) = (property.trim(), value.trim());
            if !property.is_empty() && !value.is_empty() {
                out.push_str(&format!("{}:{},", quote_json(property), quote_json(value)));
            }
        }
    }
    format!("{}}}", out.trim_end_matches(','))
}

fn split_declarations(style: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in style.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => {
                parts.push(&style[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&style[start..]);
    parts
}
