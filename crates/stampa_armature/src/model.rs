//! Cross-platform `v-model` expression helpers.
//!
//! A model target is either a plain member path (`a.b.c`) or a path ending
//! in a computed member access (`a[key]`). The latter must be assigned via
//! `$set` so reactivity observes new keys.

use stampa_relief::ElementNode;

use crate::helpers::quote_json;

#[derive(Debug, PartialEq, Eq)]
pub struct ModelParseResult {
    pub exp: std::string::String,
    /// Key of the trailing member access, quoted for dot paths.
    pub key: Option<std::string::String>,
}

/// Split a model expression into object and key parts.
pub fn parse_model(val: &str) -> ModelParseResult {
    let val = val.trim();

    if !val.contains('[') || !val.ends_with(']') {
        return match val.rfind('.') {
            Some(index) => ModelParseResult {
                exp: val[..index].to_owned(),
                key: Some(format!("\"{}\"", &val[index + 1..])),
            },
            None => ModelParseResult {
                exp: val.to_owned(),
                key: None,
            },
        };
    }

    // Scan for the last top-level bracket group, skipping string literals.
    let bytes = val.as_bytes();
    let mut i = 0;
    let mut pos = 0;
    let mut end = 0;
    while i < bytes.len() {
        let c = bytes[i];
        i += 1;
        match c {
            b'"' | b'\'' => skip_string(bytes, &mut i, c),
            b'[' => {
                pos = i - 1;
                let mut depth = 1;
                while i < bytes.len() {
                    let n = bytes[i];
                    i += 1;
                    match n {
                        b'"' | b'\'' => skip_string(bytes, &mut i, n),
                        b'[' => depth += 1,
                        b']' => {
                            depth -= 1;
                            if depth == 0 {
                                end = i - 1;
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    ModelParseResult {
        exp: val[..pos].to_owned(),
        key: Some(val[pos + 1..end].to_owned()),
    }
}

fn skip_string(bytes: &[u8], i: &mut usize, quote: u8) {
    while *i < bytes.len() {
        let c = bytes[*i];
        *i += 1;
        if c == quote {
            break;
        }
    }
}

/// Assignment statement for a model target: plain `=` for member paths,
/// `$set` for computed member access.
pub fn gen_assignment_code(value: &str, assignment: &str) -> std::string::String {
    let res = parse_model(value);
    match res.key {
        None => format!("{}={}", value, assignment),
        Some(key) => format!("$set({}, {}, {})", res.exp, key, assignment),
    }
}

/// Record the component `v-model` triple (value, expression, callback) on
/// the element, honoring the `trim` and `number` modifiers.
pub fn gen_component_model(el: &mut ElementNode, value: &str, modifiers: &[impl AsRef<str>]) {
    let number = modifiers.iter().any(|m| m.as_ref() == "number");
    let trim = modifiers.iter().any(|m| m.as_ref() == "trim");

    let base = "$$v";
    let mut value_expression = base.to_owned();
    if trim {
        value_expression = format!("(typeof {base} === 'string'? {base}.trim(): {base})");
    }
    if number {
        value_expression = format!("_n({})", value_expression);
    }
    let assignment = gen_assignment_code(value, &value_expression);

    el.model = Some(stampa_relief::ComponentModel {
        value: format!("({})", value).into(),
        expression: quote_json(value).into(),
        callback: format!("function ({}) {{{}}}", base, assignment).into(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_identifier() {
        let res = parse_model("test");
        assert_eq!(res.exp, "test");
        assert_eq!(res.key, None);
    }

    #[test]
    fn test_dot_path() {
        let res = parse_model("test.xx");
        assert_eq!(res.exp, "test");
        assert_eq!(res.key.as_deref(), Some("\"xx\""));
    }

    #[test]
    fn test_bracket_access() {
        let res = parse_model("test[key]");
        assert_eq!(res.exp, "test");
        assert_eq!(res.key.as_deref(), Some("key"));
    }

    #[test]
    fn test_nested_brackets_last_group_wins() {
        let res = parse_model("test[idx][key]");
        assert_eq!(res.exp, "test[idx]");
        assert_eq!(res.key.as_deref(), Some("key"));
    }

    #[test]
    fn test_string_key() {
        let res = parse_model("test['a']");
        assert_eq!(res.exp, "test");
        assert_eq!(res.key.as_deref(), Some("'a'"));
    }

    #[test]
    fn test_assignment_code() {
        assert_eq!(gen_assignment_code("value", "$event"), "value=$event");
        assert_eq!(
            gen_assignment_code("obj[key]", "$event"),
            "$set(obj, key, $event)"
        );
        assert_eq!(gen_assignment_code("a.b", "$event"), "a.b=$event");
    }

    #[test]
    fn test_component_model_with_modifiers() {
        let mut el = ElementNode::new("my-input", stampa_carton::SourceRange::STUB);
        gen_component_model(&mut el, "msg", &["trim", "number"]);
        let model = el.model.unwrap();
        assert_eq!(model.value, "(msg)");
        assert_eq!(model.expression, "\"msg\"");
        assert!(model.callback.contains("_n("));
        assert!(model.callback.contains(".trim()"));
        assert!(model.callback.contains("msg="));
    }
}
