//! Post-parse expression validation.
//!
//! Walks a finished tree and re-validates every embedded expression
//! syntactically: statement keywords that cannot appear in an expression,
//! unary operators used as shorthand property names, and unbalanced
//! delimiters. Expression text is otherwise opaque; nothing here evaluates
//! or parses JavaScript beyond these shapes.

use once_cell::sync::Lazy;
use regex::Regex;
use stampa_armature::builder::EMPTY_SLOT_SCOPE_TOKEN;
use stampa_carton::{is_simple_identifier, SourceRange};
use stampa_relief::{AstNode, CompilerError, ElementNode, IfBlock};

static DIR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v-|^@|^:|^\.|^#").unwrap());
static ON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@|^v-on:").unwrap());
static SLOT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v-slot(:|$)|^#").unwrap());

/// Statement keywords that make an expression fail to parse. Keywords
/// that are legal in expression position (`new`, `delete`, `typeof`,
/// `class`, `function`, ...) are deliberately absent.
static PROHIBITED_KEYWORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(do|if|for|let|try|var|case|else|with|await|break|catch|const|throw|while",
        r"|yield|export|return|switch|default|finally|continue|debugger)\b",
    ))
    .unwrap()
});

static UNARY_OPERATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(delete|typeof|void)\s*\([^)]*\)").unwrap());

/// String and template literals, removed before keyword diagnosis so quoted
/// keywords do not trip it.
static STRIP_STRING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"|`(?:[^`\\]|\\.)*\$\{|\}(?:[^`\\]|\\.)*`|`(?:[^`\\]|\\.)*`"#,
    )
    .unwrap()
});

pub fn detect_errors(ast: Option<&ElementNode>) -> Vec<CompilerError> {
    let mut errors = Vec::new();
    if let Some(el) = ast {
        check_element(el, &mut errors);
    }
    errors
}

fn check_element(el: &ElementNode, errors: &mut Vec<CompilerError>) {
    for (name, value) in el.attrs_map.iter() {
        let name = name.as_str();
        if !DIR_RE.is_match(name) {
            continue;
        }
        let range = el.attr_range(name);
        if name == "v-for" {
            check_for(el, value, range, errors);
        } else if name == "v-slot" || SLOT_RE.is_match(name) || name == "slot-scope" {
            check_function_parameters(value, &raw(name, value), range, errors);
        } else if ON_RE.is_match(name) {
            check_event(value, &raw(name, value), range, errors);
        } else {
            check_expression(value, &raw(name, value), range, errors);
        }
    }

    if let Some(scope) = el.slot_scope.as_deref() {
        if scope != EMPTY_SLOT_SCOPE_TOKEN {
            check_function_parameters(scope, scope, el.range, errors);
        }
    }

    for child in &el.children {
        match child {
            AstNode::Element(child) => check_element(child, errors),
            AstNode::Text(t) => {
                if let Some(expression) = &t.expression {
                    check_expression(expression, t.content.trim(), t.range, errors);
                }
            }
            AstNode::Comment(_) => {}
        }
    }
    // Spliced conditional arms and relocated slot content are not children.
    for condition in &el.if_conditions {
        if let IfBlock::Element(block) = &condition.block {
            check_element(block, errors);
        }
    }
    for slot in &el.scoped_slots {
        check_element(&slot.element, errors);
    }
}

fn raw(name: &str, value: &str) -> std::string::String {
    format!("{}=\"{}\"", name, value)
}

fn check_for(el: &ElementNode, value: &str, range: SourceRange, errors: &mut Vec<CompilerError>) {
    let raw = raw("v-for", value);
    let Some(info) = &el.for_info else {
        return;
    };
    check_expression(&info.for_expr, &raw, range, errors);
    check_identifier(&info.alias, "v-for alias", &raw, range, errors);
    if let Some(iterator) = &info.iterator1 {
        check_identifier(iterator, "v-for iterator", &raw, range, errors);
    }
    if let Some(iterator) = &info.iterator2 {
        check_identifier(iterator, "v-for iterator", &raw, range, errors);
    }
}

fn check_identifier(
    ident: &str,
    kind: &str,
    raw: &str,
    range: SourceRange,
    errors: &mut Vec<CompilerError>,
) {
    let ident = ident.trim();
    // Plain names or destructuring patterns both bind.
    let destructuring = matches!(ident.as_bytes().first(), Some(b'{') | Some(b'['));
    let valid = !ident.is_empty()
        && (is_simple_identifier(ident)
            || (destructuring
                && balance_error(ident).is_none()
                && find_prohibited_keyword(&STRIP_STRING_RE.replace_all(ident, "")).is_none()));
    if !valid {
        errors.push(CompilerError::new(
            format!("invalid {} \"{}\" in expression: {}", kind, ident, raw),
            Some(range),
        ));
    }
}

fn check_function_parameters(
    params: &str,
    raw: &str,
    range: SourceRange,
    errors: &mut Vec<CompilerError>,
) {
    if params.trim().is_empty() || balance_error(params).is_some() {
        errors.push(CompilerError::new(
            format!("invalid function parameter expression: {}", raw),
            Some(range),
        ));
    }
}

fn check_event(exp: &str, raw: &str, range: SourceRange, errors: &mut Vec<CompilerError>) {
    let stripped = STRIP_STRING_RE.replace_all(exp, "");
    for found in UNARY_OPERATOR_RE.find_iter(&stripped) {
        // `$delete(...)` is a method call, not the operator.
        let preceded_by_dollar = found.start() > 0
            && stripped.as_bytes()[found.start() - 1] == b'$';
        if !preceded_by_dollar {
            errors.push(CompilerError::new(
                format!(
                    "avoid using JavaScript unary operator as property name: \
                     \"{}\"\n  Raw expression: {}",
                    found.as_str(),
                    raw
                ),
                Some(range),
            ));
        }
    }
    check_expression(exp, raw, range, errors);
}

/// First statement keyword appearing where an expression cannot carry
/// one. Property access (`p.catch(...)`) and object keys (`{ default: x }`)
/// are expression positions and pass.
fn find_prohibited_keyword(stripped: &str) -> Option<&str> {
    let bytes = stripped.as_bytes();
    for found in PROHIBITED_KEYWORD_RE.find_iter(stripped) {
        let before = bytes[..found.start()]
            .iter()
            .rev()
            .find(|b| !b.is_ascii_whitespace());
        if matches!(before, Some(b'.') | Some(b'$')) {
            continue;
        }
        let after = bytes[found.end()..]
            .iter()
            .find(|b| !b.is_ascii_whitespace());
        if after == Some(&b':') {
            continue;
        }
        return Some(found.as_str());
    }
    None
}

fn check_expression(exp: &str, raw: &str, range: SourceRange, errors: &mut Vec<CompilerError>) {
    let stripped = STRIP_STRING_RE.replace_all(exp, "");
    if let Some(keyword) = find_prohibited_keyword(&stripped) {
        errors.push(CompilerError::new(
            format!(
                "avoid using JavaScript keyword as property name: \
                 \"{}\"\n  Raw expression: {}",
                keyword, raw
            ),
            Some(range),
        ));
        return;
    }
    if exp.trim().is_empty() {
        return;
    }
    if let Some(reason) = balance_error(exp) {
        errors.push(CompilerError::new(
            format!(
                "invalid expression: {} in\n\n    {}\n\n  Raw expression: {}\n",
                reason, exp, raw
            ),
            Some(range),
        ));
    }
}

/// Delimiter balance outside string, template and regex context. The
/// division-versus-regex call looks at the previous significant character,
/// mirroring the filter parser.
fn balance_error(exp: &str) -> Option<&'static str> {
    let bytes = exp.as_bytes();
    let mut paren = 0i32;
    let mut square = 0i32;
    let mut curly = 0i32;
    let mut prev_significant = 0u8;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        i += 1;
        match c {
            b'\'' | b'"' | b'`' => {
                if !skip_quoted(bytes, &mut i, c) {
                    return Some("unterminated string");
                }
            }
            b'/' if !is_division_context(prev_significant) => {
                if !skip_regex(bytes, &mut i) {
                    return Some("unterminated regular expression");
                }
            }
            b'(' => paren += 1,
            b')' => paren -= 1,
            b'[' => square += 1,
            b']' => square -= 1,
            b'{' => curly += 1,
            b'}' => curly -= 1,
            _ => {}
        }
        if paren < 0 || square < 0 || curly < 0 {
            return Some("unbalanced delimiters");
        }
        if !c.is_ascii_whitespace() {
            prev_significant = c;
        }
    }
    if paren != 0 || square != 0 || curly != 0 {
        return Some("unbalanced delimiters");
    }
    None
}

fn skip_quoted(bytes: &[u8], i: &mut usize, quote: u8) -> bool {
    while *i < bytes.len() {
        let c = bytes[*i];
        *i += 1;
        if c == b'\\' {
            *i += 1;
        } else if c == quote {
            return true;
        }
    }
    false
}

fn skip_regex(bytes: &[u8], i: &mut usize) -> bool {
    let mut in_class = false;
    while *i < bytes.len() {
        let c = bytes[*i];
        *i += 1;
        match c {
            b'\\' => *i += 1,
            b'[' => in_class = true,
            b']' => in_class = false,
            b'/' if !in_class => return true,
            _ => {}
        }
    }
    false
}

fn is_division_context(prev: u8) -> bool {
    prev.is_ascii_alphanumeric() || matches!(prev, b')' | b'.' | b'+' | b'-' | b'_' | b'$' | b']')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Compiler;

    fn detect(template: &str) -> Vec<CompilerError> {
        let result = Compiler::web().compile(template);
        detect_errors(result.ast.as_deref())
    }

    #[test]
    fn test_clean_template_has_no_errors() {
        let errors = detect(
            "<div :class=\"{ active: on }\" @click=\"go('a')\">{{ list.map(i => i.id) }}</div>",
        );
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_keyword_in_interpolation() {
        let errors = detect("<div>{{ var a = 1 }}</div>");
        assert!(errors[0]
            .message
            .contains("avoid using JavaScript keyword as property name: \"var\""));
    }

    #[test]
    fn test_keyword_inside_string_is_fine() {
        let errors = detect("<div>{{ label + 'if' }}</div>");
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_unary_operator_as_property_name() {
        let errors = detect("<div @click=\"delete(item)\">x</div>");
        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .message
            .contains("avoid using JavaScript unary operator as property name"));
    }

    #[test]
    fn test_expression_position_keywords_pass() {
        let errors = detect("<div :title=\"new Date().toString()\">{{ new Intl.NumberFormat().format(n) }}</div>");
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_keyword_after_dot_is_property_access() {
        let errors = detect("<div @click=\"load(id).then(done).catch(fail).finally(cleanup)\">x</div>");
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_keyword_as_object_key_passes() {
        let errors = detect("<div :class=\"{ default: isDefault }\">x</div>");
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_dollar_delete_is_allowed() {
        let errors = detect("<div @click=\"$delete(obj, key)\">x</div>");
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_unbalanced_expression() {
        let errors = detect("<div :id=\"fn(a\">x</div>");
        assert!(errors[0].message.contains("invalid expression"));
    }

    #[test]
    fn test_paren_inside_string_balances() {
        let errors = detect("<div :id=\"fn(')')\">x</div>");
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_invalid_for_alias() {
        let errors = detect("<div><p v-for=\"a-b in list\">x</p></div>");
        assert!(errors[0].message.contains("invalid v-for alias"));
    }

    #[test]
    fn test_destructured_for_alias_is_valid() {
        let errors = detect("<div><p v-for=\"{ id, name } in list\">x</p></div>");
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_spliced_else_branches_are_checked() {
        let errors = detect("<div><p v-if=\"ok\">a</p><p v-else :id=\"fn(\">b</p></div>");
        assert!(errors.iter().any(|e| e.message.contains("invalid expression")));
    }

    #[test]
    fn test_scoped_slot_params_are_checked() {
        let errors = detect("<my-comp><template #row=\"{ a\">{{ a }}</template></my-comp>");
        assert!(errors
            .iter()
            .any(|e| e.message.contains("invalid function parameter expression")));
    }
}
