//! Interpolation parser for text nodes.

use stampa_relief::TextToken;

use crate::filter_parser::parse_filters;
use crate::helpers::quote_json;

/// A text chunk decomposed into literal and expression segments.
#[derive(Debug)]
pub struct TextParseResult {
    /// Single joined expression, e.g. `"a "+_s(b)+" c"`.
    pub expression: std::string::String,
    pub tokens: Vec<TextToken>,
}

/// Split `text` on the given delimiters. Returns `None` when the text
/// contains no interpolation at all.
pub fn parse_text(text: &str, delimiters: (&str, &str)) -> Option<TextParseResult> {
    let (open, close) = delimiters;
    let mut tokens = Vec::new();
    let mut parts: Vec<std::string::String> = Vec::new();
    let mut rest = text;
    let mut matched = false;

    loop {
        let Some(start) = rest.find(open) else { break };
        let body = &rest[start + open.len()..];
        let Some(end) = body.find(close) else { break };

        matched = true;
        if start > 0 {
            let literal = &rest[..start];
            parts.push(quote_json(literal));
            tokens.push(TextToken::Literal(literal.into()));
        }
        let exp = parse_filters(body[..end].trim());
        parts.push(format!("_s({})", exp));
        tokens.push(TextToken::Expression(exp.as_str().into()));
        rest = &body[end + close.len()..];
    }

    if !matched {
        return None;
    }
    if !rest.is_empty() {
        parts.push(quote_json(rest));
        tokens.push(TextToken::Literal(rest.into()));
    }

    Some(TextParseResult {
        expression: parts.join("+"),
        tokens,
    })
}
