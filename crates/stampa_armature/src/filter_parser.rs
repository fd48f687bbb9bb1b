//! Pipe-filter parser for binding expressions.
//!
//! A single character scan tracks string, template-string and regex
//! contexts plus bracket depth, so that `|` only splits filters at the top
//! level. Division versus regex start is decided by the preceding
//! character, the same heuristic browsers' tokenizers use.

fn is_division_context(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b')' | b'.' | b'+' | b'-' | b'_' | b'$' | b']')
}

/// Rewrite `exp | f1 | f2(arg)` into nested `_f` calls.
pub fn parse_filters(exp: &str) -> std::string::String {
    let bytes = exp.as_bytes();
    let mut in_single = false;
    let mut in_double = false;
    let mut in_template = false;
    let mut in_regex = false;
    let mut curly = 0i32;
    let mut square = 0i32;
    let mut paren = 0i32;
    let mut last_filter_index = 0usize;
    let mut expression: Option<std::string::String> = None;
    let mut filters: Vec<&str> = Vec::new();
    let mut prev = 0u8;

    for i in 0..bytes.len() {
        let c = bytes[i];
        if in_single {
            if c == b'\'' && prev != b'\\' {
                in_single = false;
            }
        } else if in_double {
            if c == b'"' && prev != b'\\' {
                in_double = false;
            }
        } else if in_template {
            if c == b'`' && prev != b'\\' {
                in_template = false;
            }
        } else if in_regex {
            if c == b'/' && prev != b'\\' {
                in_regex = false;
            }
        } else if c == b'|'
            && bytes.get(i + 1) != Some(&b'|')
            && (i == 0 || bytes[i - 1] != b'|')
            && curly == 0
            && square == 0
            && paren == 0
        {
            if expression.is_none() {
                expression = Some(exp[..i].trim().to_owned());
            } else {
                filters.push(exp[last_filter_index..i].trim());
            }
            last_filter_index = i + 1;
        } else {
            match c {
                b'"' => in_double = true,
                b'\'' => in_single = true,
                b'`' => in_template = true,
                b'(' => paren += 1,
                b')' => paren -= 1,
                b'[' => square += 1,
                b']' => square -= 1,
                b'{' => curly += 1,
                b'}' => curly -= 1,
                b'/' => {
                    // Division only follows a value; anything else opens a
                    // regex literal.
                    let p = bytes[..i]
                        .iter()
                        .rev()
                        .copied()
                        .find(|b| !b.is_ascii_whitespace());
                    if !p.is_some_and(is_division_context) {
                        in_regex = true;
                    }
                }
                _ => {}
            }
        }
        prev = c;
    }

    let mut expression = match expression {
        Some(e) => {
            filters.push(exp[last_filter_index..].trim());
            e
        }
        None => exp.trim().to_owned(),
    };

    for filter in filters {
        expression = wrap_filter(&expression, filter);
    }
    expression
}

fn wrap_filter(exp: &str, filter: &str) -> std::string::String {
    match filter.find('(') {
        None => format!("_f(\"{}\")({})", filter, exp),
        Some(i) => {
            let name = &filter[..i];
            let args = &filter[i + 1..];
            if args == ")" {
                format!("_f(\"{}\")({}{}", name, exp, args)
            } else {
                format!("_f(\"{}\")({},{}", name, exp, args)
            }
        }
    }
}
