//! Event handler code generation.
//!
//! Each handler value is classified as a method path, a function
//! expression, an invocation, or a bare statement, and wrapped
//! accordingly. Modifiers compile to inline guards; key modifiers go
//! through the `_k` runtime filter with both legacy keyCodes and modern
//! key names.

use once_cell::sync::Lazy;
use phf::{phf_map, Map as PhfMap};
use regex::Regex;
use stampa_armature::helpers::quote_json;
use stampa_relief::{EventHandler, HandlerMap};

/// `foo`, `foo.bar`, `foo["bar"]`, `foo[0]`, `foo[bar]`.
static SIMPLE_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*|\['[^']*?'\]|\["[^"]*?"\]|\[\d+\]|\[[A-Za-z_$][\w$]*\])*$"#,
    )
    .unwrap()
});
static FN_EXP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\w$_]+|\([^)]*?\))\s*=>|^function(?:\s+[\w$]+)?\s*\(").unwrap());
static FN_INVOKE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*?\);*$").unwrap());

static KEY_CODES: PhfMap<&'static str, &'static str> = phf_map! {
    "esc" => "27",
    "tab" => "9",
    "enter" => "13",
    "space" => "32",
    "up" => "38",
    "left" => "37",
    "right" => "39",
    "down" => "40",
    "delete" => "[8,46]",
};

// KeyboardEvent.key aliases, including the IE/Edge spellings.
static KEY_NAMES: PhfMap<&'static str, &'static str> = phf_map! {
    "esc" => r#"["Esc","Escape"]"#,
    "tab" => r#""Tab""#,
    "enter" => r#""Enter""#,
    "space" => r#"[" ","Spacebar"]"#,
    "up" => r#"["Up","ArrowUp"]"#,
    "left" => r#"["Left","ArrowLeft"]"#,
    "right" => r#"["Right","ArrowRight"]"#,
    "down" => r#"["Down","ArrowDown"]"#,
    "delete" => r#"["Backspace","Delete","Del"]"#,
};

fn gen_guard(condition: &str) -> String {
    format!("if({})return null;", condition)
}

fn modifier_guard(name: &str) -> Option<String> {
    match name {
        "stop" => Some("$event.stopPropagation();".to_owned()),
        "prevent" => Some("$event.preventDefault();".to_owned()),
        "self" => Some(gen_guard("$event.target !== $event.currentTarget")),
        "ctrl" => Some(gen_guard("!$event.ctrlKey")),
        "shift" => Some(gen_guard("!$event.shiftKey")),
        "alt" => Some(gen_guard("!$event.altKey")),
        "meta" => Some(gen_guard("!$event.metaKey")),
        "left" => Some(gen_guard("'button' in $event && $event.button !== 0")),
        "middle" => Some(gen_guard("'button' in $event && $event.button !== 1")),
        "right" => Some(gen_guard("'button' in $event && $event.button !== 2")),
        _ => None,
    }
}

/// Generate the `on:`/`nativeOn:` data fragment for an event map.
pub fn gen_handlers(events: &HandlerMap, native: bool) -> String {
    let prefix = if native { "nativeOn:" } else { "on:" };
    let mut static_handlers = String::new();
    let mut dynamic_handlers = String::new();

    for (name, handlers) in events.iter() {
        let code = gen_handler_list(handlers);
        let dynamic = handlers.len() == 1 && handlers[0].dynamic;
        if dynamic {
            dynamic_handlers.push_str(&format!("{},{},", name, code));
        } else {
            static_handlers.push_str(&format!("\"{}\":{},", name, code));
        }
    }

    let static_handlers = format!("{{{}}}", static_handlers.trim_end_matches(','));
    if dynamic_handlers.is_empty() {
        format!("{}{}", prefix, static_handlers)
    } else {
        format!(
            "{}_d({},[{}])",
            prefix,
            static_handlers,
            dynamic_handlers.trim_end_matches(',')
        )
    }
}

fn gen_handler_list(handlers: &[EventHandler]) -> String {
    if handlers.len() == 1 {
        return gen_handler(&handlers[0]);
    }
    let parts: Vec<_> = handlers.iter().map(gen_handler).collect();
    format!("[{}]", parts.join(","))
}

fn gen_handler(handler: &EventHandler) -> String {
    let value = handler.value.as_str();
    if value.is_empty() {
        return "function(){}".to_owned();
    }

    let is_method_path = SIMPLE_PATH_RE.is_match(value);
    let is_fn_expression = FN_EXP_RE.is_match(value);
    let is_fn_invocation = FN_INVOKE_RE.is_match(value);

    if handler.modifiers.is_empty() {
        if is_method_path || is_fn_expression {
            return value.to_owned();
        }
        let body = if is_fn_invocation {
            format!("return {}", value)
        } else {
            value.to_owned()
        };
        return format!("function($event){{{}}}", body);
    }

    let mut code = String::new();
    let mut guard_code = String::new();
    let mut keys: Vec<&str> = Vec::new();
    for modifier in &handler.modifiers {
        let modifier = modifier.as_str();
        match modifier_guard(modifier) {
            Some(guard) => {
                guard_code.push_str(&guard);
                // left/right double as key modifiers.
                if KEY_CODES.contains_key(modifier) {
                    keys.push(modifier);
                }
            }
            None if modifier == "exact" => {
                let absent: Vec<_> = ["ctrl", "shift", "alt", "meta"]
                    .iter()
                    .filter(|m| !handler.modifiers.iter().any(|h| h.as_str() == **m))
                    .map(|m| format!("$event.{}Key", m))
                    .collect();
                guard_code.push_str(&gen_guard(&absent.join("||")));
            }
            None => keys.push(modifier),
        }
    }

    if !keys.is_empty() {
        code.push_str(&gen_key_filter(&keys));
    }
    // Key filter first so modifiers like .stop are not applied to wrong keys.
    code.push_str(&guard_code);

    let handler_code = if is_method_path {
        format!("return {}.apply(null, arguments)", value)
    } else if is_fn_expression {
        format!("return ({}).apply(null, arguments)", value)
    } else if is_fn_invocation {
        format!("return {}", value)
    } else {
        value.to_owned()
    };
    format!("function($event){{{}{}}}", code, handler_code)
}

fn gen_key_filter(keys: &[&str]) -> String {
    let filters: Vec<_> = keys.iter().map(|k| gen_filter_code(k)).collect();
    format!(
        "if(!$event.type.indexOf('key')&&{})return null;",
        filters.join("&&")
    )
}

fn gen_filter_code(key: &str) -> String {
    if let Ok(code) = key.parse::<i64>() {
        if code != 0 {
            return format!("$event.keyCode!=={}", code);
        }
    }
    let key_code = KEY_CODES.get(key).copied().unwrap_or("undefined");
    let key_name = KEY_NAMES.get(key).copied().unwrap_or("undefined");
    format!(
        "_k($event.keyCode,{},{},$event.key,{})",
        quote_json(key),
        key_code,
        key_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use stampa_carton::SourceRange;

    fn handler(value: &str, modifiers: &[&str]) -> EventHandler {
        EventHandler {
            value: value.into(),
            dynamic: false,
            modifiers: modifiers.iter().map(|m| (*m).into()).collect(),
            range: SourceRange::STUB,
        }
    }

    fn events(name: &str, h: EventHandler) -> HandlerMap {
        let mut map = HandlerMap::default();
        map.insert(name.into(), vec![h]);
        map
    }

    #[test]
    fn test_method_path_passthrough() {
        let out = gen_handlers(&events("click", handler("onClick", &[])), false);
        assert_eq!(out, "on:{\"click\":onClick}");
    }

    #[test]
    fn test_statement_is_wrapped() {
        let out = gen_handlers(&events("click", handler("count++", &[])), false);
        assert_eq!(out, "on:{\"click\":function($event){count++}}");
    }

    #[test]
    fn test_invocation_returns() {
        let out = gen_handlers(&events("click", handler("go('a')", &[])), false);
        assert_eq!(out, "on:{\"click\":function($event){return go('a')}}");
    }

    #[test]
    fn test_function_expression_passthrough() {
        let out = gen_handlers(&events("click", handler("e => save(e)", &[])), false);
        assert_eq!(out, "on:{\"click\":e => save(e)}");
    }

    #[test]
    fn test_stop_modifier() {
        let out = gen_handlers(&events("click", handler("go", &["stop"])), false);
        assert_eq!(
            out,
            "on:{\"click\":function($event){$event.stopPropagation();return go.apply(null, arguments)}}"
        );
    }

    #[test]
    fn test_enter_key_modifier() {
        let out = gen_handlers(&events("keyup", handler("submit", &["enter"])), false);
        assert!(out.contains("_k($event.keyCode,\"enter\",13,$event.key,\"Enter\")"));
        assert!(out.contains("if(!$event.type.indexOf('key')&&"));
    }

    #[test]
    fn test_delete_key_uses_both_codes() {
        let out = gen_handlers(&events("keyup", handler("del", &["delete"])), false);
        assert!(out.contains(",[8,46],"));
        assert!(out.contains(r#"["Backspace","Delete","Del"]"#));
    }

    #[test]
    fn test_numeric_key_code() {
        let out = gen_handlers(&events("keyup", handler("go", &["13"])), false);
        assert!(out.contains("$event.keyCode!==13"));
    }

    #[test]
    fn test_exact_modifier() {
        let out = gen_handlers(&events("click", handler("go", &["ctrl", "exact"])), false);
        assert!(out.contains("if(!$event.ctrlKey)return null;"));
        assert!(out.contains("if($event.shiftKey||$event.altKey||$event.metaKey)return null;"));
    }

    #[test]
    fn test_dynamic_event_name() {
        let mut h = handler("go", &[]);
        h.dynamic = true;
        let out = gen_handlers(&events("eventName", h), false);
        assert_eq!(out, "on:_d({},[eventName,go])");
    }

    #[test]
    fn test_multiple_handlers_for_one_event() {
        let mut map = HandlerMap::default();
        map.insert("click".into(), vec![handler("a", &[]), handler("b", &[])]);
        let out = gen_handlers(&map, false);
        assert_eq!(out, "on:{\"click\":[a,b]}");
    }

    #[test]
    fn test_native_prefix() {
        let out = gen_handlers(&events("click", handler("go", &[])), true);
        assert!(out.starts_with("nativeOn:"));
    }
}
