//! Compile-time mirror of the render runtime helpers.
//!
//! Generated code calls `jade.escape`, `jade.attr`, `jade.cls` and
//! `jade.joinClasses` at render time. When every input is a constant the
//! compiler calls these instead and buffers the result as literal text,
//! so they must produce byte-for-byte what the runtime would.

use crate::constant::Value;

/// HTML-escape the string form of `value` (`&`, `<`, `>`, `"`).
pub fn escape(value: &Value) -> String {
    escape_str(&value.to_js_string())
}

pub fn escape_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

/// Objects become `key:value;key:value`, anything else passes through.
pub fn style(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Str(
            map.iter()
                .map(|(k, v)| format!("{}:{}", k, v.to_js_string()))
                .collect::<Vec<_>>()
                .join(";"),
        ),
        other => other.clone(),
    }
}

/// Serialize one attribute, including its leading space.
///
/// Booleans and absent values toggle the attribute; keys starting with
/// `data` carry non-string values as single-quoted JSON.
pub fn attr(key: &str, value: &Value, escaped: bool, terse: bool) -> String {
    let styled;
    let value = if key == "style" {
        styled = style(value);
        &styled
    } else {
        value
    };

    match value {
        Value::Bool(_) | Value::Undefined | Value::Null => {
            if value.is_truthy() {
                if terse {
                    format!(" {}", key)
                } else {
                    format!(" {}=\"{}\"", key, key)
                }
            } else {
                String::new()
            }
        }
        Value::Str(_) | Value::Helper(_) if key.starts_with("data") => {
            attr_text(key, value, escaped)
        }
        _ if key.starts_with("data") => {
            let json = value.to_json_string().unwrap_or_default();
            format!(" {}='{}'", key, json.replace('\'', "&apos;"))
        }
        _ => attr_text(key, value, escaped),
    }
}

fn attr_text(key: &str, value: &Value, escaped: bool) -> String {
    if escaped {
        format!(" {}=\"{}\"", key, escape(value))
    } else {
        format!(" {}=\"{}\"", key, value.to_js_string())
    }
}

/// Flatten a class value (string, array, or `{name: enabled}` map) into a
/// space separated list, dropping absent and empty entries.
pub fn join_classes(value: &Value) -> String {
    let parts: Vec<String> = match value {
        Value::Array(items) => items.iter().map(|v| Value::Str(join_classes(v))).collect::<Vec<_>>(),
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| v.is_truthy())
            .map(|(k, _)| Value::Str(k.clone()))
            .collect(),
        other => vec![other.clone()],
    }
    .into_iter()
    .filter(|v| !v.is_nullish() && *v != Value::Str(String::new()))
    .map(|v| v.to_js_string())
    .collect();
    parts.join(" ")
}

/// Render the ` class="..."` attribute for a list of class values, each
/// escaped according to its flag. Empty lists render nothing.
pub fn cls(classes: &[Value], escaped: &[bool]) -> String {
    let joined: Vec<Value> = classes
        .iter()
        .enumerate()
        .map(|(i, class)| {
            if escaped.get(i).copied().unwrap_or(false) {
                Value::Str(escape_str(&join_classes(&Value::Array(vec![class.clone()]))))
            } else {
                Value::Str(join_classes(class))
            }
        })
        .collect();
    let text = join_classes(&Value::Array(joined));
    if text.is_empty() {
        String::new()
    } else {
        format!(" class=\"{}\"", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(&Value::str("<a href=\"x\">&'</a>")),
            "&lt;a href=&quot;x&quot;&gt;&amp;'&lt;/a&gt;"
        );
        assert_eq!(escape(&Value::Number(3.0)), "3");
    }

    #[test]
    fn test_attr_boolean_modes() {
        assert_eq!(attr("checked", &Value::Bool(true), true, true), " checked");
        assert_eq!(
            attr("checked", &Value::Bool(true), true, false),
            " checked=\"checked\""
        );
        assert_eq!(attr("checked", &Value::Bool(false), true, false), "");
        assert_eq!(attr("title", &Value::Null, true, false), "");
    }

    #[test]
    fn test_attr_escaping() {
        assert_eq!(attr("id", &Value::str("a<b"), true, false), " id=\"a&lt;b\"");
        assert_eq!(attr("id", &Value::str("a<b"), false, false), " id=\"a<b\"");
    }

    #[test]
    fn test_attr_data_json() {
        let mut map = IndexMap::new();
        map.insert("it's".to_string(), Value::Number(1.0));
        assert_eq!(
            attr("data-opts", &Value::Object(map), true, false),
            " data-opts='{\"it&apos;s\":1}'"
        );
        assert_eq!(
            attr("data-name", &Value::str("x"), true, false),
            " data-name=\"x\""
        );
    }

    #[test]
    fn test_style_object() {
        let mut map = IndexMap::new();
        map.insert("color".to_string(), Value::str("red"));
        map.insert("margin".to_string(), Value::Number(0.0));
        assert_eq!(
            attr("style", &Value::Object(map), true, false),
            " style=\"color:red;margin:0\""
        );
    }

    #[test]
    fn test_join_classes() {
        let mut map = IndexMap::new();
        map.insert("active".to_string(), Value::Bool(true));
        map.insert("hidden".to_string(), Value::Bool(false));
        let value = Value::Array(vec![
            Value::str("a"),
            Value::Null,
            Value::str(""),
            Value::Object(map),
            Value::Array(vec![Value::str("b"), Value::str("c")]),
        ]);
        assert_eq!(join_classes(&value), "a active b c");
    }

    #[test]
    fn test_cls_escapes_per_flag() {
        let classes = [Value::str("a&b"), Value::str("<c>")];
        assert_eq!(cls(&classes, &[true, false]), " class=\"a&amp;b <c>\"");
        assert_eq!(cls(&[], &[]), "");
    }
}
