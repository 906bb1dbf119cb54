//! Value types for the constant evaluator.
//!
//! Values follow the semantics of the template's expression language
//! (loose typing, string coercion on `+`, generalized truthiness), since a
//! folded value must print exactly what the runtime would have printed.

use std::fmt;

use indexmap::IndexMap;

/// Runtime helpers reachable through the `jade` namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Helper {
    Escape,
    Attr,
    Cls,
    JoinClasses,
    Style,
}

impl Helper {
    pub fn name(&self) -> &'static str {
        match self {
            Helper::Escape => "escape",
            Helper::Attr => "attr",
            Helper::Cls => "cls",
            Helper::JoinClasses => "joinClasses",
            Helper::Style => "style",
        }
    }
}

/// A statically known value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Vec<Value>),
    /// An object literal - uses IndexMap for ordered keys
    Object(IndexMap<String, Value>),
    Helper(Helper),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Result of the `typeof` operator.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Helper(_) => "function",
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Helper(_) => true,
        }
    }

    /// String conversion as performed by concatenation and `String(v)`.
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Helper(h) => format!("function {}() {{ [native code] }}", h.name()),
        }
    }

    /// Text a buffered expression renders: absent values render nothing.
    pub fn render_text(&self) -> String {
        if self.is_nullish() {
            String::new()
        } else {
            self.to_js_string()
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::Str(s) => parse_number(s),
            Value::Array(_) => parse_number(&self.to_js_string()),
            Value::Object(_) | Value::Helper(_) => f64::NAN,
        }
    }

    /// Arrays and objects collapse to their string form; everything else
    /// is already primitive.
    pub fn to_primitive(&self) -> Value {
        match self {
            Value::Array(_) | Value::Object(_) | Value::Helper(_) => Value::Str(self.to_js_string()),
            other => other.clone(),
        }
    }

    /// JSON form as produced by `JSON.stringify`. `None` for values that
    /// have no JSON representation at top level.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        Some(match self {
            Value::Undefined | Value::Helper(_) => return None,
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| item.to_json().unwrap_or(serde_json::Value::Null))
                    .collect(),
            ),
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .filter_map(|(k, v)| v.to_json().map(|json| (k.clone(), json)))
                    .collect(),
            ),
        })
    }

    pub fn to_json_string(&self) -> Option<String> {
        self.to_json().map(|json| json.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_js_string())
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        // Parse the shortest digits back so `12345678901234567890` stays
        // `12345678901234567000` instead of its exact binary value
        let digits = format_number(n);
        if let Ok(int) = digits.parse::<i64>() {
            return serde_json::Value::from(int);
        }
        if let Ok(int) = digits.parse::<u64>() {
            return serde_json::Value::from(int);
        }
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Number to string, matching the expression language's formatting.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let formatted = format!("{:e}", n);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => formatted,
        };
    }
    // Shortest round-trip digits, zero padded, never exponential
    format!("{}", n)
}

/// String to number conversion: surrounding whitespace is ignored, the
/// empty string is zero, hex literals are accepted, anything else is NaN.
pub fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // Rust accepts "inf"/"nan" spellings the expression language does not
    if trimmed
        .chars()
        .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn test_json_integers_use_shortest_digits() {
        assert_eq!(
            Value::Number(12345678901234567890.0).to_json_string().as_deref(),
            Some("12345678901234567000")
        );
        assert_eq!(Value::Number(-3.0).to_json_string().as_deref(), Some("-3"));
    }

    #[test]
    fn test_format_large_integers_use_shortest_digits() {
        assert_eq!(format_number(12345678901234567890.0), "12345678901234567000");
        assert_eq!(format_number(9007199254740993.0), "9007199254740992");
        assert_eq!(format_number(-1e20), "-100000000000000000000");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 42 "), 42.0);
        assert_eq!(parse_number(""), 0.0);
        assert_eq!(parse_number("0x10"), 16.0);
        assert!(parse_number("inf").is_nan());
        assert!(parse_number("12px").is_nan());
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::str("").is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
        assert!(Value::str("0").is_truthy());
    }

    #[test]
    fn test_array_stringification_skips_absent() {
        let v = Value::Array(vec![Value::Number(1.0), Value::Null, Value::str("a")]);
        assert_eq!(v.to_js_string(), "1,,a");
    }

    #[test]
    fn test_json_keeps_key_order_and_integers() {
        let mut map = IndexMap::new();
        map.insert("z".to_string(), Value::Number(1.0));
        map.insert("a".to_string(), Value::Undefined);
        map.insert("b".to_string(), Value::Number(1.5));
        assert_eq!(
            Value::Object(map).to_json_string().as_deref(),
            Some(r#"{"z":1,"b":1.5}"#)
        );
    }
}
