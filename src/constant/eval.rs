//! Evaluation of parsed constant candidates.
//!
//! Operators follow the expression language's coercion rules so the folded
//! value matches what rendering would compute.

use indexmap::IndexMap;

use super::parser::Expr;
use super::value::{Helper, Value};
use super::{Environment, EvalError, EvalResult};
use crate::runtime;

pub struct Evaluator<'env> {
    env: &'env Environment,
}

impl<'env> Evaluator<'env> {
    pub fn new(env: &'env Environment) -> Self {
        Evaluator { env }
    }

    pub fn eval(&self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Ident(name) => self.env.get_or_err(name).cloned(),
            Expr::Array(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<EvalResult<Vec<_>>>()?,
            )),
            Expr::Object(props) => {
                let mut map = IndexMap::new();
                for (key, value) in props {
                    map.insert(key.clone(), self.eval(value)?);
                }
                Ok(Value::Object(map))
            }
            Expr::Unary(op, operand) => unary(op, self.eval(operand)?),
            Expr::Binary(op, lhs, rhs) => binary(op, self.eval(lhs)?, self.eval(rhs)?),
            Expr::Logical(op, lhs, rhs) => {
                let left = self.eval(lhs)?;
                match (*op, left.is_truthy()) {
                    ("&&", false) | ("||", true) => Ok(left),
                    _ => self.eval(rhs),
                }
            }
            Expr::Conditional(cond, then, otherwise) => {
                if self.eval(cond)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Member(object, property) => {
                member(&self.eval(object)?, &self.eval(property)?)
            }
            Expr::Call(callee, args) => {
                let callee = self.eval(callee)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<EvalResult<Vec<_>>>()?;
                match callee {
                    Value::Helper(helper) => call_helper(helper, &args),
                    other => Err(EvalError::invalid_op(format!(
                        "{} is not a function",
                        other.type_name()
                    ))),
                }
            }
        }
    }
}

fn unary(op: &str, value: Value) -> EvalResult<Value> {
    Ok(match op {
        "!" => Value::Bool(!value.is_truthy()),
        "-" => Value::Number(-value.to_number()),
        "+" => Value::Number(value.to_number()),
        "typeof" => Value::str(value.type_name()),
        other => return Err(EvalError::unsupported(format!("unary '{}'", other))),
    })
}

fn binary(op: &str, lhs: Value, rhs: Value) -> EvalResult<Value> {
    Ok(match op {
        "+" => add(lhs, rhs),
        "-" => Value::Number(lhs.to_number() - rhs.to_number()),
        "*" => Value::Number(lhs.to_number() * rhs.to_number()),
        "/" => Value::Number(lhs.to_number() / rhs.to_number()),
        "%" => Value::Number(lhs.to_number() % rhs.to_number()),
        "===" => Value::Bool(strict_equals(&lhs, &rhs)),
        "!==" => Value::Bool(!strict_equals(&lhs, &rhs)),
        "==" => Value::Bool(loose_equals(&lhs, &rhs)),
        "!=" => Value::Bool(!loose_equals(&lhs, &rhs)),
        "<" | ">" | "<=" | ">=" => compare(op, &lhs, &rhs),
        other => return Err(EvalError::unsupported(format!("operator '{}'", other))),
    })
}

/// Addition: string concatenation as soon as either side is a string
/// after primitive conversion, numeric addition otherwise.
pub fn add(lhs: Value, rhs: Value) -> Value {
    let (a, b) = (lhs.to_primitive(), rhs.to_primitive());
    match (&a, &b) {
        (Value::Str(x), _) => Value::Str(format!("{}{}", x, b.to_js_string())),
        (_, Value::Str(y)) => Value::Str(format!("{}{}", a.to_js_string(), y)),
        _ => Value::Number(a.to_number() + b.to_number()),
    }
}

fn strict_equals(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Helper(a), Value::Helper(b)) => a == b,
        // Distinct literals are distinct objects
        _ => false,
    }
}

fn loose_equals(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
        (Value::Number(_), Value::Str(_))
        | (Value::Str(_), Value::Number(_))
        | (Value::Bool(_), _)
        | (_, Value::Bool(_)) => {
            if matches!(lhs, Value::Array(_) | Value::Object(_))
                || matches!(rhs, Value::Array(_) | Value::Object(_))
            {
                loose_equals(&lhs.to_primitive(), &rhs.to_primitive())
            } else {
                lhs.to_number() == rhs.to_number()
            }
        }
        (Value::Array(_) | Value::Object(_), Value::Str(_) | Value::Number(_))
        | (Value::Str(_) | Value::Number(_), Value::Array(_) | Value::Object(_)) => {
            loose_equals(&lhs.to_primitive(), &rhs.to_primitive())
        }
        _ => strict_equals(lhs, rhs),
    }
}

fn compare(op: &str, lhs: &Value, rhs: &Value) -> Value {
    let (a, b) = (lhs.to_primitive(), rhs.to_primitive());
    let ordering = match (&a, &b) {
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        _ => a.to_number().partial_cmp(&b.to_number()),
    };
    let Some(ordering) = ordering else {
        return Value::Bool(false);
    };
    Value::Bool(match op {
        "<" => ordering.is_lt(),
        ">" => ordering.is_gt(),
        "<=" => ordering.is_le(),
        _ => ordering.is_ge(),
    })
}

fn member(object: &Value, property: &Value) -> EvalResult<Value> {
    let key = property.to_js_string();
    Ok(match object {
        Value::Undefined | Value::Null => {
            return Err(EvalError::invalid_op(format!(
                "cannot read property '{}' of {}",
                key,
                object.to_js_string()
            )))
        }
        Value::Str(s) => {
            if key == "length" {
                Value::Number(s.encode_utf16().count() as f64)
            } else if index_of(&key).is_some() && s.chars().any(|c| c.len_utf16() > 1) {
                // Indices count UTF-16 units; a surrogate half has no `char`
                return Err(EvalError::unsupported("indexing a string with astral characters"));
            } else {
                index_of(&key)
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::Str(c.to_string()))
                    .unwrap_or(Value::Undefined)
            }
        }
        Value::Array(items) => {
            if key == "length" {
                Value::Number(items.len() as f64)
            } else {
                index_of(&key)
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or(Value::Undefined)
            }
        }
        Value::Object(map) => map.get(&key).cloned().unwrap_or(Value::Undefined),
        // Methods on primitives are not folded
        Value::Bool(_) | Value::Number(_) | Value::Helper(_) => {
            return Err(EvalError::unsupported(format!("property '{}'", key)))
        }
    })
}

fn index_of(key: &str) -> Option<usize> {
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

fn call_helper(helper: Helper, args: &[Value]) -> EvalResult<Value> {
    Ok(match helper {
        Helper::Escape => Value::Str(runtime::escape(&arg(args, 0))),
        Helper::Style => runtime::style(&arg(args, 0)),
        Helper::JoinClasses => Value::Str(runtime::join_classes(&arg(args, 0))),
        Helper::Attr => Value::Str(runtime::attr(
            &arg(args, 0).to_js_string(),
            &arg(args, 1),
            arg(args, 2).is_truthy(),
            arg(args, 3).is_truthy(),
        )),
        Helper::Cls => {
            let classes = match arg(args, 0) {
                Value::Array(items) => items,
                other => return Err(EvalError::invalid_op(format!(
                    "cls expects a list, got {}",
                    other.type_name()
                ))),
            };
            let escaped: Vec<bool> = match arg(args, 1) {
                Value::Array(flags) => flags.iter().map(Value::is_truthy).collect(),
                _ => Vec::new(),
            };
            Value::Str(runtime::cls(&classes, &escaped))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_coercion() {
        assert_eq!(add(Value::Number(1.0), Value::str("2")), Value::str("12"));
        assert_eq!(add(Value::Number(1.0), Value::Bool(true)), Value::Number(2.0));
        assert_eq!(
            add(Value::Array(vec![Value::Number(1.0)]), Value::Null),
            Value::str("1null")
        );
    }

    #[test]
    fn test_loose_equality() {
        assert!(loose_equals(&Value::Null, &Value::Undefined));
        assert!(loose_equals(&Value::Number(1.0), &Value::str("1")));
        assert!(loose_equals(&Value::Bool(true), &Value::Number(1.0)));
        assert!(!loose_equals(&Value::Null, &Value::Number(0.0)));
        assert!(!strict_equals(&Value::Number(1.0), &Value::str("1")));
    }

    #[test]
    fn test_compare_strings_and_numbers() {
        assert_eq!(
            compare("<", &Value::str("a"), &Value::str("b")),
            Value::Bool(true)
        );
        assert_eq!(
            compare("<", &Value::str("10"), &Value::Number(9.0)),
            Value::Bool(false)
        );
        assert_eq!(
            compare(">=", &Value::Number(f64::NAN), &Value::Number(1.0)),
            Value::Bool(false)
        );
    }
}
