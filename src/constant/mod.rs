//! Constant evaluator
//!
//! Decides whether a source expression is fully determined without
//! template data and, if so, computes its value:
//!
//! ```text
//! source expression ──▶ lexer ──▶ parser ──▶ free-variable check ──▶ evaluator
//!                                                  │
//!                                   any name outside the fixed environment
//!                                                  ▼
//!                                            not constant
//! ```
//!
//! The environment is fixed and read-only: the `jade` helper namespace,
//! `jade_interp` (always undefined at compile time), and the literal names
//! `true`, `false`, `null`, `undefined`, `NaN` and `Infinity`. Folding is a
//! pure optimization, so anything the evaluator does not understand is
//! reported as not constant and left to the runtime.

mod eval;
mod lexer;
mod parser;
mod value;

use std::fmt;

use indexmap::IndexMap;
use lazy_static::lazy_static;

pub use eval::add;
pub use parser::{parse, Expr};
pub use value::{format_number, parse_number, Helper, Value};

/// Result type for evaluation
pub type EvalResult<T> = Result<T, EvalError>;

/// Why an expression could not be folded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// Not in the accepted expression subset
    Syntax(String),
    /// Reads a name that only exists at render time
    FreeVariable(String),
    /// Parsed, but folding would need runtime behavior we do not model
    Unsupported(String),
    /// The runtime would throw
    InvalidOperation(String),
}

impl EvalError {
    pub fn syntax(message: impl Into<String>) -> Self {
        EvalError::Syntax(message.into())
    }

    pub fn undefined(name: impl Into<String>) -> Self {
        EvalError::FreeVariable(name.into())
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        EvalError::Unsupported(what.into())
    }

    pub fn invalid_op(message: impl Into<String>) -> Self {
        EvalError::InvalidOperation(message.into())
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Syntax(msg) => write!(f, "syntax error: {}", msg),
            EvalError::FreeVariable(name) => write!(f, "'{}' is only known at render time", name),
            EvalError::Unsupported(what) => write!(f, "unsupported: {}", what),
            EvalError::InvalidOperation(msg) => write!(f, "invalid operation: {}", msg),
        }
    }
}

impl std::error::Error for EvalError {}

/// Read-only bindings visible to constant expressions.
#[derive(Debug, Clone)]
pub struct Environment {
    bindings: IndexMap<String, Value>,
}

impl Environment {
    /// The fixed environment every compile uses.
    pub fn standard() -> Self {
        let mut helpers = IndexMap::new();
        for helper in [
            Helper::Escape,
            Helper::Attr,
            Helper::Cls,
            Helper::JoinClasses,
            Helper::Style,
        ] {
            helpers.insert(helper.name().to_string(), Value::Helper(helper));
        }

        let mut bindings = IndexMap::new();
        bindings.insert("jade".to_string(), Value::Object(helpers));
        bindings.insert("jade_interp".to_string(), Value::Undefined);
        bindings.insert("undefined".to_string(), Value::Undefined);
        bindings.insert("null".to_string(), Value::Null);
        bindings.insert("true".to_string(), Value::Bool(true));
        bindings.insert("false".to_string(), Value::Bool(false));
        bindings.insert("NaN".to_string(), Value::Number(f64::NAN));
        bindings.insert("Infinity".to_string(), Value::Number(f64::INFINITY));
        Environment { bindings }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn get_or_err(&self, name: &str) -> EvalResult<&Value> {
        self.get(name).ok_or_else(|| EvalError::undefined(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Parse `src`, reject free variables, then evaluate.
    pub fn evaluate(&self, src: &str) -> EvalResult<Value> {
        let expr = parse(src)?;
        let mut names = Vec::new();
        expr.free_variables(&mut names);
        if let Some(free) = names.into_iter().find(|name| !self.contains(name)) {
            return Err(EvalError::undefined(free));
        }
        eval::Evaluator::new(self).eval(&expr)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::standard()
    }
}

lazy_static! {
    static ref STANDARD_ENV: Environment = Environment::standard();
}

/// Whether `src` evaluates to the same value regardless of template data.
pub fn is_constant(src: &str) -> bool {
    to_constant(src).is_some()
}

/// The value of `src` if it is constant.
pub fn to_constant(src: &str) -> Option<Value> {
    match STANDARD_ENV.evaluate(src) {
        Ok(value) => Some(value),
        Err(err) => {
            log::trace!("not folding `{}`: {}", src, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals_are_constant() {
        assert_eq!(to_constant("'hello'"), Some(Value::str("hello")));
        assert_eq!(to_constant("\"a\" + 'b'"), Some(Value::str("ab")));
        assert_eq!(to_constant("1 + 2 * 3"), Some(Value::Number(7.0)));
        assert_eq!(to_constant("true"), Some(Value::Bool(true)));
        assert_eq!(to_constant("undefined"), Some(Value::Undefined));
    }

    #[test]
    fn test_template_data_is_not_constant() {
        assert!(!is_constant("name"));
        assert!(!is_constant("'Hello ' + name"));
        assert!(!is_constant("user.name"));
        assert!(!is_constant("$(name)"));
        assert!(!is_constant("x = 1"));
    }

    #[test]
    fn test_short_circuit_still_requires_known_names() {
        // The unreached branch still names render-time data.
        assert!(!is_constant("false && name"));
    }

    #[test]
    fn test_helpers_fold() {
        assert_eq!(
            to_constant("jade.escape('<b>')"),
            Some(Value::str("&lt;b&gt;"))
        );
        assert_eq!(
            to_constant("jade.joinClasses(['a', null, 'b'])"),
            Some(Value::str("a b"))
        );
        assert_eq!(
            to_constant("jade.attr('href', '/x', true, false)"),
            Some(Value::str(" href=\"/x\""))
        );
        assert_eq!(to_constant("jade_interp"), Some(Value::Undefined));
    }

    #[test]
    fn test_structures_and_members() {
        assert_eq!(to_constant("[1, 2, 3].length"), Some(Value::Number(3.0)));
        assert_eq!(to_constant("'abc'[1]"), Some(Value::str("b")));
        assert_eq!(to_constant("{a: 'x'}.a"), Some(Value::str("x")));
        assert_eq!(
            to_constant("1 > 2 ? 'big' : 'small'"),
            Some(Value::str("small"))
        );
        assert_eq!(to_constant("typeof 1"), Some(Value::str("number")));
    }

    #[test]
    fn test_numbers_print_like_the_runtime() {
        assert_eq!(
            to_constant("12345678901234567890").map(|v| v.render_text()),
            Some("12345678901234567000".to_string())
        );
        assert_eq!(to_constant("010"), Some(Value::Number(8.0)));
        assert!(!is_constant("09"));
    }

    #[test]
    fn test_astral_string_indexing_is_not_folded() {
        assert!(!is_constant("'\u{1F600}a'[1]"));
        assert_eq!(to_constant("'\u{1F600}a'.length"), Some(Value::Number(3.0)));
        assert_eq!(to_constant("'é'[0]"), Some(Value::str("é")));
    }

    #[test]
    fn test_runtime_errors_are_not_folded() {
        assert!(!is_constant("null.x"));
        assert!(!is_constant("'abc'.toUpperCase()"));
        assert!(!is_constant("(1)(2)"));
    }
}
