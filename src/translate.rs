//! Expression translation from template syntax to Nim syntax
//!
//! This is textual transliteration, not a reparse: each rewrite is a
//! regular expression applied in table order. The accepted expression
//! subset is therefore exactly what these rules turn into valid Nim.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

/// How often a rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Apply {
    /// Leftmost match only
    First,
    /// Every non-overlapping match
    All,
}

struct Rewrite {
    pattern: Regex,
    replacement: &'static str,
    apply: Apply,
}

impl Rewrite {
    fn new(pattern: &str, replacement: &'static str, apply: Apply) -> Self {
        Rewrite {
            // Patterns are fixed at build time
            pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("bad rewrite {}: {}", pattern, e)),
            replacement,
            apply,
        }
    }

    fn run(&self, input: &str) -> String {
        match self.apply {
            Apply::First => self.pattern.replace(input, self.replacement).into_owned(),
            Apply::All => self.pattern.replace_all(input, self.replacement).into_owned(),
        }
    }
}

fn run_all(rules: &[Rewrite], input: &str) -> String {
    rules
        .iter()
        .fold(input.to_string(), |acc, rule| rule.run(&acc))
}

lazy_static! {
    /// Statement rewrites for unbuffered and buffered code, in order.
    static ref STATEMENT_RULES: Vec<Rewrite> = vec![
        // Nim has no statement terminator
        Rewrite::new(r"; *$", "", Apply::First),
        Rewrite::new(r"^while (.*)", "while truthiness($1):", Apply::First),
        Rewrite::new(r"^if +\((.*)\)", "if truthiness($1):", Apply::First),
        Rewrite::new(r"^else +if *\((.*)\)", "elif truthiness($1):", Apply::First),
        Rewrite::new(r"^else *$", "else:", Apply::First),
    ];

    /// Conditional-operator rewrites, most specific bracket form first.
    static ref TERNARY_RULES: Vec<Rewrite> = vec![
        Rewrite::new(
            r"(.+)\? *\((.+)\) *: *\(?(.+)\)?",
            "if $1: ($2) else: ($3)",
            Apply::First,
        ),
        Rewrite::new(
            r"(.+)\? *([^()]+) *: *\((.+)\)",
            "if $1: ($2) else: ($3)",
            Apply::First,
        ),
        Rewrite::new(r"(.+)\?(.+):(.+)", "(if $1: $2 else: $3)", Apply::First),
    ];

    /// Operator rewrites for attribute values.
    static ref ATTRIBUTE_RULES: Vec<Rewrite> = vec![
        Rewrite::new(r" \+ ", " & ", Apply::All),
        Rewrite::new(r" & \(", " & $$(", Apply::All),
        Rewrite::new(r"'", "\"", Apply::All),
    ];

    static ref QUOTED: Regex =
        Regex::new(r#"'([^']*[^\\])'|"([^"]*[^\\])"|'()'|"()""#).unwrap_or_else(|e| panic!("{}", e));
}

/// Rewrite string literals to Nim's only string quote.
///
/// Both quote styles end up double quoted; a double quote inside a
/// formerly single-quoted literal is escaped.
pub fn normalize_quotes(src: &str) -> String {
    QUOTED
        .replace_all(src, |caps: &Captures| {
            if let Some(single) = caps.get(1) {
                format!("\"{}\"", escape_inner_quotes(single.as_str()))
            } else if let Some(double) = caps.get(2) {
                format!("\"{}\"", double.as_str())
            } else {
                "\"\"".to_string()
            }
        })
        .into_owned()
}

fn escape_inner_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev = '\0';
    for c in text.chars() {
        if c == '"' && prev != '\\' {
            out.push('\\');
        }
        out.push(c);
        prev = c;
    }
    out
}

/// Translate a code line (`- stmt`, `= expr`).
///
/// Leading whitespace goes, quotes are normalized, a trailing `;` is
/// stripped and `if`/`else if`/`else`/`while` heads become Nim heads with
/// an explicit `truthiness(...)` coercion.
///
/// The first `!` becomes `not `, blindly: `a != b` turns into `a not = b`.
/// Templates written against this translator rely on that behavior.
pub fn translate_statement(src: &str) -> String {
    let val = normalize_quotes(src.trim_start());
    let val = run_all(&STATEMENT_RULES, &val);
    val.replacen('!', "not ", 1)
}

/// Rewrite `cond ? a : b` into Nim's `if cond: a else: b` expression.
pub fn translate_ternary(src: &str) -> String {
    run_all(&TERNARY_RULES, src)
}

/// Translate an interpolated tag name expression.
pub fn translate_tag_name(src: &str) -> String {
    normalize_quotes(&translate_ternary(src))
}

/// Translate a dynamic attribute value: `+` becomes `&`, a parenthesized
/// operand after `&` is stringified with `$`, quotes become double.
pub fn translate_attribute(src: &str) -> String {
    run_all(&ATTRIBUTE_RULES, src)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_quotes() {
        assert_eq!(normalize_quotes("'abc'"), "\"abc\"");
        assert_eq!(normalize_quotes("\"abc\""), "\"abc\"");
        assert_eq!(normalize_quotes("f('a', \"b\")"), "f(\"a\", \"b\")");
        assert_eq!(normalize_quotes("''"), "\"\"");
        assert_eq!(normalize_quotes("'say \"hi\"'"), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_translate_if_else() {
        assert_eq!(translate_statement("if (user)"), "if truthiness(user):");
        assert_eq!(
            translate_statement("else if (other)"),
            "elif truthiness(other):"
        );
        assert_eq!(translate_statement("else"), "else:");
        assert_eq!(
            translate_statement("while (i < 3)"),
            "while truthiness((i < 3)):"
        );
    }

    #[test]
    fn test_translate_strips_semicolon_and_indent() {
        assert_eq!(translate_statement("   var x = 'a';"), "var x = \"a\"");
    }

    #[test]
    fn test_negation_is_rewritten() {
        assert_eq!(translate_statement("if (!done)"), "if truthiness(not done):");
    }

    #[test]
    fn test_negation_corrupts_not_equal() {
        // Known limitation: `!=` is not special-cased.
        assert_eq!(
            translate_statement("if (a != b)"),
            "if truthiness(a not = b):"
        );
        assert_eq!(translate_statement("!a && !b"), "not a && !b");
    }

    #[test]
    fn test_translate_ternary_forms() {
        assert_eq!(
            translate_ternary("big ? ('h1') : 'h2'"),
            "if big : ('h1') else: ('h2')"
        );
        // The optional closing bracket loses to the greedy alternative.
        assert_eq!(
            translate_ternary("big ? ('h1') : ('h2')"),
            "if big : ('h1') else: ('h2'))"
        );
        assert_eq!(
            translate_ternary("big ? 'h1' : ('h2')"),
            "if big : ('h1' ) else: ('h2')"
        );
        assert_eq!(
            translate_ternary("big ? 'h1' : 'h2'"),
            "(if big :  'h1'  else:  'h2')"
        );
        assert_eq!(translate_ternary("name"), "name");
    }

    #[test]
    fn test_translate_attribute() {
        assert_eq!(
            translate_attribute("'/user/' + (id) + '/edit'"),
            "\"/user/\" & $(id) & \"/edit\""
        );
    }
}
