//! Splitting text into literal runs and `#{...}` / `!{...}` expressions
//!
//! `#{expr}` is HTML-escaped at render time, `!{expr}` is not, and a
//! backslash in front (`\#{`) keeps the marker as literal text. The closing
//! brace is found with a small bracket- and string-aware scanner, so
//! `#{ {a: '}'}.a }` ends at the right brace.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref MARKER: Regex = Regex::new(r"(\\)?([#!])\{").unwrap_or_else(|e| panic!("{}", e));
}

/// One run of interpolated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Expr { src: &'a str, escape: bool },
}

/// Split `input` into segments.
///
/// Fails with a message when an expression has no closing brace.
pub fn split(input: &str) -> Result<Vec<Segment<'_>>, String> {
    let mut segments = Vec::new();
    let mut rest = input;

    while let Some(caps) = MARKER.captures(rest) {
        let Some(whole) = caps.get(0) else { break };
        if whole.start() > 0 {
            segments.push(Segment::Text(&rest[..whole.start()]));
        }
        let after = &rest[whole.end()..];

        if caps.get(1).is_some() {
            // Escaped marker, drop the backslash
            segments.push(Segment::Text(&rest[whole.start() + 1..whole.end()]));
            rest = after;
            continue;
        }

        let end = closing_brace(after)?;
        segments.push(Segment::Expr {
            src: &after[..end],
            escape: &caps[2] == "#",
        });
        rest = &after[end + 1..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    Ok(segments)
}

/// Byte index of the `}` closing an expression that starts at `src[0]`.
pub fn closing_brace(src: &str) -> Result<usize, String> {
    let mut stack: Vec<char> = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                let quote = c;
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    if c == '\\' {
                        chars.next();
                    } else if c == quote {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    break;
                }
            }
            '/' if matches!(chars.peek(), Some((_, '/'))) => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut prev = '\0';
                for (_, c) in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                if c == '}' && stack.is_empty() {
                    return Ok(i);
                }
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(expected) {
                    return Err(format!("Mismatched bracket: {}", c));
                }
            }
            _ => {}
        }
    }

    Err("The end of the string was reached with no closing bracket found.".to_string())
}
