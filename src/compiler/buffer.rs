//! Emission buffer and append-statement coalescing
//!
//! Generated code is a list of Nim lines. Literal text and runtime
//! expressions are appended to the render output through
//! `jade_buf.add(...)` statements; consecutive appends with nothing in
//! between are merged into the statement on the last line instead of
//! starting a new one:
//!
//! ```text
//! buffer_text("<p>")        jade_buf.add("<p>")
//! buffer_expr("name")   ─▶  jade_buf.add("<p>" & $(name))
//! buffer_text("</p>")       jade_buf.add("<p>" & $(name) & "</p>")
//! ```
//!
//! Any other line pushed in between ends the merge, so control flow never
//! gets folded into an append.

use std::ops::Range;

const INDENT_WITH: &str = "  ";

/// One piece of a pending append statement.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    /// Already escaped for a Nim string literal
    Text(String),
    /// A Nim expression, stringified with `$` when rendered
    Expr(String),
}

/// The append statement currently being built.
#[derive(Debug, Clone)]
struct PendingFragment {
    /// Index of the line holding the statement
    line: usize,
    /// Indentation the statement was started at
    indent: usize,
    pieces: Vec<Piece>,
}

impl PendingFragment {
    fn render(&self) -> String {
        let body = self
            .pieces
            .iter()
            .map(|piece| match piece {
                Piece::Text(text) => format!("\"{}\"", text),
                Piece::Expr(expr) => format!("$({})", expr),
            })
            .collect::<Vec<_>>()
            .join(" & ");
        format!("{}jade_buf.add({})", create_indent(self.indent), body)
    }
}

fn create_indent(level: usize) -> String {
    INDENT_WITH.repeat(level)
}

/// Escape `text` for use inside a Nim string literal.
pub fn escape_nim_string(text: &str) -> String {
    let quoted = serde_json::to_string(text).unwrap_or_else(|_| format!("{:?}", text));
    quoted[1..quoted.len() - 1].to_string()
}

/// Quote `text` as a Nim string literal.
pub fn nim_string_literal(text: &str) -> String {
    format!("\"{}\"", escape_nim_string(text))
}

#[derive(Debug, Clone)]
pub struct EmissionBuffer {
    lines: Vec<String>,
    indent: usize,
    pending: Option<PendingFragment>,
}

impl EmissionBuffer {
    /// Generated code lives inside a procedure body, one level in.
    pub fn new() -> Self {
        EmissionBuffer {
            lines: Vec::new(),
            indent: 1,
            pending: None,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn indent_level(&self) -> usize {
        self.indent
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        debug_assert!(self.indent > 1, "unbalanced dedent");
        self.indent = self.indent.saturating_sub(1).max(1);
    }

    /// Push a statement at the current indentation.
    pub fn push_line(&mut self, text: &str) {
        self.lines.push(format!("{}{}", create_indent(self.indent), text));
    }

    /// Push an empty line. Used to end blocks and to stop merging.
    pub fn push_blank(&mut self) {
        self.lines.push(String::new());
    }

    /// The pending statement, if it is still the last line and at the
    /// current indentation.
    fn live_pending(&mut self) -> Option<&mut PendingFragment> {
        let last = self.lines.len().checked_sub(1)?;
        let indent = self.indent;
        self.pending
            .as_mut()
            .filter(|pending| pending.line == last && pending.indent == indent)
    }

    fn append(&mut self, piece: Piece) {
        if let Some(pending) = self.live_pending() {
            match (pending.pieces.last_mut(), piece) {
                (Some(Piece::Text(prev)), Piece::Text(text)) => prev.push_str(&text),
                (_, piece) => pending.pieces.push(piece),
            }
            let rendered = pending.render();
            let line = pending.line;
            self.lines[line] = rendered;
            return;
        }

        let pending = PendingFragment {
            line: self.lines.len(),
            indent: self.indent,
            pieces: vec![piece],
        };
        self.lines.push(pending.render());
        self.pending = Some(pending);
    }

    /// Append literal text to the render output.
    pub fn buffer_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.append(Piece::Text(escape_nim_string(text)));
    }

    /// Append the stringified value of a Nim expression to the render output.
    pub fn buffer_expr(&mut self, expr: &str) {
        self.append(Piece::Expr(expr.to_string()));
    }

    /// Blank lines in `range`, keeping every other index stable.
    pub fn blank(&mut self, range: Range<usize>) {
        let end = range.end.min(self.lines.len());
        for line in &mut self.lines[range.start.min(end)..end] {
            line.clear();
        }
    }

    /// Join all lines into source text.
    pub fn finish(self) -> String {
        self.lines.join("\n")
    }
}

impl Default for EmissionBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consecutive_text_is_one_statement() {
        let mut buf = EmissionBuffer::new();
        buf.buffer_text("<p>");
        buf.buffer_text("a");
        buf.buffer_text("</p>");
        assert_eq!(buf.lines(), &["  jade_buf.add(\"<p>a</p>\")".to_string()]);
    }

    #[test]
    fn test_text_and_expressions_are_concatenated() {
        let mut buf = EmissionBuffer::new();
        buf.buffer_text("Hello ");
        buf.buffer_expr("name");
        buf.buffer_expr("suffix");
        buf.buffer_text("!");
        assert_eq!(
            buf.lines(),
            &["  jade_buf.add(\"Hello \" & $(name) & $(suffix) & \"!\")".to_string()]
        );
    }

    #[test]
    fn test_pushed_line_breaks_the_chain() {
        let mut buf = EmissionBuffer::new();
        buf.buffer_text("a");
        buf.push_line("if truthiness(x):");
        buf.indent();
        buf.buffer_text("b");
        buf.dedent();
        buf.buffer_text("c");
        assert_eq!(
            buf.finish(),
            "  jade_buf.add(\"a\")\n  if truthiness(x):\n    jade_buf.add(\"b\")\n  jade_buf.add(\"c\")"
        );
    }

    #[test]
    fn test_literal_escaping() {
        let mut buf = EmissionBuffer::new();
        buf.buffer_text("say \"hi\"\n\\");
        assert_eq!(buf.lines()[0], "  jade_buf.add(\"say \\\"hi\\\"\\n\\\\\")");
    }

    #[test]
    fn test_blank_keeps_indices() {
        let mut buf = EmissionBuffer::new();
        buf.push_line("a");
        buf.push_line("b");
        buf.push_line("c");
        buf.blank(1..2);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.finish(), "  a\n\n  c");
    }

    #[test]
    fn test_empty_text_is_ignored() {
        let mut buf = EmissionBuffer::new();
        buf.buffer_text("");
        assert!(buf.is_empty());
    }
}
