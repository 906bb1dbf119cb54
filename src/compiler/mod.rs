//! Template tree to Nim compiler
//!
//! A [`Compiler`] walks the tree once, depth first, pushing Nim lines into
//! an [`EmissionBuffer`]. Output text goes through two primitives:
//!
//! - literal text, buffered as-is;
//! - expressions, folded into literal text when the constant evaluator can
//!   compute them and buffered as `$(expr)` otherwise.
//!
//! After the walk, definitions of mixins that are never called are blanked
//! and the lines are joined:
//!
//! ```text
//! Node ──▶ visit ──▶ EmissionBuffer ──▶ prune dead mixins ──▶ Nim source
//!            │
//!            ├── constant evaluator (fold literal expressions)
//!            ├── translate           (template syntax → Nim syntax)
//!            └── MixinRegistry       (definition ranges, call sites)
//! ```
//!
//! A compiler is single-use: [`Compiler::compile`] consumes it.

mod attrs;
pub mod buffer;
pub mod doctype;
pub mod interpolate;
pub mod mixins;
pub mod options;

use jadenim_ast::{
    Block, BlockComment, Case, Code, Comment, Doctype, Each, Filter, Location, Mixin, Node, Tag,
    Text, When,
};

use crate::constant::{self, Value};
use crate::filters::{FilterOptions, FilterRegistry};
use crate::runtime;
use crate::translate::{normalize_quotes, translate_statement, translate_tag_name};
use crate::utils::error::{
    CompileError, CompileOutput, CompileResult, CompileWarning, WarningKind,
};

pub use buffer::EmissionBuffer;
pub use doctype::DocumentMode;
pub use interpolate::Segment;
pub use mixins::{mixin_identifier, MixinRegistry};
pub use options::CompileOptions;

/// Compilation state for one template tree
pub struct Compiler<'a> {
    options: CompileOptions,
    filters: &'a dyn FilterRegistry,
    buf: EmissionBuffer,
    mode: DocumentMode,
    has_compiled_doctype: bool,
    has_compiled_tag: bool,
    mixins: MixinRegistry,
    warnings: Vec<CompileWarning>,
}

impl<'a> Compiler<'a> {
    pub fn new(options: CompileOptions, filters: &'a dyn FilterRegistry) -> Self {
        let mut mode = DocumentMode::new();
        if let Some(doctype) = &options.doctype {
            mode.set_doctype(doctype);
        }
        Compiler {
            options,
            filters,
            buf: EmissionBuffer::new(),
            mode,
            has_compiled_doctype: false,
            has_compiled_tag: false,
            mixins: MixinRegistry::new(),
            warnings: Vec::new(),
        }
    }

    /// Compile `root` into the body of a render procedure.
    pub fn compile(mut self, root: &Node) -> CompileResult<CompileOutput> {
        self.visit(root)?;

        let dead = self.mixins.dead_ranges();
        let blanked: usize = dead.iter().map(|range| range.len()).sum();
        for range in dead {
            self.buf.blank(range);
        }
        log::debug!(
            "emitted {} lines ({} blanked as unused mixins, {} warnings)",
            self.buf.len(),
            blanked,
            self.warnings.len()
        );

        Ok(CompileOutput::with_warnings(self.buf.finish(), self.warnings))
    }

    // =========================================================================
    // Shared helpers
    // =========================================================================

    fn filename(&self) -> Option<&str> {
        self.options.filename.as_deref()
    }

    fn structural(&self, message: impl Into<String>, location: &Location) -> CompileError {
        CompileError::structural(message).at(location, self.filename())
    }

    fn warn(&mut self, kind: WarningKind, location: &Location) {
        let warning = CompileWarning::unported(kind, location.line);
        match &self.options.filename {
            Some(file) => log::warn!("{}: {}", file, warning),
            None => log::warn!("{}", warning),
        }
        self.warnings.push(warning);
    }

    /// The constant value of a source expression, unless folding is off.
    fn fold(&self, src: &str) -> Option<Value> {
        if !self.options.fold_constants {
            return None;
        }
        constant::to_constant(src)
    }

    /// Buffer the value of a source expression.
    ///
    /// `translated` is the Nim form of `src`, used when the value is only
    /// known at render time. Absent values render as nothing.
    fn emit_expression(&mut self, src: &str, translated: &str, escape: bool) {
        if let Some(value) = self.fold(src) {
            let text = value.render_text();
            if escape {
                self.buf.buffer_text(&runtime::escape_str(&text));
            } else {
                self.buf.buffer_text(&text);
            }
            return;
        }

        if escape {
            self.buf.buffer_expr(&format!("jade.escape($({}))", translated));
        } else {
            self.buf.buffer_expr(translated);
        }
    }

    /// Buffer text containing `#{...}` / `!{...}` expressions.
    fn buffer_interpolated(&mut self, text: &str, location: &Location) -> CompileResult<()> {
        let segments =
            interpolate::split(text).map_err(|message| self.structural(message, location))?;
        for segment in segments {
            match segment {
                Segment::Text(text) => self.buf.buffer_text(text),
                Segment::Expr { src, escape } => {
                    let src = src.trim();
                    self.emit_expression(src, &normalize_quotes(src), escape);
                }
            }
        }
        Ok(())
    }

    /// Visit `block` one level deeper. An empty body becomes `discard`.
    fn visit_body(&mut self, block: Option<&Block>) -> CompileResult<()> {
        self.buf.indent();
        let start = self.buf.len();
        if let Some(block) = block {
            self.visit_block(block)?;
        }
        if self.buf.len() == start {
            self.buf.push_line("discard");
        }
        self.buf.dedent();
        Ok(())
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn visit(&mut self, node: &Node) -> CompileResult<()> {
        log::trace!("visit {}", node.kind());
        match node {
            Node::Block(block) => self.visit_block(block),
            Node::Tag(tag) => self.visit_tag(tag),
            Node::Text(text) => self.visit_text(text),
            Node::Code(code) => self.visit_code(code),
            Node::Each(each) => self.visit_each(each),
            Node::Case(case) => self.visit_case(case),
            Node::When(when) => self.visit_when(when, vec![normalize_quotes(&when.expr)]),
            Node::Mixin(mixin) => self.visit_mixin(mixin),
            Node::MixinBlock(_) => {
                self.buf.push_line("jade_block");
                Ok(())
            }
            Node::Doctype(doctype) => {
                self.visit_doctype(Some(doctype));
                Ok(())
            }
            Node::Comment(comment) => {
                self.visit_comment(comment);
                Ok(())
            }
            Node::BlockComment(comment) => self.visit_block_comment(comment),
            Node::Filter(filter) => self.visit_filter(filter),
            Node::Literal(literal) => {
                self.buf.buffer_text(&literal.str);
                Ok(())
            }
        }
    }

    /// Visit children in order. Adjacent text nodes are separated by a
    /// newline.
    fn visit_block(&mut self, block: &Block) -> CompileResult<()> {
        for (i, node) in block.nodes.iter().enumerate() {
            self.visit(node)?;
            if node.is_text() && block.nodes.get(i + 1).is_some_and(Node::is_text) {
                self.buf.buffer_text("\n");
            }
        }
        Ok(())
    }

    // =========================================================================
    // Document structure
    // =========================================================================

    /// Buffer the doctype. Without a node (first tag is `html`), the
    /// default doctype is selected unless one was configured.
    fn visit_doctype(&mut self, doctype: Option<&Doctype>) {
        let val = doctype.and_then(|d| d.val.as_deref());
        if val.is_some() || self.mode.doctype.is_none() {
            self.mode.set_doctype(val.unwrap_or("default"));
        }
        if let Some(text) = self.mode.doctype.clone() {
            self.buf.buffer_text(&text);
        }
        self.has_compiled_doctype = true;
    }

    fn visit_tag(&mut self, tag: &Tag) -> CompileResult<()> {
        if !self.has_compiled_tag {
            if !self.has_compiled_doctype && tag.name == "html" {
                self.visit_doctype(None);
            }
            self.has_compiled_tag = true;
        }

        let self_closing = tag.self_closing || self.mode.is_self_closing(&tag.name);
        if self_closing && has_content(&tag.block) {
            return Err(self.structural(
                format!("{} is self closing and should not have content.", tag.name),
                &tag.location,
            ));
        }

        self.buf.buffer_text("<");
        self.buffer_tag_name(tag);
        self.visit_attributes(&tag.attributes, &tag.location);

        if self_closing {
            self.buf.buffer_text(if self.mode.terse { ">" } else { "/>" });
            return Ok(());
        }

        self.buf.buffer_text(">");
        if let Some(code) = &tag.code {
            self.visit_code(code)?;
        }
        self.visit_block(&tag.block)?;
        self.buf.buffer_text("</");
        self.buffer_tag_name(tag);
        self.buf.buffer_text(">");
        Ok(())
    }

    fn buffer_tag_name(&mut self, tag: &Tag) {
        if tag.buffer {
            self.emit_expression(&tag.name, &translate_tag_name(&tag.name), false);
        } else {
            self.buf.buffer_text(&tag.name);
        }
    }

    fn visit_text(&mut self, text: &Text) -> CompileResult<()> {
        self.buffer_interpolated(&text.val, &text.location)
    }

    fn visit_comment(&mut self, comment: &Comment) {
        if comment.buffer {
            self.buf.buffer_text(&format!("<!--{}-->", comment.val));
        }
    }

    fn visit_block_comment(&mut self, comment: &BlockComment) -> CompileResult<()> {
        if !comment.buffer {
            return Ok(());
        }
        self.buf.buffer_text(&format!("<!--{}", comment.val));
        self.visit_block(&comment.block)?;
        self.buf.buffer_text("-->");
        Ok(())
    }

    fn visit_filter(&mut self, filter: &Filter) -> CompileResult<()> {
        let text = filter
            .block
            .nodes
            .iter()
            .map(|node| match node {
                Node::Text(text) => text.val.as_str(),
                _ => "",
            })
            .collect::<Vec<_>>()
            .join("\n");

        let mut options = FilterOptions::new();
        for attr in &filter.attrs {
            let value = constant::to_constant(&attr.val)
                .map(|value| value.to_js_string())
                .unwrap_or_else(|| attr.val.clone());
            options.insert(attr.name.clone(), value);
        }
        if let Some(file) = self.filename() {
            options.insert("filename".to_string(), file.to_string());
        }

        let output = self
            .filters
            .apply(&filter.name, &text, &options)
            .map_err(|err| {
                CompileError::Filter {
                    name: filter.name.clone(),
                    message: err.to_string(),
                    line: None,
                    filename: None,
                }
                .at(&filter.location, self.filename())
            })?;
        self.buffer_interpolated(&output, &filter.location)
    }

    // =========================================================================
    // Code and control flow
    // =========================================================================

    fn visit_code(&mut self, code: &Code) -> CompileResult<()> {
        let val = translate_statement(&code.val);

        if code.buffer {
            let src = code.val.trim().trim_end_matches(';').trim_end();
            self.emit_expression(src, &val, code.escape);
        } else {
            self.buf.push_line(&val);
        }

        let Some(block) = &code.block else {
            return Ok(());
        };
        if code.buffer {
            self.buf.indent();
            self.visit_block(block)?;
            self.buf.dedent();
        } else {
            self.visit_body(Some(block))?;
            self.buf.push_blank();
        }
        Ok(())
    }

    fn visit_each(&mut self, each: &Each) -> CompileResult<()> {
        let obj = normalize_quotes(&each.obj);
        self.buf.push_line(&format!("# iterate {}", obj));

        if each.alternative.is_some() {
            self.buf.push_line(&format!("if {}.len > 0:", obj));
            self.buf.indent();
        }

        match each.key_name() {
            Some(key) => self
                .buf
                .push_line(&format!("for {}, {} in {}.pairs():", key, each.val, obj)),
            None => self.buf.push_line(&format!("for {} in {}:", each.val, obj)),
        }
        self.visit_body(Some(&each.block))?;
        self.buf.push_blank();

        if let Some(alternative) = &each.alternative {
            self.buf.dedent();
            self.buf.push_line("else:");
            self.visit_body(Some(alternative))?;
            self.buf.push_blank();
        }
        Ok(())
    }

    /// `case` with its `when` branches. Consecutive `when`s without a body
    /// fall through into the next branch, so they share its `of` line.
    fn visit_case(&mut self, case: &Case) -> CompileResult<()> {
        self.buf
            .push_line(&format!("case ({})", normalize_quotes(&case.expr)));

        let mut labels = Vec::new();
        let mut has_default = false;
        for node in &case.block.nodes {
            match node {
                Node::When(when) if when.is_default() => {
                    // `else` already covers anything falling through
                    labels.clear();
                    has_default = true;
                    self.visit_when(when, Vec::new())?;
                }
                Node::When(when) => {
                    labels.push(normalize_quotes(&when.expr));
                    if when.block.is_some() {
                        self.visit_when(when, std::mem::take(&mut labels))?;
                    }
                }
                other => self.visit(other)?,
            }
        }

        if !labels.is_empty() {
            self.buf.push_line(&format!("of {}:", labels.join(", ")));
            self.visit_body(None)?;
            self.buf.push_blank();
        }
        if !has_default {
            self.buf.push_line("else: discard");
        }
        Ok(())
    }

    fn visit_when(&mut self, when: &When, labels: Vec<String>) -> CompileResult<()> {
        if when.is_default() {
            self.buf.push_line("else:");
        } else {
            self.buf.push_line(&format!("of {}:", labels.join(", ")));
        }
        self.visit_body(when.block.as_ref())?;
        self.buf.push_blank();
        Ok(())
    }

    // =========================================================================
    // Mixins
    // =========================================================================

    /// The static name of a mixin. `#{expr}` names are accepted only when
    /// `expr` is constant; anything else fails the compile.
    fn mixin_name(&self, mixin: &Mixin) -> CompileResult<String> {
        if !mixin.is_dynamic() {
            return Ok(mixin.name.clone());
        }
        let inner = mixin
            .name
            .strip_prefix("#{")
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(&mixin.name[1..])
            .trim();
        match constant::to_constant(inner) {
            Some(value) if !value.is_nullish() => Ok(value.to_js_string()),
            _ => Err(self.structural(
                format!(
                    "mixin name `{}` is only known at render time; dynamic mixin names are not supported",
                    inner
                ),
                &mixin.location,
            )),
        }
    }

    fn visit_mixin(&mut self, mixin: &Mixin) -> CompileResult<()> {
        if mixin.is_dynamic() {
            self.mixins.mark_dynamic();
        }
        let name = self.mixin_name(mixin)?;
        let ident = mixin_identifier(&name);
        let args = mixin.args.as_deref().unwrap_or("").trim();

        if !mixin.call {
            return self.visit_mixin_definition(mixin, &name, &ident, args);
        }

        self.mixins.mark_used(&name);
        if !mixin.attributes.is_empty() {
            let mut placeholder =
                self.attributes_mapping(&mixin.attributes.attrs, &mixin.location);
            if !mixin.attributes.attribute_blocks.is_empty() {
                placeholder = format!(
                    "jade.merge([{}, {}])",
                    placeholder,
                    mixin.attributes.attribute_blocks.join(", ")
                );
            }
            self.warn(WarningKind::UnportedMixinAttributes, &mixin.location);
            self.buf.push_line(&format!(
                "# FIXME unported mixin attributes: {}",
                placeholder
            ));
        }

        self.buf
            .push_line(&format!("{}({}):", ident, normalize_quotes(args)));
        self.visit_body(mixin.block.as_ref())?;
        if mixin.block.is_some() || !mixin.attributes.is_empty() {
            self.buf.push_blank();
        }
        Ok(())
    }

    fn visit_mixin_definition(
        &mut self,
        mixin: &Mixin,
        name: &str,
        ident: &str,
        args: &str,
    ) -> CompileResult<()> {
        let start = self.buf.len();
        let params = if args.is_empty() {
            String::new()
        } else {
            format!("{}: string, ", args)
        };
        self.buf.push_line(&format!(
            "template {}({}jade_block: stmt): stmt {{.dirty.}} =",
            ident, params
        ));
        self.visit_body(mixin.block.as_ref())?;
        self.buf.push_blank();
        self.mixins.record_definition(name, start..self.buf.len());
        Ok(())
    }
}

/// Whether a block has anything but whitespace text.
fn has_content(block: &Block) -> bool {
    block.nodes.iter().any(|node| match node {
        Node::Text(text) => !text.val.trim().is_empty(),
        _ => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::NoFilters;
    use jadenim_ast::Attribute;

    fn compile(root: Node) -> CompileResult<CompileOutput> {
        Compiler::new(CompileOptions::default(), &NoFilters).compile(&root)
    }

    fn lines(output: &CompileOutput) -> Vec<&str> {
        output.source.split('\n').collect()
    }

    #[test]
    fn test_adjacent_text_gets_newline() {
        let out = compile(Node::block(vec![Node::text("a"), Node::text("b")])).unwrap();
        assert_eq!(out.source, "  jade_buf.add(\"a\\nb\")");
    }

    #[test]
    fn test_unbuffered_code_with_block() {
        let mut code = match Node::code("if (user)", false, false) {
            Node::Code(code) => code,
            _ => unreachable!(),
        };
        code.block = Some(Block::new(vec![Node::text("hi")]));
        let out = compile(Node::block(vec![Node::Code(code)])).unwrap();
        assert_eq!(
            lines(&out),
            vec!["  if truthiness(user):", "    jade_buf.add(\"hi\")", ""]
        );
    }

    #[test]
    fn test_empty_code_block_gets_discard() {
        let mut code = match Node::code("else", false, false) {
            Node::Code(code) => code,
            _ => unreachable!(),
        };
        code.block = Some(Block::default());
        let out = compile(Node::block(vec![Node::Code(code)])).unwrap();
        assert_eq!(lines(&out), vec!["  else:", "    discard", ""]);
    }

    #[test]
    fn test_buffered_code_folds_constants() {
        let out = compile(Node::block(vec![
            Node::code("'<b>' + 1", true, true),
            Node::code("name", true, true),
            Node::code("html", true, false),
        ]))
        .unwrap();
        assert_eq!(
            out.source,
            "  jade_buf.add(\"&lt;b&gt;1\" & $(jade.escape($(name))) & $(html))"
        );
    }

    #[test]
    fn test_self_closing_with_whitespace_only() {
        let tag = Tag::new("br").with_children(vec![Node::text("   ")]);
        let out = compile(Node::Tag(tag)).unwrap();
        assert_eq!(out.source, "  jade_buf.add(\"<br/>\")");
    }

    #[test]
    fn test_self_closing_with_content_fails() {
        let mut tag = Tag::new("img").with_children(vec![Node::text("x")]);
        tag.location = Location::at_line(4);
        let err = compile(Node::Tag(tag)).unwrap_err();
        assert_eq!(err.line(), Some(4));
        assert!(err
            .to_string()
            .starts_with("img is self closing and should not have content."));
    }

    #[test]
    fn test_buffered_tag_name() {
        let mut tag = Tag::new("level ? 'h1' : 'h2'");
        tag.buffer = true;
        let out = compile(Node::Tag(tag)).unwrap();
        assert_eq!(
            out.source,
            "  jade_buf.add(\"<\" & $((if level :  \"h1\"  else:  \"h2\")) & \"></\" & $((if level :  \"h1\"  else:  \"h2\")) & \">\")"
        );
    }

    #[test]
    fn test_dynamic_attribute() {
        let tag = Tag::new("a").with_attr(Attribute::new("href", "url", true));
        let out = compile(Node::Tag(tag)).unwrap();
        assert_eq!(
            out.source,
            "  jade_buf.add(\"<a\" & $(jade.attr(\"href\", url, true, false)) & \"></a>\")"
        );
    }

    #[test]
    fn test_unterminated_interpolation() {
        let err = compile(Node::text("hello #{name")).unwrap_err();
        assert!(matches!(err, CompileError::Structural { .. }));
    }
}
