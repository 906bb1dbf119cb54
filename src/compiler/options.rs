// =============================================================================
// Compile Options
// =============================================================================

/// Options for compiling a template tree to Nim
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Initial doctype name (`html`, `xml`, `strict`, ...) or literal
    /// Default: none, the template's own `doctype` decides
    pub doctype: Option<String>,

    /// Source path reported in diagnostics and handed to filters
    pub filename: Option<String>,

    /// Receiver type of the generated `render` procedure
    /// Only used by the module wrapper
    pub typename: Option<String>,

    /// Fold constant expressions into literal text
    /// Default: true
    pub fold_constants: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            doctype: None,
            filename: None,
            typename: None,
            fold_constants: true,
        }
    }
}

impl CompileOptions {
    /// Create new options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doctype(mut self, doctype: impl Into<String>) -> Self {
        self.doctype = Some(doctype.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_typename(mut self, typename: impl Into<String>) -> Self {
        self.typename = Some(typename.into());
        self
    }

    /// Emit every expression as a runtime call. Rendered output is the
    /// same as with folding, only the generated code differs.
    pub fn without_folding(mut self) -> Self {
        self.fold_constants = false;
        self
    }
}
