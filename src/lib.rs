//! # jadenim
//!
//! Compiles parsed Jade templates into Nim rendering code.
//!
//! The template parser lives elsewhere; this crate takes its tree (as
//! [`ast::Node`] values or as JSON) and produces Nim statements that append
//! the rendered HTML to a `jade_buf` string.
//!
//! ## Example
//!
//! ```
//! use jadenim::ast::{Attribute, Node, Tag};
//!
//! let tag = Tag::new("p")
//!     .with_attr(Attribute::new("id", "'intro'", true))
//!     .with_children(vec![Node::text("Hello #{name}")]);
//! let nim = jadenim::compile(&Node::Tag(tag)).unwrap();
//! assert_eq!(
//!     nim,
//!     "  jade_buf.add(\"<p id=\\\"intro\\\">Hello \" & $(jade.escape($(name))) & \"</p>\")"
//! );
//! ```
//!
//! ## Pipeline
//!
//! - [`constant`]: decides which expressions are known at compile time
//! - [`translate`]: rewrites template expressions into Nim syntax
//! - [`compiler`]: walks the tree and emits coalesced append statements
//! - [`runtime`]: compile-time versions of the render helpers
//! - [`filters`]: `:name` block transformations supplied by the caller

pub mod compiler;
pub mod constant;
pub mod filters;
pub mod runtime;
pub mod translate;
pub mod utils;

/// The template tree handed over by the parser
pub use jadenim_ast as ast;

pub use compiler::{CompileOptions, Compiler};
pub use filters::{FilterError, FilterOptions, FilterRegistry, FilterSet, NoFilters};
pub use utils::error::{
    CompileError, CompileOutput, CompileResult, CompileWarning, WarningKind,
};

use ast::Node;

// =============================================================================
// Public API
// =============================================================================

/// Compile a template tree with default options.
///
/// Warnings are logged and dropped; use [`compile_with_options`] to keep
/// them.
pub fn compile(root: &Node) -> CompileResult<String> {
    compile_with_options(root, CompileOptions::default()).map(|output| output.source)
}

/// Compile a template tree. Filter blocks fail as unknown filters.
pub fn compile_with_options(root: &Node, options: CompileOptions) -> CompileResult<CompileOutput> {
    compile_with_filters(root, options, &NoFilters)
}

/// Compile a template tree, applying `:name` blocks through `filters`.
pub fn compile_with_filters(
    root: &Node,
    options: CompileOptions,
    filters: &dyn FilterRegistry,
) -> CompileResult<CompileOutput> {
    Compiler::new(options, filters).compile(root)
}

/// Deserialize a JSON template tree and compile it.
pub fn compile_json(json: &str, options: CompileOptions) -> CompileResult<CompileOutput> {
    let root: Node = serde_json::from_str(json)?;
    compile_with_options(&root, options)
}

/// Compile a template tree into a complete Nim module exporting
/// `render`.
pub fn compile_module(root: &Node, options: CompileOptions) -> CompileResult<CompileOutput> {
    let typename = options.typename.clone();
    let mut output = compile_with_options(root, options)?;
    output.source = wrap_module(&output.source, typename.as_deref());
    Ok(output)
}

/// Wrap a compiled body in the `render` procedure.
pub fn wrap_module(body: &str, typename: Option<&str>) -> String {
    let signature = match typename {
        Some(typename) => format!("proc render*(self: {}): string =", typename),
        None => "proc render*(): string =".to_string(),
    };
    format!(
        "import jade\n\n{}\n  var jade_buf = \"\"\n{}\n  result = jade_buf\n",
        signature, body
    )
}
