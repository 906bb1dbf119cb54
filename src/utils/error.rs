//! Error handling for jadenim compilation
//!
//! This module provides the error type for fatal conditions and the
//! warning type for unported constructs that still compile.

use std::fmt;

use jadenim_ast::Location;

/// Compilation error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Structural error - the tree contains something that cannot be rendered
    Structural {
        message: String,
        line: Option<usize>,
        filename: Option<String>,
    },
    /// A filter collaborator failed
    Filter {
        name: String,
        message: String,
        line: Option<usize>,
        filename: Option<String>,
    },
    /// Invalid input (e.g. a serialized tree that does not deserialize)
    InvalidInput { message: String },
    /// IO error (for file operations)
    IoError { message: String },
}

fn write_origin(
    f: &mut fmt::Formatter<'_>,
    line: &Option<usize>,
    filename: &Option<String>,
) -> fmt::Result {
    match (filename, line) {
        (Some(file), Some(l)) => write!(f, " ({}:{})", file, l),
        (Some(file), None) => write!(f, " ({})", file),
        (None, Some(l)) => write!(f, " (line {})", l),
        (None, None) => Ok(()),
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Structural {
                message,
                line,
                filename,
            } => {
                write!(f, "{}", message)?;
                write_origin(f, line, filename)
            }
            CompileError::Filter {
                name,
                message,
                line,
                filename,
            } => {
                write!(f, "filter '{}' failed: {}", name, message)?;
                write_origin(f, line, filename)
            }
            CompileError::InvalidInput { message } => {
                write!(f, "Invalid input: {}", message)
            }
            CompileError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for CompileError {}

impl From<std::io::Error> for CompileError {
    fn from(err: std::io::Error) -> Self {
        CompileError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CompileError {
    fn from(err: serde_json::Error) -> Self {
        CompileError::InvalidInput {
            message: err.to_string(),
        }
    }
}

/// Result type for compile operations
pub type CompileResult<T> = Result<T, CompileError>;

// Convenience constructors for errors
impl CompileError {
    pub fn structural(message: impl Into<String>) -> Self {
        CompileError::Structural {
            message: message.into(),
            line: None,
            filename: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        CompileError::InvalidInput {
            message: message.into(),
        }
    }

    /// Annotate with the originating node's position. Positions already
    /// recorded are kept; `fallback_file` fills a missing filename.
    pub fn at(mut self, location: &Location, fallback_file: Option<&str>) -> Self {
        let file_from_node = location
            .filename
            .clone()
            .or_else(|| fallback_file.map(str::to_string));
        match &mut self {
            CompileError::Structural { line, filename, .. }
            | CompileError::Filter { line, filename, .. } => {
                if line.is_none() {
                    *line = location.line;
                }
                if filename.is_none() {
                    *filename = file_from_node;
                }
            }
            CompileError::InvalidInput { .. } | CompileError::IoError { .. } => {}
        }
        self
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            CompileError::Structural { line, .. } | CompileError::Filter { line, .. } => *line,
            _ => None,
        }
    }
}

/// Kind of warning generated during compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Class list with runtime-computed members
    UnportedClassJoin,
    /// `&attributes(...)` merged at render time
    UnportedAttributeBlock,
    /// Attributes passed to a mixin call
    UnportedMixinAttributes,
}

impl WarningKind {
    /// The runtime feature name as users know it.
    pub fn feature(&self) -> &'static str {
        match self {
            WarningKind::UnportedClassJoin => "cls",
            WarningKind::UnportedAttributeBlock => "attributes",
            WarningKind::UnportedMixinAttributes => "mixin attributes",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unported {}", self.feature())
    }
}

/// Compilation warnings (non-fatal issues)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileWarning {
    pub kind: WarningKind,
    pub message: String,
    pub line: Option<usize>,
}

impl CompileWarning {
    pub fn unported(kind: WarningKind, line: Option<usize>) -> Self {
        Self {
            kind,
            message: format!(
                "The '{}' feature hasn't been ported to Nim yet; the generated code uses a placeholder",
                kind.feature()
            ),
            line,
        }
    }
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(l) = self.line {
            write!(f, "Warning at line {}: {}", l, self.message)
        } else {
            write!(f, "Warning: {}", self.message)
        }
    }
}

/// Compilation output with optional warnings
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// The generated Nim source
    pub source: String,
    /// Any warnings generated during compilation
    pub warnings: Vec<CompileWarning>,
}

impl CompileOutput {
    pub fn new(source: String) -> Self {
        Self {
            source,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(source: String, warnings: Vec<CompileWarning>) -> Self {
        Self { source, warnings }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_error_display() {
        let err = CompileError::structural("img is self closing and should not have content.");
        assert_eq!(
            err.to_string(),
            "img is self closing and should not have content."
        );
    }

    #[test]
    fn test_error_annotation_keeps_existing_position() {
        let err = CompileError::structural("boom").at(&Location::at_line(3), Some("page.jade"));
        assert_eq!(err.line(), Some(3));
        assert!(err.to_string().contains("page.jade:3"));

        let again = err.at(&Location::at_line(9), Some("other.jade"));
        assert_eq!(again.line(), Some(3));
        assert!(again.to_string().contains("page.jade"));
    }

    #[test]
    fn test_filter_error_display() {
        let err = CompileError::Filter {
            name: "markdown".to_string(),
            message: "unknown filter".to_string(),
            line: Some(4),
            filename: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("markdown"));
        assert!(msg.contains("line 4"));
    }

    #[test]
    fn test_compile_output() {
        let output = CompileOutput::new("  discard".to_string());
        assert!(!output.has_warnings());

        let with_warn = CompileOutput::with_warnings(
            String::new(),
            vec![CompileWarning::unported(WarningKind::UnportedClassJoin, Some(2))],
        );
        assert!(with_warn.has_warnings());
        assert!(with_warn.warnings[0].to_string().contains("'cls'"));
    }
}
