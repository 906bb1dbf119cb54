//! Utility modules
//!
//! This module contains utilities and helpers:
//! - Error types and result types
//! - Warnings for constructs that compile to placeholders

pub mod error;

// Re-export commonly used items
pub use error::{
    CompileError, CompileOutput, CompileResult, CompileWarning, WarningKind,
};
