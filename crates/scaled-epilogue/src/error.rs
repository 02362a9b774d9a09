//! Error types for epilogue configuration and argument building.

use crate::types::ElementType;
use thiserror::Error;

/// Errors that can occur while composing or launching an epilogue.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EpilogueError {
    /// The expression tree or its element types are malformed.
    #[error("Invalid epilogue configuration: {0}")]
    InvalidConfiguration(String),

    /// A required operand was absent.
    #[error("Missing required operand: {0}")]
    MissingOperand(&'static str),

    /// An operand was supplied to a variant that does not consume it.
    #[error("Operand {0} is not used by the {1} epilogue")]
    UnexpectedOperand(&'static str, &'static str),

    /// A vector-only operand was supplied as a single scalar.
    #[error("Operand {0} must be a per-channel vector, got a single scalar for {1} channels")]
    ScalarNotAllowed(&'static str, usize),

    /// Operand element type does not match its descriptor.
    #[error("Operand {operand}: expected {expected} elements, got {actual}")]
    ElementTypeMismatch {
        operand: &'static str,
        expected: ElementType,
        actual: ElementType,
    },

    /// Operand or tile length does not cover the required extent.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Argument block does not mirror the expression tree.
    #[error("Argument block does not match the expression tree: {0}")]
    ArgumentShape(String),

    /// The process-wide epilogue cache lock was poisoned.
    #[error("Epilogue cache is poisoned")]
    CachePoisoned,
}

/// Result type for epilogue operations.
pub type Result<T> = std::result::Result<T, EpilogueError>;
