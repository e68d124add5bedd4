//! Error types for the object graph.

use thiserror::Error;

/// Errors raised by [`Object`](crate::Object) capabilities.
///
/// The serializer never propagates these; a failing capability makes it fall
/// through to the next one in its dispatch order.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// The requested attribute or column is not available on the object.
    #[error("Attribute not available: {0}")]
    MissingAttribute(String),

    /// A capability failed for a reason of its own.
    #[error("Capability failed: {0}")]
    Failed(String),

    /// JSON conversion failed.
    #[error("JSON conversion error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ObjectError {
    /// Creates a [`MissingAttribute`](Self::MissingAttribute).
    pub fn missing_attribute(name: impl Into<String>) -> Self {
        Self::MissingAttribute(name.into())
    }

    /// Creates a [`Failed`](Self::Failed).
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Error returned when parsing a [`Decimal`](crate::Decimal) literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecimalError {
    /// The input is empty.
    #[error("empty decimal literal")]
    Empty,

    /// The input is not a finite decimal number.
    #[error("invalid decimal literal: {0:?}")]
    Invalid(String),
}
