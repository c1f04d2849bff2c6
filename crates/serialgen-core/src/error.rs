//! Error types for serializer generation
//!
//! Every variant is fatal for the owner type being generated. Nothing is
//! retried and no partial artifact is committed once one of these surfaces.

use thiserror::Error;

/// Result type alias for generation operations
pub type Result<T> = std::result::Result<T, GenerateError>;

/// Main error type for the generation pipeline
#[derive(Error, Debug)]
pub enum GenerateError {
    /// A root or reachable type is not known to the type index
    #[error("Type not found: {name}")]
    TypeNotFound { name: String },

    /// One of the owner's declared roots failed to resolve
    #[error("Unable to resolve root type {root}")]
    UnresolvedRoot {
        root: String,
        #[source]
        source: Box<GenerateError>,
    },

    /// The owner type carries no `SerialTypes` annotation
    #[error("No SerialTypes annotation on serializer type: {owner}")]
    MissingConfiguration { owner: String },

    /// A reachable type violates the serializability rules
    #[error("Type {type_name} cannot be serialized ({reason}); reached via {via}")]
    Closure {
        type_name: String,
        reason: String,
        via: String,
    },

    /// A closure member has no field order table
    #[error("No field order computed for closure member {type_name}")]
    MissingOrder { type_name: String },

    /// The same type was ordered differently by the two directions
    #[error("Field order for {type_name} differs between directions")]
    ConflictingOrder { type_name: String },

    /// A type reference string could not be parsed
    #[error("Invalid type reference '{input}': {reason}")]
    InvalidTypeRef { input: String, reason: String },

    /// The code sink failed to render the unit
    #[error("Emission failed: {0}")]
    EmissionFailed(#[from] EmissionError),

    /// Committing an artifact failed
    #[error("Failed to commit {name}: {source}")]
    Commit {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenerateError {
    pub fn type_not_found(name: impl Into<String>) -> Self {
        GenerateError::TypeNotFound { name: name.into() }
    }

    /// The innermost unresolvable name, looking through `UnresolvedRoot`.
    pub fn missing_type_name(&self) -> Option<&str> {
        match self {
            GenerateError::TypeNotFound { name } => Some(name),
            GenerateError::UnresolvedRoot { source, .. } => source.missing_type_name(),
            _ => None,
        }
    }
}

/// Error reported by a [`CodeSink`](crate::emit::CodeSink)
#[derive(Error, Debug)]
#[error("{message}")]
pub struct EmissionError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl EmissionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
