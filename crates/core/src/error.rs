use thiserror::Error;

use crate::attributes::{AttributeDomain, AttributeError, AttributeType};
use crate::mesh::MeshError;

pub type Result<T> = std::result::Result<T, CookError>;

/// Hard failures that abort a cook. Benign cases (empty patterns,
/// degenerate partitions, unmatched ids) never surface here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CookError {
    #[error("{0}")]
    MissingInput(String),

    #[error("Input {input} has no {domain:?} attribute '{name}'")]
    MissingAttribute {
        name: String,
        domain: AttributeDomain,
        input: usize,
    },

    #[error("Attribute '{name}' must be {expected}, found {actual}")]
    WrongAttributeType {
        name: String,
        expected: AttributeType,
        actual: AttributeType,
    },

    #[error("Bind points repeat the key '{0}'")]
    DuplicateBindKey(String),

    #[error("Invalid pattern token '{0}'")]
    InvalidPattern(String),

    #[error("Input {input} is malformed: {source}")]
    InvalidMesh {
        input: usize,
        #[source]
        source: MeshError,
    },

    #[error("Attribute error on '{name}': {source}")]
    Attribute {
        name: String,
        #[source]
        source: AttributeError,
    },
}

impl CookError {
    pub fn attribute(name: impl Into<String>, source: AttributeError) -> Self {
        CookError::Attribute {
            name: name.into(),
            source,
        }
    }
}
