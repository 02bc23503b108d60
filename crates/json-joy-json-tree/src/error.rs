use json_joy_json_text::{JsonError, PathSyntaxError};
use thiserror::Error;

use crate::node::NodeKind;

/// Structural failures of document operations, plus the token-level errors
/// raised while reading or writing through the adapters.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Can not add property {name} to object: property with the same name already exists. Path '{path}'.")]
    DuplicateProperty { name: String, path: String },
    #[error("Accessed {container} values with invalid key value: {key}. {expected} expected.")]
    InvalidKeyType {
        container: NodeKind,
        key: String,
        expected: &'static str,
    },
    #[error("Can not add {child} to {container}.")]
    IncompatibleChild { container: NodeKind, child: NodeKind },
    #[error("Index {index} is out of range for {container} with {len} children.")]
    IndexOutOfRange {
        container: NodeKind,
        index: usize,
        len: usize,
    },
    #[error("node handle is stale or belongs to another document")]
    StaleNode,
    #[error("{0} is still attached to a container.")]
    Attached(NodeKind),
    #[error("{0} has no parent container.")]
    Detached(NodeKind),
    #[error("A property must always hold exactly one value; replace the value instead of removing it.")]
    PropertyValueRemoval,
    #[error("Expected a {expected} node but found {found}.")]
    WrongKind { expected: &'static str, found: NodeKind },
    #[error("Can not merge {source_kind} into {target_kind}.")]
    MergeKindMismatch {
        target_kind: NodeKind,
        source_kind: NodeKind,
    },
    #[error(transparent)]
    InvalidPath(#[from] PathSyntaxError),
    #[error("{message} Path '{path}'.")]
    PathNotFound { message: String, path: String },
    #[error("Error reading a node from the token source: {0}")]
    EmptySource(String),
    #[error(transparent)]
    Json(JsonError),
}

pub type TreeResult<T> = Result<T, TreeError>;

impl From<JsonError> for TreeError {
    fn from(err: JsonError) -> Self {
        match err {
            JsonError::Adapter(inner) => match inner.downcast::<TreeError>() {
                Ok(tree) => *tree,
                Err(other) => TreeError::Json(JsonError::Adapter(other)),
            },
            other => TreeError::Json(other),
        }
    }
}

/// Structural failures travel through the token traits boxed in
/// [`JsonError::Adapter`] and come back out intact.
impl From<TreeError> for JsonError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::Json(inner) => inner,
            other => JsonError::Adapter(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    #[test]
    fn structural_errors_survive_the_token_boundary() {
        let err = TreeError::IncompatibleChild {
            container: NodeKind::Object,
            child: NodeKind::Value,
        };
        let json: JsonError = err.into();
        assert!(matches!(json, JsonError::Adapter(_)));
        let back: TreeError = json.into();
        assert!(matches!(
            back,
            TreeError::IncompatibleChild {
                container: NodeKind::Object,
                child: NodeKind::Value
            }
        ));
    }

    #[test]
    fn duplicate_property_message() {
        let err = TreeError::DuplicateProperty {
            name: "a".into(),
            path: "".into(),
        };
        assert_eq!(
            err.to_string(),
            "Can not add property a to object: property with the same name already exists. Path ''."
        );
    }
}
