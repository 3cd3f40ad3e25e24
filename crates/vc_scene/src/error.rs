use alloc::string::String;

use thiserror::Error;

use crate::entity::EntityKey;
use crate::value::ValueKind;

// -----------------------------------------------------------------------------
// ValueError

/// A value did not have the expected dynamic type.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("expected a value of kind {expected}, found {found}")]
pub struct ValueError {
    pub expected: ValueKind,
    pub found: ValueKind,
}

impl ValueError {
    #[inline]
    pub const fn new(expected: ValueKind, found: ValueKind) -> Self {
        Self { expected, found }
    }
}

// -----------------------------------------------------------------------------
// FieldError

/// Failure reported by a [`Persist`](crate::Persist) behaviour.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FieldError {
    #[error("no field named `{0}`")]
    Unknown(String),

    #[error("field `{field}`: {source}")]
    Kind { field: String, source: ValueError },
}

impl FieldError {
    #[cold]
    pub fn unknown(field: &str) -> Self {
        FieldError::Unknown(String::from(field))
    }

    #[cold]
    pub fn kind(field: &str, source: ValueError) -> Self {
        FieldError::Kind {
            field: String::from(field),
            source,
        }
    }
}

// -----------------------------------------------------------------------------
// SceneError

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SceneError {
    #[error("entity {0:?} does not exist")]
    NotFound(EntityKey),

    #[error("no type registered under `{0}`")]
    UnknownType(String),

    #[error("entity {0:?} has no persistable behaviour")]
    NoBehaviour(EntityKey),

    #[error("entity {entity:?}: {source}")]
    Field {
        entity: EntityKey,
        source: FieldError,
    },

    #[error("entity {0:?} is an object and cannot join the hierarchy")]
    NotANode(EntityKey),

    #[error("entity {0:?} already has a parent")]
    AlreadyAttached(EntityKey),

    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: EntityKey, child: EntityKey },
}
