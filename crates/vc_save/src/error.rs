use alloc::string::String;
use core::fmt;

use thiserror::Error;
use vc_scene::{EntityKey, FieldList, NodePath, SceneError, TypeKey, ValueError, ValueKind};

// -----------------------------------------------------------------------------
// LoadMode

/// Whether a load rebuilds into a caller-supplied root or builds a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// The root is an existing stable entity supplied by the caller.
    Attached,
    /// The root is itself rebuildable and returned to the caller.
    Detached,
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadMode::Attached => "attached",
            LoadMode::Detached => "detached",
        })
    }
}

// -----------------------------------------------------------------------------
// SaveError

/// A save was aborted. No partial artifact is ever returned.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SaveError {
    #[error("entity {0:?} is not persistable")]
    NotPersistable(EntityKey),

    #[error("reference to entity {0:?}, which no longer exists")]
    DeadReference(EntityKey),

    #[error("entity {0:?} belongs to the hierarchy but is not under the saved root")]
    OutsideTree(EntityKey),

    #[error("stable entity {entity:?} has rebuildable parent {parent:?}")]
    StableUnderRebuildable { entity: EntityKey, parent: EntityKey },

    #[error("rebuildable entity {0:?} has no type descriptor")]
    MissingDescriptor(EntityKey),

    #[error("entity {entity:?} declares `{field}` in {list} but does not provide it")]
    MissingField {
        entity: EntityKey,
        list: FieldList,
        field: &'static str,
    },

    #[error("entity reference nested {depth} containers deep")]
    NestedReference { depth: u32 },

    #[error("values of kind {0} cannot be persisted")]
    NonSerializable(ValueKind),

    #[error("too many entries for a 32-bit table")]
    TableOverflow,

    #[error("produced data failed self-check: {0}")]
    Corrupt(LoadError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

// -----------------------------------------------------------------------------
// LoadError

/// A load was aborted. Entities created by it have been freed again.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum LoadError {
    #[error("load requested in {requested} mode, but the data was saved {recorded}")]
    ModeMismatch {
        requested: LoadMode,
        recorded: LoadMode,
    },

    #[error("data declares {declared} entities but holds {records} records")]
    EntityCount { declared: u32, records: usize },

    #[error("the first anchored record is not the root")]
    MissingRoot,

    #[error("entity id {0} is out of range")]
    IdOutOfRange(u64),

    #[error("entity id {0} is recorded twice")]
    DuplicateId(u32),

    #[error("no record for entity id {0}")]
    MissingRecord(u32),

    #[error("invalid code {0}")]
    InvalidCode(u64),

    #[error("value index {0} is out of range")]
    ValueOutOfRange(u32),

    #[error("type descriptor index {0} is out of range")]
    DescriptorOutOfRange(u32),

    #[error("type descriptor `{0}` cannot be loaded")]
    UnknownDescriptor(String),

    #[error("no entity at `{0}` under the root")]
    UnresolvedPath(NodePath),

    #[error("record {0} is stable but the load has no root to locate it from")]
    StableWithoutRoot(u32),

    #[error("record {0} has an attachment that does not match its descriptor")]
    InvalidAttach(u32),

    #[error("entity {entity:?}: record has {recorded} {list} values, type declares {declared}")]
    FieldCount {
        entity: EntityKey,
        list: FieldList,
        recorded: usize,
        declared: usize,
    },

    #[error("record {id} has {recorded} field blocks, expected {expected}")]
    FieldBlocks {
        id: u32,
        recorded: usize,
        expected: usize,
    },

    #[error("record {id}: {list} has {names} field names for {values} values")]
    FieldNames {
        id: u32,
        list: FieldList,
        names: usize,
        values: usize,
    },

    #[error("entity {entity:?}: {list}[{index}] was saved as `{recorded}`, type declares `{declared}`")]
    FieldRenamed {
        entity: EntityKey,
        list: FieldList,
        index: usize,
        recorded: String,
        declared: &'static str,
    },

    #[error("array without element-type trailer")]
    MalformedArray,

    #[error("array element of type {found:?} where {expected} was declared")]
    ElementClass {
        expected: TypeKey,
        found: Option<TypeKey>,
    },

    #[error(transparent)]
    Element(#[from] ValueError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}
