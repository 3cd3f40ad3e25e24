use core::fmt;

// -----------------------------------------------------------------------------
// EntityKey

slotmap::new_key_type! {
    /// Live identity of an entity inside a [`Scene`](crate::Scene).
    ///
    /// Keys are generational: once an entity is freed its key never
    /// resolves again, even if the slot is reused.
    pub struct EntityKey;
}

// -----------------------------------------------------------------------------
// EntityKind

/// Whether an entity may take part in the scene hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Has a name, may have a parent and children.
    Node,
    /// Never attached; only reachable through another entity's fields.
    Object,
}

// -----------------------------------------------------------------------------
// PersistMode

/// How an entity takes part in save and load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PersistMode {
    /// Invisible to the save engine, together with its whole subtree.
    #[default]
    NotPersisted,
    /// Kept alive across loads and located again by its path under the root.
    Stable,
    /// Destroyed and recreated from its type on every load.
    Rebuildable,
}

impl PersistMode {
    #[inline]
    pub const fn is_persisted(self) -> bool {
        !matches!(self, PersistMode::NotPersisted)
    }
}

impl fmt::Display for PersistMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PersistMode::NotPersisted => "not-persisted",
            PersistMode::Stable => "stable",
            PersistMode::Rebuildable => "rebuildable",
        })
    }
}

// -----------------------------------------------------------------------------
// WeakRef

/// A handle that does not keep its target alive.
///
/// The target is resolved through [`SceneAccess::is_alive`]; a handle
/// created with [`WeakRef::dead`] never resolves.
///
/// [`SceneAccess::is_alive`]: crate::SceneAccess::is_alive
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WeakRef(EntityKey);

impl WeakRef {
    #[inline]
    pub const fn new(target: EntityKey) -> Self {
        Self(target)
    }

    /// A weak handle without a target.
    #[inline]
    pub fn dead() -> Self {
        Self(EntityKey::default())
    }

    /// The key this handle was created from, alive or not.
    #[inline]
    pub const fn key(self) -> EntityKey {
        self.0
    }
}

impl fmt::Debug for WeakRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Weak({:?})", self.0)
    }
}

impl From<EntityKey> for WeakRef {
    #[inline]
    fn from(value: EntityKey) -> Self {
        Self(value)
    }
}
