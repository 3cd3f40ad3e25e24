use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;

use hashbrown::HashMap;

use crate::entity::{EntityKey, EntityKind};
use crate::persist::{Persist, PersistType};
use crate::scene::Scene;

// -----------------------------------------------------------------------------
// TypeKey

/// Stable name of a persistable type.
///
/// This is what encoded data stores in its type-descriptor table, so it
/// must not change between program versions.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(Cow<'static, str>);

impl TypeKey {
    #[inline]
    pub const fn new(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TypeKey {
    #[inline]
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

impl core::borrow::Borrow<str> for TypeKey {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// -----------------------------------------------------------------------------
// TypeEntry

/// Factory for one persistable type.
#[derive(Clone)]
pub struct TypeEntry {
    pub key: TypeKey,
    pub kind: EntityKind,
    /// Name of freshly instantiated nodes.
    pub name: &'static str,
    pub create: fn() -> Box<dyn Persist>,
    /// Runs right after instantiation, before any field is restored.
    ///
    /// Lets a type materialize through an alternate path, e.g. by
    /// building its non-persisted children.
    pub setup: Option<fn(&mut Scene, EntityKey)>,
}

impl TypeEntry {
    pub fn of<T: PersistType>() -> Self {
        Self {
            key: T::TYPE_KEY,
            kind: T::KIND,
            name: T::NAME,
            create: || -> Box<dyn Persist> { Box::new(T::default()) },
            setup: None,
        }
    }

    #[inline]
    pub fn with_setup(mut self, setup: fn(&mut Scene, EntityKey)) -> Self {
        self.setup = Some(setup);
        self
    }
}

impl fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEntry")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("setup", &self.setup.is_some())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// TypeRegistry

/// Maps [`TypeKey`]s to the factories that instantiate them.
///
/// Populated once at startup, either explicitly with
/// [`register`](Self::register) or with [`auto_register`](Self::auto_register).
///
/// # Example
///
/// ```
/// # use vc_scene::{EntityKind, FieldError, FieldList, Persist, PersistType, TypeKey, TypeRegistry, Value};
/// #[derive(Default)]
/// struct Marker;
///
/// impl Persist for Marker {
///     fn fields(&self, _: FieldList) -> &'static [&'static str] { &[] }
///     fn get(&self, _: &str) -> Option<Value> { None }
///     fn set(&mut self, field: &str, _: Value) -> Result<(), FieldError> {
///         Err(FieldError::unknown(field))
///     }
/// }
///
/// impl PersistType for Marker {
///     const TYPE_KEY: TypeKey = TypeKey::new("demo::Marker");
///     const KIND: EntityKind = EntityKind::Node;
///     const NAME: &'static str = "Marker";
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.register::<Marker>();
/// assert!(registry.contains("demo::Marker"));
/// assert_eq!(registry.get("demo::Marker").unwrap().name, "Marker");
/// ```
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    entries: HashMap<TypeKey, TypeEntry>,
}

impl TypeRegistry {
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registers `T` if its key is not taken yet. Returns `true` on insertion.
    pub fn register<T: PersistType>(&mut self) -> bool {
        if self.entries.contains_key(T::TYPE_KEY.as_str()) {
            return false;
        }
        self.entries.insert(T::TYPE_KEY, TypeEntry::of::<T>());
        true
    }

    /// Inserts or **overwrites** an entry.
    pub fn insert(&mut self, entry: TypeEntry) -> Option<TypeEntry> {
        self.entries.insert(entry.key.clone(), entry)
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&TypeEntry> {
        self.entries.get(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &TypeEntry> {
        self.entries.values()
    }

    /// Registers every type declared with [`auto_register!`](crate::auto_register).
    ///
    /// Returns `false` when the `auto_register` feature is disabled, in
    /// which case nothing is registered.
    pub fn auto_register(&mut self) -> bool {
        #[cfg(feature = "auto_register")]
        {
            for item in inventory::iter::<AutoRegister> {
                (item.0)(self);
            }
            true
        }
        #[cfg(not(feature = "auto_register"))]
        {
            false
        }
    }
}

// -----------------------------------------------------------------------------
// AutoRegister

#[doc(hidden)]
pub struct AutoRegister(pub fn(&mut TypeRegistry));

#[cfg(feature = "auto_register")]
inventory::collect!(AutoRegister);

/// Declares types to be picked up by [`TypeRegistry::auto_register`].
///
/// Expands to nothing when the `auto_register` feature is disabled.
#[macro_export]
#[cfg(feature = "auto_register")]
macro_rules! auto_register {
    ($($ty:ty),+ $(,)?) => {
        $(
            $crate::__macro_exports::inventory::submit! {
                $crate::__macro_exports::AutoRegister(
                    <$ty as $crate::PersistType>::register_into
                )
            }
        )+
    };
}

#[macro_export]
#[cfg(not(feature = "auto_register"))]
macro_rules! auto_register {
    ($($ty:ty),+ $(,)?) => {};
}
