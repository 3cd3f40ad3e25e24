use core::any::Any;
use core::fmt;

use crate::entity::{EntityKind, PersistMode};
use crate::error::FieldError;
use crate::registry::{TypeKey, TypeRegistry};
use crate::value::Value;

// -----------------------------------------------------------------------------
// FieldList

/// The named field lists a persistable type may declare.
///
/// The set and its order are fixed for the whole process; encoded
/// records store one block per list in [`FieldList::ALL`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldList {
    /// Plain data fields.
    Properties,
    /// Fields that may hold entity references.
    ObjectProperties,
}

impl FieldList {
    pub const ALL: [FieldList; 2] = [FieldList::Properties, FieldList::ObjectProperties];

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            FieldList::Properties => "persist_properties",
            FieldList::ObjectProperties => "persist_obj_properties",
        }
    }
}

impl fmt::Display for FieldList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// -----------------------------------------------------------------------------
// Persist

/// Capability implemented by every behaviour the save engine can see.
///
/// Fields are addressed by name. [`fields`](Persist::fields) returns the
/// declaration order, which is also the encoding order: new fields may
/// only ever be appended at the end of a list.
///
/// # Example
///
/// ```
/// use vc_scene::{FieldError, FieldList, Persist, Value};
///
/// #[derive(Default)]
/// struct Score {
///     points: i64,
/// }
///
/// impl Persist for Score {
///     fn fields(&self, list: FieldList) -> &'static [&'static str] {
///         match list {
///             FieldList::Properties => &["points"],
///             FieldList::ObjectProperties => &[],
///         }
///     }
///
///     fn get(&self, field: &str) -> Option<Value> {
///         match field {
///             "points" => Some(Value::Int(self.points)),
///             _ => None,
///         }
///     }
///
///     fn set(&mut self, field: &str, value: Value) -> Result<(), FieldError> {
///         match field {
///             "points" => self.points = value.try_into().map_err(|e| FieldError::kind(field, e))?,
///             _ => return Err(FieldError::unknown(field)),
///         }
///         Ok(())
///     }
/// }
///
/// let mut score = Score::default();
/// score.set("points", Value::Int(7)).unwrap();
/// assert_eq!(score.get("points"), Some(Value::Int(7)));
/// ```
pub trait Persist: Any {
    /// Type-level default; a scene may override it per instance.
    fn persist_mode(&self) -> PersistMode {
        PersistMode::Rebuildable
    }

    fn fields(&self, list: FieldList) -> &'static [&'static str];

    fn get(&self, field: &str) -> Option<Value>;

    fn set(&mut self, field: &str, value: Value) -> Result<(), FieldError>;
}

// -----------------------------------------------------------------------------
// PersistType

/// A [`Persist`] behaviour that can be constructed from the registry.
pub trait PersistType: Persist + Default {
    const TYPE_KEY: TypeKey;
    const KIND: EntityKind;
    /// Name given to freshly instantiated nodes.
    const NAME: &'static str;

    /// Registers `Self`. Used by [`auto_register!`](crate::auto_register).
    #[inline]
    fn register_into(registry: &mut TypeRegistry)
    where
        Self: Sized,
    {
        registry.register::<Self>();
    }
}
