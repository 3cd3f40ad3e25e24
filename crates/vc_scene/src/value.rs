use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::entity::{EntityKey, WeakRef};
use crate::error::ValueError;
use crate::name::{Name, NodePath};
use crate::registry::TypeKey;

// -----------------------------------------------------------------------------
// ValueKind

/// The dynamic type of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueKind {
    Nil = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    String = 4,
    Name = 5,
    Path = 6,
    Object = 7,
    Weak = 8,
    Array = 9,
    Dict = 10,
    Callable = 11,
    Handle = 12,
}

impl ValueKind {
    const ALL: [ValueKind; 13] = [
        ValueKind::Nil,
        ValueKind::Bool,
        ValueKind::Int,
        ValueKind::Float,
        ValueKind::String,
        ValueKind::Name,
        ValueKind::Path,
        ValueKind::Object,
        ValueKind::Weak,
        ValueKind::Array,
        ValueKind::Dict,
        ValueKind::Callable,
        ValueKind::Handle,
    ];

    #[inline]
    pub const fn index(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Values of this kind are bound to the running process and can
    /// never be persisted.
    #[inline]
    pub const fn is_opaque(self) -> bool {
        matches!(self, ValueKind::Callable | ValueKind::Handle)
    }

    /// Whether values of this kind refer to an entity.
    #[inline]
    pub const fn is_reference(self) -> bool {
        matches!(self, ValueKind::Object | ValueKind::Weak)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// -----------------------------------------------------------------------------
// Callable

/// A bound method. Only meaningful inside the running process.
#[derive(Debug, Clone, PartialEq)]
pub struct Callable {
    pub target: Option<EntityKey>,
    pub method: Name,
}

// -----------------------------------------------------------------------------
// Value

/// A dynamically typed field value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Name(Name),
    Path(NodePath),
    Object(EntityKey),
    Weak(WeakRef),
    Array(Array),
    Dict(Dict),
    Callable(Callable),
    /// Opaque handle to a process-local resource.
    Handle(u64),
}

impl Value {
    pub const fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Name(_) => ValueKind::Name,
            Value::Path(_) => ValueKind::Path,
            Value::Object(_) => ValueKind::Object,
            Value::Weak(_) => ValueKind::Weak,
            Value::Array(_) => ValueKind::Array,
            Value::Dict(_) => ValueKind::Dict,
            Value::Callable(_) => ValueKind::Callable,
            Value::Handle(_) => ValueKind::Handle,
        }
    }

    #[inline]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// The strongly referenced entity, if any.
    #[inline]
    pub const fn as_object(&self) -> Option<EntityKey> {
        match self {
            Value::Object(key) => Some(*key),
            _ => None,
        }
    }

    /// Returns `true` if this value, or anything nested in it, refers to an entity.
    pub fn has_references(&self) -> bool {
        match self {
            Value::Object(_) | Value::Weak(_) => true,
            Value::Array(array) => array.iter().any(Value::has_references),
            Value::Dict(dict) => dict
                .iter()
                .any(|(k, v)| k.has_references() || v.has_references()),
            _ => false,
        }
    }
}

macro_rules! impl_value_conversion {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Value {
            #[inline]
            fn from(value: $ty) -> Self {
                Value::$variant(value)
            }
        }

        impl TryFrom<Value> for $ty {
            type Error = ValueError;

            #[inline]
            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    other => Err(ValueError::new(ValueKind::$variant, other.kind())),
                }
            }
        }
    };
}

impl_value_conversion!(bool, Bool);
impl_value_conversion!(i64, Int);
impl_value_conversion!(f64, Float);
impl_value_conversion!(String, String);
impl_value_conversion!(Name, Name);
impl_value_conversion!(NodePath, Path);
impl_value_conversion!(EntityKey, Object);
impl_value_conversion!(WeakRef, Weak);
impl_value_conversion!(Array, Array);
impl_value_conversion!(Dict, Dict);

impl From<&str> for Value {
    #[inline]
    fn from(value: &str) -> Self {
        Value::String(String::from(value))
    }
}

impl From<Option<EntityKey>> for Value {
    #[inline]
    fn from(value: Option<EntityKey>) -> Self {
        value.map_or(Value::Nil, Value::Object)
    }
}

impl TryFrom<Value> for Option<EntityKey> {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Nil => Ok(None),
            Value::Object(key) => Ok(Some(key)),
            other => Err(ValueError::new(ValueKind::Object, other.kind())),
        }
    }
}

// -----------------------------------------------------------------------------
// ElementType

/// Declared element type of a typed [`Array`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementType {
    pub kind: ValueKind,
    /// For entity arrays, the type every element must be an instance of.
    pub class: Option<TypeKey>,
}

impl ElementType {
    #[inline]
    pub const fn of(kind: ValueKind) -> Self {
        Self { kind, class: None }
    }

    #[inline]
    pub const fn class(class: TypeKey) -> Self {
        Self {
            kind: ValueKind::Object,
            class: Some(class),
        }
    }

    /// Kind check only; the described class is verified by whoever can
    /// resolve entity types.
    pub fn admits(&self, value: &Value) -> bool {
        match (self.kind, value) {
            (ValueKind::Object, Value::Nil) => true,
            (kind, value) => value.kind() == kind,
        }
    }
}

// -----------------------------------------------------------------------------
// Array

/// An ordered sequence of values, optionally restricted to one element type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array {
    items: Vec<Value>,
    element: Option<ElementType>,
}

impl Array {
    #[inline]
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            element: None,
        }
    }

    #[inline]
    pub const fn typed(element: ElementType) -> Self {
        Self {
            items: Vec::new(),
            element: Some(element),
        }
    }

    #[inline]
    pub fn element_type(&self) -> Option<&ElementType> {
        self.element.as_ref()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, Value> {
        self.items.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    /// Appends `value`, rejecting it if it does not fit the declared element type.
    pub fn try_push(&mut self, value: Value) -> Result<(), ValueError> {
        if let Some(element) = &self.element
            && !element.admits(&value)
        {
            return Err(ValueError::new(element.kind, value.kind()));
        }
        self.items.push(value);
        Ok(())
    }

    /// Keeps the elements for which `keep` returns `true`.
    pub fn retain(&mut self, keep: impl FnMut(&Value) -> bool) {
        self.items.retain(keep);
    }

    /// Like [`retain`](Self::retain), but `keep` may edit the elements it keeps.
    ///
    /// An edited element must still fit the declared element type.
    pub fn retain_mut(&mut self, keep: impl FnMut(&mut Value) -> bool) {
        self.items.retain_mut(keep);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
            element: None,
        }
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Value;
    type IntoIter = core::slice::Iter<'a, Value>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// -----------------------------------------------------------------------------
// Dict

/// An insertion-ordered key to value association.
///
/// Keys are compared with `==`; inserting an existing key replaces its
/// value in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dict {
    entries: Vec<(Value, Value)>,
}

impl Dict {
    #[inline]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts or replaces; returns the previous value for `key`.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(core::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find_map(|(k, v)| if k == key { Some(v) } else { None })
    }

    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Keeps the entries for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&Value, &Value) -> bool) {
        self.entries.retain(|(k, v)| keep(k, v));
    }

    /// Like [`retain`](Self::retain), but `keep` may edit the values it keeps.
    pub fn retain_mut(&mut self, mut keep: impl FnMut(&Value, &mut Value) -> bool) {
        self.entries.retain_mut(|(k, v)| keep(k, v));
    }
}

impl FromIterator<(Value, Value)> for Dict {
    fn from_iter<T: IntoIterator<Item = (Value, Value)>>(iter: T) -> Self {
        let mut dict = Dict::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{Array, Dict, ElementType, Value, ValueKind};
    use crate::EntityKey;

    #[test]
    fn typed_array_rejects_wrong_kind() {
        let mut array = Array::typed(ElementType::of(ValueKind::Int));
        assert!(array.try_push(Value::Int(3)).is_ok());
        let err = array.try_push(Value::from("3")).unwrap_err();
        assert_eq!(err.expected, ValueKind::Int);
        assert_eq!(err.found, ValueKind::String);
        assert_eq!(array.len(), 1);
    }

    #[test]
    fn object_array_admits_nil() {
        let mut array = Array::typed(ElementType::of(ValueKind::Object));
        assert!(array.try_push(Value::Nil).is_ok());
        assert!(array.try_push(Value::Object(EntityKey::default())).is_ok());
        assert!(array.try_push(Value::Int(1)).is_err());
    }

    #[test]
    fn dict_replaces_existing_key() {
        let mut dict = Dict::new();
        assert!(dict.insert(Value::from("hp"), Value::Int(1)).is_none());
        assert_eq!(
            dict.insert(Value::from("hp"), Value::Int(2)),
            Some(Value::Int(1))
        );
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get(&Value::from("hp")), Some(&Value::Int(2)));
    }

    #[test]
    fn kind_index_round_trip() {
        for index in 0..13 {
            assert_eq!(ValueKind::from_index(index).unwrap().index(), index);
        }
        assert!(ValueKind::from_index(13).is_none());
    }

    #[test]
    fn nested_references_detected() {
        let inner: Array = [Value::Int(1), Value::Object(EntityKey::default())]
            .into_iter()
            .collect();
        let dict: Dict = [(Value::from("items"), Value::Array(inner))]
            .into_iter()
            .collect();
        assert!(Value::Dict(dict).has_references());
        assert!(!Value::from("plain").has_references());
    }
}
