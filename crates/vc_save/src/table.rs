//! Per-operation lookup tables. Created fresh for every save.

use alloc::string::String;
use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashMap;
use vc_scene::{EntityKey, NodePath, TypeKey};

use crate::error::SaveError;
use crate::format::Scalar;

#[inline]
fn next_index(len: usize) -> Result<u32, SaveError> {
    u32::try_from(len).map_err(|_| SaveError::TableOverflow)
}

// -----------------------------------------------------------------------------
// IdentityTable

/// Bijection between live entities and dense ids `0..N`.
#[derive(Debug, Default)]
pub(crate) struct IdentityTable {
    ids: HashMap<EntityKey, u32>,
    entities: Vec<EntityKey>,
}

impl IdentityTable {
    #[inline]
    pub fn get(&self, entity: EntityKey) -> Option<u32> {
        self.ids.get(&entity).copied()
    }

    /// Assigns the next id to `entity`, which must not be registered yet.
    pub fn register(&mut self, entity: EntityKey) -> Result<u32, SaveError> {
        debug_assert!(!self.ids.contains_key(&entity));
        let id = next_index(self.entities.len())?;
        self.ids.insert(entity, id);
        self.entities.push(entity);
        Ok(id)
    }

    #[inline]
    pub fn entity(&self, id: usize) -> Option<EntityKey> {
        self.entities.get(id).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }
}

// -----------------------------------------------------------------------------
// ValueTable

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TextKind {
    String,
    Name,
}

/// Non-text scalars in hashable form. Floats are keyed by bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ScalarKey {
    Nil,
    Bool(bool),
    Int(i64),
    Float(u64),
}

enum Class {
    Text(TextKind, String),
    /// Keyed by segments; the joined text is ambiguous.
    Path(NodePath),
    Other(ScalarKey),
}

/// Sorts a scalar into its namespace, canonicalizing text to an owned string.
fn classify(scalar: &Scalar) -> Class {
    match scalar {
        Scalar::Nil => Class::Other(ScalarKey::Nil),
        Scalar::Bool(v) => Class::Other(ScalarKey::Bool(*v)),
        Scalar::Int(v) => Class::Other(ScalarKey::Int(*v)),
        Scalar::Float(v) => Class::Other(ScalarKey::Float(v.to_bits())),
        Scalar::String(v) => Class::Text(TextKind::String, v.clone()),
        Scalar::Name(v) => Class::Text(TextKind::Name, String::from(v.as_str())),
        Scalar::Path(v) => Class::Path(v.clone()),
    }
}

/// Deduplicated scalar leaves.
///
/// Text, paths and all other scalars are indexed in separate
/// namespaces; all of them share the same output list.
#[derive(Debug, Default)]
pub(crate) struct ValueTable {
    entries: Vec<Scalar>,
    text: HashMap<(TextKind, String), u32>,
    paths: HashMap<NodePath, u32>,
    other: HashMap<ScalarKey, u32>,
}

impl ValueTable {
    pub fn intern(&mut self, scalar: Scalar) -> Result<u32, SaveError> {
        let entries = &mut self.entries;
        match classify(&scalar) {
            Class::Text(kind, text) => intern_in(&mut self.text, entries, (kind, text), scalar),
            Class::Path(path) => intern_in(&mut self.paths, entries, path, scalar),
            Class::Other(key) => intern_in(&mut self.other, entries, key, scalar),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn into_entries(self) -> Vec<Scalar> {
        self.entries
    }
}

fn intern_in<K: Hash + Eq>(
    index: &mut HashMap<K, u32>,
    entries: &mut Vec<Scalar>,
    key: K,
    scalar: Scalar,
) -> Result<u32, SaveError> {
    if let Some(&found) = index.get(&key) {
        return Ok(found);
    }
    let next = next_index(entries.len())?;
    index.insert(key, next);
    entries.push(scalar);
    Ok(next)
}

// -----------------------------------------------------------------------------
// DescriptorTable

/// Deduplicated type descriptors, stored by key.
#[derive(Debug, Default)]
pub(crate) struct DescriptorTable {
    index: HashMap<TypeKey, u32>,
    keys: Vec<String>,
}

impl DescriptorTable {
    pub fn intern(&mut self, ty: &TypeKey) -> Result<u32, SaveError> {
        if let Some(&index) = self.index.get(ty) {
            return Ok(index);
        }
        let index = next_index(self.keys.len())?;
        self.index.insert(ty.clone(), index);
        self.keys.push(String::from(ty.as_str()));
        Ok(index)
    }

    #[inline]
    pub fn into_keys(self) -> Vec<String> {
        self.keys
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{DescriptorTable, IdentityTable, ValueTable};
    use crate::format::Scalar;
    use alloc::string::String;
    use vc_scene::{EntityKey, Name, NodePath, TypeKey};

    #[test]
    fn values_are_deduplicated() {
        let mut table = ValueTable::default();
        let a = table.intern(Scalar::String(String::from("Engine"))).unwrap();
        let b = table.intern(Scalar::Int(3)).unwrap();
        let c = table.intern(Scalar::String(String::from("Engine"))).unwrap();
        let d = table.intern(Scalar::Int(3)).unwrap();
        assert_eq!(a, c);
        assert_eq!(b, d);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn text_kinds_stay_apart() {
        let mut table = ValueTable::default();
        let s = table.intern(Scalar::String(String::from("a/b"))).unwrap();
        let n = table.intern(Scalar::Name(Name::new("a/b"))).unwrap();
        let p = table.intern(Scalar::Path(NodePath::parse("a/b"))).unwrap();
        assert_ne!(s, n);
        assert_ne!(n, p);
        assert_eq!(table.intern(Scalar::Name(Name::new("a/b"))).unwrap(), n);
    }

    #[test]
    fn paths_by_segments() {
        let mut table = ValueTable::default();
        let split = table.intern(Scalar::Path(NodePath::parse("a/b"))).unwrap();
        let whole = [Name::new("a/b")].into_iter().collect();
        let whole = table.intern(Scalar::Path(whole)).unwrap();
        assert_ne!(split, whole);
        assert_eq!(table.intern(Scalar::Path(NodePath::parse("a/b"))).unwrap(), split);
    }

    #[test]
    fn floats_by_bits() {
        let mut table = ValueTable::default();
        let zero = table.intern(Scalar::Float(0.0)).unwrap();
        let neg = table.intern(Scalar::Float(-0.0)).unwrap();
        let nan = table.intern(Scalar::Float(f64::NAN)).unwrap();
        assert_ne!(zero, neg);
        assert_eq!(table.intern(Scalar::Float(f64::NAN)).unwrap(), nan);
        // Int and Float never share an entry.
        assert_ne!(table.intern(Scalar::Int(0)).unwrap(), zero);
    }

    #[test]
    fn identity_is_dense() {
        let mut table = IdentityTable::default();
        let key = EntityKey::default();
        assert_eq!(table.register(key).unwrap(), 0);
        assert_eq!(table.get(key), Some(0));
        assert_eq!(table.entity(0), Some(key));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn descriptors_by_key() {
        let mut table = DescriptorTable::default();
        let a = table.intern(&TypeKey::new("a")).unwrap();
        let b = table.intern(&TypeKey::new("b")).unwrap();
        assert_eq!(table.intern(&TypeKey::new("a")).unwrap(), a);
        assert_ne!(a, b);
        assert_eq!(table.into_keys().len(), 2);
    }
}
