//! The encoded artifact produced by a save and consumed by a load.
//!
//! A [`SaveData`] holds five sections:
//!
//! ```text
//! [count, anchored records, free records, type descriptors, value table]
//! ```
//!
//! Field values inside records are [`Encoded`] trees whose leaves are
//! raw codes. A raw code is decoded purely by numeric range:
//!
//! | range                                   | meaning                 |
//! |-----------------------------------------|-------------------------|
//! | `0 .. OBJECT_OFFSET`                    | value-table index       |
//! | `OBJECT_OFFSET .. WEAK_OFFSET`          | strong entity id        |
//! | `WEAK_OFFSET .. DEAD_WEAK`              | weak entity id          |
//! | `DEAD_WEAK`                             | weak handle, no target  |
//!
//! [`Code`] is the tagged view of the same information.

use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};
use vc_scene::{Name, NodePath, Value, ValueKind};

// -----------------------------------------------------------------------------
// Code

/// First raw code denoting a strong entity id.
pub const OBJECT_OFFSET: u64 = 1 << 32;
/// First raw code denoting a weak entity id.
pub const WEAK_OFFSET: u64 = 2 * OBJECT_OFFSET;
/// The raw code of a weak handle whose target is gone.
pub const DEAD_WEAK: u64 = 3 * OBJECT_OFFSET;

/// A decoded leaf code.
///
/// Value-table indices and entity ids are both `u32`, so with the
/// offsets above the ranges can never overlap.
///
/// ```
/// # use vc_save::format::{Code, OBJECT_OFFSET, DEAD_WEAK};
/// assert_eq!(Code::Strong(5).to_raw(), OBJECT_OFFSET + 5);
/// assert_eq!(Code::from_raw(OBJECT_OFFSET + 5), Some(Code::Strong(5)));
/// assert_eq!(Code::from_raw(DEAD_WEAK), Some(Code::WeakDead));
/// assert_eq!(Code::from_raw(DEAD_WEAK + 1), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Value(u32),
    Strong(u32),
    Weak(u32),
    WeakDead,
}

impl Code {
    pub const fn to_raw(self) -> u64 {
        match self {
            Code::Value(index) => index as u64,
            Code::Strong(id) => OBJECT_OFFSET + id as u64,
            Code::Weak(id) => WEAK_OFFSET + id as u64,
            Code::WeakDead => DEAD_WEAK,
        }
    }

    pub const fn from_raw(raw: u64) -> Option<Self> {
        Some(if raw < OBJECT_OFFSET {
            Code::Value(raw as u32)
        } else if raw < WEAK_OFFSET {
            Code::Strong((raw - OBJECT_OFFSET) as u32)
        } else if raw < DEAD_WEAK {
            Code::Weak((raw - WEAK_OFFSET) as u32)
        } else if raw == DEAD_WEAK {
            Code::WeakDead
        } else {
            return None;
        })
    }
}

// -----------------------------------------------------------------------------
// Encoded

/// An encoded field value.
///
/// The three shapes are told apart structurally, never by a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Encoded {
    /// A raw [`Code`].
    Code(u64),
    /// Array elements followed by the element-type trailer, see [`ElementTag`].
    List(Vec<Encoded>),
    Map(EncodedMap),
}

impl Encoded {
    #[inline]
    pub const fn code(code: Code) -> Self {
        Encoded::Code(code.to_raw())
    }
}

/// Encoded key/value pairs of a dictionary, in insertion order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EncodedMap {
    pub entries: Vec<(Encoded, Encoded)>,
}

// -----------------------------------------------------------------------------
// ElementTag

const TAG_UNTYPED: u64 = 0;
const TAG_CLASS: u64 = 0x80;

/// Element-type metadata trailing every encoded array.
///
/// The trailer is `[0]` for untyped arrays, `[kind + 1]` for arrays
/// typed by value kind, and `[descriptor, 0x80]` for entity arrays
/// restricted to one described type. It is read back from the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementTag {
    Untyped,
    Kind(ValueKind),
    /// Entity array; the payload is a type-descriptor index.
    Class(u32),
}

impl ElementTag {
    pub(crate) fn push_to(self, out: &mut Vec<Encoded>) {
        match self {
            ElementTag::Untyped => out.push(Encoded::Code(TAG_UNTYPED)),
            ElementTag::Kind(kind) => out.push(Encoded::Code(kind.index() as u64 + 1)),
            ElementTag::Class(descriptor) => {
                out.push(Encoded::Code(descriptor as u64));
                out.push(Encoded::Code(TAG_CLASS));
            }
        }
    }

    /// Splits `items` into elements and trailer.
    pub(crate) fn split(items: &[Encoded]) -> Option<(&[Encoded], ElementTag)> {
        let (Encoded::Code(tag), rest) = items.split_last()? else {
            return None;
        };
        match *tag {
            TAG_UNTYPED => Some((rest, ElementTag::Untyped)),
            TAG_CLASS => {
                let (Encoded::Code(descriptor), rest) = rest.split_last()? else {
                    return None;
                };
                let descriptor = u32::try_from(*descriptor).ok()?;
                Some((rest, ElementTag::Class(descriptor)))
            }
            tag => {
                let kind = u8::try_from(tag - 1).ok().and_then(ValueKind::from_index)?;
                Some((rest, ElementTag::Kind(kind)))
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Scalar

/// A value-table entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Name(Name),
    Path(NodePath),
}

impl Scalar {
    /// Returns `None` for anything that is not a leaf scalar.
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Nil => Scalar::Nil,
            Value::Bool(v) => Scalar::Bool(*v),
            Value::Int(v) => Scalar::Int(*v),
            Value::Float(v) => Scalar::Float(*v),
            Value::String(v) => Scalar::String(v.clone()),
            Value::Name(v) => Scalar::Name(v.clone()),
            Value::Path(v) => Scalar::Path(v.clone()),
            _ => return None,
        })
    }

    pub fn into_value(self) -> Value {
        match self {
            Scalar::Nil => Value::Nil,
            Scalar::Bool(v) => Value::Bool(v),
            Scalar::Int(v) => Value::Int(v),
            Scalar::Float(v) => Value::Float(v),
            Scalar::String(v) => Value::String(v),
            Scalar::Name(v) => Value::Name(v),
            Scalar::Path(v) => Value::Path(v),
        }
    }
}

// -----------------------------------------------------------------------------
// Records

/// How an anchored entity is found or rebuilt on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Descriptor {
    /// Located by path; never recreated.
    Stable,
    /// Recreated from the type descriptor at this index.
    Type(u32),
}

/// Where an anchored entity sits in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attach {
    /// Rebuildable entity, attached under the entity with this id.
    Parent(u32),
    /// Stable entity, relative to the designated root.
    Path(NodePath),
    /// Rebuildable root of a detached save.
    Detached,
}

/// The encoded values of one field list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldBlock {
    pub values: Vec<Encoded>,
    /// Value-table indices of the field names, when saved with field tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<u32>,
}

/// An entity that lives in the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchoredRecord {
    pub id: u32,
    pub descriptor: Descriptor,
    pub attach: Attach,
    /// One block per [`FieldList::ALL`](vc_scene::FieldList::ALL) entry.
    pub fields: Vec<FieldBlock>,
}

/// An entity only reachable through field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeRecord {
    pub id: u32,
    pub descriptor: u32,
    pub fields: Vec<FieldBlock>,
}

// -----------------------------------------------------------------------------
// SaveData

/// A complete save.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SaveData {
    /// Total number of entity ids, anchored and free.
    pub count: u32,
    /// In traversal order; the first record is the root, id `0`.
    pub anchored: Vec<AnchoredRecord>,
    pub free: Vec<FreeRecord>,
    pub descriptors: Vec<String>,
    pub values: Vec<Scalar>,
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{Code, ElementTag, Encoded, EncodedMap, DEAD_WEAK, OBJECT_OFFSET, WEAK_OFFSET};
    use alloc::vec;
    use alloc::vec::Vec;
    use vc_scene::ValueKind;

    #[test]
    fn code_ranges() {
        assert_eq!(Code::from_raw(0), Some(Code::Value(0)));
        assert_eq!(Code::from_raw(OBJECT_OFFSET - 1), Some(Code::Value(u32::MAX)));
        assert_eq!(Code::from_raw(OBJECT_OFFSET), Some(Code::Strong(0)));
        assert_eq!(Code::from_raw(WEAK_OFFSET - 1), Some(Code::Strong(u32::MAX)));
        assert_eq!(Code::from_raw(WEAK_OFFSET), Some(Code::Weak(0)));
        assert_eq!(Code::from_raw(DEAD_WEAK), Some(Code::WeakDead));
        assert_eq!(Code::from_raw(u64::MAX), None);
        assert_eq!(Code::Weak(7).to_raw(), WEAK_OFFSET + 7);
    }

    #[test]
    fn element_trailer() {
        for tag in [
            ElementTag::Untyped,
            ElementTag::Kind(ValueKind::Int),
            ElementTag::Kind(ValueKind::Nil),
            ElementTag::Class(3),
        ] {
            let mut items = vec![Encoded::Code(11), Encoded::Code(12)];
            tag.push_to(&mut items);
            let (elements, read) = ElementTag::split(&items).unwrap();
            assert_eq!(read, tag);
            assert_eq!(elements.len(), 2);
        }
        assert!(ElementTag::split(&[]).is_none());
        assert!(ElementTag::split(&[Encoded::Code(200)]).is_none());
        assert!(ElementTag::split(&[Encoded::Map(EncodedMap::default())]).is_none());
        let empty: Vec<Encoded> = vec![Encoded::Code(0x80)];
        assert!(ElementTag::split(&empty).is_none());
    }

    #[test]
    fn encoded_json_shapes() {
        let value = Encoded::List(vec![
            Encoded::Code(OBJECT_OFFSET),
            Encoded::Map(EncodedMap {
                entries: vec![(Encoded::Code(1), Encoded::Code(2))],
            }),
            Encoded::Code(0),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        let back: Encoded = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
