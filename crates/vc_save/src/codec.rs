use alloc::vec::Vec;

use vc_scene::{Array, Dict, ElementType, SceneAccess, Value, ValueKind};

use crate::builder::LoadContext;
use crate::error::{LoadError, SaveError};
use crate::format::{ElementTag, Encoded, EncodedMap, Scalar};
use crate::resolver::SaveContext;

/// Deepest container level at which an entity reference may appear.
///
/// `0` is the field itself, `1` the elements, keys and values of a
/// container held by the field.
const MAX_REFERENCE_DEPTH: u32 = 1;

// -----------------------------------------------------------------------------
// Encode

impl<S: SceneAccess + ?Sized> SaveContext<'_, S> {
    /// Encodes a field value; `depth` is the container nesting level.
    pub fn encode_value(&mut self, value: &Value, depth: u32) -> Result<Encoded, SaveError> {
        let code = match value {
            Value::Object(entity) => {
                check_depth(depth)?;
                self.encode_strong(*entity)?
            }
            Value::Weak(weak) => {
                check_depth(depth)?;
                self.encode_weak(*weak)?
            }
            Value::Array(array) => return self.encode_array(array, depth),
            Value::Dict(dict) => return self.encode_dict(dict, depth),
            Value::Callable(_) | Value::Handle(_) => {
                return Err(SaveError::NonSerializable(value.kind()));
            }
            scalar => {
                let scalar = Scalar::from_value(scalar).ok_or(SaveError::NonSerializable(scalar.kind()))?;
                self.encode_scalar(scalar)?
            }
        };
        Ok(Encoded::code(code))
    }

    fn encode_array(&mut self, array: &Array, depth: u32) -> Result<Encoded, SaveError> {
        let tag = match array.element_type() {
            None => ElementTag::Untyped,
            Some(ElementType { kind, .. }) if kind.is_opaque() => {
                return Err(SaveError::NonSerializable(*kind));
            }
            Some(ElementType {
                class: Some(class), ..
            }) => ElementTag::Class(self.descriptors.intern(class)?),
            Some(ElementType { kind, .. }) => ElementTag::Kind(*kind),
        };

        let mut items = Vec::with_capacity(array.len() + 2);
        for element in array {
            items.push(self.encode_value(element, depth + 1)?);
        }
        tag.push_to(&mut items);
        Ok(Encoded::List(items))
    }

    fn encode_dict(&mut self, dict: &Dict, depth: u32) -> Result<Encoded, SaveError> {
        let mut entries = Vec::with_capacity(dict.len());
        for (key, value) in dict.iter() {
            let key = self.encode_value(key, depth + 1)?;
            let value = self.encode_value(value, depth + 1)?;
            entries.push((key, value));
        }
        Ok(Encoded::Map(EncodedMap { entries }))
    }
}

#[inline]
fn check_depth(depth: u32) -> Result<(), SaveError> {
    if depth > MAX_REFERENCE_DEPTH {
        Err(SaveError::NestedReference { depth })
    } else {
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Decode

impl<S: SceneAccess + ?Sized> LoadContext<'_, S> {
    /// Inverse of [`SaveContext::encode_value`]; every id must already be bound.
    pub fn decode_value(&self, encoded: &Encoded) -> Result<Value, LoadError> {
        match encoded {
            Encoded::Code(raw) => self.decode_code(*raw),
            Encoded::List(items) => self.decode_array(items).map(Value::Array),
            Encoded::Map(map) => {
                let mut dict = Dict::new();
                for (key, value) in &map.entries {
                    dict.insert(self.decode_value(key)?, self.decode_value(value)?);
                }
                Ok(Value::Dict(dict))
            }
        }
    }

    fn decode_array(&self, items: &[Encoded]) -> Result<Array, LoadError> {
        let (elements, tag) = ElementTag::split(items).ok_or(LoadError::MalformedArray)?;

        // The element type must be in place before any element goes in.
        let mut array = match tag {
            ElementTag::Untyped => Array::new(),
            ElementTag::Kind(kind) => Array::typed(ElementType::of(kind)),
            ElementTag::Class(index) => {
                let class = self
                    .descriptors
                    .get(index as usize)
                    .ok_or(LoadError::DescriptorOutOfRange(index))?;
                Array::typed(ElementType::class(class.clone()))
            }
        };

        for element in elements {
            let value = self.decode_value(element)?;
            if let Some(ElementType {
                kind: ValueKind::Object,
                class: Some(class),
            }) = array.element_type()
                && let Value::Object(entity) = &value
            {
                let found = self.scene.type_key_of(*entity);
                if found != Some(class) {
                    return Err(LoadError::ElementClass {
                        expected: class.clone(),
                        found: found.cloned(),
                    });
                }
            }
            array.try_push(value)?;
        }
        Ok(array)
    }
}

// -----------------------------------------------------------------------------
// Tests
