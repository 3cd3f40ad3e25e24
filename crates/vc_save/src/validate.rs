use alloc::vec;

use crate::error::LoadError;
use crate::format::{Attach, Code, Descriptor, ElementTag, Encoded, FieldBlock, SaveData, Scalar};
use crate::record::check_block_shape;

impl SaveData {
    /// Checks that the data is internally consistent.
    ///
    /// Every index must point into its table, every id must have exactly
    /// one record, and records must be shaped the way a load expects.
    /// Passing says nothing about whether the types and paths it names
    /// exist in a given scene.
    ///
    /// Runs after every save when the `debug` feature is enabled in a
    /// debug build.
    pub fn validate(&self) -> Result<(), LoadError> {
        let records = self.anchored.len() + self.free.len();
        if self.count as usize != records {
            return Err(LoadError::EntityCount {
                declared: self.count,
                records,
            });
        }
        if self.anchored.first().is_none_or(|root| root.id != 0) {
            return Err(LoadError::MissingRoot);
        }

        let mut seen = vec![false; records];
        let ids = self
            .anchored
            .iter()
            .map(|r| r.id)
            .chain(self.free.iter().map(|r| r.id));
        for id in ids {
            let slot = seen
                .get_mut(id as usize)
                .ok_or(LoadError::IdOutOfRange(id as u64))?;
            if *slot {
                return Err(LoadError::DuplicateId(id));
            }
            *slot = true;
        }

        for (index, record) in self.anchored.iter().enumerate() {
            match (&record.descriptor, &record.attach) {
                (Descriptor::Stable, Attach::Path(_)) => {}
                (Descriptor::Type(ty), Attach::Detached) if index == 0 => self.check_descriptor(*ty)?,
                (Descriptor::Type(ty), Attach::Parent(parent)) if index != 0 => {
                    self.check_descriptor(*ty)?;
                    self.check_id(*parent)?;
                }
                _ => return Err(LoadError::InvalidAttach(record.id)),
            }
            self.check_fields(record.id, &record.fields)?;
        }
        for record in &self.free {
            self.check_descriptor(record.descriptor)?;
            self.check_fields(record.id, &record.fields)?;
        }
        Ok(())
    }

    #[inline]
    fn check_id(&self, id: u32) -> Result<(), LoadError> {
        if id < self.count {
            Ok(())
        } else {
            Err(LoadError::IdOutOfRange(id as u64))
        }
    }

    #[inline]
    fn check_descriptor(&self, index: u32) -> Result<(), LoadError> {
        if (index as usize) < self.descriptors.len() {
            Ok(())
        } else {
            Err(LoadError::DescriptorOutOfRange(index))
        }
    }

    fn check_fields(&self, id: u32, blocks: &[FieldBlock]) -> Result<(), LoadError> {
        check_block_shape(id, blocks)?;
        for block in blocks {
            for value in &block.values {
                self.check_encoded(value)?;
            }
            for &name in &block.names {
                if !matches!(self.values.get(name as usize), Some(Scalar::Name(_))) {
                    return Err(LoadError::ValueOutOfRange(name));
                }
            }
        }
        Ok(())
    }

    fn check_encoded(&self, encoded: &Encoded) -> Result<(), LoadError> {
        match encoded {
            Encoded::Code(raw) => match Code::from_raw(*raw).ok_or(LoadError::InvalidCode(*raw))? {
                Code::Value(index) if index as usize >= self.values.len() => {
                    Err(LoadError::ValueOutOfRange(index))
                }
                Code::Value(_) | Code::WeakDead => Ok(()),
                Code::Strong(id) | Code::Weak(id) => self.check_id(id),
            },
            Encoded::List(items) => {
                let (elements, tag) = ElementTag::split(items).ok_or(LoadError::MalformedArray)?;
                if let ElementTag::Class(index) = tag {
                    self.check_descriptor(index)?;
                }
                elements.iter().try_for_each(|e| self.check_encoded(e))
            }
            Encoded::Map(map) => map.entries.iter().try_for_each(|(k, v)| {
                self.check_encoded(k)?;
                self.check_encoded(v)
            }),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use crate::error::LoadError;
    use crate::format::{Attach, Descriptor, Encoded, FieldBlock, OBJECT_OFFSET};
    use crate::testing::{Item, Player, world};
    use crate::{Persister, SaveOptions};
    use vc_scene::{FieldList, SceneAccess, Value};

    #[test]
    fn saved_data_is_valid() {
        let (mut scene, root) = world();
        let player = scene.spawn(Player::default());
        scene.attach(root, player).unwrap();
        let item = scene.spawn(Item::default());
        scene.set_field(player, "inventory", Value::Object(item)).unwrap();

        let data = crate::save(&scene, root).unwrap();
        assert_eq!(data.validate(), Ok(()));
    }

    #[test]
    fn broken_data_is_reported() {
        let (mut scene, root) = world();
        let player = scene.spawn(Player::default());
        scene.attach(root, player).unwrap();
        let data = crate::save(&scene, root).unwrap();

        let mut bad = data.clone();
        bad.count = 5;
        assert!(matches!(bad.validate(), Err(LoadError::EntityCount { .. })));

        let mut bad = data.clone();
        bad.anchored[1].id = 0;
        assert_eq!(bad.validate(), Err(LoadError::DuplicateId(0)));

        let mut bad = data.clone();
        bad.anchored[1].attach = Attach::Parent(9);
        assert_eq!(bad.validate(), Err(LoadError::IdOutOfRange(9)));

        let mut bad = data.clone();
        bad.anchored[1].descriptor = Descriptor::Type(7);
        assert_eq!(bad.validate(), Err(LoadError::DescriptorOutOfRange(7)));

        let mut bad = data.clone();
        bad.anchored[1].fields[0].values[0] = Encoded::Code(OBJECT_OFFSET + 4);
        assert_eq!(bad.validate(), Err(LoadError::IdOutOfRange(4)));

        let mut bad = data.clone();
        bad.anchored[1].fields[0].values[0] = Encoded::List(alloc::vec::Vec::new());
        assert_eq!(bad.validate(), Err(LoadError::MalformedArray));

        let mut bad = data.clone();
        bad.anchored[1].fields.push(FieldBlock::default());
        assert_eq!(
            bad.validate(),
            Err(LoadError::FieldBlocks {
                id: 1,
                recorded: 3,
                expected: 2
            })
        );

        let mut bad = data;
        bad.anchored[1].fields.pop();
        assert!(matches!(bad.validate(), Err(LoadError::FieldBlocks { recorded: 1, .. })));
    }

    #[test]
    fn field_names_cover_every_value() {
        let (mut scene, root) = world();
        let player = scene.spawn(Player::default());
        scene.attach(root, player).unwrap();
        let data = Persister::with_options(SaveOptions { field_tags: true })
            .save(&scene, root)
            .unwrap();
        assert_eq!(data.validate(), Ok(()));

        let mut bad = data;
        bad.anchored[1].fields[1].names.pop();
        assert_eq!(
            bad.validate(),
            Err(LoadError::FieldNames {
                id: 1,
                list: FieldList::ObjectProperties,
                names: 2,
                values: 3,
            })
        );
    }
}
