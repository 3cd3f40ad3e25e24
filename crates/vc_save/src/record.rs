use alloc::string::String;
use alloc::vec::Vec;

use vc_scene::{EntityKey, FieldList, Name, PersistMode, SceneAccess};

use crate::builder::LoadContext;
use crate::error::{LoadError, SaveError};
use crate::format::{AnchoredRecord, Attach, Descriptor, FieldBlock, FreeRecord, Scalar};
use crate::resolver::SaveContext;

// -----------------------------------------------------------------------------
// Serialize

impl<S: SceneAccess + ?Sized> SaveContext<'_, S> {
    pub fn encode_anchored(&mut self, id: u32, entity: EntityKey) -> Result<AnchoredRecord, SaveError> {
        let (descriptor, attach) = match self.scene.persist_mode(entity) {
            PersistMode::NotPersisted => return Err(SaveError::NotPersistable(entity)),
            PersistMode::Stable => {
                let path = self
                    .scene
                    .path_from(self.root, entity)
                    .ok_or(SaveError::OutsideTree(entity))?;
                (Descriptor::Stable, Attach::Path(path))
            }
            PersistMode::Rebuildable => {
                let descriptor = self.descriptor_of(entity)?;
                let attach = if entity == self.root {
                    Attach::Detached
                } else {
                    let parent = self
                        .scene
                        .parent(entity)
                        .and_then(|parent| self.ids.get(parent))
                        .ok_or(SaveError::OutsideTree(entity))?;
                    Attach::Parent(parent)
                };
                (Descriptor::Type(descriptor), attach)
            }
        };

        let fields = self.encode_fields(entity)?;
        log::trace!("anchored record {id}: {descriptor:?} {attach:?}");
        Ok(AnchoredRecord {
            id,
            descriptor,
            attach,
            fields,
        })
    }

    pub fn encode_free(&mut self, id: u32, entity: EntityKey) -> Result<FreeRecord, SaveError> {
        let descriptor = self.descriptor_of(entity)?;
        let fields = self.encode_fields(entity)?;
        log::trace!("free record {id}: type {descriptor}");
        Ok(FreeRecord {
            id,
            descriptor,
            fields,
        })
    }

    fn descriptor_of(&mut self, entity: EntityKey) -> Result<u32, SaveError> {
        let ty = self
            .scene
            .type_key_of(entity)
            .ok_or(SaveError::MissingDescriptor(entity))?;
        self.descriptors.intern(ty)
    }

    /// One block per field list, fields in the order the type declares them.
    fn encode_fields(&mut self, entity: EntityKey) -> Result<Vec<FieldBlock>, SaveError> {
        let mut blocks = Vec::with_capacity(FieldList::ALL.len());
        for list in FieldList::ALL {
            let declared = self.scene.field_list(entity, list);
            let mut block = FieldBlock {
                values: Vec::with_capacity(declared.len()),
                names: Vec::new(),
            };
            for &field in declared {
                let value = self
                    .scene
                    .get_field(entity, field)
                    .ok_or(SaveError::MissingField {
                        entity,
                        list,
                        field,
                    })?;
                block.values.push(self.encode_value(&value, 0)?);
                if self.options.field_tags {
                    block.names.push(self.values.intern(Scalar::Name(Name::new(field)))?);
                }
            }
            blocks.push(block);
        }
        Ok(blocks)
    }
}

// -----------------------------------------------------------------------------
// Deserialize

impl<S: SceneAccess + ?Sized> LoadContext<'_, S> {
    /// Assigns the recorded values to the fields entity `id` declares today.
    ///
    /// The count comes from the record. A type that has since appended
    /// fields keeps its defaults for them.
    pub fn restore_fields(&mut self, id: u32, blocks: &[FieldBlock]) -> Result<(), LoadError> {
        check_block_shape(id, blocks)?;
        let entity = self.entity(id)?;
        for (list, block) in FieldList::ALL.into_iter().zip(blocks) {
            let declared = self.scene.field_list(entity, list);
            let recorded = block.values.len();
            if recorded > declared.len() {
                return Err(LoadError::FieldCount {
                    entity,
                    list,
                    recorded,
                    declared: declared.len(),
                });
            }
            if recorded < declared.len() {
                log::debug!(
                    "entity {entity:?}: {list} has {} newer fields, left at their defaults",
                    declared.len() - recorded
                );
            }
            if !block.names.is_empty() {
                self.check_names(entity, list, declared, &block.names)?;
            }

            for (&field, encoded) in declared.iter().zip(&block.values) {
                let value = self.decode_value(encoded)?;
                self.scene.set_field(entity, field, value)?;
            }
        }
        Ok(())
    }

    fn check_names(
        &self,
        entity: EntityKey,
        list: FieldList,
        declared: &'static [&'static str],
        names: &[u32],
    ) -> Result<(), LoadError> {
        for (index, (&declared, &name)) in declared.iter().zip(names).enumerate() {
            let recorded = match self.data.values.get(name as usize) {
                Some(Scalar::Name(recorded)) => recorded,
                Some(_) | None => return Err(LoadError::ValueOutOfRange(name)),
            };
            if *recorded != declared {
                return Err(LoadError::FieldRenamed {
                    entity,
                    list,
                    index,
                    recorded: String::from(recorded.as_str()),
                    declared,
                });
            }
        }
        Ok(())
    }
}

/// One block per field list, and either no names or one per value.
pub(crate) fn check_block_shape(id: u32, blocks: &[FieldBlock]) -> Result<(), LoadError> {
    if blocks.len() != FieldList::ALL.len() {
        return Err(LoadError::FieldBlocks {
            id,
            recorded: blocks.len(),
            expected: FieldList::ALL.len(),
        });
    }
    for (list, block) in FieldList::ALL.into_iter().zip(blocks) {
        if !block.names.is_empty() && block.names.len() != block.values.len() {
            return Err(LoadError::FieldNames {
                id,
                list,
                names: block.names.len(),
                values: block.values.len(),
            });
        }
    }
    Ok(())
}
