use alloc::vec;
use alloc::vec::Vec;

use vc_scene::{EntityKey, SceneAccess, TypeKey};

use crate::error::{LoadError, LoadMode};
use crate::format::{AnchoredRecord, Attach, Descriptor, SaveData};

// -----------------------------------------------------------------------------
// LoadContext

/// State of one load, driven through its stages in strict order.
///
/// 1. resolve type descriptors
/// 2. locate stable entities, instantiate rebuildable and free ones
/// 3. restore every field, now that every id is bound
/// 4. attach rebuildable entities under their recorded parents
pub(crate) struct LoadContext<'a, S: SceneAccess + ?Sized> {
    pub scene: &'a mut S,
    pub data: &'a SaveData,
    pub root: Option<EntityKey>,
    pub descriptors: Vec<TypeKey>,
    pub entities: Vec<Option<EntityKey>>,
    created: Vec<EntityKey>,
}

impl<'a, S: SceneAccess + ?Sized> LoadContext<'a, S> {
    pub fn new(scene: &'a mut S, data: &'a SaveData, root: Option<EntityKey>) -> Self {
        Self {
            scene,
            data,
            root,
            descriptors: Vec::new(),
            entities: Vec::new(),
            created: Vec::new(),
        }
    }

    /// Runs every stage. On failure, entities created so far are freed.
    pub fn run(mut self) -> Result<EntityKey, LoadError> {
        match self.build() {
            Ok(root) => Ok(root),
            Err(err) => {
                log::warn!(
                    "load aborted ({err}), freeing {} created entities",
                    self.created.len()
                );
                for entity in self.created.drain(..).rev() {
                    if self.scene.is_alive(entity) {
                        self.scene.free(entity);
                    }
                }
                Err(err)
            }
        }
    }

    fn build(&mut self) -> Result<EntityKey, LoadError> {
        self.resolve_descriptors()?;
        self.materialize()?;
        self.restore()?;
        self.attach()?;
        self.entity(0)
    }

    fn resolve_descriptors(&mut self) -> Result<(), LoadError> {
        let data = self.data;
        self.descriptors = data
            .descriptors
            .iter()
            .map(|d| {
                self.scene
                    .load_descriptor(d)
                    .ok_or_else(|| LoadError::UnknownDescriptor(d.clone()))
            })
            .collect::<Result<_, _>>()?;
        Ok(())
    }

    fn materialize(&mut self) -> Result<(), LoadError> {
        let data = self.data;
        let records = data.anchored.len() + data.free.len();
        if data.count as usize != records {
            return Err(LoadError::EntityCount {
                declared: data.count,
                records,
            });
        }
        self.entities = vec![None; records];

        let Some(root) = data.anchored.first().filter(|r| r.id == 0) else {
            return Err(LoadError::MissingRoot);
        };
        let entity = self.materialize_root(root)?;
        self.bind(0, entity)?;

        for record in &data.anchored[1..] {
            let entity = match (&record.descriptor, &record.attach) {
                (Descriptor::Stable, Attach::Path(path)) => {
                    let root = self.root.ok_or(LoadError::StableWithoutRoot(record.id))?;
                    self.scene
                        .entity_at(root, path)
                        .ok_or_else(|| LoadError::UnresolvedPath(path.clone()))?
                }
                (Descriptor::Type(ty), Attach::Parent(_)) => self.instantiate(*ty)?,
                _ => return Err(LoadError::InvalidAttach(record.id)),
            };
            self.bind(record.id, entity)?;
        }

        for record in &data.free {
            let entity = self.instantiate(record.descriptor)?;
            self.bind(record.id, entity)?;
        }

        if let Some(missing) = self.entities.iter().position(Option::is_none) {
            return Err(LoadError::MissingRecord(missing as u32));
        }
        Ok(())
    }

    fn materialize_root(&mut self, record: &AnchoredRecord) -> Result<EntityKey, LoadError> {
        match (self.root, &record.descriptor, &record.attach) {
            (Some(root), Descriptor::Stable, Attach::Path(path)) if path.is_empty() => Ok(root),
            (None, Descriptor::Type(ty), Attach::Detached) => self.instantiate(*ty),
            (Some(_), Descriptor::Type(_), _) => Err(LoadError::ModeMismatch {
                requested: LoadMode::Attached,
                recorded: LoadMode::Detached,
            }),
            (None, Descriptor::Stable, _) => Err(LoadError::ModeMismatch {
                requested: LoadMode::Detached,
                recorded: LoadMode::Attached,
            }),
            _ => Err(LoadError::InvalidAttach(record.id)),
        }
    }

    fn instantiate(&mut self, descriptor: u32) -> Result<EntityKey, LoadError> {
        let ty = self
            .descriptors
            .get(descriptor as usize)
            .ok_or(LoadError::DescriptorOutOfRange(descriptor))?;
        let entity = self.scene.instantiate(ty)?;
        self.created.push(entity);
        Ok(entity)
    }

    fn bind(&mut self, id: u32, entity: EntityKey) -> Result<(), LoadError> {
        match self.entities.get_mut(id as usize) {
            None => Err(LoadError::IdOutOfRange(id as u64)),
            Some(Some(_)) => Err(LoadError::DuplicateId(id)),
            Some(slot) => {
                *slot = Some(entity);
                Ok(())
            }
        }
    }

    fn restore(&mut self) -> Result<(), LoadError> {
        let data = self.data;
        for record in &data.anchored {
            self.restore_fields(record.id, &record.fields)?;
        }
        for record in &data.free {
            self.restore_fields(record.id, &record.fields)?;
        }
        Ok(())
    }

    fn attach(&mut self) -> Result<(), LoadError> {
        let data = self.data;
        for record in data.anchored.iter().skip(1) {
            if let (Descriptor::Type(_), Attach::Parent(parent)) = (&record.descriptor, &record.attach) {
                let parent = self.entity(*parent)?;
                let child = self.entity(record.id)?;
                self.scene.attach(parent, child)?;
            }
        }
        Ok(())
    }
}
