use vc_scene::{EntityKey, EntityKind, PersistMode, SceneAccess, Value, WeakRef};

use crate::builder::LoadContext;
use crate::error::{LoadError, SaveError};
use crate::format::{Code, Scalar};
use crate::persister::SaveOptions;
use crate::table::{DescriptorTable, IdentityTable, ValueTable};

// -----------------------------------------------------------------------------
// SaveContext

/// Everything one save needs to resolve references and values.
///
/// Lives exactly as long as one call to [`Persister::save`].
///
/// [`Persister::save`]: crate::Persister::save
pub(crate) struct SaveContext<'a, S: SceneAccess + ?Sized> {
    pub scene: &'a S,
    pub root: EntityKey,
    pub options: SaveOptions,
    pub ids: IdentityTable,
    pub values: ValueTable,
    pub descriptors: DescriptorTable,
}

impl<'a, S: SceneAccess + ?Sized> SaveContext<'a, S> {
    pub fn new(scene: &'a S, root: EntityKey, ids: IdentityTable, options: SaveOptions) -> Self {
        Self {
            scene,
            root,
            options,
            ids,
            values: ValueTable::default(),
            descriptors: DescriptorTable::default(),
        }
    }

    /// Returns the id of `entity`, registering it as a free entity if
    /// this is the first reference to it.
    pub fn resolve_or_register(&mut self, entity: EntityKey) -> Result<u32, SaveError> {
        if let Some(id) = self.ids.get(entity) {
            return Ok(id);
        }
        if !self.scene.is_alive(entity) {
            return Err(SaveError::DeadReference(entity));
        }
        match (self.scene.persist_mode(entity), self.scene.kind(entity)) {
            (PersistMode::NotPersisted, _) => Err(SaveError::NotPersistable(entity)),
            (PersistMode::Rebuildable, Some(EntityKind::Object)) => {
                let id = self.ids.register(entity)?;
                log::trace!("free entity {entity:?} registered as {id}");
                Ok(id)
            }
            _ => Err(SaveError::OutsideTree(entity)),
        }
    }

    #[inline]
    pub fn encode_strong(&mut self, entity: EntityKey) -> Result<Code, SaveError> {
        self.resolve_or_register(entity).map(Code::Strong)
    }

    /// A dead target encodes to [`Code::WeakDead`] whatever the table state.
    pub fn encode_weak(&mut self, weak: WeakRef) -> Result<Code, SaveError> {
        if self.scene.is_alive(weak.key()) {
            self.resolve_or_register(weak.key()).map(Code::Weak)
        } else {
            Ok(Code::WeakDead)
        }
    }

    #[inline]
    pub fn encode_scalar(&mut self, scalar: Scalar) -> Result<Code, SaveError> {
        self.values.intern(scalar).map(Code::Value)
    }
}

// -----------------------------------------------------------------------------
// Decoding

impl<S: SceneAccess + ?Sized> LoadContext<'_, S> {
    /// The live entity bound to `id`.
    pub fn entity(&self, id: u32) -> Result<EntityKey, LoadError> {
        match self.entities.get(id as usize) {
            Some(Some(entity)) => Ok(*entity),
            Some(None) => Err(LoadError::MissingRecord(id)),
            None => Err(LoadError::IdOutOfRange(id as u64)),
        }
    }

    pub fn decode_code(&self, raw: u64) -> Result<Value, LoadError> {
        match Code::from_raw(raw).ok_or(LoadError::InvalidCode(raw))? {
            Code::Value(index) => self
                .data
                .values
                .get(index as usize)
                .cloned()
                .map(Scalar::into_value)
                .ok_or(LoadError::ValueOutOfRange(index)),
            Code::Strong(id) => self.entity(id).map(Value::Object),
            Code::Weak(id) => self.entity(id).map(|e| Value::Weak(WeakRef::new(e))),
            Code::WeakDead => Ok(Value::Weak(WeakRef::dead())),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::SaveContext;
    use crate::error::SaveError;
    use crate::format::Code;
    use crate::indexer::index_graph;
    use crate::persister::SaveOptions;
    use crate::testing::{Item, Player, world};
    use vc_scene::{PersistMode, SceneAccess, WeakRef};

    #[test]
    fn free_entities_register_lazily() {
        let (mut scene, root) = world();
        let player = scene.spawn(Player::default());
        scene.attach(root, player).unwrap();
        let item = scene.spawn(Item::default());

        let ids = index_graph(&scene, root).unwrap();
        let mut ctx = SaveContext::new(&scene, root, ids, SaveOptions::default());
        assert_eq!(ctx.ids.len(), 2);
        assert_eq!(ctx.encode_strong(item), Ok(Code::Strong(2)));
        assert_eq!(ctx.encode_strong(item), Ok(Code::Strong(2)));
        assert_eq!(ctx.encode_weak(WeakRef::new(player)), Ok(Code::Weak(1)));
        assert_eq!(ctx.ids.len(), 3);
    }

    #[test]
    fn dead_weak_ignores_tables() {
        let (mut scene, root) = world();
        let item = scene.spawn(Item::default());
        scene.free(item);

        let ids = index_graph(&scene, root).unwrap();
        let mut ctx = SaveContext::new(&scene, root, ids, SaveOptions::default());
        assert_eq!(ctx.encode_weak(WeakRef::new(item)), Ok(Code::WeakDead));
        assert_eq!(ctx.encode_weak(WeakRef::dead()), Ok(Code::WeakDead));
        assert_eq!(ctx.encode_strong(item), Err(SaveError::DeadReference(item)));
    }

    #[test]
    fn contract_violations() {
        let (mut scene, root) = world();
        let plain = scene.spawn_node("plain");
        let stray = scene.spawn(Player::default());
        let silent = scene.spawn(Item::default());
        scene.set_persist_mode(silent, Some(PersistMode::NotPersisted)).unwrap();
        assert_eq!(scene.persist_mode(silent), PersistMode::NotPersisted);

        let ids = index_graph(&scene, root).unwrap();
        let mut ctx = SaveContext::new(&scene, root, ids, SaveOptions::default());
        assert_eq!(ctx.encode_strong(plain), Err(SaveError::NotPersistable(plain)));
        assert_eq!(ctx.encode_strong(stray), Err(SaveError::OutsideTree(stray)));
        assert_eq!(ctx.encode_strong(silent), Err(SaveError::NotPersistable(silent)));
    }
}
