use alloc::boxed::Box;
use alloc::format;
use alloc::vec::Vec;
use core::any::Any;

use slotmap::SlotMap;

use crate::access::SceneAccess;
use crate::entity::{EntityKey, EntityKind, PersistMode, WeakRef};
use crate::error::SceneError;
use crate::name::{Name, NodePath};
use crate::persist::{FieldList, Persist, PersistType};
use crate::registry::{TypeKey, TypeRegistry};
use crate::value::Value;

// -----------------------------------------------------------------------------
// EntityData

struct EntityData {
    name: Name,
    kind: EntityKind,
    parent: Option<EntityKey>,
    children: Vec<EntityKey>,
    type_key: Option<TypeKey>,
    behaviour: Option<Box<dyn Persist>>,
    mode: Option<PersistMode>,
}

impl EntityData {
    fn new(name: Name, kind: EntityKind) -> Self {
        Self {
            name,
            kind,
            parent: None,
            children: Vec::new(),
            type_key: None,
            behaviour: None,
            mode: None,
        }
    }
}

// -----------------------------------------------------------------------------
// Scene

/// An in-memory entity tree with persistable behaviours.
///
/// Nodes form a hierarchy with uniquely named siblings; objects live
/// beside it and are only reachable through field values.
///
/// # Example
///
/// ```
/// # use vc_scene::{Scene, SceneAccess, TypeRegistry};
/// let mut scene = Scene::new(TypeRegistry::new());
/// let root = scene.spawn_node("root");
/// let a = scene.spawn_node("item");
/// let b = scene.spawn_node("item");
/// scene.attach(root, a).unwrap();
/// scene.attach(root, b).unwrap();
///
/// assert_eq!(scene.name(b).unwrap(), "item2");
/// let path = scene.path_from(root, b).unwrap();
/// assert_eq!(scene.entity_at(root, &path), Some(b));
/// ```
pub struct Scene {
    entities: SlotMap<EntityKey, EntityData>,
    registry: TypeRegistry,
}

impl Scene {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            entities: SlotMap::with_key(),
            registry,
        }
    }

    #[inline]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    #[inline]
    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    /// Number of live entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Spawns a node without behaviour; such nodes are never persisted.
    pub fn spawn_node(&mut self, name: &str) -> EntityKey {
        self.entities
            .insert(EntityData::new(Name::new(name), EntityKind::Node))
    }

    /// Spawns an entity carrying `value`, named after its type.
    #[inline]
    pub fn spawn<T: PersistType>(&mut self, value: T) -> EntityKey {
        self.spawn_named(T::NAME, value)
    }

    pub fn spawn_named<T: PersistType>(&mut self, name: &str, value: T) -> EntityKey {
        let mut data = EntityData::new(Name::new(name), T::KIND);
        data.type_key = Some(T::TYPE_KEY);
        data.behaviour = Some(Box::new(value));
        self.entities.insert(data)
    }

    #[inline]
    pub fn name(&self, entity: EntityKey) -> Option<&Name> {
        self.entities.get(entity).map(|data| &data.name)
    }

    /// Typed access to the behaviour of `entity`.
    pub fn get<T: Persist>(&self, entity: EntityKey) -> Option<&T> {
        let behaviour: &dyn Any = self.entities.get(entity)?.behaviour.as_deref()?;
        behaviour.downcast_ref::<T>()
    }

    pub fn get_mut<T: Persist>(&mut self, entity: EntityKey) -> Option<&mut T> {
        let behaviour: &mut dyn Any = self.entities.get_mut(entity)?.behaviour.as_deref_mut()?;
        behaviour.downcast_mut::<T>()
    }

    /// Sets or clears the instance-level persist mode override.
    pub fn set_persist_mode(
        &mut self,
        entity: EntityKey,
        mode: Option<PersistMode>,
    ) -> Result<(), SceneError> {
        let data = self
            .entities
            .get_mut(entity)
            .ok_or(SceneError::NotFound(entity))?;
        data.mode = mode;
        Ok(())
    }

    /// Resolves a weak handle to its target if that is still alive.
    #[inline]
    pub fn resolve(&self, weak: WeakRef) -> Option<EntityKey> {
        self.entities.contains_key(weak.key()).then_some(weak.key())
    }

    /// Removes `child` from its parent, keeping it alive.
    pub fn detach(&mut self, child: EntityKey) -> Result<(), SceneError> {
        let data = self
            .entities
            .get_mut(child)
            .ok_or(SceneError::NotFound(child))?;
        if let Some(parent) = data.parent.take()
            && let Some(parent) = self.entities.get_mut(parent)
        {
            parent.children.retain(|&c| c != child);
        }
        Ok(())
    }

    fn unique_child_name(&self, parent: EntityKey, base: &Name) -> Name {
        let taken = |name: &str| {
            self.entities[parent]
                .children
                .iter()
                .any(|&c| self.entities[c].name == *name)
        };
        if !taken(base.as_str()) {
            return base.clone();
        }
        let mut suffix = 2_usize;
        loop {
            let candidate = format!("{base}{suffix}");
            if !taken(candidate.as_str()) {
                return Name::from(candidate);
            }
            suffix += 1;
        }
    }
}

impl SceneAccess for Scene {
    #[inline]
    fn is_alive(&self, entity: EntityKey) -> bool {
        self.entities.contains_key(entity)
    }

    #[inline]
    fn kind(&self, entity: EntityKey) -> Option<EntityKind> {
        self.entities.get(entity).map(|data| data.kind)
    }

    fn persist_mode(&self, entity: EntityKey) -> PersistMode {
        let Some(data) = self.entities.get(entity) else {
            return PersistMode::NotPersisted;
        };
        data.mode
            .or_else(|| data.behaviour.as_ref().map(|b| b.persist_mode()))
            .unwrap_or_default()
    }

    fn field_list(&self, entity: EntityKey, list: FieldList) -> &'static [&'static str] {
        match self.entities.get(entity).and_then(|d| d.behaviour.as_ref()) {
            Some(behaviour) => behaviour.fields(list),
            None => &[],
        }
    }

    fn get_field(&self, entity: EntityKey, field: &str) -> Option<Value> {
        self.entities.get(entity)?.behaviour.as_ref()?.get(field)
    }

    fn set_field(
        &mut self,
        entity: EntityKey,
        field: &str,
        value: Value,
    ) -> Result<(), SceneError> {
        let data = self
            .entities
            .get_mut(entity)
            .ok_or(SceneError::NotFound(entity))?;
        let behaviour = data
            .behaviour
            .as_mut()
            .ok_or(SceneError::NoBehaviour(entity))?;
        behaviour
            .set(field, value)
            .map_err(|source| SceneError::Field { entity, source })
    }

    fn children(&self, entity: EntityKey) -> &[EntityKey] {
        match self.entities.get(entity) {
            Some(data) => &data.children,
            None => &[],
        }
    }

    #[inline]
    fn parent(&self, entity: EntityKey) -> Option<EntityKey> {
        self.entities.get(entity)?.parent
    }

    fn path_from(&self, root: EntityKey, entity: EntityKey) -> Option<NodePath> {
        let mut names = Vec::new();
        let mut current = entity;
        while current != root {
            let data = self.entities.get(current)?;
            names.push(data.name.clone());
            current = data.parent?;
        }
        names.reverse();
        Some(names.into_iter().collect())
    }

    fn entity_at(&self, root: EntityKey, path: &NodePath) -> Option<EntityKey> {
        let mut current = root;
        if !self.entities.contains_key(current) {
            return None;
        }
        for name in path.names() {
            current = *self.entities[current]
                .children
                .iter()
                .find(|&&c| self.entities[c].name == *name)?;
        }
        Some(current)
    }

    #[inline]
    fn type_key_of(&self, entity: EntityKey) -> Option<&TypeKey> {
        self.entities.get(entity)?.type_key.as_ref()
    }

    fn load_descriptor(&self, descriptor: &str) -> Option<TypeKey> {
        self.registry.get(descriptor).map(|entry| entry.key.clone())
    }

    fn instantiate(&mut self, ty: &TypeKey) -> Result<EntityKey, SceneError> {
        let entry = self
            .registry
            .get(ty.as_str())
            .ok_or_else(|| SceneError::UnknownType(ty.as_str().into()))?;
        let mut data = EntityData::new(Name::new(entry.name), entry.kind);
        data.type_key = Some(entry.key.clone());
        data.behaviour = Some((entry.create)());
        let setup = entry.setup;

        let entity = self.entities.insert(data);
        if let Some(setup) = setup {
            setup(self, entity);
        }
        log::trace!("instantiated {ty} as {entity:?}");
        Ok(entity)
    }

    fn attach(&mut self, parent: EntityKey, child: EntityKey) -> Result<(), SceneError> {
        for key in [parent, child] {
            match self.entities.get(key) {
                None => return Err(SceneError::NotFound(key)),
                Some(data) if data.kind != EntityKind::Node => {
                    return Err(SceneError::NotANode(key));
                }
                Some(_) => {}
            }
        }
        if self.entities[child].parent.is_some() {
            return Err(SceneError::AlreadyAttached(child));
        }
        let mut ancestor = Some(parent);
        while let Some(current) = ancestor {
            if current == child {
                return Err(SceneError::Cycle { parent, child });
            }
            ancestor = self.entities[current].parent;
        }

        let name = self.unique_child_name(parent, &self.entities[child].name);
        let data = &mut self.entities[child];
        data.name = name;
        data.parent = Some(parent);
        self.entities[parent].children.push(child);
        Ok(())
    }

    fn free(&mut self, entity: EntityKey) {
        if self.detach(entity).is_err() {
            return;
        }
        let mut removed = 0_usize;
        let mut stack = Vec::from([entity]);
        while let Some(current) = stack.pop() {
            if let Some(data) = self.entities.remove(current) {
                stack.extend(data.children);
                removed += 1;
            }
        }
        log::trace!("freed {entity:?} with {} descendants", removed - 1);
    }
}

impl core::fmt::Debug for Scene {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scene")
            .field("entities", &self.entities.len())
            .field("types", &self.registry.len())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests
