use crate::entity::{EntityKey, EntityKind, PersistMode};
use crate::error::SceneError;
use crate::name::NodePath;
use crate::persist::FieldList;
use crate::registry::TypeKey;
use crate::value::Value;

/// What the save engine needs from the entity runtime.
///
/// Every method takes the entity by key; unknown keys behave like dead
/// entities (no mode, no fields, no relations) on the read side and
/// report [`SceneError::NotFound`] on the write side.
pub trait SceneAccess {
    fn is_alive(&self, entity: EntityKey) -> bool;

    fn kind(&self, entity: EntityKey) -> Option<EntityKind>;

    /// Instance override if present, else the type default, else
    /// [`PersistMode::NotPersisted`].
    fn persist_mode(&self, entity: EntityKey) -> PersistMode;

    /// Declared fields of `entity` under `list`, in declaration order.
    fn field_list(&self, entity: EntityKey, list: FieldList) -> &'static [&'static str];

    fn get_field(&self, entity: EntityKey, field: &str) -> Option<Value>;

    fn set_field(&mut self, entity: EntityKey, field: &str, value: Value)
    -> Result<(), SceneError>;

    fn children(&self, entity: EntityKey) -> &[EntityKey];

    fn parent(&self, entity: EntityKey) -> Option<EntityKey>;

    /// Path leading from `root` down to `entity`, if `entity` is `root`
    /// or one of its descendants.
    fn path_from(&self, root: EntityKey, entity: EntityKey) -> Option<NodePath>;

    fn entity_at(&self, root: EntityKey, path: &NodePath) -> Option<EntityKey>;

    fn type_key_of(&self, entity: EntityKey) -> Option<&TypeKey>;

    /// Resolves a stored descriptor back to a loadable type.
    fn load_descriptor(&self, descriptor: &str) -> Option<TypeKey>;

    /// Creates a new, unattached entity of the given type.
    fn instantiate(&mut self, ty: &TypeKey) -> Result<EntityKey, SceneError>;

    fn attach(&mut self, parent: EntityKey, child: EntityKey) -> Result<(), SceneError>;

    /// Destroys `entity` together with its whole subtree.
    fn free(&mut self, entity: EntityKey);
}
