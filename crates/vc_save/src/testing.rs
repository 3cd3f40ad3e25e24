//! Behaviours shared by the unit tests of this crate.

use alloc::string::String;

use vc_scene::{
    Array, ElementType, EntityKey, EntityKind, FieldError, FieldList, Name, Persist, PersistMode,
    PersistType, Scene, TypeKey, TypeRegistry, Value, WeakRef,
};

#[inline]
fn assign<T: TryFrom<Value, Error = vc_scene::ValueError>>(
    slot: &mut T,
    field: &str,
    value: Value,
) -> Result<(), FieldError> {
    *slot = value.try_into().map_err(|e| FieldError::kind(field, e))?;
    Ok(())
}

// -----------------------------------------------------------------------------
// Level

/// Stable node; the usual save root.
#[derive(Default)]
pub struct Level {
    pub title: String,
    pub boss: Option<EntityKey>,
}

impl Persist for Level {
    fn persist_mode(&self) -> PersistMode {
        PersistMode::Stable
    }

    fn fields(&self, list: FieldList) -> &'static [&'static str] {
        match list {
            FieldList::Properties => &["title"],
            FieldList::ObjectProperties => &["boss"],
        }
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "title" => Some(Value::String(self.title.clone())),
            "boss" => Some(self.boss.into()),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), FieldError> {
        match field {
            "title" => assign(&mut self.title, field, value),
            "boss" => assign(&mut self.boss, field, value),
            _ => Err(FieldError::unknown(field)),
        }
    }
}

impl PersistType for Level {
    const TYPE_KEY: TypeKey = TypeKey::new("test::Level");
    const KIND: EntityKind = EntityKind::Node;
    const NAME: &'static str = "Level";
}

// -----------------------------------------------------------------------------
// Player

/// Rebuildable node.
pub struct Player {
    pub score: i64,
    pub tag: Name,
    pub inventory: Option<EntityKey>,
    /// Only holds players.
    pub party: Array,
    pub rival: WeakRef,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            score: 0,
            tag: Name::default(),
            inventory: None,
            party: Array::typed(ElementType::class(Player::TYPE_KEY)),
            rival: WeakRef::dead(),
        }
    }
}

impl Persist for Player {
    fn fields(&self, list: FieldList) -> &'static [&'static str] {
        match list {
            FieldList::Properties => &["score", "tag"],
            FieldList::ObjectProperties => &["inventory", "party", "rival"],
        }
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "score" => Some(Value::Int(self.score)),
            "tag" => Some(Value::Name(self.tag.clone())),
            "inventory" => Some(self.inventory.into()),
            "party" => Some(Value::Array(self.party.clone())),
            "rival" => Some(Value::Weak(self.rival)),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), FieldError> {
        match field {
            "score" => assign(&mut self.score, field, value),
            "tag" => assign(&mut self.tag, field, value),
            "inventory" => assign(&mut self.inventory, field, value),
            "party" => assign(&mut self.party, field, value),
            "rival" => assign(&mut self.rival, field, value),
            _ => Err(FieldError::unknown(field)),
        }
    }
}

impl PersistType for Player {
    const TYPE_KEY: TypeKey = TypeKey::new("test::Player");
    const KIND: EntityKind = EntityKind::Node;
    const NAME: &'static str = "Player";
}

// -----------------------------------------------------------------------------
// Item

/// Rebuildable object, only reachable through references.
pub struct Item {
    pub label: String,
    pub owner: WeakRef,
    pub link: Option<EntityKey>,
}

impl Default for Item {
    fn default() -> Self {
        Self {
            label: String::new(),
            owner: WeakRef::dead(),
            link: None,
        }
    }
}

impl Persist for Item {
    fn fields(&self, list: FieldList) -> &'static [&'static str] {
        match list {
            FieldList::Properties => &["label"],
            FieldList::ObjectProperties => &["owner", "link"],
        }
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "label" => Some(Value::String(self.label.clone())),
            "owner" => Some(Value::Weak(self.owner)),
            "link" => Some(self.link.into()),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), FieldError> {
        match field {
            "label" => assign(&mut self.label, field, value),
            "owner" => assign(&mut self.owner, field, value),
            "link" => assign(&mut self.link, field, value),
            _ => Err(FieldError::unknown(field)),
        }
    }
}

impl PersistType for Item {
    const TYPE_KEY: TypeKey = TypeKey::new("test::Item");
    const KIND: EntityKind = EntityKind::Object;
    const NAME: &'static str = "Item";
}

// -----------------------------------------------------------------------------
// Stash

/// Rebuildable object with untyped fields.
#[derive(Default)]
pub struct Stash {
    pub any: Value,
    pub more: Value,
    pub spare: Value,
}

impl Persist for Stash {
    fn fields(&self, list: FieldList) -> &'static [&'static str] {
        match list {
            FieldList::Properties => &[],
            FieldList::ObjectProperties => &["any", "more", "spare"],
        }
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "any" => Some(self.any.clone()),
            "more" => Some(self.more.clone()),
            "spare" => Some(self.spare.clone()),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), FieldError> {
        match field {
            "any" => self.any = value,
            "more" => self.more = value,
            "spare" => self.spare = value,
            _ => return Err(FieldError::unknown(field)),
        }
        Ok(())
    }
}

impl PersistType for Stash {
    const TYPE_KEY: TypeKey = TypeKey::new("test::Stash");
    const KIND: EntityKind = EntityKind::Object;
    const NAME: &'static str = "Stash";
}

// -----------------------------------------------------------------------------
// Shelf

/// Stable node holding one untyped value.
#[derive(Default)]
pub struct Shelf {
    pub held: Value,
}

impl Persist for Shelf {
    fn persist_mode(&self) -> PersistMode {
        PersistMode::Stable
    }

    fn fields(&self, list: FieldList) -> &'static [&'static str] {
        match list {
            FieldList::Properties => &[],
            FieldList::ObjectProperties => &["held"],
        }
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "held" => Some(self.held.clone()),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), FieldError> {
        match field {
            "held" => self.held = value,
            _ => return Err(FieldError::unknown(field)),
        }
        Ok(())
    }
}

impl PersistType for Shelf {
    const TYPE_KEY: TypeKey = TypeKey::new("test::Shelf");
    const KIND: EntityKind = EntityKind::Node;
    const NAME: &'static str = "Shelf";
}

// -----------------------------------------------------------------------------
// Chest

/// Successive layouts of one type, all registered as `test::Chest`.
macro_rules! chest {
    ($name:ident, [$($field:literal),*]) => {
        pub struct $name {
            pub a: i64,
            pub b: i64,
            pub c: i64,
        }

        impl Default for $name {
            fn default() -> Self {
                Self { a: 0, b: 0, c: 99 }
            }
        }

        impl Persist for $name {
            fn fields(&self, list: FieldList) -> &'static [&'static str] {
                match list {
                    FieldList::Properties => &[$($field),*],
                    FieldList::ObjectProperties => &[],
                }
            }

            fn get(&self, field: &str) -> Option<Value> {
                match field {
                    "a" => Some(Value::Int(self.a)),
                    "b" => Some(Value::Int(self.b)),
                    "c" => Some(Value::Int(self.c)),
                    _ => None,
                }
            }

            fn set(&mut self, field: &str, value: Value) -> Result<(), FieldError> {
                match field {
                    "a" => assign(&mut self.a, field, value),
                    "b" => assign(&mut self.b, field, value),
                    "c" => assign(&mut self.c, field, value),
                    _ => Err(FieldError::unknown(field)),
                }
            }
        }

        impl PersistType for $name {
            const TYPE_KEY: TypeKey = TypeKey::new("test::Chest");
            const KIND: EntityKind = EntityKind::Node;
            const NAME: &'static str = "Chest";
        }
    };
}

chest!(ChestV1, ["a", "b"]);
chest!(ChestV2, ["a", "b", "c"]);
chest!(ChestSwapped, ["b", "a"]);

// -----------------------------------------------------------------------------
// Fixtures

pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register::<Level>();
    registry.register::<Player>();
    registry.register::<Item>();
    registry.register::<Stash>();
    registry.register::<Shelf>();
    registry.register::<ChestV1>();
    registry
}

/// A scene holding a single stable root named `root`.
pub fn world() -> (Scene, EntityKey) {
    let mut scene = Scene::new(registry());
    let root = scene.spawn_named("root", Level::default());
    (scene, root)
}
