#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// no_std support

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod access;
mod entity;
mod error;
mod name;
mod persist;
mod registry;
mod scene;
mod value;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use access::SceneAccess;
pub use entity::{EntityKey, EntityKind, PersistMode, WeakRef};
pub use error::{FieldError, SceneError, ValueError};
pub use name::{Name, NodePath};
pub use persist::{FieldList, Persist, PersistType};
pub use registry::{TypeEntry, TypeKey, TypeRegistry};
pub use scene::Scene;
pub use value::{Array, Callable, Dict, ElementType, Value, ValueKind};

#[doc(hidden)]
pub mod __macro_exports {
    #[cfg(feature = "auto_register")]
    pub use inventory;

    pub use crate::registry::AutoRegister;
}
