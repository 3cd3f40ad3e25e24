use alloc::vec::Vec;

use vc_scene::{EntityKey, EntityKind, PersistMode, SceneAccess};

use crate::error::SaveError;
use crate::table::IdentityTable;

/// Assigns ids to `root` and its persistable descendants.
///
/// Pre-order, depth first, children in their native order; the root
/// gets id `0`. A child that is not persisted hides its whole subtree.
pub(crate) fn index_graph<S: SceneAccess + ?Sized>(
    scene: &S,
    root: EntityKey,
) -> Result<IdentityTable, SaveError> {
    if !scene.is_alive(root) {
        return Err(SaveError::DeadReference(root));
    }
    if !scene.persist_mode(root).is_persisted() || scene.kind(root) != Some(EntityKind::Node) {
        return Err(SaveError::NotPersistable(root));
    }

    let mut table = IdentityTable::default();
    let mut stack = Vec::from([root]);
    while let Some(entity) = stack.pop() {
        table.register(entity)?;
        let mode = scene.persist_mode(entity);
        let first = stack.len();
        for &child in scene.children(entity) {
            match scene.persist_mode(child) {
                PersistMode::NotPersisted => continue,
                PersistMode::Stable if mode == PersistMode::Rebuildable => {
                    return Err(SaveError::StableUnderRebuildable {
                        entity: child,
                        parent: entity,
                    });
                }
                _ => stack.push(child),
            }
        }
        stack[first..].reverse();
    }

    log::trace!("indexed {} anchored entities", table.len());
    Ok(table)
}

// -----------------------------------------------------------------------------
// Tests
