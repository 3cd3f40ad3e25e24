use alloc::vec::Vec;

use hashbrown::HashSet;
use vc_scene::{EntityKey, EntityKind, FieldList, PersistMode, SceneAccess, Value, WeakRef};

use crate::error::SaveError;
use crate::indexer::index_graph;

/// Frees every rebuildable entity a save of `root` would record.
///
/// The graph is discovered the same way [`save`](crate::save) discovers
/// it: anchored entities by traversal, free entities through strong and
/// weak field references. Before anything is freed, every reference to
/// a doomed entity is cleared from every visited entity, including
/// inside arrays and dictionaries, so cycles among free entities cannot
/// outlive the call.
///
/// Stable entities, `root` included, survive with their references
/// cleared. Returns the number of entities freed, not counting
/// unpersisted descendants that go with their parent.
pub fn detach_and_free<S: SceneAccess + ?Sized>(
    scene: &mut S,
    root: EntityKey,
) -> Result<usize, SaveError> {
    let mut graph = index_graph(scene, root)?;
    let anchored = graph.len();

    let mut targets = Vec::new();
    let mut next = 0;
    while let Some(entity) = graph.entity(next) {
        for list in FieldList::ALL {
            for &field in scene.field_list(entity, list) {
                if let Some(value) = scene.get_field(entity, field) {
                    collect_references(&value, &mut targets);
                }
            }
        }
        for target in targets.drain(..) {
            if graph.get(target).is_none() && is_free(scene, target) {
                graph.register(target)?;
            }
        }
        next += 1;
    }

    let doomed: HashSet<EntityKey> = (0..graph.len())
        .filter_map(|id| graph.entity(id))
        .filter(|&entity| scene.persist_mode(entity) == PersistMode::Rebuildable)
        .collect();

    for id in 0..graph.len() {
        let Some(entity) = graph.entity(id) else {
            continue;
        };
        for list in FieldList::ALL {
            for &field in scene.field_list(entity, list) {
                let Some(mut value) = scene.get_field(entity, field) else {
                    continue;
                };
                if sever(&mut value, &doomed) {
                    scene.set_field(entity, field, value)?;
                }
            }
        }
    }

    for id in 0..graph.len() {
        let Some(entity) = graph.entity(id) else {
            continue;
        };
        if !doomed.contains(&entity) || !scene.is_alive(entity) {
            continue;
        }
        // Anchored entities go with their topmost doomed ancestor.
        let topmost = id >= anchored || scene.parent(entity).is_none_or(|p| !doomed.contains(&p));
        if topmost {
            scene.free(entity);
        }
    }

    log::debug!(
        "freed {} rebuildable entities ({} free)",
        doomed.len(),
        graph.len() - anchored
    );
    Ok(doomed.len())
}

#[inline]
fn is_free<S: SceneAccess + ?Sized>(scene: &S, entity: EntityKey) -> bool {
    scene.is_alive(entity)
        && scene.kind(entity) == Some(EntityKind::Object)
        && scene.persist_mode(entity) == PersistMode::Rebuildable
}

fn collect_references(value: &Value, out: &mut Vec<EntityKey>) {
    match value {
        Value::Object(entity) => out.push(*entity),
        Value::Weak(weak) => out.push(weak.key()),
        Value::Array(array) => array.iter().for_each(|v| collect_references(v, out)),
        Value::Dict(dict) => dict.iter().for_each(|(k, v)| {
            collect_references(k, out);
            collect_references(v, out);
        }),
        _ => {}
    }
}

#[inline]
fn targets_doomed(value: &Value, doomed: &HashSet<EntityKey>) -> bool {
    match value {
        Value::Object(entity) => doomed.contains(entity),
        Value::Weak(weak) => doomed.contains(&weak.key()),
        _ => false,
    }
}

fn contains_doomed(value: &Value, doomed: &HashSet<EntityKey>) -> bool {
    match value {
        Value::Array(array) => array.iter().any(|v| contains_doomed(v, doomed)),
        Value::Dict(dict) => dict
            .iter()
            .any(|(k, v)| contains_doomed(k, doomed) || contains_doomed(v, doomed)),
        _ => targets_doomed(value, doomed),
    }
}

/// Clears references to `doomed` in place, at any depth. Returns `true`
/// if anything changed.
///
/// Fields are reset to nil or a dead weak handle, container elements
/// and dictionary entries are dropped. Keys cannot be edited, so an
/// entry goes if its key holds a doomed reference anywhere inside.
fn sever(value: &mut Value, doomed: &HashSet<EntityKey>) -> bool {
    match value {
        Value::Object(entity) if doomed.contains(entity) => {
            *value = Value::Nil;
            true
        }
        Value::Weak(weak) if doomed.contains(&weak.key()) => {
            *value = Value::Weak(WeakRef::dead());
            true
        }
        Value::Array(array) => {
            let mut changed = false;
            array.retain_mut(|v| {
                if targets_doomed(v, doomed) {
                    changed = true;
                    return false;
                }
                changed |= sever_inner(v, doomed);
                true
            });
            changed
        }
        Value::Dict(dict) => {
            let mut changed = false;
            dict.retain_mut(|k, v| {
                if contains_doomed(k, doomed) || targets_doomed(v, doomed) {
                    changed = true;
                    return false;
                }
                changed |= sever_inner(v, doomed);
                true
            });
            changed
        }
        _ => false,
    }
}

/// Recurses into nested containers only; direct references were handled
/// by the caller.
#[inline]
fn sever_inner(value: &mut Value, doomed: &HashSet<EntityKey>) -> bool {
    match value {
        Value::Array(_) | Value::Dict(_) => sever(value, doomed),
        _ => false,
    }
}

// -----------------------------------------------------------------------------
// Tests
