use alloc::vec::Vec;

use vc_scene::{EntityKey, SceneAccess};

use crate::builder::LoadContext;
use crate::error::{LoadError, SaveError};
use crate::format::SaveData;
use crate::indexer::index_graph;
use crate::resolver::SaveContext;

// -----------------------------------------------------------------------------
// SaveOptions

/// Runtime configuration of a [`Persister`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveOptions {
    /// Store the name of every field next to its value.
    ///
    /// Costs one value-table reference per field, but a load then
    /// reports [`LoadError::FieldRenamed`] when fields were reordered
    /// or removed instead of silently assigning values to the wrong
    /// fields. Data saved without tags always loads unchecked.
    pub field_tags: bool,
}

// -----------------------------------------------------------------------------
// Persister

/// Saves and loads entity graphs.
///
/// Every call builds its own tables, so one `Persister` can be reused
/// for any number of operations.
///
/// # Example
///
/// ```
/// use vc_save::{Persister, SaveOptions};
///
/// let persister = Persister::with_options(SaveOptions { field_tags: true });
/// assert!(persister.options().field_tags);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Persister {
    options: SaveOptions,
}

impl Persister {
    #[inline]
    pub const fn new() -> Self {
        Self {
            options: SaveOptions { field_tags: false },
        }
    }

    #[inline]
    pub const fn with_options(options: SaveOptions) -> Self {
        Self { options }
    }

    #[inline]
    pub const fn options(&self) -> &SaveOptions {
        &self.options
    }

    /// Encodes `root` and everything persistable reachable from it.
    pub fn save<S: SceneAccess + ?Sized>(
        &self,
        scene: &S,
        root: EntityKey,
    ) -> Result<SaveData, SaveError> {
        let ids = index_graph(scene, root)?;
        let anchored_count = ids.len();
        let mut ctx = SaveContext::new(scene, root, ids, self.options);

        // Encoding a record may register further free entities, which
        // are picked up by the same walk.
        let mut anchored = Vec::with_capacity(anchored_count);
        let mut free = Vec::new();
        let mut next = 0;
        while let Some(entity) = ctx.ids.entity(next) {
            let id = next as u32;
            if next < anchored_count {
                anchored.push(ctx.encode_anchored(id, entity)?);
            } else {
                free.push(ctx.encode_free(id, entity)?);
            }
            next += 1;
        }

        let data = SaveData {
            count: ctx.ids.len() as u32,
            anchored,
            free,
            descriptors: ctx.descriptors.into_keys(),
            values: ctx.values.into_entries(),
        };

        #[cfg(all(debug_assertions, feature = "debug"))]
        data.validate().map_err(SaveError::Corrupt)?;

        log::debug!(
            "saved {} entities ({} free), {} values, {} types",
            data.count,
            data.free.len(),
            data.values.len(),
            data.descriptors.len(),
        );
        Ok(data)
    }

    /// Rebuilds the graph stored in `data`.
    ///
    /// With `Some(root)` the save must have been taken from a stable
    /// root, which is reused; with `None` it must have a rebuildable
    /// root, which is created and returned. Either way the root is
    /// returned.
    ///
    /// Rebuildable entities already present under `root` are left
    /// alone; call [`detach_and_free`](Self::detach_and_free) first to
    /// replace them.
    pub fn load<S: SceneAccess + ?Sized>(
        &self,
        scene: &mut S,
        data: &SaveData,
        root: Option<EntityKey>,
    ) -> Result<EntityKey, LoadError> {
        let root = LoadContext::new(scene, data, root).run()?;
        log::debug!(
            "loaded {} entities ({} free)",
            data.count,
            data.free.len()
        );
        Ok(root)
    }

    /// See [`detach_and_free`](crate::detach_and_free).
    #[inline]
    pub fn detach_and_free<S: SceneAccess + ?Sized>(
        &self,
        scene: &mut S,
        root: EntityKey,
    ) -> Result<usize, SaveError> {
        crate::teardown::detach_and_free(scene, root)
    }
}

// -----------------------------------------------------------------------------
// Shortcuts

/// [`Persister::save`] with default options.
#[inline]
pub fn save<S: SceneAccess + ?Sized>(scene: &S, root: EntityKey) -> Result<SaveData, SaveError> {
    Persister::new().save(scene, root)
}

/// [`Persister::load`] with default options.
#[inline]
pub fn load<S: SceneAccess + ?Sized>(
    scene: &mut S,
    data: &SaveData,
    root: Option<EntityKey>,
) -> Result<EntityKey, LoadError> {
    Persister::new().load(scene, data, root)
}

// -----------------------------------------------------------------------------
// Tests
