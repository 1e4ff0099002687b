//! Resource Store
//!
//! The path-addressed store of serializable resource records. Every entry is
//! keyed by the 32-bit hash of its virtual file path; a second create or
//! load of the same path returns the existing handle with its refcount
//! bumped instead of duplicating the data.
//!
//! The store holds *data*, not GPU objects — the typed asset registries
//! realize store entries through the graphics backend and release their
//! store reference when the asset is destroyed.

use slotmap::new_key_type;

use crate::error::{EngineError, Result};
use crate::hash::PathHash;
use crate::registry::{RefRegistry, Release};
use crate::resources::ResourceData;

new_key_type! {
    /// Handle to a resource store entry.
    pub struct ResourceHandle;
}

/// One store slot: the path it was created under and its payload.
///
/// The payload is `None` between `create_resource` and the typed layer
/// attaching data (inline create) or deserialization (load).
pub struct ResourceEntry {
    pub path: String,
    pub data: Option<ResourceData>,
}

/// Introspection record returned by [`ResourceStore::info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo {
    pub path: String,
    pub refs: u32,
}

pub struct ResourceStore {
    registry: RefRegistry<ResourceHandle, ResourceEntry>,
}

impl ResourceStore {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: RefRegistry::new("resource", capacity),
        }
    }

    /// Find-or-create by path. Returns the handle and whether the entry is
    /// fresh (refcount was 1 on return).
    ///
    /// On a hash hit the literal path is compared; two distinct paths
    /// sharing a hash is reported as [`EngineError::HashCollision`] instead
    /// of silently aliasing.
    pub fn create(&mut self, path: &str) -> Result<(ResourceHandle, bool)> {
        let hash = PathHash::of(path);
        if let Some(handle) = self.registry.find(hash) {
            if let Some(entry) = self.registry.get(handle)
                && entry.path != path
            {
                return Err(EngineError::HashCollision {
                    path: path.to_owned(),
                    existing: entry.path.clone(),
                    hash,
                });
            }
            self.registry.retain(handle);
            return Ok((handle, false));
        }
        let handle = self.registry.insert(
            hash,
            ResourceEntry {
                path: path.to_owned(),
                data: None,
            },
        )?;
        Ok((handle, true))
    }

    /// Attaches the payload of a freshly created entry.
    ///
    /// Existing-payload entries keep their data: the first writer wins and
    /// the new payload is dropped.
    pub fn attach(&mut self, handle: ResourceHandle, data: ResourceData) {
        match self.registry.get_mut(handle) {
            Some(entry) => {
                if entry.data.is_some() {
                    log::debug!(
                        "resource \"{}\" already has a payload, keeping the resident data",
                        entry.path
                    );
                } else {
                    entry.data = Some(data);
                }
            }
            None => log::warn!("attach: stale resource handle"),
        }
    }

    #[inline]
    #[must_use]
    pub fn find(&self, hash: PathHash) -> Option<ResourceHandle> {
        self.registry.find(hash)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, handle: ResourceHandle) -> Option<&ResourceEntry> {
        self.registry.get(handle)
    }

    #[must_use]
    pub fn hash_of(&self, handle: ResourceHandle) -> Option<PathHash> {
        self.registry.hash_of(handle)
    }

    #[must_use]
    pub fn refs(&self, handle: ResourceHandle) -> Option<u32> {
        self.registry.refs(handle)
    }

    /// Decrements an entry's refcount; the freed entry is handed back at
    /// zero. The slot is reclaimed at the next frame boundary.
    pub fn release(&mut self, handle: ResourceHandle) -> Release<ResourceEntry> {
        self.registry.release(handle)
    }

    /// Number of live entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Iterates live entries as `(hash, refcount, entry)` in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (PathHash, u32, &ResourceEntry)> {
        self.registry
            .iter()
            .filter_map(|(_, hash, refs, entry)| hash.map(|h| (h, refs, entry)))
    }

    /// Path and refcount of every live entry, optionally sorted by path.
    #[must_use]
    pub fn info(&self, sort: bool) -> Vec<ResourceInfo> {
        let mut list: Vec<ResourceInfo> = self
            .iter()
            .map(|(_, refs, entry)| ResourceInfo {
                path: entry.path.clone(),
                refs,
            })
            .collect();
        if sort {
            list.sort_unstable_by(|a, b| a.path.cmp(&b.path));
        }
        list
    }

    pub fn drain_deferred(&mut self) -> usize {
        self.registry.drain_deferred()
    }

    /// Drops every entry. Shutdown only.
    pub fn drain_all(&mut self) -> usize {
        self.registry.drain_all().len()
    }
}
