//! Reference-Counted Slot Registry
//!
//! [`RefRegistry`] is the storage primitive every subsystem is built on: a
//! generation-checked slot map paired with a hash index for deduplication
//! and a per-frame deferred-free queue.
//!
//! # Lifecycle of a slot
//!
//! 1. `insert` allocates a slot with refcount 1 and (optionally) indexes it
//!    by a 32-bit content hash.
//! 2. `find` + `retain` implement the find-or-create dedup pattern: an
//!    existing hash returns the existing key with its refcount bumped.
//! 3. `release` decrements the refcount. At zero the payload is handed back
//!    to the caller for teardown, the hash index entry is removed and the
//!    slot key is queued on the deferred-free list. The slot itself stays
//!    occupied — and its key is never reused — until `drain_deferred` runs
//!    at the next frame boundary, so handles used earlier in the same frame
//!    cannot be invalidated mid-frame.
//!
//! Stale keys (freed and drained) are caught by the slot map's generation
//! counter and surface as `Release::Invalid` / `None` rather than aliasing
//! a recycled slot.

use rustc_hash::FxHashMap;
use slotmap::{Key, SlotMap};

use crate::error::{EngineError, Result};
use crate::hash::PathHash;

struct Slot<T> {
    hash: Option<PathHash>,
    refs: u32,
    /// `None` once released and awaiting the deferred free.
    value: Option<T>,
}

/// Outcome of a [`RefRegistry::release`] call.
#[derive(Debug)]
pub enum Release<T> {
    /// The refcount dropped but other references remain; carries the new count.
    Retained(u32),
    /// The last reference was released; the payload is handed back for teardown.
    Freed(T),
    /// The key was stale, retired or out of range.
    Invalid,
}

/// A fixed-capacity, hash-indexed, reference-counted slot table.
pub struct RefRegistry<K: Key, T> {
    kind: &'static str,
    capacity: usize,
    slots: SlotMap<K, Slot<T>>,
    index: FxHashMap<PathHash, K>,
    pending: Vec<K>,
}

impl<K: Key, T> RefRegistry<K, T> {
    #[must_use]
    pub fn new(kind: &'static str, capacity: usize) -> Self {
        Self {
            kind,
            capacity,
            slots: SlotMap::with_capacity_and_key(capacity),
            index: FxHashMap::default(),
            pending: Vec::new(),
        }
    }

    /// Registry name used in diagnostics.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Looks up a key by content hash.
    #[inline]
    #[must_use]
    pub fn find(&self, hash: PathHash) -> Option<K> {
        self.index.get(&hash).copied()
    }

    /// Inserts a hash-indexed entry with refcount 1.
    ///
    /// Callers must check [`find`](Self::find) first; an already-indexed
    /// hash is a logic error and is reported as `DuplicateEntry`.
    pub fn insert(&mut self, hash: PathHash, value: T) -> Result<K> {
        if self.index.contains_key(&hash) {
            return Err(EngineError::DuplicateEntry {
                kind: self.kind,
                hash,
            });
        }
        let key = self.insert_slot(Some(hash), value)?;
        self.index.insert(hash, key);
        Ok(key)
    }

    /// Inserts an entry that has no content hash (entities, components).
    pub fn insert_unkeyed(&mut self, value: T) -> Result<K> {
        self.insert_slot(None, value)
    }

    fn insert_slot(&mut self, hash: Option<PathHash>, value: T) -> Result<K> {
        // Retired-but-undrained slots still count against capacity.
        if self.slots.len() >= self.capacity {
            return Err(EngineError::CapacityExhausted {
                kind: self.kind,
                capacity: self.capacity,
            });
        }
        Ok(self.slots.insert(Slot {
            hash,
            refs: 1,
            value: Some(value),
        }))
    }

    /// Bumps the refcount of a live entry; returns the new count.
    pub fn retain(&mut self, key: K) -> Option<u32> {
        let slot = self.slots.get_mut(key)?;
        slot.value.as_ref()?;
        slot.refs += 1;
        Some(slot.refs)
    }

    /// Decrements the refcount. At zero the payload is taken out, the hash
    /// index entry removed, and the slot queued for the next
    /// [`drain_deferred`](Self::drain_deferred).
    pub fn release(&mut self, key: K) -> Release<T> {
        let Some(slot) = self.slots.get_mut(key) else {
            return Release::Invalid;
        };
        let Some(value) = slot.value.take() else {
            return Release::Invalid;
        };
        if slot.refs > 1 {
            slot.refs -= 1;
            slot.value = Some(value);
            return Release::Retained(slot.refs);
        }
        slot.refs = 0;
        if let Some(hash) = slot.hash {
            self.index.remove(&hash);
        }
        self.pending.push(key);
        Release::Freed(value)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: K) -> Option<&T> {
        self.slots.get(key).and_then(|slot| slot.value.as_ref())
    }

    #[inline]
    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        self.slots.get_mut(key).and_then(|slot| slot.value.as_mut())
    }

    /// Refcount of a live entry.
    #[must_use]
    pub fn refs(&self, key: K) -> Option<u32> {
        let slot = self.slots.get(key)?;
        slot.value.as_ref()?;
        Some(slot.refs)
    }

    /// Content hash of a live entry, if it was hash-indexed.
    #[must_use]
    pub fn hash_of(&self, key: K) -> Option<PathHash> {
        let slot = self.slots.get(key)?;
        slot.value.as_ref()?;
        slot.hash
    }

    /// Number of live (non-retired) entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.pending.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates live entries as `(key, hash, refcount, payload)`.
    pub fn iter(&self) -> impl Iterator<Item = (K, Option<PathHash>, u32, &T)> {
        self.slots
            .iter()
            .filter_map(|(key, slot)| slot.value.as_ref().map(|v| (key, slot.hash, slot.refs, v)))
    }

    /// Frees every slot released since the last drain. Runs once per frame,
    /// after the frame's submissions are complete.
    pub fn drain_deferred(&mut self) -> usize {
        let count = self.pending.len();
        for key in self.pending.drain(..) {
            self.slots.remove(key);
        }
        count
    }

    /// Takes every live payload out and clears the registry. Used by
    /// shutdown teardown; the caller destroys whatever the payloads own.
    pub fn drain_all(&mut self) -> Vec<T> {
        self.index.clear();
        self.pending.clear();
        let mut values = Vec::with_capacity(self.slots.len());
        for (_, slot) in self.slots.drain() {
            if let Some(value) = slot.value {
                values.push(value);
            }
        }
        values
    }
}
