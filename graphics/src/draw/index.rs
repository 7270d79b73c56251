//! Capped dictionaries mapping batch resources to small shader indices

use std::hash::Hash;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::texture::{TextureViewRef, same_view};

/// Sentinel for "no index assigned"
pub(crate) const INVALID_INDEX: u32 = u32::MAX;

/// Content key to dense index, with at most `capacity` entries per batch.
///
/// Indices are assigned in insertion order starting at zero and are only
/// released all at once by [`IndexDictionary::clear`].
#[derive(Debug)]
pub(crate) struct IndexDictionary<K, V> {
    entries: HashMap<K, (V, u32)>,
    capacity: usize,
}

impl<K: Eq + Hash, V> IndexDictionary<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            capacity,
        }
    }

    /// Index for `key`, inserting `value()` if absent. `INVALID_INDEX` when full.
    pub fn get_or_insert(&mut self, key: K, value: impl FnOnce() -> V) -> u32 {
        if let Some((_, index)) = self.entries.get(&key) {
            return *index;
        }

        if self.entries.len() == self.capacity {
            return INVALID_INDEX;
        }

        let index = self.entries.len() as u32;
        self.entries.insert(key, (value(), index));
        index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V, u32)> {
        self.entries
            .iter()
            .map(|(key, (value, index))| (key, value, *index))
    }
}

/// Texture views bound for one batch, deduplicated by identity
pub(crate) struct TextureSlots {
    views: SmallVec<[TextureViewRef; 32]>,
    capacity: usize,
}

impl TextureSlots {
    pub fn new(capacity: usize) -> Self {
        Self {
            views: SmallVec::new(),
            capacity,
        }
    }

    /// Slot of `view`, adding it if absent. `INVALID_INDEX` when every slot is taken.
    pub fn get_or_insert(&mut self, view: &TextureViewRef) -> u32 {
        // Recently added views are the likeliest match
        if let Some(index) = self.views.iter().rposition(|slot| same_view(slot, view)) {
            return index as u32;
        }

        if self.views.len() == self.capacity {
            return INVALID_INDEX;
        }

        self.views.push(view.clone());
        (self.views.len() - 1) as u32
    }

    pub fn views(&self) -> &[TextureViewRef] {
        &self.views
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn clear(&mut self) {
        self.views.clear();
    }
}
