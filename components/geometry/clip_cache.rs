/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use rustc_hash::FxHashMap;

use crate::OverlayScrollbarClipBehavior;
use crate::clip_rect::FloatClipRect;
use crate::property_tree::{ClipNodeIndex, TransformNodeIndex};

/// Identifies a memoized clip walk: the ancestor pair the clip was
/// accumulated to and the scrollbar treatment it was computed under.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct ClipCacheKey {
    pub ancestor_clip: ClipNodeIndex,
    pub ancestor_transform: TransformNodeIndex,
    pub scrollbar_behavior: OverlayScrollbarClipBehavior,
}

/// An accumulated clip from a node up to the key's ancestors, with flags
/// recording whether any transform crossed on the way was animating or
/// sticky when the value was computed.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ClipCacheEntry {
    pub clip_rect: FloatClipRect,
    pub has_transform_animation: bool,
    pub has_sticky_transform: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ClipCache {
    generation: Option<u32>,
    entries: FxHashMap<ClipCacheKey, ClipCacheEntry>,
}

impl ClipCache {
    pub(crate) fn get(&self, generation: u32, key: &ClipCacheKey) -> Option<&ClipCacheEntry> {
        if self.generation != Some(generation) {
            return None;
        }
        self.entries.get(key)
    }

    pub(crate) fn insert(&mut self, generation: u32, key: ClipCacheKey, entry: ClipCacheEntry) {
        if self.generation != Some(generation) {
            self.entries.clear();
            self.generation = Some(generation);
        }
        self.entries.insert(key, entry);
    }
}
