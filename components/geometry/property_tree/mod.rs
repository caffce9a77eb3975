/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The transform, clip and effect trees that position painted content.
//!
//! Nodes live in per-tree arenas and refer to each other by index, so a node
//! handle stays valid for the life of the tree. Each tree has a root at index
//! zero representing the unclipped, untransformed screen.

mod clip_node;
mod effect_node;
mod transform_node;

use std::cell::Cell;

use euclid::default::{Rect, Vector2D};
use malloc_size_of_derive::MallocSizeOf;

pub use self::clip_node::{ClipNode, ClipState};
pub use self::effect_node::{EffectNode, EffectState, PixelMovingFilter};
pub use self::transform_node::{ScrollInfo, TransformNode, TransformState, TransformValue};

/// Index of a node in the transform tree.
#[derive(Clone, Copy, Debug, Eq, Hash, MallocSizeOf, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "capture", derive(serde::Serialize))]
#[cfg_attr(feature = "replay", derive(serde::Deserialize))]
pub struct TransformNodeIndex(pub u32);

impl TransformNodeIndex {
    pub const ROOT: TransformNodeIndex = TransformNodeIndex(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a node in the clip tree.
#[derive(Clone, Copy, Debug, Eq, Hash, MallocSizeOf, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "capture", derive(serde::Serialize))]
#[cfg_attr(feature = "replay", derive(serde::Deserialize))]
pub struct ClipNodeIndex(pub u32);

impl ClipNodeIndex {
    pub const ROOT: ClipNodeIndex = ClipNodeIndex(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a node in the effect tree.
#[derive(Clone, Copy, Debug, Eq, Hash, MallocSizeOf, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "capture", derive(serde::Serialize))]
#[cfg_attr(feature = "replay", derive(serde::Deserialize))]
pub struct EffectNodeIndex(pub u32);

impl EffectNodeIndex {
    pub const ROOT: EffectNodeIndex = EffectNodeIndex(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A (transform, clip, effect) triple locating content in the property
/// trees.
#[derive(Clone, Copy, Debug, Eq, Hash, MallocSizeOf, PartialEq)]
#[cfg_attr(feature = "capture", derive(serde::Serialize))]
#[cfg_attr(feature = "replay", derive(serde::Deserialize))]
pub struct PropertyTreeState {
    pub transform: TransformNodeIndex,
    pub clip: ClipNodeIndex,
    pub effect: EffectNodeIndex,
}

impl PropertyTreeState {
    pub fn new(
        transform: TransformNodeIndex,
        clip: ClipNodeIndex,
        effect: EffectNodeIndex,
    ) -> Self {
        PropertyTreeState {
            transform,
            clip,
            effect,
        }
    }

    pub fn root() -> Self {
        PropertyTreeState::new(
            TransformNodeIndex::ROOT,
            ClipNodeIndex::ROOT,
            EffectNodeIndex::ROOT,
        )
    }
}

/// The three property trees for a document.
#[derive(Debug, MallocSizeOf)]
#[cfg_attr(feature = "capture", derive(serde::Serialize))]
#[cfg_attr(feature = "replay", derive(serde::Deserialize))]
pub struct PropertyTree {
    transform_nodes: Vec<TransformNode>,
    clip_nodes: Vec<ClipNode>,
    effect_nodes: Vec<EffectNode>,
    /// Bumped to invalidate every per-node cache at once; caches stamped
    /// with an older generation are stale.
    #[ignore_malloc_size_of = "simple"]
    #[cfg_attr(any(feature = "capture", feature = "replay"), serde(skip))]
    cache_generation: Cell<u32>,
}

impl PropertyTree {
    pub fn new() -> Self {
        PropertyTree {
            transform_nodes: vec![TransformNode::root()],
            clip_nodes: vec![ClipNode::root()],
            effect_nodes: vec![EffectNode::root()],
            cache_generation: Cell::new(0),
        }
    }

    pub fn transform_node(&self, index: TransformNodeIndex) -> &TransformNode {
        &self.transform_nodes[index.index()]
    }

    pub fn clip_node(&self, index: ClipNodeIndex) -> &ClipNode {
        &self.clip_nodes[index.index()]
    }

    pub fn effect_node(&self, index: EffectNodeIndex) -> &EffectNode {
        &self.effect_nodes[index.index()]
    }

    pub fn add_transform(
        &mut self,
        parent: TransformNodeIndex,
        state: TransformState,
    ) -> TransformNodeIndex {
        let depth = self.transform_node(parent).depth() + 1;
        let index = TransformNodeIndex(self.transform_nodes.len() as u32);
        self.transform_nodes
            .push(TransformNode::new(Some(parent), depth, state));
        index
    }

    /// Convenience for the common case of a plain 2d translation node.
    pub fn add_2d_translation(
        &mut self,
        parent: TransformNodeIndex,
        offset: Vector2D<f32>,
    ) -> TransformNodeIndex {
        self.add_transform(
            parent,
            TransformState {
                value: TransformValue::translation(offset.x, offset.y),
                ..TransformState::default()
            },
        )
    }

    /// Adds a scroll translation: a 2d translation holding the current
    /// scroll offset, with the scrollable geometry attached.
    pub fn add_scroll_translation(
        &mut self,
        parent: TransformNodeIndex,
        offset: Vector2D<f32>,
        scroll: ScrollInfo,
    ) -> TransformNodeIndex {
        self.add_transform(
            parent,
            TransformState {
                value: TransformValue::translation(offset.x, offset.y),
                scroll: Some(scroll),
                ..TransformState::default()
            },
        )
    }

    pub fn add_clip(&mut self, parent: ClipNodeIndex, state: ClipState) -> ClipNodeIndex {
        let parent_node = self.clip_node(parent);
        let depth = parent_node.depth() + 1;
        let index = ClipNodeIndex(self.clip_nodes.len() as u32);
        let nearest_pixel_moving_filter_clip = if state.pixel_moving_filter.is_some() {
            Some(index)
        } else {
            parent_node.nearest_pixel_moving_filter_clip()
        };
        self.clip_nodes.push(ClipNode::new(
            parent,
            depth,
            nearest_pixel_moving_filter_clip,
            state,
        ));
        index
    }

    /// Convenience for an axis-aligned rectangular clip.
    pub fn add_clip_rect(
        &mut self,
        parent: ClipNodeIndex,
        local_transform_space: TransformNodeIndex,
        clip_rect: Rect<f32>,
    ) -> ClipNodeIndex {
        self.add_clip(parent, ClipState::new(local_transform_space, clip_rect))
    }

    pub fn add_effect(&mut self, parent: EffectNodeIndex, state: EffectState) -> EffectNodeIndex {
        let index = EffectNodeIndex(self.effect_nodes.len() as u32);
        self.effect_nodes.push(EffectNode::new(parent, state));
        index
    }

    pub(crate) fn cache_generation(&self) -> u32 {
        self.cache_generation.get()
    }

    pub(crate) fn bump_cache_generation(&self) {
        self.cache_generation
            .set(self.cache_generation.get().wrapping_add(1));
    }

    pub(crate) fn lowest_common_transform_ancestor(
        &self,
        mut a: TransformNodeIndex,
        mut b: TransformNodeIndex,
    ) -> TransformNodeIndex {
        let mut depth_a = self.transform_node(a).depth();
        let mut depth_b = self.transform_node(b).depth();
        while depth_a > depth_b {
            match self.transform_node(a).parent() {
                Some(parent) => {
                    a = parent;
                    depth_a -= 1;
                },
                None => return TransformNodeIndex::ROOT,
            }
        }
        while depth_b > depth_a {
            match self.transform_node(b).parent() {
                Some(parent) => {
                    b = parent;
                    depth_b -= 1;
                },
                None => return TransformNodeIndex::ROOT,
            }
        }
        while a != b {
            match (
                self.transform_node(a).parent(),
                self.transform_node(b).parent(),
            ) {
                (Some(parent_a), Some(parent_b)) => {
                    a = parent_a;
                    b = parent_b;
                },
                _ => return TransformNodeIndex::ROOT,
            }
        }
        a
    }

    pub(crate) fn lowest_common_clip_ancestor(
        &self,
        mut a: ClipNodeIndex,
        mut b: ClipNodeIndex,
    ) -> ClipNodeIndex {
        let mut depth_a = self.clip_node(a).depth();
        let mut depth_b = self.clip_node(b).depth();
        while depth_a > depth_b {
            match self.clip_node(a).parent() {
                Some(parent) => {
                    a = parent;
                    depth_a -= 1;
                },
                None => return ClipNodeIndex::ROOT,
            }
        }
        while depth_b > depth_a {
            match self.clip_node(b).parent() {
                Some(parent) => {
                    b = parent;
                    depth_b -= 1;
                },
                None => return ClipNodeIndex::ROOT,
            }
        }
        while a != b {
            match (self.clip_node(a).parent(), self.clip_node(b).parent()) {
                (Some(parent_a), Some(parent_b)) => {
                    a = parent_a;
                    b = parent_b;
                },
                _ => return ClipNodeIndex::ROOT,
            }
        }
        a
    }
}

impl Default for PropertyTree {
    fn default() -> Self {
        PropertyTree::new()
    }
}
