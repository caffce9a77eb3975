/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::RefCell;

use euclid::default::Rect;
use malloc_size_of_derive::MallocSizeOf;

use super::{ClipNodeIndex, EffectNodeIndex, TransformNodeIndex};
use crate::OverlayScrollbarClipBehavior;
use crate::clip_cache::ClipCache;
use crate::clip_rect::FloatClipRect;

/// Everything needed to create a clip node.
#[derive(Clone, Copy, Debug)]
pub struct ClipState {
    /// The transform space the clip rect is expressed in.
    pub local_transform_space: TransformNodeIndex,
    pub clip_rect: Rect<f32>,
    pub has_rounded_corners: bool,
    /// Whether a clip-path further restricts the region within `clip_rect`.
    pub has_clip_path: bool,
    /// A smaller rect for hit testing, with the space an overlay scrollbar
    /// paints over excluded.
    pub clip_rect_excluding_overlay_scrollbars: Option<Rect<f32>>,
    /// Set when this clip bounds the output of a pixel-moving filter, naming
    /// the effect node carrying the filter.
    pub pixel_moving_filter: Option<EffectNodeIndex>,
}

impl ClipState {
    /// An axis-aligned rectangular clip in `local_transform_space`.
    pub fn new(local_transform_space: TransformNodeIndex, clip_rect: Rect<f32>) -> Self {
        ClipState {
            local_transform_space,
            clip_rect,
            has_rounded_corners: false,
            has_clip_path: false,
            clip_rect_excluding_overlay_scrollbars: None,
            pixel_moving_filter: None,
        }
    }
}

/// A node in the clip tree.
#[derive(Debug, MallocSizeOf)]
#[cfg_attr(feature = "capture", derive(serde::Serialize))]
#[cfg_attr(feature = "replay", derive(serde::Deserialize))]
pub struct ClipNode {
    parent: Option<ClipNodeIndex>,
    depth: u32,
    local_transform_space: TransformNodeIndex,
    clip_rect: FloatClipRect,
    clip_rect_excluding_overlay_scrollbars: Option<FloatClipRect>,
    has_clip_path: bool,
    pixel_moving_filter: Option<EffectNodeIndex>,
    /// This node if it carries a pixel-moving filter, otherwise the nearest
    /// ancestor that does.
    nearest_pixel_moving_filter_clip: Option<ClipNodeIndex>,
    #[ignore_malloc_size_of = "per-query cache"]
    #[cfg_attr(any(feature = "capture", feature = "replay"), serde(skip))]
    cache: RefCell<ClipCache>,
}

impl ClipNode {
    pub(crate) fn root() -> Self {
        ClipNode {
            parent: None,
            depth: 0,
            local_transform_space: TransformNodeIndex::ROOT,
            clip_rect: FloatClipRect::default(),
            clip_rect_excluding_overlay_scrollbars: None,
            has_clip_path: false,
            pixel_moving_filter: None,
            nearest_pixel_moving_filter_clip: None,
            cache: RefCell::new(ClipCache::default()),
        }
    }

    pub(crate) fn new(
        parent: ClipNodeIndex,
        depth: u32,
        nearest_pixel_moving_filter_clip: Option<ClipNodeIndex>,
        state: ClipState,
    ) -> Self {
        let to_clip_rect = |rect: Rect<f32>| {
            if state.has_rounded_corners {
                FloatClipRect::rounded(rect)
            } else {
                FloatClipRect::new(rect)
            }
        };
        ClipNode {
            parent: Some(parent),
            depth,
            local_transform_space: state.local_transform_space,
            clip_rect: to_clip_rect(state.clip_rect),
            clip_rect_excluding_overlay_scrollbars: state
                .clip_rect_excluding_overlay_scrollbars
                .map(to_clip_rect),
            has_clip_path: state.has_clip_path,
            pixel_moving_filter: state.pixel_moving_filter,
            nearest_pixel_moving_filter_clip,
            cache: RefCell::new(ClipCache::default()),
        }
    }

    pub fn parent(&self) -> Option<ClipNodeIndex> {
        self.parent
    }

    pub(crate) fn depth(&self) -> u32 {
        self.depth
    }

    pub fn local_transform_space(&self) -> TransformNodeIndex {
        self.local_transform_space
    }

    pub fn clip_rect(&self) -> &FloatClipRect {
        &self.clip_rect
    }

    pub fn pixel_moving_filter(&self) -> Option<EffectNodeIndex> {
        self.pixel_moving_filter
    }

    pub(crate) fn nearest_pixel_moving_filter_clip(&self) -> Option<ClipNodeIndex> {
        self.nearest_pixel_moving_filter_clip
    }

    /// The clip rect a query should apply for this node under the given
    /// scrollbar treatment.
    pub(crate) fn clip_rect_for(&self, behavior: OverlayScrollbarClipBehavior) -> FloatClipRect {
        let mut rect = match behavior {
            OverlayScrollbarClipBehavior::ExcludeOverlayScrollbarSizeForHitTesting => self
                .clip_rect_excluding_overlay_scrollbars
                .unwrap_or(self.clip_rect),
            OverlayScrollbarClipBehavior::IgnoreOverlayScrollbarSize => self.clip_rect,
        };
        if self.has_clip_path {
            rect.clear_is_tight();
        }
        rect
    }

    pub(crate) fn cache(&self) -> &RefCell<ClipCache> {
        &self.cache
    }
}
