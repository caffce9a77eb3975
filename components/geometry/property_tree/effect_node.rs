/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use euclid::default::{Point2D, Rect, SideOffsets2D, Size2D};
use malloc_size_of_derive::MallocSizeOf;

use super::{ClipNodeIndex, EffectNodeIndex, TransformNodeIndex};

/// Outsets by which a filter can move painted pixels, like the spread of a
/// blur or the offset of a drop shadow.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "capture", derive(serde::Serialize))]
#[cfg_attr(feature = "replay", derive(serde::Deserialize))]
pub struct PixelMovingFilter {
    pub outsets: SideOffsets2D<f32>,
}

impl PixelMovingFilter {
    pub fn new(outsets: SideOffsets2D<f32>) -> Self {
        PixelMovingFilter { outsets }
    }

    /// A filter that spreads pixels the same distance in every direction,
    /// like a blur.
    pub fn uniform(radius: f32) -> Self {
        PixelMovingFilter::new(SideOffsets2D::new_all_same(radius))
    }

    /// The region that painting within `rect` can affect once the filter has
    /// run.
    pub fn map_rect(&self, rect: &Rect<f32>) -> Rect<f32> {
        Rect::new(
            Point2D::new(
                rect.origin.x - self.outsets.left,
                rect.origin.y - self.outsets.top,
            ),
            Size2D::new(
                rect.size.width + self.outsets.left + self.outsets.right,
                rect.size.height + self.outsets.top + self.outsets.bottom,
            ),
        )
    }
}

/// Everything needed to create an effect node.
#[derive(Clone, Copy, Debug)]
pub struct EffectState {
    /// The transform space the effect's filters operate in.
    pub local_transform_space: TransformNodeIndex,
    /// The clip applied to the effect's output, if any.
    pub output_clip: Option<ClipNodeIndex>,
    pub filter: Option<PixelMovingFilter>,
    pub has_active_filter_animation: bool,
}

impl EffectState {
    pub fn new(local_transform_space: TransformNodeIndex) -> Self {
        EffectState {
            local_transform_space,
            output_clip: None,
            filter: None,
            has_active_filter_animation: false,
        }
    }
}

/// A node in the effect tree. Only the properties that influence geometry
/// are carried; purely chromatic effects need nothing here.
#[derive(Debug, MallocSizeOf)]
#[cfg_attr(feature = "capture", derive(serde::Serialize))]
#[cfg_attr(feature = "replay", derive(serde::Deserialize))]
pub struct EffectNode {
    parent: Option<EffectNodeIndex>,
    local_transform_space: TransformNodeIndex,
    output_clip: Option<ClipNodeIndex>,
    #[ignore_malloc_size_of = "simple"]
    filter: Option<PixelMovingFilter>,
    has_active_filter_animation: bool,
}

impl EffectNode {
    pub(crate) fn root() -> Self {
        EffectNode {
            parent: None,
            local_transform_space: TransformNodeIndex::ROOT,
            output_clip: None,
            filter: None,
            has_active_filter_animation: false,
        }
    }

    pub(crate) fn new(parent: EffectNodeIndex, state: EffectState) -> Self {
        EffectNode {
            parent: Some(parent),
            local_transform_space: state.local_transform_space,
            output_clip: state.output_clip,
            filter: state.filter,
            has_active_filter_animation: state.has_active_filter_animation,
        }
    }

    pub fn parent(&self) -> Option<EffectNodeIndex> {
        self.parent
    }

    pub fn local_transform_space(&self) -> TransformNodeIndex {
        self.local_transform_space
    }

    pub fn output_clip(&self) -> Option<ClipNodeIndex> {
        self.output_clip
    }

    pub fn filter(&self) -> Option<&PixelMovingFilter> {
        self.filter.as_ref()
    }

    pub fn has_active_filter_animation(&self) -> bool {
        self.has_active_filter_animation
    }
}
