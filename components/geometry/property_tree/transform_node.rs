/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::RefCell;

use euclid::default::{Point3D, Rect, Transform3D, Vector2D};
use malloc_size_of_derive::MallocSizeOf;

use super::TransformNodeIndex;
use crate::transform_cache::TransformCache;

/// The local transform carried by a transform node. Plain 2d translations
/// are kept symbolic so queries on them never touch matrix math.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "capture", derive(serde::Serialize))]
#[cfg_attr(feature = "replay", derive(serde::Deserialize))]
pub enum TransformValue {
    Translation2D(Vector2D<f32>),
    Matrix {
        matrix: Transform3D<f32>,
        /// The point the matrix applies about, in local coordinates.
        origin: Point3D<f32>,
    },
}

impl TransformValue {
    pub fn identity() -> Self {
        TransformValue::Translation2D(Vector2D::zero())
    }

    pub fn translation(x: f32, y: f32) -> Self {
        TransformValue::Translation2D(Vector2D::new(x, y))
    }

    pub fn matrix(matrix: Transform3D<f32>) -> Self {
        TransformValue::Matrix {
            matrix,
            origin: Point3D::origin(),
        }
    }

    pub fn matrix_with_origin(matrix: Transform3D<f32>, origin: Point3D<f32>) -> Self {
        TransformValue::Matrix { matrix, origin }
    }

    pub fn is_identity_or_2d_translation(&self) -> bool {
        matches!(self, TransformValue::Translation2D(_))
    }

    pub fn as_translation(&self) -> Option<Vector2D<f32>> {
        match self {
            TransformValue::Translation2D(offset) => Some(*offset),
            TransformValue::Matrix { .. } => None,
        }
    }

    /// The transform as a matrix, with the origin folded in.
    pub fn to_matrix(&self) -> Transform3D<f32> {
        match self {
            TransformValue::Translation2D(offset) => {
                Transform3D::translation(offset.x, offset.y, 0.0)
            },
            TransformValue::Matrix { matrix, origin } => {
                let origin = origin.to_vector();
                matrix.pre_translate(-origin).then_translate(origin)
            },
        }
    }
}

/// Scroll geometry for a scroll translation node. Contents coordinates
/// coincide with container coordinates at zero scroll offset.
#[derive(Clone, Copy, Debug, MallocSizeOf, PartialEq)]
#[cfg_attr(feature = "capture", derive(serde::Serialize))]
#[cfg_attr(feature = "replay", derive(serde::Deserialize))]
pub struct ScrollInfo {
    /// The scrollport: the region through which the scrolled contents are
    /// visible, in the space of the scroll translation's parent.
    pub container_rect: Rect<f32>,
    /// The extent of the scrollable contents, in the scrolled space.
    pub contents_rect: Rect<f32>,
}

impl ScrollInfo {
    pub fn new(container_rect: Rect<f32>, contents_rect: Rect<f32>) -> Self {
        ScrollInfo {
            container_rect,
            contents_rect,
        }
    }

    /// How far the contents can be scrolled along each axis.
    pub fn max_scroll_offset(&self) -> Vector2D<f32> {
        Vector2D::new(
            (self.contents_rect.size.width - self.container_rect.size.width).max(0.0),
            (self.contents_rect.size.height - self.container_rect.size.height).max(0.0),
        )
    }
}

/// Everything needed to create a transform node.
#[derive(Clone, Copy, Debug)]
pub struct TransformState {
    pub value: TransformValue,
    /// Present when this node is a scroll translation.
    pub scroll: Option<ScrollInfo>,
    /// For a fixed-position node, the scroll translation whose scrolling the
    /// node escapes.
    pub scroll_translation_for_fixed: Option<TransformNodeIndex>,
    pub has_active_animation: bool,
    pub requires_compositing_for_fixed_position: bool,
    pub requires_compositing_for_sticky_position: bool,
}

impl Default for TransformState {
    fn default() -> Self {
        TransformState {
            value: TransformValue::identity(),
            scroll: None,
            scroll_translation_for_fixed: None,
            has_active_animation: false,
            requires_compositing_for_fixed_position: false,
            requires_compositing_for_sticky_position: false,
        }
    }
}

/// A node in the transform tree.
#[derive(Debug, MallocSizeOf)]
#[cfg_attr(feature = "capture", derive(serde::Serialize))]
#[cfg_attr(feature = "replay", derive(serde::Deserialize))]
pub struct TransformNode {
    parent: Option<TransformNodeIndex>,
    depth: u32,
    #[ignore_malloc_size_of = "simple"]
    value: TransformValue,
    scroll: Option<ScrollInfo>,
    scroll_translation_for_fixed: Option<TransformNodeIndex>,
    has_active_animation: bool,
    requires_compositing_for_fixed_position: bool,
    requires_compositing_for_sticky_position: bool,
    #[ignore_malloc_size_of = "per-query cache"]
    #[cfg_attr(any(feature = "capture", feature = "replay"), serde(skip))]
    cache: RefCell<TransformCache>,
}

impl TransformNode {
    pub(crate) fn root() -> Self {
        Self::new(None, 0, TransformState::default())
    }

    pub(crate) fn new(
        parent: Option<TransformNodeIndex>,
        depth: u32,
        state: TransformState,
    ) -> Self {
        TransformNode {
            parent,
            depth,
            value: state.value,
            scroll: state.scroll,
            scroll_translation_for_fixed: state.scroll_translation_for_fixed,
            has_active_animation: state.has_active_animation,
            requires_compositing_for_fixed_position: state.requires_compositing_for_fixed_position,
            requires_compositing_for_sticky_position: state
                .requires_compositing_for_sticky_position,
            cache: RefCell::new(TransformCache::default()),
        }
    }

    pub fn parent(&self) -> Option<TransformNodeIndex> {
        self.parent
    }

    pub(crate) fn depth(&self) -> u32 {
        self.depth
    }

    pub fn value(&self) -> &TransformValue {
        &self.value
    }

    pub fn is_identity_or_2d_translation(&self) -> bool {
        self.value.is_identity_or_2d_translation()
    }

    pub fn has_active_animation(&self) -> bool {
        self.has_active_animation
    }

    pub fn requires_compositing_for_fixed_position(&self) -> bool {
        self.requires_compositing_for_fixed_position
    }

    pub fn requires_compositing_for_sticky_position(&self) -> bool {
        self.requires_compositing_for_sticky_position
    }

    pub fn scroll_info(&self) -> Option<&ScrollInfo> {
        self.scroll.as_ref()
    }

    pub fn is_scroll_translation(&self) -> bool {
        self.scroll.is_some()
    }

    pub fn scroll_translation_for_fixed(&self) -> Option<TransformNodeIndex> {
        self.scroll_translation_for_fixed
    }

    pub(crate) fn cache(&self) -> &RefCell<TransformCache> {
        &self.cache
    }
}
