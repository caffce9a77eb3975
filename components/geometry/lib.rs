/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Geometry queries over the property trees that position painted content.
//!
//! Painted content is located by a (transform, clip, effect) node triple,
//! and everything here answers questions about pairs of such locations:
//! what transform projects one space into another, what a rect becomes once
//! mapped and clipped into an ancestor space, and whether two pieces of
//! content could ever overlap once composited. Queries memoize their work
//! in per-node caches, which stay valid until
//! [`GeometryMapper::clear_cache`] is called.

#![deny(unsafe_code)]

mod clip_cache;
pub mod clip_rect;
pub mod mapper;
pub mod property_tree;
mod transform_cache;
mod util;

pub use crate::clip_rect::FloatClipRect;
pub use crate::mapper::{GeometryMapper, IntersectionInclusivity, OverlayScrollbarClipBehavior};
pub use crate::property_tree::{
    ClipNode, ClipNodeIndex, ClipState, EffectNode, EffectNodeIndex, EffectState,
    PixelMovingFilter, PropertyTree, PropertyTreeState, ScrollInfo, TransformNode,
    TransformNodeIndex, TransformState, TransformValue,
};
