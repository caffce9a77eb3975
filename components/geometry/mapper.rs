/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Mapping of rects and transforms between property tree nodes.

use std::cell::Ref;

use bitflags::bitflags;
use euclid::default::{Point2D, Point3D, Rect, Size2D, Transform3D};
use log::warn;
use smallvec::SmallVec;

use crate::clip_cache::{ClipCacheEntry, ClipCacheKey};
use crate::clip_rect::FloatClipRect;
use crate::property_tree::{
    ClipNodeIndex, EffectNodeIndex, PropertyTree, PropertyTreeState, TransformNode,
    TransformNodeIndex, TransformValue,
};
use crate::transform_cache::{ScreenTransform, TransformCache};
use crate::util::MatrixHelpers;

/// How queries treat the space an overlay scrollbar paints over. Overlay
/// scrollbars do not affect layout, but hit testing must not see content
/// through them.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OverlayScrollbarClipBehavior {
    IgnoreOverlayScrollbarSize,
    ExcludeOverlayScrollbarSizeForHitTesting,
}

/// Whether rects sharing only an edge or a corner count as intersecting.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IntersectionInclusivity {
    NonInclusive,
    Inclusive,
}

/// Marks queries made for compositing overlap testing. Their answers must
/// hold for every scroll offset and animation frame, not just the current
/// one, so positions that can change without a repaint are treated as
/// unbounded rather than read.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ForCompositingOverlap {
    No,
    Yes,
}

bitflags! {
    /// What a projection crossed on its way between two transform nodes.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    struct ProjectionFlags: u8 {
        const HAS_ANIMATION = 1 << 0;
        /// A fixed-position compositing trigger sits on the path. Unlike the
        /// other two this never widens a mapped rect: fixed placement is
        /// exact at any scroll offset, and overlap queries expand fixed
        /// content through its scroll anchor instead.
        const HAS_FIXED = 1 << 1;
        const HAS_STICKY = 1 << 2;
    }
}

struct ProjectionResult {
    transform: Transform3D<f32>,
    flags: ProjectionFlags,
    /// False when the destination cannot be projected into, because the
    /// screen transform on its side is singular.
    success: bool,
}

impl ProjectionResult {
    fn identity() -> Self {
        ProjectionResult {
            transform: Transform3D::identity(),
            flags: ProjectionFlags::empty(),
            success: true,
        }
    }

    fn new(transform: Transform3D<f32>, flags: ProjectionFlags) -> Self {
        ProjectionResult {
            transform,
            flags,
            success: true,
        }
    }

    fn failure(flags: ProjectionFlags) -> Self {
        ProjectionResult {
            transform: Transform3D::identity(),
            flags,
            success: false,
        }
    }
}

/// Maps rects and transforms between arbitrary nodes of a `PropertyTree`.
///
/// Queries are answered from per-node caches that fill in lazily and stay
/// valid until `clear_cache`, so a burst of queries against an unchanged
/// tree does each piece of work once.
pub struct GeometryMapper<'a> {
    tree: &'a PropertyTree,
}

impl<'a> GeometryMapper<'a> {
    pub fn new(tree: &'a PropertyTree) -> Self {
        GeometryMapper { tree }
    }

    /// Invalidates every cached value derived from the trees. Call after any
    /// node's underlying property changes.
    pub fn clear_cache(&self) {
        self.tree.bump_cache_generation();
    }

    /// The transform projecting points in `source`'s space into
    /// `destination`'s space, flattening through the screen when the two draw
    /// into unrelated planes. Returns identity when no projection exists;
    /// use `source_to_destination_rect` where failure must become an empty
    /// rect instead.
    pub fn source_to_destination_projection(
        &self,
        source: TransformNodeIndex,
        destination: TransformNodeIndex,
    ) -> Transform3D<f32> {
        self.projection_internal(source, destination).transform
    }

    /// Maps `rect` from `source`'s space into `destination`'s space, leaving
    /// it empty when no projection exists.
    pub fn source_to_destination_rect(
        &self,
        source: TransformNodeIndex,
        destination: TransformNodeIndex,
        rect: &mut Rect<f32>,
    ) {
        let projection = self.projection_internal(source, destination);
        if !projection.success {
            *rect = Rect::zero();
            return;
        }
        *rect = projection.transform.project_rect(rect);
    }

    /// Approximates how much `source` content shrinks at most when drawn in
    /// `destination`'s space, as the smaller side of the projected unit
    /// square.
    pub fn source_to_destination_approximate_minimum_scale(
        &self,
        source: TransformNodeIndex,
        destination: TransformNodeIndex,
    ) -> f32 {
        if source == destination {
            return 1.0;
        }
        {
            let source_cache = self.transform_cache(source);
            let destination_cache = self.transform_cache(destination);
            if source_cache.root_of_2d_translation() ==
                destination_cache.root_of_2d_translation()
            {
                return 1.0;
            }
        }
        let unit_square = Rect::new(Point2D::zero(), Size2D::new(1.0, 1.0));
        let projected = self
            .projection_internal(source, destination)
            .transform
            .project_rect(&unit_square);
        projected.size.width.min(projected.size.height)
    }

    /// Maps `rect` from `local` into `ancestor`, intersecting it with every
    /// clip in between. Returns whether the result is non-empty; on failure
    /// the rect is left empty.
    pub fn local_to_ancestor_visual_rect(
        &self,
        local: PropertyTreeState,
        ancestor: PropertyTreeState,
        rect: &mut FloatClipRect,
        behavior: OverlayScrollbarClipBehavior,
        inclusivity: IntersectionInclusivity,
    ) -> bool {
        self.visual_rect_internal(
            local,
            ancestor,
            rect,
            behavior,
            inclusivity,
            ForCompositingOverlap::No,
        )
    }

    /// Accumulates the clips between `local.clip` and `ancestor.clip`,
    /// mapped into `ancestor.transform`'s space. Fails open: when the
    /// ancestor clip turns out not to be an ancestor at all, the result is
    /// the unbounded loose rect rather than an error.
    pub fn local_to_ancestor_clip_rect(
        &self,
        local: PropertyTreeState,
        ancestor: PropertyTreeState,
        behavior: OverlayScrollbarClipBehavior,
    ) -> FloatClipRect {
        self.clip_rect_internal(
            local.clip,
            ancestor.clip,
            ancestor.transform,
            behavior,
            IntersectionInclusivity::NonInclusive,
            ForCompositingOverlap::No,
        )
    }

    /// Whether content drawn as `rect1` in `state1` could ever composite
    /// over or under content drawn as `rect2` in `state2`, at any scroll
    /// offset and any point of any active animation. May report overlap that
    /// never happens, but never misses one.
    pub fn might_overlap_for_compositing(
        &self,
        rect1: Rect<f32>,
        state1: PropertyTreeState,
        rect2: Rect<f32>,
        state2: PropertyTreeState,
    ) -> bool {
        let mut rect1 = FloatClipRect::new(rect1);
        let mut rect2 = FloatClipRect::new(rect2);
        let mut state1 = state1;
        let mut state2 = state2;

        let scroll1 = self.nearest_scroll_translation(state1.transform);
        let scroll2 = self.nearest_scroll_translation(state2.transform);

        // Contents under the same scroller move together, so only sides
        // scrolling independently need their reachable positions expanded.
        if state1.transform != state2.transform && scroll1 != scroll2 {
            let lca = self
                .tree
                .lowest_common_transform_ancestor(state1.transform, state2.transform);
            let common_scroll = self.nearest_scroll_translation(lca);
            let chain1 = self.scroll_translation_chain(scroll1, common_scroll);
            let chain2 = self.scroll_translation_chain(scroll2, common_scroll);
            if !self.expand_for_scroll(&mut rect1, &mut state1, scroll1, common_scroll, &chain2) {
                return false;
            }
            if !self.expand_for_scroll(&mut rect2, &mut state2, scroll2, common_scroll, &chain1) {
                return false;
            }
        }

        self.might_overlap(&rect1, state1, &rect2, state2)
    }

    fn projection_internal(
        &self,
        source: TransformNodeIndex,
        destination: TransformNodeIndex,
    ) -> ProjectionResult {
        if source == destination {
            return ProjectionResult::identity();
        }

        let source_node = self.tree.transform_node(source);
        let destination_node = self.tree.transform_node(destination);

        // A single edge can often be crossed without touching the caches.
        if source_node.parent() == Some(destination) {
            let flags = node_projection_flags(source_node);
            match source_node.value() {
                TransformValue::Translation2D(offset) => {
                    return ProjectionResult::new(
                        Transform3D::translation(offset.x, offset.y, 0.0),
                        flags,
                    );
                },
                TransformValue::Matrix { matrix, origin } if *origin == Point3D::origin() => {
                    return ProjectionResult::new(*matrix, flags);
                },
                TransformValue::Matrix { .. } => {},
            }
        }
        if destination_node.parent() == Some(source) && !destination_node.has_active_animation() {
            if let Some(offset) = destination_node.value().as_translation() {
                return ProjectionResult::new(
                    Transform3D::translation(-offset.x, -offset.y, 0.0),
                    node_projection_flags(destination_node),
                );
            }
        }

        {
            let source_cache = self.transform_cache(source);
            let destination_cache = self.transform_cache(destination);

            if source_cache.root_of_2d_translation() ==
                destination_cache.root_of_2d_translation()
            {
                let offset = source_cache.to_2d_translation_root() -
                    destination_cache.to_2d_translation_root();
                return ProjectionResult::new(
                    Transform3D::translation(offset.x, offset.y, 0.0),
                    fixed_sticky_flags(&source_cache, &destination_cache),
                );
            }

            if source_cache.plane_root() == destination_cache.plane_root() {
                let mut flags = fixed_sticky_flags(&source_cache, &destination_cache);
                if source_cache.has_animation_to_plane_root() ||
                    destination_cache.has_animation_to_plane_root()
                {
                    flags |= ProjectionFlags::HAS_ANIMATION;
                }
                let transform = if destination == source_cache.plane_root() {
                    source_cache.to_plane_root()
                } else if source == destination_cache.plane_root() {
                    destination_cache.from_plane_root()
                } else {
                    source_cache
                        .to_plane_root()
                        .then(&destination_cache.from_plane_root())
                };
                return ProjectionResult::new(transform, flags);
            }
        }

        // The nodes draw into unrelated planes; project through the screen,
        // flattening the source's plane into the destination's.
        self.ensure_screen_transform(source);
        self.ensure_screen_transform(destination);
        let source_cache = self.tree.transform_node(source).cache().borrow();
        let destination_cache = self.tree.transform_node(destination).cache().borrow();

        let mut flags = fixed_sticky_flags(&source_cache, &destination_cache);
        if source_cache.has_animation_to_screen() || destination_cache.has_animation_to_screen() {
            flags |= ProjectionFlags::HAS_ANIMATION;
        }
        if !destination_cache.projection_from_screen_is_valid() {
            return ProjectionResult::failure(flags);
        }
        let transform = source_cache
            .to_screen()
            .flattened()
            .then(&destination_cache.projection_from_screen());
        ProjectionResult::new(transform, flags)
    }

    fn visual_rect_internal(
        &self,
        local: PropertyTreeState,
        ancestor: PropertyTreeState,
        rect: &mut FloatClipRect,
        behavior: OverlayScrollbarClipBehavior,
        inclusivity: IntersectionInclusivity,
        overlap: ForCompositingOverlap,
    ) -> bool {
        if local.effect != ancestor.effect {
            // Crossing any effect leaves only a conservative cover of where
            // the contents end up composited.
            rect.clear_is_tight();
        }
        if local.transform == ancestor.transform && local.clip == ancestor.clip {
            return true;
        }

        if local.clip != ancestor.clip {
            let local_filter_clip = self
                .tree
                .clip_node(local.clip)
                .nearest_pixel_moving_filter_clip();
            let ancestor_filter_clip = self
                .tree
                .clip_node(ancestor.clip)
                .nearest_pixel_moving_filter_clip();
            if local_filter_clip != ancestor_filter_clip {
                return self.visual_rect_with_pixel_moving_filters(
                    local,
                    ancestor,
                    rect,
                    behavior,
                    inclusivity,
                    overlap,
                );
            }
        }

        let projection = self.projection_internal(local.transform, ancestor.transform);
        if !projection.success {
            *rect = FloatClipRect::new(Rect::zero());
            return false;
        }
        if overlap == ForCompositingOverlap::Yes &&
            projection
                .flags
                .intersects(ProjectionFlags::HAS_ANIMATION | ProjectionFlags::HAS_STICKY)
        {
            // The contents can be anywhere by the time the next frame
            // composites; only the clips below still bound them.
            *rect = FloatClipRect::infinite_loose();
        } else {
            rect.map(&projection.transform);
        }

        let clip = self.clip_rect_internal(
            local.clip,
            ancestor.clip,
            ancestor.transform,
            behavior,
            inclusivity,
            overlap,
        );
        match inclusivity {
            IntersectionInclusivity::Inclusive => rect.inclusive_intersect(&clip),
            IntersectionInclusivity::NonInclusive => {
                rect.intersect(&clip);
                !rect.is_empty()
            },
        }
    }

    /// The slow path of `visual_rect_internal` for when pixel-moving filters
    /// stand between `local` and `ancestor`. Hops out of one filter at a
    /// time: maps up to the filter, spreads the rect by the filter's reach,
    /// then continues from just outside the filter's clip.
    fn visual_rect_with_pixel_moving_filters(
        &self,
        local: PropertyTreeState,
        ancestor: PropertyTreeState,
        rect: &mut FloatClipRect,
        behavior: OverlayScrollbarClipBehavior,
        inclusivity: IntersectionInclusivity,
        overlap: ForCompositingOverlap,
    ) -> bool {
        let ancestor_filter_clip = self
            .tree
            .clip_node(ancestor.clip)
            .nearest_pixel_moving_filter_clip();
        let mut filter_clip = self
            .tree
            .clip_node(local.clip)
            .nearest_pixel_moving_filter_clip();
        let mut state = local;

        while filter_clip != ancestor_filter_clip {
            let Some(clip_index) = filter_clip else {
                warn!(
                    "No common pixel-moving filter between {:?} and {:?}; treating the visual rect as unbounded",
                    local.clip, ancestor.clip
                );
                *rect = FloatClipRect::infinite_loose();
                return true;
            };
            let clip_node = self.tree.clip_node(clip_index);
            let Some(effect_index) = clip_node.pixel_moving_filter() else {
                *rect = FloatClipRect::infinite_loose();
                return true;
            };
            let effect = self.tree.effect_node(effect_index);

            let filter_state = PropertyTreeState::new(
                effect.local_transform_space(),
                effect.output_clip().unwrap_or(clip_index),
                effect_index,
            );
            if !self.visual_rect_internal(
                state,
                filter_state,
                rect,
                behavior,
                inclusivity,
                overlap,
            ) {
                return false;
            }

            if overlap == ForCompositingOverlap::Yes && effect.has_active_filter_animation() {
                *rect = FloatClipRect::infinite_loose();
            } else if let Some(filter) = effect.filter() {
                if !rect.is_infinite() {
                    rect.set_rect(filter.map_rect(&rect.rect()));
                }
                rect.clear_is_tight();
            }

            let Some(parent_clip) = clip_node.parent() else {
                *rect = FloatClipRect::infinite_loose();
                return true;
            };
            state = PropertyTreeState::new(filter_state.transform, parent_clip, effect_index);
            filter_clip = self
                .tree
                .clip_node(parent_clip)
                .nearest_pixel_moving_filter_clip();
        }

        self.visual_rect_internal(state, ancestor, rect, behavior, inclusivity, overlap)
    }

    fn clip_rect_internal(
        &self,
        descendant_clip: ClipNodeIndex,
        ancestor_clip: ClipNodeIndex,
        ancestor_transform: TransformNodeIndex,
        behavior: OverlayScrollbarClipBehavior,
        inclusivity: IntersectionInclusivity,
        overlap: ForCompositingOverlap,
    ) -> FloatClipRect {
        if descendant_clip == ancestor_clip {
            return FloatClipRect::default();
        }

        let descendant = self.tree.clip_node(descendant_clip);
        if descendant.parent() == Some(ancestor_clip) &&
            descendant.local_transform_space() == ancestor_transform
        {
            return descendant.clip_rect_for(behavior);
        }

        let generation = self.tree.cache_generation();
        let key = ClipCacheKey {
            ancestor_clip,
            ancestor_transform,
            scrollbar_behavior: behavior,
        };

        // Walk towards the ancestor, collecting the nodes whose clips still
        // need applying, until a usable memoized value or the ancestor
        // itself. Overlap queries cannot reuse values computed across
        // animating or sticky transforms.
        let mut unapplied: SmallVec<[ClipNodeIndex; 8]> = SmallVec::new();
        let mut clip = FloatClipRect::default();
        let mut has_animation = false;
        let mut has_sticky = false;
        let mut current = descendant_clip;
        loop {
            if current == ancestor_clip {
                break;
            }
            let node = self.tree.clip_node(current);
            if let Some(entry) = node.cache().borrow().get(generation, &key) {
                if overlap == ForCompositingOverlap::No ||
                    !(entry.has_transform_animation || entry.has_sticky_transform)
                {
                    clip = entry.clip_rect;
                    has_animation = entry.has_transform_animation;
                    has_sticky = entry.has_sticky_transform;
                    break;
                }
            }
            unapplied.push(current);
            match node.parent() {
                Some(parent) => current = parent,
                None => {
                    warn!(
                        "{:?} is not an ancestor of {:?}; treating the clip as unbounded",
                        ancestor_clip, descendant_clip
                    );
                    return FloatClipRect::infinite_loose();
                },
            }
        }

        // Replay the collected nodes top-down, mapping each clip into the
        // ancestor space and memoizing the running value as it grows.
        // Inclusive results, and values below a clip an overlap query had to
        // skip, are never cached.
        let mut skipped_clip = false;
        for &clip_index in unapplied.iter().rev() {
            let node = self.tree.clip_node(clip_index);
            let projection =
                self.projection_internal(node.local_transform_space(), ancestor_transform);
            if !projection.success {
                return FloatClipRect::new(Rect::zero());
            }
            has_animation =
                has_animation || projection.flags.contains(ProjectionFlags::HAS_ANIMATION);
            has_sticky = has_sticky || projection.flags.contains(ProjectionFlags::HAS_STICKY);

            if overlap == ForCompositingOverlap::Yes &&
                projection
                    .flags
                    .intersects(ProjectionFlags::HAS_ANIMATION | ProjectionFlags::HAS_STICKY)
            {
                // The clip can be anywhere while its transform animates;
                // leave it unapplied.
                clip.clear_is_tight();
                skipped_clip = true;
                continue;
            }

            let mut mapped = node.clip_rect_for(behavior);
            mapped.map(&projection.transform);
            if inclusivity == IntersectionInclusivity::Inclusive {
                clip.inclusive_intersect(&mapped);
            } else {
                clip.intersect(&mapped);
                if !skipped_clip {
                    node.cache().borrow_mut().insert(generation, key, ClipCacheEntry {
                        clip_rect: clip,
                        has_transform_animation: has_animation,
                        has_sticky_transform: has_sticky,
                    });
                }
            }
        }
        clip
    }

    fn might_overlap(
        &self,
        rect1: &FloatClipRect,
        state1: PropertyTreeState,
        rect2: &FloatClipRect,
        state2: PropertyTreeState,
    ) -> bool {
        let common = PropertyTreeState::new(
            self.tree
                .lowest_common_transform_ancestor(state1.transform, state2.transform),
            self.tree.lowest_common_clip_ancestor(state1.clip, state2.clip),
            EffectNodeIndex::ROOT,
        );
        let visual1 = self.visual_rect_for_compositing_overlap(*rect1, state1, common);
        let visual2 = self.visual_rect_for_compositing_overlap(*rect2, state2, common);
        if visual1.is_empty() || visual2.is_empty() {
            return false;
        }
        if visual1.is_infinite() || visual2.is_infinite() {
            return true;
        }
        visual1.rect().intersects(&visual2.rect())
    }

    fn visual_rect_for_compositing_overlap(
        &self,
        rect: FloatClipRect,
        from: PropertyTreeState,
        to: PropertyTreeState,
    ) -> FloatClipRect {
        let mut rect = rect;
        self.visual_rect_internal(
            from,
            to,
            &mut rect,
            OverlayScrollbarClipBehavior::IgnoreOverlayScrollbarSize,
            IntersectionInclusivity::NonInclusive,
            ForCompositingOverlap::Yes,
        );
        rect
    }

    /// Replaces `rect` and `state` with a rect covering every position the
    /// content can reach in the space just above `common_scroll`, hopping
    /// out of one scroller at a time. Returns false when the content can
    /// never show through some scrollport on the way.
    fn expand_for_scroll(
        &self,
        rect: &mut FloatClipRect,
        state: &mut PropertyTreeState,
        scroll_translation: Option<TransformNodeIndex>,
        common_scroll: Option<TransformNodeIndex>,
        other_chain: &[TransformNodeIndex],
    ) -> bool {
        let mut scroll_translation = scroll_translation;

        // Fixed content escapes its anchor scroller's offset entirely, but
        // when the other side scrolls within that same scroller the two
        // still shift relative to each other by up to the full scroll range.
        if let Some(anchor) = self.fixed_scroll_anchor(*state) {
            if other_chain.contains(&anchor) {
                self.map_fixed_visual_rect_in_scroll(anchor, rect, state);
                scroll_translation = Some(anchor);
            }
        }

        while scroll_translation != common_scroll {
            let Some(index) = scroll_translation else {
                debug_assert!(false, "scroll translation chain missed the common ancestor");
                break;
            };
            if !self.map_visual_rect_above_scroll(index, rect, state) {
                return false;
            }
            scroll_translation = self.nearest_scroll_translation(state.transform);
        }
        true
    }

    /// Maps `rect` into the space of `anchor`'s scrolling contents, expanded
    /// to cover every scroll offset of the anchor.
    fn map_fixed_visual_rect_in_scroll(
        &self,
        anchor: TransformNodeIndex,
        rect: &mut FloatClipRect,
        state: &mut PropertyTreeState,
    ) {
        let anchor_node = self.tree.transform_node(anchor);
        let Some(scroll) = anchor_node.scroll_info() else {
            return;
        };
        let max_scroll_offset = scroll.max_scroll_offset();

        let target = PropertyTreeState::new(
            anchor_node.parent().unwrap_or(TransformNodeIndex::ROOT),
            self.clip_above_pixel_moving_filters(state.clip),
            state.effect,
        );
        *rect = self.visual_rect_for_compositing_overlap(*rect, *state, target);
        if !rect.is_infinite() {
            let mut expanded = rect.rect();
            expanded.size.width += max_scroll_offset.x;
            expanded.size.height += max_scroll_offset.y;
            rect.set_rect(expanded);
            rect.clear_is_tight();
        }
        *state = PropertyTreeState::new(anchor, ClipNodeIndex::ROOT, EffectNodeIndex::ROOT);
    }

    /// Maps `rect` from inside `scroll_translation`'s contents to the space
    /// above it, covering every scroll offset and keeping only what can show
    /// through the scrollport. Returns false when nothing can.
    fn map_visual_rect_above_scroll(
        &self,
        scroll_translation: TransformNodeIndex,
        rect: &mut FloatClipRect,
        state: &mut PropertyTreeState,
    ) -> bool {
        let scroll_node = self.tree.transform_node(scroll_translation);
        let Some(scroll) = scroll_node.scroll_info() else {
            debug_assert!(false, "walked above a transform that is not a scroll translation");
            return true;
        };

        let contents_target = PropertyTreeState::new(
            scroll_translation,
            self.clip_above_pixel_moving_filters(state.clip),
            state.effect,
        );
        *rect = self.visual_rect_for_compositing_overlap(*rect, *state, contents_target);

        let max_scroll_offset = scroll.max_scroll_offset();
        let container_rect = scroll.container_rect;
        if rect.is_infinite() {
            // However large the contents, only the scrollport shows them.
            rect.set_rect(container_rect);
            rect.clear_is_tight();
        } else {
            let mut expanded = rect.rect();
            expanded.origin.x -= max_scroll_offset.x;
            expanded.origin.y -= max_scroll_offset.y;
            expanded.size.width += max_scroll_offset.x;
            expanded.size.height += max_scroll_offset.y;
            match expanded.intersection(&container_rect) {
                Some(visible) => {
                    rect.set_rect(visible);
                    rect.clear_is_tight();
                },
                None => return false,
            }
        }

        *state = PropertyTreeState::new(
            scroll_node.parent().unwrap_or(TransformNodeIndex::ROOT),
            ClipNodeIndex::ROOT,
            EffectNodeIndex::ROOT,
        );
        true
    }

    /// The nearest ancestor of `clip` that no pixel-moving filter applies
    /// to, or `clip` itself when its chain crosses none. Scroll expansion
    /// maps to this clip so filter outsets land on the rect before it is
    /// stretched by the scroll range.
    fn clip_above_pixel_moving_filters(&self, clip: ClipNodeIndex) -> ClipNodeIndex {
        let Some(mut filter_clip) = self.tree.clip_node(clip).nearest_pixel_moving_filter_clip()
        else {
            return clip;
        };
        loop {
            let Some(parent) = self.tree.clip_node(filter_clip).parent() else {
                return ClipNodeIndex::ROOT;
            };
            match self.tree.clip_node(parent).nearest_pixel_moving_filter_clip() {
                Some(next) => filter_clip = next,
                None => return parent,
            }
        }
    }

    /// The scroll translation whose scrolling `state`'s content escapes by
    /// being fixed, when there is one between the content and its nearest
    /// scroller.
    fn fixed_scroll_anchor(&self, state: PropertyTreeState) -> Option<TransformNodeIndex> {
        if !self.transform_cache(state.transform).has_fixed() {
            return None;
        }
        let mut current = state.transform;
        loop {
            let node = self.tree.transform_node(current);
            if node.requires_compositing_for_fixed_position() {
                return node.scroll_translation_for_fixed();
            }
            if node.is_scroll_translation() {
                return None;
            }
            current = node.parent()?;
        }
    }

    /// The scroll translations from `from` up to, but not including,
    /// `common`, leaf first.
    fn scroll_translation_chain(
        &self,
        from: Option<TransformNodeIndex>,
        common: Option<TransformNodeIndex>,
    ) -> SmallVec<[TransformNodeIndex; 4]> {
        let mut chain = SmallVec::new();
        let mut current = from;
        while current != common {
            let Some(index) = current else {
                break;
            };
            chain.push(index);
            current = match self.tree.transform_node(index).parent() {
                Some(parent) => self.nearest_scroll_translation(parent),
                None => None,
            };
        }
        chain
    }

    fn nearest_scroll_translation(
        &self,
        transform: TransformNodeIndex,
    ) -> Option<TransformNodeIndex> {
        self.transform_cache(transform).nearest_scroll_translation()
    }

    /// Returns the node's cache, updating it first if it is stale. Parents
    /// update before children so each node composes onto its parent's paths.
    fn transform_cache(&self, index: TransformNodeIndex) -> Ref<'_, TransformCache> {
        self.ensure_transform_cache(index);
        self.tree.transform_node(index).cache().borrow()
    }

    fn ensure_transform_cache(&self, index: TransformNodeIndex) {
        let generation = self.tree.cache_generation();
        let node = self.tree.transform_node(index);
        if node.cache().borrow().is_valid(generation) {
            return;
        }
        match node.parent() {
            Some(parent) => {
                self.ensure_transform_cache(parent);
                let parent_cache = self.tree.transform_node(parent).cache().borrow();
                node.cache()
                    .borrow_mut()
                    .update(generation, index, node, Some(&parent_cache));
            },
            None => {
                node.cache().borrow_mut().update(generation, index, node, None);
            },
        }
    }

    /// Fills in the node's to-screen and from-screen transforms, which the
    /// plain cache update leaves unset until some projection needs them.
    fn ensure_screen_transform(&self, index: TransformNodeIndex) {
        self.ensure_transform_cache(index);
        let node = self.tree.transform_node(index);
        if node.cache().borrow().has_screen_transform() {
            return;
        }
        let screen = match node.parent() {
            None => ScreenTransform::new(Transform3D::identity()),
            Some(parent) => {
                self.ensure_screen_transform(parent);
                let parent_to_screen =
                    self.tree.transform_node(parent).cache().borrow().to_screen();
                ScreenTransform::new(node.value().to_matrix().then(&parent_to_screen))
            },
        };
        node.cache().borrow_mut().set_screen_transform(screen);
    }
}

fn node_projection_flags(node: &TransformNode) -> ProjectionFlags {
    let mut flags = ProjectionFlags::empty();
    if node.has_active_animation() {
        flags |= ProjectionFlags::HAS_ANIMATION;
    }
    if node.requires_compositing_for_fixed_position() {
        flags |= ProjectionFlags::HAS_FIXED;
    }
    if node.requires_compositing_for_sticky_position() {
        flags |= ProjectionFlags::HAS_STICKY;
    }
    flags
}

fn fixed_sticky_flags(a: &TransformCache, b: &TransformCache) -> ProjectionFlags {
    let mut flags = ProjectionFlags::empty();
    if a.has_fixed() || b.has_fixed() {
        flags |= ProjectionFlags::HAS_FIXED;
    }
    if a.has_sticky() || b.has_sticky() {
        flags |= ProjectionFlags::HAS_STICKY;
    }
    flags
}
