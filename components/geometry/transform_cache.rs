/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use euclid::default::{Transform3D, Vector2D};

use crate::property_tree::{TransformNode, TransformNodeIndex};
use crate::util::MatrixHelpers;

/// Accumulated transforms from a node up to distinguished ancestors, rebuilt
/// lazily after the tree's cache generation is bumped.
///
/// Three roots are tracked, cheapest first: the root of the run of plain 2d
/// translations containing the node, the root of the plane the node draws
/// into, and the screen. Most projections are answered from the first two;
/// the screen transform is only built when a projection crosses planes.
#[derive(Debug)]
pub(crate) struct TransformCache {
    generation: Option<u32>,
    /// The deepest ancestor (possibly this node) reachable from here through
    /// nothing but non-animating 2d translations, itself included.
    root_of_2d_translation: TransformNodeIndex,
    /// Accumulated offset from this node's space to `root_of_2d_translation`.
    to_2d_translation_root: Vector2D<f32>,
    /// `None` when the plane root and the 2d translation root coincide.
    plane_root_transform: Option<PlaneRootTransform>,
    /// Built on demand; `None` until a projection falls back to screen
    /// space.
    screen_transform: Option<ScreenTransform>,
    has_animation_to_screen: bool,
    has_fixed: bool,
    has_sticky: bool,
    /// The nearest ancestor (possibly this node) that is a scroll
    /// translation.
    nearest_scroll_translation: Option<TransformNodeIndex>,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct PlaneRootTransform {
    plane_root: TransformNodeIndex,
    to_plane_root: Transform3D<f32>,
    from_plane_root: Transform3D<f32>,
    has_animation: bool,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct ScreenTransform {
    to_screen: Transform3D<f32>,
    projection_from_screen: Transform3D<f32>,
    projection_from_screen_is_valid: bool,
}

impl ScreenTransform {
    pub(crate) fn new(to_screen: Transform3D<f32>) -> Self {
        match to_screen.flattened().inverse() {
            Some(projection_from_screen) => ScreenTransform {
                to_screen,
                projection_from_screen,
                projection_from_screen_is_valid: true,
            },
            None => ScreenTransform {
                to_screen,
                projection_from_screen: Transform3D::identity(),
                projection_from_screen_is_valid: false,
            },
        }
    }
}

impl Default for TransformCache {
    fn default() -> Self {
        TransformCache {
            generation: None,
            root_of_2d_translation: TransformNodeIndex::ROOT,
            to_2d_translation_root: Vector2D::zero(),
            plane_root_transform: None,
            screen_transform: None,
            has_animation_to_screen: false,
            has_fixed: false,
            has_sticky: false,
            nearest_scroll_translation: None,
        }
    }
}

impl TransformCache {
    pub(crate) fn is_valid(&self, generation: u32) -> bool {
        self.generation == Some(generation)
    }

    /// Recomputes the cached paths from the node's local transform and its
    /// parent's already-updated cache. The screen transform is reset and
    /// rebuilt separately on demand.
    pub(crate) fn update(
        &mut self,
        generation: u32,
        index: TransformNodeIndex,
        node: &TransformNode,
        parent: Option<&TransformCache>,
    ) {
        self.generation = Some(generation);
        self.screen_transform = None;

        let Some(parent) = parent else {
            self.root_of_2d_translation = index;
            self.to_2d_translation_root = Vector2D::zero();
            self.plane_root_transform = None;
            self.has_animation_to_screen = node.has_active_animation();
            self.has_fixed = node.requires_compositing_for_fixed_position();
            self.has_sticky = node.requires_compositing_for_sticky_position();
            self.nearest_scroll_translation = node.is_scroll_translation().then_some(index);
            return;
        };

        self.has_animation_to_screen =
            parent.has_animation_to_screen || node.has_active_animation();
        self.has_fixed = parent.has_fixed || node.requires_compositing_for_fixed_position();
        self.has_sticky = parent.has_sticky || node.requires_compositing_for_sticky_position();
        self.nearest_scroll_translation = if node.is_scroll_translation() {
            Some(index)
        } else {
            parent.nearest_scroll_translation
        };

        if node.is_identity_or_2d_translation() && !node.has_active_animation() {
            // Extend the parent's run of 2d translations.
            let offset = node.value().as_translation().unwrap_or_default();
            self.root_of_2d_translation = parent.root_of_2d_translation;
            self.to_2d_translation_root = parent.to_2d_translation_root + offset;
            self.plane_root_transform =
                parent
                    .plane_root_transform
                    .as_ref()
                    .map(|plane| PlaneRootTransform {
                        plane_root: plane.plane_root,
                        to_plane_root: Transform3D::translation(offset.x, offset.y, 0.0)
                            .then(&plane.to_plane_root),
                        from_plane_root: plane
                            .from_plane_root
                            .then(&Transform3D::translation(-offset.x, -offset.y, 0.0)),
                        has_animation: plane.has_animation,
                    });
            return;
        }

        self.root_of_2d_translation = index;
        self.to_2d_translation_root = Vector2D::zero();

        // A non-flat or non-invertible local matrix starts a new plane with
        // this node as its root.
        let local = node.value().to_matrix();
        let local_inverse = if local.is_2d() { local.inverse() } else { None };
        self.plane_root_transform = local_inverse.map(|inverse| PlaneRootTransform {
            plane_root: parent.plane_root(),
            to_plane_root: local.then(&parent.to_plane_root()),
            from_plane_root: parent.from_plane_root().then(&inverse),
            has_animation: parent.has_animation_to_plane_root() || node.has_active_animation(),
        });
    }

    pub(crate) fn root_of_2d_translation(&self) -> TransformNodeIndex {
        self.root_of_2d_translation
    }

    pub(crate) fn to_2d_translation_root(&self) -> Vector2D<f32> {
        self.to_2d_translation_root
    }

    pub(crate) fn plane_root(&self) -> TransformNodeIndex {
        match &self.plane_root_transform {
            Some(plane) => plane.plane_root,
            None => self.root_of_2d_translation,
        }
    }

    pub(crate) fn to_plane_root(&self) -> Transform3D<f32> {
        match &self.plane_root_transform {
            Some(plane) => plane.to_plane_root,
            None => {
                let offset = self.to_2d_translation_root;
                Transform3D::translation(offset.x, offset.y, 0.0)
            },
        }
    }

    pub(crate) fn from_plane_root(&self) -> Transform3D<f32> {
        match &self.plane_root_transform {
            Some(plane) => plane.from_plane_root,
            None => {
                let offset = self.to_2d_translation_root;
                Transform3D::translation(-offset.x, -offset.y, 0.0)
            },
        }
    }

    pub(crate) fn has_animation_to_plane_root(&self) -> bool {
        self.plane_root_transform
            .as_ref()
            .is_some_and(|plane| plane.has_animation)
    }

    pub(crate) fn has_animation_to_screen(&self) -> bool {
        self.has_animation_to_screen
    }

    pub(crate) fn has_fixed(&self) -> bool {
        self.has_fixed
    }

    pub(crate) fn has_sticky(&self) -> bool {
        self.has_sticky
    }

    pub(crate) fn nearest_scroll_translation(&self) -> Option<TransformNodeIndex> {
        self.nearest_scroll_translation
    }

    pub(crate) fn has_screen_transform(&self) -> bool {
        self.screen_transform.is_some()
    }

    pub(crate) fn set_screen_transform(&mut self, screen: ScreenTransform) {
        self.screen_transform = Some(screen);
    }

    pub(crate) fn to_screen(&self) -> Transform3D<f32> {
        debug_assert!(self.screen_transform.is_some());
        match &self.screen_transform {
            Some(screen) => screen.to_screen,
            None => Transform3D::identity(),
        }
    }

    pub(crate) fn projection_from_screen(&self) -> Transform3D<f32> {
        debug_assert!(self.screen_transform.is_some());
        match &self.screen_transform {
            Some(screen) => screen.projection_from_screen,
            None => Transform3D::identity(),
        }
    }

    pub(crate) fn projection_from_screen_is_valid(&self) -> bool {
        self.screen_transform
            .as_ref()
            .is_some_and(|screen| screen.projection_from_screen_is_valid)
    }
}
