/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use euclid::default::{Point2D, Rect, Size2D, Transform3D};

/// 2^30, the largest extent at which rect arithmetic on "unbounded" rects
/// stays comfortably within f32 range.
const MAX_RECT_EXTENT: f32 = 1_073_741_824.0;

/// Projected points whose homogeneous w would reach zero or go negative are
/// clamped to this w instead, which keeps bounding rects finite.
const NEAR_PLANE_W: f32 = 0.000_001;

/// A rect large enough to stand in for an unbounded region while still
/// surviving translation and intersection math.
#[inline]
pub(crate) fn max_rect() -> Rect<f32> {
    Rect::new(
        Point2D::new(-MAX_RECT_EXTENT / 2.0, -MAX_RECT_EXTENT / 2.0),
        Size2D::new(MAX_RECT_EXTENT, MAX_RECT_EXTENT),
    )
}

/// Rect intersection that still counts rects sharing only an edge or a
/// corner, returning the (possibly zero-sized) shared region.
pub(crate) fn inclusive_intersection(a: &Rect<f32>, b: &Rect<f32>) -> Option<Rect<f32>> {
    let min_x = a.min_x().max(b.min_x());
    let min_y = a.min_y().max(b.min_y());
    let max_x = a.max_x().min(b.max_x());
    let max_y = a.max_y().min(b.max_y());
    if min_x > max_x || min_y > max_y {
        return None;
    }
    Some(Rect::new(
        Point2D::new(min_x, min_y),
        Size2D::new(max_x - min_x, max_y - min_y),
    ))
}

pub(crate) trait MatrixHelpers {
    /// Drops the z row and column of the transform, so 2d points map to 2d
    /// points with no dependence on depth.
    fn flattened(&self) -> Self;

    /// Whether the transform does nothing but translate within the xy plane.
    fn is_2d_translation(&self) -> bool;

    /// Maps `rect` through the transform and returns the bounding rect of
    /// the projected corners.
    fn project_rect(&self, rect: &Rect<f32>) -> Rect<f32>;
}

impl MatrixHelpers for Transform3D<f32> {
    fn flattened(&self) -> Self {
        let mut flat = *self;
        flat.m13 = 0.0;
        flat.m23 = 0.0;
        flat.m31 = 0.0;
        flat.m32 = 0.0;
        flat.m33 = 1.0;
        flat.m34 = 0.0;
        flat.m43 = 0.0;
        flat
    }

    fn is_2d_translation(&self) -> bool {
        self.m11 == 1.0 &&
            self.m12 == 0.0 &&
            self.m13 == 0.0 &&
            self.m14 == 0.0 &&
            self.m21 == 0.0 &&
            self.m22 == 1.0 &&
            self.m23 == 0.0 &&
            self.m24 == 0.0 &&
            self.m31 == 0.0 &&
            self.m32 == 0.0 &&
            self.m33 == 1.0 &&
            self.m34 == 0.0 &&
            self.m43 == 0.0 &&
            self.m44 == 1.0
    }

    fn project_rect(&self, rect: &Rect<f32>) -> Rect<f32> {
        let corners = [
            Point2D::new(rect.min_x(), rect.min_y()),
            Point2D::new(rect.max_x(), rect.min_y()),
            Point2D::new(rect.min_x(), rect.max_y()),
            Point2D::new(rect.max_x(), rect.max_y()),
        ];
        let mut min = Point2D::new(f32::MAX, f32::MAX);
        let mut max = Point2D::new(f32::MIN, f32::MIN);
        for corner in &corners {
            let x = corner.x * self.m11 + corner.y * self.m21 + self.m41;
            let y = corner.x * self.m12 + corner.y * self.m22 + self.m42;
            let w = (corner.x * self.m14 + corner.y * self.m24 + self.m44).max(NEAR_PLANE_W);
            let projected = Point2D::new(x / w, y / w);
            min = min.min(projected);
            max = max.max(projected);
        }
        Rect::new(min, (max - min).to_size())
    }
}
