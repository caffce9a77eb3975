/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Clip rects that remember how faithful they are to the true clipped region.

use euclid::default::{Rect, Transform3D, Vector2D};
use malloc_size_of_derive::MallocSizeOf;

use crate::util::{self, MatrixHelpers};

/// An axis-aligned clip rect in some transform space, together with flags
/// describing its relation to the true clipped region.
///
/// `is_tight` means the rect is exactly the region; mapping through anything
/// other than a 2d translation, or combining with a rounded or clip-path
/// clip, degrades the rect to a conservative bound and clears the flag.
/// `is_infinite` means no clip applies at all. The stored rect of an infinite
/// clip is a large finite placeholder so that arithmetic on it stays finite.
#[derive(Clone, Copy, Debug, MallocSizeOf, PartialEq)]
#[cfg_attr(feature = "capture", derive(serde::Serialize))]
#[cfg_attr(feature = "replay", derive(serde::Deserialize))]
pub struct FloatClipRect {
    rect: Rect<f32>,
    is_tight: bool,
    has_radius: bool,
    is_infinite: bool,
}

impl Default for FloatClipRect {
    /// The infinite clip rect: nothing is clipped, and that is exact.
    fn default() -> Self {
        FloatClipRect {
            rect: util::max_rect(),
            is_tight: true,
            has_radius: false,
            is_infinite: true,
        }
    }
}

impl FloatClipRect {
    pub fn new(rect: Rect<f32>) -> Self {
        FloatClipRect {
            rect,
            is_tight: true,
            has_radius: false,
            is_infinite: false,
        }
    }

    /// A clip rect bounding a rounded rect. The bounds are kept but the
    /// rounded corners make them inexact.
    pub fn rounded(rect: Rect<f32>) -> Self {
        FloatClipRect {
            rect,
            is_tight: false,
            has_radius: true,
            is_infinite: false,
        }
    }

    /// The infinite clip rect with tightness already given up, used when a
    /// query fails open.
    pub fn infinite_loose() -> Self {
        FloatClipRect {
            is_tight: false,
            ..Default::default()
        }
    }

    pub fn rect(&self) -> Rect<f32> {
        self.rect
    }

    pub fn is_tight(&self) -> bool {
        self.is_tight
    }

    pub fn has_radius(&self) -> bool {
        self.has_radius
    }

    pub fn is_infinite(&self) -> bool {
        self.is_infinite
    }

    pub fn is_empty(&self) -> bool {
        !self.is_infinite && self.rect.is_empty()
    }

    pub fn clear_is_tight(&mut self) {
        self.is_tight = false;
    }

    /// Marks the clip as rounded. A rounded region is never exactly a rect.
    pub fn set_has_radius(&mut self) {
        self.has_radius = true;
        self.is_tight = false;
    }

    /// Replaces the rect, keeping the flags. The result is always finite.
    pub fn set_rect(&mut self, rect: Rect<f32>) {
        self.rect = rect;
        self.is_infinite = false;
    }

    /// Maps the rect through `transform`. A 2d translation moves the rect
    /// exactly; any other transform replaces it with the bounding rect of the
    /// projected corners and clears `is_tight`.
    pub fn map(&mut self, transform: &Transform3D<f32>) {
        if transform.is_2d_translation() {
            let offset = Vector2D::new(transform.m41, transform.m42);
            if !self.is_infinite && offset != Vector2D::zero() {
                self.rect = self.rect.translate(offset);
            }
            return;
        }
        self.is_tight = false;
        if !self.is_infinite {
            self.rect = transform.project_rect(&self.rect);
        }
    }

    pub fn intersect(&mut self, other: &FloatClipRect) {
        if other.has_radius {
            self.set_has_radius();
        } else if !other.is_tight {
            self.is_tight = false;
        }
        if other.is_infinite {
            return;
        }
        if self.is_infinite {
            self.rect = other.rect;
            self.is_infinite = false;
            return;
        }
        self.rect = self.rect.intersection(&other.rect).unwrap_or_else(Rect::zero);
    }

    /// Like `intersect`, but regions sharing only an edge or corner still
    /// count as intersecting. Returns false, leaving `self` empty, when the
    /// two regions have no common point at all.
    pub fn inclusive_intersect(&mut self, other: &FloatClipRect) -> bool {
        if other.has_radius {
            self.set_has_radius();
        } else if !other.is_tight {
            self.is_tight = false;
        }
        if other.is_infinite {
            return true;
        }
        if self.is_infinite {
            self.rect = other.rect;
            self.is_infinite = false;
            return true;
        }
        match util::inclusive_intersection(&self.rect, &other.rect) {
            Some(shared) => {
                self.rect = shared;
                true
            },
            None => {
                self.rect = Rect::zero();
                false
            },
        }
    }
}
