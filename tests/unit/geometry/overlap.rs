/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use euclid::default::{Point2D, Rect, Size2D, Vector2D};
use geometry::{
    ClipNodeIndex, ClipState, EffectNodeIndex, EffectState, GeometryMapper,
    IntersectionInclusivity, OverlayScrollbarClipBehavior, PixelMovingFilter, PropertyTree,
    PropertyTreeState, ScrollInfo, TransformNodeIndex, TransformState,
};
use quickcheck::quickcheck;

fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect<f32> {
    Rect::new(Point2D::new(x, y), Size2D::new(w, h))
}

fn state(transform: TransformNodeIndex) -> PropertyTreeState {
    PropertyTreeState::new(transform, ClipNodeIndex::ROOT, EffectNodeIndex::ROOT)
}

#[test]
fn overlap_in_the_same_space_compares_rects() {
    let tree = PropertyTree::new();
    let mapper = GeometryMapper::new(&tree);
    let root = PropertyTreeState::root();

    assert!(mapper.might_overlap_for_compositing(
        rect(0.0, 0.0, 10.0, 10.0),
        root,
        rect(5.0, 5.0, 10.0, 10.0),
        root,
    ));
    assert!(!mapper.might_overlap_for_compositing(
        rect(0.0, 0.0, 10.0, 10.0),
        root,
        rect(20.0, 20.0, 5.0, 5.0),
        root,
    ));
}

#[test]
fn contents_of_one_scroller_compare_at_current_offsets() {
    let mut tree = PropertyTree::new();
    let scroller = tree.add_scroll_translation(
        TransformNodeIndex::ROOT,
        Vector2D::zero(),
        ScrollInfo::new(rect(0.0, 0.0, 100.0, 100.0), rect(0.0, 0.0, 100.0, 400.0)),
    );
    let a = tree.add_2d_translation(scroller, Vector2D::new(10.0, 0.0));
    let b = tree.add_2d_translation(scroller, Vector2D::new(0.0, 10.0));
    let mapper = GeometryMapper::new(&tree);

    // Both sides scroll together, so no expansion happens and the current
    // positions decide.
    assert!(mapper.might_overlap_for_compositing(
        rect(0.0, 0.0, 10.0, 10.0),
        state(a),
        rect(5.0, -5.0, 10.0, 10.0),
        state(b),
    ));
    assert!(!mapper.might_overlap_for_compositing(
        rect(0.0, 0.0, 10.0, 10.0),
        state(a),
        rect(50.0, 50.0, 10.0, 10.0),
        state(b),
    ));
}

#[test]
fn scrolled_content_can_reach_the_whole_scrollport() {
    let mut tree = PropertyTree::new();
    let scroller = tree.add_scroll_translation(
        TransformNodeIndex::ROOT,
        Vector2D::zero(),
        ScrollInfo::new(rect(0.0, 0.0, 200.0, 200.0), rect(0.0, 0.0, 200.0, 1000.0)),
    );
    let mapper = GeometryMapper::new(&tree);

    // Content far below the fold can still scroll up under content overlaying
    // the scrollport.
    assert!(mapper.might_overlap_for_compositing(
        rect(0.0, 600.0, 10.0, 10.0),
        state(scroller),
        rect(0.0, 100.0, 10.0, 10.0),
        PropertyTreeState::root(),
    ));
    // No scroll offset moves content sideways past the scrollport's edge.
    assert!(!mapper.might_overlap_for_compositing(
        rect(500.0, 600.0, 10.0, 10.0),
        state(scroller),
        rect(0.0, 100.0, 10.0, 10.0),
        PropertyTreeState::root(),
    ));
}

#[test]
fn blurred_content_in_a_scroller_overlaps_through_its_halo() {
    let mut tree = PropertyTree::new();
    let scroller = tree.add_scroll_translation(
        TransformNodeIndex::ROOT,
        Vector2D::zero(),
        ScrollInfo::new(rect(0.0, 0.0, 100.0, 100.0), rect(0.0, 0.0, 100.0, 200.0)),
    );
    let blur = tree.add_effect(
        EffectNodeIndex::ROOT,
        EffectState {
            filter: Some(PixelMovingFilter::uniform(100.0)),
            ..EffectState::new(scroller)
        },
    );
    let blur_clip = tree.add_clip(
        ClipNodeIndex::ROOT,
        ClipState {
            pixel_moving_filter: Some(blur),
            ..ClipState::new(scroller, rect(-1000.0, -1000.0, 3000.0, 3000.0))
        },
    );
    let mapper = GeometryMapper::new(&tree);
    let blurred = PropertyTreeState::new(scroller, blur_clip, blur);

    // The blur spreads the content across the whole scrollport, but no
    // further.
    assert!(mapper.might_overlap_for_compositing(
        rect(0.0, 0.0, 10.0, 10.0),
        blurred,
        rect(50.0, 50.0, 10.0, 10.0),
        PropertyTreeState::root(),
    ));
    assert!(!mapper.might_overlap_for_compositing(
        rect(0.0, 0.0, 10.0, 10.0),
        blurred,
        rect(120.0, 50.0, 10.0, 10.0),
        PropertyTreeState::root(),
    ));
}

#[test]
fn animating_filters_in_a_scroller_reach_the_whole_scrollport() {
    let mut tree = PropertyTree::new();
    let scroller = tree.add_scroll_translation(
        TransformNodeIndex::ROOT,
        Vector2D::zero(),
        ScrollInfo::new(rect(0.0, 0.0, 100.0, 100.0), rect(0.0, 0.0, 100.0, 200.0)),
    );
    let wobble = tree.add_effect(
        EffectNodeIndex::ROOT,
        EffectState {
            filter: Some(PixelMovingFilter::uniform(1.0)),
            has_active_filter_animation: true,
            ..EffectState::new(scroller)
        },
    );
    let wobble_clip = tree.add_clip(
        ClipNodeIndex::ROOT,
        ClipState {
            pixel_moving_filter: Some(wobble),
            ..ClipState::new(scroller, rect(-1000.0, -1000.0, 3000.0, 3000.0))
        },
    );
    let mapper = GeometryMapper::new(&tree);
    let wobbling = PropertyTreeState::new(scroller, wobble_clip, wobble);

    // A 1px halo never bridges the gap sideways; an animating filter can put
    // the content anywhere in the scrollport.
    assert!(mapper.might_overlap_for_compositing(
        rect(0.0, 0.0, 10.0, 10.0),
        wobbling,
        rect(50.0, 50.0, 10.0, 10.0),
        PropertyTreeState::root(),
    ));
}

#[test]
fn fixed_content_overlaps_what_scrolls_beneath_it() {
    let mut tree = PropertyTree::new();
    let scroller = tree.add_scroll_translation(
        TransformNodeIndex::ROOT,
        Vector2D::zero(),
        ScrollInfo::new(rect(0.0, 0.0, 300.0, 300.0), rect(0.0, 0.0, 300.0, 1000.0)),
    );
    let fixed = tree.add_transform(
        TransformNodeIndex::ROOT,
        TransformState {
            requires_compositing_for_fixed_position: true,
            scroll_translation_for_fixed: Some(scroller),
            ..TransformState::default()
        },
    );
    let mapper = GeometryMapper::new(&tree);

    // A fixed bottom bar against content that is currently far offscreen.
    assert!(mapper.might_overlap_for_compositing(
        rect(0.0, 250.0, 300.0, 50.0),
        state(fixed),
        rect(0.0, 900.0, 300.0, 50.0),
        state(scroller),
    ));
    // A fixed side bar never meets content confined to the far column.
    assert!(!mapper.might_overlap_for_compositing(
        rect(250.0, 0.0, 50.0, 300.0),
        state(fixed),
        rect(0.0, 900.0, 100.0, 50.0),
        state(scroller),
    ));
}

#[test]
fn fixed_content_casts_its_filter_halo_over_scrolling_content() {
    let mut tree = PropertyTree::new();
    let scroller = tree.add_scroll_translation(
        TransformNodeIndex::ROOT,
        Vector2D::zero(),
        ScrollInfo::new(rect(0.0, 0.0, 300.0, 300.0), rect(0.0, 0.0, 300.0, 1000.0)),
    );
    let fixed = tree.add_transform(
        TransformNodeIndex::ROOT,
        TransformState {
            requires_compositing_for_fixed_position: true,
            scroll_translation_for_fixed: Some(scroller),
            ..TransformState::default()
        },
    );
    let shadow = tree.add_effect(
        EffectNodeIndex::ROOT,
        EffectState {
            filter: Some(PixelMovingFilter::uniform(200.0)),
            ..EffectState::new(fixed)
        },
    );
    let shadow_clip = tree.add_clip(
        ClipNodeIndex::ROOT,
        ClipState {
            pixel_moving_filter: Some(shadow),
            ..ClipState::new(fixed, rect(-1000.0, -1000.0, 3000.0, 3000.0))
        },
    );
    let mapper = GeometryMapper::new(&tree);
    let shadowed = PropertyTreeState::new(fixed, shadow_clip, shadow);

    // The side bar itself never meets the far column, but its shadow does.
    assert!(mapper.might_overlap_for_compositing(
        rect(250.0, 0.0, 50.0, 300.0),
        shadowed,
        rect(0.0, 900.0, 100.0, 50.0),
        state(scroller),
    ));
}

#[test]
fn animated_transforms_overlap_everything_in_reach() {
    let mut tree = PropertyTree::new();
    let animated = tree.add_transform(
        TransformNodeIndex::ROOT,
        TransformState {
            has_active_animation: true,
            ..TransformState::default()
        },
    );
    let mapper = GeometryMapper::new(&tree);

    assert!(mapper.might_overlap_for_compositing(
        rect(0.0, 0.0, 10.0, 10.0),
        state(animated),
        rect(1000.0, 1000.0, 10.0, 10.0),
        PropertyTreeState::root(),
    ));
}

#[test]
fn sticky_content_is_unbounded_for_overlap_but_exact_for_mapping() {
    let mut tree = PropertyTree::new();
    let sticky = tree.add_transform(
        TransformNodeIndex::ROOT,
        TransformState {
            requires_compositing_for_sticky_position: true,
            ..TransformState::default()
        },
    );
    let mapper = GeometryMapper::new(&tree);

    assert!(mapper.might_overlap_for_compositing(
        rect(0.0, 0.0, 10.0, 10.0),
        state(sticky),
        rect(800.0, 800.0, 5.0, 5.0),
        PropertyTreeState::root(),
    ));

    let mut visual = geometry::FloatClipRect::new(rect(0.0, 0.0, 10.0, 10.0));
    let non_empty = mapper.local_to_ancestor_visual_rect(
        state(sticky),
        PropertyTreeState::root(),
        &mut visual,
        OverlayScrollbarClipBehavior::IgnoreOverlayScrollbarSize,
        IntersectionInclusivity::NonInclusive,
    );
    assert!(non_empty);
    assert_eq!(visual.rect(), rect(0.0, 0.0, 10.0, 10.0));
}

#[test]
fn nested_scrollers_compound_their_reach() {
    let mut tree = PropertyTree::new();
    let outer = tree.add_scroll_translation(
        TransformNodeIndex::ROOT,
        Vector2D::zero(),
        ScrollInfo::new(rect(0.0, 0.0, 100.0, 100.0), rect(0.0, 0.0, 100.0, 500.0)),
    );
    let inner = tree.add_scroll_translation(
        outer,
        Vector2D::zero(),
        ScrollInfo::new(rect(0.0, 0.0, 80.0, 80.0), rect(0.0, 0.0, 80.0, 400.0)),
    );
    let mapper = GeometryMapper::new(&tree);

    assert!(mapper.might_overlap_for_compositing(
        rect(0.0, 350.0, 80.0, 20.0),
        state(inner),
        rect(0.0, 40.0, 100.0, 10.0),
        PropertyTreeState::root(),
    ));
    // The inner scrollport never extends below y=80 of the outer contents,
    // which in turn never shows below y=100 of the page.
    assert!(!mapper.might_overlap_for_compositing(
        rect(0.0, 350.0, 80.0, 20.0),
        state(inner),
        rect(0.0, 90.0, 100.0, 10.0),
        PropertyTreeState::root(),
    ));
}

#[test]
fn overlap_queries_ignore_cache_entries_tainted_by_animation() {
    let mut tree = PropertyTree::new();
    let animated = tree.add_transform(
        TransformNodeIndex::ROOT,
        TransformState {
            has_active_animation: true,
            ..TransformState::default()
        },
    );
    let clip = tree.add_clip_rect(ClipNodeIndex::ROOT, animated, rect(0.0, 0.0, 50.0, 50.0));
    let inner = tree.add_2d_translation(animated, Vector2D::zero());
    let local = PropertyTreeState::new(inner, clip, EffectNodeIndex::ROOT);
    let mapper = GeometryMapper::new(&tree);

    // A plain query first, to prime the clip cache across the animated
    // transform.
    let mut visual = geometry::FloatClipRect::new(rect(0.0, 0.0, 10.0, 10.0));
    let non_empty = mapper.local_to_ancestor_visual_rect(
        local,
        PropertyTreeState::root(),
        &mut visual,
        OverlayScrollbarClipBehavior::IgnoreOverlayScrollbarSize,
        IntersectionInclusivity::NonInclusive,
    );
    assert!(non_empty);
    assert_eq!(visual.rect(), rect(0.0, 0.0, 10.0, 10.0));

    // The overlap query must not reuse that entry: with the animation free
    // to move both content and clip, everything in reach may overlap.
    assert!(mapper.might_overlap_for_compositing(
        rect(0.0, 0.0, 10.0, 10.0),
        local,
        rect(500.0, 500.0, 10.0, 10.0),
        PropertyTreeState::root(),
    ));

    // And the plain query still answers from the primed cache afterwards.
    let mut again = geometry::FloatClipRect::new(rect(0.0, 0.0, 10.0, 10.0));
    let non_empty = mapper.local_to_ancestor_visual_rect(
        local,
        PropertyTreeState::root(),
        &mut again,
        OverlayScrollbarClipBehavior::IgnoreOverlayScrollbarSize,
        IntersectionInclusivity::NonInclusive,
    );
    assert!(non_empty);
    assert_eq!(again.rect(), rect(0.0, 0.0, 10.0, 10.0));
}

#[test]
fn overlap_verdicts_are_scroll_invariant_and_conservative() {
    fn verdict(scroll_offset: f32, content_y: f32, other_y: f32) -> (bool, bool) {
        let mut tree = PropertyTree::new();
        let scrollport_clip = tree.add_clip_rect(
            ClipNodeIndex::ROOT,
            TransformNodeIndex::ROOT,
            rect(0.0, 0.0, 200.0, 200.0),
        );
        let scroller = tree.add_scroll_translation(
            TransformNodeIndex::ROOT,
            Vector2D::new(0.0, -scroll_offset),
            ScrollInfo::new(rect(0.0, 0.0, 200.0, 200.0), rect(0.0, 0.0, 200.0, 1000.0)),
        );
        let mapper = GeometryMapper::new(&tree);
        let scrolled = PropertyTreeState::new(scroller, scrollport_clip, EffectNodeIndex::ROOT);
        let content = rect(0.0, content_y, 50.0, 50.0);
        let other = rect(0.0, other_y, 50.0, 50.0);

        let might = mapper.might_overlap_for_compositing(
            content,
            scrolled,
            other,
            PropertyTreeState::root(),
        );

        let mut visual = geometry::FloatClipRect::new(content);
        let visible = mapper.local_to_ancestor_visual_rect(
            scrolled,
            PropertyTreeState::root(),
            &mut visual,
            OverlayScrollbarClipBehavior::IgnoreOverlayScrollbarSize,
            IntersectionInclusivity::NonInclusive,
        );
        let overlaps_now = visible && visual.rect().intersects(&other);
        (might, overlaps_now)
    }

    fn prop(content_y: u16, other_y: u16, offset: u16) -> bool {
        let content_y = f32::from(content_y % 950);
        let other_y = f32::from(other_y % 950);
        let offset = f32::from(offset % 800);
        let (might, overlaps_now) = verdict(offset, content_y, other_y);
        let (might_at_zero, _) = verdict(0.0, content_y, other_y);
        (!overlaps_now || might) && might == might_at_zero
    }

    quickcheck(prop as fn(u16, u16, u16) -> bool);
}
