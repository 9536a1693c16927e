/// Placement of the info panel relative to its anchor.
///
/// The panel hangs above the projected object, centred horizontally, and is
/// pushed back inside the viewport whenever it would come within `padding`
/// of an edge.

use glam::Vec2;

const VIEWPORT: Vec2 = Vec2::new(1280.0, 720.0);
const PADDING: f32 = 40.0;

/// Pixel position of a y-up NDC anchor
fn ndc_to_pixels(ndc: Vec2, viewport: Vec2) -> Vec2 {
    Vec2::new((ndc.x * 0.5 + 0.5) * viewport.x, (ndc.y * -0.5 + 0.5) * viewport.y)
}

/// Top-left corner of a `size` panel whose bottom centre sits at `anchor`
fn place(anchor: Vec2, size: Vec2, viewport: Vec2, padding: f32) -> Vec2 {
    let x = if anchor.x - size.x / 2.0 < padding {
        size.x / 2.0 + padding
    } else if anchor.x + size.x / 2.0 > viewport.x - padding {
        viewport.x - size.x / 2.0 - padding
    } else {
        anchor.x
    };

    let y = if anchor.y - size.y < padding {
        size.y + padding
    } else if anchor.y > viewport.y - padding {
        viewport.y - padding
    } else {
        anchor.y
    };

    Vec2::new(x - size.x / 2.0, y - size.y)
}

fn inside_padding(min: Vec2, size: Vec2) -> bool {
    min.x >= PADDING - 1e-3
        && min.y >= PADDING - 1e-3
        && min.x + size.x <= VIEWPORT.x - PADDING + 1e-3
        && min.y + size.y <= VIEWPORT.y - PADDING + 1e-3
}

#[test]
fn test_ndc_centre_is_viewport_centre() {
    assert_eq!(ndc_to_pixels(Vec2::ZERO, VIEWPORT), Vec2::new(640.0, 360.0));
    assert_eq!(ndc_to_pixels(Vec2::new(-1.0, 1.0), VIEWPORT), Vec2::ZERO);
    assert_eq!(ndc_to_pixels(Vec2::new(1.0, -1.0), VIEWPORT), VIEWPORT);
}

#[test]
fn test_unclamped_panel_sits_above_anchor() {
    let size = Vec2::new(300.0, 200.0);
    let anchor = Vec2::new(640.0, 500.0);
    let min = place(anchor, size, VIEWPORT, PADDING);

    assert_eq!(min, Vec2::new(490.0, 300.0));
}

#[test]
fn test_every_edge_clamps_into_padding() {
    let size = Vec2::new(360.0, 240.0);
    let anchors = [
        Vec2::new(0.0, 0.0),
        Vec2::new(VIEWPORT.x, 0.0),
        Vec2::new(0.0, VIEWPORT.y),
        Vec2::new(VIEWPORT.x, VIEWPORT.y),
        Vec2::new(-500.0, 360.0),
        Vec2::new(640.0, 5000.0),
    ];

    for anchor in anchors {
        let min = place(anchor, size, VIEWPORT, PADDING);
        assert!(inside_padding(min, size), "anchor {:?} placed at {:?}", anchor, min);
    }
}

#[test]
fn test_clamp_lands_exactly_on_padding() {
    let size = Vec2::new(360.0, 240.0);

    let left = place(Vec2::new(10.0, 400.0), size, VIEWPORT, PADDING);
    assert!((left.x - PADDING).abs() < 1e-4);

    let top = place(Vec2::new(640.0, 10.0), size, VIEWPORT, PADDING);
    assert!((top.y - PADDING).abs() < 1e-4);

    let bottom = place(Vec2::new(640.0, 715.0), size, VIEWPORT, PADDING);
    assert!((bottom.y + size.y - (VIEWPORT.y - PADDING)).abs() < 1e-4);
}
