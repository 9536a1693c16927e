/// Screen <-> world conventions shared by picking and rendering.
///
/// The renderer draws with a Y-flipped projection (Vulkan clip space points
/// +Y down) while pointer mapping uses y-up NDC. These checks make sure a
/// ray cast through the pixel an object is drawn at goes back through it.

use glam::{Mat4, Vec2, Vec3, Vec4};

const WIDTH: f32 = 1280.0;
const HEIGHT: f32 = 720.0;

fn camera() -> (Mat4, Mat4) {
    let eye = Vec3::new(0.0, 0.0, 30.0);
    let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
    let mut proj = Mat4::perspective_rh(75.0_f32.to_radians(), WIDTH / HEIGHT, 0.1, 1000.0);
    proj.y_axis.y *= -1.0; // Vulkan flip
    (view, proj)
}

/// Where the rasterizer puts a world point, in pixels from the top-left
fn rasterize(world: Vec3, view: Mat4, proj: Mat4) -> Vec2 {
    let clip = proj * view * world.extend(1.0);
    let ndc = Vec2::new(clip.x / clip.w, clip.y / clip.w);
    // Vulkan viewport transform: -1 is the top row
    Vec2::new((ndc.x + 1.0) * 0.5 * WIDTH, (ndc.y + 1.0) * 0.5 * HEIGHT)
}

/// Pointer pixel to y-up NDC
fn pointer_to_ndc(pixel: Vec2) -> Vec2 {
    Vec2::new(pixel.x / WIDTH * 2.0 - 1.0, -(pixel.y / HEIGHT) * 2.0 + 1.0)
}

fn ray_from_ndc(ndc: Vec2, view: Mat4, proj: Mat4) -> (Vec3, Vec3) {
    let clip = Vec4::new(ndc.x, -ndc.y, -1.0, 1.0);
    let eye = proj.inverse() * clip;
    let eye = Vec4::new(eye.x, eye.y, -1.0, 0.0);
    let inv_view = view.inverse();
    let direction = (inv_view * eye).truncate().normalize();
    (inv_view.w_axis.truncate(), direction)
}

fn distance_to_ray(point: Vec3, origin: Vec3, direction: Vec3) -> f32 {
    let to_point = point - origin;
    (to_point - direction * to_point.dot(direction)).length()
}

#[test]
fn test_centre_pixel_looks_down_negative_z() {
    let (view, proj) = camera();
    let (origin, direction) = ray_from_ndc(pointer_to_ndc(Vec2::new(WIDTH / 2.0, HEIGHT / 2.0)), view, proj);

    assert!((origin - Vec3::new(0.0, 0.0, 30.0)).length() < 1e-4);
    assert!((direction - Vec3::NEG_Z).length() < 1e-4);
}

#[test]
fn test_points_above_origin_draw_in_top_half() {
    let (view, proj) = camera();
    let pixel = rasterize(Vec3::new(0.0, 5.0, 0.0), view, proj);

    assert!((pixel.x - WIDTH / 2.0).abs() < 1e-3);
    assert!(pixel.y < HEIGHT / 2.0, "y-up world must map to the top of the window, got {}", pixel.y);
}

#[test]
fn test_ray_through_drawn_pixel_hits_the_point() {
    let (view, proj) = camera();
    let points = [
        Vec3::new(-10.0, 0.0, -10.0), // moon
        Vec3::new(2.0, 0.0, -5.0),    // portrait
        Vec3::new(6.0, -4.0, 3.0),
        Vec3::new(-12.0, 8.0, -40.0),
    ];

    for point in points {
        let pixel = rasterize(point, view, proj);
        let (origin, direction) = ray_from_ndc(pointer_to_ndc(pixel), view, proj);
        let miss = distance_to_ray(point, origin, direction);
        assert!(miss < 1e-3, "ray through {:?} misses {:?} by {}", pixel, point, miss);
    }
}

#[test]
fn test_corner_pixels_map_to_unit_ndc() {
    assert_eq!(pointer_to_ndc(Vec2::new(0.0, 0.0)), Vec2::new(-1.0, 1.0));
    assert_eq!(pointer_to_ndc(Vec2::new(WIDTH, HEIGHT)), Vec2::new(1.0, -1.0));
    assert_eq!(pointer_to_ndc(Vec2::new(WIDTH / 2.0, HEIGHT / 2.0)), Vec2::ZERO);
}

#[test]
fn test_wider_viewport_spreads_rays_horizontally() {
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 30.0), Vec3::ZERO, Vec3::Y);
    let fov = 75.0_f32.to_radians();

    let mut narrow = Mat4::perspective_rh(fov, 1.0, 0.1, 1000.0);
    narrow.y_axis.y *= -1.0;
    let mut wide = Mat4::perspective_rh(fov, 2.0, 0.1, 1000.0);
    wide.y_axis.y *= -1.0;

    let edge = Vec2::new(1.0, 0.0);
    let (_, narrow_dir) = ray_from_ndc(edge, view, narrow);
    let (_, wide_dir) = ray_from_ndc(edge, view, wide);

    assert!(wide_dir.x > narrow_dir.x);
    // Vertical field of view is fixed, so the top edge does not move
    let top = Vec2::new(0.0, 1.0);
    let (_, narrow_top) = ray_from_ndc(top, view, narrow);
    let (_, wide_top) = ray_from_ndc(top, view, wide);
    assert!((narrow_top - wide_top).length() < 1e-4);
}
