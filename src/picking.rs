use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::core::Camera;
use crate::scene::{Geometry, ObjectTag, SceneGraph, SceneObject};

/// Drawable area in the same logical-pixel space as pointer events
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl CanvasRect {
    pub fn from_size(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Pixel position of a y-up NDC point, relative to the canvas
    pub fn ndc_to_pixels(&self, ndc: Vec2) -> Vec2 {
        Vec2::new(
            (ndc.x * 0.5 + 0.5) * self.width,
            (ndc.y * -0.5 + 0.5) * self.height,
        )
    }
}

/// Maps pointer coordinates into normalized device coordinates
pub struct PointerMapper;

impl PointerMapper {
    /// x grows right and y grows up, both in [-1, 1] across the canvas.
    /// A degenerate canvas maps everything to the centre.
    pub fn to_ndc(client: Vec2, canvas: &CanvasRect) -> Vec2 {
        if canvas.width <= 0.0 || canvas.height <= 0.0 {
            return Vec2::ZERO;
        }

        Vec2::new(
            ((client.x - canvas.left) / canvas.width) * 2.0 - 1.0,
            -((client.y - canvas.top) / canvas.height) * 2.0 + 1.0,
        )
    }

    pub fn to_ray(client: Vec2, canvas: &CanvasRect, camera: &Camera) -> (Vec2, Ray) {
        let ndc = Self::to_ndc(client, canvas);
        let ray = Ray::from_ndc(
            ndc,
            camera.view_matrix(),
            camera.projection_matrix(canvas.aspect()),
        );
        (ndc, ray)
    }
}

/// Ray for 3D picking
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray through a y-up NDC point
    pub fn from_ndc(ndc: Vec2, view_matrix: Mat4, proj_matrix: Mat4) -> Self {
        // The projection matrix flips Y for Vulkan, so undo it here
        let ray_clip = Vec4::new(ndc.x, -ndc.y, -1.0, 1.0);

        // Transform to view space
        let inv_proj = proj_matrix.inverse();
        let ray_view = inv_proj * ray_clip;
        let ray_view = Vec4::new(ray_view.x, ray_view.y, -1.0, 0.0);

        // Transform to world space
        let inv_view = view_matrix.inverse();
        let ray_world = inv_view * ray_view;

        let direction = Vec3::new(ray_world.x, ray_world.y, ray_world.z).normalize();
        let origin = inv_view.w_axis.truncate();

        Self { origin, direction }
    }

    /// Distance along the ray to where it enters the sphere
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let a = self.direction.dot(self.direction);
        let b = 2.0 * oc.dot(self.direction);
        let c = oc.dot(oc) - radius * radius;
        let discriminant = b * b - 4.0 * a * c;

        if discriminant < 0.0 {
            None
        } else {
            let t = (-b - discriminant.sqrt()) / (2.0 * a);
            if t >= 0.0 {
                Some(t)
            } else {
                None
            }
        }
    }

    /// Slab test against a box given by its model matrix and object-space extents
    pub fn intersects_box(&self, model: Mat4, min: Vec3, max: Vec3) -> Option<f32> {
        let inv_model = model.inverse();
        // Not renormalized, so t stays in world units
        let origin = inv_model.transform_point3(self.origin);
        let direction = inv_model.transform_vector3(self.direction);

        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            if d.abs() < 1e-8 {
                if o < min[axis] || o > max[axis] {
                    return None;
                }
                continue;
            }

            let t1 = (min[axis] - o) / d;
            let t2 = (max[axis] - o) / d;
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));
        }

        if tmax >= tmin && tmin >= 0.0 {
            Some(tmin)
        } else {
            None
        }
    }

    #[cfg(test)]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Distance to the first hit on `object`, if any
fn intersect_object(ray: &Ray, object: &SceneObject) -> Option<f32> {
    let transform = &object.transform;
    match &object.geometry {
        Geometry::Sphere { radius, .. } => {
            let scale = transform.scale.max_element();
            ray.intersects_sphere(transform.position, radius * scale)
        }
        Geometry::Box { size } => {
            let half = Vec3::splat(size * 0.5);
            ray.intersects_box(transform.model_matrix(), -half, half)
        }
        Geometry::Torus { radius, tube, .. } => {
            // Bounding slab only, tori are never checkable in the portfolio layout
            let half = Vec3::new(radius + tube, radius + tube, *tube);
            ray.intersects_box(transform.model_matrix(), -half, half)
        }
        Geometry::Points { .. } | Geometry::Grid { .. } | Geometry::Axes { .. } => None,
    }
}

/// Nearest checkable object along the ray
pub fn pick_nearest(ray: &Ray, scene: &SceneGraph) -> Option<(ObjectTag, f32)> {
    let mut closest: Option<(ObjectTag, f32)> = None;

    for obj in scene.checkable() {
        if let Some(distance) = intersect_object(ray, obj) {
            match closest {
                Some((_, closest_dist)) if closest_dist <= distance => {}
                _ => closest = Some((obj.tag, distance)),
            }
        }
    }

    closest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SceneConfigData, StarConfigData};

    fn camera() -> Camera {
        Camera::with_projection(Vec3::new(0.0, 0.0, 30.0), 75f32.to_radians(), 0.1, 1000.0)
    }

    fn scene() -> SceneGraph {
        SceneGraph::portfolio(&SceneConfigData::default(), Vec::new(), &StarConfigData::default())
    }

    #[test]
    fn test_ndc_corners() {
        let canvas = CanvasRect {
            left: 10.0,
            top: 20.0,
            width: 200.0,
            height: 100.0,
        };
        assert_eq!(PointerMapper::to_ndc(Vec2::new(10.0, 20.0), &canvas), Vec2::new(-1.0, 1.0));
        assert_eq!(PointerMapper::to_ndc(Vec2::new(210.0, 120.0), &canvas), Vec2::new(1.0, -1.0));
        assert_eq!(PointerMapper::to_ndc(Vec2::new(110.0, 70.0), &canvas), Vec2::ZERO);
    }

    #[test]
    fn test_degenerate_canvas_maps_to_center() {
        let canvas = CanvasRect::from_size(0.0, 0.0);
        assert_eq!(PointerMapper::to_ndc(Vec2::new(5.0, 5.0), &canvas), Vec2::ZERO);
    }

    #[test]
    fn test_center_ray_looks_forward() {
        let canvas = CanvasRect::from_size(800.0, 600.0);
        let (_, ray) = PointerMapper::to_ray(Vec2::new(400.0, 300.0), &canvas, &camera());
        assert!((ray.origin - Vec3::new(0.0, 0.0, 30.0)).length() < 1e-4);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
    }

    #[test]
    fn test_ray_reprojects_to_same_ndc() {
        let canvas = CanvasRect::from_size(1280.0, 720.0);
        let camera = camera();
        let (ndc, ray) = PointerMapper::to_ray(Vec2::new(900.0, 150.0), &canvas, &camera);
        let projected = camera.project(ray.at(25.0), canvas.aspect());
        assert!((projected - ndc).length() < 1e-4);
    }

    #[test]
    fn test_pick_portrait_at_center() {
        let canvas = CanvasRect::from_size(800.0, 600.0);
        let (_, ray) = PointerMapper::to_ray(Vec2::new(400.0, 300.0), &canvas, &camera());
        let (tag, distance) = pick_nearest(&ray, &scene()).expect("portrait under cursor");
        assert_eq!(tag, ObjectTag::Portrait);
        assert!((distance - 27.5).abs() < 1e-3);
    }

    #[test]
    fn test_pick_moon_by_projection() {
        let canvas = CanvasRect::from_size(800.0, 600.0);
        let camera = camera();
        let ndc = camera.project(Vec3::new(-10.0, 10.0, 10.0), canvas.aspect());
        let pixel = canvas.ndc_to_pixels(ndc);
        let (_, ray) = PointerMapper::to_ray(pixel, &canvas, &camera);
        assert_eq!(pick_nearest(&ray, &scene()).map(|(tag, _)| tag), Some(ObjectTag::Moon));
    }

    #[test]
    fn test_empty_space_picks_nothing() {
        let canvas = CanvasRect::from_size(800.0, 600.0);
        let (_, ray) = PointerMapper::to_ray(Vec2::new(790.0, 590.0), &canvas, &camera());
        assert!(pick_nearest(&ray, &scene()).is_none());
    }

    #[test]
    fn test_nearest_of_overlapping_hits_wins() {
        let mut scene = scene();
        // Line the moon up directly in front of the portrait
        if let Some(moon) = scene.get_mut(ObjectTag::Moon) {
            moon.transform.position = Vec3::new(0.0, 0.0, 10.0);
        }
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 30.0),
            direction: Vec3::NEG_Z,
        };
        assert_eq!(pick_nearest(&ray, &scene).map(|(tag, _)| tag), Some(ObjectTag::Moon));
    }

    #[test]
    fn test_rotated_box_hit() {
        let model = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_4);
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 10.0),
            direction: Vec3::NEG_Z,
        };
        let t = ray
            .intersects_box(model, Vec3::splat(-1.0), Vec3::splat(1.0))
            .expect("hit");
        assert!((t - (10.0 - std::f32::consts::SQRT_2)).abs() < 1e-4);
    }
}
