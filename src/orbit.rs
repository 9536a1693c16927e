use glam::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};

use crate::core::Camera;

const MIN_POLAR: f32 = 1e-4;
const MIN_DISTANCE: f32 = 0.5;
const MAX_DISTANCE: f32 = 900.0;
const PAN_SCALE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Rotate,
    Pan,
}

/// Orbit camera controls revolving around a target point.
///
/// The camera is only written while the user is interacting, so whatever
/// pose is set from outside stays put until the next drag or wheel step.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    drag: Option<(DragMode, Vec2)>,
}

impl OrbitControls {
    pub fn new(target: Vec3, rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            target,
            rotate_speed,
            zoom_speed,
            drag: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn begin_drag(&mut self, mode: DragMode, position: Vec2) {
        self.drag = Some((mode, position));
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Continue a drag to `position`. One full viewport height of motion is one turn.
    pub fn drag_to(&mut self, position: Vec2, viewport_height: f32, camera: &mut Camera) {
        let Some((mode, last)) = self.drag else {
            return;
        };
        self.drag = Some((mode, position));

        let delta = position - last;
        if delta == Vec2::ZERO || viewport_height <= 0.0 {
            return;
        }

        match mode {
            DragMode::Rotate => {
                let scale = TAU * self.rotate_speed / viewport_height;
                self.rotate(-delta.x * scale, -delta.y * scale, camera);
            }
            DragMode::Pan => self.pan(delta, viewport_height, camera),
        }
    }

    /// Spin around the target by azimuth and polar deltas in radians
    pub fn rotate(&mut self, d_azimuth: f32, d_polar: f32, camera: &mut Camera) {
        let offset = camera.position() - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return;
        }

        let azimuth = offset.x.atan2(offset.z) + d_azimuth;
        let polar = ((offset.y / radius).clamp(-1.0, 1.0).acos() + d_polar).clamp(MIN_POLAR, PI - MIN_POLAR);

        let offset = Vec3::new(
            radius * polar.sin() * azimuth.sin(),
            radius * polar.cos(),
            radius * polar.sin() * azimuth.cos(),
        );
        self.apply(offset, camera);
    }

    /// Move camera and target together in the view plane
    pub fn pan(&mut self, delta: Vec2, viewport_height: f32, camera: &mut Camera) {
        let offset = camera.position() - self.target;
        // World units per pixel at the target distance
        let units = 2.0 * offset.length() * (camera.fov() * 0.5).tan() / viewport_height;

        let rotation = camera.rotation();
        let right = rotation * Vec3::X;
        let up = rotation * Vec3::Y;
        let shift = (-right * delta.x + up * delta.y) * units * PAN_SCALE;

        self.target += shift;
        camera.set_position(camera.position() + shift);
    }

    /// Dolly toward the target for positive steps, away for negative
    pub fn zoom(&mut self, steps: f32, camera: &mut Camera) {
        if steps == 0.0 {
            return;
        }
        let offset = camera.position() - self.target;
        let scale = 0.95f32.powf(self.zoom_speed * steps);
        let length = (offset.length() * scale).clamp(MIN_DISTANCE, MAX_DISTANCE);
        self.apply(offset.normalize_or_zero() * length, camera);
    }

    /// Forget any drag and orbit around `target` again
    pub fn reset(&mut self, target: Vec3) {
        self.target = target;
        self.drag = None;
    }

    fn apply(&self, offset: Vec3, camera: &mut Camera) {
        camera.set_position(self.target + offset);
        camera.look_at(self.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::with_projection(Vec3::new(0.0, 0.0, 30.0), 75f32.to_radians(), 0.1, 1000.0)
    }

    #[test]
    fn test_rotate_keeps_distance_and_faces_target() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(Vec3::ZERO, 1.0, 1.0);

        controls.rotate(0.7, -0.3, &mut camera);

        assert!((camera.position().length() - 30.0).abs() < 1e-3);
        let to_target = (-camera.position()).normalize();
        assert!((camera.forward() - to_target).length() < 1e-4);
    }

    #[test]
    fn test_drag_without_begin_is_ignored() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(Vec3::ZERO, 1.0, 1.0);
        controls.drag_to(Vec2::new(100.0, 100.0), 720.0, &mut camera);
        assert_eq!(camera.position(), Vec3::new(0.0, 0.0, 30.0));
    }

    #[test]
    fn test_drag_rotates() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(Vec3::ZERO, 1.0, 1.0);
        controls.begin_drag(DragMode::Rotate, Vec2::new(100.0, 100.0));
        controls.drag_to(Vec2::new(280.0, 100.0), 720.0, &mut camera);
        controls.end_drag();

        // A quarter of the height is a quarter turn
        assert!((camera.position() - Vec3::new(-30.0, 0.0, 0.0)).length() < 1e-2);
        assert!(!controls.is_dragging());
    }

    #[test]
    fn test_zoom_in_and_clamp() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(Vec3::ZERO, 1.0, 1.0);

        controls.zoom(1.0, &mut camera);
        assert!((camera.position().z - 28.5).abs() < 1e-3);

        controls.zoom(1000.0, &mut camera);
        assert!((camera.position().length() - MIN_DISTANCE).abs() < 1e-4);
    }

    #[test]
    fn test_pan_moves_target_with_camera() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(Vec3::ZERO, 1.0, 1.0);
        controls.pan(Vec2::new(-50.0, 0.0), 720.0, &mut camera);

        assert!(controls.target.x > 0.0);
        assert!((camera.position() - controls.target - Vec3::new(0.0, 0.0, 30.0)).length() < 1e-3);
    }
}
