use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// Everything needed to put a camera back exactly where it started
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
    /// Field of view in radians
    pub fov: f32,
    pub near_plane: f32,
    pub far_plane: f32,
}

/// Perspective camera
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    position: Vec3,
    /// Camera rotation (pitch, yaw, roll in radians)
    pitch: f32,
    yaw: f32,
    roll: f32,
    /// Field of view in radians
    fov: f32,
    near_plane: f32,
    far_plane: f32,
}

impl Camera {
    /// Create a camera with custom projection parameters, looking down -Z
    pub fn with_projection(position: Vec3, fov: f32, near_plane: f32, far_plane: f32) -> Self {
        Self {
            position,
            pitch: 0.0,
            yaw: 0.0,
            roll: 0.0,
            fov,
            near_plane,
            far_plane,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Get the camera's rotation as quaternion
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(glam::EulerRot::YXZ, self.yaw, self.pitch, self.roll)
    }

    #[cfg(test)]
    pub fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::NEG_Z
    }

    /// Get the view matrix for rendering
    pub fn view_matrix(&self) -> Mat4 {
        let rotation = self.rotation();
        let forward = rotation * Vec3::NEG_Z;
        let target = self.position + forward;
        let up = rotation * Vec3::Y;

        Mat4::look_at_rh(self.position, target, up)
    }

    /// Get the projection matrix for rendering
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        let mut proj = Mat4::perspective_rh(self.fov, aspect_ratio, self.near_plane, self.far_plane);
        // Flip Y for Vulkan coordinate system
        proj.y_axis.y *= -1.0;
        proj
    }

    /// Project a world point to normalized device coordinates with +Y up.
    /// Points behind the camera come back mirrored, as with any perspective divide.
    pub fn project(&self, world: Vec3, aspect_ratio: f32) -> Vec2 {
        let clip = self.projection_matrix(aspect_ratio)
            * self.view_matrix()
            * Vec4::new(world.x, world.y, world.z, 1.0);
        let w = if clip.w.abs() < f32::EPSILON { f32::EPSILON } else { clip.w };
        // Undo the Vulkan flip so callers get the conventional y-up NDC
        Vec2::new(clip.x / w, -clip.y / w)
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    #[cfg(test)]
    pub fn set_rotation(&mut self, pitch: f32, yaw: f32, roll: f32) {
        self.pitch = pitch;
        self.yaw = yaw;
        self.roll = roll;
    }

    /// Turn to face `target`, keeping world Y as up (roll is cleared)
    pub fn look_at(&mut self, target: Vec3) {
        let dir = target - self.position;
        if dir.length_squared() < f32::EPSILON {
            return;
        }
        let dir = dir.normalize();
        self.yaw = (-dir.x).atan2(-dir.z);
        self.pitch = dir.y.clamp(-1.0, 1.0).asin();
        self.roll = 0.0;
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position,
            pitch: self.pitch,
            yaw: self.yaw,
            roll: self.roll,
            fov: self.fov,
            near_plane: self.near_plane,
            far_plane: self.far_plane,
        }
    }
}

impl From<CameraPose> for Camera {
    fn from(pose: CameraPose) -> Self {
        Self {
            position: pose.position,
            pitch: pose.pitch,
            yaw: pose.yaw,
            roll: pose.roll,
            fov: pose.fov,
            near_plane: pose.near_plane,
            far_plane: pose.far_plane,
        }
    }
}

impl From<&crate::config::CameraConfigData> for Camera {
    fn from(data: &crate::config::CameraConfigData) -> Self {
        Self::with_projection(data.position, data.fov.to_radians(), data.near, data.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_default_view_looks_down_negative_z() {
        let camera = Camera::with_projection(Vec3::new(0.0, 0.0, 30.0), 75f32.to_radians(), 0.1, 1000.0);
        assert!(approx(camera.forward(), Vec3::NEG_Z));
    }

    #[test]
    fn test_project_origin_is_screen_center() {
        let camera = Camera::with_projection(Vec3::new(0.0, 0.0, 30.0), 75f32.to_radians(), 0.1, 1000.0);
        let ndc = camera.project(Vec3::ZERO, 16.0 / 9.0);
        assert!(ndc.length() < 1e-5);
    }

    #[test]
    fn test_project_is_y_up() {
        let camera = Camera::with_projection(Vec3::new(0.0, 0.0, 30.0), 75f32.to_radians(), 0.1, 1000.0);
        let above = camera.project(Vec3::new(0.0, 5.0, 0.0), 1.0);
        let right = camera.project(Vec3::new(5.0, 0.0, 0.0), 1.0);
        assert!(above.y > 0.0);
        assert!(right.x > 0.0);
    }

    #[test]
    fn test_look_at_points_forward_at_target() {
        let mut camera = Camera::with_projection(Vec3::new(10.0, 5.0, -3.0), 1.0, 0.1, 100.0);
        let target = Vec3::new(-2.0, 1.0, 4.0);
        camera.look_at(target);
        let expected = (target - camera.position()).normalize();
        assert!(approx(camera.forward(), expected));
    }

    #[test]
    fn test_pose_roundtrip_is_exact() {
        let mut camera = Camera::with_projection(Vec3::new(1.0, 2.0, 3.0), 0.9, 0.1, 500.0);
        camera.set_rotation(0.1, -0.4, 0.05);
        let pose = camera.pose();
        let restored = Camera::from(pose);
        assert_eq!(restored.pose(), pose);
    }
}
