use glam::Vec3;

use crate::config::LightingConfigData;
use crate::material::srgb_hex_to_linear;

#[derive(Debug, Clone, Copy)]
pub struct PointLight {
    pub position: Vec3,
    pub color: u32,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct AmbientLight {
    pub color: u32,
    pub intensity: f32,
}

impl AmbientLight {
    /// Linear irradiance contributed everywhere
    pub fn radiance(&self) -> Vec3 {
        srgb_hex_to_linear(self.color) * self.intensity
    }
}

impl PointLight {
    pub fn radiance(&self) -> Vec3 {
        srgb_hex_to_linear(self.color) * self.intensity
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LightingData {
    pub point: PointLight,
    pub ambient: AmbientLight,
}

impl From<&LightingConfigData> for LightingData {
    fn from(data: &LightingConfigData) -> Self {
        Self {
            point: PointLight {
                position: data.point_position,
                color: data.point_color,
                intensity: data.point_intensity,
            },
            ambient: AmbientLight {
                color: data.ambient_color,
                intensity: data.ambient_intensity,
            },
        }
    }
}
