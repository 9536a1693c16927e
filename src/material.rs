use glam::Vec3;

use crate::config::AssetConfigData;

/// Texture slots the renderer knows how to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Background,
    Portrait,
    Moon,
    MoonNormal,
    StarSprite,
}

impl TextureSlot {
    /// File name under the image directory
    pub fn file(self, assets: &AssetConfigData) -> &str {
        match self {
            TextureSlot::Background => &assets.background,
            TextureSlot::Portrait => &assets.portrait_texture,
            TextureSlot::Moon => &assets.moon_texture,
            TextureSlot::MoonNormal => &assets.moon_normal_map,
            TextureSlot::StarSprite => &assets.star_sprite,
        }
    }

    /// Colour images are decoded from sRGB, data images are not
    pub fn is_color(self) -> bool {
        !matches!(self, TextureSlot::MoonNormal)
    }
}

/// Standard lit material
///
/// Colors are kept as 0xRRGGBB so a saved emissive value can be put back
/// bit-for-bit after a highlight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: u32,
    pub map: Option<TextureSlot>,
    pub normal_map: Option<TextureSlot>,
    /// Self-illumination color; `None` means the material has no emissive channel
    pub emissive: Option<u32>,
    pub emissive_intensity: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            map: None,
            normal_map: None,
            emissive: Some(0x000000),
            emissive_intensity: 1.0,
        }
    }
}

impl Material {
    pub fn colored(color: u32) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    pub fn textured(map: TextureSlot) -> Self {
        Self {
            map: Some(map),
            ..Self::default()
        }
    }

    /// Linear-space emissive term fed to the shader
    pub fn emissive_linear(&self) -> Vec3 {
        self.emissive
            .map(|hex| srgb_hex_to_linear(hex) * self.emissive_intensity)
            .unwrap_or(Vec3::ZERO)
    }
}

/// Decode an sRGB 0xRRGGBB color into linear RGB
pub fn srgb_hex_to_linear(hex: u32) -> Vec3 {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    Vec3::new(channel(16), channel(8), channel(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_decoding() {
        assert_eq!(srgb_hex_to_linear(0x000000), Vec3::ZERO);
        assert!((srgb_hex_to_linear(0xffffff) - Vec3::ONE).length() < 1e-6);
        let gray = srgb_hex_to_linear(0x404040);
        assert!((gray.x - 0.0513).abs() < 1e-3);
    }

    #[test]
    fn test_missing_emissive_is_black() {
        let material = Material {
            emissive: None,
            ..Material::default()
        };
        assert_eq!(material.emissive_linear(), Vec3::ZERO);
    }

    #[test]
    fn test_slot_files() {
        let assets = AssetConfigData::default();
        assert_eq!(TextureSlot::Moon.file(&assets), "moon.jpg");
        assert_eq!(TextureSlot::MoonNormal.file(&assets), "normal.jpg");
        assert!(!TextureSlot::MoonNormal.is_color());
        assert!(TextureSlot::Background.is_color());
    }
}
