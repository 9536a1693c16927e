use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default location of the scene configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/scene.json";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfigData,
    pub camera: CameraConfigData,
    pub scene: SceneConfigData,
    pub lighting: LightingConfigData,
    pub stars: StarConfigData,
    pub interaction: InteractionConfigData,
    pub assets: AssetConfigData,
}

impl AppConfig {
    /// Load configuration from JSON file
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path))?;
        Ok(config)
    }

    /// Save configuration to JSON file with pretty formatting
    pub fn save(&self, path: &str) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load the config, falling back to the defaults. The defaults are only
    /// written out when no file exists, so a broken file is left for the user to fix.
    pub fn load_or_default(path: &str) -> Self {
        if !Path::new(path).exists() {
            log::info!("no config at {}, writing defaults", path);
            let config = Self::default();
            if let Err(e) = config.save(path) {
                log::warn!("could not write default config to {}: {:#}", path, e);
            }
            return config;
        }

        match Self::load(path) {
            Ok(config) => {
                log::info!("loaded config from {}", path);
                config
            }
            Err(e) => {
                log::warn!("{:#}; using defaults", e);
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfigData {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfigData {
    fn default() -> Self {
        Self {
            title: "Portfolio".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Camera configuration (serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfigData {
    #[serde(with = "vec3_serde")]
    pub position: Vec3,

    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfigData {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 30.0),
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfigData {
    pub torus: TorusConfigData,
    pub moon: MoonConfigData,
    pub portrait: PortraitConfigData,
    pub helpers: HelperConfigData,
    pub rotation: RotationConfigData,
}

impl Default for SceneConfigData {
    fn default() -> Self {
        Self {
            torus: TorusConfigData::default(),
            moon: MoonConfigData::default(),
            portrait: PortraitConfigData::default(),
            helpers: HelperConfigData::default(),
            rotation: RotationConfigData::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TorusConfigData {
    pub radius: f32,
    pub tube: f32,
    pub radial_segments: u32,
    pub tubular_segments: u32,
    #[serde(with = "hex_color")]
    pub color: u32,
}

impl Default for TorusConfigData {
    fn default() -> Self {
        Self {
            radius: 6.0,
            tube: 0.7,
            radial_segments: 2,
            tubular_segments: 20,
            color: 0xff6347,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MoonConfigData {
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    #[serde(with = "vec3_serde")]
    pub position: Vec3,
    #[serde(with = "hex_color")]
    pub emissive: u32,
    pub emissive_intensity: f32,
}

impl Default for MoonConfigData {
    fn default() -> Self {
        Self {
            radius: 3.0,
            width_segments: 32,
            height_segments: 32,
            position: Vec3::new(-10.0, 10.0, 10.0),
            emissive: 0x000000,
            emissive_intensity: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortraitConfigData {
    pub size: f32,
    #[serde(with = "vec3_serde")]
    pub position: Vec3,
}

impl Default for PortraitConfigData {
    fn default() -> Self {
        Self {
            size: 5.0,
            position: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperConfigData {
    pub grid_size: f32,
    pub grid_divisions: u32,
    pub axes_size: f32,
    pub grid_visible: bool,
    pub axes_visible: bool,
}

impl Default for HelperConfigData {
    fn default() -> Self {
        Self {
            grid_size: 200.0,
            grid_divisions: 50,
            axes_size: 50.0,
            grid_visible: false,
            axes_visible: false,
        }
    }
}

/// Rotation speeds in radians per 1/60 s frame
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfigData {
    #[serde(with = "vec3_serde")]
    pub torus: Vec3,
    pub moon_y: f32,
    pub slider_max: f32,
}

impl Default for RotationConfigData {
    fn default() -> Self {
        Self {
            torus: Vec3::new(0.0015, 0.0005, 0.001),
            moon_y: 0.002,
            slider_max: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfigData {
    #[serde(with = "hex_color")]
    pub point_color: u32,
    pub point_intensity: f32,
    #[serde(with = "vec3_serde")]
    pub point_position: Vec3,
    #[serde(with = "hex_color")]
    pub ambient_color: u32,
    pub ambient_intensity: f32,
    pub ambient_max: f32,
}

impl Default for LightingConfigData {
    fn default() -> Self {
        Self {
            point_color: 0xffffff,
            point_intensity: 15.0,
            point_position: Vec3::new(10.0, 10.0, 10.0),
            ambient_color: 0x404040,
            ambient_intensity: 50.0,
            ambient_max: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StarConfigData {
    pub initial_count: usize,
    pub max_count: usize,
    /// Edge length of the cube the stars are scattered in
    pub spread: f32,
    pub size: f32,
    pub opacity: f32,
    #[serde(with = "hex_color")]
    pub color: u32,
}

impl Default for StarConfigData {
    fn default() -> Self {
        Self {
            initial_count: 300,
            max_count: 10_000,
            spread: 200.0,
            size: 2.0,
            opacity: 0.8,
            color: 0xffffff,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfigData {
    #[serde(with = "hex_color")]
    pub highlight_color: u32,
    /// Minimum distance in pixels between the info panel and the viewport edges
    pub popup_padding: f32,
    pub popup_width: f32,
    pub popup_fade_seconds: f32,
    pub orbit_rotate_speed: f32,
    pub orbit_zoom_speed: f32,
}

impl Default for InteractionConfigData {
    fn default() -> Self {
        Self {
            highlight_color: 0xfc4e03,
            popup_padding: 40.0,
            popup_width: 360.0,
            popup_fade_seconds: 0.3,
            orbit_rotate_speed: 1.0,
            orbit_zoom_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfigData {
    pub image_dir: String,
    pub shader_dir: String,
    pub background: String,
    pub portrait_texture: String,
    pub moon_texture: String,
    pub moon_normal_map: String,
    pub star_sprite: String,
}

impl Default for AssetConfigData {
    fn default() -> Self {
        Self {
            image_dir: "assets/img".to_string(),
            shader_dir: "shaders".to_string(),
            background: "space.jpg".to_string(),
            portrait_texture: "nico.jpg".to_string(),
            moon_texture: "moon.jpg".to_string(),
            moon_normal_map: "normal.jpg".to_string(),
            star_sprite: "star.png".to_string(),
        }
    }
}

impl AssetConfigData {
    pub fn image_path(&self, file: &str) -> String {
        Path::new(&self.image_dir).join(file).to_string_lossy().into_owned()
    }
}

/// Custom serialization for Vec3
mod vec3_serde {
    use glam::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Vec3Data {
        x: f32,
        y: f32,
        z: f32,
    }

    pub fn serialize<S>(vec: &Vec3, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Vec3Data {
            x: vec.x,
            y: vec.y,
            z: vec.z,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec3, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = Vec3Data::deserialize(deserializer)?;
        Ok(Vec3::new(data.x, data.y, data.z))
    }
}

/// Colors are written as "#rrggbb" strings
mod hex_color {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(color: &u32, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("#{:06x}", color & 0x00ff_ffff))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        let digits = text.trim().trim_start_matches('#');
        if digits.len() != 6 {
            return Err(D::Error::custom(format!("expected #rrggbb, got {:?}", text)));
        }
        u32::from_str_radix(digits, 16).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.camera.fov, 75.0);
        assert_eq!(config.camera.position, Vec3::new(0.0, 0.0, 30.0));
        assert_eq!(config.stars.max_count, 10_000);
        assert_eq!(config.interaction.highlight_color, 0xfc4e03);
        assert_eq!(config.interaction.popup_padding, 40.0);
    }

    #[test]
    fn test_save_load() {
        let mut config = AppConfig::default();
        config.scene.torus.color = 0x123456;
        let path = "test_scene_config.json";

        config.save(path).unwrap();
        let loaded = AppConfig::load(path).unwrap();

        assert_eq!(loaded.scene.torus.color, 0x123456);
        assert_eq!(loaded.scene.moon.position, config.scene.moon.position);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_gets_defaults_written() {
        let path = "test_missing_scene_config.json";
        let _ = fs::remove_file(path);

        let config = AppConfig::load_or_default(path);
        assert_eq!(config.stars.initial_count, AppConfig::default().stars.initial_count);
        assert!(AppConfig::load(path).is_ok());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_malformed_file_left_untouched() {
        let path = "test_malformed_scene_config.json";
        let broken = r#"{ "stars": { "initial_count": 42, }"#;
        fs::write(path, broken).unwrap();

        let config = AppConfig::load_or_default(path);
        assert_eq!(config.stars.initial_count, AppConfig::default().stars.initial_count);
        assert_eq!(fs::read_to_string(path).unwrap(), broken);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_colors_written_as_hex_strings() {
        let json = serde_json::to_string(&TorusConfigData::default()).unwrap();
        assert!(json.contains("\"#ff6347\""));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "stars": { "initial_count": 42 } }"#).unwrap();
        assert_eq!(config.stars.initial_count, 42);
        assert_eq!(config.stars.max_count, 10_000);
        assert_eq!(config.lighting.ambient_intensity, 50.0);
    }

    #[test]
    fn test_bad_color_rejected() {
        let result: Result<TorusConfigData, _> =
            serde_json::from_str(r#"{ "color": "red" }"#);
        assert!(result.is_err());
    }
}
