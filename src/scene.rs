use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::{SceneConfigData, StarConfigData};
use crate::material::{Material, TextureSlot};

/// Stable identifier for every entity in the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectTag {
    Torus,
    Moon,
    Portrait,
    Stars,
    Grid,
    Axes,
}

impl ObjectTag {
    pub fn label(self) -> &'static str {
        match self {
            ObjectTag::Torus => "Torus",
            ObjectTag::Moon => "Moon",
            ObjectTag::Portrait => "Portrait",
            ObjectTag::Stars => "Stars",
            ObjectTag::Grid => "Grid",
            ObjectTag::Axes => "Axes",
        }
    }
}

/// What the pointer is allowed to do with an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectRole {
    /// Hoverable and clickable
    Checkable,
    /// Bulk-replaceable decoration
    Star,
    Decor,
}

/// Transform component for positioning objects in 3D space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles in radians, applied X then Y then Z
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    /// Get the model matrix for this transform
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Shape parameters, in object space
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Torus {
        radius: f32,
        tube: f32,
        radial_segments: u32,
        tubular_segments: u32,
    },
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
    Box {
        size: f32,
    },
    Points {
        positions: Vec<Vec3>,
        size: f32,
        opacity: f32,
        color: u32,
    },
    Grid {
        size: f32,
        divisions: u32,
    },
    Axes {
        size: f32,
    },
}

/// Scene object with transform, shape and material
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub tag: ObjectTag,
    pub role: ObjectRole,
    pub geometry: Geometry,
    pub material: Material,
    pub transform: Transform,
    pub visible: bool,
}

impl SceneObject {
    pub fn new(tag: ObjectTag, role: ObjectRole, geometry: Geometry, material: Material) -> Self {
        Self {
            tag,
            role,
            geometry,
            material,
            transform: Transform::default(),
            visible: true,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

/// Every object in the scene, in draw order
pub struct SceneGraph {
    objects: Vec<SceneObject>,
    star_revision: u64,
}

impl SceneGraph {
    pub fn new(objects: Vec<SceneObject>) -> Self {
        Self {
            objects,
            star_revision: 0,
        }
    }

    /// The portfolio layout: spinning torus, moon, portrait cube, stars and helpers
    pub fn portfolio(config: &SceneConfigData, stars: Vec<Vec3>, star_style: &StarConfigData) -> Self {
        let torus = &config.torus;
        let moon = &config.moon;
        let portrait = &config.portrait;
        let helpers = &config.helpers;

        let mut grid = SceneObject::new(
            ObjectTag::Grid,
            ObjectRole::Decor,
            Geometry::Grid {
                size: helpers.grid_size,
                divisions: helpers.grid_divisions,
            },
            Material::default(),
        );
        grid.visible = helpers.grid_visible;

        let mut axes = SceneObject::new(
            ObjectTag::Axes,
            ObjectRole::Decor,
            Geometry::Axes {
                size: helpers.axes_size,
            },
            Material::default(),
        );
        axes.visible = helpers.axes_visible;

        Self::new(vec![
            SceneObject::new(
                ObjectTag::Torus,
                ObjectRole::Decor,
                Geometry::Torus {
                    radius: torus.radius,
                    tube: torus.tube,
                    radial_segments: torus.radial_segments,
                    tubular_segments: torus.tubular_segments,
                },
                Material::colored(torus.color),
            ),
            SceneObject::new(
                ObjectTag::Moon,
                ObjectRole::Checkable,
                Geometry::Sphere {
                    radius: moon.radius,
                    width_segments: moon.width_segments,
                    height_segments: moon.height_segments,
                },
                Material {
                    map: Some(TextureSlot::Moon),
                    normal_map: Some(TextureSlot::MoonNormal),
                    emissive: Some(moon.emissive),
                    emissive_intensity: moon.emissive_intensity,
                    ..Material::default()
                },
            )
            .with_transform(Transform::from_position(moon.position)),
            SceneObject::new(
                ObjectTag::Portrait,
                ObjectRole::Checkable,
                Geometry::Box {
                    size: portrait.size,
                },
                Material::textured(TextureSlot::Portrait),
            )
            .with_transform(Transform::from_position(portrait.position)),
            SceneObject::new(
                ObjectTag::Stars,
                ObjectRole::Star,
                Geometry::Points {
                    positions: stars,
                    size: star_style.size,
                    opacity: star_style.opacity,
                    color: star_style.color,
                },
                Material::textured(TextureSlot::StarSprite),
            ),
            grid,
            axes,
        ])
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn get(&self, tag: ObjectTag) -> Option<&SceneObject> {
        self.objects.iter().find(|obj| obj.tag == tag)
    }

    pub fn get_mut(&mut self, tag: ObjectTag) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|obj| obj.tag == tag)
    }

    /// Objects eligible for hit-testing
    pub fn checkable(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects
            .iter()
            .filter(|obj| obj.role == ObjectRole::Checkable && obj.visible)
    }

    pub fn set_visible(&mut self, tag: ObjectTag, visible: bool) {
        if let Some(obj) = self.get_mut(tag) {
            obj.visible = visible;
        }
    }

    pub fn is_visible(&self, tag: ObjectTag) -> bool {
        self.get(tag).map(|obj| obj.visible).unwrap_or(false)
    }

    /// Swap in a new star set. Every star object is replaced, none are kept.
    pub fn replace_stars(&mut self, positions: Vec<Vec3>) {
        let mut positions = Some(positions);
        for obj in self.objects.iter_mut().filter(|obj| obj.role == ObjectRole::Star) {
            if let Geometry::Points { positions: current, .. } = &mut obj.geometry {
                *current = positions.take().unwrap_or_default();
            }
        }
        self.star_revision += 1;
    }

    pub fn star_count(&self) -> usize {
        self.objects
            .iter()
            .filter(|obj| obj.role == ObjectRole::Star)
            .map(|obj| match &obj.geometry {
                Geometry::Points { positions, .. } => positions.len(),
                _ => 0,
            })
            .sum()
    }

    /// Bumped on every star replacement so GPU copies know to refresh
    pub fn star_revision(&self) -> u64 {
        self.star_revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portfolio() -> SceneGraph {
        SceneGraph::portfolio(
            &SceneConfigData::default(),
            vec![Vec3::ONE; 3],
            &StarConfigData::default(),
        )
    }

    #[test]
    fn test_checkable_objects() {
        let scene = portfolio();
        let tags: Vec<ObjectTag> = scene.checkable().map(|obj| obj.tag).collect();
        assert_eq!(tags, vec![ObjectTag::Moon, ObjectTag::Portrait]);
    }

    #[test]
    fn test_helpers_start_hidden() {
        let scene = portfolio();
        assert!(!scene.is_visible(ObjectTag::Grid));
        assert!(!scene.is_visible(ObjectTag::Axes));
        assert!(scene.is_visible(ObjectTag::Torus));
    }

    #[test]
    fn test_replace_stars() {
        let mut scene = portfolio();
        assert_eq!(scene.star_count(), 3);
        let revision = scene.star_revision();

        scene.replace_stars(vec![Vec3::ZERO; 10]);
        assert_eq!(scene.star_count(), 10);
        assert_eq!(scene.star_revision(), revision + 1);

        scene.replace_stars(Vec::new());
        assert_eq!(scene.star_count(), 0);
    }

    #[test]
    fn test_model_matrix_translates() {
        let transform = Transform::from_position(Vec3::new(-10.0, 10.0, 10.0));
        let p = transform.model_matrix().transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(-10.0, 10.0, 10.0));
    }
}
