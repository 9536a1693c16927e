use ash::vk;
use glam::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    pub fn get_binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::default()
            .binding(0)
            .stride(std::mem::size_of::<Vertex>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)
    }

    pub fn get_attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            vk::VertexInputAttributeDescription::default()
                .binding(0)
                .location(0)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(0),
            vk::VertexInputAttributeDescription::default()
                .binding(0)
                .location(1)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(std::mem::size_of::<Vec3>() as u32),
            vk::VertexInputAttributeDescription::default()
                .binding(0)
                .location(2)
                .format(vk::Format::R32G32_SFLOAT)
                .offset((std::mem::size_of::<Vec3>() * 2) as u32),
        ]
    }
}

/// Colored vertex for helper lines
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: Vec3,
    pub color: Vec3,
}

impl LineVertex {
    pub fn get_binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::default()
            .binding(0)
            .stride(std::mem::size_of::<LineVertex>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)
    }

    pub fn get_attribute_descriptions() -> [vk::VertexInputAttributeDescription; 2] {
        [
            vk::VertexInputAttributeDescription::default()
                .binding(0)
                .location(0)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(0),
            vk::VertexInputAttributeDescription::default()
                .binding(0)
                .location(1)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(std::mem::size_of::<Vec3>() as u32),
        ]
    }
}

/// Triangle mesh. Texture coordinates have v = 0 at the top of the image.
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Axis-aligned cube centred on the origin
    pub fn create_box(size: f32) -> Self {
        let h = size * 0.5;
        // (normal, right, up) per face
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, right, up) in faces {
            let base = vertices.len() as u32;
            for uv in [
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, 0.0),
            ] {
                let position = (normal + right * (uv.x * 2.0 - 1.0) + up * (1.0 - uv.y * 2.0)) * h;
                vertices.push(Vertex {
                    position,
                    normal,
                    uv,
                });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Self { vertices, indices }
    }

    /// UV sphere. Seam and poles match the usual equirectangular texture layout.
    pub fn create_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;

                let normal = Vec3::new(
                    -(u * TAU).cos() * (v * PI).sin(),
                    (v * PI).cos(),
                    (u * TAU).sin() * (v * PI).sin(),
                );

                vertices.push(Vertex {
                    position: normal * radius,
                    normal,
                    uv: Vec2::new(u, v),
                });
            }
        }

        let row = width_segments + 1;
        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;

                // Skip the degenerate triangles at the poles
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self { vertices, indices }
    }

    /// Torus in the XY plane. `radius` is to the tube centre, `tube` is the tube radius.
    pub fn create_torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        let radial_segments = radial_segments.max(2);
        let tubular_segments = tubular_segments.max(3);
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for j in 0..=radial_segments {
            for i in 0..=tubular_segments {
                let u = i as f32 / tubular_segments as f32 * TAU;
                let v = j as f32 / radial_segments as f32 * TAU;

                let position = Vec3::new(
                    (radius + tube * v.cos()) * u.cos(),
                    (radius + tube * v.cos()) * u.sin(),
                    tube * v.sin(),
                );
                let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
                let normal = (position - center).normalize_or_zero();

                vertices.push(Vertex {
                    position,
                    normal,
                    uv: Vec2::new(
                        i as f32 / tubular_segments as f32,
                        1.0 - j as f32 / radial_segments as f32,
                    ),
                });
            }
        }

        let row = tubular_segments + 1;
        for j in 1..=radial_segments {
            for i in 1..=tubular_segments {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;

                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self { vertices, indices }
    }
}

const GRID_CENTER_COLOR: Vec3 = Vec3::new(0.267, 0.267, 0.267);
const GRID_COLOR: Vec3 = Vec3::new(0.533, 0.533, 0.533);

/// Square grid on the XZ plane, `divisions` cells per side
pub fn grid_lines(size: f32, divisions: u32) -> Vec<LineVertex> {
    let divisions = divisions.max(1);
    let half = size * 0.5;
    let step = size / divisions as f32;
    let center = divisions / 2;
    let mut lines = Vec::with_capacity((divisions as usize + 1) * 4);

    for i in 0..=divisions {
        let k = -half + i as f32 * step;
        let color = if i == center && divisions % 2 == 0 {
            GRID_CENTER_COLOR
        } else {
            GRID_COLOR
        };

        lines.push(LineVertex { position: Vec3::new(-half, 0.0, k), color });
        lines.push(LineVertex { position: Vec3::new(half, 0.0, k), color });
        lines.push(LineVertex { position: Vec3::new(k, 0.0, -half), color });
        lines.push(LineVertex { position: Vec3::new(k, 0.0, half), color });
    }

    lines
}

/// Red X, green Y and blue Z segments from the origin
pub fn axes_lines(size: f32) -> Vec<LineVertex> {
    [
        (Vec3::X, Vec3::new(1.0, 0.0, 0.0)),
        (Vec3::Y, Vec3::new(0.0, 1.0, 0.0)),
        (Vec3::Z, Vec3::new(0.0, 0.0, 1.0)),
    ]
    .into_iter()
    .flat_map(|(axis, color)| {
        [
            LineVertex { position: Vec3::ZERO, color },
            LineVertex { position: axis * size, color },
        ]
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_extent() {
        let mesh = Mesh::create_box(5.0);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        for v in &mesh.vertices {
            assert!((v.position.abs().max_element() - 2.5).abs() < 1e-5);
        }
    }

    #[test]
    fn test_sphere_vertices_on_surface() {
        let mesh = Mesh::create_sphere(3.0, 32, 32);
        assert_eq!(mesh.vertices.len(), 33 * 33);
        for v in &mesh.vertices {
            assert!((v.position.length() - 3.0).abs() < 1e-4);
        }
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn test_torus_counts() {
        let mesh = Mesh::create_torus(6.0, 0.7, 2, 20);
        assert_eq!(mesh.vertices.len(), 3 * 21);
        assert_eq!(mesh.indices.len(), 2 * 20 * 6);
        for v in &mesh.vertices {
            let ring = Vec2::new(v.position.x, v.position.y).length();
            assert!(ring >= 6.0 - 0.7 - 1e-4 && ring <= 6.0 + 0.7 + 1e-4);
        }
    }

    #[test]
    fn test_helper_lines() {
        assert_eq!(grid_lines(200.0, 50).len(), 51 * 4);
        let axes = axes_lines(50.0);
        assert_eq!(axes.len(), 6);
        assert_eq!(axes[1].position, Vec3::new(50.0, 0.0, 0.0));
    }
}
