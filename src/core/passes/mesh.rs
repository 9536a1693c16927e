/// Lit triangle meshes: the torus, the moon and the portrait cube
///
/// Shading follows a rough, non-metallic standard material: Lambert diffuse
/// from one point light with inverse-square falloff plus uniform ambient,
/// optional albedo and normal maps, and an emissive term on top.

use ash::vk;
use anyhow::Result;
use glam::{Mat4, Vec4};
use std::collections::HashMap;

use crate::controller::SceneController;
use crate::core::pipeline::{self, PipelineConfig};
use crate::core::resource_manager::{HostBuffer, ResourceManager};
use crate::core::texture::{self, ImageData, Texture};
use crate::core::{RenderContext, RenderPass};
use crate::material::{srgb_hex_to_linear, TextureSlot};
use crate::mesh::{Mesh, Vertex};
use crate::scene::{Geometry, ObjectTag, SceneGraph};

/// Per-frame camera and light data, std140
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniforms {
    view: Mat4,
    proj: Mat4,
    camera_position: Vec4,
    light_position: Vec4,
    light_radiance: Vec4,
    ambient_radiance: Vec4,
}

/// Push constants for one draw
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshPushConstants {
    pub model: Mat4,
    /// Linear base colour, w = 1 when an albedo map is bound
    pub color: Vec4,
    /// Linear emissive radiance, w = 1 when a normal map is bound
    pub emissive: Vec4,
}

struct GpuMesh {
    tag: ObjectTag,
    index_count: u32,
    vertex_buffer: vk::Buffer,
    vertex_buffer_memory: vk::DeviceMemory,
    index_buffer: vk::Buffer,
    index_buffer_memory: vk::DeviceMemory,
    material_set: vk::DescriptorSet,
}

pub struct MeshPass {
    pending: Vec<(ObjectTag, Mesh)>,
    meshes: Vec<GpuMesh>,
    textures: HashMap<TextureSlot, Texture>,
    white: Option<Texture>,
    flat_normal: Option<Texture>,

    frame_set_layout: vk::DescriptorSetLayout,
    material_set_layout: vk::DescriptorSetLayout,
    descriptor_pool: vk::DescriptorPool,
    frame_sets: Vec<vk::DescriptorSet>,
    uniform_buffers: Vec<HostBuffer>,

    pipeline_layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
    max_frames_in_flight: usize,
}

impl MeshPass {
    /// Tessellate every triangle shape in `scene`
    pub fn new(scene: &SceneGraph, max_frames_in_flight: usize) -> Self {
        let pending = scene
            .objects()
            .iter()
            .filter_map(|obj| {
                let mesh = match obj.geometry {
                    Geometry::Torus {
                        radius,
                        tube,
                        radial_segments,
                        tubular_segments,
                    } => Mesh::create_torus(radius, tube, radial_segments, tubular_segments),
                    Geometry::Sphere {
                        radius,
                        width_segments,
                        height_segments,
                    } => Mesh::create_sphere(radius, width_segments, height_segments),
                    Geometry::Box { size } => Mesh::create_box(size),
                    _ => return None,
                };
                Some((obj.tag, mesh))
            })
            .collect();

        Self {
            pending,
            meshes: Vec::new(),
            textures: HashMap::new(),
            white: None,
            flat_normal: None,
            frame_set_layout: vk::DescriptorSetLayout::null(),
            material_set_layout: vk::DescriptorSetLayout::null(),
            descriptor_pool: vk::DescriptorPool::null(),
            frame_sets: Vec::new(),
            uniform_buffers: Vec::new(),
            pipeline_layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
            max_frames_in_flight,
        }
    }

    unsafe fn create_frame_set_layout(device: &ash::Device) -> Result<vk::DescriptorSetLayout> {
        let ubo_binding = vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT);

        let bindings = [ubo_binding];
        let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);

        Ok(device.create_descriptor_set_layout(&layout_info, None)?)
    }

    unsafe fn create_descriptor_pool(device: &ash::Device, frames: u32, materials: u32) -> Result<vk::DescriptorPool> {
        let pool_sizes = [
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(frames),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(materials.max(1) * 2),
        ];
        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&pool_sizes)
            .max_sets(frames + materials.max(1));

        Ok(device.create_descriptor_pool(&pool_info, None)?)
    }

    unsafe fn create_frame_sets(&mut self, device: &ash::Device) -> Result<()> {
        let layouts = vec![self.frame_set_layout; self.max_frames_in_flight];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.descriptor_pool)
            .set_layouts(&layouts);

        self.frame_sets = device.allocate_descriptor_sets(&alloc_info)?;

        for (set, buffer) in self.frame_sets.iter().zip(&self.uniform_buffers) {
            let buffer_info = vk::DescriptorBufferInfo::default()
                .buffer(buffer.buffer)
                .offset(0)
                .range(std::mem::size_of::<FrameUniforms>() as vk::DeviceSize);

            let descriptor_write = vk::WriteDescriptorSet::default()
                .dst_set(*set)
                .dst_binding(0)
                .dst_array_element(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .buffer_info(std::slice::from_ref(&buffer_info));

            device.update_descriptor_sets(std::slice::from_ref(&descriptor_write), &[]);
        }

        Ok(())
    }

    /// Albedo and normal map views for one object, falling back to neutral textures
    fn material_images(
        &self,
        map: Option<TextureSlot>,
        normal_map: Option<TextureSlot>,
    ) -> Result<[vk::DescriptorImageInfo; 2]> {
        let white = self
            .white
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Mesh pass used before initialization"))?;
        let flat = self
            .flat_normal
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Mesh pass used before initialization"))?;

        let albedo = map.and_then(|slot| self.textures.get(&slot)).unwrap_or(white);
        let normal = normal_map.and_then(|slot| self.textures.get(&slot)).unwrap_or(flat);

        Ok([albedo.descriptor_info(), normal.descriptor_info()])
    }
}

impl RenderPass for MeshPass {
    fn initialize(&mut self, ctx: &RenderContext, render_pass: vk::RenderPass) -> Result<()> {
        unsafe {
            let device = ctx.device;

            self.white = Some(Texture::from_image_data(
                ctx,
                &ImageData::solid(texture::WHITE_PIXEL),
                texture::COLOR_FORMAT,
            )?);
            self.flat_normal = Some(Texture::from_image_data(
                ctx,
                &ImageData::solid(texture::FLAT_NORMAL_PIXEL),
                texture::DATA_FORMAT,
            )?);

            for slot in [TextureSlot::Portrait, TextureSlot::Moon, TextureSlot::MoonNormal] {
                let texture = Texture::load_slot(ctx, slot)?;
                self.textures.insert(slot, texture);
            }

            self.frame_set_layout = Self::create_frame_set_layout(device)?;
            self.material_set_layout = pipeline::create_sampler_set_layout(device, 2)?;
            self.descriptor_pool = Self::create_descriptor_pool(
                device,
                self.max_frames_in_flight as u32,
                self.pending.len() as u32,
            )?;

            for _ in 0..self.max_frames_in_flight {
                self.uniform_buffers.push(HostBuffer::new(
                    ctx,
                    std::mem::size_of::<FrameUniforms>() as vk::DeviceSize,
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                )?);
            }
            self.create_frame_sets(device)?;

            self.pipeline_layout = pipeline::create_pipeline_layout(
                device,
                &[self.frame_set_layout, self.material_set_layout],
                std::mem::size_of::<MeshPushConstants>() as u32,
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
            )?;

            let bindings = [Vertex::get_binding_description()];
            let attributes = Vertex::get_attribute_descriptions();
            let mut config = PipelineConfig::new("mesh", "mesh.vert.spv", "mesh.frag.spv");
            config.bindings = &bindings;
            config.attributes = &attributes;
            // Box faces and the sphere are viewed from every side while orbiting
            config.cull_mode = vk::CullModeFlags::NONE;
            self.pipeline = pipeline::create_graphics_pipeline(ctx, render_pass, self.pipeline_layout, &config)?;

            for (tag, mesh) in std::mem::take(&mut self.pending) {
                let (vertex_buffer, vertex_buffer_memory) = ResourceManager::create_device_local_buffer(
                    ctx,
                    &mesh.vertices,
                    vk::BufferUsageFlags::VERTEX_BUFFER,
                )?;
                let (index_buffer, index_buffer_memory) = ResourceManager::create_device_local_buffer(
                    ctx,
                    &mesh.indices,
                    vk::BufferUsageFlags::INDEX_BUFFER,
                )?;

                self.meshes.push(GpuMesh {
                    tag,
                    index_count: mesh.indices.len() as u32,
                    vertex_buffer,
                    vertex_buffer_memory,
                    index_buffer,
                    index_buffer_memory,
                    material_set: vk::DescriptorSet::null(),
                });
            }
        }

        log::debug!("mesh pass uploaded {} meshes", self.meshes.len());
        Ok(())
    }

    fn update(&mut self, ctx: &RenderContext, frame_index: usize, scene: &SceneController) -> Result<()> {
        // Material sets are bound lazily so the textures each object uses come from the scene
        for i in 0..self.meshes.len() {
            if self.meshes[i].material_set != vk::DescriptorSet::null() {
                continue;
            }
            let Some(obj) = scene.scene().get(self.meshes[i].tag) else {
                continue;
            };
            let images = self.material_images(obj.material.map, obj.material.normal_map)?;
            self.meshes[i].material_set = unsafe {
                pipeline::allocate_sampler_set(ctx.device, self.descriptor_pool, self.material_set_layout, &images)?
            };
        }

        let camera = scene.camera();
        let lighting = scene.lighting();
        let uniforms = FrameUniforms {
            view: camera.view_matrix(),
            proj: camera.projection_matrix(ctx.aspect()),
            camera_position: camera.position().extend(1.0),
            light_position: lighting.point.position.extend(1.0),
            light_radiance: lighting.point.radiance().extend(0.0),
            ambient_radiance: lighting.ambient.radiance().extend(0.0),
        };

        let buffer = self
            .uniform_buffers
            .get_mut(frame_index)
            .ok_or_else(|| anyhow::anyhow!("No uniform buffer for frame {}", frame_index))?;
        unsafe { buffer.write(ctx, std::slice::from_ref(&uniforms)) }
    }

    fn render(
        &mut self,
        ctx: &RenderContext,
        command_buffer: vk::CommandBuffer,
        frame_index: usize,
        scene: &SceneController,
    ) -> Result<()> {
        if self.pipeline == vk::Pipeline::null() {
            return Ok(());
        }
        let Some(&frame_set) = self.frame_sets.get(frame_index) else {
            return Ok(());
        };

        unsafe {
            let device = ctx.device;
            device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, self.pipeline);
            ctx.set_viewport(command_buffer);
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline_layout,
                0,
                &[frame_set],
                &[],
            );

            for mesh in &self.meshes {
                let Some(obj) = scene.scene().get(mesh.tag) else {
                    continue;
                };
                if !obj.visible || mesh.material_set == vk::DescriptorSet::null() {
                    continue;
                }

                let flag = |present: bool| if present { 1.0 } else { 0.0 };
                let push_constants = MeshPushConstants {
                    model: obj.transform.model_matrix(),
                    color: srgb_hex_to_linear(obj.material.color).extend(flag(obj.material.map.is_some())),
                    emissive: obj
                        .material
                        .emissive_linear()
                        .extend(flag(obj.material.normal_map.is_some())),
                };

                device.cmd_push_constants(
                    command_buffer,
                    self.pipeline_layout,
                    vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                    0,
                    bytemuck::bytes_of(&push_constants),
                );
                device.cmd_bind_descriptor_sets(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    self.pipeline_layout,
                    1,
                    &[mesh.material_set],
                    &[],
                );
                device.cmd_bind_vertex_buffers(command_buffer, 0, &[mesh.vertex_buffer], &[0]);
                device.cmd_bind_index_buffer(command_buffer, mesh.index_buffer, 0, vk::IndexType::UINT32);
                device.cmd_draw_indexed(command_buffer, mesh.index_count, 1, 0, 0, 0);
            }
        }
        Ok(())
    }

    fn cleanup(&mut self, device: &ash::Device) {
        unsafe {
            for mesh in self.meshes.drain(..) {
                device.destroy_buffer(mesh.vertex_buffer, None);
                device.free_memory(mesh.vertex_buffer_memory, None);
                device.destroy_buffer(mesh.index_buffer, None);
                device.free_memory(mesh.index_buffer_memory, None);
            }
            for buffer in &mut self.uniform_buffers {
                buffer.destroy(device);
            }
            self.uniform_buffers.clear();

            for (_, mut texture) in self.textures.drain() {
                texture.destroy(device);
            }
            for mut texture in [self.white.take(), self.flat_normal.take()].into_iter().flatten() {
                texture.destroy(device);
            }

            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.pipeline_layout, None);
            device.destroy_descriptor_pool(self.descriptor_pool, None);
            device.destroy_descriptor_set_layout(self.frame_set_layout, None);
            device.destroy_descriptor_set_layout(self.material_set_layout, None);
        }
        self.pipeline = vk::Pipeline::null();
    }

    fn name(&self) -> &str {
        "Mesh"
    }
}
