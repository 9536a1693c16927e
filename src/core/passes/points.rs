/// Star field drawn as textured point sprites with additive blending
///
/// Sprites attenuate with distance the way a perspective points material
/// does: the on-screen size is `size * (viewport_height / 2) / depth`.

use ash::vk;
use anyhow::Result;
use glam::{Mat4, Vec3, Vec4};

use crate::controller::SceneController;
use crate::core::pipeline::{self, BlendMode, PipelineConfig};
use crate::core::resource_manager::HostBuffer;
use crate::core::texture::Texture;
use crate::core::{RenderContext, RenderPass};
use crate::material::{srgb_hex_to_linear, TextureSlot};
use crate::scene::{Geometry, ObjectTag};

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointsPushConstants {
    pub view_proj: Mat4,
    /// Linear colour with opacity in w
    pub color: Vec4,
    /// x = size, y = attenuation scale, z = 1 when sprites may exceed one pixel
    pub params: Vec4,
}

pub struct PointsPass {
    sprite: Option<Texture>,
    set_layout: vk::DescriptorSetLayout,
    descriptor_pool: vk::DescriptorPool,
    descriptor_set: vk::DescriptorSet,
    pipeline_layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,

    vertex_buffer: Option<HostBuffer>,
    vertex_count: u32,
    /// Star revision last copied to the GPU
    uploaded_revision: Option<u64>,
}

impl PointsPass {
    pub fn new() -> Self {
        Self {
            sprite: None,
            set_layout: vk::DescriptorSetLayout::null(),
            descriptor_pool: vk::DescriptorPool::null(),
            descriptor_set: vk::DescriptorSet::null(),
            pipeline_layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
            vertex_buffer: None,
            vertex_count: 0,
            uploaded_revision: None,
        }
    }

    fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::default()
            .binding(0)
            .stride(std::mem::size_of::<Vec3>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)
    }

    fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 1] {
        [vk::VertexInputAttributeDescription::default()
            .binding(0)
            .location(0)
            .format(vk::Format::R32G32B32_SFLOAT)
            .offset(0)]
    }
}

impl Default for PointsPass {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPass for PointsPass {
    fn initialize(&mut self, ctx: &RenderContext, render_pass: vk::RenderPass) -> Result<()> {
        unsafe {
            let sprite = Texture::load_slot(ctx, TextureSlot::StarSprite)?;

            self.set_layout = pipeline::create_sampler_set_layout(ctx.device, 1)?;
            self.descriptor_pool = pipeline::create_sampler_pool(ctx.device, 1, 1)?;
            self.descriptor_set = pipeline::allocate_sampler_set(
                ctx.device,
                self.descriptor_pool,
                self.set_layout,
                &[sprite.descriptor_info()],
            )?;
            self.sprite = Some(sprite);

            self.pipeline_layout = pipeline::create_pipeline_layout(
                ctx.device,
                &[self.set_layout],
                std::mem::size_of::<PointsPushConstants>() as u32,
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
            )?;

            let bindings = [Self::binding_description()];
            let attributes = Self::attribute_descriptions();
            let mut config = PipelineConfig::new("points", "points.vert.spv", "points.frag.spv");
            config.bindings = &bindings;
            config.attributes = &attributes;
            config.topology = vk::PrimitiveTopology::POINT_LIST;
            config.depth_write = false;
            config.blend = BlendMode::Additive;
            self.pipeline = pipeline::create_graphics_pipeline(ctx, render_pass, self.pipeline_layout, &config)?;
        }
        Ok(())
    }

    fn update(&mut self, ctx: &RenderContext, _frame_index: usize, scene: &SceneController) -> Result<()> {
        let revision = scene.scene().star_revision();
        if self.uploaded_revision == Some(revision) {
            return Ok(());
        }

        let positions: &[Vec3] = match scene.scene().get(ObjectTag::Stars).map(|obj| &obj.geometry) {
            Some(Geometry::Points { positions, .. }) => positions,
            _ => &[],
        };

        unsafe {
            // Earlier frames may still be reading the old star set
            ctx.device.device_wait_idle()?;

            let bytes = std::mem::size_of_val(positions) as vk::DeviceSize;
            match self.vertex_buffer.as_mut() {
                Some(buffer) => buffer.write(ctx, positions)?,
                None => {
                    let mut buffer = HostBuffer::new(ctx, bytes, vk::BufferUsageFlags::VERTEX_BUFFER)?;
                    buffer.write(ctx, positions)?;
                    self.vertex_buffer = Some(buffer);
                }
            }
        }

        self.vertex_count = positions.len() as u32;
        self.uploaded_revision = Some(revision);
        log::debug!("uploaded {} stars (revision {})", self.vertex_count, revision);
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &RenderContext,
        command_buffer: vk::CommandBuffer,
        _frame_index: usize,
        scene: &SceneController,
    ) -> Result<()> {
        if self.pipeline == vk::Pipeline::null() || self.vertex_count == 0 {
            return Ok(());
        }
        let Some(buffer) = self.vertex_buffer.as_ref() else {
            return Ok(());
        };
        let Some(stars) = scene.scene().get(ObjectTag::Stars) else {
            return Ok(());
        };
        if !stars.visible {
            return Ok(());
        }
        let Geometry::Points { size, opacity, color, .. } = stars.geometry else {
            return Ok(());
        };

        let camera = scene.camera();
        let push_constants = PointsPushConstants {
            view_proj: camera.projection_matrix(ctx.aspect()) * camera.view_matrix(),
            color: srgb_hex_to_linear(color).extend(opacity),
            params: Vec4::new(
                size,
                ctx.extent.height as f32 * 0.5,
                if ctx.large_points { 1.0 } else { 0.0 },
                0.0,
            ),
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
                &[self.descriptor_set],
                &[],
            );
            device.cmd_push_constants(
                command_buffer,
                self.pipeline_layout,
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                0,
                bytemuck::bytes_of(&push_constants),
            );
            device.cmd_bind_vertex_buffers(command_buffer, 0, &[buffer.buffer], &[0]);
            device.cmd_draw(command_buffer, self.vertex_count, 1, 0, 0);
        }
        Ok(())
    }

    fn cleanup(&mut self, device: &ash::Device) {
        unsafe {
            if let Some(mut buffer) = self.vertex_buffer.take() {
                buffer.destroy(device);
            }
            if let Some(mut sprite) = self.sprite.take() {
                sprite.destroy(device);
            }
            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.pipeline_layout, None);
            device.destroy_descriptor_pool(self.descriptor_pool, None);
            device.destroy_descriptor_set_layout(self.set_layout, None);
        }
        self.pipeline = vk::Pipeline::null();
    }

    fn name(&self) -> &str {
        "Points"
    }
}
