/// Full-screen backdrop image, drawn first with depth disabled

use ash::vk;
use anyhow::Result;

use crate::controller::SceneController;
use crate::core::pipeline::{self, BlendMode, PipelineConfig};
use crate::core::texture::Texture;
use crate::core::{RenderContext, RenderPass};
use crate::material::TextureSlot;

pub struct BackgroundPass {
    texture: Option<Texture>,
    set_layout: vk::DescriptorSetLayout,
    descriptor_pool: vk::DescriptorPool,
    descriptor_set: vk::DescriptorSet,
    pipeline_layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
}

impl BackgroundPass {
    pub fn new() -> Self {
        Self {
            texture: None,
            set_layout: vk::DescriptorSetLayout::null(),
            descriptor_pool: vk::DescriptorPool::null(),
            descriptor_set: vk::DescriptorSet::null(),
            pipeline_layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
        }
    }
}

impl Default for BackgroundPass {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPass for BackgroundPass {
    fn initialize(&mut self, ctx: &RenderContext, render_pass: vk::RenderPass) -> Result<()> {
        unsafe {
            let texture = Texture::load_slot(ctx, TextureSlot::Background)?;

            self.set_layout = pipeline::create_sampler_set_layout(ctx.device, 1)?;
            self.descriptor_pool = pipeline::create_sampler_pool(ctx.device, 1, 1)?;
            self.descriptor_set = pipeline::allocate_sampler_set(
                ctx.device,
                self.descriptor_pool,
                self.set_layout,
                &[texture.descriptor_info()],
            )?;
            self.texture = Some(texture);

            self.pipeline_layout = pipeline::create_pipeline_layout(
                ctx.device,
                &[self.set_layout],
                0,
                vk::ShaderStageFlags::empty(),
            )?;

            // Vertices come from gl_VertexIndex
            let mut config = PipelineConfig::new("background", "background.vert.spv", "background.frag.spv");
            config.depth_test = false;
            config.depth_write = false;
            config.blend = BlendMode::Opaque;
            self.pipeline = pipeline::create_graphics_pipeline(ctx, render_pass, self.pipeline_layout, &config)?;
        }
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &RenderContext,
        command_buffer: vk::CommandBuffer,
        _frame_index: usize,
        _scene: &SceneController,
    ) -> Result<()> {
        if self.pipeline == vk::Pipeline::null() {
            return Ok(());
        }

        unsafe {
            ctx.device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, self.pipeline);
            ctx.set_viewport(command_buffer);
            ctx.device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline_layout,
                0,
                &[self.descriptor_set],
                &[],
            );
            ctx.device.cmd_draw(command_buffer, 3, 1, 0, 0);
        }
        Ok(())
    }

    fn cleanup(&mut self, device: &ash::Device) {
        unsafe {
            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.pipeline_layout, None);
            device.destroy_descriptor_pool(self.descriptor_pool, None);
            device.destroy_descriptor_set_layout(self.set_layout, None);
            if let Some(mut texture) = self.texture.take() {
                texture.destroy(device);
            }
        }
        self.pipeline = vk::Pipeline::null();
    }

    fn name(&self) -> &str {
        "Background"
    }
}
