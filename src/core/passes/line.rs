/// Helper lines: the ground grid and the XYZ axes
///
/// Both are static vertex buffers built once from the scene and drawn only
/// while their objects are visible.

use ash::vk;
use anyhow::Result;
use glam::Mat4;

use crate::controller::SceneController;
use crate::core::pipeline::{self, PipelineConfig};
use crate::core::resource_manager::ResourceManager;
use crate::core::{RenderContext, RenderPass};
use crate::mesh::{self, LineVertex};
use crate::scene::{Geometry, ObjectTag, SceneGraph};

/// Push constants for line rendering
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LinePushConstants {
    pub view_proj: Mat4,
}

struct LineSet {
    tag: ObjectTag,
    vertices: Vec<LineVertex>,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
}

pub struct LinePass {
    sets: Vec<LineSet>,
    pipeline_layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
}

impl LinePass {
    pub fn new(scene: &SceneGraph) -> Self {
        let sets = scene
            .objects()
            .iter()
            .filter_map(|obj| {
                let vertices = match obj.geometry {
                    Geometry::Grid { size, divisions } => mesh::grid_lines(size, divisions),
                    Geometry::Axes { size } => mesh::axes_lines(size),
                    _ => return None,
                };
                Some(LineSet {
                    tag: obj.tag,
                    vertices,
                    buffer: vk::Buffer::null(),
                    memory: vk::DeviceMemory::null(),
                })
            })
            .collect();

        Self {
            sets,
            pipeline_layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
        }
    }
}

impl RenderPass for LinePass {
    fn initialize(&mut self, ctx: &RenderContext, render_pass: vk::RenderPass) -> Result<()> {
        unsafe {
            self.pipeline_layout = pipeline::create_pipeline_layout(
                ctx.device,
                &[],
                std::mem::size_of::<LinePushConstants>() as u32,
                vk::ShaderStageFlags::VERTEX,
            )?;

            let bindings = [LineVertex::get_binding_description()];
            let attributes = LineVertex::get_attribute_descriptions();
            let mut config = PipelineConfig::new("line", "line.vert.spv", "line.frag.spv");
            config.bindings = &bindings;
            config.attributes = &attributes;
            config.topology = vk::PrimitiveTopology::LINE_LIST;
            self.pipeline = pipeline::create_graphics_pipeline(ctx, render_pass, self.pipeline_layout, &config)?;

            for set in &mut self.sets {
                if set.vertices.is_empty() {
                    continue;
                }
                let (buffer, memory) = ResourceManager::create_device_local_buffer(
                    ctx,
                    &set.vertices,
                    vk::BufferUsageFlags::VERTEX_BUFFER,
                )?;
                set.buffer = buffer;
                set.memory = memory;
            }
        }
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &RenderContext,
        command_buffer: vk::CommandBuffer,
        _frame_index: usize,
        scene: &SceneController,
    ) -> Result<()> {
        if self.pipeline == vk::Pipeline::null() {
            return Ok(());
        }

        let camera = scene.camera();
        let push_constants = LinePushConstants {
            view_proj: camera.projection_matrix(ctx.aspect()) * camera.view_matrix(),
        };

        unsafe {
            let device = ctx.device;
            device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, self.pipeline);
            ctx.set_viewport(command_buffer);
            device.cmd_push_constants(
                command_buffer,
                self.pipeline_layout,
                vk::ShaderStageFlags::VERTEX,
                0,
                bytemuck::bytes_of(&push_constants),
            );

            for set in &self.sets {
                if set.buffer == vk::Buffer::null() || !scene.scene().is_visible(set.tag) {
                    continue;
                }
                device.cmd_bind_vertex_buffers(command_buffer, 0, &[set.buffer], &[0]);
                device.cmd_draw(command_buffer, set.vertices.len() as u32, 1, 0, 0);
            }
        }
        Ok(())
    }

    fn cleanup(&mut self, device: &ash::Device) {
        unsafe {
            for set in &mut self.sets {
                if set.buffer != vk::Buffer::null() {
                    device.destroy_buffer(set.buffer, None);
                    device.free_memory(set.memory, None);
                    set.buffer = vk::Buffer::null();
                }
            }
            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.pipeline_layout, None);
        }
        self.pipeline = vk::Pipeline::null();
    }

    fn name(&self) -> &str {
        "Line"
    }

    fn should_render(&self, scene: &SceneController) -> bool {
        scene.grid_visible() || scene.axes_visible()
    }
}
