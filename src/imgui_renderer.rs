use ash::vk;
use imgui::{Context, DrawCmd, DrawData, DrawIdx, DrawVert, TextureId};
use std::mem::size_of;

use crate::core::pipeline::{self, BlendMode, PipelineConfig};
use crate::core::resource_manager::HostBuffer;
use crate::core::texture::{self, Texture};
use crate::core::RenderContext;

/// Geometry for one frame in flight, rewritten every frame
struct FrameGeometry {
    vertices: HostBuffer,
    indices: HostBuffer,
}

/// Draws imgui's output on top of the scene inside the main render pass
pub struct ImGuiRenderer {
    frames: Vec<FrameGeometry>,
    font_texture: Texture,
    set_layout: vk::DescriptorSetLayout,
    descriptor_pool: vk::DescriptorPool,
    descriptor_set: vk::DescriptorSet,
    pipeline_layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
}

impl ImGuiRenderer {
    pub fn new(
        context: &mut Context,
        ctx: &RenderContext,
        render_pass: vk::RenderPass,
        frames_in_flight: usize,
    ) -> anyhow::Result<Self> {
        let fonts = context.fonts();
        let atlas = fonts.build_rgba32_texture();

        unsafe {
            let font_texture = Texture::from_rgba(ctx, atlas.width, atlas.height, atlas.data, texture::DATA_FORMAT)?;
            fonts.tex_id = TextureId::from(1);

            let set_layout = pipeline::create_sampler_set_layout(ctx.device, 1)?;
            let descriptor_pool = pipeline::create_sampler_pool(ctx.device, 1, 1)?;
            let descriptor_set = pipeline::allocate_sampler_set(
                ctx.device,
                descriptor_pool,
                set_layout,
                &[font_texture.descriptor_info()],
            )?;

            // Orthographic projection as two vec2s: scale then translate
            let pipeline_layout = pipeline::create_pipeline_layout(
                ctx.device,
                &[set_layout],
                (size_of::<f32>() * 4) as u32,
                vk::ShaderStageFlags::VERTEX,
            )?;

            let bindings = [vk::VertexInputBindingDescription::default()
                .binding(0)
                .stride(size_of::<DrawVert>() as u32)
                .input_rate(vk::VertexInputRate::VERTEX)];
            let attributes = [
                vk::VertexInputAttributeDescription::default()
                    .binding(0)
                    .location(0)
                    .format(vk::Format::R32G32_SFLOAT)
                    .offset(0),
                vk::VertexInputAttributeDescription::default()
                    .binding(0)
                    .location(1)
                    .format(vk::Format::R32G32_SFLOAT)
                    .offset(8),
                vk::VertexInputAttributeDescription::default()
                    .binding(0)
                    .location(2)
                    .format(vk::Format::R8G8B8A8_UNORM)
                    .offset(16),
            ];

            let mut config = PipelineConfig::new("imgui", "imgui.vert.spv", "imgui.frag.spv");
            config.bindings = &bindings;
            config.attributes = &attributes;
            config.depth_test = false;
            config.depth_write = false;
            config.blend = BlendMode::Alpha;
            let pipeline = pipeline::create_graphics_pipeline(ctx, render_pass, pipeline_layout, &config)?;

            let mut frames = Vec::with_capacity(frames_in_flight);
            for _ in 0..frames_in_flight {
                frames.push(FrameGeometry {
                    vertices: HostBuffer::new(ctx, 64 * 1024, vk::BufferUsageFlags::VERTEX_BUFFER)?,
                    indices: HostBuffer::new(ctx, 16 * 1024, vk::BufferUsageFlags::INDEX_BUFFER)?,
                });
            }

            Ok(Self {
                frames,
                font_texture,
                set_layout,
                descriptor_pool,
                descriptor_set,
                pipeline_layout,
                pipeline,
            })
        }
    }

    pub unsafe fn render(
        &mut self,
        ctx: &RenderContext,
        command_buffer: vk::CommandBuffer,
        frame_index: usize,
        draw_data: &DrawData,
    ) -> anyhow::Result<()> {
        if draw_data.total_vtx_count == 0 {
            return Ok(());
        }
        let Some(frame) = self.frames.get_mut(frame_index) else {
            anyhow::bail!("No UI buffers for frame {}", frame_index);
        };

        let mut vertices: Vec<DrawVert> = Vec::with_capacity(draw_data.total_vtx_count as usize);
        let mut indices: Vec<DrawIdx> = Vec::with_capacity(draw_data.total_idx_count as usize);
        for draw_list in draw_data.draw_lists() {
            vertices.extend_from_slice(draw_list.vtx_buffer());
            indices.extend_from_slice(draw_list.idx_buffer());
        }

        // DrawVert is plain old data but does not implement Pod
        let vertex_bytes =
            std::slice::from_raw_parts(vertices.as_ptr() as *const u8, vertices.len() * size_of::<DrawVert>());
        frame.vertices.write(ctx, vertex_bytes)?;
        frame.indices.write(ctx, &indices)?;

        let device = ctx.device;
        device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, self.pipeline);
        device.cmd_bind_vertex_buffers(command_buffer, 0, &[frame.vertices.buffer], &[0]);
        let index_type = if size_of::<DrawIdx>() == 2 {
            vk::IndexType::UINT16
        } else {
            vk::IndexType::UINT32
        };
        device.cmd_bind_index_buffer(command_buffer, frame.indices.buffer, 0, index_type);
        device.cmd_bind_descriptor_sets(
            command_buffer,
            vk::PipelineBindPoint::GRAPHICS,
            self.pipeline_layout,
            0,
            &[self.descriptor_set],
            &[],
        );

        // Vertices are in logical pixels, the framebuffer is physical
        ctx.set_viewport(command_buffer);

        let scale = [
            2.0 / draw_data.display_size[0],
            2.0 / draw_data.display_size[1],
        ];
        let transform = [
            scale[0],
            scale[1],
            -1.0 - draw_data.display_pos[0] * scale[0],
            -1.0 - draw_data.display_pos[1] * scale[1],
        ];
        device.cmd_push_constants(
            command_buffer,
            self.pipeline_layout,
            vk::ShaderStageFlags::VERTEX,
            0,
            bytemuck::cast_slice(&transform),
        );

        let clip_offset = draw_data.display_pos;
        let clip_scale = draw_data.framebuffer_scale;
        let fb_width = ctx.extent.width as f32;
        let fb_height = ctx.extent.height as f32;

        let mut vtx_offset = 0;
        let mut idx_offset = 0;

        for draw_list in draw_data.draw_lists() {
            for cmd in draw_list.commands() {
                match cmd {
                    DrawCmd::Elements { count, cmd_params } => {
                        let clip_rect = cmd_params.clip_rect;
                        let min_x = ((clip_rect[0] - clip_offset[0]) * clip_scale[0]).max(0.0);
                        let min_y = ((clip_rect[1] - clip_offset[1]) * clip_scale[1]).max(0.0);
                        let max_x = ((clip_rect[2] - clip_offset[0]) * clip_scale[0]).min(fb_width);
                        let max_y = ((clip_rect[3] - clip_offset[1]) * clip_scale[1]).min(fb_height);
                        if max_x <= min_x || max_y <= min_y {
                            continue;
                        }

                        let scissor = vk::Rect2D {
                            offset: vk::Offset2D {
                                x: min_x as i32,
                                y: min_y as i32,
                            },
                            extent: vk::Extent2D {
                                width: (max_x - min_x) as u32,
                                height: (max_y - min_y) as u32,
                            },
                        };

                        device.cmd_set_scissor(command_buffer, 0, &[scissor]);
                        device.cmd_draw_indexed(
                            command_buffer,
                            count as u32,
                            1,
                            (idx_offset + cmd_params.idx_offset) as u32,
                            (vtx_offset + cmd_params.vtx_offset) as i32,
                            0,
                        );
                    }
                    DrawCmd::ResetRenderState => {}
                    DrawCmd::RawCallback { .. } => {}
                }
            }

            vtx_offset += draw_list.vtx_buffer().len();
            idx_offset += draw_list.idx_buffer().len();
        }

        Ok(())
    }

    pub unsafe fn cleanup(&mut self, device: &ash::Device) {
        for frame in &mut self.frames {
            frame.vertices.destroy(device);
            frame.indices.destroy(device);
        }
        self.frames.clear();
        self.font_texture.destroy(device);
        device.destroy_pipeline(self.pipeline, None);
        device.destroy_pipeline_layout(self.pipeline_layout, None);
        device.destroy_descriptor_pool(self.descriptor_pool, None);
        device.destroy_descriptor_set_layout(self.set_layout, None);
    }
}
