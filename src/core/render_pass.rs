/// Render pass plugin system
///
/// Each layer of the frame (background, meshes, helper lines, stars)
/// implements RenderPass and is registered with the renderer in draw order.

use ash::vk;
use anyhow::Result;
use std::path::Path;

use crate::config::AssetConfigData;
use crate::controller::SceneController;

/// Context provided to each render pass during initialization and rendering
pub struct RenderContext<'a> {
    pub device: &'a ash::Device,
    pub instance: &'a ash::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub command_pool: vk::CommandPool,
    pub graphics_queue: vk::Queue,
    pub extent: vk::Extent2D,
    pub shader_dir: &'a Path,
    pub assets: &'a AssetConfigData,
    pub large_points: bool,
}

impl RenderContext<'_> {
    /// Full-window viewport and scissor, set before every pass records
    pub unsafe fn set_viewport(&self, command_buffer: vk::CommandBuffer) {
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: self.extent.width as f32,
            height: self.extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: self.extent,
        };
        self.device.cmd_set_viewport(command_buffer, 0, &[viewport]);
        self.device.cmd_set_scissor(command_buffer, 0, &[scissor]);
    }

    pub fn aspect(&self) -> f32 {
        if self.extent.height == 0 {
            1.0
        } else {
            self.extent.width as f32 / self.extent.height as f32
        }
    }
}

/// Render pass trait - each rendering system implements this
pub trait RenderPass {
    /// Create pipelines, buffers and textures
    fn initialize(&mut self, ctx: &RenderContext, render_pass: vk::RenderPass) -> Result<()>;

    /// Refresh GPU copies of scene data before recording
    fn update(&mut self, ctx: &RenderContext, frame_index: usize, scene: &SceneController) -> Result<()> {
        let _ = (ctx, frame_index, scene);
        Ok(())
    }

    /// Record rendering commands
    fn render(
        &mut self,
        ctx: &RenderContext,
        command_buffer: vk::CommandBuffer,
        frame_index: usize,
        scene: &SceneController,
    ) -> Result<()>;

    fn cleanup(&mut self, device: &ash::Device);

    fn name(&self) -> &str;

    /// Check if this pass should render this frame
    fn should_render(&self, scene: &SceneController) -> bool {
        let _ = scene;
        true
    }
}

/// Registry of render passes - executed in order
pub struct RenderPassRegistry {
    passes: Vec<Box<dyn RenderPass>>,
}

impl RenderPassRegistry {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    pub fn register(&mut self, pass: Box<dyn RenderPass>) {
        self.passes.push(pass);
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn initialize_all(&mut self, ctx: &RenderContext, render_pass: vk::RenderPass) -> Result<()> {
        for pass in &mut self.passes {
            log::debug!("initializing render pass: {}", pass.name());
            pass.initialize(ctx, render_pass)?;
        }
        Ok(())
    }

    pub fn update_all(&mut self, ctx: &RenderContext, frame_index: usize, scene: &SceneController) -> Result<()> {
        for pass in &mut self.passes {
            if pass.should_render(scene) {
                pass.update(ctx, frame_index, scene)?;
            }
        }
        Ok(())
    }

    pub fn render_all(
        &mut self,
        ctx: &RenderContext,
        command_buffer: vk::CommandBuffer,
        frame_index: usize,
        scene: &SceneController,
    ) -> Result<()> {
        for pass in &mut self.passes {
            if pass.should_render(scene) {
                pass.render(ctx, command_buffer, frame_index, scene)?;
            }
        }
        Ok(())
    }

    pub fn cleanup_all(&mut self, device: &ash::Device) {
        for pass in &mut self.passes {
            log::debug!("cleaning up render pass: {}", pass.name());
            pass.cleanup(device);
        }
    }
}

impl Default for RenderPassRegistry {
    fn default() -> Self {
        Self::new()
    }
}
