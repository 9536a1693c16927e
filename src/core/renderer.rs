use ash::vk;
use imgui::Context;
use imgui_winit_support::{HiDpiMode, WinitPlatform};
use std::path::{Path, PathBuf};
use std::time::Instant;
use winit::window::Window;

use crate::config::AssetConfigData;
use crate::controller::SceneController;
use crate::core::passes::{BackgroundPass, LinePass, MeshPass, PointsPass};
use crate::core::{RenderContext, RenderPassRegistry, ResourceManager, SwapchainManager, VulkanContext};
use crate::imgui_renderer::ImGuiRenderer;
use crate::ui::UiManager;

pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

/// Behind the background pass, so only visible if every texture failed
const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Owns the window and every GPU object. Draws one frame of the scene plus
/// the imgui overlay per `render` call.
pub struct VulkanRenderer {
    swapchain: SwapchainManager,
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,
    depth_image: vk::Image,
    depth_image_memory: vk::DeviceMemory,
    depth_image_view: vk::ImageView,

    command_pool: vk::CommandPool,
    command_buffers: Vec<vk::CommandBuffer>,
    image_available_semaphores: Vec<vk::Semaphore>,
    render_finished_semaphores: Vec<vk::Semaphore>,
    in_flight_fences: Vec<vk::Fence>,
    images_in_flight: Vec<vk::Fence>,
    current_frame: usize,

    render_passes: RenderPassRegistry,

    imgui_context: Context,
    imgui_platform: WinitPlatform,
    imgui_renderer: ImGuiRenderer,
    ui: UiManager,

    shader_dir: PathBuf,
    assets: AssetConfigData,
    title: String,
    fps_frame_count: u32,
    last_time: Instant,

    // Dropped after everything above has been cleaned up
    context: VulkanContext,
    window: Window,
}

/// Borrow the pieces of the renderer that passes need
fn render_context<'a>(
    context: &'a VulkanContext,
    command_pool: vk::CommandPool,
    extent: vk::Extent2D,
    shader_dir: &'a Path,
    assets: &'a AssetConfigData,
) -> RenderContext<'a> {
    RenderContext {
        device: &context.device,
        instance: &context.instance,
        physical_device: context.physical_device,
        command_pool,
        graphics_queue: context.graphics_queue,
        extent,
        shader_dir,
        assets,
        large_points: context.large_points,
    }
}

impl VulkanRenderer {
    pub fn new(window: Window, controller: &SceneController) -> anyhow::Result<Self> {
        let config = controller.config();
        let context = VulkanContext::new(&window, &config.window.title)?;

        unsafe {
            let swapchain = SwapchainManager::new(&window, &context)?;
            let render_pass = Self::create_render_pass(&context.device, swapchain.format)?;

            let (depth_image, depth_image_memory, depth_image_view) = ResourceManager::create_depth_resources(
                &context.instance,
                context.physical_device,
                &context.device,
                swapchain.extent,
                DEPTH_FORMAT,
            )?;
            let framebuffers = Self::create_framebuffers(
                &context.device,
                &swapchain.image_views,
                depth_image_view,
                render_pass,
                swapchain.extent,
            )?;

            let command_pool = ResourceManager::create_command_pool(&context.device, context.graphics_queue_family)?;
            let command_buffers =
                ResourceManager::create_command_buffers(&context.device, command_pool, MAX_FRAMES_IN_FLIGHT)?;
            let (image_available_semaphores, render_finished_semaphores, in_flight_fences) =
                ResourceManager::create_sync_objects(&context.device, MAX_FRAMES_IN_FLIGHT)?;
            let images_in_flight = vec![vk::Fence::null(); swapchain.images.len()];

            let shader_dir = PathBuf::from(&config.assets.shader_dir);
            let assets = config.assets.clone();

            // Draw order: backdrop, lit meshes, helpers, then additive stars
            let mut render_passes = RenderPassRegistry::new();
            render_passes.register(Box::new(BackgroundPass::new()));
            render_passes.register(Box::new(MeshPass::new(controller.scene(), MAX_FRAMES_IN_FLIGHT)));
            render_passes.register(Box::new(LinePass::new(controller.scene())));
            render_passes.register(Box::new(PointsPass::new()));

            let ctx = render_context(&context, command_pool, swapchain.extent, &shader_dir, &assets);
            render_passes.initialize_all(&ctx, render_pass)?;
            log::info!("initialized {} render passes", render_passes.len());

            let mut imgui_context = Context::create();
            imgui_context.set_ini_filename(None);

            let mut imgui_platform = WinitPlatform::init(&mut imgui_context);
            imgui_platform.attach_window(imgui_context.io_mut(), &window, HiDpiMode::Default);

            imgui_context.fonts().add_font(&[imgui::FontSource::DefaultFontData {
                config: Some(imgui::FontConfig {
                    size_pixels: 18.0,
                    ..Default::default()
                }),
            }]);

            let imgui_renderer = ImGuiRenderer::new(&mut imgui_context, &ctx, render_pass, MAX_FRAMES_IN_FLIGHT)?;
            let ui = UiManager::new(controller);

            Ok(Self {
                swapchain,
                render_pass,
                framebuffers,
                depth_image,
                depth_image_memory,
                depth_image_view,
                command_pool,
                command_buffers,
                image_available_semaphores,
                render_finished_semaphores,
                in_flight_fences,
                images_in_flight,
                current_frame: 0,
                render_passes,
                imgui_context,
                imgui_platform,
                imgui_renderer,
                ui,
                shader_dir,
                assets,
                title: config.window.title.clone(),
                fps_frame_count: 0,
                last_time: Instant::now(),
                context,
                window,
            })
        }
    }

    unsafe fn create_render_pass(device: &ash::Device, format: vk::Format) -> anyhow::Result<vk::RenderPass> {
        let color_attachment = vk::AttachmentDescription::default()
            .format(format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR);

        let depth_attachment = vk::AttachmentDescription::default()
            .format(DEPTH_FORMAT)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

        let color_attachment_ref = vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

        let depth_attachment_ref = vk::AttachmentReference::default()
            .attachment(1)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

        let subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(std::slice::from_ref(&color_attachment_ref))
            .depth_stencil_attachment(&depth_attachment_ref);

        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            )
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            )
            .dst_access_mask(
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            );

        let attachments = [color_attachment, depth_attachment];
        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency));

        Ok(device.create_render_pass(&create_info, None)?)
    }

    unsafe fn create_framebuffers(
        device: &ash::Device,
        image_views: &[vk::ImageView],
        depth_image_view: vk::ImageView,
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
    ) -> anyhow::Result<Vec<vk::Framebuffer>> {
        image_views
            .iter()
            .map(|&image_view| {
                let attachments = [image_view, depth_image_view];
                let create_info = vk::FramebufferCreateInfo::default()
                    .render_pass(render_pass)
                    .attachments(&attachments)
                    .width(extent.width)
                    .height(extent.height)
                    .layers(1);

                device
                    .create_framebuffer(&create_info, None)
                    .map_err(|e| anyhow::anyhow!("Failed to create framebuffer: {}", e))
            })
            .collect()
    }

    /// Draw one frame: scene passes, then the UI built against `controller`
    pub fn render(&mut self, controller: &mut SceneController) -> anyhow::Result<()> {
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }

        unsafe {
            let frame = self.current_frame;
            self.context
                .device
                .wait_for_fences(&[self.in_flight_fences[frame]], true, u64::MAX)?;

            let result = self.swapchain.swapchain_loader.acquire_next_image(
                self.swapchain.swapchain,
                u64::MAX,
                self.image_available_semaphores[frame],
                vk::Fence::null(),
            );

            let image_index = match result {
                Ok((image_index, _)) => image_index,
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    self.recreate_swapchain()?;
                    return Ok(());
                }
                Err(e) => return Err(anyhow::anyhow!("Failed to acquire swap chain image: {}", e)),
            };

            // Wait for this image if an older frame is still using it
            let image_fence = self.images_in_flight[image_index as usize];
            if image_fence != vk::Fence::null() {
                self.context.device.wait_for_fences(&[image_fence], true, u64::MAX)?;
            }
            self.images_in_flight[image_index as usize] = self.in_flight_fences[frame];

            let ctx = render_context(
                &self.context,
                self.command_pool,
                self.swapchain.extent,
                &self.shader_dir,
                &self.assets,
            );
            self.render_passes.update_all(&ctx, frame, controller)?;

            self.imgui_platform
                .prepare_frame(self.imgui_context.io_mut(), &self.window)?;
            let ui = self.imgui_context.new_frame();
            self.ui.build_ui(ui, controller);
            self.imgui_platform.prepare_render(ui, &self.window);
            let draw_data = self.imgui_context.render();

            let device = &self.context.device;
            device.reset_fences(&[self.in_flight_fences[frame]])?;

            let command_buffer = self.command_buffers[frame];
            device.reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())?;
            device.begin_command_buffer(command_buffer, &vk::CommandBufferBeginInfo::default())?;

            let clear_values = [
                vk::ClearValue {
                    color: vk::ClearColorValue { float32: CLEAR_COLOR },
                },
                vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
                },
            ];
            let render_pass_info = vk::RenderPassBeginInfo::default()
                .render_pass(self.render_pass)
                .framebuffer(self.framebuffers[image_index as usize])
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: self.swapchain.extent,
                })
                .clear_values(&clear_values);

            device.cmd_begin_render_pass(command_buffer, &render_pass_info, vk::SubpassContents::INLINE);
            self.render_passes.render_all(&ctx, command_buffer, frame, controller)?;
            self.imgui_renderer.render(&ctx, command_buffer, frame, draw_data)?;
            device.cmd_end_render_pass(command_buffer);
            device.end_command_buffer(command_buffer)?;

            let wait_semaphores = [self.image_available_semaphores[frame]];
            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let signal_semaphores = [self.render_finished_semaphores[frame]];
            let command_buffers = [command_buffer];

            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);

            device.queue_submit(self.context.graphics_queue, &[submit_info], self.in_flight_fences[frame])?;

            let swapchains = [self.swapchain.swapchain];
            let image_indices = [image_index];
            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&signal_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            let result = self
                .swapchain
                .swapchain_loader
                .queue_present(self.context.present_queue, &present_info);

            match result {
                Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) | Err(vk::Result::SUBOPTIMAL_KHR) => {
                    self.recreate_swapchain()?;
                }
                Err(e) => return Err(anyhow::anyhow!("Failed to present swap chain image: {}", e)),
                _ => {}
            }

            self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;
        }

        self.update_fps();
        Ok(())
    }

    fn update_fps(&mut self) {
        self.fps_frame_count += 1;

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_time).as_secs_f64();
        if elapsed >= 0.5 {
            let fps = self.fps_frame_count as f64 / elapsed;
            self.window.set_title(&format!("{} | FPS: {:.0}", self.title, fps));
            self.fps_frame_count = 0;
            self.last_time = now;
        }
    }

    pub fn handle_resize(&mut self) {
        unsafe {
            if let Err(e) = self.recreate_swapchain() {
                log::error!("Failed to recreate swapchain on resize: {:#}", e);
            }
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn handle_imgui_event(&mut self, event: &winit::event::Event<()>) {
        self.imgui_platform
            .handle_event(self.imgui_context.io_mut(), &self.window, event);
    }

    pub fn imgui_wants_mouse(&self) -> bool {
        self.imgui_context.io().want_capture_mouse
    }

    unsafe fn recreate_swapchain(&mut self) -> anyhow::Result<()> {
        // Minimised: keep the old swapchain until there is something to draw into
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }

        self.context.device.device_wait_idle()?;
        self.cleanup_swapchain();

        self.swapchain.recreate(&self.window, &self.context)?;

        let (depth_image, depth_image_memory, depth_image_view) = ResourceManager::create_depth_resources(
            &self.context.instance,
            self.context.physical_device,
            &self.context.device,
            self.swapchain.extent,
            DEPTH_FORMAT,
        )?;
        self.depth_image = depth_image;
        self.depth_image_memory = depth_image_memory;
        self.depth_image_view = depth_image_view;

        self.framebuffers = Self::create_framebuffers(
            &self.context.device,
            &self.swapchain.image_views,
            self.depth_image_view,
            self.render_pass,
            self.swapchain.extent,
        )?;
        self.images_in_flight = vec![vk::Fence::null(); self.swapchain.images.len()];

        Ok(())
    }

    /// Destroy the size-dependent targets. The swapchain itself is recycled.
    unsafe fn cleanup_swapchain(&mut self) {
        let device = &self.context.device;
        device.destroy_image_view(self.depth_image_view, None);
        device.destroy_image(self.depth_image, None);
        device.free_memory(self.depth_image_memory, None);

        for framebuffer in self.framebuffers.drain(..) {
            device.destroy_framebuffer(framebuffer, None);
        }
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.context.device.device_wait_idle() {
                log::error!("device_wait_idle failed during shutdown: {}", e);
            }

            self.imgui_renderer.cleanup(&self.context.device);
            self.render_passes.cleanup_all(&self.context.device);

            self.cleanup_swapchain();
            self.swapchain.destroy(&self.context.device);

            let device = &self.context.device;
            for i in 0..MAX_FRAMES_IN_FLIGHT {
                device.destroy_semaphore(self.render_finished_semaphores[i], None);
                device.destroy_semaphore(self.image_available_semaphores[i], None);
                device.destroy_fence(self.in_flight_fences[i], None);
            }

            device.destroy_command_pool(self.command_pool, None);
            device.destroy_render_pass(self.render_pass, None);
        }
        log::debug!("renderer destroyed");
    }
}
