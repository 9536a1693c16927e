use ash::vk;
use winit::window::Window;

use super::{ResourceManager, VulkanContext};

/// Swapchain images and views for the window surface
pub struct SwapchainManager {
    pub swapchain: vk::SwapchainKHR,
    pub swapchain_loader: ash::khr::swapchain::Device,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl SwapchainManager {
    pub unsafe fn new(window: &Window, context: &VulkanContext) -> anyhow::Result<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(&context.instance, &context.device);

        let (swapchain, images, format, extent) =
            Self::create_swapchain_internal(window, context, &swapchain_loader, vk::SwapchainKHR::null())?;
        let image_views = Self::create_image_views(&context.device, &images, format)?;

        log::debug!(
            "swapchain {}x{} with {} images ({:?})",
            extent.width,
            extent.height,
            images.len(),
            format
        );

        Ok(Self {
            swapchain,
            swapchain_loader,
            images,
            image_views,
            format,
            extent,
        })
    }

    /// Rebuild for the current window size, reusing the old swapchain as a hint
    pub unsafe fn recreate(&mut self, window: &Window, context: &VulkanContext) -> anyhow::Result<()> {
        self.cleanup_image_views(&context.device);

        let old = self.swapchain;
        let (swapchain, images, format, extent) =
            Self::create_swapchain_internal(window, context, &self.swapchain_loader, old)?;
        self.swapchain_loader.destroy_swapchain(old, None);

        self.image_views = Self::create_image_views(&context.device, &images, format)?;
        self.swapchain = swapchain;
        self.images = images;
        self.format = format;
        self.extent = extent;

        log::debug!("swapchain recreated at {}x{}", extent.width, extent.height);
        Ok(())
    }

    unsafe fn create_swapchain_internal(
        window: &Window,
        context: &VulkanContext,
        swapchain_loader: &ash::khr::swapchain::Device,
        old_swapchain: vk::SwapchainKHR,
    ) -> anyhow::Result<(vk::SwapchainKHR, Vec<vk::Image>, vk::Format, vk::Extent2D)> {
        let surface_loader = &context.surface_loader;
        let physical_device = context.physical_device;
        let surface = context.surface;

        let capabilities = surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?;
        let formats = surface_loader.get_physical_device_surface_formats(physical_device, surface)?;
        let present_modes = surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?;

        // Prefer an sRGB target so shaders can write linear colour
        let surface_format = formats
            .iter()
            .find(|f| {
                f.format == vk::Format::B8G8R8A8_SRGB
                    && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
            })
            .or_else(|| formats.first())
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Surface reports no formats"))?;

        let present_mode = present_modes
            .iter()
            .copied()
            .find(|&mode| mode == vk::PresentModeKHR::MAILBOX)
            .unwrap_or(vk::PresentModeKHR::FIFO);

        let extent = if capabilities.current_extent.width != u32::MAX {
            capabilities.current_extent
        } else {
            let size = window.inner_size();
            vk::Extent2D {
                width: size.width.clamp(
                    capabilities.min_image_extent.width,
                    capabilities.max_image_extent.width,
                ),
                height: size.height.clamp(
                    capabilities.min_image_extent.height,
                    capabilities.max_image_extent.height,
                ),
            }
        };

        let image_count = (capabilities.min_image_count + 1).min(
            if capabilities.max_image_count > 0 {
                capabilities.max_image_count
            } else {
                u32::MAX
            },
        );

        let graphics_family = context.graphics_queue_family;
        let present_family = context.present_queue_family;
        let queue_family_indices = [graphics_family, present_family];

        let (image_sharing_mode, queue_family_index_count) = if graphics_family != present_family {
            (vk::SharingMode::CONCURRENT, 2)
        } else {
            (vk::SharingMode::EXCLUSIVE, 0)
        };

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(image_sharing_mode)
            .queue_family_indices(&queue_family_indices[..queue_family_index_count])
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = swapchain_loader.create_swapchain(&create_info, None)?;
        let images = swapchain_loader.get_swapchain_images(swapchain)?;

        Ok((swapchain, images, surface_format.format, extent))
    }

    unsafe fn create_image_views(
        device: &ash::Device,
        images: &[vk::Image],
        format: vk::Format,
    ) -> anyhow::Result<Vec<vk::ImageView>> {
        images
            .iter()
            .map(|&image| ResourceManager::create_image_view(device, image, format, vk::ImageAspectFlags::COLOR))
            .collect()
    }

    pub unsafe fn cleanup_image_views(&mut self, device: &ash::Device) {
        for &image_view in &self.image_views {
            device.destroy_image_view(image_view, None);
        }
        self.image_views.clear();
    }

    /// Views and the swapchain itself. Must run before the device goes away.
    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        self.cleanup_image_views(device);
        self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        self.swapchain = vk::SwapchainKHR::null();
    }
}
