use ash::{vk, Entry};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{c_char, CStr, CString};
use winit::window::Window;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Instance, device and queues for one window surface
pub struct VulkanContext {
    _entry: Entry,
    pub instance: ash::Instance,
    debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    pub surface: vk::SurfaceKHR,
    pub surface_loader: ash::khr::surface::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: ash::Device,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
    pub graphics_queue_family: u32,
    pub present_queue_family: u32,
    /// Whether point sprites may be larger than one pixel
    pub large_points: bool,
}

/// The GPU chosen for the window and what it can do
struct GpuSelection {
    physical_device: vk::PhysicalDevice,
    graphics_family: u32,
    present_family: u32,
    large_points: bool,
}

impl VulkanContext {
    pub fn new(window: &Window, app_name: &str) -> anyhow::Result<Self> {
        unsafe {
            let entry = Entry::load()?;
            let validation = cfg!(debug_assertions) && Self::has_validation_layer(&entry);
            let instance = Self::create_instance(&entry, window, app_name, validation)?;

            let debug_utils = if validation {
                Some(Self::create_debug_messenger(&entry, &instance)?)
            } else {
                None
            };

            let surface = ash_window::create_surface(
                &entry,
                &instance,
                window.display_handle()?.as_raw(),
                window.window_handle()?.as_raw(),
                None,
            )?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let gpu = Self::select_gpu(&instance, &surface_loader, surface)?;
            if !gpu.large_points {
                log::warn!("largePoints not supported, stars will render as single pixels");
            }

            let device = Self::create_logical_device(&instance, &gpu)?;
            let graphics_queue = device.get_device_queue(gpu.graphics_family, 0);
            let present_queue = device.get_device_queue(gpu.present_family, 0);

            Ok(Self {
                _entry: entry,
                instance,
                debug_utils,
                surface,
                surface_loader,
                physical_device: gpu.physical_device,
                device,
                graphics_queue,
                present_queue,
                graphics_queue_family: gpu.graphics_family,
                present_queue_family: gpu.present_family,
                large_points: gpu.large_points,
            })
        }
    }

    unsafe fn has_validation_layer(entry: &Entry) -> bool {
        let layers = entry.enumerate_instance_layer_properties().unwrap_or_default();
        let found = layers
            .iter()
            .any(|layer| CStr::from_ptr(layer.layer_name.as_ptr()) == VALIDATION_LAYER);
        if !found {
            log::debug!("validation layer not installed, running without it");
        }
        found
    }

    unsafe fn create_instance(
        entry: &Entry,
        window: &Window,
        app_name: &str,
        validation: bool,
    ) -> anyhow::Result<ash::Instance> {
        let app_name = CString::new(app_name)?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"portfolio-scene")
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_2);

        let mut extensions: Vec<*const c_char> =
            ash_window::enumerate_required_extensions(window.display_handle()?.as_raw())?.to_vec();
        let mut layers: Vec<*const c_char> = Vec::new();
        if validation {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
            layers.push(VALIDATION_LAYER.as_ptr());
        }

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);

        Ok(entry.create_instance(&create_info, None)?)
    }

    unsafe fn create_debug_messenger(
        entry: &Entry,
        instance: &ash::Instance,
    ) -> anyhow::Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);

        let info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(vulkan_debug_callback));

        let messenger = loader.create_debug_utils_messenger(&info, None)?;
        Ok((loader, messenger))
    }

    /// Pick the best GPU that can draw to `surface`. Discrete cards win, and
    /// a queue family that both draws and presents is preferred.
    unsafe fn select_gpu(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> anyhow::Result<GpuSelection> {
        let mut best: Option<(u32, GpuSelection)> = None;

        for physical_device in instance.enumerate_physical_devices()? {
            if !Self::supports_swapchain(instance, physical_device) {
                continue;
            }
            let Some((graphics_family, present_family)) =
                Self::queue_families(instance, physical_device, surface_loader, surface)
            else {
                continue;
            };

            let properties = instance.get_physical_device_properties(physical_device);
            let features = instance.get_physical_device_features(physical_device);

            let mut score = match properties.device_type {
                vk::PhysicalDeviceType::DISCRETE_GPU => 100,
                vk::PhysicalDeviceType::INTEGRATED_GPU => 50,
                _ => 10,
            };
            if graphics_family == present_family {
                score += 5;
            }

            log::debug!(
                "candidate GPU {:?} ({:?}), score {}",
                CStr::from_ptr(properties.device_name.as_ptr()),
                properties.device_type,
                score
            );

            if best.as_ref().map_or(true, |(best_score, _)| score > *best_score) {
                best = Some((
                    score,
                    GpuSelection {
                        physical_device,
                        graphics_family,
                        present_family,
                        large_points: features.large_points == vk::TRUE,
                    },
                ));
            }
        }

        let (_, gpu) = best.ok_or_else(|| anyhow::anyhow!("No GPU can present to this window"))?;
        let properties = instance.get_physical_device_properties(gpu.physical_device);
        log::info!("using GPU {:?}", CStr::from_ptr(properties.device_name.as_ptr()));
        Ok(gpu)
    }

    /// Graphics and present queue family indices, sharing one family when possible
    unsafe fn queue_families(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Option<(u32, u32)> {
        let families = instance.get_physical_device_queue_family_properties(physical_device);
        let can_present = |index: u32| {
            surface_loader
                .get_physical_device_surface_support(physical_device, index, surface)
                .unwrap_or(false)
        };

        let graphics: Vec<u32> = families
            .iter()
            .enumerate()
            .filter(|(_, family)| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|(i, _)| i as u32)
            .collect();

        if let Some(&shared) = graphics.iter().find(|&&i| can_present(i)) {
            return Some((shared, shared));
        }

        let graphics_family = *graphics.first()?;
        let present_family = (0..families.len() as u32).find(|&i| can_present(i))?;
        Some((graphics_family, present_family))
    }

    unsafe fn supports_swapchain(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> bool {
        instance
            .enumerate_device_extension_properties(physical_device)
            .unwrap_or_default()
            .iter()
            .any(|ext| CStr::from_ptr(ext.extension_name.as_ptr()) == ash::khr::swapchain::NAME)
    }

    unsafe fn create_logical_device(instance: &ash::Instance, gpu: &GpuSelection) -> anyhow::Result<ash::Device> {
        let queue_priority = [1.0f32];
        let mut queue_create_infos = vec![vk::DeviceQueueCreateInfo::default()
            .queue_family_index(gpu.graphics_family)
            .queue_priorities(&queue_priority)];
        if gpu.present_family != gpu.graphics_family {
            queue_create_infos.push(
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(gpu.present_family)
                    .queue_priorities(&queue_priority),
            );
        }

        let features = vk::PhysicalDeviceFeatures::default().large_points(gpu.large_points);
        let extensions = [ash::khr::swapchain::NAME.as_ptr()];

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extensions)
            .enabled_features(&features);

        Ok(instance.create_device(gpu.physical_device, &create_info, None)?)
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_device(None);

            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.surface_loader.destroy_surface(self.surface, None);
            self.instance.destroy_instance(None);
        }
    }
}

unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*p_callback_data).p_message);

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::error!(target: "vulkan", "{:?}: {:?}", message_type, message);
    } else {
        log::warn!(target: "vulkan", "{:?}: {:?}", message_type, message);
    }

    vk::FALSE
}
