use ash::vk;
use anyhow::Context;
use bytemuck::Pod;
use std::path::Path;

use super::render_pass::RenderContext;

/// Buffer, memory, image and shader helpers shared by every pass
pub struct ResourceManager;

impl ResourceManager {
    /// Buffer of `size` bytes with its own memory allocation
    pub unsafe fn create_buffer(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> anyhow::Result<(vk::Buffer, vk::DeviceMemory)> {
        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage);

        let buffer = device.create_buffer(&buffer_info, None)?;
        let requirements = device.get_buffer_memory_requirements(buffer);
        let memory = match Self::allocate(instance, physical_device, device, requirements, properties) {
            Ok(memory) => memory,
            Err(e) => {
                device.destroy_buffer(buffer, None);
                return Err(e);
            }
        };
        device.bind_buffer_memory(buffer, memory, 0)?;

        Ok((buffer, memory))
    }

    /// Allocate memory matching `requirements` with the given properties
    unsafe fn allocate(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
        requirements: vk::MemoryRequirements,
        properties: vk::MemoryPropertyFlags,
    ) -> anyhow::Result<vk::DeviceMemory> {
        let memory_type = Self::find_memory_type(instance, physical_device, requirements.memory_type_bits, properties)?;
        let info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type);
        Ok(device.allocate_memory(&info, None)?)
    }

    /// Find a suitable memory type for the given requirements
    pub unsafe fn find_memory_type(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        type_filter: u32,
        properties: vk::MemoryPropertyFlags,
    ) -> anyhow::Result<u32> {
        let mem_properties = instance.get_physical_device_memory_properties(physical_device);

        mem_properties
            .memory_types_as_slice()
            .iter()
            .enumerate()
            .find(|(i, memory_type)| {
                type_filter & (1 << i) != 0 && memory_type.property_flags.contains(properties)
            })
            .map(|(i, _)| i as u32)
            .ok_or_else(|| anyhow::anyhow!("No memory type with {:?} in mask {:#x}", properties, type_filter))
    }

    /// Record `record` into a throwaway command buffer and wait for it
    pub unsafe fn submit_once<F>(ctx: &RenderContext, record: F) -> anyhow::Result<()>
    where
        F: FnOnce(vk::CommandBuffer),
    {
        let device = ctx.device;
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_pool(ctx.command_pool)
            .command_buffer_count(1);

        let command_buffer = device
            .allocate_command_buffers(&alloc_info)?
            .first()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("No command buffer allocated"))?;

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        device.begin_command_buffer(command_buffer, &begin_info)?;
        record(command_buffer);
        device.end_command_buffer(command_buffer)?;

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        device.queue_submit(ctx.graphics_queue, &[submit_info], vk::Fence::null())?;
        device.queue_wait_idle(ctx.graphics_queue)?;

        device.free_command_buffers(ctx.command_pool, &command_buffers);

        Ok(())
    }

    /// Upload `data` through a staging buffer into device-local memory
    pub unsafe fn create_device_local_buffer<T: Pod>(
        ctx: &RenderContext,
        data: &[T],
        usage: vk::BufferUsageFlags,
    ) -> anyhow::Result<(vk::Buffer, vk::DeviceMemory)> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        anyhow::ensure!(!bytes.is_empty(), "Refusing to create an empty buffer");
        let buffer_size = bytes.len() as vk::DeviceSize;

        let (staging_buffer, staging_memory) = Self::create_buffer(
            ctx.instance,
            ctx.physical_device,
            ctx.device,
            buffer_size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        Self::write_memory(ctx.device, staging_memory, bytes)?;

        let (buffer, memory) = Self::create_buffer(
            ctx.instance,
            ctx.physical_device,
            ctx.device,
            buffer_size,
            vk::BufferUsageFlags::TRANSFER_DST | usage,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        let copied = Self::submit_once(ctx, |cmd| {
            let copy_region = vk::BufferCopy::default().size(buffer_size);
            ctx.device.cmd_copy_buffer(cmd, staging_buffer, buffer, &[copy_region]);
        });

        ctx.device.destroy_buffer(staging_buffer, None);
        ctx.device.free_memory(staging_memory, None);
        copied?;

        Ok((buffer, memory))
    }

    /// Copy raw bytes into host-visible, host-coherent memory
    pub unsafe fn write_memory(device: &ash::Device, memory: vk::DeviceMemory, bytes: &[u8]) -> anyhow::Result<()> {
        let data = device.map_memory(
            memory,
            0,
            bytes.len() as vk::DeviceSize,
            vk::MemoryMapFlags::empty(),
        )?;
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), data as *mut u8, bytes.len());
        device.unmap_memory(memory);
        Ok(())
    }

    pub unsafe fn create_command_pool(
        device: &ash::Device,
        queue_family_index: u32,
    ) -> anyhow::Result<vk::CommandPool> {
        let pool_info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        Ok(device.create_command_pool(&pool_info, None)?)
    }

    pub unsafe fn create_command_buffers(
        device: &ash::Device,
        command_pool: vk::CommandPool,
        count: usize,
    ) -> anyhow::Result<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count as u32);

        Ok(device.allocate_command_buffers(&alloc_info)?)
    }

    /// Semaphores and fences for each frame in flight
    pub unsafe fn create_sync_objects(
        device: &ash::Device,
        frame_count: usize,
    ) -> anyhow::Result<(Vec<vk::Semaphore>, Vec<vk::Semaphore>, Vec<vk::Fence>)> {
        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);

        let mut image_available = Vec::with_capacity(frame_count);
        let mut render_finished = Vec::with_capacity(frame_count);
        let mut in_flight_fences = Vec::with_capacity(frame_count);

        for _ in 0..frame_count {
            image_available.push(device.create_semaphore(&semaphore_info, None)?);
            render_finished.push(device.create_semaphore(&semaphore_info, None)?);
            in_flight_fences.push(device.create_fence(&fence_info, None)?);
        }

        Ok((image_available, render_finished, in_flight_fences))
    }

    /// Create a 2D image backed by device-local memory
    pub unsafe fn create_image(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
    ) -> anyhow::Result<(vk::Image, vk::DeviceMemory)> {
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .usage(usage);
        // OPTIMAL tiling, UNDEFINED initial layout and exclusive sharing are the zero defaults

        let image = device.create_image(&image_info, None)?;
        let requirements = device.get_image_memory_requirements(image);
        let memory = match Self::allocate(
            instance,
            physical_device,
            device,
            requirements,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ) {
            Ok(memory) => memory,
            Err(e) => {
                device.destroy_image(image, None);
                return Err(e);
            }
        };
        device.bind_image_memory(image, memory, 0)?;

        Ok((image, memory))
    }

    pub unsafe fn create_image_view(
        device: &ash::Device,
        image: vk::Image,
        format: vk::Format,
        aspect_mask: vk::ImageAspectFlags,
    ) -> anyhow::Result<vk::ImageView> {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        Ok(device.create_image_view(&view_info, None)?)
    }

    /// Create a depth image with view
    pub unsafe fn create_depth_resources(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
        extent: vk::Extent2D,
        format: vk::Format,
    ) -> anyhow::Result<(vk::Image, vk::DeviceMemory, vk::ImageView)> {
        let (image, memory) = Self::create_image(
            instance,
            physical_device,
            device,
            extent,
            format,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        )?;
        let view = Self::create_image_view(device, image, format, vk::ImageAspectFlags::DEPTH)?;

        Ok((image, memory, view))
    }

    /// Create a shader module from SPIR-V bytecode
    pub unsafe fn create_shader_module(
        device: &ash::Device,
        code: &[u8],
    ) -> anyhow::Result<vk::ShaderModule> {
        let code_aligned = ash::util::read_spv(&mut std::io::Cursor::new(code))?;
        let create_info = vk::ShaderModuleCreateInfo::default().code(&code_aligned);

        Ok(device.create_shader_module(&create_info, None)?)
    }

    /// Load compiled SPIR-V `<dir>/<name>` and wrap it in a shader module
    pub unsafe fn load_shader(device: &ash::Device, dir: &Path, name: &str) -> anyhow::Result<vk::ShaderModule> {
        let path = dir.join(name);
        let code = std::fs::read(&path)
            .with_context(|| format!("Failed to read shader {}", path.display()))?;
        Self::create_shader_module(device, &code)
            .with_context(|| format!("Invalid SPIR-V in {}", path.display()))
    }
}

/// Host-visible buffer that is rewritten from the CPU and grows on demand
pub struct HostBuffer {
    pub buffer: vk::Buffer,
    pub memory: vk::DeviceMemory,
    capacity: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
}

impl HostBuffer {
    pub unsafe fn new(ctx: &RenderContext, capacity: vk::DeviceSize, usage: vk::BufferUsageFlags) -> anyhow::Result<Self> {
        let capacity = capacity.max(1);
        let (buffer, memory) = ResourceManager::create_buffer(
            ctx.instance,
            ctx.physical_device,
            ctx.device,
            capacity,
            usage,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        Ok(Self {
            buffer,
            memory,
            capacity,
            usage,
        })
    }

    /// Overwrite the contents, reallocating when `data` does not fit.
    /// The caller makes sure the GPU is not reading the buffer.
    pub unsafe fn write<T: Pod>(&mut self, ctx: &RenderContext, data: &[T]) -> anyhow::Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if bytes.is_empty() {
            return Ok(());
        }

        let needed = bytes.len() as vk::DeviceSize;
        if needed > self.capacity {
            let grown = Self::new(ctx, needed.next_power_of_two(), self.usage)?;
            self.destroy(ctx.device);
            *self = grown;
        }

        ResourceManager::write_memory(ctx.device, self.memory, bytes)
    }

    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        device.destroy_buffer(self.buffer, None);
        device.free_memory(self.memory, None);
        self.buffer = vk::Buffer::null();
        self.memory = vk::DeviceMemory::null();
        self.capacity = 0;
    }
}
