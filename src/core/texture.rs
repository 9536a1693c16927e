use ash::vk;
use anyhow::Context;
use std::path::Path;

use crate::material::TextureSlot;

use super::render_pass::RenderContext;
use super::resource_manager::ResourceManager;

/// Colour maps are stored sRGB so sampling returns linear values
pub const COLOR_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;
/// Data textures such as normal maps are sampled as-is
pub const DATA_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

pub const WHITE_PIXEL: [u8; 4] = [255, 255, 255, 255];
/// Tangent-space normal pointing straight out of the surface
pub const FLAT_NORMAL_PIXEL: [u8; 4] = [128, 128, 255, 255];

/// Decoded RGBA8 pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageData {
    pub fn solid(pixel: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: pixel.to_vec(),
        }
    }

    pub fn decode(path: &Path) -> anyhow::Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("Failed to decode {}", path.display()))?
            .to_rgba8();
        let (width, height) = image.dimensions();

        Ok(Self {
            width,
            height,
            pixels: image.into_raw(),
        })
    }

    /// Decode `path`, or fall back to a single `fallback` pixel so the scene
    /// still renders with a missing asset
    pub fn decode_or(path: &Path, fallback: [u8; 4]) -> Self {
        match Self::decode(path) {
            Ok(data) => {
                log::debug!("loaded {} ({}x{})", path.display(), data.width, data.height);
                data
            }
            Err(e) => {
                log::warn!("{:#}, using a placeholder", e);
                Self::solid(fallback)
            }
        }
    }
}

/// Sampled 2D texture living in device-local memory
pub struct Texture {
    pub image: vk::Image,
    pub memory: vk::DeviceMemory,
    pub view: vk::ImageView,
    pub sampler: vk::Sampler,
}

impl Texture {
    /// Load the image configured for `slot`
    pub unsafe fn load_slot(ctx: &RenderContext, slot: TextureSlot) -> anyhow::Result<Self> {
        let path = ctx.assets.image_path(slot.file(ctx.assets));
        let (format, fallback) = if slot.is_color() {
            (COLOR_FORMAT, WHITE_PIXEL)
        } else {
            (DATA_FORMAT, FLAT_NORMAL_PIXEL)
        };
        Self::load(ctx, Path::new(&path), format, fallback)
    }

    pub unsafe fn load(ctx: &RenderContext, path: &Path, format: vk::Format, fallback: [u8; 4]) -> anyhow::Result<Self> {
        let data = ImageData::decode_or(path, fallback);
        Self::from_image_data(ctx, &data, format)
    }

    pub unsafe fn from_image_data(ctx: &RenderContext, data: &ImageData, format: vk::Format) -> anyhow::Result<Self> {
        Self::from_rgba(ctx, data.width, data.height, &data.pixels, format)
    }

    pub unsafe fn from_rgba(
        ctx: &RenderContext,
        width: u32,
        height: u32,
        pixels: &[u8],
        format: vk::Format,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            pixels.len() == (width as usize) * (height as usize) * 4,
            "Texture data is {} bytes, expected {}x{} RGBA",
            pixels.len(),
            width,
            height
        );

        let device = ctx.device;
        let extent = vk::Extent2D { width, height };

        let (staging_buffer, staging_memory) = ResourceManager::create_buffer(
            ctx.instance,
            ctx.physical_device,
            device,
            pixels.len() as vk::DeviceSize,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        ResourceManager::write_memory(device, staging_memory, pixels)?;

        let (image, memory) = ResourceManager::create_image(
            ctx.instance,
            ctx.physical_device,
            device,
            extent,
            format,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
        )?;

        let uploaded = ResourceManager::submit_once(ctx, |cmd| {
            transition(device, cmd, image, TransitionKind::UploadStart);

            let region = vk::BufferImageCopy::default()
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_extent(vk::Extent3D {
                    width,
                    height,
                    depth: 1,
                });
            device.cmd_copy_buffer_to_image(
                cmd,
                staging_buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            transition(device, cmd, image, TransitionKind::UploadEnd);
        });

        device.destroy_buffer(staging_buffer, None);
        device.free_memory(staging_memory, None);
        uploaded?;

        let view = ResourceManager::create_image_view(device, image, format, vk::ImageAspectFlags::COLOR)?;

        let sampler_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .max_lod(1.0);
        let sampler = device.create_sampler(&sampler_info, None)?;

        Ok(Self {
            image,
            memory,
            view,
            sampler,
        })
    }

    pub fn descriptor_info(&self) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo {
            sampler: self.sampler,
            image_view: self.view,
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }
    }

    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        device.destroy_sampler(self.sampler, None);
        device.destroy_image_view(self.view, None);
        device.destroy_image(self.image, None);
        device.free_memory(self.memory, None);
    }
}

enum TransitionKind {
    UploadStart,
    UploadEnd,
}

unsafe fn transition(device: &ash::Device, cmd: vk::CommandBuffer, image: vk::Image, kind: TransitionKind) {
    let (old_layout, new_layout, src_access, dst_access, src_stage, dst_stage) = match kind {
        TransitionKind::UploadStart => (
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        TransitionKind::UploadEnd => (
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
    };

    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        })
        .src_access_mask(src_access)
        .dst_access_mask(dst_access);

    device.cmd_pipeline_barrier(
        cmd,
        src_stage,
        dst_stage,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[barrier],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_falls_back() {
        let data = ImageData::decode_or(Path::new("does/not/exist.png"), FLAT_NORMAL_PIXEL);
        assert_eq!(data, ImageData::solid(FLAT_NORMAL_PIXEL));
    }

    #[test]
    fn test_decode_png() {
        let path = std::env::temp_dir().join(format!("texture_test_{}.png", std::process::id()));
        let mut img = image::RgbaImage::new(3, 2);
        img.put_pixel(2, 1, image::Rgba([10, 20, 30, 255]));
        img.save(&path).expect("write png");

        let data = ImageData::decode(&path).expect("decode");
        let _ = std::fs::remove_file(&path);

        assert_eq!((data.width, data.height), (3, 2));
        assert_eq!(data.pixels.len(), 3 * 2 * 4);
        assert_eq!(&data.pixels[20..24], &[10, 20, 30, 255]);
    }
}
