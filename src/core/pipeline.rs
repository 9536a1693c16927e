use ash::vk;
use anyhow::Result;
use std::ffi::CString;

use super::render_pass::RenderContext;
use super::resource_manager::ResourceManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Opaque,
    /// Straight alpha, used by the UI
    Alpha,
    /// Colour is added on top, for glowing sprites
    Additive,
}

/// Fixed-function state for one graphics pipeline. Viewport and scissor are
/// always dynamic so nothing needs rebuilding when the window resizes.
pub struct PipelineConfig<'a> {
    pub name: &'a str,
    pub vertex_shader: &'a str,
    pub fragment_shader: &'a str,
    pub bindings: &'a [vk::VertexInputBindingDescription],
    pub attributes: &'a [vk::VertexInputAttributeDescription],
    pub topology: vk::PrimitiveTopology,
    pub cull_mode: vk::CullModeFlags,
    pub depth_test: bool,
    pub depth_write: bool,
    pub blend: BlendMode,
}

impl<'a> PipelineConfig<'a> {
    pub fn new(name: &'a str, vertex_shader: &'a str, fragment_shader: &'a str) -> Self {
        Self {
            name,
            vertex_shader,
            fragment_shader,
            bindings: &[],
            attributes: &[],
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            cull_mode: vk::CullModeFlags::NONE,
            depth_test: true,
            depth_write: true,
            blend: BlendMode::Opaque,
        }
    }
}

pub unsafe fn create_graphics_pipeline(
    ctx: &RenderContext,
    render_pass: vk::RenderPass,
    layout: vk::PipelineLayout,
    config: &PipelineConfig,
) -> Result<vk::Pipeline> {
    let device = ctx.device;
    let vert_shader_module = ResourceManager::load_shader(device, ctx.shader_dir, config.vertex_shader)?;
    let frag_shader_module = match ResourceManager::load_shader(device, ctx.shader_dir, config.fragment_shader) {
        Ok(module) => module,
        Err(e) => {
            device.destroy_shader_module(vert_shader_module, None);
            return Err(e);
        }
    };

    let entry_point = CString::new("main")?;

    let shader_stages = [
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vert_shader_module)
            .name(&entry_point),
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(frag_shader_module)
            .name(&entry_point),
    ];

    let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(config.bindings)
        .vertex_attribute_descriptions(config.attributes);

    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(config.topology)
        .primitive_restart_enable(false);

    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let rasterizer = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .line_width(1.0)
        .cull_mode(config.cull_mode)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .depth_bias_enable(false);

    let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
        .sample_shading_enable(false)
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(config.depth_test)
        .depth_write_enable(config.depth_write)
        .depth_compare_op(vk::CompareOp::LESS_OR_EQUAL);

    let color_blend_attachment = match config.blend {
        BlendMode::Opaque => vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false),
        BlendMode::Alpha => vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .alpha_blend_op(vk::BlendOp::ADD),
        BlendMode::Additive => vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
            .alpha_blend_op(vk::BlendOp::ADD),
    };

    let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .attachments(std::slice::from_ref(&color_blend_attachment));

    let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&shader_stages)
        .vertex_input_state(&vertex_input_info)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterizer)
        .multisample_state(&multisampling)
        .depth_stencil_state(&depth_stencil)
        .color_blend_state(&color_blending)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .render_pass(render_pass)
        .subpass(0);

    let created = device.create_graphics_pipelines(
        vk::PipelineCache::null(),
        std::slice::from_ref(&pipeline_info),
        None,
    );

    device.destroy_shader_module(vert_shader_module, None);
    device.destroy_shader_module(frag_shader_module, None);

    let pipelines = created.map_err(|e| anyhow::anyhow!("Failed to create {} pipeline: {:?}", config.name, e.1))?;
    pipelines
        .first()
        .copied()
        .ok_or_else(|| anyhow::anyhow!("No {} pipeline returned", config.name))
}

pub unsafe fn create_pipeline_layout(
    device: &ash::Device,
    set_layouts: &[vk::DescriptorSetLayout],
    push_constant_size: u32,
    push_constant_stages: vk::ShaderStageFlags,
) -> Result<vk::PipelineLayout> {
    let push_constant_range = vk::PushConstantRange::default()
        .stage_flags(push_constant_stages)
        .offset(0)
        .size(push_constant_size);
    let ranges = [push_constant_range];

    let mut layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(set_layouts);
    if push_constant_size > 0 {
        layout_info = layout_info.push_constant_ranges(&ranges);
    }

    Ok(device.create_pipeline_layout(&layout_info, None)?)
}

/// Layout of `count` combined image samplers visible to the fragment stage
pub unsafe fn create_sampler_set_layout(device: &ash::Device, count: u32) -> Result<vk::DescriptorSetLayout> {
    let bindings: Vec<_> = (0..count)
        .map(|binding| {
            vk::DescriptorSetLayoutBinding::default()
                .binding(binding)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT)
        })
        .collect();

    let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
    Ok(device.create_descriptor_set_layout(&layout_info, None)?)
}

/// Pool sized for `sets` sets of `samplers_per_set` combined image samplers
pub unsafe fn create_sampler_pool(device: &ash::Device, sets: u32, samplers_per_set: u32) -> Result<vk::DescriptorPool> {
    let pool_size = vk::DescriptorPoolSize::default()
        .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .descriptor_count(sets * samplers_per_set);

    let pool_sizes = [pool_size];
    let pool_info = vk::DescriptorPoolCreateInfo::default()
        .pool_sizes(&pool_sizes)
        .max_sets(sets);

    Ok(device.create_descriptor_pool(&pool_info, None)?)
}

/// Allocate one set from `layout` and point its bindings at `images` in order
pub unsafe fn allocate_sampler_set(
    device: &ash::Device,
    pool: vk::DescriptorPool,
    layout: vk::DescriptorSetLayout,
    images: &[vk::DescriptorImageInfo],
) -> Result<vk::DescriptorSet> {
    let layouts = [layout];
    let alloc_info = vk::DescriptorSetAllocateInfo::default()
        .descriptor_pool(pool)
        .set_layouts(&layouts);

    let set = device
        .allocate_descriptor_sets(&alloc_info)?
        .first()
        .copied()
        .ok_or_else(|| anyhow::anyhow!("Descriptor pool returned no sets"))?;

    let writes: Vec<_> = images
        .iter()
        .enumerate()
        .map(|(binding, info)| {
            vk::WriteDescriptorSet::default()
                .dst_set(set)
                .dst_binding(binding as u32)
                .dst_array_element(0)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .image_info(std::slice::from_ref(info))
        })
        .collect();

    device.update_descriptor_sets(&writes, &[]);
    Ok(set)
}
