pub mod vulkan_context;
pub mod resource_manager;
pub mod camera;
pub mod lighting;
pub mod swapchain;
pub mod texture;
pub mod pipeline;
pub mod render_pass;
pub mod renderer;
pub mod passes;

pub use vulkan_context::VulkanContext;
pub use resource_manager::ResourceManager;
pub use camera::{Camera, CameraPose};
pub use lighting::LightingData;
pub use swapchain::SwapchainManager;
pub use render_pass::{RenderContext, RenderPass, RenderPassRegistry};
pub use renderer::VulkanRenderer;
