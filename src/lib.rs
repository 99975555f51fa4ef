// Thin resource layer over raw Vulkan
//
// Capability enumeration, memory type resolution, buffer allocation and
// upload, image barriers and shader module loading.

pub mod backend;
pub mod config;

pub use backend::{
    Buffer, EnumerationError, Outcome, ResourceCreationError, ShaderModule, UploadError,
    VulkanDevice, Warning,
};
