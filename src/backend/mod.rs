// Backend module - Vulkan resource layer
//
// Design: Thin wrapper around ash with safety and ergonomics
// Every device call goes through the traits in `raw`, so the same code runs
// against a real device or the test stub.

pub mod barrier;
pub mod buffer;
pub mod capability;
pub mod device;
pub mod error;
pub mod memory;
pub mod raw;
pub mod shader;

#[cfg(test)]
pub(crate) mod stub;

pub use barrier::{image_memory_barrier, AccessState, ImageTransition};
pub use buffer::{allocate_buffer, create_buffer, Buffer};
pub use capability::{device_extensions, instance_extensions, missing, validation_layers};
pub use device::VulkanDevice;
pub use error::{
    EnumerationError, Outcome, ResourceCreationError, StrictError, UploadError, Warning,
};
pub use memory::{
    find_memory_type, find_memory_type_fallback, MemoryTypeChoice, MemoryTypeRequirement,
};
pub use raw::{CapabilitySource, DeviceCapabilitySource, RawDevice};
pub use shader::{load_shader_module, ShaderModule};
