// Device boundary
//
// The handful of raw Vulkan entry points this layer calls, expressed as
// traits. `ash` provides the real implementations; tests plug in a stub.

use ash::prelude::VkResult;
use ash::vk;
use std::ffi::c_void;
use std::ptr;

/// Platform-level enumeration (no instance required).
///
/// Each method is one half of the two-call protocol: `out = None` asks for the
/// count, `Some(slice)` fills at most `slice.len()` entries and writes the
/// number actually filled back to `count`.
pub trait CapabilitySource {
    fn instance_extension_properties(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result;

    fn instance_layer_properties(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::LayerProperties]>,
    ) -> vk::Result;
}

/// Enumeration scoped to one physical device.
pub trait DeviceCapabilitySource {
    fn device_extension_properties(
        &self,
        physical_device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result;
}

/// Resource and command calls against a logical device.
///
/// # Safety
/// Same contract as the matching `vkXxx` function: handles must come from
/// this device and must not be in use by the GPU when destroyed.
pub trait RawDevice {
    unsafe fn create_raw_buffer(&self, info: &vk::BufferCreateInfo) -> VkResult<vk::Buffer>;

    unsafe fn raw_buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements;

    unsafe fn allocate_raw_memory(
        &self,
        info: &vk::MemoryAllocateInfo,
    ) -> VkResult<vk::DeviceMemory>;

    unsafe fn bind_raw_buffer_memory(
        &self,
        buffer: vk::Buffer,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> VkResult<()>;

    unsafe fn map_raw_memory(
        &self,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
    ) -> VkResult<*mut c_void>;

    unsafe fn unmap_raw_memory(&self, memory: vk::DeviceMemory);

    unsafe fn free_raw_memory(&self, memory: vk::DeviceMemory);

    unsafe fn destroy_raw_buffer(&self, buffer: vk::Buffer);

    unsafe fn create_raw_shader_module(
        &self,
        info: &vk::ShaderModuleCreateInfo,
    ) -> VkResult<vk::ShaderModule>;

    unsafe fn destroy_raw_shader_module(&self, module: vk::ShaderModule);

    /// `vkCmdPipelineBarrier` with image barriers only.
    unsafe fn cmd_image_barriers(
        &self,
        cmd: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barriers: &[vk::ImageMemoryBarrier],
    );
}

fn out_ptr<T>(count: &mut u32, out: Option<&mut [T]>) -> *mut T {
    match out {
        Some(out) => {
            *count = (*count).min(out.len() as u32);
            out.as_mut_ptr()
        }
        None => ptr::null_mut(),
    }
}

impl CapabilitySource for ash::Entry {
    fn instance_extension_properties(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result {
        let p_properties = out_ptr(count, out);
        // SAFETY: count never exceeds the destination length, and a null
        // destination is the documented count query.
        unsafe {
            (self.fp_v1_0().enumerate_instance_extension_properties)(
                ptr::null(),
                count,
                p_properties,
            )
        }
    }

    fn instance_layer_properties(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::LayerProperties]>,
    ) -> vk::Result {
        let p_properties = out_ptr(count, out);
        // SAFETY: as above.
        unsafe { (self.fp_v1_0().enumerate_instance_layer_properties)(count, p_properties) }
    }
}

impl DeviceCapabilitySource for ash::Instance {
    fn device_extension_properties(
        &self,
        physical_device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result {
        let p_properties = out_ptr(count, out);
        // SAFETY: physical_device was enumerated from this instance; count is
        // clamped to the destination length.
        unsafe {
            (self.fp_v1_0().enumerate_device_extension_properties)(
                physical_device,
                ptr::null(),
                count,
                p_properties,
            )
        }
    }
}
