// Buffer utilities for vertex, index, uniform and staging buffers
//
// One buffer object, one dedicated allocation, bound at offset 0. Always
// host-visible so data can be written straight through a mapping; there is
// no device-local staging path here.

use ash::vk;
use bytemuck::Pod;
use std::sync::Arc;

use super::error::{Outcome, ResourceCreationError, UploadError, Warning};
use super::memory::{MemoryTypeChoice, MemoryTypeRequirement};
use super::raw::RawDevice;
use super::VulkanDevice;

/// Memory properties every buffer from this module asks for.
pub const HOST_WRITABLE: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::from_raw(
    vk::MemoryPropertyFlags::HOST_VISIBLE.as_raw()
        | vk::MemoryPropertyFlags::HOST_COHERENT.as_raw(),
);

/// A buffer object and the memory backing it, released together.
///
/// Release happens exactly once, either through [`Buffer::destroy`] or on
/// drop: memory is freed first, then the buffer object.
pub struct Buffer<D: RawDevice = VulkanDevice> {
    // Device for destroy purposes; `None` once released.
    device: Option<Arc<D>>,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
    memory_type_index: u32,
    // Degraded memory type choices may not be mappable
    host_visible: bool,
}

impl<D: RawDevice> std::fmt::Debug for Buffer<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("buffer", &self.buffer)
            .field("memory", &self.memory)
            .field("size", &self.size)
            .field("memory_type_index", &self.memory_type_index)
            .field("host_visible", &self.host_visible)
            .finish_non_exhaustive()
    }
}

impl<D: RawDevice> Buffer<D> {
    pub fn raw(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn memory(&self) -> vk::DeviceMemory {
        self.memory
    }

    /// Size the buffer object was created with (not the allocation size).
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    pub fn memory_type_index(&self) -> u32 {
        self.memory_type_index
    }

    pub fn is_host_visible(&self) -> bool {
        self.host_visible
    }

    /// Map, copy `data` to offset 0, unmap.
    ///
    /// Data longer than the buffer is truncated and reported as
    /// [`UploadError::ShortCopy`] after the copy.
    pub fn upload(&self, data: &[u8]) -> Result<(), UploadError> {
        if data.is_empty() {
            return Ok(());
        }
        let Some(device) = self.device.as_ref() else {
            return Err(UploadError::Released);
        };
        if !self.host_visible {
            return Err(UploadError::NotHostVisible {
                type_index: self.memory_type_index,
            });
        }

        let len = data.len();
        let copy_len = len.min(usize::try_from(self.size).unwrap_or(usize::MAX));

        // SAFETY: memory belongs to this device, is bound to our buffer and is
        // at least `size` bytes long; copy_len <= size.
        unsafe {
            let ptr = device
                .map_raw_memory(self.memory, 0, copy_len as vk::DeviceSize)
                .map_err(|status| UploadError::Map { len, status })?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.cast::<u8>(), copy_len);
            device.unmap_raw_memory(self.memory);
        }

        if copy_len != len {
            return Err(UploadError::ShortCopy {
                copied: copy_len,
                len,
                capacity: self.size,
            });
        }
        Ok(())
    }

    /// Free memory, destroy the buffer object.
    pub fn destroy(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(device) = self.device.take() {
            log::debug!("Destroying buffer {:?}", self.buffer);
            // SAFETY: both handles were created from this device, are owned
            // by this wrapper, and the tag check above guarantees one release.
            unsafe {
                device.free_raw_memory(self.memory);
                device.destroy_raw_buffer(self.buffer);
            }
        }
    }
}

impl<D: RawDevice> Drop for Buffer<D> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Create a host-visible buffer of `size` bytes with its own bound memory.
///
/// A missing HOST_VISIBLE | HOST_COHERENT memory type does not fail the
/// call; the degraded choice is logged and listed in the outcome.
pub fn allocate_buffer<D: RawDevice>(
    device: &Arc<D>,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
) -> Result<Outcome<Buffer<D>>, ResourceCreationError> {
    // Create buffer
    let buffer_info = vk::BufferCreateInfo::builder()
        .size(size)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);

    // SAFETY: buffer_info is fully initialised and borrows nothing.
    let buffer = unsafe { device.create_raw_buffer(&buffer_info) }
        .map_err(ResourceCreationError::CreateBuffer)?;

    // Get memory requirements
    // SAFETY: buffer was just created from this device.
    let mem_requirements = unsafe { device.raw_buffer_memory_requirements(buffer) };

    // Find suitable memory type
    let mut warnings = Vec::new();
    let requirement = MemoryTypeRequirement::from_requirements(&mem_requirements, HOST_WRITABLE);
    let memory_type_index = match requirement.resolve(memory_properties) {
        Some(MemoryTypeChoice {
            index,
            fell_back: false,
        }) => index,
        Some(MemoryTypeChoice {
            index,
            fell_back: true,
        }) => {
            warnings.push(Warning::DegradedAllocation {
                desired: HOST_WRITABLE,
                type_index: index,
                fell_back: true,
            });
            index
        }
        None => {
            warnings.push(Warning::DegradedAllocation {
                desired: HOST_WRITABLE,
                type_index: 0,
                fell_back: false,
            });
            0
        }
    };
    for warning in &warnings {
        log::warn!("Buffer memory: {}", warning);
    }

    // Allocate memory
    let alloc_info = vk::MemoryAllocateInfo::builder()
        .allocation_size(mem_requirements.size)
        .memory_type_index(memory_type_index);

    // SAFETY: alloc_info is fully initialised.
    let memory = match unsafe { device.allocate_raw_memory(&alloc_info) } {
        Ok(memory) => memory,
        Err(status) => {
            // SAFETY: buffer is unbound and owned by this scope.
            unsafe { device.destroy_raw_buffer(buffer) };
            return Err(ResourceCreationError::AllocateMemory {
                size: mem_requirements.size,
                type_index: memory_type_index,
                status,
            });
        }
    };

    // Bind memory to buffer
    // SAFETY: both handles are fresh, from this device, and the allocation
    // is at least mem_requirements.size bytes.
    if let Err(status) = unsafe { device.bind_raw_buffer_memory(buffer, memory, 0) } {
        // SAFETY: both handles are owned by this scope and unused.
        unsafe {
            device.free_raw_memory(memory);
            device.destroy_raw_buffer(buffer);
        }
        return Err(ResourceCreationError::BindMemory(status));
    }

    log::debug!(
        "Created buffer {:?}: {} bytes, memory type {}",
        buffer,
        size,
        memory_type_index
    );

    let host_visible = memory_properties.memory_types
        [..(memory_properties.memory_type_count as usize).min(vk::MAX_MEMORY_TYPES)]
        .get(memory_type_index as usize)
        .is_some_and(|ty| ty.property_flags.contains(vk::MemoryPropertyFlags::HOST_VISIBLE));

    Ok(Outcome {
        value: Buffer {
            device: Some(Arc::clone(device)),
            buffer,
            memory,
            size,
            memory_type_index,
            host_visible,
        },
        warnings,
    })
}

/// Create a buffer sized to `data` and fill it.
///
/// Upload failures are soft: the buffer is still returned, with an
/// [`Warning::Upload`] in the outcome.
pub fn create_buffer<D: RawDevice>(
    device: &Arc<D>,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    data: &[u8],
    usage: vk::BufferUsageFlags,
) -> Result<Outcome<Buffer<D>>, ResourceCreationError> {
    let mut outcome = allocate_buffer(
        device,
        memory_properties,
        data.len() as vk::DeviceSize,
        usage,
    )?;

    if let Err(e) = outcome.value.upload(data) {
        log::warn!("Buffer upload: {}", e);
        outcome.warnings.push(Warning::Upload(e));
    }

    Ok(outcome)
}

/// Create a buffer and fill it with typed data
pub fn create_buffer_with_data<D: RawDevice, T: Pod>(
    device: &Arc<D>,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    usage: vk::BufferUsageFlags,
    data: &[T],
) -> Result<Outcome<Buffer<D>>, ResourceCreationError> {
    create_buffer(device, memory_properties, bytemuck::cast_slice(data), usage)
}
