// Capability queries
//
// Instance extensions, device extensions and validation layers, fetched with
// Vulkan's count-then-fill enumeration and decoded into owned strings.

use ash::vk;
use std::ffi::{c_char, CStr};

use super::error::EnumerationError;
use super::raw::{CapabilitySource, DeviceCapabilitySource};

/// Extensions the platform's Vulkan loader exposes.
pub fn instance_extensions(
    entry: &impl CapabilitySource,
) -> Result<Vec<String>, EnumerationError> {
    let list = enumerate("instance extensions", |count, out| {
        entry.instance_extension_properties(count, out)
    })?;
    Ok(list.iter().map(|ext| decode_name(&ext.extension_name)).collect())
}

/// Extensions supported by one physical device.
pub fn device_extensions(
    instance: &impl DeviceCapabilitySource,
    physical_device: vk::PhysicalDevice,
) -> Result<Vec<String>, EnumerationError> {
    let list = enumerate("device extensions", |count, out| {
        instance.device_extension_properties(physical_device, count, out)
    })?;
    Ok(list.iter().map(|ext| decode_name(&ext.extension_name)).collect())
}

/// Layers (validation and otherwise) installed on the platform.
pub fn validation_layers(
    entry: &impl CapabilitySource,
) -> Result<Vec<String>, EnumerationError> {
    let list = enumerate("instance layers", |count, out| {
        entry.instance_layer_properties(count, out)
    })?;
    Ok(list.iter().map(|layer| decode_name(&layer.layer_name)).collect())
}

/// Names in `required` that do not appear in `available`.
pub fn missing(available: &[String], required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|name| !available.iter().any(|a| a == *name))
        .map(|name| name.to_string())
        .collect()
}

/// Count query with a null destination, then a fill query into a vector of
/// that length. No retry: anything but SUCCESS (INCOMPLETE included) fails.
fn enumerate<T, F>(what: &'static str, mut query: F) -> Result<Vec<T>, EnumerationError>
where
    T: Default + Clone,
    F: FnMut(&mut u32, Option<&mut [T]>) -> vk::Result,
{
    let mut count = 0u32;
    let status = query(&mut count, None);
    if status != vk::Result::SUCCESS {
        return Err(EnumerationError { what, status });
    }

    let mut list = vec![T::default(); count as usize];
    let status = query(&mut count, Some(&mut list));
    if status != vk::Result::SUCCESS {
        return Err(EnumerationError { what, status });
    }
    list.truncate(count as usize);

    log::debug!("Enumerated {} {}", list.len(), what);
    Ok(list)
}

/// Fixed-width, NUL-terminated name to `String`.
fn decode_name(raw: &[c_char]) -> String {
    let bytes: &[u8] = bytemuck::cast_slice(raw);
    match CStr::from_bytes_until_nul(bytes) {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}
