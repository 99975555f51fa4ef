// Memory type resolution
//
// Picks an index into the device's memory type table for a resource. Strict
// first match in ascending index order; lower indices win ties.

use ash::vk;

/// Find the lowest memory type index that is allowed by `compatible` (bit i
/// set means type i may back the resource) and whose property flags are a
/// superset of `desired`.
pub fn find_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    compatible: u32,
    desired: vk::MemoryPropertyFlags,
) -> Option<u32> {
    let count = (props.memory_type_count as usize).min(vk::MAX_MEMORY_TYPES);

    props.memory_types[..count]
        .iter()
        .enumerate()
        .find(|(i, ty)| compatible & (1 << i) != 0 && ty.property_flags.contains(desired))
        .map(|(i, _)| i as u32)
}

/// Like [`find_memory_type`], but if nothing has the desired properties,
/// accept any compatible type.
///
/// A type found this way may lack properties the caller asked for (e.g.
/// HOST_COHERENT), so writes may need explicit flushes.
pub fn find_memory_type_fallback(
    props: &vk::PhysicalDeviceMemoryProperties,
    compatible: u32,
    desired: vk::MemoryPropertyFlags,
) -> Option<u32> {
    MemoryTypeRequirement::new(compatible, desired)
        .resolve(props)
        .map(|choice| choice.index)
}

/// What a resource can live in, and what the caller would like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryTypeRequirement {
    /// Bitmask from `vk::MemoryRequirements::memory_type_bits`.
    pub compatible: u32,
    pub desired: vk::MemoryPropertyFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryTypeChoice {
    pub index: u32,
    /// True if `desired` could not be honored and any compatible type was taken.
    pub fell_back: bool,
}

impl MemoryTypeRequirement {
    pub fn new(compatible: u32, desired: vk::MemoryPropertyFlags) -> Self {
        Self {
            compatible,
            desired,
        }
    }

    pub fn from_requirements(
        reqs: &vk::MemoryRequirements,
        desired: vk::MemoryPropertyFlags,
    ) -> Self {
        Self::new(reqs.memory_type_bits, desired)
    }

    /// Exact match only.
    pub fn exact(&self, props: &vk::PhysicalDeviceMemoryProperties) -> Option<u32> {
        find_memory_type(props, self.compatible, self.desired)
    }

    /// Exact match, else (for a non-empty request) any compatible type.
    pub fn resolve(&self, props: &vk::PhysicalDeviceMemoryProperties) -> Option<MemoryTypeChoice> {
        if let Some(index) = self.exact(props) {
            return Some(MemoryTypeChoice {
                index,
                fell_back: false,
            });
        }

        if self.desired.is_empty() {
            return None;
        }

        find_memory_type(props, self.compatible, vk::MemoryPropertyFlags::empty()).map(|index| {
            MemoryTypeChoice {
                index,
                fell_back: true,
            }
        })
    }
}

#[cfg(test)]
pub(crate) fn memory_properties(
    types: &[vk::MemoryPropertyFlags],
) -> vk::PhysicalDeviceMemoryProperties {
    let mut props = vk::PhysicalDeviceMemoryProperties {
        memory_type_count: types.len() as u32,
        memory_heap_count: 1,
        ..Default::default()
    };
    for (slot, flags) in props.memory_types.iter_mut().zip(types) {
        slot.property_flags = *flags;
        slot.heap_index = 0;
    }
    props
}
