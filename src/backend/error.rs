// Error and diagnostic types
//
// Hard failures are `Err`. Soft failures (non-ideal memory type, failed
// upload) ride along with the created resource in an `Outcome` so callers can
// decide whether they matter.

use ash::vk;
use thiserror::Error;

/// A capability query returned something other than `VK_SUCCESS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Failed to enumerate {what}: {status}")]
pub struct EnumerationError {
    pub what: &'static str,
    pub status: vk::Result,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceCreationError {
    #[error("Vulkan error creating buffer: {0}")]
    CreateBuffer(vk::Result),

    #[error("Vulkan error allocating {size} bytes from memory type {type_index}: {status}")]
    AllocateMemory {
        size: vk::DeviceSize,
        type_index: u32,
        status: vk::Result,
    },

    #[error("Vulkan error binding buffer memory: {0}")]
    BindMemory(vk::Result),

    #[error("Shader binary length ({len} bytes) is not a non-zero multiple of 4")]
    InvalidShaderBinary { len: usize },

    #[error("Vulkan error creating shader module: {0}")]
    CreateShaderModule(vk::Result),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("Failed to map device memory for {len} bytes: {status}")]
    Map { len: usize, status: vk::Result },

    #[error("Copied {copied} of {len} bytes (buffer holds {capacity})")]
    ShortCopy {
        copied: usize,
        len: usize,
        capacity: vk::DeviceSize,
    },

    #[error("Memory type {type_index} is not host-visible, nothing was mapped")]
    NotHostVisible { type_index: u32 },

    #[error("Buffer was already released")]
    Released,
}

/// Non-fatal condition raised while creating a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// No memory type had all of `desired`. `fell_back` is true when a
    /// compatible type was still found; false means index `type_index` was
    /// used blindly.
    DegradedAllocation {
        desired: vk::MemoryPropertyFlags,
        type_index: u32,
        fell_back: bool,
    },
    Upload(UploadError),
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::DegradedAllocation {
                desired,
                type_index,
                fell_back: true,
            } => write!(
                f,
                "no memory type with {desired:?}, fell back to compatible type {type_index}"
            ),
            Warning::DegradedAllocation {
                desired,
                type_index,
                fell_back: false,
            } => write!(
                f,
                "no compatible memory type for {desired:?}, using type {type_index}"
            ),
            Warning::Upload(e) => write!(f, "upload failed: {e}"),
        }
    }
}

/// Returned by [`Outcome::into_strict`] when warnings were present.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Resource created with {} warning(s): {}", .0.len(), join(.0))]
pub struct StrictError(pub Vec<Warning>);

fn join(warnings: &[Warning]) -> String {
    warnings
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A created resource plus whatever went sideways while creating it.
#[derive(Debug)]
#[must_use]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Outcome<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Keep the value, ignore the warnings (they were already logged).
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Treat any warning as an error. The value is dropped (and so
    /// released) on the error path.
    pub fn into_strict(self) -> Result<T, StrictError> {
        if self.warnings.is_empty() {
            Ok(self.value)
        } else {
            Err(StrictError(self.warnings))
        }
    }
}
