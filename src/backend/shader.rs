// Shader module loading
//
// Vulkan uses SPIR-V bytecode for shaders: a stream of 32-bit words. The
// byte slice is viewed as words in place when it is 4-byte aligned and copied
// once otherwise. Lengths that are not a whole number of words are rejected.

use ash::vk;
use std::borrow::Cow;
use std::sync::Arc;

use super::error::ResourceCreationError;
use super::raw::RawDevice;
use super::VulkanDevice;

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Owned shader module, destroyed on drop unless released with
/// [`ShaderModule::into_raw`].
pub struct ShaderModule<D: RawDevice = VulkanDevice> {
    device: Arc<D>,
    handle: vk::ShaderModule,
}

impl<D: RawDevice> std::fmt::Debug for ShaderModule<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderModule")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl<D: RawDevice> ShaderModule<D> {
    pub fn raw(&self) -> vk::ShaderModule {
        self.handle
    }

    /// Give up ownership; the caller destroys the handle.
    pub fn into_raw(self) -> vk::ShaderModule {
        let this = std::mem::ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the Arc is moved out exactly once.
        drop(unsafe { std::ptr::read(&this.device) });
        this.handle
    }
}

impl<D: RawDevice> Drop for ShaderModule<D> {
    fn drop(&mut self) {
        log::debug!("Destroying shader module {:?}", self.handle);
        // SAFETY: handle was created from device and is owned by this wrapper.
        // Pipelines built from it must already be gone or no longer need it.
        unsafe { self.device.destroy_raw_shader_module(self.handle) };
    }
}

/// View `code` as SPIR-V words, borrowing when aligned.
fn spirv_words(code: &[u8]) -> Result<Cow<'_, [u32]>, ResourceCreationError> {
    if code.is_empty() || code.len() % 4 != 0 {
        return Err(ResourceCreationError::InvalidShaderBinary { len: code.len() });
    }

    Ok(match bytemuck::try_cast_slice::<u8, u32>(code) {
        Ok(words) => Cow::Borrowed(words),
        Err(_) => Cow::Owned(
            code.chunks_exact(4)
                .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
    })
}

/// Load SPIR-V shader from bytes and create a shader module
pub fn load_shader_module<D: RawDevice>(
    device: &Arc<D>,
    code: &[u8],
) -> Result<ShaderModule<D>, ResourceCreationError> {
    let words = spirv_words(code)?;
    if words[0] != SPIRV_MAGIC {
        log::warn!(
            "Shader binary does not start with the SPIR-V magic number (got {:#010x})",
            words[0]
        );
    }

    let create_info = vk::ShaderModuleCreateInfo::builder().code(&words);
    debug_assert_eq!(create_info.code_size, code.len());

    // SAFETY: create_info points at `words`, which outlives the call.
    let handle = unsafe { device.create_raw_shader_module(&create_info) }
        .map_err(ResourceCreationError::CreateShaderModule)?;

    log::debug!("Created shader module {:?} ({} words)", handle, words.len());
    Ok(ShaderModule {
        device: Arc::clone(device),
        handle,
    })
}
