// Image layout transitions
//
// Builds a single image memory barrier and records it. Covers one mip level
// and one array layer only; anything bigger needs its own descriptor.

use ash::vk;

use super::raw::RawDevice;

/// Access, stage and layout of an image on one side of a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessState {
    pub access: vk::AccessFlags,
    pub stage: vk::PipelineStageFlags,
    pub layout: vk::ImageLayout,
}

impl AccessState {
    pub const fn new(
        access: vk::AccessFlags,
        stage: vk::PipelineStageFlags,
        layout: vk::ImageLayout,
    ) -> Self {
        Self {
            access,
            stage,
            layout,
        }
    }

    /// Contents don't matter: nothing to wait on, layout UNDEFINED.
    pub const UNDEFINED: Self = Self::new(
        vk::AccessFlags::empty(),
        vk::PipelineStageFlags::TOP_OF_PIPE,
        vk::ImageLayout::UNDEFINED,
    );

    pub const TRANSFER_DST: Self = Self::new(
        vk::AccessFlags::TRANSFER_WRITE,
        vk::PipelineStageFlags::TRANSFER,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    );

    pub const PRESENT: Self = Self::new(
        vk::AccessFlags::empty(),
        vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        vk::ImageLayout::PRESENT_SRC_KHR,
    );
}

/// One image going from `src` to `dst`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTransition {
    pub image: vk::Image,
    pub src: AccessState,
    pub dst: AccessState,
    pub aspect: vk::ImageAspectFlags,
}

impl ImageTransition {
    pub fn color(image: vk::Image, src: AccessState, dst: AccessState) -> Self {
        Self {
            image,
            src,
            dst,
            aspect: vk::ImageAspectFlags::COLOR,
        }
    }

    pub fn to_vk(&self) -> vk::ImageMemoryBarrier {
        vk::ImageMemoryBarrier::builder()
            .src_access_mask(self.src.access)
            .dst_access_mask(self.dst.access)
            .old_layout(self.src.layout)
            .new_layout(self.dst.layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: self.aspect,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            })
            .build()
    }

    /// Record the barrier into `cmd`. Errors surface at submission, not here.
    pub fn record<D: RawDevice + ?Sized>(&self, device: &D, cmd: vk::CommandBuffer) {
        let barrier = self.to_vk();
        // SAFETY: cmd is in the recording state (caller contract) and the
        // barrier borrows nothing.
        unsafe {
            device.cmd_image_barriers(cmd, self.src.stage, self.dst.stage, &[barrier]);
        }
    }
}

/// Flat form of [`ImageTransition::record`].
#[allow(clippy::too_many_arguments)]
pub fn image_memory_barrier<D: RawDevice + ?Sized>(
    device: &D,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    src_access: vk::AccessFlags,
    dst_access: vk::AccessFlags,
    src_stage: vk::PipelineStageFlags,
    dst_stage: vk::PipelineStageFlags,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
    aspect: vk::ImageAspectFlags,
) {
    ImageTransition {
        image,
        src: AccessState::new(src_access, src_stage, old_layout),
        dst: AccessState::new(dst_access, dst_stage, new_layout),
        aspect,
    }
    .record(device, cmd);
}
