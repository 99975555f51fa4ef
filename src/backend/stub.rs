// Stub device for tests
//
// Implements every boundary trait against in-memory bookkeeping. Mapped
// memory is real host memory, so uploads can be read back.

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::{c_char, c_void};

use super::raw::{CapabilitySource, DeviceCapabilitySource, RawDevice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    CreateBuffer(u64),
    AllocateMemory(u64),
    BindBufferMemory(u64, u64),
    MapMemory(u64),
    UnmapMemory(u64),
    FreeMemory(u64),
    DestroyBuffer(u64),
    CreateShaderModule(u64),
    DestroyShaderModule(u64),
}

pub struct RecordedBarrier {
    pub cmd: vk::CommandBuffer,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
    pub barriers: Vec<vk::ImageMemoryBarrier>,
}

pub struct AllocationRecord {
    pub size: vk::DeviceSize,
    pub type_index: u32,
    pub bytes: Box<[u8]>,
}

#[derive(Default)]
struct State {
    next_handle: u64,
    calls: Vec<Call>,

    instance_extensions: Vec<vk::ExtensionProperties>,
    device_extensions: Vec<vk::ExtensionProperties>,
    layers: Vec<vk::LayerProperties>,
    enumeration_calls: usize,
    enumeration_failure: Option<(usize, vk::Result)>,
    fill_limit: Option<usize>,

    memory_type_bits: u32,
    alignment: vk::DeviceSize,
    buffers: HashMap<u64, vk::DeviceSize>,
    memory: HashMap<u64, AllocationRecord>,
    modules: HashMap<u64, Vec<u32>>,
    barriers: Vec<RecordedBarrier>,

    fail_create_buffer: Option<vk::Result>,
    fail_allocate: Option<vk::Result>,
    fail_bind: Option<vk::Result>,
    fail_map: Option<vk::Result>,
    fail_create_module: Option<vk::Result>,
}

impl State {
    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

pub struct StubDevice {
    state: Mutex<State>,
}

pub fn encode_name<const N: usize>(name: &str) -> [c_char; N] {
    let mut raw = [0 as c_char; N];
    for (dst, src) in raw.iter_mut().zip(name.bytes()) {
        *dst = src as c_char;
    }
    raw
}

impl StubDevice {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                memory_type_bits: u32::MAX,
                alignment: 1,
                ..Default::default()
            }),
        }
    }

    pub fn set_instance_extensions(&self, names: &[&str]) {
        self.state.lock().instance_extensions = names.iter().map(|n| extension(n)).collect();
    }

    pub fn set_device_extensions(&self, names: &[&str]) {
        self.state.lock().device_extensions = names.iter().map(|n| extension(n)).collect();
    }

    pub fn set_layers(&self, names: &[&str]) {
        self.state.lock().layers = names
            .iter()
            .map(|n| vk::LayerProperties {
                layer_name: encode_name(n),
                ..Default::default()
            })
            .collect();
    }

    /// Fail the `nth` enumeration call (0 = count query, 1 = fill query).
    pub fn fail_enumeration(&self, nth: usize, status: vk::Result) {
        self.state.lock().enumeration_failure = Some((nth, status));
    }

    /// Fill at most `n` entries on the fill query, whatever the count query said.
    pub fn shrink_on_fill(&self, n: usize) {
        self.state.lock().fill_limit = Some(n);
    }

    pub fn set_memory_type_bits(&self, bits: u32) {
        self.state.lock().memory_type_bits = bits;
    }

    /// Round reported buffer sizes up to this alignment.
    pub fn set_alignment(&self, alignment: vk::DeviceSize) {
        self.state.lock().alignment = alignment;
    }

    pub fn fail_create_buffer(&self, status: vk::Result) {
        self.state.lock().fail_create_buffer = Some(status);
    }

    pub fn fail_allocate(&self, status: vk::Result) {
        self.state.lock().fail_allocate = Some(status);
    }

    pub fn fail_bind(&self, status: vk::Result) {
        self.state.lock().fail_bind = Some(status);
    }

    pub fn fail_map(&self, status: vk::Result) {
        self.state.lock().fail_map = Some(status);
    }

    pub fn fail_create_module(&self, status: vk::Result) {
        self.state.lock().fail_create_module = Some(status);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.lock().buffers.len()
    }

    pub fn live_allocations(&self) -> usize {
        self.state.lock().memory.len()
    }

    pub fn live_modules(&self) -> usize {
        self.state.lock().modules.len()
    }

    pub fn memory_contents(&self, memory: vk::DeviceMemory) -> Option<Vec<u8>> {
        self.state
            .lock()
            .memory
            .get(&memory.as_raw())
            .map(|record| record.bytes.to_vec())
    }

    pub fn memory_type_of(&self, memory: vk::DeviceMemory) -> Option<u32> {
        self.state
            .lock()
            .memory
            .get(&memory.as_raw())
            .map(|record| record.type_index)
    }

    pub fn module_words(&self, module: vk::ShaderModule) -> Option<Vec<u32>> {
        self.state.lock().modules.get(&module.as_raw()).cloned()
    }

    pub fn with_barriers<R>(&self, f: impl FnOnce(&[RecordedBarrier]) -> R) -> R {
        f(&self.state.lock().barriers)
    }

    fn enumeration_status(&self) -> vk::Result {
        let mut state = self.state.lock();
        let nth = state.enumeration_calls;
        state.enumeration_calls += 1;
        match state.enumeration_failure {
            Some((fail_at, status)) if fail_at == nth => status,
            _ => vk::Result::SUCCESS,
        }
    }
}

fn extension(name: &str) -> vk::ExtensionProperties {
    vk::ExtensionProperties {
        extension_name: encode_name(name),
        spec_version: 1,
    }
}

fn fill<T: Copy>(source: &[T], limit: Option<usize>, count: &mut u32, out: Option<&mut [T]>) {
    match out {
        None => *count = source.len() as u32,
        Some(out) => {
            let n = source
                .len()
                .min(out.len())
                .min(*count as usize)
                .min(limit.unwrap_or(usize::MAX));
            out[..n].copy_from_slice(&source[..n]);
            *count = n as u32;
        }
    }
}

impl CapabilitySource for StubDevice {
    fn instance_extension_properties(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result {
        let status = self.enumeration_status();
        if status == vk::Result::SUCCESS {
            let state = self.state.lock();
            fill(&state.instance_extensions, state.fill_limit, count, out);
        }
        status
    }

    fn instance_layer_properties(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::LayerProperties]>,
    ) -> vk::Result {
        let status = self.enumeration_status();
        if status == vk::Result::SUCCESS {
            let state = self.state.lock();
            fill(&state.layers, state.fill_limit, count, out);
        }
        status
    }
}

impl DeviceCapabilitySource for StubDevice {
    fn device_extension_properties(
        &self,
        _physical_device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result {
        let status = self.enumeration_status();
        if status == vk::Result::SUCCESS {
            let state = self.state.lock();
            fill(&state.device_extensions, state.fill_limit, count, out);
        }
        status
    }
}

impl RawDevice for StubDevice {
    unsafe fn create_raw_buffer(&self, info: &vk::BufferCreateInfo) -> VkResult<vk::Buffer> {
        let mut state = self.state.lock();
        if let Some(status) = state.fail_create_buffer {
            return Err(status);
        }
        let handle = state.handle();
        state.buffers.insert(handle, info.size);
        state.calls.push(Call::CreateBuffer(handle));
        Ok(vk::Buffer::from_raw(handle))
    }

    unsafe fn raw_buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        let state = self.state.lock();
        let size = state.buffers.get(&buffer.as_raw()).copied().unwrap_or(0);
        let alignment = state.alignment.max(1);
        vk::MemoryRequirements {
            size: size.div_ceil(alignment) * alignment,
            alignment,
            memory_type_bits: state.memory_type_bits,
        }
    }

    unsafe fn allocate_raw_memory(
        &self,
        info: &vk::MemoryAllocateInfo,
    ) -> VkResult<vk::DeviceMemory> {
        let mut state = self.state.lock();
        if let Some(status) = state.fail_allocate {
            return Err(status);
        }
        let handle = state.handle();
        state.memory.insert(
            handle,
            AllocationRecord {
                size: info.allocation_size,
                type_index: info.memory_type_index,
                bytes: vec![0u8; info.allocation_size as usize].into_boxed_slice(),
            },
        );
        state.calls.push(Call::AllocateMemory(handle));
        Ok(vk::DeviceMemory::from_raw(handle))
    }

    unsafe fn bind_raw_buffer_memory(
        &self,
        buffer: vk::Buffer,
        memory: vk::DeviceMemory,
        _offset: vk::DeviceSize,
    ) -> VkResult<()> {
        let mut state = self.state.lock();
        if let Some(status) = state.fail_bind {
            return Err(status);
        }
        state
            .calls
            .push(Call::BindBufferMemory(buffer.as_raw(), memory.as_raw()));
        Ok(())
    }

    unsafe fn map_raw_memory(
        &self,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
    ) -> VkResult<*mut c_void> {
        let mut state = self.state.lock();
        if let Some(status) = state.fail_map {
            return Err(status);
        }
        state.calls.push(Call::MapMemory(memory.as_raw()));
        let record = state
            .memory
            .get_mut(&memory.as_raw())
            .ok_or(vk::Result::ERROR_MEMORY_MAP_FAILED)?;
        if offset + size > record.size {
            return Err(vk::Result::ERROR_MEMORY_MAP_FAILED);
        }
        Ok(record.bytes.as_mut_ptr().add(offset as usize).cast())
    }

    unsafe fn unmap_raw_memory(&self, memory: vk::DeviceMemory) {
        self.state
            .lock()
            .calls
            .push(Call::UnmapMemory(memory.as_raw()));
    }

    unsafe fn free_raw_memory(&self, memory: vk::DeviceMemory) {
        let mut state = self.state.lock();
        state.memory.remove(&memory.as_raw());
        state.calls.push(Call::FreeMemory(memory.as_raw()));
    }

    unsafe fn destroy_raw_buffer(&self, buffer: vk::Buffer) {
        let mut state = self.state.lock();
        state.buffers.remove(&buffer.as_raw());
        state.calls.push(Call::DestroyBuffer(buffer.as_raw()));
    }

    unsafe fn create_raw_shader_module(
        &self,
        info: &vk::ShaderModuleCreateInfo,
    ) -> VkResult<vk::ShaderModule> {
        let mut state = self.state.lock();
        if let Some(status) = state.fail_create_module {
            return Err(status);
        }
        let words = std::slice::from_raw_parts(info.p_code, info.code_size / 4).to_vec();
        let handle = state.handle();
        state.modules.insert(handle, words);
        state.calls.push(Call::CreateShaderModule(handle));
        Ok(vk::ShaderModule::from_raw(handle))
    }

    unsafe fn destroy_raw_shader_module(&self, module: vk::ShaderModule) {
        let mut state = self.state.lock();
        state.modules.remove(&module.as_raw());
        state.calls.push(Call::DestroyShaderModule(module.as_raw()));
    }

    unsafe fn cmd_image_barriers(
        &self,
        cmd: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barriers: &[vk::ImageMemoryBarrier],
    ) {
        self.state.lock().barriers.push(RecordedBarrier {
            cmd,
            src_stage,
            dst_stage,
            barriers: barriers.to_vec(),
        });
    }
}
