// =============================================================================
// VKPROBE - Exercise the resource layer against the local GPU
// =============================================================================
//
// FLOW:
// 1. Load config.toml, initialize logging
// 2. List instance extensions / layers / device extensions
// 3. Create a headless device
// 4. Upload a triangle and a staging buffer
// 5. Load each configured SPIR-V file as a shader module
// 6. Release everything before the device goes away
//
// =============================================================================

use anyhow::{Context, Result};
use ash::vk;
use glam::Vec3;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;
use vk_resources::backend::{
    self, buffer::create_buffer_with_data, Buffer, Outcome, ShaderModule, VulkanDevice,
};
use vk_resources::config::Config;

fn main() -> Result<()> {
    // Load configuration from config.toml
    let config = Config::load();

    // Initialize logging
    init_logging(&config);
    log::info!("Starting {}", config.app.name);

    let enable_validation = cfg!(debug_assertions) && config.debug.validation_layers;
    let device = VulkanDevice::new(&config.app.name, enable_validation)?;

    if config.probe.list_capabilities {
        list_capabilities(&device)?;
    }

    // Every resource is released before `device`
    let buffers = upload_buffers(&device, &config)?;
    let modules = load_shaders(&device, &config)?;

    log::info!(
        "Probe finished: {} buffer(s), {} shader module(s)",
        buffers.len(),
        modules.len()
    );

    drop(modules);
    for buffer in buffers {
        buffer.destroy();
    }
    Ok(())
}

/// Initialize logging with optional log file header
fn init_logging(config: &Config) {
    use env_logger::Builder;

    let mut builder = Builder::new();
    builder.filter_level(config.log_level());
    // RUST_LOG wins over the config file
    builder.parse_default_env();
    builder.init();

    // Create/clear log file if enabled
    if config.debug.log_to_file {
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&config.debug.log_file)
        {
            let _ = writeln!(file, "=== {} Log ===", config.app.name);
            let _ = writeln!(file, "Started: {:?}", std::time::SystemTime::now());
            let _ = writeln!(file);
        }
    }
}

fn list_capabilities(device: &VulkanDevice) -> Result<()> {
    let layers = backend::validation_layers(device.entry())?;
    log::info!("Instance layers ({}):", layers.len());
    for name in &layers {
        log::info!("  {}", name);
    }

    let extensions = backend::instance_extensions(device.entry())?;
    log::info!("Instance extensions ({}):", extensions.len());
    for name in &extensions {
        log::info!("  {}", name);
    }

    let extensions = backend::device_extensions(&device.instance, device.physical_device)?;
    log::info!("Device extensions ({}):", extensions.len());
    for name in &extensions {
        log::debug!("  {}", name);
    }
    Ok(())
}

/// Honor `strict_uploads`: either surface warnings as errors or keep going.
fn accept<T>(outcome: Outcome<T>, strict: bool) -> Result<T> {
    if strict {
        Ok(outcome.into_strict()?)
    } else {
        Ok(outcome.into_inner())
    }
}

fn upload_buffers(device: &Arc<VulkanDevice>, config: &Config) -> Result<Vec<Buffer>> {
    let strict = config.probe.strict_uploads;
    let props = &device.memory_properties;

    let triangle = [
        Vec3::new(0.0, -0.5, 0.0),
        Vec3::new(0.5, 0.5, 0.0),
        Vec3::new(-0.5, 0.5, 0.0),
    ];
    let vertices =
        create_buffer_with_data(device, props, vk::BufferUsageFlags::VERTEX_BUFFER, &triangle)
            .context("Failed to create vertex buffer")?;
    let vertices = accept(vertices, strict).context("Vertex buffer upload degraded")?;
    log::info!(
        "Vertex buffer: {} bytes in memory type {}",
        vertices.size(),
        vertices.memory_type_index()
    );

    let mut buffers = vec![vertices];

    if config.probe.upload_bytes > 0 {
        let staging_data = vec![0u8; config.probe.upload_bytes];
        let staging = backend::create_buffer(
            device,
            props,
            &staging_data,
            vk::BufferUsageFlags::TRANSFER_SRC,
        )
        .context("Failed to create staging buffer")?;
        let staging = accept(staging, strict).context("Staging buffer upload degraded")?;
        log::info!(
            "Staging buffer: {} bytes in memory type {}",
            staging.size(),
            staging.memory_type_index()
        );
        buffers.push(staging);
    }

    Ok(buffers)
}

fn load_shaders(device: &Arc<VulkanDevice>, config: &Config) -> Result<Vec<ShaderModule>> {
    config
        .probe
        .shaders
        .iter()
        .map(|path| {
            let code = std::fs::read(path)
                .with_context(|| format!("Failed to read shader {:?}", path))?;
            let module = backend::load_shader_module(device, &code)
                .with_context(|| format!("Failed to load shader {:?}", path))?;
            log::info!("Loaded {:?} ({} bytes)", path, code.len());
            Ok(module)
        })
        .collect()
}
