//! Error types for glowblob.
//!
//! The simulation core never fails; errors only come from the edges:
//! loading configuration, parsing backend messages, and (with the `viewer`
//! feature) bringing up a GPU surface.

use thiserror::Error;

/// Errors that can occur while loading or validating a [`BlobConfig`](crate::BlobConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or does not match the config schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed fine but breaks an invariant of the simulation.
    #[error("Invalid config value `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while decoding backend transcript or status messages.
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// The payload is not JSON of the expected shape.
    #[error("Malformed backend message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during GPU initialization in the reference viewer.
#[cfg(feature = "viewer")]
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("Failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    /// No compatible GPU adapter found.
    #[error("No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support.")]
    NoAdapter,

    /// Failed to create GPU device.
    #[error("Failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),

    /// Failed to create the event loop.
    #[error("Failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// Failed to create the window.
    #[error("Failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
}
