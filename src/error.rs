use thiserror::Error;

/// Failures surfaced by the simulation core.
///
/// There is no retryable class here: every variant is either a permanent
/// resource failure or a violated invariant.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("could not reserve {requested_bytes} bytes for {label}")]
    Allocation { label: String, requested_bytes: u64 },

    #[error("dispatch of {groups} groups x {group_width} lanes cannot cover {lanes} lanes")]
    DispatchUnderCount { groups: u32, group_width: u32, lanes: u32 },

    #[error("sorting {element_count} elements needs {required} slots per region, buffer holds {capacity}")]
    CapacityTooSmall { element_count: u32, required: u32, capacity: u32 },

    #[error("cloud {cloud} owns particles {start}..{end}: {reason}")]
    CloudRange { cloud: u32, start: u32, end: u32, reason: &'static str },

    #[error("invalid scene configuration: {0}")]
    Config(String),

    #[error("device error: {0}")]
    Device(String),

    #[error("buffer readback failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("frame loop halted after a previous failure")]
    Halted,
}

impl From<wgpu::RequestAdapterError> for EngineError {
    fn from(err: wgpu::RequestAdapterError) -> Self {
        EngineError::Device(err.to_string())
    }
}

impl From<wgpu::RequestDeviceError> for EngineError {
    fn from(err: wgpu::RequestDeviceError) -> Self {
        EngineError::Device(err.to_string())
    }
}

impl From<wgpu::PollError> for EngineError {
    fn from(err: wgpu::PollError) -> Self {
        EngineError::Device(err.to_string())
    }
}
