//! OpenCL ray-tracing host driver.
//!
//! Loads a kernel source file, runs its entry point once over a
//! `height x width` grid with one float buffer per colour channel, and turns
//! the result into a gamma-corrected PPM image.

pub mod backend;
pub mod contract;
pub mod error;
#[doc(hidden)]
pub mod host;
pub mod image;
pub mod opencl;
pub mod pipeline;
pub mod source;

pub use backend::ComputeBackend;
pub use contract::{Channel, DispatchContract};
pub use error::{ApiOp, RenderError, Result};
pub use image::{ChannelPlanes, PpmImage, tone_map};
pub use source::KernelSource;

use std::path::PathBuf;

/// Everything one render needs to know.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Kernel source file
    pub kernel_path: PathBuf,
    /// Largest accepted kernel source, in bytes
    pub max_source_len: usize,
    /// Entry point resolved from the built program
    pub entry_point: String,
    pub width: usize,
    pub height: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            kernel_path: PathBuf::from(source::DEFAULT_KERNEL_PATH),
            max_source_len: source::MAX_SOURCE_SIZE,
            entry_point: contract::DEFAULT_ENTRY_POINT.to_string(),
            width: contract::DEFAULT_WIDTH,
            height: contract::DEFAULT_HEIGHT,
        }
    }
}

impl RenderConfig {
    pub fn contract(&self) -> Result<DispatchContract> {
        DispatchContract::new(self.width, self.height, self.entry_point.clone())
    }
}

/// Loads the kernel, opens a device with `connect`, renders and encodes.
///
/// Stages run strictly in order and the first failure ends the run; the
/// device is only touched once the kernel source is in memory.
pub fn render_image<B, F>(config: &RenderConfig, connect: F) -> Result<PpmImage>
where
    B: ComputeBackend,
    F: FnOnce() -> Result<B>,
{
    let contract = config.contract()?;
    let source = KernelSource::load(&config.kernel_path, config.max_source_len)?;
    let backend = connect()?;
    let planes = pipeline::render(&backend, &source, &contract)?;
    PpmImage::from_planes(&planes, &contract)
}
