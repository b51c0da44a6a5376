//! OpenCL module for running the render kernel on a real device
//!
//! This module handles interaction with the GPU via OpenCL,
//! including platform/device selection, program builds, buffers and dispatch.

mod device;
mod engine;

pub use device::{ResolvedDevice, resolve_device, select_first};
pub use engine::{BUILD_LOG_LIMIT, CompiledKernel, OpenClBackend};
