//! Error type shared by every stage of the render pipeline.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Device call that returned a non-success status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiOp {
    CreateContext,
    CreateQueue,
    CreateProgram,
    CreateBuffer,
    WriteBuffer,
    SetKernelArg,
    EnqueueKernel,
    ReadBuffer,
    Finish,
}

impl fmt::Display for ApiOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiOp::CreateContext => "creating the context",
            ApiOp::CreateQueue => "creating the command queue",
            ApiOp::CreateProgram => "creating the program",
            ApiOp::CreateBuffer => "creating a buffer",
            ApiOp::WriteBuffer => "writing a buffer",
            ApiOp::SetKernelArg => "setting a kernel argument",
            ApiOp::EnqueueKernel => "enqueueing the kernel",
            ApiOp::ReadBuffer => "reading a buffer",
            ApiOp::Finish => "finishing the queue",
        };
        f.write_str(name)
    }
}

/// Everything that can stop a render. All variants are fatal.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to read the kernel source {}: {source}", .path.display())]
    KernelSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Kernel source {} exceeds the {limit} byte limit", .path.display())]
    KernelSourceTooLarge { path: PathBuf, limit: usize },

    #[error("Kernel source {} is not valid UTF-8", .path.display())]
    SourceEncoding { path: PathBuf },

    #[error("Error in get platform id: {0}")]
    Platform(i32),

    #[error("No platform found")]
    NoPlatform,

    #[error("Error in get device id: {0}")]
    Device(i32),

    #[error("No device found")]
    NoDevice,

    #[error("Error while {op}: {code}")]
    Api { op: ApiOp, code: i32 },

    #[error("Error while building the program: {code}\nBuild log:\n{log}")]
    Build { code: i32, log: String },

    #[error("Kernel entry point '{name}' not found: {code}")]
    EntryPoint { name: String, code: i32 },

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Channel buffer holds {actual} elements, expected {expected}")]
    BufferLength { expected: usize, actual: usize },
}

impl RenderError {
    pub(crate) fn api(op: ApiOp, code: i32) -> Self {
        RenderError::Api { op, code }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
