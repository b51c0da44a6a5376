use super::device::{ResolvedDevice, resolve_device};
use crate::backend::ComputeBackend;
use crate::error::{ApiOp, RenderError, Result};
use crate::source::KernelSource;

use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::Device;
use opencl3::kernel::Kernel;
use opencl3::memory::{Buffer, CL_MEM_READ_WRITE, ClMem};
use opencl3::program::Program;
use opencl3::types::{CL_BLOCKING, cl_float};
use std::ptr;

/// Longest build log surfaced on a failed build (4 KiB).
pub const BUILD_LOG_LIMIT: usize = 4096;

/// Cuts `log` to at most `limit` bytes without splitting a character.
fn truncate_log(mut log: String, limit: usize) -> String {
    if log.len() > limit {
        let mut end = limit;
        while !log.is_char_boundary(end) {
            end -= 1;
        }
        log.truncate(end);
    }
    log
}

/// A built program and the entry point taken from it.
///
/// Fields drop kernel first, then program.
pub struct CompiledKernel {
    kernel: Kernel,
    _program: Program,
}

impl Drop for CompiledKernel {
    fn drop(&mut self) {
        log::debug!("Releasing kernel and program");
    }
}

/// Context and in-order command queue bound to a single OpenCL device.
///
/// Dropping it releases the queue, then the context.
pub struct OpenClBackend {
    queue: CommandQueue,
    context: Context,
    device: Device,
    device_name: String,
}

impl OpenClBackend {
    /// Resolves the first device of the first platform and builds a context
    /// and a queue with no properties on it.
    pub fn new() -> Result<Self> {
        let ResolvedDevice {
            device,
            platform_name,
            device_name,
        } = resolve_device()?;

        let context = Context::from_device(&device)
            .map_err(|e| RenderError::api(ApiOp::CreateContext, e.0))?;

        // create_default is the OpenCL 1.2 entry point; properties 0 keeps the
        // queue in-order with profiling off.
        #[allow(deprecated)]
        let queue = CommandQueue::create_default(&context, 0)
            .map_err(|e| RenderError::api(ApiOp::CreateQueue, e.0))?;

        log::debug!("Created context and queue for '{}' ({})", device_name, platform_name);
        Ok(Self {
            queue,
            context,
            device,
            device_name,
        })
    }

    fn fetch_build_log(&self, program: &Program) -> String {
        let log = program
            .get_build_log(self.device.id())
            .unwrap_or_else(|e| format!("<build log unavailable: {}>", e));
        truncate_log(log, BUILD_LOG_LIMIT)
    }
}

impl Drop for OpenClBackend {
    fn drop(&mut self) {
        log::debug!("Releasing command queue and context");
    }
}

impl ComputeBackend for OpenClBackend {
    type Buffer = Buffer<cl_float>;
    type Kernel = CompiledKernel;

    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn build_kernel(&self, source: &KernelSource, entry_point: &str) -> Result<CompiledKernel> {
        let text = source.text()?;
        let mut program = Program::create_from_source(&self.context, text)
            .map_err(|e| RenderError::api(ApiOp::CreateProgram, e.0))?;

        if let Err(e) = program.build(&[self.device.id()], "") {
            let log = self.fetch_build_log(&program);
            log::error!("Build log for {}:\n{}", source.path().display(), log);
            return Err(RenderError::Build { code: e.0, log });
        }

        let kernel = Kernel::create(&program, entry_point).map_err(|e| RenderError::EntryPoint {
            name: entry_point.to_string(),
            code: e.0,
        })?;
        log::debug!("Built program, entry point '{}'", entry_point);
        Ok(CompiledKernel {
            kernel,
            _program: program,
        })
    }

    fn create_buffer(&self, len: usize) -> Result<Buffer<cl_float>> {
        let buffer = unsafe {
            Buffer::<cl_float>::create(&self.context, CL_MEM_READ_WRITE, len, ptr::null_mut())
        };
        buffer.map_err(|e| RenderError::api(ApiOp::CreateBuffer, e.0))
    }

    fn write_buffer(&self, buffer: &mut Buffer<cl_float>, src: &[f32]) -> Result<()> {
        let _event = unsafe {
            self.queue
                .enqueue_write_buffer(buffer, CL_BLOCKING, 0, src, &[])
                .map_err(|e| RenderError::api(ApiOp::WriteBuffer, e.0))?
        };
        Ok(())
    }

    fn set_arg(&self, kernel: &mut CompiledKernel, slot: u32, buffer: &Buffer<cl_float>) -> Result<()> {
        let status = unsafe { kernel.kernel.set_arg(slot, &buffer.get()) };
        status.map_err(|e| RenderError::api(ApiOp::SetKernelArg, e.0))
    }

    fn enqueue_2d(&self, kernel: &CompiledKernel, global_work_size: [usize; 2]) -> Result<()> {
        // No offset and no local size: the runtime picks the work-group shape.
        let _event = unsafe {
            self.queue
                .enqueue_nd_range_kernel(
                    kernel.kernel.get(),
                    2,
                    ptr::null(),
                    global_work_size.as_ptr(),
                    ptr::null(),
                    &[],
                )
                .map_err(|e| RenderError::api(ApiOp::EnqueueKernel, e.0))?
        };
        Ok(())
    }

    fn read_buffer(&self, buffer: &Buffer<cl_float>, dst: &mut [f32]) -> Result<()> {
        let _event = unsafe {
            self.queue
                .enqueue_read_buffer(buffer, CL_BLOCKING, 0, dst, &[])
                .map_err(|e| RenderError::api(ApiOp::ReadBuffer, e.0))?
        };
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        self.queue
            .finish()
            .map_err(|e| RenderError::api(ApiOp::Finish, e.0))
    }
}
