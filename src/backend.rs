use crate::error::Result;
use crate::source::KernelSource;

/// Minimal compute device abstraction the render pipeline is written against
/// (OpenCL device, host emulator).
///
/// Buffers and kernels are owned by the caller; dropping them releases the
/// device objects, so release order follows Rust drop order.
pub trait ComputeBackend {
    type Buffer;
    type Kernel;

    fn device_name(&self) -> &str;

    /// Compiles `source` with no options and resolves `entry_point`.
    fn build_kernel(&self, source: &KernelSource, entry_point: &str) -> Result<Self::Kernel>;

    /// Allocates a read-write buffer of `len` floats.
    fn create_buffer(&self, len: usize) -> Result<Self::Buffer>;

    /// Blocking host to device copy.
    fn write_buffer(&self, buffer: &mut Self::Buffer, src: &[f32]) -> Result<()>;

    fn set_arg(&self, kernel: &mut Self::Kernel, slot: u32, buffer: &Self::Buffer) -> Result<()>;

    /// Enqueues one 2-D range with the default local size.
    fn enqueue_2d(&self, kernel: &Self::Kernel, global_work_size: [usize; 2]) -> Result<()>;

    /// Blocking device to host copy.
    fn read_buffer(&self, buffer: &Self::Buffer, dst: &mut [f32]) -> Result<()>;

    /// Waits for every queued command to complete.
    fn finish(&self) -> Result<()>;
}

impl<T> ComputeBackend for &T
where
    T: ComputeBackend + ?Sized,
{
    type Buffer = T::Buffer;
    type Kernel = T::Kernel;

    fn device_name(&self) -> &str {
        (**self).device_name()
    }

    fn build_kernel(&self, source: &KernelSource, entry_point: &str) -> Result<Self::Kernel> {
        (**self).build_kernel(source, entry_point)
    }

    fn create_buffer(&self, len: usize) -> Result<Self::Buffer> {
        (**self).create_buffer(len)
    }

    fn write_buffer(&self, buffer: &mut Self::Buffer, src: &[f32]) -> Result<()> {
        (**self).write_buffer(buffer, src)
    }

    fn set_arg(&self, kernel: &mut Self::Kernel, slot: u32, buffer: &Self::Buffer) -> Result<()> {
        (**self).set_arg(kernel, slot, buffer)
    }

    fn enqueue_2d(&self, kernel: &Self::Kernel, global_work_size: [usize; 2]) -> Result<()> {
        (**self).enqueue_2d(kernel, global_work_size)
    }

    fn read_buffer(&self, buffer: &Self::Buffer, dst: &mut [f32]) -> Result<()> {
        (**self).read_buffer(buffer, dst)
    }

    fn finish(&self) -> Result<()> {
        (**self).finish()
    }
}
