//! The single-shot dispatch pipeline: build, upload, bind, dispatch, read back.

use crate::backend::ComputeBackend;
use crate::contract::{Channel, DispatchContract};
use crate::error::Result;
use crate::image::ChannelPlanes;
use crate::source::KernelSource;

/// Kernel and channel buffers for one dispatch.
///
/// The kernel (and its program) is released before the buffers, and the
/// buffers in red, green, blue order, however far allocation got.
struct DispatchResources<B: ComputeBackend> {
    kernel: B::Kernel,
    buffers: Vec<B::Buffer>,
}

impl<B: ComputeBackend> DispatchResources<B> {
    /// Takes ownership of `kernel` and allocates one buffer per channel.
    fn allocate(backend: &B, kernel: B::Kernel, len: usize) -> Result<Self> {
        let mut resources = Self {
            kernel,
            buffers: Vec::with_capacity(Channel::ALL.len()),
        };
        for _ in Channel::ALL {
            resources.buffers.push(backend.create_buffer(len)?);
        }
        Ok(resources)
    }

    fn buffer(&self, channel: Channel) -> &B::Buffer {
        &self.buffers[channel.slot() as usize]
    }

    fn buffer_mut(&mut self, channel: Channel) -> &mut B::Buffer {
        &mut self.buffers[channel.slot() as usize]
    }
}

impl<B: ComputeBackend> Drop for DispatchResources<B> {
    fn drop(&mut self) {
        log::debug!("Releasing kernel and {} channel buffers", self.buffers.len());
    }
}

fn plane_mut(planes: &mut ChannelPlanes, channel: Channel) -> &mut [f32] {
    match channel {
        Channel::Red => &mut planes.red,
        Channel::Green => &mut planes.green,
        Channel::Blue => &mut planes.blue,
    }
}

/// Runs the kernel named by `contract` over its grid and returns the three
/// channel planes as written by the kernel.
pub fn render<B: ComputeBackend>(
    backend: B,
    source: &KernelSource,
    contract: &DispatchContract,
) -> Result<ChannelPlanes> {
    log::info!(
        "Building '{}' from {} ({} bytes) on {}",
        contract.entry_point(),
        source.path().display(),
        source.len(),
        backend.device_name()
    );
    let kernel = backend.build_kernel(source, contract.entry_point())?;

    let len = contract.pixel_count();
    log::debug!("Allocating 3 channel buffers of {} floats", len);
    let mut resources = DispatchResources::allocate(&backend, kernel, len)?;

    // Host mirrors start zeroed; the kernel overwrites every element.
    let mut planes = ChannelPlanes::zeroed(len);
    for channel in Channel::ALL {
        let host = plane_mut(&mut planes, channel);
        backend.write_buffer(resources.buffer_mut(channel), host)?;
    }

    for channel in Channel::ALL {
        log::trace!("Binding {:?} buffer to argument {}", channel, channel.slot());
        let buffer = &resources.buffers[channel.slot() as usize];
        backend.set_arg(&mut resources.kernel, channel.slot(), buffer)?;
    }

    let global = contract.global_work_size();
    log::info!("Dispatching {} x {} work items", global[0], global[1]);
    backend.enqueue_2d(&resources.kernel, global)?;

    for channel in Channel::ALL {
        backend.read_buffer(resources.buffer(channel), plane_mut(&mut planes, channel))?;
    }
    backend.finish()?;

    log::debug!("Readback complete, releasing kernel and buffers");
    drop(resources);
    Ok(planes)
}
