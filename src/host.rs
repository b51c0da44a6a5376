//! In-process compute backend.
//!
//! Kernels are Rust closures registered by entry-point name and executed on
//! the calling thread over the full global range. Every device operation,
//! including releases, is appended to a shared [`OpLog`], and any device call
//! can be made to fail with a chosen status code. This lets the pipeline be
//! exercised end to end without an OpenCL runtime.

use crate::backend::ComputeBackend;
use crate::error::{ApiOp, RenderError, Result};
use crate::source::KernelSource;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

const CL_INVALID_VALUE: i32 = -30;
const CL_INVALID_KERNEL_NAME: i32 = -46;
const CL_INVALID_ARG_INDEX: i32 = -49;
const CL_INVALID_KERNEL_ARGS: i32 = -52;
const CL_BUILD_PROGRAM_FAILURE: i32 = -11;

/// Number of buffer arguments every host kernel takes.
const KERNEL_ARITY: usize = 3;

/// Position of one work item in the 2-D range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem {
    pub global_id: [usize; 2],
    pub global_size: [usize; 2],
}

/// Host kernel body: called once per work item with the bound buffers in
/// argument order.
pub type HostKernelFn = dyn Fn(WorkItem, &mut [Vec<f32>]);

/// A device operation as observed by the host backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Build(String),
    CreateBuffer { id: usize, len: usize },
    WriteBuffer(usize),
    SetArg { slot: u32, buffer: usize },
    Enqueue([usize; 2]),
    ReadBuffer(usize),
    Finish,
    ReleaseKernel,
    ReleaseProgram,
    ReleaseBuffer(usize),
    ReleaseQueue,
    ReleaseContext,
}

/// Shared, append-only record of device operations.
#[derive(Debug, Clone, Default)]
pub struct OpLog(Rc<RefCell<Vec<Op>>>);

impl OpLog {
    fn push(&self, op: Op) {
        self.0.borrow_mut().push(op);
    }

    pub fn ops(&self) -> Vec<Op> {
        self.0.borrow().clone()
    }

    /// Just the release operations, in order.
    pub fn releases(&self) -> Vec<Op> {
        self.0
            .borrow()
            .iter()
            .filter(|op| {
                matches!(
                    op,
                    Op::ReleaseKernel
                        | Op::ReleaseProgram
                        | Op::ReleaseBuffer(_)
                        | Op::ReleaseQueue
                        | Op::ReleaseContext
                )
            })
            .cloned()
            .collect()
    }
}

type Storage = Rc<RefCell<Vec<f32>>>;

pub struct HostBuffer {
    id: usize,
    data: Storage,
    log: OpLog,
}

impl HostBuffer {
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Drop for HostBuffer {
    fn drop(&mut self) {
        self.log.push(Op::ReleaseBuffer(self.id));
    }
}

pub struct HostKernel {
    body: Rc<HostKernelFn>,
    args: [Option<(usize, Storage)>; KERNEL_ARITY],
    log: OpLog,
}

impl Drop for HostKernel {
    fn drop(&mut self) {
        self.log.push(Op::ReleaseKernel);
        self.log.push(Op::ReleaseProgram);
    }
}

/// Emulated device with one in-order queue.
pub struct HostBackend {
    name: String,
    kernels: HashMap<String, Rc<HostKernelFn>>,
    build_log: Option<String>,
    failure: Option<(ApiOp, i32)>,
    passes_left: Cell<usize>,
    next_buffer: Cell<usize>,
    log: OpLog,
}

impl HostBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kernels: HashMap::new(),
            build_log: None,
            failure: None,
            passes_left: Cell::new(0),
            next_buffer: Cell::new(0),
            log: OpLog::default(),
        }
    }

    /// Registers `body` as the entry point `name`.
    pub fn with_kernel<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(WorkItem, &mut [Vec<f32>]) + 'static,
    {
        self.kernels.insert(name.into(), Rc::new(body));
        self
    }

    /// Makes every build fail with `log` as the compiler output.
    pub fn with_build_failure(mut self, log: impl Into<String>) -> Self {
        self.build_log = Some(log.into());
        self
    }

    /// Makes every call of kind `op` fail with status `code`.
    pub fn with_failure(self, op: ApiOp, code: i32) -> Self {
        self.with_failure_after(op, code, 0)
    }

    /// Lets the first `passes` calls of kind `op` succeed, then fails every
    /// later one with status `code`.
    pub fn with_failure_after(mut self, op: ApiOp, code: i32, passes: usize) -> Self {
        self.failure = Some((op, code));
        self.passes_left.set(passes);
        self
    }

    pub fn op_log(&self) -> OpLog {
        self.log.clone()
    }

    fn check(&self, op: ApiOp) -> Result<()> {
        match self.failure {
            Some((failing, code)) if failing == op => match self.passes_left.get() {
                0 => Err(RenderError::api(op, code)),
                n => {
                    self.passes_left.set(n - 1);
                    Ok(())
                }
            },
            _ => Ok(()),
        }
    }
}

impl Drop for HostBackend {
    fn drop(&mut self) {
        self.log.push(Op::ReleaseQueue);
        self.log.push(Op::ReleaseContext);
    }
}

impl ComputeBackend for HostBackend {
    type Buffer = HostBuffer;
    type Kernel = HostKernel;

    fn device_name(&self) -> &str {
        &self.name
    }

    fn build_kernel(&self, source: &KernelSource, entry_point: &str) -> Result<HostKernel> {
        self.check(ApiOp::CreateProgram)?;
        source.text()?;
        if let Some(log) = &self.build_log {
            return Err(RenderError::Build {
                code: CL_BUILD_PROGRAM_FAILURE,
                log: log.clone(),
            });
        }
        let body = self
            .kernels
            .get(entry_point)
            .cloned()
            .ok_or_else(|| RenderError::EntryPoint {
                name: entry_point.to_string(),
                code: CL_INVALID_KERNEL_NAME,
            })?;
        self.log.push(Op::Build(entry_point.to_string()));
        Ok(HostKernel {
            body,
            args: [None, None, None],
            log: self.log.clone(),
        })
    }

    fn create_buffer(&self, len: usize) -> Result<HostBuffer> {
        self.check(ApiOp::CreateBuffer)?;
        let id = self.next_buffer.get();
        self.next_buffer.set(id + 1);
        self.log.push(Op::CreateBuffer { id, len });
        Ok(HostBuffer {
            id,
            data: Rc::new(RefCell::new(vec![0.0; len])),
            log: self.log.clone(),
        })
    }

    fn write_buffer(&self, buffer: &mut HostBuffer, src: &[f32]) -> Result<()> {
        self.check(ApiOp::WriteBuffer)?;
        let mut data = buffer.data.borrow_mut();
        if data.len() != src.len() {
            return Err(RenderError::api(ApiOp::WriteBuffer, CL_INVALID_VALUE));
        }
        data.copy_from_slice(src);
        self.log.push(Op::WriteBuffer(buffer.id));
        Ok(())
    }

    fn set_arg(&self, kernel: &mut HostKernel, slot: u32, buffer: &HostBuffer) -> Result<()> {
        self.check(ApiOp::SetKernelArg)?;
        let arg = kernel
            .args
            .get_mut(slot as usize)
            .ok_or_else(|| RenderError::api(ApiOp::SetKernelArg, CL_INVALID_ARG_INDEX))?;
        *arg = Some((buffer.id, buffer.data.clone()));
        self.log.push(Op::SetArg {
            slot,
            buffer: buffer.id,
        });
        Ok(())
    }

    fn enqueue_2d(&self, kernel: &HostKernel, global_work_size: [usize; 2]) -> Result<()> {
        self.check(ApiOp::EnqueueKernel)?;
        let mut bound: Vec<(usize, Storage)> = Vec::with_capacity(KERNEL_ARITY);
        for arg in &kernel.args {
            let (id, storage) = arg
                .as_ref()
                .ok_or_else(|| RenderError::api(ApiOp::EnqueueKernel, CL_INVALID_KERNEL_ARGS))?;
            if bound.iter().any(|(other, _)| other == id) {
                return Err(RenderError::api(ApiOp::EnqueueKernel, CL_INVALID_KERNEL_ARGS));
            }
            bound.push((*id, storage.clone()));
        }

        // Move the data out so the body gets plain slices, then put it back.
        let mut planes: Vec<Vec<f32>> = bound
            .iter()
            .map(|(_, storage)| std::mem::take(&mut *storage.borrow_mut()))
            .collect();
        for gid0 in 0..global_work_size[0] {
            for gid1 in 0..global_work_size[1] {
                let item = WorkItem {
                    global_id: [gid0, gid1],
                    global_size: global_work_size,
                };
                (kernel.body)(item, planes.as_mut_slice());
            }
        }
        for ((_, storage), plane) in bound.iter().zip(planes) {
            *storage.borrow_mut() = plane;
        }

        self.log.push(Op::Enqueue(global_work_size));
        Ok(())
    }

    fn read_buffer(&self, buffer: &HostBuffer, dst: &mut [f32]) -> Result<()> {
        self.check(ApiOp::ReadBuffer)?;
        let data = buffer.data.borrow();
        if data.len() != dst.len() {
            return Err(RenderError::api(ApiOp::ReadBuffer, CL_INVALID_VALUE));
        }
        dst.copy_from_slice(&data);
        self.log.push(Op::ReadBuffer(buffer.id));
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        self.check(ApiOp::Finish)?;
        self.log.push(Op::Finish);
        Ok(())
    }
}
