// tests/test_opencl.rs — Checks against a real OpenCL device.
//
// Ignored by default. Run with `cargo test --test test_opencl -- --ignored`
// on a machine with an OpenCL runtime.

use clraytrace::opencl::OpenClBackend;
use clraytrace::pipeline::render;
use clraytrace::source::MAX_SOURCE_SIZE;
use clraytrace::{DispatchContract, KernelSource, PpmImage, RenderError};
use std::collections::HashSet;
use std::path::PathBuf;

fn check_source() -> KernelSource {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("kernels/index_check.cl");
    KernelSource::load(path, MAX_SOURCE_SIZE).unwrap()
}

#[test]
#[ignore = "needs an OpenCL device"]
fn device_writes_every_index_once() {
    let backend = OpenClBackend::new().unwrap();
    let contract = DispatchContract::new(64, 48, "vector_add").unwrap();
    let planes = render(&backend, &check_source(), &contract).unwrap();

    let mut seen = HashSet::new();
    for row in 0..contract.height() {
        for col in 0..contract.width() {
            let idx = contract.buffer_index(row, col);
            assert_eq!(planes.red[idx] as usize, idx);
            assert!(seen.insert(idx));
        }
    }
    assert_eq!(seen.len(), contract.pixel_count());
}

#[test]
#[ignore = "needs an OpenCL device"]
fn device_binds_channels_in_order() {
    let backend = OpenClBackend::new().unwrap();
    let contract = DispatchContract::new(8, 4, "channel_levels").unwrap();
    let planes = render(&backend, &check_source(), &contract).unwrap();
    let image = PpmImage::from_planes(&planes, &contract).unwrap();
    assert!(image.pixels().iter().all(|&p| p == [255, 186, 0]));
}

#[test]
#[ignore = "needs an OpenCL device"]
fn device_reports_build_log() {
    let backend = OpenClBackend::new().unwrap();
    let contract = DispatchContract::new(2, 2, "vector_add").unwrap();
    let source = KernelSource::from_text("broken.cl", "__kernel void vector_add( {");
    match render(&backend, &source, &contract) {
        Err(RenderError::Build { log, .. }) => assert!(!log.is_empty()),
        Err(other) => panic!("expected a build error, got {other}"),
        Ok(_) => panic!("broken source built"),
    }
}
