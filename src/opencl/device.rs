//! Platform and device resolution.

use crate::error::{RenderError, Result};
use opencl3::device::{CL_DEVICE_TYPE_ALL, Device};
use opencl3::platform::get_platforms;

/// clGetDeviceIDs status when the platform simply has no matching device.
const CL_DEVICE_NOT_FOUND: i32 = -1;

/// The single platform/device pair a render runs on.
pub struct ResolvedDevice {
    pub device: Device,
    pub platform_name: String,
    pub device_name: String,
}

/// Takes the first entry of an enumeration result.
///
/// `on_error` wraps a failed enumeration's status code; `none` is returned
/// when the enumeration succeeded but found nothing.
pub fn select_first<T>(
    found: std::result::Result<Vec<T>, i32>,
    on_error: fn(i32) -> RenderError,
    none: RenderError,
) -> Result<T> {
    let mut items = found.map_err(on_error)?;
    if items.is_empty() {
        return Err(none);
    }
    Ok(items.swap_remove(0))
}

/// First platform, then the first device of any type on it.
pub fn resolve_device() -> Result<ResolvedDevice> {
    let platform = select_first(
        get_platforms().map_err(|e| e.0),
        RenderError::Platform,
        RenderError::NoPlatform,
    )?;
    let platform_name = platform
        .name()
        .unwrap_or_else(|_| "Unknown Platform".to_string());

    let device_ids = match platform.get_devices(CL_DEVICE_TYPE_ALL) {
        Err(e) if e.0 == CL_DEVICE_NOT_FOUND => Ok(Vec::new()),
        other => other.map_err(|e| e.0),
    };
    let device_id = select_first(device_ids, RenderError::Device, RenderError::NoDevice)?;
    let device = Device::new(device_id);
    let device_name = device
        .name()
        .unwrap_or_else(|_| "Unknown Device".to_string());

    log::info!("Using OpenCL device '{}' on platform '{}'", device_name, platform_name);
    Ok(ResolvedDevice {
        device,
        platform_name,
        device_name,
    })
}
