//! The agreement between this host program and the kernel text.
//!
//! A kernel compiled by this driver must expose an entry point taking three
//! `__global float*` arguments, one per colour channel, in the slot order
//! given by [`Channel::slot`]. It is invoked over a 2-D range whose first
//! dimension is the image height and whose second is the width, and must
//! write the value for pixel `(row, col)` at `row + col * height` in each
//! channel buffer. Changing any of this on one side only silently corrupts
//! the image.

use crate::error::{RenderError, Result};

pub const DEFAULT_WIDTH: usize = 1024;
pub const DEFAULT_HEIGHT: usize = 768;
pub const DEFAULT_ENTRY_POINT: &str = "vector_add";

/// A colour channel and the kernel argument slot its buffer is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// Channels in kernel argument order.
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    pub fn slot(self) -> u32 {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }
}

/// Dispatch shape, entry point and pixel addressing for one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchContract {
    width: usize,
    height: usize,
    entry_point: String,
}

impl DispatchContract {
    pub fn new(width: usize, height: usize, entry_point: impl Into<String>) -> Result<Self> {
        // Each channel buffer holds width * height floats; both the element
        // count and its byte size must fit in a usize.
        let fits = width
            .checked_mul(height)
            .and_then(|count| count.checked_mul(std::mem::size_of::<f32>()))
            .is_some();
        if width == 0 || height == 0 || !fits {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            entry_point: entry_point.into(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Number of `f32` elements in each channel buffer.
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Global work size, height first.
    pub fn global_work_size(&self) -> [usize; 2] {
        [self.height, self.width]
    }

    /// Buffer index holding pixel `(row, col)`.
    pub fn buffer_index(&self, row: usize, col: usize) -> usize {
        row + col * self.height
    }
}

impl Default for DispatchContract {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
        }
    }
}
