//! Tone mapping and PPM (`P3`) encoding of the channel planes.

use crate::contract::DispatchContract;
use crate::error::{RenderError, Result};
use std::io::Write;

const GAMMA: f32 = 2.2;
pub const MAX_CHANNEL_VALUE: u8 = 255;

/// Clamps `x` to [0, 1], applies gamma 1/2.2 and quantizes to 0..=255.
pub fn tone_map(x: f32) -> u8 {
    // NaN clamps to 0 as well.
    let x = if x > 1.0 {
        1.0
    } else if x >= 0.0 {
        x
    } else {
        0.0
    };
    let scaled = x.powf(1.0 / GAMMA) * 255.0 + 0.5;
    scaled as u8
}

/// Host copies of the three channel buffers after readback.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPlanes {
    pub red: Vec<f32>,
    pub green: Vec<f32>,
    pub blue: Vec<f32>,
}

impl ChannelPlanes {
    pub fn zeroed(len: usize) -> Self {
        Self {
            red: vec![0.0; len],
            green: vec![0.0; len],
            blue: vec![0.0; len],
        }
    }
}

/// Row-major grid of RGB triples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpmImage {
    width: usize,
    height: usize,
    pixels: Vec<[u8; 3]>,
}

impl PpmImage {
    /// Tone maps the planes, reading pixel `(row, col)` from
    /// `contract.buffer_index(row, col)`.
    pub fn from_planes(planes: &ChannelPlanes, contract: &DispatchContract) -> Result<Self> {
        let expected = contract.pixel_count();
        for plane in [&planes.red, &planes.green, &planes.blue] {
            if plane.len() != expected {
                return Err(RenderError::BufferLength {
                    expected,
                    actual: plane.len(),
                });
            }
        }

        let (width, height) = (contract.width(), contract.height());
        let mut pixels = Vec::with_capacity(expected);
        for row in 0..height {
            for col in 0..width {
                let idx = contract.buffer_index(row, col);
                pixels.push([
                    tone_map(planes.red[idx]),
                    tone_map(planes.green[idx]),
                    tone_map(planes.blue[idx]),
                ]);
            }
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, row: usize, col: usize) -> [u8; 3] {
        self.pixels[row * self.width + col]
    }

    pub fn pixels(&self) -> &[[u8; 3]] {
        &self.pixels
    }

    /// Writes the `P3` header and one `"r g b "` group per pixel.
    pub fn write_ppm<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        write!(out, "P3\n{} {}\n{}\n", self.width, self.height, MAX_CHANNEL_VALUE)?;
        for [r, g, b] in &self.pixels {
            write!(out, "{} {} {} ", r, g, b)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(x: f64) -> u8 {
        let x = x.clamp(0.0, 1.0);
        (255.0 * x.powf(1.0 / 2.2) + 0.5).floor() as u8
    }

    #[test]
    fn tone_map_endpoints() {
        assert_eq!(tone_map(0.0), 0);
        assert_eq!(tone_map(1.0), 255);
    }

    #[test]
    fn tone_map_clamps() {
        assert_eq!(tone_map(-5.0), tone_map(0.0));
        assert_eq!(tone_map(5.0), tone_map(1.0));
        assert_eq!(tone_map(f32::INFINITY), 255);
        assert_eq!(tone_map(f32::NEG_INFINITY), 0);
        assert_eq!(tone_map(f32::NAN), 0);
    }

    #[test]
    fn tone_map_is_monotonic() {
        let mut previous = 0;
        for i in 0..=1000 {
            let value = tone_map(i as f32 / 1000.0);
            assert!(value >= previous, "dropped at step {}", i);
            previous = value;
        }
    }

    #[test]
    fn tone_map_matches_gamma_formula() {
        for x in [0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 1.0] {
            assert_eq!(tone_map(x as f32), reference(x), "x = {}", x);
        }
        assert_eq!(tone_map(0.5), 186);
    }

    #[test]
    fn from_planes_uses_transposed_index() {
        // 3 wide, 2 high: pixel (row, col) lives at row + col * 2.
        let contract = DispatchContract::new(3, 2, "k").unwrap();
        let mut planes = ChannelPlanes::zeroed(6);
        planes.red[1] = 1.0; // (1, 0)
        planes.green[4] = 1.0; // (0, 2)
        let image = PpmImage::from_planes(&planes, &contract).unwrap();
        assert_eq!(image.pixel(1, 0), [255, 0, 0]);
        assert_eq!(image.pixel(0, 2), [0, 255, 0]);
        assert_eq!(image.pixel(0, 1), [0, 0, 0]);
    }

    #[test]
    fn from_planes_rejects_short_plane() {
        let contract = DispatchContract::new(2, 2, "k").unwrap();
        let mut planes = ChannelPlanes::zeroed(4);
        planes.blue.pop();
        assert!(matches!(
            PpmImage::from_planes(&planes, &contract),
            Err(RenderError::BufferLength { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn zero_image_serialises_exactly() {
        let contract = DispatchContract::new(2, 2, "k").unwrap();
        let image = PpmImage::from_planes(&ChannelPlanes::zeroed(4), &contract).unwrap();
        let mut out = Vec::new();
        image.write_ppm(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "P3\n2 2\n255\n0 0 0 0 0 0 0 0 0 0 0 0 "
        );
    }
}
