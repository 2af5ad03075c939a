// SPDX-License-Identifier: LGPL-3.0-or-later OR MPL-2.0
// This file is a part of `streaming-texture`.
//
// `streaming-texture` is free software: you can redistribute it and/or modify it under the
// terms of either:
//
// * GNU Lesser General Public License as published by the Free Software Foundation, either
//   version 3 of the License, or (at your option) any later version.
// * Mozilla Public License as published by the Mozilla Foundation, version 2.
//
// `streaming-texture` is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR
// PURPOSE. See the GNU Lesser General Public License or the Mozilla Public License for more
// details.
//
// You should have received a copy of the GNU Lesser General Public License and the Mozilla
// Public License along with `streaming-texture`. If not, see <https://www.gnu.org/licenses/>.

//! Packing and unpacking of 32-bit pixels.
//!
//! A packed pixel holds red in the most significant byte and alpha in the least significant
//! byte, the same layout as [`piet::Color::as_rgba_u32`]. Packed pixels are stored in mapped
//! buffers in native byte order.

use piet::ImageFormat;

/// The number of bytes in a packed pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Pack four channels into a pixel.
#[inline]
pub fn to_pixel(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (r as u32) << 24 | (g as u32) << 16 | (b as u32) << 8 | a as u32
}

/// Unpack a pixel into its four channels, as `(r, g, b, a)`.
#[inline]
pub fn from_pixel(value: u32) -> (u8, u8, u8, u8) {
    (
        (value >> 24) as u8,
        ((value >> 16) & 0xFF) as u8,
        ((value >> 8) & 0xFF) as u8,
        (value & 0xFF) as u8,
    )
}

/// Get the number of bytes in a single pixel of the given format.
///
/// Returns zero for formats this crate does not know about.
pub fn bytes_per_pixel(format: ImageFormat) -> usize {
    match format {
        ImageFormat::Grayscale => 1,
        ImageFormat::Rgb => 3,
        ImageFormat::RgbaPremul | ImageFormat::RgbaSeparate => 4,
        _ => 0,
    }
}

/// A rectangle of pixels.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
    /// The left edge.
    pub x: u32,

    /// The top edge.
    pub y: u32,

    /// The number of columns.
    pub width: u32,

    /// The number of rows.
    pub height: u32,
}

impl PixelRect {
    /// Create a new rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether this rectangle lies entirely within `(0, 0)..(width, height)`.
    ///
    /// Edges that overflow a `u32` are never contained.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);

        matches!((right, bottom), (Some(r), Some(b)) if r <= width && b <= height)
    }
}

/// Byte offset of the pixel at `(x, y)` in a buffer with the given pitch.
#[inline]
pub(crate) fn pixel_offset(x: u32, y: u32, pitch: usize) -> usize {
    y as usize * pitch + x as usize * BYTES_PER_PIXEL
}

/// Read the packed pixel at a byte offset.
#[inline]
pub(crate) fn read_pixel(buffer: &[u8], offset: usize) -> u32 {
    bytemuck::pod_read_unaligned(&buffer[offset..offset + BYTES_PER_PIXEL])
}

/// Write a packed pixel at a byte offset.
#[inline]
pub(crate) fn write_pixel(buffer: &mut [u8], offset: usize, value: u32) {
    buffer[offset..offset + BYTES_PER_PIXEL].copy_from_slice(bytemuck::bytes_of(&value));
}
