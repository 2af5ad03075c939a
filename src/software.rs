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

//! A GPU backend that keeps every texture in system memory.
//!
//! Locking copies the texture into a staging buffer whose rows may be padded, and unlocking
//! writes the rows back. This mirrors what hardware drivers do with streaming textures.

use crate::gpu_backend::{BlendMode, GpuContext};
use crate::pixel::{bytes_per_pixel, from_pixel, read_pixel, to_pixel, write_pixel};
use crate::pixel::{pixel_offset, BYTES_PER_PIXEL};

use piet::ImageFormat;
use tiny_skia::Pixmap;

use std::cell::Cell;
use std::fmt;

/// The largest texture the software backend creates by default.
const DEFAULT_MAX_SIZE: u32 = 16384;

/// A CPU implementation of [`GpuContext`].
#[derive(Debug)]
pub struct SoftwareContext {
    /// Locked rows are padded to a multiple of this many bytes.
    row_alignment: usize,

    /// The largest texture that can be created.
    max_size: (u32, u32),

    /// The ID to give the next texture.
    next_id: Cell<usize>,
}

impl Default for SoftwareContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareContext {
    /// Create a new software context with tightly packed rows.
    pub fn new() -> Self {
        Self {
            row_alignment: 1,
            max_size: (DEFAULT_MAX_SIZE, DEFAULT_MAX_SIZE),
            next_id: Cell::new(0),
        }
    }

    /// Pad the rows of locked textures to a multiple of `alignment` bytes.
    pub fn with_row_alignment(mut self, alignment: usize) -> Self {
        self.row_alignment = alignment.max(1);
        self
    }

    /// Set the largest texture that can be created.
    pub fn with_max_texture_size(mut self, width: u32, height: u32) -> Self {
        self.max_size = (width, height);
        self
    }

    fn next_id(&self) -> usize {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        id
    }

    fn pitch_for(&self, width: u32) -> Result<usize, SoftwareError> {
        let row = width as usize * BYTES_PER_PIXEL;
        let align = self.row_alignment;

        row.checked_add(align - 1)
            .map(|n| n / align)
            .and_then(|n| n.checked_mul(align))
            .ok_or_else(|| format!("row alignment {align} is too large for width {width}").into())
    }

    fn new_texture(
        &self,
        width: u32,
        height: u32,
        format: ImageFormat,
    ) -> Result<SoftwareTexture, SoftwareError> {
        if width == 0 || height == 0 {
            return Err(format!("invalid texture size {width}x{height}").into());
        }

        let (max_width, max_height) = self.max_size;
        if width > max_width || height > max_height {
            return Err(format!(
                "texture size {width}x{height} exceeds the maximum of {max_width}x{max_height}"
            )
            .into());
        }

        Ok(SoftwareTexture {
            id: self.next_id(),
            size: (width, height),
            format,
            pixels: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
            mapping: None,
            blend_mode: BlendMode::None,
            alpha_mod: 0xFF,
            lock_count: 0,
        })
    }
}

/// A texture owned by a [`SoftwareContext`].
pub struct SoftwareTexture {
    /// Unique ID of this texture.
    id: usize,

    /// The width and height of this texture.
    size: (u32, u32),

    /// The pixel format of this texture.
    format: ImageFormat,

    /// Tightly packed pixels.
    pixels: Vec<u8>,

    /// The staging buffer, present while locked.
    mapping: Option<Mapping>,

    /// The blend mode to draw with.
    blend_mode: BlendMode,

    /// The alpha multiplier to draw with.
    alpha_mod: u8,

    /// How many times this texture has been locked and unlocked.
    lock_count: usize,
}

struct Mapping {
    /// The mapped bytes.
    buffer: Vec<u8>,

    /// The number of bytes in a row of `buffer`.
    pitch: usize,
}

impl fmt::Debug for SoftwareTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareTexture")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("format", &self.format)
            .field("mapped", &self.mapping.is_some())
            .finish_non_exhaustive()
    }
}

impl SoftwareTexture {
    /// Get the width and height of this texture.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Get the pixel format of this texture.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Get the blend mode of this texture.
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Get the alpha multiplier of this texture.
    pub fn alpha_mod(&self) -> u8 {
        self.alpha_mod
    }

    /// Get the number of completed lock/unlock cycles.
    pub fn lock_count(&self) -> usize {
        self.lock_count
    }

    /// Whether the texture is currently mapped.
    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }

    /// Get the committed pixel at `(x, y)`.
    ///
    /// Changes made while the texture is locked are not visible until it is unlocked.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        let (width, height) = self.size;
        if x >= width || y >= height {
            return None;
        }

        let pitch = width as usize * BYTES_PER_PIXEL;
        Some(read_pixel(&self.pixels, pixel_offset(x, y, pitch)))
    }

    /// Unpack the committed pixels into RGBA bytes.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .chunks_exact(BYTES_PER_PIXEL)
            .flat_map(|chunk| {
                let (r, g, b, a) = from_pixel(read_pixel(chunk, 0));
                [r, g, b, a]
            })
            .collect()
    }
}

impl GpuContext for SoftwareContext {
    type Texture = SoftwareTexture;
    type Surface = Pixmap;
    type Error = SoftwareError;

    fn create_streaming_texture(
        &self,
        width: u32,
        height: u32,
        format: ImageFormat,
    ) -> Result<Self::Texture, Self::Error> {
        if bytes_per_pixel(format) != BYTES_PER_PIXEL {
            return Err(format!("unsupported pixel format {format:?}").into());
        }

        self.new_texture(width, height, format)
    }

    fn create_texture_from_surface(
        &self,
        surface: &Self::Surface,
    ) -> Result<Self::Texture, Self::Error> {
        let mut texture =
            self.new_texture(surface.width(), surface.height(), ImageFormat::RgbaPremul)?;

        for (dest, src) in texture
            .pixels
            .chunks_exact_mut(BYTES_PER_PIXEL)
            .zip(surface.pixels())
        {
            let value = to_pixel(src.red(), src.green(), src.blue(), src.alpha());
            write_pixel(dest, 0, value);
        }

        Ok(texture)
    }

    fn texture_size(&self, texture: &Self::Texture) -> (u32, u32) {
        texture.size
    }

    fn set_blend_mode(
        &self,
        texture: &mut Self::Texture,
        mode: BlendMode,
    ) -> Result<(), Self::Error> {
        texture.blend_mode = mode;
        Ok(())
    }

    fn set_alpha_mod(&self, texture: &mut Self::Texture, alpha: u8) -> Result<(), Self::Error> {
        texture.alpha_mod = alpha;
        Ok(())
    }

    fn lock_texture(&self, texture: &mut Self::Texture) -> Result<usize, Self::Error> {
        if texture.mapping.is_some() {
            return Err(format!("texture {} is already locked", texture.id).into());
        }

        let (width, height) = texture.size;
        let row = width as usize * BYTES_PER_PIXEL;
        let pitch = self.pitch_for(width)?;
        let len = pitch.checked_mul(height as usize).ok_or_else(|| {
            SoftwareError::from(format!("staging buffer for texture {} is too large", texture.id))
        })?;

        let mut buffer = vec![0; len];
        for (dest, src) in buffer
            .chunks_exact_mut(pitch)
            .zip(texture.pixels.chunks_exact(row))
        {
            dest[..row].copy_from_slice(src);
        }

        texture.mapping = Some(Mapping { buffer, pitch });
        Ok(pitch)
    }

    fn mapped_pixels<'t>(&self, texture: &'t Self::Texture) -> Option<&'t [u8]> {
        texture.mapping.as_ref().map(|m| &m.buffer[..])
    }

    fn mapped_pixels_mut<'t>(&self, texture: &'t mut Self::Texture) -> Option<&'t mut [u8]> {
        texture.mapping.as_mut().map(|m| &mut m.buffer[..])
    }

    fn unlock_texture(&self, texture: &mut Self::Texture) {
        let mapping = match texture.mapping.take() {
            Some(mapping) => mapping,
            None => return,
        };

        let row = texture.size.0 as usize * BYTES_PER_PIXEL;
        for (dest, src) in texture
            .pixels
            .chunks_exact_mut(row)
            .zip(mapping.buffer.chunks_exact(mapping.pitch))
        {
            dest.copy_from_slice(&src[..row]);
        }

        texture.lock_count += 1;
    }

    fn destroy_texture(&self, texture: Self::Texture) {
        tracing::trace!(id = texture.id, "Destroying a software texture");
    }

    fn max_texture_size(&self) -> (u32, u32) {
        self.max_size
    }
}

/// An error from the software backend.
#[derive(Debug)]
pub struct SoftwareError(String);

impl From<String> for SoftwareError {
    fn from(s: String) -> Self {
        SoftwareError(s)
    }
}

impl fmt::Display for SoftwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "software error: {}", self.0)
    }
}

impl std::error::Error for SoftwareError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tight_rows_by_default() {
        let context = SoftwareContext::new();
        let mut texture = context
            .create_streaming_texture(3, 2, ImageFormat::RgbaSeparate)
            .unwrap();

        let pitch = context.lock_texture(&mut texture).unwrap();
        assert_eq!(pitch, 12);
        assert_eq!(context.mapped_pixels(&texture).unwrap().len(), 24);
    }

    #[test]
    fn padded_rows_round_trip() {
        let context = SoftwareContext::new().with_row_alignment(64);
        let mut texture = context
            .create_streaming_texture(3, 2, ImageFormat::RgbaSeparate)
            .unwrap();

        let pitch = context.lock_texture(&mut texture).unwrap();
        assert_eq!(pitch, 64);

        let mapped = context.mapped_pixels_mut(&mut texture).unwrap();
        write_pixel(mapped, pixel_offset(2, 1, pitch), 0x1122_3344);

        // Not committed until unlocked.
        assert_eq!(texture.pixel(2, 1), Some(0));
        context.unlock_texture(&mut texture);
        assert_eq!(texture.pixel(2, 1), Some(0x1122_3344));
        assert_eq!(texture.pixel(3, 1), None);
        assert_eq!(texture.lock_count(), 1);
    }

    #[test]
    fn huge_row_alignment_fails_to_lock() {
        let context = SoftwareContext::new().with_row_alignment(usize::MAX);
        let mut texture = context
            .create_streaming_texture(2, 2, ImageFormat::RgbaSeparate)
            .unwrap();

        assert!(context.lock_texture(&mut texture).is_err());
        assert!(!texture.is_mapped());
    }

    #[test]
    fn double_lock_fails() {
        let context = SoftwareContext::new();
        let mut texture = context
            .create_streaming_texture(1, 1, ImageFormat::RgbaPremul)
            .unwrap();

        context.lock_texture(&mut texture).unwrap();
        assert!(context.lock_texture(&mut texture).is_err());
    }

    #[test]
    fn unlocking_unmapped_texture_does_nothing() {
        let context = SoftwareContext::new();
        let mut texture = context
            .create_streaming_texture(1, 1, ImageFormat::RgbaPremul)
            .unwrap();

        context.unlock_texture(&mut texture);
        assert_eq!(texture.lock_count(), 0);
        assert!(context.mapped_pixels(&texture).is_none());
    }

    #[test]
    fn rejects_bad_sizes_and_formats() {
        let context = SoftwareContext::new().with_max_texture_size(8, 8);

        assert!(context
            .create_streaming_texture(0, 4, ImageFormat::RgbaSeparate)
            .is_err());
        assert!(context
            .create_streaming_texture(9, 4, ImageFormat::RgbaSeparate)
            .is_err());
        assert!(context
            .create_streaming_texture(4, 4, ImageFormat::Grayscale)
            .is_err());
    }

    #[test]
    fn surfaces_become_packed_pixels() {
        let context = SoftwareContext::new();
        let mut pixmap = Pixmap::new(2, 1).unwrap();
        pixmap.fill(tiny_skia::Color::from_rgba8(0, 0, 255, 255));

        let texture = context.create_texture_from_surface(&pixmap).unwrap();
        assert_eq!(texture.size(), (2, 1));
        assert_eq!(texture.format(), ImageFormat::RgbaPremul);
        assert_eq!(texture.pixel(1, 0), Some(to_pixel(0, 0, 255, 255)));
        assert_eq!(texture.to_rgba8(), vec![0, 0, 255, 255, 0, 0, 255, 255]);
    }
}
