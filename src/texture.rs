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

//! The texture wrapper.

use crate::gpu_backend::{BlendMode, Flip, GpuContext};
use crate::pixel::{
    bytes_per_pixel, from_pixel, pixel_offset, read_pixel, to_pixel, write_pixel, PixelRect,
    BYTES_PER_PIXEL,
};
use crate::{Error, ResultExt};

use piet::kurbo::{Affine, Vec2};
use piet::{Color, ImageFormat};

use std::fmt;
use std::ops::{Deref, DerefMut};

/// A texture that can be locked for direct access to its pixels.
///
/// The texture borrows the [`GpuContext`] that created it, so the context always outlives it.
/// The backend texture is destroyed when this is dropped.
pub struct Texture<'r, C: GpuContext + ?Sized> {
    /// The context this texture belongs to.
    context: &'r C,

    /// The backend texture, if one has been allocated.
    resource: Option<C::Texture>,

    /// The width of the texture.
    width: u32,

    /// The height of the texture.
    height: u32,

    /// The pitch of the mapped pixels, if the texture is locked.
    pitch: Option<usize>,

    /// Accumulated rotation, in degrees.
    angle: f64,

    /// Accumulated flip flags.
    flip: Flip,
}

impl<C: GpuContext + ?Sized> fmt::Debug for Texture<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("valid", &self.resource.is_some())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pitch", &self.pitch)
            .field("angle", &self.angle)
            .field("flip", &self.flip)
            .finish_non_exhaustive()
    }
}

impl<'r, C: GpuContext + ?Sized> Texture<'r, C> {
    /// Create a new texture with nothing allocated.
    pub fn new(context: &'r C) -> Self {
        Self {
            context,
            resource: None,
            width: 0,
            height: 0,
            pitch: None,
            angle: 0.0,
            flip: Flip::NONE,
        }
    }

    /// Allocate a streaming texture.
    ///
    /// The format must have four bytes per pixel. Any texture that was previously allocated
    /// is released first.
    pub fn alloc_streaming(
        &mut self,
        width: u32,
        height: u32,
        format: ImageFormat,
    ) -> Result<(), Error> {
        self.release();

        if bytes_per_pixel(format) != BYTES_PER_PIXEL {
            tracing::error!("Unable to create texture: unsupported format {:?}", format);
            return Err(Error::UnsupportedFormat(format));
        }

        let (max_width, max_height) = self.context.max_texture_size();
        if width > max_width || height > max_height {
            tracing::error!(
                "Unable to create texture: {}x{} exceeds the maximum of {}x{}",
                width,
                height,
                max_width,
                max_height
            );
            return Err(Error::Allocation(
                format!("texture size {width}x{height} exceeds {max_width}x{max_height}").into(),
            ));
        }

        let resource = self
            .context
            .create_streaming_texture(width, height, format)
            .backend_err(Error::Allocation)
            .map_err(|e| {
                tracing::error!("{}", e);
                e
            })?;

        tracing::debug!(width, height, format=?format, "Allocated a streaming texture");
        self.width = width;
        self.height = height;
        self.install(resource)
    }

    /// Allocate a texture holding the contents of a surface.
    ///
    /// Any texture that was previously allocated is released first.
    pub fn alloc_from_surface(&mut self, surface: &C::Surface) -> Result<(), Error> {
        self.release();

        let resource = self
            .context
            .create_texture_from_surface(surface)
            .map_err(|e| {
                tracing::error!("Unable to create texture from surface: {}", e);
                Error::Allocation(Box::new(e))
            })?;

        let (width, height) = self.context.texture_size(&resource);
        tracing::debug!(width, height, "Allocated a texture from a surface");
        self.width = width;
        self.height = height;
        self.install(resource)
    }

    /// Enable transparency on a freshly created texture and take ownership of it.
    fn install(&mut self, mut resource: C::Texture) -> Result<(), Error> {
        if let Err(e) = self.context.set_blend_mode(&mut resource, BlendMode::Blend) {
            tracing::error!("Unable to enable blending: {}", e);
            self.context.destroy_texture(resource);
            self.width = 0;
            self.height = 0;
            return Err(Error::Backend(Box::new(e)));
        }

        self.resource = Some(resource);
        Ok(())
    }

    /// Unlock and destroy the backend texture, if any.
    fn release(&mut self) {
        self.unlock();

        if let Some(resource) = self.resource.take() {
            self.context.destroy_texture(resource);
        }

        self.width = 0;
        self.height = 0;
    }

    /// Whether a backend texture has been allocated.
    pub fn is_valid(&self) -> bool {
        self.resource.is_some()
    }

    /// Get the backend texture.
    pub fn resource(&self) -> Option<&C::Texture> {
        self.resource.as_ref()
    }

    /// Get the width of the texture, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the height of the texture, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get the width and height of the texture.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Map the whole texture for CPU access.
    ///
    /// Locking an already locked texture does nothing.
    pub fn lock(&mut self) -> Result<(), Error> {
        if self.pitch.is_some() {
            return Ok(());
        }

        let resource = self.resource.as_mut().ok_or_else(|| {
            tracing::error!("Unable to lock texture: texture has not been allocated");
            Error::InvalidTexture
        })?;

        let pitch = match self.context.lock_texture(resource) {
            Ok(pitch) => pitch,
            Err(e) => {
                tracing::error!("Unable to lock texture: {}", e);
                return Err(Error::Lock(Box::new(e)));
            }
        };

        let len = self.context.mapped_pixels(resource).map_or(0, |data| data.len());
        if let Err(reason) = check_mapping(self.width, self.height, pitch, len) {
            tracing::error!("Unable to lock texture: {}", reason);
            self.context.unlock_texture(resource);
            return Err(Error::Lock(reason.into()));
        }

        tracing::debug!(pitch, "Locked a texture");
        self.pitch = Some(pitch);
        Ok(())
    }

    /// Release the CPU mapping of the texture.
    ///
    /// Unlocking an unlocked texture does nothing.
    pub fn unlock(&mut self) {
        if self.pitch.take().is_none() {
            return;
        }

        if let Some(resource) = self.resource.as_mut() {
            self.context.unlock_texture(resource);
            tracing::debug!("Unlocked a texture");
        }
    }

    /// Lock the texture until the returned guard is dropped.
    pub fn lock_scope(&mut self) -> Result<LockGuard<'_, 'r, C>, Error> {
        self.lock()?;
        Ok(LockGuard { texture: self })
    }

    /// Whether the texture is locked.
    pub fn is_locked(&self) -> bool {
        self.pitch.is_some()
    }

    /// Get the number of bytes in a row of the mapped pixels, if locked.
    pub fn pitch(&self) -> Option<usize> {
        self.pitch
    }

    /// Get the mapped pixels, if locked.
    pub fn data(&self) -> Option<&[u8]> {
        self.pitch?;
        self.context.mapped_pixels(self.resource.as_ref()?)
    }

    /// Get the mapped pixels mutably, if locked.
    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        self.pitch?;
        self.context.mapped_pixels_mut(self.resource.as_mut()?)
    }

    /// Get the pixel at `(x, y)` as `(r, g, b, a)`.
    ///
    /// Returns `None` if the texture is not locked or the pixel is out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<(u8, u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let pitch = self.pitch?;
        let data = self.data()?;
        Some(from_pixel(read_pixel(data, pixel_offset(x, y, pitch))))
    }

    /// Set the pixel at `(x, y)`.
    ///
    /// Nothing is written unless the texture is locked and the pixel is in bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, r: u8, g: u8, b: u8, a: u8) -> Result<(), Error> {
        let pitch = match self.pitch {
            Some(pitch) => pitch,
            None => {
                tracing::error!("Lock the texture before writing pixels to it!");
                return Err(Error::NotLocked);
            }
        };

        if x >= self.width || y >= self.height {
            tracing::error!(
                "Attempted to write pixel ({}, {}) outside of a {}x{} texture",
                x,
                y,
                self.width,
                self.height
            );
            return Err(Error::OutOfBounds);
        }

        let data = self.data_mut().ok_or(Error::NotLocked)?;
        write_pixel(data, pixel_offset(x, y, pitch), to_pixel(r, g, b, a));
        Ok(())
    }

    /// Set the pixel at `(x, y)` to a color.
    pub fn set_pixel_color(&mut self, x: u32, y: u32, color: Color) -> Result<(), Error> {
        let (r, g, b, a) = color.as_rgba8();
        self.set_pixel(x, y, r, g, b, a)
    }

    /// Copy pixels from `source` into this texture at `(x, y)`.
    ///
    /// `rect` selects the region of `source` to copy; by default all of it is copied. Source
    /// pixels with an alpha of zero are skipped, everything else overwrites the destination.
    ///
    /// Both textures must be locked, and both regions must lie within their textures.
    /// Otherwise nothing is written.
    pub fn copy(
        &mut self,
        source: &Texture<'_, C>,
        x: u32,
        y: u32,
        rect: Option<PixelRect>,
    ) -> Result<(), Error> {
        let (dest_pitch, src_pitch) = match (self.pitch, source.pitch) {
            (Some(dest), Some(src)) => (dest, src),
            _ => {
                tracing::error!("Lock the texture before copying from or to it!");
                return Err(Error::NotLocked);
            }
        };

        let rect = rect.unwrap_or_else(|| PixelRect::new(0, 0, source.width, source.height));
        let target = PixelRect::new(x, y, rect.width, rect.height);

        if !target.fits_within(self.width, self.height) {
            tracing::error!(
                "Attempted to copy a texture which is too large for the target (or goes out of bounds)!"
            );
            return Err(Error::OutOfBounds);
        }

        if !rect.fits_within(source.width, source.height) {
            tracing::error!("Attempted to copy from outside of the source texture!");
            return Err(Error::OutOfBounds);
        }

        let src = source.data().ok_or(Error::NotLocked)?;
        let dest = self.data_mut().ok_or(Error::NotLocked)?;

        tracing::trace!(
            width = rect.width,
            height = rect.height,
            x,
            y,
            "Copying pixels between textures"
        );

        for iy in 0..rect.height {
            for ix in 0..rect.width {
                let value = read_pixel(src, pixel_offset(rect.x + ix, rect.y + iy, src_pitch));
                let (r, g, b, a) = from_pixel(value);

                if a != 0 {
                    write_pixel(
                        dest,
                        pixel_offset(x + ix, y + iy, dest_pitch),
                        to_pixel(r, g, b, a),
                    );
                }
            }
        }

        Ok(())
    }

    /// Add to the rotation of the texture, in degrees.
    pub fn rotate(&mut self, angle: f64) {
        self.angle += angle;
    }

    /// Get the rotation of the texture, in degrees.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Flip the texture horizontally, in addition to any existing flip.
    pub fn flip_horizontal(&mut self) {
        self.flip |= Flip::HORIZONTAL;
    }

    /// Flip the texture vertically, in addition to any existing flip.
    pub fn flip_vertical(&mut self) {
        self.flip |= Flip::VERTICAL;
    }

    /// Clear all flips.
    pub fn flip_none(&mut self) {
        self.flip = Flip::NONE;
    }

    /// Get the flip flags of the texture.
    pub fn flip(&self) -> Flip {
        self.flip
    }

    /// Get the transform to draw this texture with.
    ///
    /// The texture is flipped, then rotated, both about its center.
    pub fn transform(&self) -> Affine {
        let center = Vec2::new(self.width as f64 / 2.0, self.height as f64 / 2.0);
        let sx = if self.flip.contains(Flip::HORIZONTAL) { -1.0 } else { 1.0 };
        let sy = if self.flip.contains(Flip::VERTICAL) { -1.0 } else { 1.0 };

        Affine::translate(center)
            * Affine::rotate(self.angle.to_radians())
            * Affine::scale_non_uniform(sx, sy)
            * Affine::translate(-center)
    }

    /// Set the alpha multiplier used when drawing the texture.
    pub fn set_alpha_mod(&mut self, alpha: u8) -> Result<(), Error> {
        let resource = self.resource.as_mut().ok_or(Error::InvalidTexture)?;

        self.context
            .set_alpha_mod(resource, alpha)
            .backend_err(Error::Backend)
            .map_err(|e| {
                tracing::error!("Unable to set alpha modulation: {}", e);
                e
            })
    }
}

/// Make sure a mapped buffer can hold every row of a texture.
fn check_mapping(width: u32, height: u32, pitch: usize, len: usize) -> Result<(), String> {
    let row = width as usize * BYTES_PER_PIXEL;
    if pitch < row {
        return Err(format!("pitch {pitch} is smaller than a row of {row} bytes"));
    }

    if height == 0 {
        return Ok(());
    }

    let needed = pitch
        .checked_mul(height as usize - 1)
        .and_then(|n| n.checked_add(row));

    match needed {
        Some(needed) if needed <= len => Ok(()),
        _ => Err(format!(
            "mapped buffer of {len} bytes is too small for {height} rows with pitch {pitch}"
        )),
    }
}

impl<C: GpuContext + ?Sized> Drop for Texture<'_, C> {
    fn drop(&mut self) {
        self.release();
    }
}

/// A guard that keeps a texture locked.
///
/// The texture is unlocked when this is dropped.
pub struct LockGuard<'a, 'r, C: GpuContext + ?Sized> {
    texture: &'a mut Texture<'r, C>,
}

impl<'r, C: GpuContext + ?Sized> Deref for LockGuard<'_, 'r, C> {
    type Target = Texture<'r, C>;

    fn deref(&self) -> &Self::Target {
        &*self.texture
    }
}

impl<'r, C: GpuContext + ?Sized> DerefMut for LockGuard<'_, 'r, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.texture
    }
}

impl<C: GpuContext + ?Sized> Drop for LockGuard<'_, '_, C> {
    fn drop(&mut self) {
        self.texture.unlock();
    }
}
