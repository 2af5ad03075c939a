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

//! Defines the GPU backend for streaming textures.

use piet::ImageFormat;

use std::error::Error;
use std::ops::{BitOr, BitOrAssign};

/// The backend for the texture wrapper.
///
/// Methods take `&self`; backends that need to mutate shared device state are expected to
/// use interior mutability.
pub trait GpuContext {
    /// The type associated with a GPU texture.
    type Texture;

    /// A CPU-side image that can be converted into a texture.
    type Surface: ?Sized;

    /// The error type associated with this GPU context.
    type Error: Error + 'static;

    /// Create a new texture with streaming access.
    ///
    /// Streaming textures can be locked for direct CPU access to their pixels.
    fn create_streaming_texture(
        &self,
        width: u32,
        height: u32,
        format: ImageFormat,
    ) -> Result<Self::Texture, Self::Error>;

    /// Create a new texture from the contents of a surface.
    fn create_texture_from_surface(
        &self,
        surface: &Self::Surface,
    ) -> Result<Self::Texture, Self::Error>;

    /// Get the size of a texture, in pixels.
    fn texture_size(&self, texture: &Self::Texture) -> (u32, u32);

    /// Set the blend mode used when the texture is drawn.
    fn set_blend_mode(&self, texture: &mut Self::Texture, mode: BlendMode)
        -> Result<(), Self::Error>;

    /// Set the alpha multiplier used when the texture is drawn.
    fn set_alpha_mod(&self, texture: &mut Self::Texture, alpha: u8) -> Result<(), Self::Error>;

    /// Map the entire texture for CPU access.
    ///
    /// Returns the pitch of the mapped buffer, which is the number of bytes in one row. This
    /// may be larger than the width of the texture times its bytes per pixel, but never
    /// smaller.
    fn lock_texture(&self, texture: &mut Self::Texture) -> Result<usize, Self::Error>;

    /// Get the mapped pixels of a locked texture.
    ///
    /// The buffer must hold at least `pitch * (height - 1) + width * 4` bytes, where `pitch`
    /// is the value returned by [`lock_texture`](GpuContext::lock_texture). Returns `None` if
    /// the texture is not locked.
    fn mapped_pixels<'t>(&self, texture: &'t Self::Texture) -> Option<&'t [u8]>;

    /// Get the mapped pixels of a locked texture mutably.
    ///
    /// Returns `None` if the texture is not locked.
    fn mapped_pixels_mut<'t>(&self, texture: &'t mut Self::Texture) -> Option<&'t mut [u8]>;

    /// Release the CPU mapping of a texture, uploading any changes.
    fn unlock_texture(&self, texture: &mut Self::Texture);

    /// Destroy a texture.
    fn destroy_texture(&self, texture: Self::Texture);

    /// Get the maximum texture size.
    fn max_texture_size(&self) -> (u32, u32);
}

/// The blend mode applied when drawing a texture.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum BlendMode {
    /// Copy the source over the destination.
    None,

    /// Alpha blending.
    #[default]
    Blend,

    /// Additive blending.
    Add,

    /// Color modulation.
    Modulate,
}

/// The flip state of a texture.
///
/// Flags accumulate; use [`Flip::NONE`] to reset them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Flip(u8);

impl Flip {
    /// Do not flip.
    pub const NONE: Flip = Flip(0);

    /// Flip across the vertical axis.
    pub const HORIZONTAL: Flip = Flip(1);

    /// Flip across the horizontal axis.
    pub const VERTICAL: Flip = Flip(2);

    /// Get the raw bits.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether all of the flags in `other` are set.
    pub fn contains(self, other: Flip) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no flags are set.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Flip {
    type Output = Flip;

    fn bitor(self, rhs: Flip) -> Flip {
        Flip(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flip {
    fn bitor_assign(&mut self, rhs: Flip) {
        self.0 |= rhs.0;
    }
}
