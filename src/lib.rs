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

//! Streaming textures with direct CPU access to their pixels.
//!
//! This crate wraps the texture primitives of a GPU backend: allocation, locking, blend mode
//! and alpha modulation. On top of them it provides per-pixel access to locked textures and
//! a rectangle copy between two locked textures that skips fully transparent pixels.
//!
//! To use, implement the [`GpuContext`] trait on a type that represents your device, then
//! create [`Texture`]s that borrow it. A CPU implementation, [`SoftwareContext`], is
//! provided for headless use and testing.
//!
//! Note that this crate uses thread-unsafe primitives. Drawing is usually pinned to one
//! thread anyways.
//!
//! ## Pixels
//!
//! Locked textures hold packed 32-bit pixels, see [`to_pixel`] and [`from_pixel`]. Rows are
//! addressed through the pitch reported by the backend, so padded rows are supported.

#![forbid(unsafe_code, rust_2018_idioms)]

pub use piet;

use piet::ImageFormat;

use std::error::Error as StdError;
use std::fmt;

mod gpu_backend;
mod pixel;
mod software;
mod texture;

pub use self::gpu_backend::{BlendMode, Flip, GpuContext};
pub use self::pixel::{bytes_per_pixel, from_pixel, to_pixel, PixelRect, BYTES_PER_PIXEL};
pub use self::software::{SoftwareContext, SoftwareError, SoftwareTexture};
pub use self::texture::{LockGuard, Texture};

/// An error that can occur while working with a texture.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// The backend could not create a texture.
    Allocation(Box<dyn StdError + 'static>),

    /// The backend could not map a texture for CPU access.
    Lock(Box<dyn StdError + 'static>),

    /// Some other backend operation failed.
    Backend(Box<dyn StdError + 'static>),

    /// The texture has not been allocated.
    InvalidTexture,

    /// Pixel access was attempted without holding the required lock.
    NotLocked,

    /// The requested pixels lie outside of the texture.
    OutOfBounds,

    /// Streaming textures cannot use this pixel format.
    UnsupportedFormat(ImageFormat),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Allocation(e) => write!(f, "unable to create texture: {e}"),
            Error::Lock(e) => write!(f, "unable to lock texture: {e}"),
            Error::Backend(e) => write!(f, "backend error: {e}"),
            Error::InvalidTexture => f.write_str("texture has not been allocated"),
            Error::NotLocked => f.write_str("texture must be locked for pixel access"),
            Error::OutOfBounds => f.write_str("pixel region is out of bounds"),
            Error::UnsupportedFormat(format) => {
                write!(f, "unsupported streaming format: {format:?}")
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Allocation(e) | Error::Lock(e) | Error::Backend(e) => Some(&**e),
            _ => None,
        }
    }
}

trait ResultExt<T, E: StdError + 'static> {
    /// Box the backend error into one of our variants.
    fn backend_err(self, wrap: fn(Box<dyn StdError + 'static>) -> Error) -> Result<T, Error>;
}

impl<T, E: StdError + 'static> ResultExt<T, E> for Result<T, E> {
    fn backend_err(self, wrap: fn(Box<dyn StdError + 'static>) -> Error) -> Result<T, Error> {
        self.map_err(|e| wrap(Box::new(e)))
    }
}
