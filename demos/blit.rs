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

//! Stamps a sprite with a transparent hole onto a checkerboard and saves it as a PNG.
//!
//! Usage: `cargo run --example blit [output.png]`

use streaming_texture::piet::{Color, ImageFormat};
use streaming_texture::{PixelRect, SoftwareContext, Texture};

const SIZE: u32 = 64;
const SPRITE: u32 = 16;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "blit.png".to_string());

    // Padded rows, like a real driver would hand out.
    let context = SoftwareContext::new().with_row_alignment(256);

    let mut canvas = Texture::new(&context);
    canvas.alloc_streaming(SIZE, SIZE, ImageFormat::RgbaSeparate)?;
    canvas.lock()?;

    for y in 0..SIZE {
        for x in 0..SIZE {
            let shade = if (x / 8 + y / 8) % 2 == 0 { 0xEE } else { 0x33 };
            canvas.set_pixel(x, y, shade, shade, shade, 0xFF)?;
        }
    }

    let mut sprite = Texture::new(&context);
    sprite.alloc_streaming(SPRITE, SPRITE, ImageFormat::RgbaSeparate)?;
    sprite.lock()?;

    let center = SPRITE as i32 / 2;
    for y in 0..SPRITE {
        for x in 0..SPRITE {
            let (dx, dy) = (x as i32 - center, y as i32 - center);
            let color = if dx * dx + dy * dy < 16 {
                Color::TRANSPARENT
            } else {
                Color::rgb8(0xE0, 0x40, 0x20)
            };
            sprite.set_pixel_color(x, y, color)?;
        }
    }

    // The whole sprite, then its top half a few more times.
    canvas.copy(&sprite, 4, 4, None)?;
    for i in 0..3 {
        let rect = PixelRect::new(0, 0, SPRITE, SPRITE / 2);
        canvas.copy(&sprite, 24 + i * 12, 40, Some(rect))?;
    }

    // Out of bounds; this is logged and nothing is written.
    if let Err(e) = canvas.copy(&sprite, SIZE - 4, 0, None) {
        tracing::warn!("Skipped a copy: {}", e);
    }

    canvas.unlock();

    let texture = canvas.resource().ok_or("canvas was not allocated")?;
    let image = image::RgbaImage::from_raw(SIZE, SIZE, texture.to_rgba8())
        .ok_or("pixel buffer has the wrong size")?;
    image.save(&output)?;

    tracing::info!("Wrote {}", output);
    Ok(())
}
