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

//! Copying pixels between locked textures.

use streaming_texture::piet::ImageFormat;
use streaming_texture::{Error, PixelRect, SoftwareContext, Texture};

const RED: (u8, u8, u8, u8) = (255, 0, 0, 255);
const BLUE: (u8, u8, u8, u8) = (0, 0, 255, 255);

fn filled<'r>(
    context: &'r SoftwareContext,
    width: u32,
    height: u32,
    (r, g, b, a): (u8, u8, u8, u8),
) -> Texture<'r, SoftwareContext> {
    let mut texture = Texture::new(context);
    texture
        .alloc_streaming(width, height, ImageFormat::RgbaSeparate)
        .unwrap();
    texture.lock().unwrap();

    for y in 0..height {
        for x in 0..width {
            texture.set_pixel(x, y, r, g, b, a).unwrap();
        }
    }

    texture
}

fn contexts() -> [SoftwareContext; 2] {
    [
        SoftwareContext::new(),
        SoftwareContext::new().with_row_alignment(64),
    ]
}

#[test]
fn opaque_source_overwrites_destination() {
    for context in contexts() {
        let mut dest = filled(&context, 4, 4, RED);
        let source = filled(&context, 2, 2, BLUE);

        dest.copy(&source, 1, 1, None).unwrap();

        assert_eq!(dest.get_pixel(1, 1), Some(BLUE));
        assert_eq!(dest.get_pixel(2, 2), Some(BLUE));
        assert_eq!(dest.get_pixel(0, 0), Some(RED));
        assert_eq!(dest.get_pixel(3, 3), Some(RED));
        assert_eq!(dest.get_pixel(3, 1), Some(RED));
    }
}

#[test]
fn transparent_source_pixels_are_skipped() {
    for context in contexts() {
        let mut dest = filled(&context, 4, 4, RED);
        let mut source = filled(&context, 2, 2, BLUE);
        source.set_pixel(0, 0, 0, 0, 255, 0).unwrap();

        dest.copy(&source, 1, 1, None).unwrap();

        assert_eq!(dest.get_pixel(1, 1), Some(RED));
        assert_eq!(dest.get_pixel(2, 1), Some(BLUE));
        assert_eq!(dest.get_pixel(1, 2), Some(BLUE));
    }
}

#[test]
fn translucent_pixels_are_copied_exactly() {
    let context = SoftwareContext::new();
    let mut dest = filled(&context, 2, 2, RED);
    let source = filled(&context, 1, 1, (10, 20, 30, 1));

    dest.copy(&source, 0, 0, None).unwrap();
    assert_eq!(dest.get_pixel(0, 0), Some((10, 20, 30, 1)));
}

#[test]
fn source_rect_selects_a_region() {
    let context = SoftwareContext::new().with_row_alignment(32);
    let mut dest = filled(&context, 4, 4, RED);
    let mut source = filled(&context, 3, 3, BLUE);
    source.set_pixel(2, 2, 0, 255, 0, 255).unwrap();

    dest.copy(&source, 0, 0, Some(PixelRect::new(2, 1, 1, 2)))
        .unwrap();

    assert_eq!(dest.get_pixel(0, 0), Some(BLUE));
    assert_eq!(dest.get_pixel(0, 1), Some((0, 255, 0, 255)));
    assert_eq!(dest.get_pixel(1, 0), Some(RED));
    assert_eq!(dest.get_pixel(0, 2), Some(RED));
}

#[test]
fn out_of_bounds_destination_writes_nothing() {
    let context = SoftwareContext::new();
    let mut dest = filled(&context, 4, 4, RED);
    let source = filled(&context, 2, 2, BLUE);
    let before = dest.data().unwrap().to_vec();

    assert!(matches!(
        dest.copy(&source, 3, 0, None),
        Err(Error::OutOfBounds)
    ));
    assert!(matches!(
        dest.copy(&source, 0, 3, None),
        Err(Error::OutOfBounds)
    ));
    assert!(matches!(
        dest.copy(&source, u32::MAX, 0, None),
        Err(Error::OutOfBounds)
    ));

    assert_eq!(dest.data().unwrap(), &before[..]);
}

#[test]
fn out_of_bounds_source_rect_writes_nothing() {
    let context = SoftwareContext::new();
    let mut dest = filled(&context, 4, 4, RED);
    let source = filled(&context, 2, 2, BLUE);
    let before = dest.data().unwrap().to_vec();

    let result = dest.copy(&source, 0, 0, Some(PixelRect::new(1, 1, 2, 2)));
    assert!(matches!(result, Err(Error::OutOfBounds)));
    assert_eq!(dest.data().unwrap(), &before[..]);
}

#[test]
fn copy_requires_both_locks() {
    let context = SoftwareContext::new();
    let mut dest = filled(&context, 4, 4, RED);
    let mut source = filled(&context, 2, 2, BLUE);

    source.unlock();
    assert!(matches!(
        dest.copy(&source, 0, 0, None),
        Err(Error::NotLocked)
    ));
    assert_eq!(dest.get_pixel(0, 0), Some(RED));

    source.lock().unwrap();
    dest.unlock();
    assert!(matches!(
        dest.copy(&source, 0, 0, None),
        Err(Error::NotLocked)
    ));

    dest.lock().unwrap();
    assert_eq!(dest.get_pixel(0, 0), Some(RED));
}

#[test]
fn copied_pixels_are_committed_on_unlock() {
    let context = SoftwareContext::new().with_row_alignment(64);
    let mut dest = filled(&context, 4, 4, RED);
    let source = filled(&context, 2, 2, BLUE);

    dest.copy(&source, 2, 2, None).unwrap();
    dest.unlock();

    let committed = dest.resource().unwrap();
    assert_eq!(committed.pixel(3, 3), Some(0x0000_FFFF));
    assert_eq!(committed.pixel(0, 0), Some(0xFF00_00FF));
}
