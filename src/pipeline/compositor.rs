use image::RgbaImage;
use std::borrow::Cow;

use super::error::{CursorError, Result};

fn check_size(image: &RgbaImage, resolution: u32) -> Result<()> {
    if image.width() != resolution || image.height() != resolution {
        return Err(CursorError::ResolutionMismatch {
            expected: resolution,
            width: image.width(),
            height: image.height(),
        });
    }
    Ok(())
}

/// `(src * mask + dst * (255 - mask)) / 255`, rounded.
fn paste_channel(src: u8, dst: u8, mask: u8) -> u8 {
    let mask = mask as u32;
    let v = dst as u32 * (255 - mask) + src as u32 * mask + 128;
    (((v >> 8) + v) >> 8) as u8
}

/// Places an animation frame over the optional always-visible layer.
///
/// The frame's alpha channel is the paste mask: opaque frame pixels replace
/// the static pixel, transparent ones leave it untouched, and partial alpha
/// interpolates every channel (alpha included) between the two. This is a
/// masked paste, not "over" compositing.
pub fn composite_frame<'a>(
    frame: &'a RgbaImage,
    static_layer: Option<&RgbaImage>,
    resolution: u32,
) -> Result<Cow<'a, RgbaImage>> {
    check_size(frame, resolution)?;
    let Some(static_layer) = static_layer else {
        return Ok(Cow::Borrowed(frame));
    };
    check_size(static_layer, resolution)?;

    // The static layer covers the whole canvas, so it is the starting canvas.
    let mut canvas = static_layer.clone();
    for (dst, src) in canvas.pixels_mut().zip(frame.pixels()) {
        let mask = src[3];
        for c in 0..4 {
            dst[c] = paste_channel(src[c], dst[c], mask);
        }
    }

    Ok(Cow::Owned(canvas))
}
