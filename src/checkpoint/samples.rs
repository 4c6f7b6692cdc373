use image::{Rgb, RgbImage};
use machine_learning::MlErr;
use ndarray::ArrayView2;

use crate::Result;

/// Tiles a batch of generated images into one vertical strip.
///
/// Every row of `images` is a channel-major `3×size×size` image in `[-1, 1]`, the strip is `size`
/// pixels wide and `size × n` pixels high.
pub fn render_sample_strip(images: ArrayView2<f32>, size: usize) -> Result<RgbImage> {
    let area = size * size;
    if images.ncols() != 3 * area {
        return Err(MlErr::SizeMismatch {
            what: "sample image",
            got: images.ncols(),
            expected: 3 * area,
        }
        .into());
    }

    let side = size as u32;
    let mut strip = RgbImage::new(side, side * images.nrows() as u32);

    for (k, image) in images.rows().into_iter().enumerate() {
        for offset in 0..area {
            let pixel = Rgb([0, 1, 2].map(|c| to_byte(image[c * area + offset])));
            let (x, y) = ((offset % size) as u32, (k * size + offset / size) as u32);
            strip.put_pixel(x, y, pixel);
        }
    }

    Ok(strip)
}

/// Maps `[-1, 1]` to `[0, 255]`.
fn to_byte(v: f32) -> u8 {
    ((v + 1.) * 127.5).round().clamp(0., 255.) as u8
}
