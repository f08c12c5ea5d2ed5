use image::{imageops, imageops::FilterType, DynamicImage, GrayImage, Luma, Rgb};
use ndarray::prelude::*;
use nshare::AsNdarray2;

use crate::errors::{EmotionError, Result};

/// Spatial resolution the classifier was trained on.
pub const INPUT_SIZE: u32 = 48;

/// Decode raw upload bytes, guessing the container format from its magic bytes.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| EmotionError::Decode {
        operation: "image decoding".to_string(),
        source: Box::new(e),
    })
}

/// Decode and preprocess in one step.
pub fn preprocess_bytes(bytes: &[u8]) -> Result<Array4<f32>> {
    Ok(preprocess(&decode(bytes)?))
}

/// Convert an image into the NHWC tensor the classifier consumes.
///
/// Output shape is `(1, INPUT_SIZE, INPUT_SIZE, 1)` with intensities in `[0, 1]`.
pub fn preprocess(image: &DynamicImage) -> Array4<f32> {
    let gray = to_luma(image);
    let gray = imageops::resize(&gray, INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom);

    gray.as_ndarray2()
        .mapv(|v| f32::from(v) / 255.0)
        .insert_axis(Axis(0))
        .insert_axis(Axis(3))
}

/// ITU-R 601-2 luma with alpha discarded, in 16-bit fixed point.
fn to_luma(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => {
            image.to_luma8()
        }
        _ => {
            let rgb = image.to_rgb8();
            GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let Rgb([r, g, b]) = *rgb.get_pixel(x, y);
                let l = (u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000)
                    >> 16;
                Luma([l as u8])
            })
        }
    }
}
