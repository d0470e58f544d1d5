//! Image Normalizer (C1, §4.1): decode, auto-orient, apply user transforms,
//! resize to max 2560, re-encode as PNG.
//!
//! Grounded on `original_source/server/vision/image_processor.py`'s
//! `ImageProcessor` (same `MAX_DIMENSION`, same RGBA/LA/P-onto-white flatten,
//! same Lanczos resize). HEIC is accepted at the declared-MIME-type stage but
//! the `image` crate has no HEIC decoder, so a HEIC payload that fails to
//! decode surfaces as `UnsupportedMedia` rather than panicking (this repo has
//! no libheif binding to reach for — see DESIGN.md).

use crate::error::{ImageError, Result};
use crate::types::{ProcessedImage, TransformRequest};
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

const MAX_DIMENSION: u32 = 2560;
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const ALLOWED_MIME: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/heic"];

pub fn process(
    bytes: &[u8],
    declared_mime: &str,
    transform: &TransformRequest,
) -> Result<ProcessedImage> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ImageError::TooLarge(bytes.len()));
    }
    if !ALLOWED_MIME.contains(&declared_mime) {
        return Err(ImageError::UnsupportedMedia(declared_mime.to_string()));
    }

    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageError::Io(e))?;
    let original_format = reader
        .format()
        .map(format_name)
        .unwrap_or_else(|| "unknown".to_string());
    let mut img = reader
        .decode()
        .map_err(|_| ImageError::UnsupportedMedia(declared_mime.to_string()))?;

    let original_dims = img.dimensions();
    let mut transformations_applied = Vec::new();

    let exif_orientation = extract_exif_orientation(bytes);
    if transform.apply_exif_rotation {
        if let Some(rotated) = apply_exif_orientation(&img, exif_orientation) {
            img = rotated;
            transformations_applied.push(format!("exif_orientation:{exif_orientation}"));
        }
    }

    if let Some(rotation) = transform.rotation {
        img = apply_rotation(img, rotation)?;
        transformations_applied.push(format!("rotation:{rotation}"));
    }

    if let Some(crop) = transform.crop {
        let (w, h) = img.dimensions();
        if crop.x + crop.w > w || crop.y + crop.h > h || crop.w == 0 || crop.h == 0 {
            return Err(ImageError::InvalidTransform(format!(
                "crop {:?} out of bounds for image {}x{}",
                crop, w, h
            )));
        }
        img = img.crop_imm(crop.x, crop.y, crop.w, crop.h);
        transformations_applied.push(format!(
            "crop:{},{},{},{}",
            crop.x, crop.y, crop.w, crop.h
        ));
    }

    img = flatten_onto_white(img);

    let was_resized = max_side(img.dimensions()) > MAX_DIMENSION;
    if was_resized {
        img = img.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3);
    }

    let processed_dims = img.dimensions();
    let was_converted = original_format.to_uppercase() != "PNG";

    let mut png_bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| ImageError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

    Ok(ProcessedImage {
        png_bytes,
        original_format,
        original_dims,
        processed_dims,
        transformations_applied,
        exif_orientation,
        was_resized,
        was_converted,
    })
}

fn format_name(fmt: ImageFormat) -> String {
    match fmt {
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::WebP => "WEBP".to_string(),
        other => format!("{:?}", other).to_uppercase(),
    }
}

fn max_side(dims: (u32, u32)) -> u32 {
    dims.0.max(dims.1)
}

fn apply_rotation(img: DynamicImage, rotation: u16) -> Result<DynamicImage> {
    match rotation {
        0 => Ok(img),
        90 => Ok(img.rotate90()),
        180 => Ok(img.rotate180()),
        270 => Ok(img.rotate270()),
        other => Err(ImageError::InvalidTransform(format!(
            "rotation must be one of 0/90/180/270, got {other}"
        ))),
    }
}

/// EXIF orientation tag `0x0112`; returns 1 (no transform) when absent or
/// unparseable.
fn extract_exif_orientation(bytes: &[u8]) -> u16 {
    let mut cursor = Cursor::new(bytes);
    let reader = exif::Reader::new();
    let exif = match reader.read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(_) => return 1,
    };
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .map(|v| v as u16)
        .unwrap_or(1)
}

/// Applies the 180/270/90 rotation implied by EXIF orientations 3/6/8
/// (§4.1 step 2); other orientation values are left untouched.
fn apply_exif_orientation(img: &DynamicImage, orientation: u16) -> Option<DynamicImage> {
    match orientation {
        3 => Some(img.rotate180()),
        6 => Some(img.rotate90()),
        8 => Some(img.rotate270()),
        _ => None,
    }
}

/// Flattens RGBA/LA/palette transparency onto a white background and
/// converts to RGB (§4.1 step 5).
fn flatten_onto_white(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) => img,
        _ => {
            let rgba = img.to_rgba8();
            let (w, h) = rgba.dimensions();
            let mut out = image::RgbImage::from_pixel(w, h, image::Rgb([255, 255, 255]));
            for (x, y, pixel) in rgba.enumerate_pixels() {
                let [r, g, b, a] = pixel.0;
                if a == 255 {
                    out.put_pixel(x, y, image::Rgb([r, g, b]));
                } else if a > 0 {
                    let alpha = a as f32 / 255.0;
                    let blend = |channel: u8| -> u8 {
                        ((channel as f32 * alpha) + (255.0 * (1.0 - alpha))) as u8
                    };
                    out.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
                }
            }
            DynamicImage::ImageRgb8(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_fixture(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn max_side_exactly_2560_is_not_resized() {
        let bytes = png_fixture(2560, 1000);
        let processed = process(&bytes, "image/png", &TransformRequest::default()).unwrap();
        assert!(!processed.was_resized);
        assert_eq!(processed.processed_dims, (2560, 1000));
    }

    #[test]
    fn oversize_side_is_resized_preserving_aspect() {
        let bytes = png_fixture(5120, 2560);
        let processed = process(&bytes, "image/png", &TransformRequest::default()).unwrap();
        assert!(processed.was_resized);
        assert_eq!(max_side(processed.processed_dims), 2560);
        assert_eq!(processed.processed_dims.0, processed.processed_dims.1 * 2);
    }

    #[test]
    fn crop_equal_to_full_dims_is_a_noop() {
        let bytes = png_fixture(100, 50);
        let transform = TransformRequest {
            crop: Some(crate::types::Crop { x: 0, y: 0, w: 100, h: 50 }),
            ..Default::default()
        };
        let processed = process(&bytes, "image/png", &transform).unwrap();
        assert_eq!(processed.processed_dims, (100, 50));
    }

    #[test]
    fn crop_out_of_bounds_is_invalid_transform() {
        let bytes = png_fixture(100, 50);
        let transform = TransformRequest {
            crop: Some(crate::types::Crop { x: 0, y: 0, w: 200, h: 50 }),
            ..Default::default()
        };
        let err = process(&bytes, "image/png", &transform).unwrap_err();
        assert!(matches!(err, ImageError::InvalidTransform(_)));
    }

    #[test]
    fn invalid_rotation_is_rejected() {
        let bytes = png_fixture(10, 10);
        let transform = TransformRequest {
            rotation: Some(45),
            ..Default::default()
        };
        let err = process(&bytes, "image/png", &transform).unwrap_err();
        assert!(matches!(err, ImageError::InvalidTransform(_)));
    }

    #[test]
    fn oversize_upload_is_rejected() {
        let bytes = vec![0u8; 21 * 1024 * 1024];
        let err = process(&bytes, "image/jpeg", &TransformRequest::default()).unwrap_err();
        assert!(matches!(err, ImageError::TooLarge(_)));
    }
}
