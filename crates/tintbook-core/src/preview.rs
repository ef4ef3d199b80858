//! Thumbnail capture for saved progress.

use base64::{Engine, engine::general_purpose::STANDARD};
use image::RgbaImage;
use thiserror::Error;

/// Prefix of every preview data URL.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Preview image has no pixels")]
    Empty,
    #[error("PNG encoding failed: {0}")]
    Encoding(#[from] png::EncodingError),
}

/// Encode an RGBA raster as an 8-bit PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, PreviewError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PreviewError::Empty);
    }

    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(image.as_raw())?;
        writer.finish()?;
    }
    Ok(png_data)
}

/// Capture `image` as a `data:image/png;base64,...` URL.
pub fn capture_preview(image: &RgbaImage) -> Result<String, PreviewError> {
    let png_data = encode_png(image)?;
    Ok(format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(png_data)))
}

/// Best-effort capture: failures are logged and yield `None` so the save
/// goes ahead without a preview.
pub fn try_capture_preview(image: Option<&RgbaImage>) -> Option<String> {
    match capture_preview(image?) {
        Ok(url) => Some(url),
        Err(e) => {
            log::warn!("Skipping preview: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_capture_round_trips_through_png() {
        let image = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let url = capture_preview(&image).unwrap();
        assert!(url.starts_with(PNG_DATA_URL_PREFIX));

        let bytes = STANDARD.decode(&url[PNG_DATA_URL_PREFIX.len()..]).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_empty_image_is_skipped() {
        let empty = RgbaImage::new(0, 0);
        assert!(matches!(capture_preview(&empty), Err(PreviewError::Empty)));
        assert_eq!(try_capture_preview(Some(&empty)), None);
        assert_eq!(try_capture_preview(None), None);
    }
}
