//! Recipe image decoding.
//!
//! Recipe images arrive inline as base64 `data:` URIs
//! (`data:image/png;base64,iVBORw0...`). The payload is decoded and its real
//! format is detected from the bytes, not trusted from the URI header.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, ImageReader};

use crate::types::RecipeImage;

/// Allowed image formats for recipe images.
pub const ALLOWED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Maximum decoded size for a recipe image (5MB).
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Decode a base64 `data:` URI into image bytes with a detected content type.
pub fn decode_data_uri(uri: &str) -> Result<RecipeImage, String> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| "Image must be a data: URI".to_string())?;

    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| "Malformed data: URI".to_string())?;

    let declared = meta
        .strip_suffix(";base64")
        .ok_or_else(|| "Image data must be base64-encoded".to_string())?;
    if !declared.starts_with("image/") {
        return Err(format!("Unsupported media type: {}", declared));
    }

    let data = STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("Invalid base64 image data: {}", e))?;

    if data.is_empty() {
        return Err("Image data is empty".to_string());
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(format!(
            "Image too large: {} bytes (max {})",
            data.len(),
            MAX_FILE_SIZE
        ));
    }

    let content_type = validate_image(&data)?;
    Ok(RecipeImage { content_type, data })
}

/// Check the format is allowed and return its content type (e.g. "image/png").
pub fn validate_image(data: &[u8]) -> Result<String, String> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| format!("Failed to read image: {}", e))?;

    let format = reader
        .format()
        .ok_or_else(|| "Could not detect image format".to_string())?;

    if !ALLOWED_FORMATS.contains(&format) {
        return Err(format!(
            "Unsupported image format: {:?}. Allowed: JPEG, PNG, GIF, WebP",
            format
        ));
    }

    Ok(format.to_mime_type().to_string())
}

/// Encode bytes as a `data:` URI. Mostly useful for building requests in tests.
pub fn encode_data_uri(content_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(data))
}

#[cfg(test)]
pub(crate) fn tiny_png() -> Vec<u8> {
    let img = image::RgbImage::new(1, 1);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .expect("encode 1x1 png");
    out.into_inner()
}
