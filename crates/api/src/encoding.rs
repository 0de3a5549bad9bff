use anyhow::Context;
use base64::{Engine, engine::general_purpose::STANDARD};
use image::RgbImage;
use std::io::Cursor;

/// Decode an uploaded file into an RGB raster, guessing the format from its bytes.
pub fn decode_image(bytes: &[u8]) -> anyhow::Result<RgbImage> {
    let image = image::load_from_memory(bytes).context("Failed to decode image")?;
    Ok(image.to_rgb8())
}

pub fn encode_jpeg(image: &RgbImage) -> anyhow::Result<Vec<u8>> {
    let mut jpeg_bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut jpeg_bytes, image::ImageFormat::Jpeg)
        .context("Failed to encode annotated image")?;

    Ok(jpeg_bytes.into_inner())
}

/// JPEG-encode `image` and wrap it in standard base64 for the JSON response.
pub fn encode_base64_jpeg(image: &RgbImage) -> anyhow::Result<String> {
    Ok(STANDARD.encode(encode_jpeg(image)?))
}
