use image::{DynamicImage, ImageFormat};

#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unrecognised image format")]
    UnknownFormat,
    #[error("failed to decode {format:?} image: {message}")]
    DecodeFailure { format: ImageFormat, message: String },
}

/// Decode raw bytes using: Content-Type media type -> magic bytes.
///
/// A wrong or generic Content-Type falls back to sniffing the bytes.
pub fn decode_image(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedImage, DecodeError> {
    // 1) Content-Type header
    if let Some(format) = content_type.and_then(format_from_content_type) {
        if let Ok(decoded) = decode_with(bytes, format) {
            return Ok(decoded);
        }
    }

    // 2) Magic bytes
    let format = image::guess_format(bytes).map_err(|_| DecodeError::UnknownFormat)?;
    decode_with(bytes, format)
}

fn format_from_content_type(content_type: &str) -> Option<ImageFormat> {
    let media_type = content_type.split(';').next()?.trim();
    ImageFormat::from_mime_type(media_type)
}

fn decode_with(bytes: &[u8], format: ImageFormat) -> Result<DecodedImage, DecodeError> {
    let image = image::load_from_memory_with_format(bytes, format).map_err(|err| {
        DecodeError::DecodeFailure {
            format,
            message: err.to_string(),
        }
    })?;
    Ok(DecodedImage { image, format })
}
