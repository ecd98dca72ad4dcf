//! Image normalization: decode, bound the dimensions, re-encode.
//!
//! Decoding and encoding are CPU-bound and run on the blocking pool. Every
//! decoded buffer is owned by the blocking closure and dropped when it
//! returns, on both the success and failure paths.

use std::io::Cursor;
use std::sync::Arc;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::debug;

use snapnote_core::defaults::{
    NORMALIZE_FORMAT, NORMALIZE_MAX_HEIGHT, NORMALIZE_MAX_WIDTH, NORMALIZE_QUALITY,
};
use snapnote_core::{Error, Result};

/// Normalization parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// Encoder quality in `(0, 1]`. Ignored for PNG.
    pub quality: f32,
    /// Output MIME type: `image/jpeg` or `image/png`.
    pub format: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_width: NORMALIZE_MAX_WIDTH,
            max_height: NORMALIZE_MAX_HEIGHT,
            quality: NORMALIZE_QUALITY,
            format: NORMALIZE_FORMAT.to_string(),
        }
    }
}

impl NormalizeOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(Error::Processing(
                "Maximum dimensions must be greater than 0".to_string(),
            ));
        }
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(Error::Processing(format!(
                "Quality must be in (0, 1], got {}",
                self.quality
            )));
        }
        output_format(&self.format)?;
        Ok(())
    }
}

/// A normalized image in both transport forms.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// Encoded bytes.
    pub binary: Vec<u8>,
    /// `data:<mime>;base64,<payload>` form of `binary`.
    pub data_url: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

fn output_format(mime: &str) -> Result<ImageFormat> {
    match mime {
        "image/jpeg" => Ok(ImageFormat::Jpeg),
        "image/png" => Ok(ImageFormat::Png),
        other => Err(Error::Processing(format!(
            "Unsupported output format: {}",
            other
        ))),
    }
}

/// Output dimensions for an image of `width`×`height` under the bounds.
///
/// Both sides are scaled by `min(max_w / w, max_h / h)` only when a bound is
/// exceeded; images are never upscaled. Fractional results are truncated.
pub fn target_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let ratio = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    let w = ((width as f64 * ratio) as u32).clamp(1, max_width);
    let h = ((height as f64 * ratio) as u32).clamp(1, max_height);
    (w, h)
}

/// Synchronous normalization. Prefer [`normalize`] from async code.
pub fn normalize_blocking(data: &[u8], options: &NormalizeOptions) -> Result<NormalizedImage> {
    options.validate()?;
    let format = output_format(&options.format)?;

    let decoded = image::load_from_memory(data)
        .map_err(|e| Error::Decode(format!("Failed to decode image: {}", e)))?;
    let (width, height) = decoded.dimensions();
    let (target_w, target_h) =
        target_dimensions(width, height, options.max_width, options.max_height);

    let resized = if (target_w, target_h) == (width, height) {
        decoded
    } else {
        decoded.resize_exact(target_w, target_h, FilterType::CatmullRom)
    };

    let binary = encode(&resized, format, options.quality)?;
    let data_url = format!(
        "data:{};base64,{}",
        options.format,
        base64::engine::general_purpose::STANDARD.encode(&binary)
    );

    debug!(
        subsystem = "pipeline",
        component = "normalizer",
        op = "normalize",
        source_width = width,
        source_height = height,
        width = target_w,
        height = target_h,
        size_bytes = binary.len(),
        "Image normalized"
    );

    Ok(NormalizedImage {
        binary,
        data_url,
        mime_type: options.format.clone(),
        width: target_w,
        height: target_h,
    })
}

fn encode(image: &DynamicImage, format: ImageFormat, quality: f32) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = image.to_rgb8();
            let quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
            encoder
                .encode_image(&rgb)
                .map_err(|e| Error::Processing(format!("Failed to encode JPEG: {}", e)))?;
        }
        other => {
            image
                .write_to(&mut Cursor::new(&mut buffer), other)
                .map_err(|e| Error::Processing(format!("Failed to encode image: {}", e)))?;
        }
    }
    Ok(buffer)
}

/// Decode, bound, and re-encode an image on the blocking pool.
pub async fn normalize(data: Arc<[u8]>, options: &NormalizeOptions) -> Result<NormalizedImage> {
    let options = options.clone();
    tokio::task::spawn_blocking(move || normalize_blocking(&data, &options))
        .await
        .map_err(|e| Error::Processing(format!("Normalization task failed: {}", e)))?
}
