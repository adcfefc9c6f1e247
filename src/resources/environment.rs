use anyhow::Context as _;
use image::{ImageFormat, Rgba32FImage, imageops::FilterType};

use crate::resources::load_binary;

/// Decode a Radiance HDR panorama, downsizing it to fit `max_dimension`
/// while keeping the aspect ratio.
pub fn decode_hdr(bytes: &[u8], max_dimension: u32) -> anyhow::Result<Rgba32FImage> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Hdr)
        .context("decoding HDR environment")?;
    let max_dimension = max_dimension.max(1);
    let img = if img.width() > max_dimension || img.height() > max_dimension {
        log::info!(
            "Downsizing {}x{} environment to fit {max_dimension}",
            img.width(),
            img.height()
        );
        img.resize(max_dimension, max_dimension, FilterType::Triangle)
    } else {
        img
    };
    Ok(img.to_rgba32f())
}

pub async fn load_environment(path: &str, max_dimension: u32) -> anyhow::Result<Rgba32FImage> {
    let bytes = load_binary(path).await?;
    decode_hdr(&bytes, max_dimension).with_context(|| format!("environment {path}"))
}
