use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    buffer::{ImageState, PixelBuffer},
    foundation::error::{ChanError, ChanResult},
};

pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

fn format_for(path: &Path) -> ChanResult<image::ImageFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok(image::ImageFormat::Png),
        "jpg" | "jpeg" => Ok(image::ImageFormat::Jpeg),
        _ => Err(ChanError::parameter(format!(
            "unsupported image type '{}' (expected one of {})",
            path.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        ))),
    }
}

/// Decode a PNG or JPEG into a fresh state with default order and identity.
pub fn load_image(path: &Path) -> ChanResult<ImageState> {
    let format = format_for(path)?;
    let mut reader = image::ImageReader::open(path)
        .with_context(|| format!("open image '{}'", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("sniff image '{}'", path.display()))?;
    if reader.format().is_none() {
        reader.set_format(format);
    }
    let decoded = reader
        .decode()
        .with_context(|| format!("decode image '{}'", path.display()))?;
    Ok(ImageState::new(PixelBuffer::from_rgb_image(&decoded.to_rgb8())))
}

/// Encode `buffer` as the format implied by `path`'s extension.
pub fn save_image(buffer: &PixelBuffer, path: &Path) -> ChanResult<()> {
    let format = format_for(path)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    buffer
        .to_rgb_image()
        .save_with_format(path, format)
        .with_context(|| format!("write image '{}'", path.display()))?;
    Ok(())
}

/// `photo.png` becomes `photo-modified.png`.
pub fn modified_file_name(path: &Path) -> ChanResult<PathBuf> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ChanError::parameter(format!("no file name in '{}'", path.display())))?;
    format_for(path)?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    Ok(PathBuf::from(format!("{stem}-modified.{ext}")))
}
