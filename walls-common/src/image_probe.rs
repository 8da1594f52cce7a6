use image::{ImageFormat, ImageReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{ImageError, StorageError, WallsError};
use crate::Result;

// no avif: decoding it needs the native dav1d library
const SUPPORTED_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp"];

/// Header-level facts about an image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Preferred file extension for the detected format
    pub extension: String,
    pub mime_type: String,
}

pub trait ImageProbe {
    fn probe(&self, path: &Path) -> Result<ImageInfo>;
}

/// Sniffs the format from magic bytes and decodes only the header for dimensions.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderProbe;

impl ImageProbe for HeaderProbe {
    fn probe(&self, path: &Path) -> Result<ImageInfo> {
        let reader = ImageReader::open(path)
            .map_err(|source| {
                WallsError::Image(ImageError::Open {
                    path: path.to_path_buf(),
                    source,
                })
            })?
            .with_guessed_format()
            .map_err(|source| {
                WallsError::Image(ImageError::Open {
                    path: path.to_path_buf(),
                    source,
                })
            })?;

        let format = reader.format().ok_or_else(|| {
            WallsError::Image(ImageError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        })?;

        let (width, height) = reader.into_dimensions().map_err(|e| {
            WallsError::Image(ImageError::Decode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        })?;

        if width == 0 || height == 0 {
            return Err(WallsError::Image(ImageError::Decode {
                path: path.to_path_buf(),
                message: format!("image has an empty resolution {}x{}", width, height),
            }));
        }

        let info = ImageInfo {
            width,
            height,
            extension: format_extension(format).to_string(),
            mime_type: format.to_mime_type().to_string(),
        };
        log::debug!("Probed {:?}: {:?}", path, info);
        Ok(info)
    }
}

fn format_extension(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        other => other.extensions_str().first().copied().unwrap_or("img"),
    }
}

pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Recursively collects files with a supported image extension, sorted by path.
pub fn discover_images(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Err(WallsError::Storage(StorageError::DirectoryRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "Path is not a directory"),
        }));
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(path).follow_links(true).into_iter() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {:?}: {}", path, e);
                continue;
            }
        };
        let entry_path = entry.path();
        if entry.file_type().is_file() && is_supported_extension(entry_path) {
            images.push(entry_path.to_path_buf());
        }
    }

    if images.is_empty() {
        return Err(WallsError::Image(ImageError::NoImagesFound {
            path: path.to_path_buf(),
        }));
    }

    images.sort();
    log::debug!("Discovered {} images in {:?}", images.len(), path);
    Ok(images)
}
