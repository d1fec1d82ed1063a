use image::ImageFormat;
use rfd::FileDialog;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::AppError;
use crate::state::data::PendingImage;

/// Extensions offered by the file picker
const PICKER_EXTENSIONS: [&str; 13] = [
    "jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff", "avif", "svg", "heic", "heif",
    "jxl",
];

/// Image types the `image` crate does not decode but the server may still accept
const EXTRA_IMAGE_TYPES: [(&str, &str); 4] = [
    ("svg", "image/svg+xml"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
    ("jxl", "image/jxl"),
];

/// MIME type used when a picked file's type cannot be told from its name
const FALLBACK_MIME: &str = "application/octet-stream";

/// MIME type of an image file, judged by its extension.
/// Returns None for anything that is not an image.
pub fn image_mime(path: &Path) -> Option<&'static str> {
    let known = ImageFormat::from_path(path)
        .ok()
        .map(|format| format.to_mime_type())
        .filter(|mime| mime.starts_with("image/"));
    if known.is_some() {
        return known;
    }

    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    EXTRA_IMAGE_TYPES
        .iter()
        .find(|(extra, _)| *extra == ext)
        .map(|(_, mime)| *mime)
}

/// Filter a drop down to image files.
///
/// Dropped directories are walked recursively. Order follows the drop,
/// with directory contents sorted by name.
pub fn collect_dropped(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let entry_path = entry.path();
                if entry_path.is_file() && image_mime(entry_path).is_some() {
                    images.push(entry_path.to_path_buf());
                }
            }
        } else if image_mime(path).is_some() {
            images.push(path.clone());
        } else {
            debug!(path = %path.display(), "skipping non-image drop");
        }
    }

    images
}

/// Same as `collect_dropped`, but an empty result is an error
pub fn accept_drop(paths: &[PathBuf]) -> Result<Vec<PathBuf>, AppError> {
    let images = collect_dropped(paths);
    if images.is_empty() {
        return Err(AppError::NoImages);
    }
    info!(dropped = paths.len(), accepted = images.len(), "files dropped");
    Ok(images)
}

/// Show the native multi-file picker.
/// Returns None when the dialog is cancelled.
pub fn pick_images() -> Option<Vec<PathBuf>> {
    FileDialog::new()
        .set_title("Select Images")
        .add_filter("Images", &PICKER_EXTENSIONS[..])
        .pick_files()
        .filter(|paths| !paths.is_empty())
}

/// Read every file of a batch. Each entry fails on its own.
pub async fn load_batch(paths: Vec<PathBuf>) -> Vec<Result<PendingImage, AppError>> {
    let mut loaded = Vec::with_capacity(paths.len());
    for path in paths {
        loaded.push(load_file(&path).await);
    }
    loaded
}

async fn load_file(path: &Path) -> Result<PendingImage, AppError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| AppError::FileRead {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let filename = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    Ok(PendingImage {
        filename,
        bytes,
        mime: image_mime(path).unwrap_or(FALLBACK_MIME).to_string(),
    })
}
