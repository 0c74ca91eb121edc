use std::{
    fs, io,
    path::{Path, PathBuf},
};

use image::ImageError;
use log::warn;
use oxipng::{self, InFile, OutFile};
use thiserror::Error;

use crate::graphics::bitmap::Bitmap;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("bitmap buffer does not match {width}x{height}")]
    InvalidBuffer { width: u32, height: u32 },

    #[error("failed to save {path}: {source}")]
    Image { path: PathBuf, source: ImageError },

    #[error("failed to prepare {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Writes a decoded bitmap to disk
pub trait ImageEncoder {
    fn encode(&self, bitmap: &Bitmap, path: &Path) -> Result<(), EncodeError>;
}

#[derive(Debug, Clone, Default)]
pub struct PngEncoder {
    /// Re-compress every file with oxipng after saving.
    pub optimise: bool,
}

impl PngEncoder {
    pub fn new(optimise: bool) -> Self {
        PngEncoder { optimise }
    }
}

impl ImageEncoder for PngEncoder {
    fn encode(&self, bitmap: &Bitmap, path: &Path) -> Result<(), EncodeError> {
        let image = bitmap.to_rgba_image().ok_or(EncodeError::InvalidBuffer {
            width: bitmap.width(),
            height: bitmap.height(),
        })?;

        if !self.optimise {
            return image.save(path).map_err(|source| EncodeError::Image {
                path: path.to_path_buf(),
                source,
            });
        }

        let temp_path = path.with_extension("temp.png");
        image.save(&temp_path).map_err(|source| EncodeError::Image {
            path: temp_path.clone(),
            source,
        })?;

        let result = optimise_png(&temp_path, path);
        finish_optimised(result, &temp_path, path)
    }
}

/// Keeps the optimised file, or falls back to the plain encoding at `temp_path`
/// when oxipng failed. Anything already at `path` is replaced either way.
fn finish_optimised(
    result: Result<(), String>,
    temp_path: &Path,
    path: &Path,
) -> Result<(), EncodeError> {
    if let Err(e) = result {
        warn!("PNG optimisation failed for {}: {}", path.display(), e);
        return fs::rename(temp_path, path).map_err(|source| EncodeError::Io {
            path: path.to_path_buf(),
            source,
        });
    }

    if let Err(e) = fs::remove_file(temp_path) {
        warn!(
            "Failed to remove temporary file {}: {}",
            temp_path.display(),
            e
        );
    }

    Ok(())
}

fn optimise_png(in_path: &Path, out_path: &Path) -> Result<(), String> {
    let mut options = oxipng::Options::from_preset(2);
    options.bit_depth_reduction = true;

    oxipng::optimize(
        &InFile::Path(in_path.to_path_buf()),
        &OutFile::Path(Some(out_path.to_path_buf())),
        &options,
    )
    .map_err(|e| format!("PNG optimisation failed: {}", e))
}
