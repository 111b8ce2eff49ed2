//! Resized copies of uploaded profile images.
//!
//! For an original at `media/profile_images/avatar.png` the variants are written
//! to `media/thumbnail/avatar.png`, `media/medium/avatar.png` and
//! `media/large/avatar.png`: one directory per size tier, next to the
//! original's directory, each holding a file with the original's name.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ImagingError {
    #[error("failed to read or decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to write image {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image path has no parent directory to place size tiers in: {0}")]
    NoTierRoot(PathBuf),
    #[error("image path has no file name: {0}")]
    NoFileName(PathBuf),
}

/// Output size tier. Each tier is a bounding box; variants fit within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeTier {
    Thumbnail,
    Medium,
    Large,
}

impl SizeTier {
    pub const ALL: [SizeTier; 3] = [SizeTier::Thumbnail, SizeTier::Medium, SizeTier::Large];

    pub fn dir_name(&self) -> &'static str {
        match self {
            SizeTier::Thumbnail => "thumbnail",
            SizeTier::Medium => "medium",
            SizeTier::Large => "large",
        }
    }

    /// `(max_width, max_height)` in pixels.
    pub fn bounds(&self) -> (u32, u32) {
        match self {
            SizeTier::Thumbnail => (100, 100),
            SizeTier::Medium => (300, 300),
            SizeTier::Large => (600, 600),
        }
    }
}

/// A written variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    pub tier: SizeTier,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Where the `tier` copy of `original` goes.
pub fn variant_path(original: &Path, tier: SizeTier) -> Result<PathBuf, ImagingError> {
    let file_name = original
        .file_name()
        .ok_or_else(|| ImagingError::NoFileName(original.to_path_buf()))?;
    let tier_root = original
        .parent()
        .and_then(Path::parent)
        .ok_or_else(|| ImagingError::NoTierRoot(original.to_path_buf()))?;

    Ok(tier_root.join(tier.dir_name()).join(file_name))
}

/// Largest size with the same aspect ratio that fits in `max_w`x`max_h`.
///
/// Images that already fit are left at their size (never upscaled).
pub fn fit_within(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if width <= max_w && height <= max_h {
        return (width, height);
    }

    let scale = f64::min(max_w as f64 / width as f64, max_h as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).clamp(1, max_w);
    let h = ((height as f64 * scale).round() as u32).clamp(1, max_h);
    (w, h)
}

/// Decode `original` and write one resized copy per tier, creating tier
/// directories as needed. Existing variant files are overwritten.
pub fn write_variants(original: &Path) -> Result<Vec<Variant>, ImagingError> {
    let source = image::open(original).map_err(|source| ImagingError::Decode {
        path: original.to_path_buf(),
        source,
    })?;

    let mut variants = Vec::with_capacity(SizeTier::ALL.len());

    for tier in SizeTier::ALL {
        let path = variant_path(original, tier)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| ImagingError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let (max_w, max_h) = tier.bounds();
        let (width, height) = fit_within(source.width(), source.height(), max_w, max_h);
        let resized = if (width, height) == (source.width(), source.height()) {
            source.clone()
        } else {
            source.resize_exact(width, height, FilterType::Lanczos3)
        };

        resized.save(&path).map_err(|source| ImagingError::Encode {
            path: path.clone(),
            source,
        })?;

        debug!(tier = tier.dir_name(), path = %path.display(), width, height, "saved image variant");
        variants.push(Variant {
            tier,
            path,
            width,
            height,
        });
    }

    Ok(variants)
}
