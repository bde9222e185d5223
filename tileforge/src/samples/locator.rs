//! Matching scene ids to delivered files.

use std::fmt;

use tracing::debug;

use super::SampleError;
use crate::storage::file_name;

/// Role of a delivered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Quality,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Image => write!(f, "image"),
            AssetKind::Quality => write!(f, "quality"),
        }
    }
}

/// Files located for one scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedAssets {
    pub scene_id: String,
    pub image: String,
    pub quality: Option<String>,
}

/// Finds each scene's image and quality file among delivered paths.
///
/// A file belongs to a scene when its name starts with the scene id. It is
/// the quality layer when the part of its name before the first `.` ends
/// with the quality suffix, and the image otherwise.
#[derive(Debug, Clone)]
pub struct AssetLocator {
    quality_suffix: String,
}

impl AssetLocator {
    pub fn new(quality_suffix: impl Into<String>) -> Self {
        Self {
            quality_suffix: quality_suffix.into(),
        }
    }

    fn is_quality(&self, name: &str) -> bool {
        let stem = name.split('.').next().unwrap_or(name);
        stem.ends_with(&self.quality_suffix)
    }

    /// Locates the files of one scene.
    ///
    /// A missing image is always an error; a missing quality file only when
    /// `require_quality` is set. More than one candidate for either role is
    /// an error.
    pub fn locate(
        &self,
        scene_id: &str,
        paths: &[String],
        require_quality: bool,
    ) -> Result<LocatedAssets, SampleError> {
        let (quality, image): (Vec<&String>, Vec<&String>) = paths
            .iter()
            .filter(|p| file_name(p).starts_with(scene_id))
            .partition(|p| self.is_quality(file_name(p)));

        let image = single(scene_id, AssetKind::Image, image)?.ok_or_else(|| {
            SampleError::MissingAsset {
                scene_id: scene_id.to_string(),
                kind: AssetKind::Image,
            }
        })?;
        let quality = single(scene_id, AssetKind::Quality, quality)?;
        if require_quality && quality.is_none() {
            return Err(SampleError::MissingAsset {
                scene_id: scene_id.to_string(),
                kind: AssetKind::Quality,
            });
        }

        debug!(scene_id = scene_id, image = %image, quality = ?quality, "Located assets");
        Ok(LocatedAssets {
            scene_id: scene_id.to_string(),
            image,
            quality,
        })
    }

    /// Locates every scene, in order, stopping at the first failure.
    pub fn locate_all<'a>(
        &'a self,
        scene_ids: &'a [String],
        paths: &'a [String],
        require_quality: bool,
    ) -> impl Iterator<Item = Result<LocatedAssets, SampleError>> + 'a {
        scene_ids
            .iter()
            .map(move |id| self.locate(id, paths, require_quality))
    }
}

fn single(
    scene_id: &str,
    kind: AssetKind,
    candidates: Vec<&String>,
) -> Result<Option<String>, SampleError> {
    match candidates.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some((*only).clone())),
        many => Err(SampleError::AmbiguousAsset {
            scene_id: scene_id.to_string(),
            kind,
            paths: many.iter().map(|p| p.to_string()).collect(),
        }),
    }
}
