//! Class mask synthesis from label and quality windows.
//!
//! | Mode | label > 0 | quality == 1 | quality > 1 |
//! |------|-----------|--------------|-------------|
//! | Binary | 1 | 0 | 0 |
//! | Multiclass | 3 | 1 | 2 |
//!
//! Quality always overrides the label.

use ndarray::Zip;

use super::SampleError;
use crate::raster::Raster;

/// Mask encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskMode {
    /// `{0, 1}`: positive label on a clean pixel.
    #[default]
    Binary,
    /// `{0, 1, 2, 3}`: background, quality class 1, quality class > 1,
    /// positive label.
    Multiclass,
}

impl MaskMode {
    /// Composites one label pixel with its quality pixel.
    pub fn composite(self, label: f32, quality: f32) -> f32 {
        match self {
            MaskMode::Binary => {
                if quality >= 1.0 {
                    0.0
                } else if label > 0.0 {
                    1.0
                } else {
                    label
                }
            }
            MaskMode::Multiclass => {
                if quality > 1.0 {
                    2.0
                } else if quality == 1.0 {
                    1.0
                } else if label > 0.0 {
                    3.0
                } else {
                    label
                }
            }
        }
    }
}

/// Writes the class mask into a label window.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskSynthesizer {
    mode: MaskMode,
}

impl MaskSynthesizer {
    pub fn new(mode: MaskMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> MaskMode {
        self.mode
    }

    /// Overwrites band 0 of `label` with the composited mask.
    ///
    /// # Returns
    ///
    /// `true` when every resulting pixel is 0.
    pub fn apply(
        &self,
        scene_id: &str,
        label: &mut Raster,
        quality: &Raster,
    ) -> Result<bool, SampleError> {
        let label_shape = (label.height(), label.width());
        let quality_shape = (quality.height(), quality.width());
        if label_shape != quality_shape {
            return Err(SampleError::ShapeMismatch {
                scene_id: scene_id.to_string(),
                label: label_shape,
                quality: quality_shape,
            });
        }

        let mode = self.mode;
        let mut mask = label.band_mut(0);
        Zip::from(&mut mask)
            .and(&quality.band(0))
            .for_each(|l, &q| *l = mode.composite(*l, q));

        Ok(mask.iter().all(|&v| v == 0.0))
    }
}
