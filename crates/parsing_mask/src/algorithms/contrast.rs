use image::{GrayImage, Luma};
use imageproc::map::map_colors;
use crate::{error::{MaskError, Result}, traits::MaskFilter};

/// Multiply every sample by `factor`, clamp to `[0, 255]` and truncate.
///
/// Truncation (not rounding) is what makes a `1.3` boost leave `0` and `1`
/// untouched while pushing mid-tones up.
pub fn contrast_boost(image: &GrayImage, factor: f64) -> GrayImage {
    map_colors(image, |Luma([v])| {
        Luma([(v as f64 * factor).clamp(0.0, 255.0) as u8])
    })
}

/// Contrast boost step for the soft-edge chain.
#[derive(Debug, Clone)]
pub struct ContrastBoost {
    pub factor: f64,
}

impl Default for ContrastBoost {
    fn default() -> Self {
        Self { factor: 1.3 }
    }
}

impl MaskFilter for ContrastBoost {
    fn apply(&self, image: &GrayImage) -> Result<GrayImage> {
        if !self.factor.is_finite() || self.factor < 0.0 {
            return Err(MaskError::InvalidParams(format!(
                "contrast factor must be finite and non-negative, got {}",
                self.factor
            )));
        }
        Ok(contrast_boost(image, self.factor))
    }

    fn describe(&self) -> String {
        format!("contrast x{}", self.factor)
    }
}
