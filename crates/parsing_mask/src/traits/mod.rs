use image::GrayImage;
use crate::error::Result;

/// A single image-to-image step applied to a grey-level mask.
pub trait MaskFilter: Send + Sync {
    /// Apply the filter, producing a new image of the same size
    fn apply(&self, image: &GrayImage) -> Result<GrayImage>;

    /// Short human-readable description used in logs
    fn describe(&self) -> String;
}
