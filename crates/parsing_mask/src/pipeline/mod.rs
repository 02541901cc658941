pub mod builder;

use image::GrayImage;
use tracing::trace;
use crate::{error::Result, traits::MaskFilter};

/// An ordered chain of grey-level filters applied to a scaled binary mask.
pub struct SoftEdgePipeline {
    filters: Vec<Box<dyn MaskFilter>>,
}

impl SoftEdgePipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::SoftEdgePipelineBuilder {
        builder::SoftEdgePipelineBuilder::new()
    }

    pub fn new(filters: Vec<Box<dyn MaskFilter>>) -> Self {
        Self { filters }
    }

    /// Run every filter in order
    pub fn process(&self, image: &GrayImage) -> Result<GrayImage> {
        let mut processed = image.clone();
        for filter in &self.filters {
            processed = filter.apply(&processed)?;
            trace!(step = %filter.describe(), "soft-edge step applied");
        }
        Ok(processed)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        let steps: Vec<String> = self.filters.iter().map(|f| f.describe()).collect();
        format!("SoftEdgePipeline: {} steps [{}]", steps.len(), steps.join(" -> "))
    }
}

impl std::fmt::Debug for SoftEdgePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.info())
    }
}
