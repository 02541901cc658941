use crate::{
    algorithms::{ContrastBoost, Dilate, GaussianBlur},
    engine::MaskParams,
    pipeline::SoftEdgePipeline,
    traits::MaskFilter,
};

/// Builder for soft-edge pipelines with a fluent API
pub struct SoftEdgePipelineBuilder {
    filters: Vec<Box<dyn MaskFilter>>,
}

impl SoftEdgePipelineBuilder {
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    /// Append an arbitrary filter
    pub fn add_filter<F>(mut self, filter: F) -> Self
    where
        F: MaskFilter + 'static,
    {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn gaussian_blur(self, ksize: u32) -> Self {
        self.add_filter(GaussianBlur { ksize })
    }

    pub fn dilate(self, ksize: u32) -> Self {
        self.add_filter(Dilate { ksize })
    }

    pub fn contrast_boost(self, factor: f64) -> Self {
        self.add_filter(ContrastBoost { factor })
    }

    /// Blur, dilate to recover corners, blur again, then boost contrast.
    pub fn with_params(self, params: &MaskParams) -> Self {
        self.gaussian_blur(params.first_blur)
            .dilate(params.corner_dilate)
            .gaussian_blur(params.final_blur)
            .contrast_boost(params.contrast)
    }

    pub fn build(self) -> SoftEdgePipeline {
        SoftEdgePipeline::new(self.filters)
    }
}

impl Default for SoftEdgePipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
