//! Inpainting mask generation from a human-parsing map.
//!
//! The generator expands the target labels to cover shadows and folds, pulls
//! in adjacent skin, clips everything to the person's silhouette, keeps the
//! head out, lets hair lying on the torso back in, and finally softens the
//! edges into a 0-255 gradient.

use image::GrayImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    error::{MaskError, Result},
    labels::{Label, LabelSet},
    pipeline::SoftEdgePipeline,
    types::{BinaryMask, SegmentationMap},
};

/// Kernel sizes and gain of each stage.
///
/// The defaults are the tuned values; changing them changes output quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MaskParams {
    /// Square dilation of the target labels (shadows, folds)
    pub target_expand: u32,
    /// Erosion applied to body pixels inside the expanded target
    pub body_erode: u32,
    /// Dilation of the whole person used as a hard clip
    pub silhouette_buffer: u32,
    /// Dilation of the body labels approximating the torso zone
    pub torso_expand: u32,
    /// Dilation of the face protecting it from hair restoration
    pub face_buffer: u32,
    /// First Gaussian blur (odd)
    pub first_blur: u32,
    /// Grey-level dilation between the two blurs
    pub corner_dilate: u32,
    /// Final Gaussian blur (odd)
    pub final_blur: u32,
    /// Gain applied after blurring, saturating at 255
    pub contrast: f64,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            target_expand: 40,
            body_erode: 8,
            silhouette_buffer: 25,
            torso_expand: 35,
            face_buffer: 45,
            first_blur: 21,
            corner_dilate: 7,
            final_blur: 25,
            contrast: 1.3,
        }
    }
}

impl MaskParams {
    pub fn validate(&self) -> Result<()> {
        let kernels = [
            ("target_expand", self.target_expand),
            ("body_erode", self.body_erode),
            ("silhouette_buffer", self.silhouette_buffer),
            ("torso_expand", self.torso_expand),
            ("face_buffer", self.face_buffer),
            ("corner_dilate", self.corner_dilate),
        ];
        for (name, ksize) in kernels {
            if ksize == 0 {
                return Err(MaskError::InvalidParams(format!("{} must be at least 1", name)));
            }
        }
        for (name, ksize) in [("first_blur", self.first_blur), ("final_blur", self.final_blur)] {
            if ksize % 2 == 0 {
                return Err(MaskError::InvalidParams(format!(
                    "{} must be a positive odd number, got {}",
                    name, ksize
                )));
            }
        }
        if !self.contrast.is_finite() || self.contrast < 0.0 {
            return Err(MaskError::InvalidParams(format!(
                "contrast must be finite and non-negative, got {}",
                self.contrast
            )));
        }
        Ok(())
    }
}

/// Every intermediate mask of one generation run.
#[derive(Debug, Clone)]
pub struct MaskStages {
    pub base_target: BinaryMask,
    pub expanded_target: BinaryMask,
    pub body_near_target: BinaryMask,
    pub human_buffer: BinaryMask,
    pub clipped: BinaryMask,
    pub head_protected: BinaryMask,
    pub hair_on_body: BinaryMask,
    pub restored: BinaryMask,
    pub mask: GrayImage,
}

/// Turns a parsing map and three label sets into a soft inpainting mask.
///
/// Holds no state besides its parameters; one generator can serve any number
/// of threads.
pub struct MaskGenerator {
    params: MaskParams,
    soft_edges: SoftEdgePipeline,
}

impl MaskGenerator {
    pub fn new(params: MaskParams) -> Result<Self> {
        params.validate()?;
        let soft_edges = SoftEdgePipeline::builder().with_params(&params).build();
        Ok(Self { params, soft_edges })
    }

    pub fn params(&self) -> &MaskParams {
        &self.params
    }

    /// Generate the final 8-bit mask.
    #[instrument(skip_all, fields(width = parsing.width(), height = parsing.height()))]
    pub fn generate(
        &self,
        parsing: &SegmentationMap,
        target: &LabelSet,
        body: &LabelSet,
        head: &LabelSet,
    ) -> Result<GrayImage> {
        Ok(self.stages(parsing, target, body, head)?.mask)
    }

    /// Run the whole pipeline, keeping every intermediate mask.
    pub fn stages(
        &self,
        parsing: &SegmentationMap,
        target: &LabelSet,
        body: &LabelSet,
        head: &LabelSet,
    ) -> Result<MaskStages> {
        let base_target = base_target(parsing, target);
        let expanded_target = self.expand_target(&base_target);
        let body_near_target = self.body_near_target(parsing, body, &expanded_target)?;
        let human_buffer = self.silhouette_buffer(parsing, target, body, head);
        let clipped = combine_and_clip(&expanded_target, &body_near_target, &human_buffer)?;
        let head_protected = protect_head(&clipped, parsing, head)?;
        let hair_on_body = self.hair_on_body(parsing, body)?;
        let restored = head_protected.or(&hair_on_body)?;
        let mask = self.soften_edges(&restored)?;

        debug!(
            target_px = base_target.count(),
            expanded_px = expanded_target.count(),
            body_near_px = body_near_target.count(),
            clipped_px = clipped.count(),
            head_protected_px = head_protected.count(),
            hair_on_body_px = hair_on_body.count(),
            "binary mask stages computed"
        );

        Ok(MaskStages {
            base_target,
            expanded_target,
            body_near_target,
            human_buffer,
            clipped,
            head_protected,
            hair_on_body,
            restored,
            mask,
        })
    }

    /// Step 2: aggressive expansion to catch shadows and cloth folds.
    pub fn expand_target(&self, base_target: &BinaryMask) -> BinaryMask {
        base_target.dilate(self.params.target_expand)
    }

    /// Step 3: body pixels inside the expanded target, pulled back towards
    /// the body/target boundary.
    pub fn body_near_target(
        &self,
        parsing: &SegmentationMap,
        body: &LabelSet,
        expanded_target: &BinaryMask,
    ) -> Result<BinaryMask> {
        Ok(expanded_target
            .and(&parsing.select(body))?
            .erode(self.params.body_erode))
    }

    /// Step 4: dilated outline of everything that belongs to the person.
    pub fn silhouette_buffer(
        &self,
        parsing: &SegmentationMap,
        target: &LabelSet,
        body: &LabelSet,
        head: &LabelSet,
    ) -> BinaryMask {
        let human = target.union(body).union(head);
        parsing.select(&human).dilate(self.params.silhouette_buffer)
    }

    /// Step 7 (selection): hair overlapping the torso zone, minus anything
    /// near the face.
    pub fn hair_on_body(&self, parsing: &SegmentationMap, body: &LabelSet) -> Result<BinaryMask> {
        let torso_zone = parsing.select(body).dilate(self.params.torso_expand);
        let face_zone = parsing
            .select_label(Label::Face)
            .dilate(self.params.face_buffer);
        parsing
            .select_label(Label::Hair)
            .and(&torso_zone)?
            .clear_where(&face_zone)
    }

    /// Step 7: put hair lying on the body back into the mask.
    pub fn restore_hair_on_body(
        &self,
        head_protected: &BinaryMask,
        parsing: &SegmentationMap,
        body: &LabelSet,
    ) -> Result<BinaryMask> {
        head_protected.or(&self.hair_on_body(parsing, body)?)
    }

    /// Step 8: scale to 0/255 and run the soft-edge chain.
    pub fn soften_edges(&self, mask: &BinaryMask) -> Result<GrayImage> {
        self.soft_edges.process(&mask.to_gray(u8::MAX))
    }
}

impl Default for MaskGenerator {
    fn default() -> Self {
        let params = MaskParams::default();
        let soft_edges = SoftEdgePipeline::builder().with_params(&params).build();
        Self { params, soft_edges }
    }
}

/// Step 1: pixels whose label is a target label.
pub fn base_target(parsing: &SegmentationMap, target: &LabelSet) -> BinaryMask {
    parsing.select(target)
}

/// Step 5: union of the expansions, hard-clipped to the silhouette buffer.
pub fn combine_and_clip(
    expanded_target: &BinaryMask,
    body_near_target: &BinaryMask,
    human_buffer: &BinaryMask,
) -> Result<BinaryMask> {
    expanded_target.or(body_near_target)?.and(human_buffer)
}

/// Step 6: the head is never targeted.
pub fn protect_head(mask: &BinaryMask, parsing: &SegmentationMap, head: &LabelSet) -> Result<BinaryMask> {
    mask.clear_where(&parsing.select(head))
}

/// Generate a mask with the default parameters.
pub fn generate(
    parsing: &SegmentationMap,
    target: &LabelSet,
    body: &LabelSet,
    head: &LabelSet,
) -> Result<GrayImage> {
    MaskGenerator::default().generate(parsing, target, body, head)
}
