use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::GrayImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    engine::{MaskGenerator, MaskParams},
    error::{MaskError, Result},
    groups::Selection,
    ingest,
    labels::{self, LabelSet},
    types::SegmentationMap,
};

/// Request for generating a mask from a base64-encoded parsing map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerateMaskRequest {
    #[schemars(description = "Base64-encoded PNG parsing map (palette or grayscale label ids)")]
    pub parsing_png_base64: String,

    #[schemars(description = "Explicit label ids to inpaint. If provided, overrides target_groups.")]
    #[serde(default)]
    pub target_labels: Option<Vec<u32>>,

    #[schemars(description = "Target groups: any of ['clothing','body','head'].")]
    #[serde(default)]
    pub target_groups: Option<Vec<String>>,

    #[schemars(description = "Labels to exclude from mask. Applied after mask creation (set to 0).")]
    #[serde(default)]
    pub protect_labels: Option<Vec<u32>>,

    #[schemars(description = "Protect groups: any of ['clothing','body','head'].")]
    #[serde(default)]
    pub protect_groups: Option<Vec<String>>,
}

impl GenerateMaskRequest {
    pub fn target(&self) -> Selection {
        Selection::new(self.target_labels.clone(), self.target_groups.clone())
    }

    pub fn protect(&self) -> Selection {
        Selection::new(self.protect_labels.clone(), self.protect_groups.clone())
    }
}

/// Response containing the generated mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerateMaskResponse {
    #[schemars(description = "Base64-encoded PNG mask (grayscale)")]
    pub mask_png_base64: String,
    pub width: u32,
    pub height: u32,
}

/// Zero every mask pixel whose parsing label is in `protect`.
pub fn apply_protect(mask: &mut GrayImage, parsing: &SegmentationMap, protect: &LabelSet) -> Result<()> {
    if mask.dimensions() != parsing.dimensions() {
        return Err(MaskError::InvalidShape(format!(
            "mask is {:?} but parsing map is {:?}",
            mask.dimensions(),
            parsing.dimensions()
        )));
    }
    if protect.is_empty() {
        return Ok(());
    }

    let table = protect.lookup_table();
    for (value, &id) in mask.iter_mut().zip(parsing.as_gray().iter()) {
        if table[id as usize] {
            *value = 0;
        }
    }
    Ok(())
}

/// Validates requests, runs the generator and applies the protect list.
///
/// Body and head sets are always the taxonomy's named groups.
pub struct MaskService {
    generator: MaskGenerator,
}

impl MaskService {
    pub fn new() -> Self {
        Self { generator: MaskGenerator::default() }
    }

    pub fn with_params(params: MaskParams) -> Result<Self> {
        Ok(Self { generator: MaskGenerator::new(params)? })
    }

    pub fn generator(&self) -> &MaskGenerator {
        &self.generator
    }

    /// Generate a protected mask for an already decoded parsing map.
    pub fn generate_for(
        &self,
        parsing: &SegmentationMap,
        target: &Selection,
        protect: &Selection,
    ) -> Result<GrayImage> {
        let target = target.resolve_target()?;
        let protect = protect.resolve_protect()?;

        let mut mask = self
            .generator
            .generate(parsing, &target, labels::body(), labels::head())?;
        apply_protect(&mut mask, parsing, &protect)?;
        Ok(mask)
    }

    /// Handle a transport-level request end to end.
    #[instrument(skip_all)]
    pub fn handle(&self, request: &GenerateMaskRequest) -> Result<GenerateMaskResponse> {
        let bytes = STANDARD.decode(&request.parsing_png_base64)?;
        let parsing = ingest::load(&bytes)?;

        let mask = self.generate_for(&parsing, &request.target(), &request.protect())?;
        let png = ingest::encode_png(&mask)?;

        info!(width = mask.width(), height = mask.height(), png_bytes = png.len(), "mask generated");
        Ok(GenerateMaskResponse {
            mask_png_base64: STANDARD.encode(png),
            width: mask.width(),
            height: mask.height(),
        })
    }

    /// Same as [`MaskService::handle`] for a JSON request body.
    pub fn handle_json(&self, body: &str) -> Result<GenerateMaskResponse> {
        let request: GenerateMaskRequest = serde_json::from_str(body)?;
        self.handle(&request)
    }
}

impl Default for MaskService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::Label;

    /// Upper clothes in the middle, arms on both sides, a belt below, face on top.
    fn outfit() -> SegmentationMap {
        SegmentationMap::from_fn(100, 100, |x, y| {
            if y < 6 {
                Label::Face.id()
            } else if (40..60).contains(&y) && (40..60).contains(&x) {
                Label::UpperClothes.id()
            } else if (60..64).contains(&y) && (40..60).contains(&x) {
                Label::Belt.id()
            } else if (40..64).contains(&y) && (20..40).contains(&x) {
                Label::LeftArm.id()
            } else if (40..64).contains(&y) && (60..80).contains(&x) {
                Label::RightArm.id()
            } else {
                Label::Background.id()
            }
        })
        .unwrap()
    }

    fn request_for(map: &SegmentationMap) -> GenerateMaskRequest {
        GenerateMaskRequest {
            parsing_png_base64: STANDARD.encode(ingest::encode_png(map.as_gray()).unwrap()),
            ..Default::default()
        }
    }

    fn decode_mask(response: &GenerateMaskResponse) -> GrayImage {
        let png = STANDARD.decode(&response.mask_png_base64).unwrap();
        image::load_from_memory(&png).unwrap().to_luma8()
    }

    #[test]
    fn test_apply_protect_zeroes_protected_labels() {
        let map = outfit();
        let mut mask = GrayImage::from_pixel(100, 100, image::Luma([200u8]));
        let protect = LabelSet::from_labels([Label::Belt]);
        apply_protect(&mut mask, &map, &protect).unwrap();

        assert_eq!(mask.get_pixel(50, 62)[0], 0);
        assert_eq!(mask.get_pixel(50, 50)[0], 200);
    }

    #[test]
    fn test_apply_protect_rejects_mismatched_shapes() {
        let mut mask = GrayImage::new(10, 10);
        let err = apply_protect(&mut mask, &outfit(), &LabelSet::new()).unwrap_err();
        assert!(matches!(err, MaskError::InvalidShape(_)));
    }

    #[test]
    fn test_protect_overrides_engine_output() {
        let map = outfit();
        let service = MaskService::new();
        let target = Selection::from_groups(["clothing"]);

        let unprotected = service.generate_for(&map, &target, &Selection::default()).unwrap();
        assert!(unprotected.get_pixel(50, 62)[0] > 0);

        let protected = service
            .generate_for(&map, &target, &Selection::from_labels([Label::Belt.id() as u32]))
            .unwrap();
        for y in 60..64 {
            for x in 40..60 {
                assert_eq!(protected.get_pixel(x, y)[0], 0);
            }
        }
        assert_eq!(protected.get_pixel(50, 50)[0], unprotected.get_pixel(50, 50)[0]);
    }

    #[test]
    fn test_handle_roundtrip() {
        let map = outfit();
        let request = GenerateMaskRequest {
            target_groups: Some(vec!["Clothing".into()]),
            protect_groups: Some(vec!["body".into()]),
            ..request_for(&map)
        };
        let response = MaskService::new().handle(&request).unwrap();
        assert_eq!((response.width, response.height), (100, 100));

        let mask = decode_mask(&response);
        assert_eq!(mask.get_pixel(50, 50)[0], 255);
        // arms are protected
        assert_eq!(mask.get_pixel(30, 50)[0], 0);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_handle_requires_a_target() {
        let request = request_for(&outfit());
        assert!(matches!(
            MaskService::new().handle(&request),
            Err(MaskError::NoTargetSelected)
        ));
    }

    #[test]
    fn test_handle_rejects_unknown_group() {
        let request = GenerateMaskRequest {
            target_groups: Some(vec!["shoes".into()]),
            ..request_for(&outfit())
        };
        assert!(matches!(
            MaskService::new().handle(&request),
            Err(MaskError::UnknownGroup(_))
        ));
    }

    #[test]
    fn test_handle_rejects_bad_base64_and_bad_png() {
        let service = MaskService::new();
        let bad_base64 = GenerateMaskRequest {
            parsing_png_base64: "not base64!".into(),
            target_labels: Some(vec![4]),
            ..Default::default()
        };
        assert!(matches!(service.handle(&bad_base64), Err(MaskError::InvalidEncoding(_))));

        let bad_png = GenerateMaskRequest {
            parsing_png_base64: STANDARD.encode(b"not a png"),
            target_labels: Some(vec![4]),
            ..Default::default()
        };
        assert!(matches!(service.handle(&bad_png), Err(MaskError::InvalidImage(_))));
    }

    #[test]
    fn test_handle_rejects_padded_base64() {
        let encoded = request_for(&outfit()).parsing_png_base64;
        let request = GenerateMaskRequest {
            parsing_png_base64: format!(" {}\n", encoded),
            target_labels: Some(vec![4]),
            ..Default::default()
        };
        assert!(matches!(
            MaskService::new().handle(&request),
            Err(MaskError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_with_params() {
        let params = MaskParams { corner_dilate: 5, ..MaskParams::default() };
        let service = MaskService::with_params(params.clone()).unwrap();
        assert_eq!(service.generator().params(), &params);

        let even_blur = MaskParams { final_blur: 24, ..MaskParams::default() };
        assert!(matches!(
            MaskService::with_params(even_blur),
            Err(MaskError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_handle_json() {
        let map = outfit();
        let body = serde_json::json!({
            "parsing_png_base64": request_for(&map).parsing_png_base64,
            "target_labels": [4],
        })
        .to_string();
        let response = MaskService::new().handle_json(&body).unwrap();
        assert_eq!(decode_mask(&response).get_pixel(50, 50)[0], 255);
    }
}
