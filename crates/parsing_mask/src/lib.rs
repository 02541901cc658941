//! # Parsing Mask Library
//!
//! Turns a human-parsing label map (one ATR class id per pixel) into a soft
//! grey-level inpainting mask that covers the selected target region, extends
//! it over adjacent body parts and keeps the head untouched.
//!
//! ## Core Features
//!
//! - **Label taxonomy**: the 18 ATR classes, their palette and the named groups
//! - **Mask engine**: staged binary mask construction with morphology
//! - **Soft edges**: a composable filter pipeline (blur, dilate, contrast)
//! - **Service layer**: base64 PNG in, base64 PNG out, with protect lists
//! - **MCP server**: the service exposed as tools over stdio
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parsing_mask::{ingest, MaskService, Selection};
//!
//! let parsing = ingest::load_file("parsing.png")?;
//! let service = MaskService::new();
//! let mask = service.generate_for(
//!     &parsing,
//!     &Selection::from_groups(["clothing"]),
//!     &Selection::default(),
//! )?;
//! mask.save("mask.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Soft Edges
//!
//! ```rust,no_run
//! use parsing_mask::SoftEdgePipeline;
//!
//! let pipeline = SoftEdgePipeline::builder()
//!     .gaussian_blur(11)
//!     .dilate(5)
//!     .contrast_boost(1.5)
//!     .build();
//! println!("{}", pipeline.info());
//! ```

pub mod error;
pub mod labels;
pub mod groups;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod engine;
pub mod ingest;
pub mod service;
pub mod mcp;

pub use error::{MaskError, Result};
pub use labels::{Label, LabelSet};
pub use groups::{resolve_groups, LabelGroup, Selection};
pub use types::{BinaryMask, SegmentationMap};
pub use traits::*;
pub use algorithms::*;
pub use pipeline::{builder::SoftEdgePipelineBuilder, SoftEdgePipeline};
pub use engine::{generate, MaskGenerator, MaskParams, MaskStages};
pub use ingest::{colorize, encode_png, load, load_file};
pub use service::{apply_protect, GenerateMaskRequest, GenerateMaskResponse, MaskService};
