use image::{GrayImage, Luma};
use imageproc::{map::map_colors, stats::histogram};

use crate::{
    algorithms::{dilate_square, erode_square},
    error::{MaskError, Result},
    labels::{Label, LabelSet},
};

/// A per-pixel map of parsing label ids, one `u8` per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationMap {
    labels: GrayImage,
}

impl SegmentationMap {
    /// Build a map from an array shape and its row-major data.
    ///
    /// `shape` is `[height, width]`; any other rank is rejected.
    pub fn from_shape(shape: &[usize], data: Vec<u8>) -> Result<Self> {
        let &[height, width] = shape else {
            return Err(MaskError::InvalidShape(format!(
                "parsing map must be 2-dimensional, got {} dimension(s)",
                shape.len()
            )));
        };
        let width = u32::try_from(width)
            .map_err(|_| MaskError::InvalidShape(format!("width {} is too large", width)))?;
        let height = u32::try_from(height)
            .map_err(|_| MaskError::InvalidShape(format!("height {} is too large", height)))?;
        Self::from_raw(width, height, data)
    }

    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(MaskError::InvalidShape(format!(
                "expected {}x{} = {} labels, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        let labels = GrayImage::from_raw(width, height, data)
            .ok_or_else(|| MaskError::InvalidShape("label buffer does not match dimensions".into()))?;
        Self::from_gray(labels)
    }

    pub fn from_gray(labels: GrayImage) -> Result<Self> {
        if labels.width() == 0 || labels.height() == 0 {
            return Err(MaskError::InvalidShape(format!(
                "parsing map must not be empty, got {}x{}",
                labels.width(),
                labels.height()
            )));
        }
        Ok(Self { labels })
    }

    /// Build a map by evaluating `f(x, y)` for every pixel.
    pub fn from_fn<F: FnMut(u32, u32) -> u8>(width: u32, height: u32, mut f: F) -> Result<Self> {
        Self::from_gray(GrayImage::from_fn(width, height, |x, y| Luma([f(x, y)])))
    }

    pub fn width(&self) -> u32 {
        self.labels.width()
    }

    pub fn height(&self) -> u32 {
        self.labels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.labels.dimensions()
    }

    pub fn label_at(&self, x: u32, y: u32) -> Option<u8> {
        (x < self.width() && y < self.height()).then(|| self.labels.get_pixel(x, y)[0])
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.labels
    }

    /// Binary mask of every pixel whose label is in `set`.
    pub fn select(&self, set: &LabelSet) -> BinaryMask {
        let table = set.lookup_table();
        BinaryMask(map_colors(&self.labels, |Luma([id])| Luma([table[id as usize] as u8])))
    }

    /// Binary mask of every pixel carrying `label`.
    pub fn select_label(&self, label: Label) -> BinaryMask {
        self.select(&LabelSet::from_labels([label]))
    }

    /// Pixel count per label id, for ids that occur at least once.
    pub fn label_histogram(&self) -> Vec<(u8, u32)> {
        let counts = histogram(&self.labels);
        counts.channels[0]
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(id, &count)| (id as u8, count))
            .collect()
    }
}

/// A 0/1 mask with the same dimensions as the map it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask(GrayImage);

impl BinaryMask {
    /// Wrap a grey image, treating any non-zero sample as set.
    pub fn from_gray(image: &GrayImage) -> Self {
        Self(map_colors(image, |Luma([v])| Luma([(v != 0) as u8])))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y)[0] != 0
    }

    pub fn count(&self) -> usize {
        self.0.iter().filter(|&&v| v != 0).count()
    }

    /// Dilate with a square `ksize` x `ksize` element.
    pub fn dilate(&self, ksize: u32) -> Self {
        Self(dilate_square(&self.0, ksize))
    }

    /// Erode with a square `ksize` x `ksize` element.
    pub fn erode(&self, ksize: u32) -> Self {
        Self(erode_square(&self.0, ksize))
    }

    pub fn and(&self, other: &BinaryMask) -> Result<Self> {
        self.zip_with(other, |a, b| a & b)
    }

    pub fn or(&self, other: &BinaryMask) -> Result<Self> {
        self.zip_with(other, |a, b| a | b)
    }

    /// Clear every pixel that is set in `other`.
    pub fn clear_where(&self, other: &BinaryMask) -> Result<Self> {
        self.zip_with(other, |a, b| a & !b & 1)
    }

    /// Scale to a grey image: set pixels become `on`, the rest 0.
    pub fn to_gray(&self, on: u8) -> GrayImage {
        map_colors(&self.0, |Luma([v])| Luma([if v != 0 { on } else { 0 }]))
    }

    fn zip_with(&self, other: &BinaryMask, op: fn(u8, u8) -> u8) -> Result<Self> {
        if self.dimensions() != other.dimensions() {
            return Err(MaskError::InvalidShape(format!(
                "cannot combine a {:?} mask with a {:?} mask",
                self.dimensions(),
                other.dimensions()
            )));
        }
        let mut out = self.0.clone();
        for (dst, &src) in out.iter_mut().zip(other.0.iter()) {
            *dst = op(*dst, src);
        }
        Ok(Self(out))
    }
}
