use image::GrayImage;
use crate::{error::{MaskError, Result}, traits::MaskFilter};

/// Grey-level dilation with a `ksize` x `ksize` square element.
///
/// The anchor sits at `ksize / 2`: each output pixel looks `ksize / 2` pixels
/// up and left and `ksize - 1 - ksize / 2` pixels down and right. Samples
/// outside the image never contribute.
pub fn dilate_square(image: &GrayImage, ksize: u32) -> GrayImage {
    rect_filter(image, ksize, u8::max)
}

/// Grey-level erosion with a `ksize` x `ksize` square element.
///
/// Same anchor convention as [`dilate_square`]; the image border does not
/// erode.
pub fn erode_square(image: &GrayImage, ksize: u32) -> GrayImage {
    rect_filter(image, ksize, u8::min)
}

/// Separable min/max filter: one horizontal pass, then one vertical pass.
fn rect_filter(image: &GrayImage, ksize: u32, pick: fn(u8, u8) -> u8) -> GrayImage {
    let (width, height) = image.dimensions();
    if ksize <= 1 || width == 0 || height == 0 {
        return image.clone();
    }

    let (w, h) = (width as usize, height as usize);
    let anchor = (ksize / 2) as usize;
    let reach = ksize as usize - 1 - anchor;
    let src = image.as_raw();

    // Horizontal pass
    let mut temp = vec![0u8; w * h];
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            let start = x.saturating_sub(anchor);
            let end = (x + reach).min(w - 1);
            temp[y * w + x] = row[start..=end].iter().copied().fold(row[x], pick);
        }
    }

    // Vertical pass
    let mut result = GrayImage::new(width, height);
    let out: &mut [u8] = &mut result;
    for y in 0..h {
        let start = y.saturating_sub(anchor);
        let end = (y + reach).min(h - 1);
        for x in 0..w {
            out[y * w + x] = (start..=end)
                .map(|sy| temp[sy * w + x])
                .fold(temp[y * w + x], pick);
        }
    }

    result
}

/// Max filter step for the soft-edge chain.
#[derive(Debug, Clone)]
pub struct Dilate {
    pub ksize: u32,
}

impl Default for Dilate {
    fn default() -> Self {
        Self { ksize: 7 }
    }
}

impl MaskFilter for Dilate {
    fn apply(&self, image: &GrayImage) -> Result<GrayImage> {
        if self.ksize == 0 {
            return Err(MaskError::InvalidParams("dilation kernel size must be at least 1".into()));
        }
        Ok(dilate_square(image, self.ksize))
    }

    fn describe(&self) -> String {
        format!("dilate {0}x{0}", self.ksize)
    }
}
