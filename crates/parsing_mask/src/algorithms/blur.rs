use image::GrayImage;
use crate::{error::{MaskError, Result}, traits::MaskFilter};

/// Standard deviation used when only a kernel size is given.
pub fn sigma_for_ksize(ksize: u32) -> f64 {
    0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalised 1-D Gaussian weights for an odd `ksize`.
///
/// Sizes up to 7 use the classic binomial-like tables, larger sizes sample
/// the Gaussian at [`sigma_for_ksize`].
pub fn gaussian_kernel(ksize: u32) -> Vec<f64> {
    match ksize {
        1 => return vec![1.0],
        3 => return vec![0.25, 0.5, 0.25],
        5 => return vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => return vec![0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
        _ => {}
    }

    let sigma = sigma_for_ksize(ksize);
    let center = (ksize as f64 - 1.0) * 0.5;
    let scale = -0.5 / (sigma * sigma);
    let weights: Vec<f64> = (0..ksize)
        .map(|i| {
            let d = i as f64 - center;
            (scale * d * d).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Mirror an out-of-range index back into `0..len` without repeating the
/// edge sample (`-1 -> 1`, `len -> len - 2`).
fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mut i = index;
    loop {
        if i < 0 {
            i = -i;
        } else if i > last {
            i = 2 * last - i;
        } else {
            return i as usize;
        }
    }
}

/// Separable Gaussian blur with an explicit square kernel size.
pub fn gaussian_blur(image: &GrayImage, ksize: u32) -> Result<GrayImage> {
    if ksize == 0 || ksize % 2 == 0 {
        return Err(MaskError::InvalidParams(format!(
            "Gaussian kernel size must be a positive odd number, got {}",
            ksize
        )));
    }

    let (width, height) = image.dimensions();
    if ksize == 1 || width == 0 || height == 0 {
        return Ok(image.clone());
    }

    let kernel = gaussian_kernel(ksize);
    let radius = (ksize / 2) as isize;
    let (w, h) = (width as usize, height as usize);
    let src = image.as_raw();

    // Weights and sums stay in f64 and are rounded once at the end. OpenCV's
    // 8-bit path quantizes weights to fixed point, so values on a gradient can
    // differ from it by 1; flat regions and fully covered pixels match.
    // Horizontal pass, kept at full precision
    let mut temp = vec![0f64; w * h];
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            temp[y * w + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| {
                    let sx = reflect_101(x as isize + k as isize - radius, w);
                    weight * row[sx] as f64
                })
                .sum();
        }
    }

    // Vertical pass, rounded back to 8 bits
    let mut result = GrayImage::new(width, height);
    let out: &mut [u8] = &mut result;
    for y in 0..h {
        for x in 0..w {
            let value: f64 = kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| {
                    let sy = reflect_101(y as isize + k as isize - radius, h);
                    weight * temp[sy * w + x]
                })
                .sum();
            out[y * w + x] = value.round().clamp(0.0, 255.0) as u8;
        }
    }

    Ok(result)
}

/// Gaussian blur step for the soft-edge chain.
#[derive(Debug, Clone)]
pub struct GaussianBlur {
    pub ksize: u32,
}

impl Default for GaussianBlur {
    fn default() -> Self {
        Self { ksize: 21 }
    }
}

impl MaskFilter for GaussianBlur {
    fn apply(&self, image: &GrayImage) -> Result<GrayImage> {
        gaussian_blur(image, self.ksize)
    }

    fn describe(&self) -> String {
        format!("gaussian blur {0}x{0} (sigma {1:.2})", self.ksize, sigma_for_ksize(self.ksize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_sigma_for_default_sizes() {
        assert!((sigma_for_ksize(21) - 3.5).abs() < 1e-9);
        assert!((sigma_for_ksize(25) - 4.1).abs() < 1e-9);
    }

    #[test]
    fn test_kernel_is_normalised_and_symmetric() {
        for ksize in [3, 7, 21, 25] {
            let kernel = gaussian_kernel(ksize);
            assert_eq!(kernel.len(), ksize as usize);
            assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            for i in 0..kernel.len() / 2 {
                assert!((kernel[i] - kernel[kernel.len() - 1 - i]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(-7, 3), 1);
        assert_eq!(reflect_101(4, 1), 0);
    }

    #[test]
    fn test_constant_image_is_unchanged() {
        let img = GrayImage::from_pixel(30, 17, Luma([255u8]));
        let blurred = gaussian_blur(&img, 21).unwrap();
        assert!(blurred.iter().all(|&p| p == 255));
    }

    #[test]
    fn test_blur_spreads_and_preserves_symmetry() {
        let mut img = GrayImage::new(41, 41);
        img.put_pixel(20, 20, Luma([255u8]));
        let blurred = gaussian_blur(&img, 5).unwrap();
        // 255 * 0.375 * 0.375
        assert_eq!(blurred.get_pixel(20, 20)[0], 36);
        assert_eq!(blurred.get_pixel(18, 20)[0], blurred.get_pixel(22, 20)[0]);
        assert_eq!(blurred.get_pixel(20, 17)[0], 0);
    }

    #[test]
    fn test_rejects_even_kernel() {
        let img = GrayImage::new(4, 4);
        assert!(matches!(gaussian_blur(&img, 20), Err(MaskError::InvalidParams(_))));
        assert!(GaussianBlur { ksize: 0 }.apply(&img).is_err());
    }
}
