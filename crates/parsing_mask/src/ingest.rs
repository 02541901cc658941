use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use tracing::debug;

use crate::{
    error::{MaskError, Result},
    labels::{label_for_color, palette_color},
    types::SegmentationMap,
};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Decode an encoded parsing map into per-pixel label ids.
///
/// Indexed PNGs carry the ids as palette indices, whatever the palette
/// colours are. Grey images carry the ids directly. True-colour images are
/// mapped back through the label palette.
pub fn load(bytes: &[u8]) -> Result<SegmentationMap> {
    if bytes.starts_with(PNG_SIGNATURE) {
        if let Some(parsing) = load_indexed_png(bytes)? {
            return Ok(parsing);
        }
    }

    let decoded = image::load_from_memory(bytes)?;
    debug!(
        width = decoded.width(),
        height = decoded.height(),
        color = ?decoded.color(),
        "decoded parsing map"
    );

    let labels = match decoded {
        DynamicImage::ImageLuma8(gray) => gray,
        DynamicImage::ImageLumaA8(gray_alpha) => DynamicImage::ImageLumaA8(gray_alpha).to_luma8(),
        DynamicImage::ImageRgb8(rgb) => labels_from_colors(rgb.width(), rgb.height(), rgb.pixels().map(|p| p.0))?,
        DynamicImage::ImageRgba8(rgba) => labels_from_colors(
            rgba.width(),
            rgba.height(),
            rgba.pixels().map(|p| [p.0[0], p.0[1], p.0[2]]),
        )?,
        other => {
            return Err(MaskError::InvalidImage(format!(
                "unsupported parsing map sample format {:?}",
                other.color()
            )));
        }
    };

    SegmentationMap::from_gray(labels)
}

/// Raw palette indices of an indexed PNG, `None` for any other colour type.
fn load_indexed_png(bytes: &[u8]) -> Result<Option<SegmentationMap>> {
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info().map_err(png_error)?;
    if reader.info().color_type != png::ColorType::Indexed {
        return Ok(None);
    }

    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf).map_err(png_error)?;
    debug!(
        width = frame.width,
        height = frame.height,
        bit_depth = ?frame.bit_depth,
        "decoded indexed parsing map"
    );

    let ids = unpack_indices(&buf, frame.width, frame.height, frame.line_size, frame.bit_depth as u8);
    SegmentationMap::from_raw(frame.width, frame.height, ids).map(Some)
}

/// Expand rows of 1, 2, 4 or 8-bit packed indices to one byte per pixel.
fn unpack_indices(data: &[u8], width: u32, height: u32, line_size: usize, bit_depth: u8) -> Vec<u8> {
    let bits = bit_depth as usize;
    let per_byte = 8 / bits;
    let mask = ((1u16 << bits) - 1) as u8;

    let mut ids = Vec::with_capacity(width as usize * height as usize);
    for row in data.chunks(line_size).take(height as usize) {
        for x in 0..width as usize {
            let shift = 8 - bits * (x % per_byte + 1);
            ids.push((row[x / per_byte] >> shift) & mask);
        }
    }
    ids
}

fn png_error(err: png::DecodingError) -> MaskError {
    MaskError::InvalidImage(err.to_string())
}

/// Read and decode a parsing map from disk.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<SegmentationMap> {
    let bytes = std::fs::read(path)?;
    load(&bytes)
}

fn labels_from_colors<I>(width: u32, height: u32, colors: I) -> Result<GrayImage>
where
    I: Iterator<Item = [u8; 3]>,
{
    let mut ids = Vec::with_capacity(width as usize * height as usize);
    for color in colors {
        let id = label_for_color(color).ok_or_else(|| {
            MaskError::InvalidImage(format!(
                "colour {:?} is not part of the label palette",
                color
            ))
        })?;
        ids.push(id);
    }
    GrayImage::from_raw(width, height, ids)
        .ok_or_else(|| MaskError::InvalidImage("pixel count does not match dimensions".into()))
}

/// Encode a grey-level mask as PNG.
pub fn encode_png(mask: &GrayImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    mask.write_to(&mut buf, ImageFormat::Png)
        .map_err(MaskError::ImageEncode)?;
    Ok(buf.into_inner())
}

/// Render a parsing map with the label palette.
pub fn colorize(parsing: &SegmentationMap) -> RgbImage {
    let labels = parsing.as_gray();
    RgbImage::from_fn(parsing.width(), parsing.height(), |x, y| {
        let Luma([id]) = *labels.get_pixel(x, y);
        Rgb(palette_color(id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::Label;

    fn sample_map() -> SegmentationMap {
        SegmentationMap::from_fn(8, 5, |x, y| match (x + y) % 3 {
            0 => Label::Background.id(),
            1 => Label::Face.id(),
            _ => Label::Scarf.id(),
        })
        .unwrap()
    }

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_load_grayscale_png() {
        let map = sample_map();
        let bytes = encode_png(map.as_gray()).unwrap();
        let loaded = load(&bytes).unwrap();
        assert_eq!(loaded, map);
    }

    #[test]
    fn test_load_palette_colored_png() {
        let map = sample_map();
        let bytes = png_bytes(DynamicImage::ImageRgb8(colorize(&map)));
        assert_eq!(load(&bytes).unwrap(), map);

        let rgba = DynamicImage::ImageRgb8(colorize(&map)).to_rgba8();
        assert_eq!(load(&png_bytes(DynamicImage::ImageRgba8(rgba))).unwrap(), map);
    }

    fn indexed_png(width: u32, height: u32, depth: png::BitDepth, palette: Vec<u8>, data: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut encoder = png::Encoder::new(&mut buf, width, height);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(depth);
        encoder.set_palette(palette);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(data).unwrap();
        writer.finish().unwrap();
        buf
    }

    fn grey_palette(entries: u8) -> Vec<u8> {
        (0..entries).flat_map(|i| [i, i, i]).collect()
    }

    #[test]
    fn test_load_indexed_png_uses_raw_indices() {
        let bytes = indexed_png(2, 2, png::BitDepth::Eight, grey_palette(18), &[0, 4, 11, 14]);
        let loaded = load(&bytes).unwrap();
        assert_eq!(loaded, SegmentationMap::from_raw(2, 2, vec![0, 4, 11, 14]).unwrap());
    }

    #[test]
    fn test_load_indexed_png_ignores_palette_colours() {
        // index 4 is drawn with the colour of label 2, index 2 with the colour of label 4
        let mut palette: Vec<u8> = (0..5u8).flat_map(palette_color).collect();
        palette.swap(6, 12);
        palette.swap(7, 13);
        palette.swap(8, 14);
        let bytes = indexed_png(3, 1, png::BitDepth::Eight, palette, &[4, 2, 0]);
        assert_eq!(load(&bytes).unwrap().as_gray().as_raw(), &vec![4, 2, 0]);
    }

    #[test]
    fn test_load_packed_indexed_png() {
        // 4-bit indices, rows padded to whole bytes: [1, 2, 15] and [9, 0, 3]
        let bytes = indexed_png(3, 2, png::BitDepth::Four, grey_palette(16), &[0x12, 0xF0, 0x90, 0x30]);
        let loaded = load(&bytes).unwrap();
        assert_eq!(loaded.as_gray().as_raw(), &vec![1, 2, 15, 9, 0, 3]);
    }

    #[test]
    fn test_load_rejects_colors_outside_palette() {
        let rgb = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
        let err = load(&png_bytes(DynamicImage::ImageRgb8(rgb))).unwrap_err();
        assert!(matches!(err, MaskError::InvalidImage(_)));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let err = load(b"definitely not a png").unwrap_err();
        assert!(matches!(err, MaskError::InvalidImage(_)));
    }

    #[test]
    fn test_load_rejects_sixteen_bit_maps() {
        let wide = DynamicImage::ImageLuma16(image::ImageBuffer::new(2, 2));
        let err = load(&png_bytes(wide)).unwrap_err();
        assert!(matches!(err, MaskError::InvalidImage(_)));
    }

    #[test]
    fn test_encode_png_roundtrips_dimensions() {
        let mask = GrayImage::from_pixel(7, 3, Luma([128u8]));
        let decoded = image::load_from_memory(&encode_png(&mask).unwrap()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (7, 3));
        assert_eq!(decoded.to_luma8(), mask);
    }

    #[test]
    fn test_colorize_uses_palette() {
        let preview = colorize(&sample_map());
        assert_eq!(preview.get_pixel(0, 0).0, palette_color(0));
        assert_eq!(preview.get_pixel(1, 0).0, palette_color(Label::Face.id()));
    }
}
