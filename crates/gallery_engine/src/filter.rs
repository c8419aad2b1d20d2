//! Raster filters approximating the CSS filter functions the gallery offers.

use gallery_core::FilterKind;
use image::{imageops, DynamicImage, Rgba, RgbaImage};

pub const BLUR_RADIUS: f32 = 3.0;
pub const BRIGHTNESS_FACTOR: f32 = 1.4;
pub const CONTRAST_FACTOR: f32 = 1.5;
/// Longest edge of the previews produced by background processing.
pub const PREVIEW_EDGE: u32 = 200;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("cannot filter an empty image ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

pub fn apply_filter(image: &DynamicImage, filter: FilterKind) -> Result<RgbaImage, FilterError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(FilterError::EmptyImage { width, height });
    }

    let filtered = match filter {
        FilterKind::None => image.to_rgba8(),
        FilterKind::Blur => imageops::blur(&image.to_rgba8(), BLUR_RADIUS),
        FilterKind::Grayscale => image.grayscale().to_rgba8(),
        FilterKind::Brightness => map_pixels(image.to_rgba8(), |[r, g, b]| {
            [r, g, b].map(|c| c * BRIGHTNESS_FACTOR)
        }),
        FilterKind::Contrast => map_pixels(image.to_rgba8(), |[r, g, b]| {
            [r, g, b].map(|c| (c - 127.5) * CONTRAST_FACTOR + 127.5)
        }),
        FilterKind::Sepia => map_pixels(image.to_rgba8(), |[r, g, b]| {
            [
                0.393 * r + 0.769 * g + 0.189 * b,
                0.349 * r + 0.686 * g + 0.168 * b,
                0.272 * r + 0.534 * g + 0.131 * b,
            ]
        }),
    };
    Ok(filtered)
}

/// Downscaled, filtered copy used as the processed thumbnail.
pub fn make_preview(image: &DynamicImage, filter: FilterKind) -> Result<RgbaImage, FilterError> {
    let preview = if image.width() > PREVIEW_EDGE || image.height() > PREVIEW_EDGE {
        image.thumbnail(PREVIEW_EDGE, PREVIEW_EDGE)
    } else {
        image.clone()
    };
    apply_filter(&preview, filter)
}

fn map_pixels(mut raster: RgbaImage, f: impl Fn([f32; 3]) -> [f32; 3]) -> RgbaImage {
    for Rgba([r, g, b, _]) in raster.pixels_mut() {
        let [nr, ng, nb] = f([*r as f32, *g as f32, *b as f32]);
        *r = clamp_channel(nr);
        *g = clamp_channel(ng);
        *b = clamp_channel(nb);
    }
    raster
}

fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use gallery_core::FilterKind;
    use image::{DynamicImage, Rgba, RgbaImage};

    use super::{apply_filter, make_preview, FilterError, PREVIEW_EDGE};

    fn solid(r: u8, g: u8, b: u8) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([r, g, b, 200])))
    }

    fn first_pixel(filter: FilterKind, source: &DynamicImage) -> [u8; 4] {
        apply_filter(source, filter).unwrap().get_pixel(0, 0).0
    }

    #[test]
    fn none_keeps_pixels() {
        assert_eq!(first_pixel(FilterKind::None, &solid(10, 20, 30)), [10, 20, 30, 200]);
    }

    #[test]
    fn brightness_scales_and_saturates() {
        assert_eq!(
            first_pixel(FilterKind::Brightness, &solid(100, 200, 0)),
            [140, 255, 0, 200]
        );
    }

    #[test]
    fn contrast_pushes_away_from_mid_grey() {
        let [r, g, b, a] = first_pixel(FilterKind::Contrast, &solid(200, 50, 128));
        assert!(r > 200);
        assert!(g < 50);
        assert_eq!(b, 128);
        assert_eq!(a, 200);
    }

    #[test]
    fn grayscale_equalises_channels() {
        let [r, g, b, _] = first_pixel(FilterKind::Grayscale, &solid(200, 40, 90));
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn sepia_tints_warm() {
        let [r, g, b, _] = first_pixel(FilterKind::Sepia, &solid(100, 100, 100));
        assert!(r > g && g > b);
    }

    #[test]
    fn blur_preserves_solid_colour_and_size() {
        let blurred = apply_filter(&solid(60, 60, 60), FilterKind::Blur).unwrap();
        assert_eq!(blurred.dimensions(), (4, 4));
        let [r, _, _, _] = blurred.get_pixel(2, 2).0;
        assert!((58..=62).contains(&r));
    }

    #[test]
    fn empty_image_is_rejected() {
        let empty = DynamicImage::ImageRgba8(RgbaImage::new(0, 3));
        assert_eq!(
            apply_filter(&empty, FilterKind::Sepia),
            Err(FilterError::EmptyImage {
                width: 0,
                height: 3
            })
        );
    }

    #[test]
    fn preview_fits_within_edge() {
        let large = DynamicImage::ImageRgba8(RgbaImage::new(500, 300));
        let preview = make_preview(&large, FilterKind::None).unwrap();
        assert!(preview.width() <= PREVIEW_EDGE);
        assert!(preview.height() <= PREVIEW_EDGE);
        assert_eq!(preview.width(), PREVIEW_EDGE);
    }
}
