//! Thumbnail rendering
//!
//! Single-band previews are stretched to grey between their valid min and
//! max; three or more bands render as RGB. Nodata is transparent in PNG and
//! black in JPEG.

use geometa_core::models::{
    ArtifactKind, RasterPreview, ThumbnailFormat, ThumbnailOptions, ValueRange,
};
use geometa_core::{MetadataError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Render and encode a thumbnail of the preview
pub fn render_thumbnail(
    preview: &RasterPreview,
    sample_format: &str,
    options: &ThumbnailOptions,
) -> Result<Vec<u8>> {
    let image = colorize(preview, sample_format)?;
    let image = fit(image, options.max_edge);
    encode(image, options.format)
}

fn colorize(preview: &RasterPreview, sample_format: &str) -> Result<RgbaImage> {
    if preview.width == 0 || preview.height == 0 || preview.bands == 0 {
        return Err(MetadataError::export(ArtifactKind::Thumbnail, "preview is empty"));
    }
    let expected = preview.width as usize * preview.height as usize * preview.bands as usize;
    if preview.samples.len() != expected {
        return Err(MetadataError::export(
            ArtifactKind::Thumbnail,
            format!("preview holds {} samples, expected {}", preview.samples.len(), expected),
        ));
    }

    let channels: Vec<u16> = if preview.bands >= 3 { vec![0, 1, 2] } else { vec![0] };
    let stretches = channels
        .iter()
        .map(|band| {
            if sample_format == "uint8" {
                Ok(Stretch::Identity)
            } else {
                preview.band_range(*band).map(Stretch::Linear).ok_or_else(|| {
                    MetadataError::export(ArtifactKind::Thumbnail, "raster has no valid samples")
                })
            }
        })
        .collect::<Result<Vec<Stretch>>>()?;

    let bands = preview.bands as usize;
    let image = RgbaImage::from_fn(preview.width, preview.height, |x, y| {
        let start = (y as usize * preview.width as usize + x as usize) * bands;
        let pixel = &preview.samples[start..start + bands];

        if channels.iter().any(|b| !preview.is_valid(pixel[*b as usize])) {
            return Rgba([0, 0, 0, 0]);
        }

        let value = |i: usize| stretches[i].apply(pixel[channels[i] as usize]);
        match channels.len() {
            1 => {
                let grey = value(0);
                Rgba([grey, grey, grey, 255])
            }
            _ => Rgba([value(0), value(1), value(2), 255]),
        }
    });

    Ok(image)
}

#[derive(Debug, Clone, Copy)]
enum Stretch {
    Identity,
    Linear(ValueRange),
}

impl Stretch {
    fn apply(&self, value: f32) -> u8 {
        match self {
            Stretch::Identity => value.round().clamp(0.0, 255.0) as u8,
            Stretch::Linear(range) => {
                let span = range.max - range.min;
                if span <= 0.0 {
                    return 128;
                }
                (((value as f64 - range.min) / span) * 255.0).round().clamp(0.0, 255.0) as u8
            }
        }
    }
}

/// Shrink to fit `max_edge`, never enlarging
fn fit(image: RgbaImage, max_edge: u32) -> DynamicImage {
    let image = DynamicImage::ImageRgba8(image);
    if image.width().max(image.height()) <= max_edge {
        return image;
    }
    image.resize(max_edge, max_edge, FilterType::Triangle)
}

fn encode(image: DynamicImage, format: ThumbnailFormat) -> Result<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    let result = match format {
        ThumbnailFormat::Png => image.write_to(&mut bytes, ImageFormat::Png),
        // JPEG has no alpha channel
        ThumbnailFormat::Jpeg => {
            DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut bytes, ImageFormat::Jpeg)
        }
    };
    result.map_err(|e| MetadataError::export(ArtifactKind::Thumbnail, e))?;
    Ok(bytes.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terrain_preview() -> RasterPreview {
        RasterPreview {
            width: 4,
            height: 2,
            bands: 1,
            samples: vec![100.0, 150.0, 200.0, -9999.0, 100.0, 125.0, 175.0, 200.0],
            nodata: Some(-9999.0),
        }
    }

    #[test]
    fn test_grey_stretch_and_transparent_nodata() {
        let image = colorize(&terrain_preview(), "float32").unwrap();

        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(image.get_pixel(2, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(image.get_pixel(1, 0), &Rgba([128, 128, 128, 255]));
        assert_eq!(image.get_pixel(3, 0)[3], 0);
    }

    #[test]
    fn test_rgb_passthrough_for_uint8() {
        let preview = RasterPreview {
            width: 1,
            height: 1,
            bands: 4,
            samples: vec![10.0, 20.0, 30.0, 255.0],
            nodata: None,
        };
        let image = colorize(&preview, "uint8").unwrap();
        assert_eq!(image.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_all_nodata_is_an_error() {
        let preview = RasterPreview {
            width: 1,
            height: 1,
            bands: 1,
            samples: vec![-9999.0],
            nodata: Some(-9999.0),
        };
        let err = colorize(&preview, "float32").unwrap_err();
        assert!(matches!(err, MetadataError::Export { kind: ArtifactKind::Thumbnail, .. }));
    }

    #[test]
    fn test_png_fits_max_edge() {
        let preview = RasterPreview {
            width: 400,
            height: 100,
            bands: 1,
            samples: (0..40_000).map(|i| i as f32).collect(),
            nodata: None,
        };
        let options = ThumbnailOptions { max_edge: 64, format: ThumbnailFormat::Png };
        let bytes = render_thumbnail(&preview, "float32", &options).unwrap();

        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 16));
    }

    #[test]
    fn test_small_preview_is_not_enlarged() {
        let options = ThumbnailOptions { max_edge: 200, format: ThumbnailFormat::Jpeg };
        let bytes = render_thumbnail(&terrain_preview(), "float32", &options).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 2));
    }
}
