//! Downsampled previews assembled from decoded strips and tiles

use geometa_core::models::RasterPreview;
use std::ops::Range;
use tiff::decoder::DecodingResult;

/// Decoded samples widened to `f32`
pub fn samples_to_f32(result: DecodingResult) -> Vec<f32> {
    match result {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|s| s as f32).collect(),
    }
}

/// Preview dimensions so the longest edge is at most `max_edge`
pub fn preview_size(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_edge || longest == 0 {
        return (width, height);
    }
    let scale = max_edge as f64 / longest as f64;
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// A rectangle of source pixels held by one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Strip or tile grid of one image plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    pub width: u32,
    pub height: u32,
    pub chunk_width: u32,
    pub chunk_height: u32,
}

impl ChunkLayout {
    pub fn across(&self) -> u32 {
        self.width.div_ceil(self.chunk_width.max(1))
    }

    pub fn down(&self) -> u32 {
        self.height.div_ceil(self.chunk_height.max(1))
    }

    pub fn chunks_per_plane(&self) -> u32 {
        self.across() * self.down()
    }

    /// Pixels covered by the chunk at `index` within a plane, edge padding excluded
    pub fn window(&self, index: u32) -> Window {
        let across = self.across().max(1);
        let x = (index % across) * self.chunk_width;
        let y = (index / across) * self.chunk_height;
        Window {
            x,
            y,
            width: self.chunk_width.min(self.width.saturating_sub(x)),
            height: self.chunk_height.min(self.height.saturating_sub(y)),
        }
    }
}

/// Nearest-neighbour preview filled one decoded chunk at a time
///
/// Each output cell takes the source pixel under its centre, so only the
/// chunks holding those pixels need decoding.
pub struct PreviewBuilder {
    width: u32,
    bands: u16,
    src_rows: Vec<u32>,
    src_cols: Vec<u32>,
    samples: Vec<f32>,
    nodata: Option<f64>,
}

impl PreviewBuilder {
    pub fn new(width: u32, height: u32, bands: u16, max_edge: u32, nodata: Option<f64>) -> Self {
        let (out_w, out_h) = preview_size(width, height, max_edge);
        let centres = |out: u32, src: u32| -> Vec<u32> {
            (0..out)
                .map(|i| (((i as f64 + 0.5) * src as f64 / out as f64) as u32).min(src.saturating_sub(1)))
                .collect()
        };

        Self {
            width: out_w,
            bands,
            src_rows: centres(out_h, height),
            src_cols: centres(out_w, width),
            samples: vec![f32::NAN; out_w as usize * out_h as usize * bands as usize],
            nodata,
        }
    }

    fn covered(sources: &[u32], start: u32, len: u32) -> Range<usize> {
        let end = start.saturating_add(len);
        sources.partition_point(|&s| s < start)..sources.partition_point(|&s| s < end)
    }

    /// Whether any preview cell samples a pixel inside `window`
    pub fn needs(&self, window: Window) -> bool {
        !Self::covered(&self.src_rows, window.y, window.height).is_empty()
            && !Self::covered(&self.src_cols, window.x, window.width).is_empty()
    }

    /// Copy the sampled pixels of one decoded chunk
    ///
    /// `chunk` is row-major over `window`. With `plane` set it holds that
    /// band only, otherwise every band interleaved.
    pub fn add_chunk(&mut self, chunk: &[f32], window: Window, plane: Option<u16>) {
        let bands = self.bands as usize;
        let per_pixel = if plane.is_some() { 1 } else { bands };
        let rows = Self::covered(&self.src_rows, window.y, window.height);
        let cols = Self::covered(&self.src_cols, window.x, window.width);

        for out_row in rows {
            let src_y = (self.src_rows[out_row] - window.y) as usize;
            for out_col in cols.clone() {
                let src_x = (self.src_cols[out_col] - window.x) as usize;
                let src = (src_y * window.width as usize + src_x) * per_pixel;
                let dst = (out_row * self.width as usize + out_col) * bands;

                match plane {
                    Some(band) => {
                        if let (Some(&value), Some(slot)) =
                            (chunk.get(src), self.samples.get_mut(dst + band as usize))
                        {
                            *slot = value;
                        }
                    }
                    None => {
                        if let (Some(pixel), Some(slots)) =
                            (chunk.get(src..src + bands), self.samples.get_mut(dst..dst + bands))
                        {
                            slots.copy_from_slice(pixel);
                        }
                    }
                }
            }
        }
    }

    pub fn finish(self) -> RasterPreview {
        RasterPreview {
            width: self.width,
            height: self.src_rows.len() as u32,
            bands: self.bands,
            samples: self.samples,
            nodata: self.nodata,
        }
    }
}
