//! Plot rasterization and JPEG output
//!
//! Products are rendered headlessly: panels are rasterized straight into
//! RGB buffers, composed into facet grids, and encoded as JPEG into the
//! caller's writer. Masked pixels render as white, like a plot canvas.

use std::io::Write;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::ArrayView2;

use crate::error::Result;

/// JPEG quality for plot output
const JPEG_QUALITY: u8 = 90;

/// Canvas background and masked-pixel colour
const BLANK: Rgb<u8> = Rgb([255, 255, 255]);

/// Padding between facet panels, in pixels
const FACET_PAD: u32 = 4;

/// Panels smaller than this are upscaled for visibility
const MIN_PANEL_DIM: u32 = 240;

/// Evenly spaced colour-gradient stops
#[derive(Debug, Clone, Copy)]
pub struct Colormap {
    stops: &'static [[u8; 3]],
}

/// Red-yellow-green diverging map used for vegetation indexes
pub const RD_YL_GN: Colormap = Colormap {
    stops: &[
        [165, 0, 38],
        [215, 48, 39],
        [244, 109, 67],
        [253, 174, 97],
        [254, 224, 139],
        [255, 255, 191],
        [217, 239, 139],
        [166, 217, 106],
        [102, 189, 99],
        [26, 152, 80],
        [0, 104, 55],
    ],
};

/// Default sequential map for scalar fields
pub const VIRIDIS: Colormap = Colormap {
    stops: &[
        [68, 1, 84],
        [71, 44, 122],
        [59, 81, 139],
        [44, 113, 142],
        [33, 144, 141],
        [39, 173, 129],
        [92, 200, 99],
        [170, 220, 50],
        [253, 231, 37],
    ],
};

impl Colormap {
    /// Samples the gradient at `t` in [0, 1], clamping outside values
    pub fn sample(&self, t: f32) -> Rgb<u8> {
        let t = t.clamp(0.0, 1.0);
        let scaled = t * (self.stops.len() - 1) as f32;
        let idx = (scaled as usize).min(self.stops.len() - 2);
        let frac = scaled - idx as f32;
        let (a, b) = (self.stops[idx], self.stops[idx + 1]);
        Rgb([
            lerp(a[0], b[0], frac),
            lerp(a[1], b[1], frac),
            lerp(a[2], b[2], frac),
        ])
    }
}

fn lerp(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round() as u8
}

/// Rasterizes a scalar field through a colormap; NaN renders blank
pub fn colorize(values: ArrayView2<'_, f32>, vmin: f32, vmax: f32, cmap: Colormap) -> RgbImage {
    let (height, width) = (values.shape()[0], values.shape()[1]);
    let span = if vmax > vmin { vmax - vmin } else { 1.0 };
    let mut img = RgbImage::from_pixel(width as u32, height as u32, BLANK);
    for ((row, col), &value) in values.indexed_iter() {
        if value.is_nan() {
            continue;
        }
        img.put_pixel(col as u32, row as u32, cmap.sample((value - vmin) / span));
    }
    img
}

/// Rasterizes three bands scaled to [0, 1] as an RGB panel; a NaN in any
/// band renders blank
pub fn rgb_panel(
    red: ArrayView2<'_, f32>,
    green: ArrayView2<'_, f32>,
    blue: ArrayView2<'_, f32>,
) -> RgbImage {
    let (height, width) = (red.shape()[0], red.shape()[1]);
    let mut img = RgbImage::from_pixel(width as u32, height as u32, BLANK);
    for row in 0..height {
        for col in 0..width {
            let (r, g, b) = (red[[row, col]], green[[row, col]], blue[[row, col]]);
            if r.is_nan() || g.is_nan() || b.is_nan() {
                continue;
            }
            img.put_pixel(col as u32, row as u32, Rgb([to_u8(r), to_u8(g), to_u8(b)]));
        }
    }
    img
}

fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Upscales a panel so its short side reaches a viewable size
pub fn upscale(img: &RgbImage) -> RgbImage {
    let short = img.width().min(img.height()).max(1);
    if short >= MIN_PANEL_DIM {
        return img.clone();
    }
    let factor = MIN_PANEL_DIM.div_ceil(short);
    imageops::resize(
        img,
        img.width() * factor,
        img.height() * factor,
        FilterType::Nearest,
    )
}

/// Composes panels left to right, wrapping after `col_wrap` columns
pub fn facet_grid(panels: &[RgbImage], col_wrap: usize) -> RgbImage {
    if panels.is_empty() {
        return RgbImage::from_pixel(MIN_PANEL_DIM, MIN_PANEL_DIM, BLANK);
    }
    let cols = panels.len().min(col_wrap.max(1));
    let rows = panels.len().div_ceil(cols);
    let cell_w = panels.iter().map(RgbImage::width).max().unwrap();
    let cell_h = panels.iter().map(RgbImage::height).max().unwrap();

    let total_w = cols as u32 * (cell_w + FACET_PAD) + FACET_PAD;
    let total_h = rows as u32 * (cell_h + FACET_PAD) + FACET_PAD;
    let mut canvas = RgbImage::from_pixel(total_w, total_h, BLANK);
    for (i, panel) in panels.iter().enumerate() {
        let x = (i % cols) as u32 * (cell_w + FACET_PAD) + FACET_PAD;
        let y = (i / cols) as u32 * (cell_h + FACET_PAD) + FACET_PAD;
        imageops::overlay(&mut canvas, panel, x as i64, y as i64);
    }
    canvas
}

/// Encodes a plot as JPEG into the writer, returning the byte count
pub fn write_jpeg<W: Write>(img: &RgbImage, out: &mut W) -> Result<u64> {
    let mut bytes = Vec::new();
    img.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY))?;
    out.write_all(&bytes)?;
    Ok(bytes.len() as u64)
}
