use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use blobfinder_core::compute::ArrayBackend;
use blobfinder_core::frame::{CooFrame, CsrFrame, Frame};
use blobfinder_core::pipeline::CorrelationResults;
use image::{GrayImage, ImageFormat, Luma};
use ndarray::Array2;
use tracing::debug;

/// Load an image as raw grayscale intensities (16-bit range).
pub fn load_intensities(path: &Path) -> Result<Array2<f32>> {
    let img = image::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let gray = img.to_luma16();
    let (w, h) = gray.dimensions();
    let mut data = Array2::<f32>::zeros((h as usize, w as usize));

    for row in 0..h as usize {
        for col in 0..w as usize {
            data[[row, col]] = gray.get_pixel(col as u32, row as u32).0[0] as f32;
        }
    }

    debug!(path = %path.display(), rows = h, cols = w, "Loaded frame");
    Ok(data)
}

/// Wrap dense intensities in the representation `backend` expects.
pub fn to_frame(data: Array2<f32>, backend: ArrayBackend) -> Frame {
    match backend {
        ArrayBackend::Dense | ArrayBackend::Gpu => Frame::Dense(data),
        ArrayBackend::SparseCoo => Frame::Coo(CooFrame::from_dense(&data)),
        ArrayBackend::SparseCompressed => Frame::Compressed(CsrFrame::from_dense(&data)),
    }
}

/// Save an array as 8-bit grayscale PNG, stretched to its min/max.
pub fn save_png_stretched(data: &Array2<f32>, path: &Path) -> Result<()> {
    let (h, w) = data.dim();
    let min = data.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = data.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let range = if max > min { max - min } else { 1.0 };

    let mut img = GrayImage::new(w as u32, h as u32);
    for row in 0..h {
        for col in 0..w {
            let val = ((data[[row, col]] - min) / range * 255.0).clamp(0.0, 255.0) as u8;
            img.put_pixel(col as u32, row as u32, Luma([val]));
        }
    }

    img.save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// One line per (frame, peak).
pub fn results_csv(results: &CorrelationResults) -> String {
    let mut out = String::from("frame,peak,center_row,center_col,refined_row,refined_col,height,elevation\n");
    for frame in 0..results.n_frames() {
        for peak in 0..results.n_peaks() {
            let r = results.get(frame, peak);
            let _ = writeln!(
                out,
                "{frame},{peak},{},{},{:.4},{:.4},{},{}",
                r.center[0], r.center[1], r.refined[0], r.refined[1], r.height, r.elevation
            );
        }
    }
    out
}
