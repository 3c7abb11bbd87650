use ndarray::{Array2, ArrayView2, ArrayView3, Axis};
use num_complex::Complex;

use crate::consts::ELEVATION_MIN_RADIUS;
use crate::pipeline::types::PeakResult;

use super::subpixel::{
    refine_peak_paraboloid, refine_peak_upsampled, refine_upsampled_from_spectrum,
};

/// Evaluation of one correlation patch, in patch coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatchPeak {
    /// (row, col) of the maximum.
    pub center: (usize, usize),
    /// Sub-pixel (row, col) of the maximum.
    pub refined: (f64, f64),
    pub height: f32,
    pub elevation: f32,
}

/// Locate, refine and score the maximum of a correlation patch.
///
/// Never fails: a flat or empty patch yields a well-defined result with
/// zero elevation. With `upsample`, `patch` is taken as one full period of
/// a circular correlation, see [`refine_peak_upsampled`].
pub fn evaluate_patch(patch: ArrayView2<'_, f32>, upsample: Option<usize>) -> PatchPeak {
    let (h, w) = patch.dim();
    let center = argmax(patch).unwrap_or((h / 2, w / 2));
    let height = patch
        .get([center.0, center.1])
        .copied()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0);

    let (dy, dx) = match upsample {
        Some(factor) => refine_peak_upsampled(patch, center.0, center.1, factor),
        None => refine_peak_paraboloid(patch, center.0, center.1),
    };

    PatchPeak {
        center,
        refined: (center.0 as f64 + dy, center.1 as f64 + dx),
        height,
        elevation: peak_elevation(patch, center, height),
    }
}

/// First maximum in row-major order, ignoring non-finite values.
pub fn argmax(patch: ArrayView2<'_, f32>) -> Option<(usize, usize)> {
    let mut best: Option<((usize, usize), f32)> = None;
    for (idx, &v) in patch.indexed_iter() {
        if !v.is_finite() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((idx, v)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Slope of the tightest cone with apex `height` at `center` that touches
/// the patch at a distance of at least [`ELEVATION_MIN_RADIUS`].
///
/// An isolated, sharp peak gives a steep cone; a noisy background or a
/// neighbouring peak pulls the slope down. The result is never negative;
/// a patch without any pixel far enough from the center scores zero.
pub fn peak_elevation(patch: ArrayView2<'_, f32>, center: (usize, usize), height: f32) -> f32 {
    let mut slope = f64::INFINITY;
    for ((r, c), &v) in patch.indexed_iter() {
        if !v.is_finite() {
            continue;
        }
        let dy = r as f64 - center.0 as f64;
        let dx = c as f64 - center.1 as f64;
        let dist = (dy * dy + dx * dx).sqrt();
        if dist >= ELEVATION_MIN_RADIUS {
            slope = slope.min((height as f64 - v as f64) / dist);
        }
    }
    if slope.is_finite() {
        slope.max(0.0) as f32
    } else {
        0.0
    }
}

/// Evaluate one patch per peak and map the results back to frame
/// coordinates, refining with the parabola fit.
///
/// Patch index `half_width` corresponds to the expected peak position, so a
/// maximum at patch index `i` lies at `peak - half_width + i`. Centers are
/// not clipped to the frame.
pub fn evaluate_correlations(
    corrs: ArrayView3<'_, f32>,
    peaks: &[[i64; 2]],
    half_width: usize,
    out: &mut [PeakResult],
) {
    for ((patch, peak), slot) in corrs.axis_iter(Axis(0)).zip(peaks).zip(out.iter_mut()) {
        *slot = evaluate_window(patch, *peak, half_width);
    }
}

/// [`evaluate_patch`] with parabola refinement, in frame coordinates.
pub fn evaluate_window(patch: ArrayView2<'_, f32>, peak: [i64; 2], half_width: usize) -> PeakResult {
    let found = evaluate_patch(patch, None);
    let origin_y = peak[0] - half_width as i64;
    let origin_x = peak[1] - half_width as i64;
    PeakResult {
        center: [
            origin_y + found.center.0 as i64,
            origin_x + found.center.1 as i64,
        ],
        refined: [
            origin_y as f64 + found.refined.0,
            origin_x as f64 + found.refined.1,
        ],
        height: found.height,
        elevation: found.elevation,
    }
}

/// Replace `result.refined` by DFT upsampling of a periodic correlation
/// response, starting from the current refined position.
///
/// `spectrum` is the 2D DFT of the response and `origin` the frame
/// position of the response's index (0, 0).
pub fn refine_result_upsampled(
    spectrum: &Array2<Complex<f64>>,
    origin: [i64; 2],
    upsample_factor: usize,
    result: &mut PeakResult,
) {
    let estimate = (
        result.refined[0] - origin[0] as f64,
        result.refined[1] - origin[1] as f64,
    );
    let (row, col) = refine_upsampled_from_spectrum(spectrum, estimate, upsample_factor);
    result.refined = [origin[0] as f64 + row, origin[1] as f64 + col];
}
