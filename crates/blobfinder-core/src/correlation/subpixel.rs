//! Sub-pixel refinement of a correlation maximum.
//!
//! Two methods:
//! - **Parabola**: separable 3-point fit through the maximum and its direct
//!   neighbours in each axis. Cheap, slightly biased towards whole pixels.
//! - **Upsampled DFT**: a periodic correlation response is evaluated from
//!   its spectrum by matrix-multiply DFT on a fine grid around the parabola
//!   estimate (Guizar-Sicairos et al., "Efficient subpixel image
//!   registration algorithms", Optics Letters 33(2), 2008), and a parabola
//!   through the best grid point and its grid neighbours refines further.
//!
//! The DFT interpolation is only exact for a response that is one full
//! period of a circular correlation. A window cut out of a larger response
//! wraps around with a jump at its edges, which biases the interpolated
//! maximum, so callers pass the spectrum of the whole periodic response.

use std::f64::consts::TAU;

use ndarray::{Array2, ArrayView2};
use num_complex::Complex;

use crate::compute::fft::fft2d_forward;
use crate::consts::{PARABOLA_EPSILON, UPSAMPLE_SEARCH_HALF_WIDTH};

/// Refine peak location using parabola fits on the 3x3 neighborhood.
///
/// Returns (delta_row, delta_col) as fractional pixel offsets from the integer peak.
pub fn refine_peak_paraboloid(patch: ArrayView2<'_, f32>, peak_row: usize, peak_col: usize) -> (f64, f64) {
    let (dy, dx) = parabola_offsets(patch.dim(), peak_row, peak_col, |r, c| patch[[r, c]] as f64);
    (dy.clamp(-0.5, 0.5), dx.clamp(-0.5, 0.5))
}

/// Vertex offsets of the row and column parabolas through `(row, col)` and
/// its direct neighbours. Zero on the border.
fn parabola_offsets<F>(shape: (usize, usize), row: usize, col: usize, at: F) -> (f64, f64)
where
    F: Fn(usize, usize) -> f64,
{
    let (h, w) = shape;
    if row == 0 || row + 1 >= h || col == 0 || col + 1 >= w {
        return (0.0, 0.0);
    }
    (
        parabola_vertex(at(row - 1, col), at(row, col), at(row + 1, col)),
        parabola_vertex(at(row, col - 1), at(row, col), at(row, col + 1)),
    )
}

/// Vertex offset of the parabola through (-1, prev), (0, curr), (1, next).
fn parabola_vertex(prev: f64, curr: f64, next: f64) -> f64 {
    let curvature = prev - 2.0 * curr + next;
    if curvature.abs() > PARABOLA_EPSILON && curvature.is_finite() {
        (prev - next) / (2.0 * curvature)
    } else {
        0.0
    }
}

/// Refine a peak of `patch` by DFT upsampling, treating `patch` as one full
/// period of a circular correlation (as the crop-based strategy produces).
///
/// Returns (delta_row, delta_col) relative to the integer peak. Patches
/// smaller than 3x3 and factors below 2 use the parabola fit.
pub fn refine_peak_upsampled(
    patch: ArrayView2<'_, f32>,
    peak_row: usize,
    peak_col: usize,
    upsample_factor: usize,
) -> (f64, f64) {
    let (h, w) = patch.dim();
    let (dy, dx) = refine_peak_paraboloid(patch, peak_row, peak_col);
    if h < 3 || w < 3 || upsample_factor < 2 {
        return (dy, dx);
    }

    let estimate = (peak_row as f64 + dy, peak_col as f64 + dx);
    let spectrum = fft2d_forward(patch);
    let (row, col) = refine_upsampled_from_spectrum(&spectrum, estimate, upsample_factor);
    (row - peak_row as f64, col - peak_col as f64)
}

/// Refine a maximum of the periodic response whose 2D DFT is `spectrum`.
///
/// `estimate` is a (row, col) position in the response's index space, in
/// practice the parabola result. The response is evaluated on a grid of
/// spacing `1 / upsample_factor` spanning ±1 px around `estimate`; the best
/// grid point is refined with a parabola through its grid neighbours.
/// Returns the refined (row, col) in the same index space, possibly outside
/// `[0, n)` when the estimate is.
pub fn refine_upsampled_from_spectrum(
    spectrum: &Array2<Complex<f64>>,
    estimate: (f64, f64),
    upsample_factor: usize,
) -> (f64, f64) {
    let (h, w) = spectrum.dim();
    if h == 0 || w == 0 || upsample_factor < 2 {
        return estimate;
    }

    let upsample = upsample_factor as f64;
    let half_points = ((UPSAMPLE_SEARCH_HALF_WIDTH * upsample).round() as usize).max(1);
    let n_points = 2 * half_points + 1;
    let start_row = estimate.0 - half_points as f64 / upsample;
    let start_col = estimate.1 - half_points as f64 / upsample;

    // row_kernel: (n_points, h), col_kernel: (w, n_points)
    let row_kernel = build_inverse_dft_kernel(h, n_points, start_row, upsample);
    let col_kernel = build_inverse_dft_kernel(w, n_points, start_col, upsample).reversed_axes();
    let grid = matrix_multiply_dft(spectrum, &row_kernel, &col_kernel);

    let mut best: Option<((usize, usize), f64)> = None;
    for (idx, v) in grid.indexed_iter() {
        if !v.is_finite() {
            continue;
        }
        match best {
            Some((_, b)) if *v <= b => {}
            _ => best = Some((idx, *v)),
        }
    }
    let Some(((r, c), _)) = best else {
        return estimate;
    };

    let (fine_r, fine_c) = parabola_offsets(grid.dim(), r, c, |r, c| grid[[r, c]]);
    (
        start_row + (r as f64 + fine_r.clamp(-0.5, 0.5)) / upsample,
        start_col + (c as f64 + fine_c.clamp(-0.5, 0.5)) / upsample,
    )
}

/// Inverse-DFT kernel evaluating a length-`n` spectrum at `n_points`
/// positions `start + j / upsample_factor`.
///
/// Entry (j, k) is `exp(+i 2π freq_k pos_j / n)`, with `freq_k` centered
/// around DC.
fn build_inverse_dft_kernel(
    n: usize,
    n_points: usize,
    start: f64,
    upsample_factor: f64,
) -> Array2<Complex<f64>> {
    let half_n = n as f64 / 2.0;
    Array2::from_shape_fn((n_points, n), |(j, k)| {
        let freq = if (k as f64) <= half_n {
            k as f64
        } else {
            k as f64 - n as f64
        };
        let pos = start + j as f64 / upsample_factor;
        let phase = TAU * freq * pos / n as f64;
        Complex::new(phase.cos(), phase.sin())
    })
}

/// Real part of `row_kernel · spectrum · col_kernel / (h * w)`.
fn matrix_multiply_dft(
    spectrum: &Array2<Complex<f64>>,
    row_kernel: &Array2<Complex<f64>>,
    col_kernel: &Array2<Complex<f64>>,
) -> Array2<f64> {
    let (h, w) = spectrum.dim();
    let scale = 1.0 / (h * w) as f64;
    row_kernel.dot(spectrum).dot(col_kernel).mapv(|v| v.re * scale)
}
