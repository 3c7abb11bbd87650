use std::sync::Arc;

use ndarray::{Array2, ArrayView2, Axis};
use num_complex::Complex;
use rayon::prelude::*;
use rustfft::{Fft, FftPlanner};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Forward and inverse 2D transforms for one array shape.
///
/// Planning happens once in [`Fft2d::new`]; clones share the plans, so a
/// worker state holding one can be cloned per partition without
/// re-planning.
#[derive(Clone)]
pub struct Fft2d {
    shape: (usize, usize),
    forward_row: Arc<dyn Fft<f64>>,
    forward_col: Arc<dyn Fft<f64>>,
    inverse_row: Arc<dyn Fft<f64>>,
    inverse_col: Arc<dyn Fft<f64>>,
}

impl Fft2d {
    pub fn new(shape: (usize, usize)) -> Self {
        let (h, w) = shape;
        let mut planner = FftPlanner::new();
        Self {
            shape,
            forward_row: planner.plan_fft_forward(w),
            forward_col: planner.plan_fft_forward(h),
            inverse_row: planner.plan_fft_inverse(w),
            inverse_col: planner.plan_fft_inverse(h),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Forward transform of a real array of the planned shape.
    pub fn forward(&self, data: ArrayView2<'_, f32>) -> Array2<Complex<f64>> {
        debug_assert_eq!(data.dim(), self.shape);
        let mut result = data.mapv(|v| Complex::new(v as f64, 0.0));
        transform_rows(&mut result, &self.forward_row);
        transform_cols(&mut result, &self.forward_col);
        result
    }

    /// Inverse transform, returning the real part normalized by `1/(h*w)`.
    pub fn inverse(&self, data: &Array2<Complex<f64>>) -> Array2<f64> {
        debug_assert_eq!(data.dim(), self.shape);
        let (h, w) = self.shape;
        let mut work = data.clone();
        transform_cols(&mut work, &self.inverse_col);
        transform_rows(&mut work, &self.inverse_row);

        let scale = 1.0 / (h * w) as f64;
        work.mapv(|v| v.re * scale)
    }

    /// Spectrum of the circular cross-correlation of `data` with the
    /// template whose spectrum is given.
    pub fn cross_spectrum(
        &self,
        data: ArrayView2<'_, f32>,
        template_spectrum: &Array2<Complex<f64>>,
    ) -> Array2<Complex<f64>> {
        let mut spectrum = self.forward(data);
        ndarray::Zip::from(&mut spectrum)
            .and(template_spectrum)
            .for_each(|s, t| *s *= t.conj());
        spectrum
    }

    /// Circular cross-correlation `c[s] = sum_x data[x + s] * template[x]`.
    ///
    /// Index `s` wraps around; callers roll the result to put zero lag where
    /// they need it.
    pub fn correlate(
        &self,
        data: ArrayView2<'_, f32>,
        template_spectrum: &Array2<Complex<f64>>,
    ) -> Array2<f64> {
        self.inverse(&self.cross_spectrum(data, template_spectrum))
    }
}

/// 2D forward FFT of a real array, planned for this call only.
pub fn fft2d_forward(data: ArrayView2<'_, f32>) -> Array2<Complex<f64>> {
    Fft2d::new(data.dim()).forward(data)
}

/// 2D inverse FFT, returning the real part normalized by `1/(h*w)`.
pub fn ifft2d_inverse(data: &Array2<Complex<f64>>) -> Array2<f64> {
    Fft2d::new(data.dim()).inverse(data)
}

/// One-shot form of [`Fft2d::correlate`].
pub fn correlate_with_spectrum(
    data: ArrayView2<'_, f32>,
    template_spectrum: &Array2<Complex<f64>>,
) -> Array2<f64> {
    Fft2d::new(data.dim()).correlate(data, template_spectrum)
}

/// Circularly shift `data` so that element `[0, 0]` moves to `shift`.
pub fn roll(data: &Array2<f64>, shift: (usize, usize)) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut result = Array2::<f64>::zeros((h, w));
    for ((r, c), &v) in data.indexed_iter() {
        result[[(r + shift.0) % h, (c + shift.1) % w]] = v;
    }
    result
}

fn transform_rows(data: &mut Array2<Complex<f64>>, fft: &Arc<dyn Fft<f64>>) {
    let (h, w) = data.dim();
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        data.axis_iter_mut(Axis(0))
            .into_par_iter()
            .for_each(|mut row| {
                let mut row_data = row.to_vec();
                fft.process(&mut row_data);
                row.iter_mut().zip(row_data).for_each(|(dst, v)| *dst = v);
            });
    } else {
        for mut row in data.axis_iter_mut(Axis(0)) {
            let mut row_data = row.to_vec();
            fft.process(&mut row_data);
            row.iter_mut().zip(row_data).for_each(|(dst, v)| *dst = v);
        }
    }
}

fn transform_cols(data: &mut Array2<Complex<f64>>, fft: &Arc<dyn Fft<f64>>) {
    let (h, w) = data.dim();
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        data.axis_iter_mut(Axis(1))
            .into_par_iter()
            .for_each(|mut col| {
                let mut col_data = col.to_vec();
                fft.process(&mut col_data);
                col.iter_mut().zip(col_data).for_each(|(dst, v)| *dst = v);
            });
    } else {
        for mut col in data.axis_iter_mut(Axis(1)) {
            let mut col_data = col.to_vec();
            fft.process(&mut col_data);
            col.iter_mut().zip(col_data).for_each(|(dst, v)| *dst = v);
        }
    }
}
