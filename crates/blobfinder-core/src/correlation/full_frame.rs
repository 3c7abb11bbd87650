//! Full-frame correlation.
//!
//! One FFT correlation per frame, shared by all peaks. Faster than the
//! crop-based strategy for many peaks in small frames, but a strong peak
//! next to the one being evaluated leaks into its window.

use ndarray::{s, Array2, Array3, Axis};
use num_complex::Complex;

use crate::compute::fft::{roll, Fft2d};
use crate::error::{BlobfinderError, Result};
use crate::frame::Frame;
use crate::pattern::{build_template, MatchPattern};
use crate::pipeline::types::PeakResult;

use super::buffers::allocate_crop_bufs;
use super::crop::crop_windows_dense;
use super::evaluate::{evaluate_correlations, refine_result_upsampled};
use super::prescale::PreScale;

/// Per-partition working state of the full-frame strategy.
///
/// `frame_buf` first receives the densified, pre-scaled frame and is then
/// overwritten with the correlation map; `map_spectrum` holds the map's
/// unrolled spectrum and `crop_bufs` receive the map windows. All are fully
/// rewritten on every call.
#[derive(Clone)]
pub struct FullFrameState {
    crop_size: usize,
    frame_shape: (usize, usize),
    fft: Fft2d,
    template_spectrum: Array2<Complex<f64>>,
    frame_buf: Array2<f32>,
    map_spectrum: Array2<Complex<f64>>,
    crop_bufs: Array3<f32>,
    prescale: PreScale,
    upsample: Option<usize>,
}

impl FullFrameState {
    pub fn new(
        pattern: &dyn MatchPattern,
        frame_shape: (usize, usize),
        n_peaks: usize,
        byte_budget: usize,
        prescale: PreScale,
        upsample: Option<usize>,
    ) -> Result<Self> {
        let crop_size = pattern.crop_size();
        let template = build_template(pattern, frame_shape)?;
        let fft = Fft2d::new(frame_shape);
        Ok(Self {
            crop_size,
            frame_shape,
            template_spectrum: fft.forward(template.view()),
            fft,
            frame_buf: Array2::<f32>::zeros(frame_shape),
            map_spectrum: Array2::zeros(frame_shape),
            crop_bufs: allocate_crop_bufs(crop_size, n_peaks, byte_budget),
            prescale,
            upsample,
        })
    }

    pub fn crop_size(&self) -> usize {
        self.crop_size
    }

    /// Number of map windows evaluated per pass.
    pub fn buf_count(&self) -> usize {
        self.crop_bufs.len_of(Axis(0))
    }

    /// Correlation map of one frame, aligned with the frame: a feature at
    /// frame position `q` peaks at map position `q`.
    pub fn correlation_map(&mut self, frame: &Frame) -> Result<&Array2<f32>> {
        if frame.shape() != self.frame_shape {
            return Err(BlobfinderError::ShapeMismatch {
                expected: self.frame_shape,
                got: frame.shape(),
            });
        }
        // Sparse frames are densified here.
        frame.densify_into(&mut self.frame_buf)?;
        self.prescale.apply_inplace(&mut self.frame_buf);

        self.map_spectrum = self
            .fft
            .cross_spectrum(self.frame_buf.view(), &self.template_spectrum);
        let (h, w) = self.frame_shape;
        let map = roll(&self.fft.inverse(&self.map_spectrum), (h / 2, w / 2));
        self.frame_buf.zip_mut_with(&map, |dst, &v| *dst = v as f32);
        Ok(&self.frame_buf)
    }

    /// Correlate one frame and evaluate every peak. `peaks` already include
    /// the zero shift; `out` has one slot per peak.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        peaks: &[[i64; 2]],
        out: &mut [PeakResult],
    ) -> Result<()> {
        self.correlation_map(frame)?;

        let cs = self.crop_size;
        let buf_count = self.buf_count();
        for (block, out_block) in peaks.chunks(buf_count).zip(out.chunks_mut(buf_count)) {
            let size = block.len();
            let mut bufs = self.crop_bufs.slice_mut(s![..size, .., ..]);
            crop_windows_dense(self.frame_buf.view(), block, cs, bufs.view_mut());
            evaluate_correlations(bufs.view(), block, cs, out_block);
        }

        if let Some(factor) = self.upsample {
            let (h, w) = self.frame_shape;
            // Lag zero of the unrolled map sits at the frame center.
            let origin = [(h / 2) as i64, (w / 2) as i64];
            for slot in out.iter_mut() {
                let [row, col] = slot.center;
                if (0..h as i64).contains(&row) && (0..w as i64).contains(&col) {
                    refine_result_upsampled(&self.map_spectrum, origin, factor, slot);
                }
            }
        }
        Ok(())
    }
}
