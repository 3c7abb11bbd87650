//! Crop-based correlation.
//!
//! Every peak gets its own `(2 * crop_size)²` window, correlated with the
//! template independently. Neighbouring peaks outside the window cannot
//! interfere, at the cost of one FFT pair per peak.

use ndarray::{s, Array2, Array3, Axis};
use num_complex::Complex;

use crate::compute::fft::{roll, Fft2d};
use crate::compute::{select_crop_routine, ArrayBackend, CropRoutine};
use crate::error::Result;
use crate::frame::Frame;
use crate::pattern::{build_template, MatchPattern};
use crate::pipeline::types::PeakResult;

use super::buffers::allocate_crop_bufs;
use super::evaluate::{evaluate_window, refine_result_upsampled};
use super::prescale::PreScale;

/// Per-partition working state of the crop-based strategy.
///
/// The crop buffers are scratch: every call overwrites the windows it
/// reads, so one state can serve any number of frames sequentially but must
/// not be shared between concurrent workers.
#[derive(Clone)]
pub struct FastState {
    crop_size: usize,
    fft: Fft2d,
    template_spectrum: Array2<Complex<f64>>,
    crop_bufs: Array3<f32>,
    crop_routine: CropRoutine,
    prescale: PreScale,
    upsample: Option<usize>,
}

impl FastState {
    pub fn new(
        pattern: &dyn MatchPattern,
        n_peaks: usize,
        backend: ArrayBackend,
        byte_budget: usize,
        prescale: PreScale,
        upsample: Option<usize>,
    ) -> Result<Self> {
        let crop_size = pattern.crop_size();
        let window = 2 * crop_size;
        let template = build_template(pattern, (window, window))?;
        let fft = Fft2d::new((window, window));
        Ok(Self {
            crop_size,
            template_spectrum: fft.forward(template.view()),
            fft,
            crop_bufs: allocate_crop_bufs(crop_size, n_peaks, byte_budget),
            crop_routine: select_crop_routine(backend),
            prescale,
            upsample,
        })
    }

    pub fn crop_size(&self) -> usize {
        self.crop_size
    }

    /// Number of peaks handled per pass.
    pub fn buf_count(&self) -> usize {
        self.crop_bufs.len_of(Axis(0))
    }

    /// Correlate and evaluate every peak of one frame. `peaks` already
    /// include the zero shift; `out` has one slot per peak.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        peaks: &[[i64; 2]],
        out: &mut [PeakResult],
    ) -> Result<()> {
        let cs = self.crop_size;
        let buf_count = self.buf_count();

        for (block, out_block) in peaks.chunks(buf_count).zip(out.chunks_mut(buf_count)) {
            let size = block.len();
            let mut bufs = self.crop_bufs.slice_mut(s![..size, .., ..]);
            (self.crop_routine)(frame, block, cs, bufs.view_mut())?;
            self.prescale.apply_inplace(&mut bufs);

            for ((mut buf, peak), slot) in bufs
                .axis_iter_mut(Axis(0))
                .zip(block)
                .zip(out_block.iter_mut())
            {
                let spectrum = self.fft.cross_spectrum(buf.view(), &self.template_spectrum);
                // Zero lag lands at (crop_size, crop_size).
                let corr = roll(&self.fft.inverse(&spectrum), (cs, cs));
                buf.zip_mut_with(&corr, |dst, &v| *dst = v as f32);

                *slot = evaluate_window(buf.view(), *peak, cs);
                if let Some(factor) = self.upsample {
                    // Lag zero of the unrolled correlation sits at the peak.
                    refine_result_upsampled(&spectrum, *peak, factor, slot);
                }
            }
        }
        Ok(())
    }
}
