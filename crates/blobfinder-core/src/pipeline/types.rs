use ndarray::{Array2, Array3};

/// Result for one peak in one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PeakResult {
    /// Integer (row, col) position. May lie outside the frame; callers
    /// indexing into frame data must bounds-check.
    pub center: [i64; 2],
    /// Sub-pixel refined (row, col) position.
    pub refined: [f64; 2],
    /// Correlation value at `center`, in pre-scaled units.
    pub height: f32,
    /// Peak quality, see [`peak_elevation`](crate::correlation::peak_elevation).
    pub elevation: f32,
}

/// Aligned result arrays, indexed `[frame][peak]`.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationResults {
    /// Shape (frames, peaks, 2).
    pub centers: Array3<i64>,
    /// Shape (frames, peaks, 2).
    pub refineds: Array3<f32>,
    /// Shape (frames, peaks).
    pub heights: Array2<f32>,
    /// Shape (frames, peaks).
    pub elevations: Array2<f32>,
}

impl CorrelationResults {
    /// Pack a row-major `[frame][peak]` list of results.
    pub fn from_peak_results(n_frames: usize, n_peaks: usize, results: &[PeakResult]) -> Self {
        let at = |f: usize, p: usize| &results[f * n_peaks + p];
        Self {
            centers: Array3::from_shape_fn((n_frames, n_peaks, 2), |(f, p, i)| at(f, p).center[i]),
            refineds: Array3::from_shape_fn((n_frames, n_peaks, 2), |(f, p, i)| {
                at(f, p).refined[i] as f32
            }),
            heights: Array2::from_shape_fn((n_frames, n_peaks), |(f, p)| at(f, p).height),
            elevations: Array2::from_shape_fn((n_frames, n_peaks), |(f, p)| at(f, p).elevation),
        }
    }

    pub fn n_frames(&self) -> usize {
        self.heights.nrows()
    }

    pub fn n_peaks(&self) -> usize {
        self.heights.ncols()
    }

    pub fn get(&self, frame: usize, peak: usize) -> PeakResult {
        PeakResult {
            center: [self.centers[[frame, peak, 0]], self.centers[[frame, peak, 1]]],
            refined: [
                self.refineds[[frame, peak, 0]] as f64,
                self.refineds[[frame, peak, 1]] as f64,
            ],
            height: self.heights[[frame, peak]],
            elevation: self.elevations[[frame, peak]],
        }
    }
}
