use crate::error::{BlobfinderError, Result};

/// Systematic per-frame offset added to every expected peak position,
/// e.g. to correct a descan error.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ZeroShift {
    #[default]
    None,
    /// One (row, col) vector for all frames.
    Global([f64; 2]),
    /// One (row, col) vector per frame, aligned with the frame sequence.
    PerFrame(Vec<[f64; 2]>),
}

impl ZeroShift {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn validate(&self, n_frames: usize) -> Result<()> {
        if let Self::PerFrame(shifts) = self {
            if shifts.len() != n_frames {
                return Err(BlobfinderError::ZeroShiftLength {
                    expected: n_frames,
                    got: shifts.len(),
                });
            }
        }
        Ok(())
    }

    /// Shift for `frame_index`, rounded to whole pixels.
    pub fn for_frame(&self, frame_index: usize) -> [i64; 2] {
        let shift = match self {
            Self::None => [0.0, 0.0],
            Self::Global(v) => *v,
            Self::PerFrame(shifts) => shifts.get(frame_index).copied().unwrap_or([0.0, 0.0]),
        };
        [shift[0].round() as i64, shift[1].round() as i64]
    }

    /// Expected peak positions of `frame_index` with the shift applied.
    pub fn apply(&self, peaks: &[[i64; 2]], frame_index: usize) -> Vec<[i64; 2]> {
        let [dy, dx] = self.for_frame(frame_index);
        peaks.iter().map(|p| [p[0] + dy, p[1] + dx]).collect()
    }
}

/// Round (row, col) peak positions to the nearest pixel.
pub fn round_peaks(peaks: &[[f64; 2]]) -> Vec<[i64; 2]> {
    peaks
        .iter()
        .map(|p| [p[0].round() as i64, p[1].round() as i64])
        .collect()
}
