//! Correlation engines and the shared peak evaluator.
//!
//! Three strategies share one result contract ([`PeakResult`]):
//!
//! - [`fast`]: crop a window around every peak and correlate each window
//!   with the template in the frequency domain.
//! - [`full_frame`]: correlate the template against the whole frame once and
//!   read each peak's window out of the correlation map.
//! - [`sparse`]: direct correlation through a precomputed sparse mask stack,
//!   accumulated tile by tile.
//!
//! [`PeakResult`]: crate::pipeline::types::PeakResult

pub mod buffers;
pub mod crop;
pub mod evaluate;
pub mod fast;
pub mod full_frame;
pub mod prescale;
pub mod sparse;
pub mod subpixel;
pub mod zero_shift;

pub use evaluate::{
    evaluate_correlations, evaluate_patch, evaluate_window, peak_elevation, refine_result_upsampled,
    PatchPeak,
};
pub use fast::FastState;
pub use full_frame::FullFrameState;
pub use prescale::PreScale;
pub use sparse::{SparseAccumulator, SparseState};
pub use zero_shift::{round_peaks, ZeroShift};
