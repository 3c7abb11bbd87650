use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::correlation::{FastState, FullFrameState, SparseState, ZeroShift};
use crate::error::{BlobfinderError, Result};
use crate::frame::Frame;
use crate::pattern::MatchPattern;

use super::config::{CorrelationConfig, Strategy};
use super::types::{CorrelationResults, PeakResult};

/// Correlate every peak in every frame.
///
/// `peaks` are whole-pixel (row, col) positions; see
/// [`round_peaks`](crate::correlation::round_peaks) for float input.
/// All configuration errors are raised before the first frame is processed.
pub fn run(
    frames: &[Frame],
    peaks: &[[i64; 2]],
    pattern: &dyn MatchPattern,
    config: &CorrelationConfig,
    zero_shift: &ZeroShift,
) -> Result<CorrelationResults> {
    run_with_progress(frames, peaks, pattern, config, zero_shift, |_| {})
}

/// Same as [`run`], calling `on_frame_done(frames_completed)` after every
/// frame.
pub fn run_with_progress<F>(
    frames: &[Frame],
    peaks: &[[i64; 2]],
    pattern: &dyn MatchPattern,
    config: &CorrelationConfig,
    zero_shift: &ZeroShift,
    on_frame_done: F,
) -> Result<CorrelationResults>
where
    F: Fn(usize) + Send + Sync,
{
    let frame_shape = validate_inputs(frames, peaks, config, zero_shift)?;
    let upsample = config.upsample.factor()?;
    let n_peaks = peaks.len();

    info!(
        strategy = %config.strategy,
        backend = %config.backend,
        frames = frames.len(),
        peaks = n_peaks,
        "Starting correlation"
    );

    let counter = AtomicUsize::new(0);
    let report = || {
        let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
        on_frame_done(done);
    };

    let mut results = vec![PeakResult::default(); frames.len() * n_peaks];
    match config.strategy {
        Strategy::Fast => {
            let state = FastState::new(
                pattern,
                n_peaks,
                config.backend,
                config.byte_budget,
                config.prescale,
                upsample,
            )?;
            debug!(
                crop_size = state.crop_size(),
                buf_count = state.buf_count(),
                "Crop-based state ready"
            );
            run_partitioned(
                frames,
                peaks,
                zero_shift,
                &mut results,
                &state,
                |state: &mut FastState, frame, peaks, out| state.process_frame(frame, peaks, out),
                &report,
            )?;
        }
        Strategy::FullFrame => {
            let state = FullFrameState::new(
                pattern,
                frame_shape,
                n_peaks,
                config.byte_budget,
                config.prescale,
                upsample,
            )?;
            debug!(
                crop_size = state.crop_size(),
                buf_count = state.buf_count(),
                "Full-frame state ready"
            );
            run_partitioned(
                frames,
                peaks,
                zero_shift,
                &mut results,
                &state,
                |state: &mut FullFrameState, frame, peaks, out| {
                    state.process_frame(frame, peaks, out)
                },
                &report,
            )?;
        }
        Strategy::Sparse { steps } => {
            let state = SparseState::new(
                pattern,
                peaks,
                steps,
                frame_shape,
                zero_shift,
                config.prescale,
            )?;
            if upsample.is_some() {
                warn!("Sparse responses are refined with the parabola fit; upsampling ignored");
            }
            run_sparse(frames, &state, config.tile_rows, &mut results, &report)?;
        }
    }

    info!(frames = frames.len(), "Correlation complete");
    Ok(CorrelationResults::from_peak_results(
        frames.len(),
        n_peaks,
        &results,
    ))
}

/// Check inputs and return the common frame shape.
fn validate_inputs(
    frames: &[Frame],
    peaks: &[[i64; 2]],
    config: &CorrelationConfig,
    zero_shift: &ZeroShift,
) -> Result<(usize, usize)> {
    let first = frames.first().ok_or(BlobfinderError::EmptySequence)?;
    if peaks.is_empty() {
        return Err(BlobfinderError::EmptyPeaks);
    }
    let shape = first.shape();
    for frame in frames {
        config.backend.check_frame(frame)?;
        if frame.shape() != shape {
            return Err(BlobfinderError::ShapeMismatch {
                expected: shape,
                got: frame.shape(),
            });
        }
    }
    // A fixed neighbourhood per peak cannot follow a shift, whatever its length.
    if matches!(config.strategy, Strategy::Sparse { .. }) && !zero_shift.is_none() {
        return Err(BlobfinderError::ZeroShiftUnsupported);
    }
    zero_shift.validate(frames.len())?;
    Ok(shape)
}

/// Split frames into contiguous partitions, each processed by one worker
/// with its own copy of the working state.
fn run_partitioned<S, P>(
    frames: &[Frame],
    peaks: &[[i64; 2]],
    zero_shift: &ZeroShift,
    results: &mut [PeakResult],
    prototype: &S,
    process: P,
    report: &(dyn Fn() + Sync),
) -> Result<()>
where
    S: Clone + Send + Sync,
    P: Fn(&mut S, &Frame, &[[i64; 2]], &mut [PeakResult]) -> Result<()> + Sync,
{
    let n_peaks = peaks.len();
    let partitions = if frames.len() >= PARALLEL_FRAME_THRESHOLD {
        rayon::current_num_threads().max(1)
    } else {
        1
    };
    let frames_per_partition = frames.len().div_ceil(partitions);

    results
        .par_chunks_mut(frames_per_partition * n_peaks)
        .zip(frames.par_chunks(frames_per_partition))
        .enumerate()
        .try_for_each(|(partition, (out, part_frames))| {
            let mut state = prototype.clone();
            for (i, (frame, frame_out)) in part_frames
                .iter()
                .zip(out.chunks_mut(n_peaks))
                .enumerate()
            {
                let frame_index = partition * frames_per_partition + i;
                let shifted = zero_shift.apply(peaks, frame_index);
                process(&mut state, frame, &shifted, frame_out)?;
                report();
            }
            Ok(())
        })
}

/// Cut every frame into tiles, fold the tiles into one accumulator per
/// frame in parallel, then evaluate.
fn run_sparse(
    frames: &[Frame],
    state: &SparseState,
    tile_rows: usize,
    results: &mut [PeakResult],
    report: &(dyn Fn() + Sync),
) -> Result<()> {
    let n_peaks = state.peaks().len();
    results
        .par_chunks_mut(n_peaks)
        .zip(frames.par_iter())
        .enumerate()
        .try_for_each(|(frame_index, (out, frame))| {
            let tiles = frame.tiles(frame_index, tile_rows);
            let acc = tiles
                .par_iter()
                .try_fold(
                    || state.accumulator(),
                    |mut acc, tile| {
                        state.accumulate(&mut acc, tile)?;
                        Ok::<_, BlobfinderError>(acc)
                    },
                )
                .try_reduce(|| state.accumulator(), |a, b| Ok(a.merge(b)))?;
            state.finalize(&acc, out);
            report();
            Ok(())
        })
}
