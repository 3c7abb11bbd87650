use ndarray::Array3;
use tracing::debug;

/// Number of `(2 * crop_size)²` f32 windows that fit into `byte_budget`,
/// at least one and at most `n_peaks`.
///
/// The budget only sets how many peaks are processed per pass; results do
/// not depend on it.
pub fn buf_count(crop_size: usize, n_peaks: usize, byte_budget: usize) -> usize {
    let window_bytes = (2 * crop_size).pow(2) * std::mem::size_of::<f32>();
    let fit = byte_budget / window_bytes.max(1);
    fit.max(1).min(n_peaks.max(1))
}

/// Allocate `(buf_count, 2 * crop_size, 2 * crop_size)` scratch windows.
pub fn allocate_crop_bufs(crop_size: usize, n_peaks: usize, byte_budget: usize) -> Array3<f32> {
    let count = buf_count(crop_size, n_peaks, byte_budget);
    debug!(
        crop_size,
        n_peaks,
        byte_budget,
        buf_count = count,
        "Allocating crop buffers"
    );
    Array3::<f32>::zeros((count, 2 * crop_size, 2 * crop_size))
}
