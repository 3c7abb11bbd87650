use ndarray::{s, ArrayView2, ArrayViewMut2, ArrayViewMut3, Axis};

use crate::error::{BlobfinderError, Result};
use crate::frame::Frame;

/// Crop by slicing a dense frame. Only valid for dense host arrays.
pub fn crop_disks_from_frame_slicing(
    frame: &Frame,
    peaks: &[[i64; 2]],
    crop_size: usize,
    out: ArrayViewMut3<f32>,
) -> Result<()> {
    match frame {
        Frame::Dense(data) => {
            crop_windows_dense(data.view(), peaks, crop_size, out);
            Ok(())
        }
        other => Err(BlobfinderError::BackendMismatch {
            backend: "dense".to_string(),
            frame: other.kind().to_string(),
        }),
    }
}

/// Crop by gathering individual pixels; works for every representation.
pub fn crop_disks_from_frame(
    frame: &Frame,
    peaks: &[[i64; 2]],
    crop_size: usize,
    mut out: ArrayViewMut3<f32>,
) -> Result<()> {
    for (peak, window) in peaks.iter().zip(out.axis_iter_mut(Axis(0))) {
        let origin = (peak[0] - crop_size as i64, peak[1] - crop_size as i64);
        frame.gather_window(origin, window);
    }
    Ok(())
}

/// Fill `out[i]` with the `[peak - crop_size, peak + crop_size)` window of
/// `data`, zero outside the array.
pub fn crop_windows_dense(
    data: ArrayView2<'_, f32>,
    peaks: &[[i64; 2]],
    crop_size: usize,
    mut out: ArrayViewMut3<f32>,
) {
    for (peak, window) in peaks.iter().zip(out.axis_iter_mut(Axis(0))) {
        let origin = (peak[0] - crop_size as i64, peak[1] - crop_size as i64);
        crop_window_dense(data, origin, window);
    }
}

fn crop_window_dense(data: ArrayView2<'_, f32>, origin: (i64, i64), mut window: ArrayViewMut2<f32>) {
    let (h, w) = data.dim();
    let (win_h, win_w) = window.dim();
    window.fill(0.0);

    let y0 = origin.0.clamp(0, h as i64);
    let y1 = (origin.0 + win_h as i64).clamp(0, h as i64);
    let x0 = origin.1.clamp(0, w as i64);
    let x1 = (origin.1 + win_w as i64).clamp(0, w as i64);
    if y0 >= y1 || x0 >= x1 {
        return;
    }

    let src = data.slice(s![y0 as usize..y1 as usize, x0 as usize..x1 as usize]);
    let wy = (y0 - origin.0) as usize;
    let wx = (x0 - origin.1) as usize;
    window
        .slice_mut(s![wy..wy + src.nrows(), wx..wx + src.ncols()])
        .assign(&src);
}
