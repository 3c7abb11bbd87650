use approx::assert_relative_eq;
use ndarray::{Array2, Array3};

use blobfinder_core::compute::fft::{
    correlate_with_spectrum, fft2d_forward, ifft2d_inverse, roll, Fft2d,
};
use blobfinder_core::compute::sparse::CscMatrix;
use blobfinder_core::compute::{select_crop_routine, ArrayBackend};
use blobfinder_core::correlation::buffers::{allocate_crop_bufs, buf_count};
use blobfinder_core::correlation::prescale::signed_log1p;
use blobfinder_core::correlation::PreScale;
use blobfinder_core::error::BlobfinderError;
use blobfinder_core::frame::{CooFrame, CsrFrame, Frame};

fn ramp(h: usize, w: usize) -> Array2<f32> {
    Array2::from_shape_fn((h, w), |(r, c)| (r * w + c) as f32)
}

#[test]
fn test_fft_roundtrip() {
    let data = Array2::from_shape_fn((8, 12), |(r, c)| ((r * 3 + c * 7) % 11) as f32 - 4.0);
    let back = ifft2d_inverse(&fft2d_forward(data.view()));
    for (a, b) in data.iter().zip(back.iter()) {
        assert_relative_eq!(*a as f64, *b, epsilon = 1e-9);
    }
}

#[test]
fn test_correlation_lag_convention() {
    let mut data = Array2::<f32>::zeros((8, 8));
    data[[3, 5]] = 1.0;
    let mut template = Array2::<f32>::zeros((8, 8));
    template[[0, 0]] = 1.0;

    let corr = correlate_with_spectrum(data.view(), &fft2d_forward(template.view()));
    assert_relative_eq!(corr[[3, 5]], 1.0, epsilon = 1e-9);
    assert_relative_eq!(corr.sum(), 1.0, epsilon = 1e-9);

    // Rolling by the template center aligns the map with the frame.
    let mut centered = Array2::<f32>::zeros((8, 8));
    centered[[4, 4]] = 1.0;
    let corr = correlate_with_spectrum(data.view(), &fft2d_forward(centered.view()));
    let map = roll(&corr, (4, 4));
    assert_relative_eq!(map[[3, 5]], 1.0, epsilon = 1e-9);
}

#[test]
fn test_planned_fft_matches_one_shot_helpers() {
    let fft = Fft2d::new((6, 10));
    assert_eq!(fft.shape(), (6, 10));
    let template = Array2::from_shape_fn((6, 10), |(r, c)| ((r + 2 * c) % 5) as f32);
    let template_spectrum = fft.forward(template.view());
    assert_eq!(template_spectrum, fft2d_forward(template.view()));

    // One plan serves any number of inputs, also through clones.
    let reused = fft.clone();
    for k in 0..3 {
        let data = Array2::from_shape_fn((6, 10), |(r, c)| ((r * 10 + c + k) % 7) as f32);
        let corr = reused.correlate(data.view(), &template_spectrum);
        let expected = correlate_with_spectrum(data.view(), &template_spectrum);
        for (a, b) in corr.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9);
        }
        let back = reused.inverse(&reused.forward(data.view()));
        for (a, b) in back.iter().zip(data.iter()) {
            assert_relative_eq!(*a, *b as f64, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_roll_wraps() {
    let data = Array2::from_shape_fn((3, 4), |(r, c)| (r * 4 + c) as f64);
    let rolled = roll(&data, (1, 3));
    assert_eq!(rolled[[1, 3]], 0.0);
    assert_eq!(rolled[[1, 0]], 1.0);
    assert_eq!(rolled[[0, 3]], 8.0);
}

#[test]
fn test_csc_from_triplets() {
    let m = CscMatrix::from_triplets(
        3,
        4,
        &[(0, 1, 2.0), (2, 1, 1.0), (0, 1, 3.0), (1, 3, 0.0), (5, 0, 9.0), (1, 0, 4.0)],
    );
    assert_eq!(m.shape(), (3, 4));
    assert_eq!(m.nnz(), 3);
    assert_eq!(m.column(1), (&[0usize, 2][..], &[5.0, 1.0][..]));
    assert_eq!(m.column(3).0.len(), 0);

    assert_eq!(m.dot(&[1.0, 2.0, 0.0, 7.0]), vec![10.0, 4.0, 2.0]);
    let mut out = vec![1.0; 3];
    m.axpy_column(0, 0.5, &mut out);
    assert_eq!(out, vec![1.0, 3.0, 1.0]);
}

#[test]
fn test_buffer_count() {
    // One 10x10 f32 window is 400 bytes.
    assert_eq!(buf_count(5, 100, 4000), 10);
    assert_eq!(buf_count(5, 3, 4000), 3);
    assert_eq!(buf_count(5, 100, 1), 1);
    assert_eq!(buf_count(5, 0, 1 << 19), 1);
    assert_eq!(allocate_crop_bufs(5, 100, 4000).dim(), (10, 10, 10));
}

#[test]
fn test_log_prescale_is_pointwise() {
    assert_eq!(signed_log1p(0.0f64), 0.0);
    assert_relative_eq!(signed_log1p(std::f64::consts::E - 1.0), 1.0, epsilon = 1e-12);
    assert_relative_eq!(signed_log1p(-3.0f32), -(4.0f32.ln()), epsilon = 1e-6);
    assert_eq!(PreScale::None.apply(-7.5f64), -7.5);

    let data = ramp(4, 4);
    let mut whole = data.clone();
    PreScale::Log.apply_inplace(&mut whole);
    let mut part = data.slice(ndarray::s![1..3, 2..]).to_owned();
    PreScale::Log.apply_inplace(&mut part);
    assert_eq!(part, whole.slice(ndarray::s![1..3, 2..]));
}

#[test]
fn test_sparse_frames_densify() {
    let coo = CooFrame::new((3, 4), &[(0, 1, 2.0), (2, 3, 5.0), (0, 1, 1.0)]).unwrap();
    assert_eq!(coo.nnz(), 3);
    let dense = Frame::Coo(coo.clone()).to_dense();
    assert_eq!(dense[[0, 1]], 3.0);
    assert_eq!(dense[[2, 3]], 5.0);
    assert_eq!(dense.sum(), 8.0);

    let csr = CsrFrame::from_coo(&coo);
    assert_eq!(csr.nnz(), 2);
    assert_eq!(Frame::Compressed(csr).to_dense(), dense);

    assert!(matches!(
        CooFrame::new((3, 4), &[(3, 0, 1.0)]),
        Err(BlobfinderError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_gather_window_matches_for_all_representations() {
    let data = ramp(6, 7);
    let frames = [
        Frame::Dense(data.clone()),
        Frame::Coo(CooFrame::from_dense(&data)),
        Frame::Compressed(CsrFrame::from_dense(&data)),
    ];
    for origin in [(-2, -3), (1, 2), (4, 5), (10, 10)] {
        let mut expected = Array2::<f32>::zeros((4, 4));
        for ((r, c), v) in expected.indexed_iter_mut() {
            let (y, x) = (origin.0 + r as i64, origin.1 + c as i64);
            if (0..6).contains(&y) && (0..7).contains(&x) {
                *v = data[[y as usize, x as usize]];
            }
        }
        for frame in &frames {
            let mut out = Array2::<f32>::from_elem((4, 4), -1.0);
            frame.gather_window(origin, out.view_mut());
            assert_eq!(out, expected, "{} at {origin:?}", frame.kind());
        }
    }
}

#[test]
fn test_tiles_cover_frame() {
    let data = ramp(7, 3);
    for frame in [Frame::Dense(data.clone()), Frame::Coo(CooFrame::from_dense(&data))] {
        let tiles = frame.tiles(2, 3);
        assert_eq!(tiles.len(), 3);
        assert_eq!(tiles[2].origin, (6, 0));
        assert_eq!(tiles[2].shape(), (1, 3));

        let mut rebuilt = Array2::<f32>::zeros((7, 3));
        for tile in &tiles {
            assert_eq!(tile.frame_index, 2);
            tile.for_each_pixel(|r, c, v| rebuilt[[r, c]] += v);
        }
        assert_eq!(rebuilt, data);
    }
}

#[test]
fn test_crop_routines() {
    let data = ramp(10, 10);
    let peaks = [[2, 2], [9, 0]];
    let mut sliced = Array3::<f32>::zeros((2, 6, 6));
    let mut gathered = Array3::<f32>::zeros((2, 6, 6));

    select_crop_routine(ArrayBackend::Dense)(
        &Frame::Dense(data.clone()),
        &peaks,
        3,
        sliced.view_mut(),
    )
    .unwrap();
    select_crop_routine(ArrayBackend::SparseCoo)(
        &Frame::Coo(CooFrame::from_dense(&data)),
        &peaks,
        3,
        gathered.view_mut(),
    )
    .unwrap();
    assert_eq!(sliced, gathered);
    // Window of peak (2, 2) starts at (-1, -1).
    assert_eq!(sliced[[0, 0, 0]], 0.0);
    assert_eq!(sliced[[0, 1, 1]], 0.0);
    assert_eq!(sliced[[0, 2, 3]], 12.0);

    let err = select_crop_routine(ArrayBackend::Dense)(
        &Frame::Coo(CooFrame::from_dense(&data)),
        &peaks,
        3,
        gathered.view_mut(),
    )
    .unwrap_err();
    assert!(matches!(err, BlobfinderError::BackendMismatch { .. }));
}

#[test]
fn test_backend_accepts_frames() {
    let data = ramp(2, 2);
    let dense = Frame::Dense(data.clone());
    let coo = Frame::Coo(CooFrame::from_dense(&data));
    assert!(ArrayBackend::Dense.accepts(&dense));
    assert!(ArrayBackend::Gpu.accepts(&dense));
    assert!(!ArrayBackend::Dense.accepts(&coo));
    assert!(ArrayBackend::SparseCoo.accepts(&coo));
    assert!(ArrayBackend::SparseCoo.is_sparse());
    assert!(matches!(
        ArrayBackend::SparseCompressed.check_frame(&coo),
        Err(BlobfinderError::BackendMismatch { .. })
    ));
}
