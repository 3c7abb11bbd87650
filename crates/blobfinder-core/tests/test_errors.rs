use std::sync::atomic::{AtomicUsize, Ordering};

use blobfinder_core::compute::ArrayBackend;
use blobfinder_core::correlation::ZeroShift;
use blobfinder_core::error::BlobfinderError;
use blobfinder_core::frame::{CooFrame, CsrFrame, Frame};
use blobfinder_core::pattern::{MatchPattern, Pattern};
use blobfinder_core::pipeline::config::{CorrelationConfig, Strategy, Upsample};
use blobfinder_core::pipeline::orchestrator::run_with_progress;

#[allow(dead_code)]
mod common;

use common::{config, dense, gaussian_image, gaussian_pattern, ALL_STRATEGIES};

/// Run and return the error together with the number of frames that were
/// processed before it was raised.
fn run_expecting_error(
    frames: &[Frame],
    peaks: &[[i64; 2]],
    pattern: &dyn MatchPattern,
    config: &CorrelationConfig,
    zero_shift: &ZeroShift,
) -> (BlobfinderError, usize) {
    let processed = AtomicUsize::new(0);
    let err = run_with_progress(frames, peaks, pattern, config, zero_shift, |_| {
        processed.fetch_add(1, Ordering::Relaxed);
    })
    .unwrap_err();
    (err, processed.load(Ordering::Relaxed))
}

fn pattern() -> Pattern {
    gaussian_pattern(1.5, 4.0)
}

fn test_frames(n: usize) -> Vec<Frame> {
    (0..n)
        .map(|_| dense(gaussian_image((24, 24), &[(12.0, 12.0)], 1.5, 10.0)))
        .collect()
}

#[test]
fn test_empty_frame_sequence_is_rejected() {
    let pattern = pattern();
    for strategy in ALL_STRATEGIES {
        let (err, processed) =
            run_expecting_error(&[], &[[12, 12]], &pattern, &config(strategy), &ZeroShift::None);
        assert!(matches!(err, BlobfinderError::EmptySequence), "{strategy}: {err}");
        assert_eq!(processed, 0);
    }
}

#[test]
fn test_empty_peak_list_is_rejected() {
    let pattern = pattern();
    for strategy in ALL_STRATEGIES {
        let (err, processed) =
            run_expecting_error(&test_frames(2), &[], &pattern, &config(strategy), &ZeroShift::None);
        assert!(matches!(err, BlobfinderError::EmptyPeaks), "{strategy}: {err}");
        assert_eq!(processed, 0);
    }
}

#[test]
fn test_frame_representation_must_match_backend() {
    let image = gaussian_image((24, 24), &[(12.0, 12.0)], 1.5, 10.0);
    let as_dense = Frame::Dense(image.clone());
    let as_coo = Frame::Coo(CooFrame::from_dense(&image));
    let as_csr = Frame::Compressed(CsrFrame::from_dense(&image));
    // (backend, matching frame, offending frame)
    let cases = [
        (ArrayBackend::SparseCoo, &as_coo, &as_dense),
        (ArrayBackend::Dense, &as_dense, &as_coo),
        (ArrayBackend::SparseCompressed, &as_csr, &as_coo),
        (ArrayBackend::Gpu, &as_dense, &as_csr),
    ];

    for strategy in ALL_STRATEGIES {
        for (backend, good, bad) in cases {
            let cfg = CorrelationConfig {
                backend,
                ..config(strategy)
            };
            // The offending frame comes last; nothing may run before the check.
            let frames = vec![good.clone(), good.clone(), bad.clone()];
            let (err, processed) =
                run_expecting_error(&frames, &[[12, 12]], &pattern(), &cfg, &ZeroShift::None);
            match err {
                BlobfinderError::BackendMismatch { backend: b, frame: f } => {
                    assert_eq!(b, backend.to_string());
                    assert_eq!(f, bad.kind());
                }
                other => panic!("{strategy} {backend}: unexpected {other}"),
            }
            assert_eq!(processed, 0, "{strategy} {backend}");
        }
    }
}

#[test]
fn test_frames_must_share_one_shape() {
    let pattern = pattern();
    let mut frames = test_frames(2);
    frames.push(dense(gaussian_image((24, 20), &[(12.0, 10.0)], 1.5, 10.0)));
    for strategy in ALL_STRATEGIES {
        let (err, processed) =
            run_expecting_error(&frames, &[[12, 12]], &pattern, &config(strategy), &ZeroShift::None);
        assert!(
            matches!(
                err,
                BlobfinderError::ShapeMismatch {
                    expected: (24, 24),
                    got: (24, 20)
                }
            ),
            "{strategy}: {err}"
        );
        assert_eq!(processed, 0);
    }
}

#[test]
fn test_per_frame_zero_shift_length_is_checked() {
    let pattern = pattern();
    let shift = ZeroShift::PerFrame(vec![[0.0, 0.0]; 2]);
    for strategy in [Strategy::Fast, Strategy::FullFrame] {
        let (err, processed) =
            run_expecting_error(&test_frames(3), &[[12, 12]], &pattern, &config(strategy), &shift);
        assert!(
            matches!(err, BlobfinderError::ZeroShiftLength { expected: 3, got: 2 }),
            "{strategy}: {err}"
        );
        assert_eq!(processed, 0);
    }
}

#[test]
fn test_sparse_rejects_any_zero_shift_before_its_length() {
    let pattern = pattern();
    let cfg = config(Strategy::Sparse { steps: 2 });
    let shifts = [
        ZeroShift::Global([1.0, -1.0]),
        ZeroShift::PerFrame(vec![[0.0, 0.0]; 3]),
        // Wrong length as well: the sparse restriction is reported.
        ZeroShift::PerFrame(vec![[0.0, 0.0]; 5]),
    ];
    for shift in &shifts {
        let (err, processed) =
            run_expecting_error(&test_frames(3), &[[12, 12]], &pattern, &cfg, shift);
        assert!(matches!(err, BlobfinderError::ZeroShiftUnsupported), "{shift:?}: {err}");
        assert_eq!(processed, 0);
    }
}

#[test]
fn test_upsample_factor_below_two_is_rejected() {
    let pattern = pattern();
    for factor in [0, 1] {
        for strategy in ALL_STRATEGIES {
            let cfg = CorrelationConfig {
                upsample: Upsample::Factor(factor),
                ..config(strategy)
            };
            let (err, processed) =
                run_expecting_error(&test_frames(4), &[[12, 12]], &pattern, &cfg, &ZeroShift::None);
            assert!(
                matches!(err, BlobfinderError::InvalidUpsample(f) if f == factor),
                "{strategy}: {err}"
            );
            assert_eq!(processed, 0);
        }
    }
}

#[test]
fn test_full_frame_template_must_fit_the_frame() {
    // Crop size 6 needs a 12x12 template; the frames are 8x8.
    let pattern = gaussian_pattern(1.5, 6.0);
    let frames = vec![dense(gaussian_image((8, 8), &[(4.0, 4.0)], 1.5, 10.0)); 2];
    let (err, processed) = run_expecting_error(
        &frames,
        &[[4, 4]],
        &pattern,
        &config(Strategy::FullFrame),
        &ZeroShift::None,
    );
    assert!(
        matches!(
            err,
            BlobfinderError::TemplateTooSmall {
                required: (12, 12),
                got: (8, 8)
            }
        ),
        "{err}"
    );
    assert_eq!(processed, 0);
}

#[test]
fn test_invalid_pattern_is_rejected() {
    let pattern = Pattern::Gaussian {
        sigma: -1.0,
        search: Some(4.0),
    };
    for strategy in ALL_STRATEGIES {
        let (err, processed) = run_expecting_error(
            &test_frames(2),
            &[[12, 12]],
            &pattern,
            &config(strategy),
            &ZeroShift::None,
        );
        assert!(matches!(err, BlobfinderError::InvalidPattern(_)), "{strategy}: {err}");
        assert_eq!(processed, 0);
    }
}
