#[allow(dead_code)]
mod common;

use blobfinder_core::correlation::{round_peaks, ZeroShift};
use blobfinder_core::error::BlobfinderError;
use blobfinder_core::frame::Frame;
use blobfinder_core::pipeline::config::Strategy;
use blobfinder_core::pipeline::run;

use common::{config, dense, gaussian_image, gaussian_pattern};

fn shifted_frames() -> Vec<Frame> {
    // Lattice of two disks drifting from frame to frame.
    [(0.0, 0.0), (2.0, -3.0), (-1.0, 4.0), (3.0, 1.0)]
        .iter()
        .map(|&(dy, dx)| {
            dense(gaussian_image(
                (40, 40),
                &[(14.0 + dy, 14.0 + dx), (24.0 + dy, 22.0 + dx)],
                1.5,
                60.0,
            ))
        })
        .collect()
}

#[test]
fn test_shift_rounding() {
    let shift = ZeroShift::Global([1.6, -0.4]);
    assert_eq!(shift.for_frame(0), [2, 0]);
    assert_eq!(shift.for_frame(99), [2, 0]);
    assert_eq!(shift.apply(&[[10, 10], [0, -5]], 0), vec![[12, 10], [2, -5]]);

    let per_frame = ZeroShift::PerFrame(vec![[0.0, 0.0], [-2.5, 1.49]]);
    assert_eq!(per_frame.for_frame(1), [-3, 1]);
    assert_eq!(ZeroShift::None.for_frame(3), [0, 0]);

    assert_eq!(round_peaks(&[[1.4, 2.6], [-0.6, 0.5]]), vec![[1, 3], [-1, 1]]);
}

#[test]
fn test_per_frame_shift_equals_shifted_peaks() {
    let frames = shifted_frames();
    let pattern = gaussian_pattern(1.5, 5.0);
    let peaks = [[14, 14], [24, 22]];
    let shifts = vec![[0.0, 0.0], [2.0, -3.0], [-1.0, 4.0], [3.0, 1.0]];

    for strategy in [Strategy::Fast, Strategy::FullFrame] {
        let with_shift = run(
            &frames,
            &peaks,
            &pattern,
            &config(strategy),
            &ZeroShift::PerFrame(shifts.clone()),
        )
        .unwrap();

        for (i, frame) in frames.iter().enumerate() {
            let shifted: Vec<[i64; 2]> = peaks
                .iter()
                .map(|p| [p[0] + shifts[i][0] as i64, p[1] + shifts[i][1] as i64])
                .collect();
            let direct = run(
                std::slice::from_ref(frame),
                &shifted,
                &pattern,
                &config(strategy),
                &ZeroShift::None,
            )
            .unwrap();
            for p in 0..peaks.len() {
                assert_eq!(with_shift.get(i, p), direct.get(0, p), "{strategy}: frame {i}");
                assert_eq!(with_shift.get(i, p).center, shifted[p], "{strategy}: frame {i}");
            }
        }
    }
}

#[test]
fn test_global_shift_equals_shifted_peaks() {
    let frames = vec![dense(gaussian_image((40, 40), &[(16.0, 11.0)], 1.5, 60.0))];
    let pattern = gaussian_pattern(1.5, 5.0);

    let with_shift = run(
        &frames,
        &[[14, 14]],
        &pattern,
        &config(Strategy::Fast),
        &ZeroShift::Global([2.2, -2.8]),
    )
    .unwrap();
    let direct = run(
        &frames,
        &[[16, 11]],
        &pattern,
        &config(Strategy::Fast),
        &ZeroShift::None,
    )
    .unwrap();
    assert_eq!(with_shift, direct);
    assert_eq!(with_shift.get(0, 0).center, [16, 11]);
}

#[test]
fn test_per_frame_length_must_match() {
    let frames = shifted_frames();
    let err = run(
        &frames,
        &[[14, 14]],
        &gaussian_pattern(1.5, 5.0),
        &config(Strategy::Fast),
        &ZeroShift::PerFrame(vec![[0.0, 0.0]; 3]),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        BlobfinderError::ZeroShiftLength {
            expected: 4,
            got: 3
        }
    ));
}
