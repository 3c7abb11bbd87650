use ndarray::Array2;

use blobfinder_core::correlation::PreScale;
use blobfinder_core::frame::Frame;
use blobfinder_core::pattern::Pattern;
use blobfinder_core::pipeline::config::{CorrelationConfig, Strategy};

/// Zero image with a Gaussian bump of `height` at every (row, col) in
/// `centers`. Centers may be fractional.
pub fn gaussian_image(
    shape: (usize, usize),
    centers: &[(f64, f64)],
    sigma: f64,
    height: f32,
) -> Array2<f32> {
    Array2::from_shape_fn(shape, |(r, c)| {
        centers
            .iter()
            .map(|&(cy, cx)| {
                let dy = r as f64 - cy;
                let dx = c as f64 - cx;
                height * (-(dy * dy + dx * dx) / (2.0 * sigma * sigma)).exp() as f32
            })
            .sum()
    })
}

/// Gaussian pattern with an explicit search radius.
pub fn gaussian_pattern(sigma: f64, search: f64) -> Pattern {
    Pattern::Gaussian {
        sigma,
        search: Some(search),
    }
}

pub fn config(strategy: Strategy) -> CorrelationConfig {
    CorrelationConfig {
        strategy,
        ..CorrelationConfig::default()
    }
}

pub fn config_without_prescale(strategy: Strategy) -> CorrelationConfig {
    CorrelationConfig {
        strategy,
        prescale: PreScale::None,
        ..CorrelationConfig::default()
    }
}

/// Small integer-valued test image; every sum over it is exact in f64.
pub fn integer_image(shape: (usize, usize)) -> Array2<f32> {
    Array2::from_shape_fn(shape, |(r, c)| ((r * 7 + c * 3) % 10) as f32)
}

pub fn dense(data: Array2<f32>) -> Frame {
    Frame::Dense(data)
}

pub const ALL_STRATEGIES: [Strategy; 3] = [
    Strategy::Fast,
    Strategy::FullFrame,
    Strategy::Sparse { steps: 3 },
];
