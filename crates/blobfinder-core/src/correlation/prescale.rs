use ndarray::{ArrayBase, DataMut, Dimension};
use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Intensity scaling applied to frame data before correlation.
///
/// The transform is pointwise and maps zero to zero, so scaling a tile, a
/// crop window or a whole frame gives identical pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreScale {
    /// Use raw intensities.
    None,
    /// Signed `ln(1 + |x|)`.
    #[default]
    Log,
}

impl PreScale {
    pub fn apply<T: Float>(self, v: T) -> T {
        match self {
            Self::None => v,
            Self::Log => signed_log1p(v),
        }
    }

    pub fn apply_inplace<S, D>(self, data: &mut ArrayBase<S, D>)
    where
        S: DataMut<Elem = f32>,
        D: Dimension,
    {
        if self == Self::Log {
            data.mapv_inplace(signed_log1p);
        }
    }
}

impl std::fmt::Display for PreScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Log => write!(f, "Log"),
        }
    }
}

pub fn signed_log1p<T: Float>(v: T) -> T {
    if v < T::zero() {
        -(-v).ln_1p()
    } else {
        v.ln_1p()
    }
}
