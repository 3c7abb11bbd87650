use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compute::ArrayBackend;
use crate::consts::{DEFAULT_BYTE_BUDGET, DEFAULT_TILE_ROWS, DEFAULT_UPSAMPLE_FACTOR};
use crate::correlation::PreScale;
use crate::error::{BlobfinderError, Result};

/// Correlation strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// Crop a window around every peak and correlate it independently.
    #[default]
    Fast,
    /// Correlate the whole frame once, read every peak from the map.
    FullFrame,
    /// Direct correlation with a sparse mask stack over
    /// `(2 * steps + 1)²` offsets per peak.
    Sparse { steps: usize },
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => write!(f, "Fast"),
            Self::FullFrame => write!(f, "Full frame"),
            Self::Sparse { steps } => write!(f, "Sparse (steps={steps})"),
        }
    }
}

/// Sub-pixel refinement mode.
///
/// Serialized as `false`, `true` or an integer factor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UpsampleRepr", into = "UpsampleRepr")]
pub enum Upsample {
    /// Parabola fit on the 3x3 neighborhood.
    #[default]
    Off,
    /// DFT upsampling with [`DEFAULT_UPSAMPLE_FACTOR`].
    Default,
    /// DFT upsampling by the given factor (at least 2).
    Factor(usize),
}

impl Upsample {
    /// Resolved upsampling factor, `None` for the parabola fit.
    pub fn factor(self) -> Result<Option<usize>> {
        match self {
            Self::Off => Ok(None),
            Self::Default => Ok(Some(DEFAULT_UPSAMPLE_FACTOR)),
            Self::Factor(n) if n >= 2 => Ok(Some(n)),
            Self::Factor(n) => Err(BlobfinderError::InvalidUpsample(n)),
        }
    }
}

impl From<bool> for Upsample {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::Default
        } else {
            Self::Off
        }
    }
}

impl fmt::Display for Upsample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "Off"),
            Self::Default => write!(f, "Default ({DEFAULT_UPSAMPLE_FACTOR}x)"),
            Self::Factor(n) => write!(f, "{n}x"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum UpsampleRepr {
    Enabled(bool),
    Factor(usize),
}

impl From<UpsampleRepr> for Upsample {
    fn from(repr: UpsampleRepr) -> Self {
        match repr {
            UpsampleRepr::Enabled(enabled) => enabled.into(),
            UpsampleRepr::Factor(n) => Self::Factor(n),
        }
    }
}

impl From<Upsample> for UpsampleRepr {
    fn from(upsample: Upsample) -> Self {
        match upsample {
            Upsample::Off => Self::Enabled(false),
            Upsample::Default => Self::Enabled(true),
            Upsample::Factor(n) => Self::Factor(n),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Representation the frames are delivered in.
    pub backend: ArrayBackend,
    pub upsample: Upsample,
    /// Scratch-buffer budget in bytes; only affects batching.
    pub byte_budget: usize,
    pub prescale: PreScale,
    /// Rows per tile when the sparse strategy cuts frames into tiles.
    pub tile_rows: usize,
    pub strategy: Strategy,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            backend: ArrayBackend::default(),
            upsample: Upsample::default(),
            byte_budget: DEFAULT_BYTE_BUDGET,
            prescale: PreScale::default(),
            tile_rows: DEFAULT_TILE_ROWS,
            strategy: Strategy::default(),
        }
    }
}
