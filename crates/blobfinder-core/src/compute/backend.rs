use std::fmt;
use std::str::FromStr;

use ndarray::ArrayViewMut3;
use serde::{Deserialize, Serialize};

use crate::correlation::crop::{crop_disks_from_frame, crop_disks_from_frame_slicing};
use crate::error::{BlobfinderError, Result};
use crate::frame::Frame;

/// Execution backend the frames are delivered in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArrayBackend {
    /// Dense arrays in host memory.
    #[default]
    Dense,
    /// Device-resident dense arrays; only gathered access is efficient.
    Gpu,
    /// Coordinate-list sparse arrays.
    SparseCoo,
    /// Compressed sparse arrays.
    SparseCompressed,
}

impl ArrayBackend {
    pub const ALL: [ArrayBackend; 4] = [
        ArrayBackend::Dense,
        ArrayBackend::Gpu,
        ArrayBackend::SparseCoo,
        ArrayBackend::SparseCompressed,
    ];

    pub fn is_sparse(self) -> bool {
        matches!(self, Self::SparseCoo | Self::SparseCompressed)
    }

    /// Whether `frame` is in the representation this backend delivers.
    pub fn accepts(self, frame: &Frame) -> bool {
        matches!(
            (self, frame),
            (Self::Dense | Self::Gpu, Frame::Dense(_))
                | (Self::SparseCoo, Frame::Coo(_))
                | (Self::SparseCompressed, Frame::Compressed(_))
        )
    }

    pub fn check_frame(self, frame: &Frame) -> Result<()> {
        if self.accepts(frame) {
            Ok(())
        } else {
            Err(BlobfinderError::BackendMismatch {
                backend: self.to_string(),
                frame: frame.kind().to_string(),
            })
        }
    }
}

impl fmt::Display for ArrayBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dense => write!(f, "dense"),
            Self::Gpu => write!(f, "gpu"),
            Self::SparseCoo => write!(f, "sparse-coo"),
            Self::SparseCompressed => write!(f, "sparse-compressed"),
        }
    }
}

impl FromStr for ArrayBackend {
    type Err = BlobfinderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dense" | "cpu" | "numpy" => Ok(Self::Dense),
            "gpu" | "cupy" => Ok(Self::Gpu),
            "sparse-coo" | "coo" => Ok(Self::SparseCoo),
            "sparse-compressed" | "gcxs" | "csr" => Ok(Self::SparseCompressed),
            other => Err(BlobfinderError::UnsupportedBackend(other.to_string())),
        }
    }
}

/// Fills `out[i]` with the `(2 * crop_size)²` window around `peaks[i]`.
pub type CropRoutine = fn(&Frame, &[[i64; 2]], usize, ArrayViewMut3<f32>) -> Result<()>;

/// Resolve the crop routine for a backend once, at setup.
///
/// Dense host arrays are sliced; device and sparse arrays go through the
/// masked gather.
pub fn select_crop_routine(backend: ArrayBackend) -> CropRoutine {
    match backend {
        ArrayBackend::Dense => crop_disks_from_frame_slicing,
        ArrayBackend::Gpu | ArrayBackend::SparseCoo | ArrayBackend::SparseCompressed => {
            crop_disks_from_frame
        }
    }
}
