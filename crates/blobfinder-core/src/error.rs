use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlobfinderError {
    #[error("Unsupported array backend: {0}")]
    UnsupportedBackend(String),

    #[error("Frame representation {frame} does not match array backend {backend}")]
    BackendMismatch { backend: String, frame: String },

    #[error("Parameter zero_shift not supported for the sparse correlation strategy")]
    ZeroShiftUnsupported,

    #[error("Zero shift has {got} entries but there are {expected} frames")]
    ZeroShiftLength { expected: usize, got: usize },

    #[error("Upsampling factor must be at least 2, got {0}")]
    InvalidUpsample(usize),

    #[error("Template shape {got:?} is smaller than the minimum {required:?}")]
    TemplateTooSmall {
        required: (usize, usize),
        got: (usize, usize),
    },

    #[error("Invalid match pattern: {0}")]
    InvalidPattern(String),

    #[error("Frame shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("Tile at ({row}, {col}) with shape {shape:?} exceeds frame shape {frame:?}")]
    TileOutOfBounds {
        row: usize,
        col: usize,
        shape: (usize, usize),
        frame: (usize, usize),
    },

    #[error("Peak list is empty")]
    EmptyPeaks,

    #[error("Empty frame sequence")]
    EmptySequence,
}

pub type Result<T> = std::result::Result<T, BlobfinderError>;
