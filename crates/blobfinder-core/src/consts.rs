/// Default scratch-buffer budget in bytes for crop buffers (512 KiB).
pub const DEFAULT_BYTE_BUDGET: usize = 1 << 19;

/// Upsampling factor selected by `Upsample::Default`.
/// 20 gives ~0.05 px accuracy.
pub const DEFAULT_UPSAMPLE_FACTOR: usize = 20;

/// Half-width (in pixels) of the grid evaluated around the integer peak
/// during upsampled DFT refinement.
pub const UPSAMPLE_SEARCH_HALF_WIDTH: f64 = 1.0;

/// Minimum distance from the peak at which the elevation cone may touch
/// the correlation response.
pub const ELEVATION_MIN_RADIUS: f64 = 1.5;

/// Minimum pixel count (h*w) to use row-level Rayon parallelism in the FFT.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum frame count to use frame-level Rayon parallelism.
pub const PARALLEL_FRAME_THRESHOLD: usize = 4;

/// Default number of image rows per tile for the sparse strategy.
pub const DEFAULT_TILE_ROWS: usize = 16;

/// Search radius as a multiple of the disk radius when a pattern is built
/// without an explicit search radius.
pub const DEFAULT_SEARCH_FACTOR: f64 = 1.2;

/// Search radius as a multiple of sigma for Gaussian patterns.
pub const GAUSSIAN_SEARCH_SIGMAS: f64 = 3.0;

/// Sub-pixel samples per axis used to anti-alias disk edges.
pub const DISK_SUPERSAMPLING: usize = 4;

/// Curvature below which a parabola fit is treated as flat.
pub const PARABOLA_EPSILON: f64 = 1e-12;
