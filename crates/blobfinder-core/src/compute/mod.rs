mod backend;
pub mod fft;
pub mod sparse;

pub use backend::{select_crop_routine, ArrayBackend, CropRoutine};
