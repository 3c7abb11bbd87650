pub mod error;
pub mod consts;
pub mod frame;
pub mod compute;
pub mod pattern;
pub mod correlation;
pub mod pipeline;
