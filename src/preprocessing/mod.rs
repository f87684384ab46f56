//! Handwriting image preprocessing
//!
//! Turns an arbitrary photographed page into a clean, binarized image
//! (ink on paper) ready to be sent to the scoring backend.

pub mod pipeline;
pub mod raster;
pub mod steps;

pub use pipeline::{Pipeline, PreprocessingResult};
pub use raster::EncodedImage;
