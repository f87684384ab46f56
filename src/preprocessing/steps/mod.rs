//! Individual preprocessing steps, in pipeline order

pub mod decode;
pub mod resize;
pub mod grayscale;
pub mod denoise;
pub mod integral;
pub mod threshold;
pub mod encode;
