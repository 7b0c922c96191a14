
//! I/O operations for photogrammetry data

pub mod dtm;
pub mod image;
pub mod metadata;

pub use dtm::{Datum, DtmLoadError, DtmRaster};
pub use image::{Image, ImageError};
pub use metadata::{ImageMetadata, RpcDriver};
pub use rsp_core::sensor::RpcCoefficients;
