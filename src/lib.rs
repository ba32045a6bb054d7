pub mod array2d;
pub mod error;
pub mod frame;
pub mod intensity;
pub mod labeling;
pub mod median;
pub mod median_filter;
pub mod morphology;
pub mod packed;
pub mod pipeline;
pub mod running_median;

pub use error::{Error, Result};
pub use frame::{Frame, HeaderRecord, PixelType};
