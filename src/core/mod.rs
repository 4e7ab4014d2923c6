pub mod aggregate;
pub mod align;
pub mod classify;
pub mod engine;
pub mod needs;
pub mod rounding;
pub mod runner;

pub use crate::domain::model::{ExtendedResult, ImpactResult};
pub use crate::domain::ports::{ConfigProvider, ImpactInputs, Pipeline, Postprocessor, RasterCodec, Storage};
pub use crate::utils::error::Result;
