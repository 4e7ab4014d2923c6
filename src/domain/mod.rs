// Domain layer: raster model, impact function record and ports. Only std/serde here.

pub mod metadata;
pub mod model;
pub mod ports;
