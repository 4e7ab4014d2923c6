// Adapters layer: concrete implementations for external collaborators (raster codecs).

pub mod ascii_grid;
pub mod codec;

pub use codec::TextRasterCodec;
