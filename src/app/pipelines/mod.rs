pub mod file_pipeline;

pub use file_pipeline::FilePipeline;
