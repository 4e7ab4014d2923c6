pub mod pipelines;
pub mod postprocessors;
pub mod report;
