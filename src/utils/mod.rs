pub mod error;
pub mod logger;
pub mod monitor;
pub mod summation;
pub mod validation;
