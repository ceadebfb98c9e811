//! Input source configuration

pub mod input_files;
pub mod null_handling;

pub use input_files::*;
pub use null_handling::*;
