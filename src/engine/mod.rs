pub mod scoring;
pub mod sweep;
pub mod upload;
