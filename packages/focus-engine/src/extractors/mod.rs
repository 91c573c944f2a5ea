//! Extractor implementations.

pub mod replay;

pub use replay::{RecordedBatch, RecordedCall, ReplayExtractor};
