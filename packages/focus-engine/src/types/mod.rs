//! Data types for the focus engine.

pub mod batch;
pub mod config;
pub mod document;
pub mod fact;
pub mod report;
pub mod taxonomy;
