//! Core trait abstractions.
//!
//! The model call is the only non-deterministic step in the engine; it sits
//! behind [`extractor::Extractor`] so everything downstream can be tested
//! with fixed strings.

pub mod extractor;
