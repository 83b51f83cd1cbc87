//! # Aegis Transformers
//!
//! Data preparation, training, evaluation and export for two Korean security classifiers: a
//! prompt-injection sentence classifier and a PII token tagger.
#![forbid(unsafe_code)]

/// Models
pub mod models;

/// Pipelines
pub mod pipelines;

/// Datasets
pub mod datasets;

/// Utilities
pub mod utils;

/// CLI indexes and utilities
pub mod cli;

/// Error macros
#[macro_use]
extern crate anyhow;

/// Logging macros
#[macro_use]
extern crate log;
