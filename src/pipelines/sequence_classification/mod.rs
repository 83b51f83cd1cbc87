/// Text Classification
pub mod text_classification;

/// Token Classification
pub mod token_classification;

/// Common batcher operations for Sequence Classification
pub mod batcher;

/// Common config for Sequence Classification
pub mod config;

/// Fixed-length encoding of text and pre-split words
pub mod encoder;

/// What differs between the two classifiers
pub mod task;

/// Training loop with best-epoch checkpointing
pub mod training;

/// Checkpoint directory layout
pub mod checkpoint;

/// Metrics and classification reports
pub mod evaluation;

/// Portable graph export
pub mod export;

/// Logit comparison between runtimes
pub mod parity;

pub use batcher::Batcher;
pub use checkpoint::Checkpoint;
pub use config::Training;
pub use encoder::Encoder;
pub use evaluation::{evaluate, ClassificationReport};
pub use export::export;
pub use parity::{ParityPolicy, ParityReport};
pub use task::Task;
pub use text_classification::TextClassification;
pub use token_classification::TokenClassification;
pub use training::train;
