/// Sentence-level and token-level classification
pub mod sequence_classification;
