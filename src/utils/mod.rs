/// File utilities
pub mod files;

/// Hugging Face utilities
pub mod hugging_face;

/// Tensor Utilities
pub mod tensors;

/// Utilities for classification tasks
pub mod classes;

/// Shared fixtures for unit tests
#[cfg(test)]
pub(crate) mod testing;
