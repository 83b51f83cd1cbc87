/// Encoder hyperparameters
pub mod config;

/// Encoder layers and forward passes
pub mod model;

pub use config::Config;
pub use model::Model;
