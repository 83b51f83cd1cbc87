use burn::{config::Config as _, LearningRate};

use crate::datasets::{SplitError, SplitRatios};

/// Define configuration struct for the experiment
#[derive(burn::config::Config)]
pub struct Training {
    /// Batch size
    #[config(default = 16)]
    pub batch_size: usize,

    /// Number of epochs
    #[config(default = 5)]
    pub num_epochs: usize,

    /// Peak learning rate, reached at the end of warmup
    #[config(default = 2e-5)]
    pub learning_rate: LearningRate,

    /// Fixed number of token positions per example
    #[config(default = 512)]
    pub max_length: usize,

    /// Fraction of all optimizer steps spent warming up
    #[config(default = 0.1)]
    pub warmup_ratio: f64,

    /// AdamW weight decay
    #[config(default = 0.01)]
    pub weight_decay: f64,

    /// Gradients are clipped to this global norm
    #[config(default = 1.0)]
    pub max_grad_norm: f64,

    /// Seed for the data split, shuffling and weight init
    #[config(default = 42)]
    pub seed: u64,

    /// Fraction of records used for training
    #[config(default = 0.8)]
    pub train_ratio: f64,

    /// Fraction of records used for validation
    #[config(default = 0.1)]
    pub val_ratio: f64,

    /// Dropout rate
    #[config(default = 0.1)]
    pub hidden_dropout_prob: f64,

    /// Tokenizer source: a Hugging Face Hub model name or a local path
    pub base_model: String,

    /// Class labels in id order
    pub labels: Vec<String>,
}

impl Training {
    /// The validated split ratios
    pub fn split_ratios(&self) -> Result<SplitRatios, SplitError> {
        SplitRatios::new(self.train_ratio, self.val_ratio)
    }

    /// Load a saved configuration
    pub fn load_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        Self::load(path.as_ref()).map_err(|e| {
            anyhow!(
                "Unable to load training config file {}: {}",
                path.as_ref().display(),
                e
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Training::new("klue/roberta-base".to_string(), vec!["normal".to_string()]);

        assert_eq!(config.num_epochs, 5);
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.max_length, 512);
        assert_eq!(config.seed, 42);
        assert_eq!(config.split_ratios(), Ok(SplitRatios::default()));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.json");

        let config = Training::new("local".to_string(), vec!["O".to_string(), "B-PER".to_string()])
            .with_seed(7)
            .with_num_epochs(2);
        config.save(&path).unwrap();

        let loaded = Training::load_file(&path).unwrap();

        assert_eq!(loaded.seed, 7);
        assert_eq!(loaded.num_epochs, 2);
        assert_eq!(loaded.labels, config.labels);
    }
}
