use std::path::{Path, PathBuf};

use burn::{
    config::Config as _,
    module::Module,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::Backend,
};
use tokenizers::Tokenizer;

use crate::{
    models::encoder::{self, Model},
    utils::classes::LabelVocab,
};

use super::config::Training;

/// Model weights, without the recorder's extension
pub static MODEL_FILE: &str = "model";

/// Gzipped MessagePack at full precision
type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Model hyperparameters
pub static MODEL_CONFIG_FILE: &str = "model.json";

/// Training hyperparameters and labels
pub static TRAINING_CONFIG_FILE: &str = "training.json";

/// The tokenizer the model was trained with
pub static TOKENIZER_FILE: &str = "tokenizer.json";

/// A directory holding the best model of a training run
#[derive(Debug, Clone)]
pub struct Checkpoint {
    dir: PathBuf,
}

/// Everything read back from a checkpoint
pub struct Restored<B: Backend> {
    /// The model with its trained weights
    pub model: Model<B>,

    /// Model hyperparameters
    pub model_config: encoder::Config,

    /// Training hyperparameters
    pub training: Training,

    /// The tokenizer
    pub tokenizer: Tokenizer,
}

impl Checkpoint {
    /// Refer to an existing checkpoint directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the checkpoint directory
    pub fn create(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    /// The checkpoint directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save model and training hyperparameters
    pub fn save_configs(&self, model: &encoder::Config, training: &Training) -> anyhow::Result<()> {
        model.save(self.dir.join(MODEL_CONFIG_FILE))?;
        training.save(self.dir.join(TRAINING_CONFIG_FILE))?;

        Ok(())
    }

    /// Save the tokenizer
    pub fn save_tokenizer(&self, tokenizer: &Tokenizer) -> anyhow::Result<()> {
        tokenizer
            .save(self.dir.join(TOKENIZER_FILE), false)
            .map_err(|e| anyhow!("Unable to save tokenizer: {}", e))
    }

    /// Save model weights, replacing any earlier ones
    pub fn save_model<B: Backend>(&self, model: &Model<B>) -> anyhow::Result<()> {
        CheckpointRecorder::new()
            .record(model.clone().into_record(), self.dir.join(MODEL_FILE))
            .map_err(|e| anyhow!("Unable to save trained model weights: {}", e))
    }

    /// Read a checkpoint back, failing if its labels drifted from `vocab`
    pub fn restore<B: Backend>(
        &self,
        vocab: &LabelVocab,
        device: &B::Device,
    ) -> anyhow::Result<Restored<B>> {
        let training = Training::load_file(self.dir.join(TRAINING_CONFIG_FILE))?;
        vocab.ensure_matches(&training.labels)?;

        let model_config = encoder::Config::load_file(self.dir.join(MODEL_CONFIG_FILE))?;

        let tokenizer = Tokenizer::from_file(self.dir.join(TOKENIZER_FILE))
            .map_err(|e| anyhow!("Unable to load tokenizer: {}", e))?;

        let record = CheckpointRecorder::new()
            .load(self.dir.join(MODEL_FILE), device)
            .map_err(|e| anyhow!("Unable to load trained model weights: {}", e))?;

        let model = model_config.init::<B>(device).load_record(record);

        Ok(Restored {
            model,
            model_config,
            training,
            tokenizer,
        })
    }
}
