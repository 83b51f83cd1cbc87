use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::InMemDataset},
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
    LearningRate,
};

use crate::{
    datasets::Split,
    models::encoder::{Config as ModelConfig, Model},
    utils::classes::LabelVocab,
};

use super::{
    batcher::Batcher,
    checkpoint::Checkpoint,
    config::Training,
    encoder::Encoder,
    evaluation::{evaluate_batches, ClassificationReport},
    task::{encode_all, Task},
};

/// Training Config
pub type Config = Training;

/// Linear warmup from zero to the peak rate, then linear decay back to zero
#[derive(Debug, Clone)]
pub struct LinearWarmup {
    peak: LearningRate,
    warmup_steps: usize,
    total_steps: usize,
    current: usize,
}

impl LinearWarmup {
    /// Spend `floor(total_steps * warmup_ratio)` steps warming up
    pub fn new(peak: LearningRate, total_steps: usize, warmup_ratio: f64) -> Self {
        let warmup_steps = ((total_steps as f64) * warmup_ratio).floor() as usize;

        Self {
            peak,
            warmup_steps,
            total_steps,
            current: 0,
        }
    }

    /// The rate at a given optimizer step
    pub fn rate_at(&self, step: usize) -> LearningRate {
        let factor = if step < self.warmup_steps {
            step as f64 / self.warmup_steps.max(1) as f64
        } else {
            self.total_steps.saturating_sub(step) as f64
                / self.total_steps.saturating_sub(self.warmup_steps).max(1) as f64
        };

        self.peak * factor.max(0.0)
    }

    /// The rate for the next optimizer step
    pub fn step(&mut self) -> LearningRate {
        let rate = self.rate_at(self.current);
        self.current += 1;

        rate
    }
}

/// Keeps track of the best validation score seen so far
#[derive(Debug, Clone, Copy, Default)]
pub struct BestCheckpoint {
    best: Option<(usize, f64)>,
}

impl BestCheckpoint {
    /// Offer an epoch's score. The first epoch is always taken, later ones only when strictly
    /// better. Returns whether the epoch became the new best.
    pub fn offer(&mut self, epoch: usize, score: f64) -> bool {
        let improved = match self.best {
            None => true,
            Some((_, best)) => score > best,
        };

        if improved {
            self.best = Some((epoch, score));
        }

        improved
    }

    /// The best epoch and its score
    pub fn best(&self) -> Option<(usize, f64)> {
        self.best
    }
}

/// The outcome of a training run
#[derive(Debug, Clone)]
pub struct Summary {
    /// Epoch of the retained model (1-based)
    pub best_epoch: usize,

    /// Validation weighted F1 of the retained model
    pub best_f1: f64,

    /// Test report of the retained model
    pub test: ClassificationReport,
}

/// Train a model for a task and keep the epoch with the best validation weighted F1 in
/// `checkpoint`
pub fn train<B: AutodiffBackend, T: Task>(
    device: &B::Device,
    encoder: &Encoder,
    vocab: &LabelVocab,
    split: Split<T::Record>,
    config: &Config,
    checkpoint: &Checkpoint,
) -> anyhow::Result<Summary> {
    vocab.ensure_matches(&config.labels)?;

    info!(
        "Data split: train={}, val={}, test={}",
        split.train.len(),
        split.val.len(),
        split.test.len()
    );

    ensure!(config.batch_size > 0, "Batch size must be at least 1");
    ensure!(!split.train.is_empty(), "No training records after the split");

    if split.val.is_empty() {
        warn!("Validation split is empty, every epoch scores 0 and the first one is kept");
    }

    let train = encode_all::<T>(encoder, &split.train, vocab)?;
    let val = encode_all::<T>(encoder, &split.val, vocab)?;
    let test = encode_all::<T>(encoder, &split.test, vocab)?;

    let model_config = ModelConfig::new(
        encoder.tokenizer().get_vocab_size(true),
        encoder.max_length(),
        vocab.len(),
    )
    .with_hidden_dropout_prob(config.hidden_dropout_prob);

    checkpoint.save_configs(&model_config, config)?;
    checkpoint.save_tokenizer(encoder.tokenizer())?;

    B::seed(config.seed);
    let mut model: Model<B> = model_config.init(device);

    let mut optim = AdamWConfig::new()
        .with_weight_decay(config.weight_decay as f32)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(
            config.max_grad_norm as f32,
        )))
        .init();

    let steps_per_epoch = train.len().div_ceil(config.batch_size);
    let mut schedule = LinearWarmup::new(
        config.learning_rate,
        steps_per_epoch * config.num_epochs,
        config.warmup_ratio,
    );

    // Initialize data loaders for training, validation and testing data
    let dataloader_train = DataLoaderBuilder::new(Batcher::<B, T>::new(device.clone()))
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .build(InMemDataset::new(train));

    let dataloader_val = DataLoaderBuilder::new(Batcher::<B::InnerBackend, T>::new(device.clone()))
        .batch_size(config.batch_size)
        .build(InMemDataset::new(val));

    let dataloader_test =
        DataLoaderBuilder::new(Batcher::<B::InnerBackend, T>::new(device.clone()))
            .batch_size(config.batch_size)
            .build(InMemDataset::new(test));

    let mut best = BestCheckpoint::default();
    let mut best_model = model.clone();

    for epoch in 1..=config.num_epochs {
        let mut loss_sum = 0.0;
        let mut batches = 0usize;

        for batch in dataloader_train.iter() {
            let loss = T::loss(&model, batch);
            loss_sum += loss.clone().into_scalar().elem::<f64>();
            batches += 1;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(schedule.step(), model, grads);
        }

        let report =
            evaluate_batches::<B::InnerBackend, T, _>(&model.valid(), dataloader_val.iter(), vocab);
        let val_f1 = report.weighted_f1();

        info!(
            "Epoch {}/{} - Loss: {:.4} - Val F1: {:.4}",
            epoch,
            config.num_epochs,
            loss_sum / batches.max(1) as f64,
            val_f1
        );

        if best.offer(epoch, val_f1) {
            checkpoint.save_model(&model)?;
            best_model = model.clone();

            info!("  -> Saved best model (F1: {:.4})", val_f1);
        }
    }

    let (best_epoch, best_f1) = best
        .best()
        .ok_or_else(|| anyhow!("Training ran for zero epochs"))?;

    let test = evaluate_batches::<B::InnerBackend, T, _>(
        &best_model.valid(),
        dataloader_test.iter(),
        vocab,
    );

    info!("Test results:\n{}", test);
    info!("Confusion matrix:\n{}", test.confusion_table());

    Ok(Summary {
        best_epoch,
        best_f1,
        test,
    })
}
