use burn::tensor::{backend::Backend, Tensor};

use crate::{
    datasets::pii,
    models::encoder::Model,
    pipelines::sequence_classification::{
        batcher::Infer,
        encoder::{EncodeError, Encoded, EncodedExample, Encoder},
        evaluation::Predictions,
        parity::Logits,
        task::Task,
    },
    utils::{classes::LabelVocab, tensors},
};

/// Subword label alignment
pub mod alignment;

/// Batcher
pub mod batcher;

pub use alignment::{align_labels, IGNORE_INDEX};
pub use batcher::Train;

/// Words used for the export parity check
pub const PARITY_WORDS: [&str; 5] = ["김철수", "는", "부산", "에서", "일한다"];

/// Token-level BIO tagging of personal information
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenClassification;

impl Task for TokenClassification {
    const NAME: &'static str = "pii-detector";
    const THRESHOLD: f64 = 0.5;
    const METADATA_FILE: &'static str = "label_map.json";
    const TOKEN_LEVEL: bool = true;

    type Record = pii::Item;
    type Label = Vec<i64>;
    type Batch<B: Backend> = Train<B>;

    fn labels() -> &'static [&'static str] {
        &pii::LABELS
    }

    fn encode(
        encoder: &Encoder,
        record: &pii::Item,
        vocab: &LabelVocab,
    ) -> Result<EncodedExample<Vec<i64>>, EncodeError> {
        encoder.encode_tagging(record, vocab)
    }

    fn canonical_input(encoder: &Encoder) -> Result<Encoded, EncodeError> {
        let words: Vec<String> = PARITY_WORDS.iter().map(|w| w.to_string()).collect();

        encoder.encode_words(&words)
    }

    fn batch<B: Backend>(items: Vec<EncodedExample<Vec<i64>>>, device: &B::Device) -> Train<B> {
        batcher::batch(items, device)
    }

    fn loss<B: Backend>(model: &Model<B>, batch: Train<B>) -> Tensor<B, 1> {
        let logits = model.forward_tokens(batch.input);
        let [batch_size, seq_length, n_labels] = logits.dims();

        tensors::masked_cross_entropy(
            logits.reshape([batch_size * seq_length, n_labels]),
            batch.targets.reshape([batch_size * seq_length]),
            IGNORE_INDEX,
        )
    }

    fn predict<B: Backend>(model: &Model<B>, batch: Train<B>) -> Predictions {
        let predicted = model
            .forward_tokens(batch.input)
            .argmax(2)
            .flatten::<1>(0, 2);
        let expected = batch.targets.flatten::<1>(0, 1);

        Predictions::from_ids(tensors::to_vec(predicted), tensors::to_vec(expected))
    }

    fn logits<B: Backend>(model: &Model<B>, input: Infer<B>) -> Logits {
        Logits::from_tensor(model.forward_tokens(input))
    }
}
