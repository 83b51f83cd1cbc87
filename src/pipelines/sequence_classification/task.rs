use std::fmt::Debug;

use burn::tensor::{backend::Backend, Tensor};

use crate::{
    datasets::Record,
    models::encoder::Model,
    utils::classes::{LabelError, LabelVocab},
};

use super::{
    batcher::Infer,
    encoder::{EncodeError, Encoded, EncodedExample, Encoder},
    evaluation::Predictions,
    parity::Logits,
};

/// Everything that differs between sentence-level and token-level classification.
///
/// The training, evaluation and export drivers are generic over a `Task`; the implementations
/// live in the `text_classification` and `token_classification` modules.
pub trait Task: Send + Sync + 'static {
    /// Artifact name written to the bundle metadata
    const NAME: &'static str;

    /// Decision threshold shipped with the bundle metadata
    const THRESHOLD: f64;

    /// File name of the bundle metadata document
    const METADATA_FILE: &'static str;

    /// Whether logits carry a sequence axis
    const TOKEN_LEVEL: bool;

    /// The dataset record
    type Record: Record + 'static;

    /// A class id, or one target per token position
    type Label: Clone + Debug + Send + Sync + 'static;

    /// A training batch
    type Batch<B: Backend>: Clone + Debug + Send + 'static;

    /// Class labels in id order
    fn labels() -> &'static [&'static str];

    /// Encode a record with its label
    fn encode(
        encoder: &Encoder,
        record: &Self::Record,
        vocab: &LabelVocab,
    ) -> Result<EncodedExample<Self::Label>, EncodeError>;

    /// The fixed input used to compare the in-memory model with the exported graph
    fn canonical_input(encoder: &Encoder) -> Result<Encoded, EncodeError>;

    /// Collect encoded examples into a training batch
    fn batch<B: Backend>(
        items: Vec<EncodedExample<Self::Label>>,
        device: &B::Device,
    ) -> Self::Batch<B>;

    /// Mean training loss of a batch
    fn loss<B: Backend>(model: &Model<B>, batch: Self::Batch<B>) -> Tensor<B, 1>;

    /// Predicted and expected class ids of a batch, with ignored positions removed
    fn predict<B: Backend>(model: &Model<B>, batch: Self::Batch<B>) -> Predictions;

    /// Raw logits copied to the host
    fn logits<B: Backend>(model: &Model<B>, input: Infer<B>) -> Logits;
}

/// Encode every record of a partition, failing on the first record that cannot be encoded
pub fn encode_all<T: Task>(
    encoder: &Encoder,
    records: &[T::Record],
    vocab: &LabelVocab,
) -> Result<Vec<EncodedExample<T::Label>>, EncodeError> {
    records
        .iter()
        .map(|record| T::encode(encoder, record, vocab))
        .collect()
}

/// The label vocabulary of a task
pub fn label_vocab<T: Task>() -> Result<LabelVocab, LabelError> {
    LabelVocab::new(T::labels().iter().copied())
}
