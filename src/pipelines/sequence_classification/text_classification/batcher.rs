use burn::tensor::{backend::Backend, Int, Tensor};
use derive_new::new;

use crate::{
    pipelines::sequence_classification::{batcher::Infer, encoder::EncodedExample},
    utils::tensors::int_vector,
};

/// A training batch for text classification
#[derive(Clone, Debug, new)]
pub struct Train<B: Backend> {
    /// Model input
    pub input: Infer<B>,

    /// Class ids for the batch
    pub targets: Tensor<B, 1, Int>,
}

/// Collects a vector of text classification examples into a training batch
pub fn batch<B: Backend>(items: Vec<EncodedExample<i64>>, device: &B::Device) -> Train<B> {
    let targets = items.iter().map(|item| item.label).collect();

    Train {
        input: Infer::from_rows(&items, device),
        targets: int_vector(targets, device),
    }
}
