use std::marker::PhantomData;

use burn::{
    data::dataloader,
    tensor::{backend::Backend, Int, Tensor},
};
use derive_new::new;

use crate::utils::tensors::pad_to;

use super::{
    encoder::{Encoded, EncodedExample},
    task::Task,
};

/// An inference batch for sequence classification
#[derive(Debug, Clone, new)]
pub struct Infer<B: Backend> {
    /// Token ids as 2D tensor: [batch_size, seq_length]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 for real tokens, 0 for padding: [batch_size, seq_length]
    pub attention_mask: Tensor<B, 2, Int>,

    /// Token type ids: [batch_size, seq_length]
    pub segment_ids: Tensor<B, 2, Int>,
}

/// Anything that carries the three model input rows
pub trait Positional {
    /// Token ids
    fn input_ids(&self) -> &[i64];

    /// Attention mask
    fn attention_mask(&self) -> &[i64];

    /// Token type ids
    fn segment_ids(&self) -> &[i64];
}

impl Positional for Encoded {
    fn input_ids(&self) -> &[i64] {
        &self.input_ids
    }

    fn attention_mask(&self) -> &[i64] {
        &self.attention_mask
    }

    fn segment_ids(&self) -> &[i64] {
        &self.segment_ids
    }
}

impl<L> Positional for EncodedExample<L> {
    fn input_ids(&self) -> &[i64] {
        &self.input_ids
    }

    fn attention_mask(&self) -> &[i64] {
        &self.attention_mask
    }

    fn segment_ids(&self) -> &[i64] {
        &self.segment_ids
    }
}

impl<B: Backend> Infer<B> {
    /// Stack encoded rows into an inference batch
    pub fn from_rows<P: Positional>(rows: &[P], device: &B::Device) -> Self {
        let seq_length = rows
            .iter()
            .map(|row| row.input_ids().len())
            .max()
            .unwrap_or(0);

        let column = |f: fn(&P) -> &[i64]| -> Vec<Vec<i64>> {
            rows.iter().map(|row| f(row).to_vec()).collect()
        };

        Infer {
            input_ids: pad_to(0, column(P::input_ids), seq_length, device),
            attention_mask: pad_to(0, column(P::attention_mask), seq_length, device),
            segment_ids: pad_to(0, column(P::segment_ids), seq_length, device),
        }
    }

    /// Batch size and sequence length
    pub fn dims(&self) -> [usize; 2] {
        self.input_ids.dims()
    }
}

/// Collects encoded examples into the training batch of a task
#[derive(new)]
pub struct Batcher<B: Backend, T: Task> {
    /// Device on which to perform computation (e.g., CPU or CUDA device)
    device: B::Device,

    #[new(default)]
    task: PhantomData<T>,
}

impl<B: Backend, T: Task> Clone for Batcher<B, T> {
    fn clone(&self) -> Self {
        Self::new(self.device.clone())
    }
}

/// Implement Batcher trait for Batcher struct for training
impl<B: Backend, T: Task> dataloader::batcher::Batcher<EncodedExample<T::Label>, T::Batch<B>>
    for Batcher<B, T>
{
    /// Collects a vector of encoded examples into a training batch
    fn batch(&self, items: Vec<EncodedExample<T::Label>>) -> T::Batch<B> {
        T::batch(items, &self.device)
    }
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{ndarray::NdArrayDevice, NdArray},
        data::{dataloader::DataLoaderBuilder, dataset::InMemDataset},
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::pipelines::sequence_classification::TextClassification;

    #[test]
    fn test_from_rows() {
        let rows = vec![
            EncodedExample::new(vec![2, 7, 3], vec![1, 1, 1], vec![0, 0, 0], 1i64),
            EncodedExample::new(vec![2, 3, 1], vec![1, 1, 0], vec![0, 0, 0], 0i64),
        ];

        let infer = Infer::<NdArray>::from_rows(&rows, &NdArrayDevice::Cpu);

        assert_eq!(infer.dims(), [2, 3]);
        assert_eq!(
            infer.attention_mask.into_data().convert::<i64>().value,
            vec![1, 1, 1, 1, 1, 0]
        );
    }

    #[test]
    fn test_batcher_builds_a_dataloader() {
        let items: Vec<EncodedExample<i64>> = (0..3)
            .map(|i| EncodedExample::new(vec![2, 7, 3], vec![1, 1, 1], vec![0, 0, 0], i))
            .collect();

        let batcher = Batcher::<NdArray, TextClassification>::new(NdArrayDevice::Cpu);
        let dataloader = DataLoaderBuilder::new(batcher.clone())
            .batch_size(2)
            .build(InMemDataset::new(items));

        let sizes: Vec<usize> = dataloader
            .iter()
            .map(|batch| batch.targets.dims()[0])
            .collect();

        assert_eq!(sizes, vec![2, 1]);
    }
}
