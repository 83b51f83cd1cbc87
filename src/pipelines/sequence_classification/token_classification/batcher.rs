use burn::tensor::{backend::Backend, Int, Tensor};
use derive_new::new;

use crate::{
    pipelines::sequence_classification::{batcher::Infer, encoder::EncodedExample},
    utils::tensors,
};

use super::alignment::IGNORE_INDEX;

/// A training batch for token classification
#[derive(Clone, Debug, new)]
pub struct Train<B: Backend> {
    /// Model input
    pub input: Infer<B>,

    /// One class id per token position, `IGNORE_INDEX` where no word owns the token
    pub targets: Tensor<B, 2, Int>,
}

/// Collects a vector of aligned token classification examples into a training batch
pub fn batch<B: Backend>(items: Vec<EncodedExample<Vec<i64>>>, device: &B::Device) -> Train<B> {
    let input = Infer::from_rows(&items, device);
    let [_, seq_length] = input.dims();

    // Labels already match the encoded length
    let labels = items.into_iter().map(|item| item.label).collect();
    let targets = tensors::pad_to::<B>(IGNORE_INDEX, labels, seq_length, device);

    Train { input, targets }
}

#[cfg(test)]
mod tests {
    use burn::backend::{ndarray::NdArrayDevice, NdArray};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_targets_follow_inputs() {
        let items = vec![EncodedExample::new(
            vec![2, 5, 6, 3],
            vec![1, 1, 1, 1],
            vec![0, 0, 0, 0],
            vec![IGNORE_INDEX, 1, 2, IGNORE_INDEX],
        )];

        let train = batch::<NdArray>(items, &NdArrayDevice::Cpu);

        assert_eq!(train.targets.dims(), [1, 4]);
        assert_eq!(
            train.targets.into_data().convert::<i64>().value,
            vec![-100, 1, 2, -100]
        );
    }
}
