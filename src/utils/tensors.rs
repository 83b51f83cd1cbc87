use burn::tensor::{
    activation::log_softmax, backend::Backend, Data, ElementConversion, Int, Shape, Tensor,
};

/// Stack rows into a `[batch_size, seq_length]` tensor, padding short rows with `pad` and
/// cutting long ones
pub fn pad_to<B: Backend>(
    pad: i64,
    rows: Vec<Vec<i64>>,
    seq_length: usize,
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let batch_size = rows.len();
    let mut values: Vec<B::IntElem> = Vec::with_capacity(batch_size * seq_length);

    for row in rows {
        let kept = row.len().min(seq_length);

        values.extend(
            row.into_iter()
                .take(seq_length)
                .map(|v| v.elem::<B::IntElem>()),
        );
        values.extend(std::iter::repeat(pad.elem::<B::IntElem>()).take(seq_length - kept));
    }

    Tensor::from_data(
        Data::new(values, Shape::new([batch_size, seq_length])),
        device,
    )
}

/// A 1D int tensor from host values
pub fn int_vector<B: Backend>(values: Vec<i64>, device: &B::Device) -> Tensor<B, 1, Int> {
    let length = values.len();

    Tensor::from_data(
        Data::new(
            values.into_iter().map(|v| v.elem::<B::IntElem>()).collect(),
            Shape::new([length]),
        ),
        device,
    )
}

/// Copy a 1D int tensor back to the host
pub fn to_vec<B: Backend>(tensor: Tensor<B, 1, Int>) -> Vec<i64> {
    tensor.into_data().convert::<i64>().value
}

/// Mean cross entropy over the rows of `logits` whose target is not `ignore_index`.
///
/// `logits` is `[n, n_classes]`, `targets` is `[n]`. Returns zero when every row is ignored.
pub fn masked_cross_entropy<B: Backend>(
    logits: Tensor<B, 2>,
    targets: Tensor<B, 1, Int>,
    ignore_index: i64,
) -> Tensor<B, 1> {
    let [n, _] = logits.dims();

    let ignored = targets.clone().equal_elem(ignore_index);
    let keep = ignored.clone().int().float().neg().add_scalar(1.0);
    let safe_targets = targets.mask_fill(ignored, 0);

    let picked = log_softmax(logits, 1)
        .gather(1, safe_targets.reshape([n, 1]))
        .reshape([n]);

    let kept = keep.clone().sum().clamp_min(1.0);

    picked.mul(keep).sum().neg().div(kept)
}

#[cfg(test)]
mod tests {
    use burn::backend::{ndarray::NdArrayDevice, NdArray};
    use pretty_assertions::assert_eq;

    use super::*;

    type B = NdArray;

    #[test]
    fn test_pad_to() {
        let device = NdArrayDevice::Cpu;

        let tensor = pad_to::<B>(-100, vec![vec![1, 2, 3], vec![4]], 3, &device);

        assert_eq!(tensor.dims(), [2, 3]);
        assert_eq!(
            tensor.into_data().convert::<i64>().value,
            vec![1, 2, 3, 4, -100, -100]
        );
    }

    #[test]
    fn test_masked_cross_entropy_skips_ignored_rows() {
        let device = NdArrayDevice::Cpu;
        let logits = Tensor::<B, 2>::from_floats([[2.0, 0.0], [0.0, 0.0], [9.0, -9.0]], &device);
        let targets = int_vector::<B>(vec![0, 1, -100], &device);

        let loss: f64 = masked_cross_entropy(logits, targets, -100)
            .into_scalar()
            .elem();

        // Mean of -ln(softmax) for the two kept rows
        let row0 = (1.0f64 + (-2.0f64).exp()).ln();
        let row1 = 2.0f64.ln();
        assert!((loss - (row0 + row1) / 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_masked_cross_entropy_all_ignored() {
        let device = NdArrayDevice::Cpu;
        let logits = Tensor::<B, 2>::from_floats([[1.0, 0.0]], &device);
        let targets = int_vector::<B>(vec![-100], &device);

        let loss: f64 = masked_cross_entropy(logits, targets, -100)
            .into_scalar()
            .elem();

        assert_eq!(loss, 0.0);
    }
}
