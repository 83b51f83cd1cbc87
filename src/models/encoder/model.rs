use burn::{
    module::Module,
    nn::{
        transformer::{TransformerEncoder, TransformerEncoderInput},
        Dropout, Embedding, LayerNorm, Linear,
    },
    tensor::{backend::Backend, Tensor},
};

use crate::{pipelines::sequence_classification::batcher::Infer, utils::tensors::int_vector};

/// A transformer encoder with a linear classification head
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    /// Token embeddings
    pub token_embedding: Embedding<B>,

    /// Learned absolute position embeddings
    pub position_embedding: Embedding<B>,

    /// Token type embeddings
    pub segment_embedding: Embedding<B>,

    /// Embedding layer norm
    pub norm: LayerNorm<B>,

    /// Embedding dropout
    pub dropout: Dropout,

    /// Self-attention stack
    pub encoder: TransformerEncoder<B>,

    /// Linear layer for classification
    pub output: Linear<B>,

    /// Total number of classes
    pub n_labels: usize,

    /// Longest supported sequence
    pub max_position_embeddings: usize,
}

/// Define model behavior
impl<B: Backend> Model<B> {
    /// Contextual hidden states: [batch_size, seq_length, hidden_size]
    pub fn encode(&self, input: Infer<B>) -> Tensor<B, 3> {
        let [batch_size, seq_length] = input.dims();
        let device = input.input_ids.device();

        let positions = int_vector::<B>((0..seq_length as i64).collect(), &device)
            .reshape([1, seq_length])
            .repeat(0, batch_size);

        let embedded = self.token_embedding.forward(input.input_ids)
            + self.position_embedding.forward(positions)
            + self.segment_embedding.forward(input.segment_ids);

        let embedded = self.dropout.forward(self.norm.forward(embedded));
        let mask_pad = input.attention_mask.equal_elem(0);

        self.encoder
            .forward(TransformerEncoderInput::new(embedded).mask_pad(mask_pad))
    }

    /// One row of logits per sequence, read from the first position: [batch_size, n_labels]
    pub fn forward_sequence(&self, input: Infer<B>) -> Tensor<B, 2> {
        let hidden = self.encode(input);
        let [batch_size, _, hidden_size] = hidden.dims();

        let first = hidden
            .slice([0..batch_size, 0..1, 0..hidden_size])
            .reshape([batch_size, hidden_size]);

        self.output.forward(first)
    }

    /// One row of logits per token: [batch_size, seq_length, n_labels]
    pub fn forward_tokens(&self, input: Infer<B>) -> Tensor<B, 3> {
        self.output.forward(self.encode(input))
    }
}
