use burn::{
    config::Config as _,
    nn::{
        transformer::TransformerEncoderConfig, DropoutConfig, EmbeddingConfig, LayerNormConfig,
        LinearConfig,
    },
    tensor::backend::Backend,
};

use super::model::Model;

/// The Model Configuration
#[derive(burn::config::Config, Debug)]
pub struct Config {
    /// Size of the tokenizer vocabulary
    pub vocab_size: usize,

    /// Longest sequence the position embeddings cover
    pub max_position_embeddings: usize,

    /// Number of output classes
    pub n_labels: usize,

    /// Number of token type ids
    #[config(default = 2)]
    pub type_vocab_size: usize,

    /// The size of the hidden state
    #[config(default = 256)]
    pub hidden_size: usize,

    /// Attention heads per layer
    #[config(default = 4)]
    pub num_attention_heads: usize,

    /// Encoder layers
    #[config(default = 4)]
    pub num_hidden_layers: usize,

    /// Width of the feed-forward blocks
    #[config(default = 1024)]
    pub intermediate_size: usize,

    /// The hidden dropout probability
    #[config(default = 0.1)]
    pub hidden_dropout_prob: f64,

    /// Layer norm epsilon
    #[config(default = 1e-12)]
    pub layer_norm_eps: f64,
}

impl Config {
    /// Initializes an encoder with random weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        let token_embedding = EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device);
        let position_embedding =
            EmbeddingConfig::new(self.max_position_embeddings, self.hidden_size).init(device);
        let segment_embedding =
            EmbeddingConfig::new(self.type_vocab_size, self.hidden_size).init(device);

        let norm = LayerNormConfig::new(self.hidden_size)
            .with_epsilon(self.layer_norm_eps)
            .init(device);

        let encoder = TransformerEncoderConfig::new(
            self.hidden_size,
            self.intermediate_size,
            self.num_attention_heads,
            self.num_hidden_layers,
        )
        .with_dropout(self.hidden_dropout_prob)
        .init(device);

        let output = LinearConfig::new(self.hidden_size, self.n_labels).init(device);

        Model {
            token_embedding,
            position_embedding,
            segment_embedding,
            norm,
            dropout: DropoutConfig::new(self.hidden_dropout_prob).init(),
            encoder,
            output,
            n_labels: self.n_labels,
            max_position_embeddings: self.max_position_embeddings,
        }
    }

    /// Load a saved configuration
    pub fn load_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        Self::load(path.as_ref()).map_err(|e| {
            anyhow!(
                "Unable to load model config file {}: {}",
                path.as_ref().display(),
                e
            )
        })
    }
}
