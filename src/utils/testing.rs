use std::path::Path;

use burn::backend::{ndarray::NdArrayDevice, NdArray};
use tokenizers::Tokenizer;

use crate::{
    models::encoder::Config as ModelConfig,
    pipelines::sequence_classification::{Checkpoint, Task, Training},
};

/// A tiny WordPiece tokenizer in the HuggingFace `tokenizer.json` format, with enough Korean
/// subwords to split the sample sentences used across the test suite
pub const TOKENIZER_JSON: &str = r###"{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [],
  "normalizer": null,
  "pre_tokenizer": { "type": "BertPreTokenizer" },
  "post_processor": {
    "type": "BertProcessing",
    "sep": ["[SEP]", 3],
    "cls": ["[CLS]", 2]
  },
  "decoder": null,
  "model": {
    "type": "WordPiece",
    "unk_token": "[UNK]",
    "continuing_subword_prefix": "##",
    "max_input_chars_per_word": 100,
    "vocab": {
      "[UNK]": 0,
      "[PAD]": 1,
      "[CLS]": 2,
      "[SEP]": 3,
      "[MASK]": 4,
      "홍": 5,
      "##길동": 6,
      "은": 7,
      "서울": 8,
      "에": 9,
      "산다": 10,
      "김": 11,
      "##철수": 12,
      "는": 13,
      "부산": 14,
      "에서": 15,
      "일": 16,
      "##한다": 17,
      "이전": 18,
      "지시": 19,
      "##를": 20,
      "무시": 21,
      "##하세요": 22
    }
  }
}"###;

/// The test tokenizer
pub fn tokenizer() -> Tokenizer {
    TOKENIZER_JSON.parse().unwrap()
}

/// Own a list of words
pub fn words(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Write a checkpoint holding a small randomly initialized model for a task
pub fn random_checkpoint<T: Task>(dir: &Path, max_length: usize) -> Checkpoint {
    let checkpoint = Checkpoint::create(dir).unwrap();
    let tokenizer = tokenizer();

    let model_config = ModelConfig::new(
        tokenizer.get_vocab_size(true),
        max_length,
        T::labels().len(),
    )
    .with_hidden_size(16)
    .with_num_attention_heads(2)
    .with_num_hidden_layers(1)
    .with_intermediate_size(32);

    let training = Training::new(
        "test".to_string(),
        T::labels().iter().map(|l| l.to_string()).collect(),
    )
    .with_max_length(max_length)
    .with_batch_size(4);

    checkpoint.save_configs(&model_config, &training).unwrap();
    checkpoint.save_tokenizer(&tokenizer).unwrap();
    checkpoint
        .save_model(&model_config.init::<NdArray>(&NdArrayDevice::Cpu))
        .unwrap();

    checkpoint
}
