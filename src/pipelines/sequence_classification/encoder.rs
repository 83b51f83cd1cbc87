use derive_new::new;
use tokenizers::{Encoding, Tokenizer};

use crate::{
    datasets::{injection, pii},
    utils::classes::LabelVocab,
};

use super::token_classification::alignment::align_labels;

/// Pad token candidates, tried in order when the tokenizer has no padding configured
const PAD_TOKENS: [&str; 2] = ["[PAD]", "<pad>"];

/// A tokenized input of fixed length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// Token ids
    pub input_ids: Vec<i64>,

    /// 1 for real tokens, 0 for padding
    pub attention_mask: Vec<i64>,

    /// Token type (segment) ids
    pub segment_ids: Vec<i64>,

    /// The index of the input word that produced each token, if any
    pub word_ids: Vec<Option<u32>>,
}

impl Encoded {
    /// Number of token positions
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    /// True when there are no positions
    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Attach a label, dropping the word ownership
    pub fn with_label<L>(self, label: L) -> EncodedExample<L> {
        EncodedExample::new(
            self.input_ids,
            self.attention_mask,
            self.segment_ids,
            label,
        )
    }
}

/// A model-ready training example: the encoded input plus its label, either a class id or one
/// target per token position
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct EncodedExample<L> {
    /// Token ids
    pub input_ids: Vec<i64>,

    /// 1 for real tokens, 0 for padding
    pub attention_mask: Vec<i64>,

    /// Token type (segment) ids
    pub segment_ids: Vec<i64>,

    /// The label
    pub label: L,
}

/// Turns text and pre-split words into fixed-length model inputs
#[derive(Clone)]
pub struct Encoder {
    /// Tokenizer with its own truncation and padding disabled
    tokenizer: Tokenizer,

    /// Every encoding has exactly this many positions
    max_length: usize,

    /// ID of the padding token
    pad_token_id: u32,
}

impl Encoder {
    /// Wrap a tokenizer. Truncation and padding are handled here, so any tokenizer-side
    /// settings are cleared.
    pub fn new(mut tokenizer: Tokenizer, max_length: usize) -> Result<Self, EncodeError> {
        if max_length == 0 {
            return Err(EncodeError::InvalidMaxLength);
        }

        let pad_token_id = tokenizer
            .get_padding()
            .map(|padding| padding.pad_id)
            .or_else(|| {
                PAD_TOKENS
                    .iter()
                    .find_map(|token| tokenizer.token_to_id(token))
            })
            .unwrap_or(0);

        tokenizer
            .with_truncation(None)
            .map_err(|e| EncodeError::Tokenizer(e.to_string()))?;
        tokenizer.with_padding(None);

        Ok(Self {
            tokenizer,
            max_length,
            pad_token_id,
        })
    }

    /// The underlying tokenizer
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// The fixed encoding length
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// ID of the padding token
    pub fn pad_token_id(&self) -> u32 {
        self.pad_token_id
    }

    /// Encode raw text
    pub fn encode_text(&self, text: &str) -> Result<Encoded, EncodeError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EncodeError::Tokenizer(e.to_string()))?;

        Ok(self.fixed_length(&encoding))
    }

    /// Encode a sentence that is already split into words. Every token remembers the index of
    /// the word it came from.
    pub fn encode_words(&self, words: &[String]) -> Result<Encoded, EncodeError> {
        let encoding = self
            .tokenizer
            .encode(words, true)
            .map_err(|e| EncodeError::Tokenizer(e.to_string()))?;

        Ok(self.fixed_length(&encoding))
    }

    /// Encode a classification record with its class id
    pub fn encode_classification(
        &self,
        record: &injection::Item,
        vocab: &LabelVocab,
    ) -> Result<EncodedExample<i64>, EncodeError> {
        let label = vocab
            .id(&record.label)
            .ok_or_else(|| EncodeError::UnknownLabel(record.label.clone()))?;

        Ok(self.encode_text(&record.text)?.with_label(label as i64))
    }

    /// Encode a tagging record, aligning its word labels with the subword tokens
    pub fn encode_tagging(
        &self,
        record: &pii::Item,
        vocab: &LabelVocab,
    ) -> Result<EncodedExample<Vec<i64>>, EncodeError> {
        let encoded = self.encode_words(&record.tokens)?;
        let labels = align_labels(&record.labels, &encoded.word_ids, vocab);

        Ok(encoded.with_label(labels))
    }

    /// Truncate (keeping leading and trailing special tokens) or pad to `max_length`
    fn fixed_length(&self, encoding: &Encoding) -> Encoded {
        let ids = encoding.get_ids();
        let special = encoding.get_special_tokens_mask();
        let total = ids.len();

        let positions: Vec<usize> = if total <= self.max_length {
            (0..total).collect()
        } else {
            let leading = special.iter().take_while(|s| **s == 1).count();
            let trailing = special[leading..]
                .iter()
                .rev()
                .take_while(|s| **s == 1)
                .count();

            if leading + trailing >= self.max_length {
                (0..self.max_length).collect()
            } else {
                let content = self.max_length - leading - trailing;

                (0..leading + content).chain(total - trailing..total).collect()
            }
        };

        let type_ids = encoding.get_type_ids();
        let mask = encoding.get_attention_mask();
        let words = encoding.get_word_ids();

        let padding = self.max_length - positions.len();

        let mut encoded = Encoded {
            input_ids: Vec::with_capacity(self.max_length),
            attention_mask: Vec::with_capacity(self.max_length),
            segment_ids: Vec::with_capacity(self.max_length),
            word_ids: Vec::with_capacity(self.max_length),
        };

        for i in positions {
            encoded.input_ids.push(ids[i] as i64);
            encoded.attention_mask.push(mask[i] as i64);
            encoded.segment_ids.push(type_ids[i] as i64);
            encoded.word_ids.push(words[i]);
        }

        encoded
            .input_ids
            .extend(std::iter::repeat(self.pad_token_id as i64).take(padding));
        encoded.attention_mask.extend(std::iter::repeat(0).take(padding));
        encoded.segment_ids.extend(std::iter::repeat(0).take(padding));
        encoded.word_ids.extend(std::iter::repeat(None).take(padding));

        encoded
    }
}

/// Encode Error
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// The tokenizer failed
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// A fixed length of zero
    #[error("max length must be at least 1")]
    InvalidMaxLength,

    /// A class label outside the vocabulary
    #[error("unknown label {0}")]
    UnknownLabel(String),
}
