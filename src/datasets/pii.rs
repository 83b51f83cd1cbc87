use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::utils::classes::LabelVocab;

use super::Record;

/// BIO tags of the PII detector, in id order
pub const LABELS: [&str; 7] = ["O", "B-PER", "I-PER", "B-LOC", "I-LOC", "B-ORG", "I-ORG"];

/// A pre-split sentence with one BIO tag per word
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Item {
    /// The words of the sentence
    pub tokens: Vec<String>,

    /// One tag per word
    pub labels: Vec<String>,
}

impl Record for Item {
    fn parse(line: &str, vocab: &LabelVocab) -> Option<Self> {
        let item: Item = serde_json::from_str(line).ok()?;

        if item.tokens.len() != item.labels.len() {
            return None;
        }

        if item.labels.iter().any(|label| vocab.id(label).is_none()) {
            return None;
        }

        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse() {
        let vocab = LabelVocab::new(LABELS).unwrap();

        let line = concat!(
            r#"{"tokens": ["홍길동", "은", "서울", "에", "산다"], "#,
            r#""labels": ["B-PER", "O", "B-LOC", "O", "O"]}"#,
        );
        let item = Item::parse(line, &vocab).unwrap();
        assert_eq!(item.tokens.len(), 5);

        // Length mismatch, unknown tag, missing field
        assert!(Item::parse(r#"{"tokens": ["a", "b"], "labels": ["O"]}"#, &vocab).is_none());
        assert!(Item::parse(r#"{"tokens": ["a"], "labels": ["B-DATE"]}"#, &vocab).is_none());
        assert!(Item::parse(r#"{"tokens": ["a"]}"#, &vocab).is_none());
    }
}
