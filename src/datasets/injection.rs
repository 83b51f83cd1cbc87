use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::utils::classes::LabelVocab;

use super::Record;

/// Classes of the injection classifier, in id order
pub const LABELS: [&str; 5] = [
    "normal",
    "direct_injection",
    "indirect_injection",
    "jailbreak",
    "data_exfiltration",
];

/// A text with its injection class
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Item {
    /// The text for classification
    pub text: String,

    /// The class name of the text
    pub label: String,
}

impl Record for Item {
    fn parse(line: &str, vocab: &LabelVocab) -> Option<Self> {
        let item: Item = serde_json::from_str(line).ok()?;

        vocab.id(&item.label).map(|_| item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let vocab = LabelVocab::new(LABELS).unwrap();

        let line = r#"{"text": "hi", "label": "jailbreak", "source": "x"}"#;
        assert!(Item::parse(line, &vocab).is_some());
        assert!(Item::parse(r#"{"text": "hi", "label": "spam"}"#, &vocab).is_none());
        assert!(Item::parse(r#"{"text": "hi"}"#, &vocab).is_none());
        assert!(Item::parse(r#"{"text": 3, "label": "normal"}"#, &vocab).is_none());
    }
}
