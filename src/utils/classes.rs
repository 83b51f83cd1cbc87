use std::{collections::BTreeMap, hash::Hash};

/// Invert a map by swapping keys and values
pub fn invert_map<K, V, MK, MV>(original: MK) -> MV
where
    K: Ord + Hash + Eq,
    V: Ord + Hash + Eq + Clone,
    MK: IntoIterator<Item = (K, V)>,
    MV: FromIterator<(V, K)>,
{
    original
        .into_iter()
        .map(|(key, value)| (value, key))
        .collect()
}

/// The label used for tokens outside of any entity
pub const OUTSIDE: &str = "O";

/// An ordered set of class labels with a bidirectional label <-> id mapping.
///
/// Built once per run from a task's fixed label list and shared by reference with every stage
/// that turns labels into ids or back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVocab {
    /// A mapping from class ids to class name labels
    id2label: Vec<String>,

    /// A mapping from class name labels to class ids
    label2id: BTreeMap<String, usize>,
}

impl LabelVocab {
    /// Build a vocabulary from labels in id order
    pub fn new<I, S>(labels: I) -> Result<Self, LabelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id2label: Vec<String> = labels.into_iter().map(Into::into).collect();

        if id2label.is_empty() {
            return Err(LabelError::Empty);
        }

        let label2id: BTreeMap<String, usize> = invert_map(id2label.iter().cloned().enumerate());

        if label2id.len() != id2label.len() {
            let duplicate = id2label
                .iter()
                .enumerate()
                .find(|(id, label)| label2id.get(*label) != Some(id))
                .map(|(_, label)| label.clone())
                .unwrap_or_default();

            return Err(LabelError::Duplicate(duplicate));
        }

        Ok(Self { id2label, label2id })
    }

    /// The id of a label, if known
    pub fn id(&self, label: &str) -> Option<usize> {
        self.label2id.get(label).copied()
    }

    /// The label for an id, if in range
    pub fn label(&self, id: usize) -> Option<&str> {
        self.id2label.get(id).map(String::as_str)
    }

    /// All labels in id order
    pub fn labels(&self) -> &[String] {
        &self.id2label
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.id2label.len()
    }

    /// Always false for a constructed vocabulary
    pub fn is_empty(&self) -> bool {
        self.id2label.is_empty()
    }

    /// The id of the outside label, or 0 for vocabularies without one
    pub fn outside_id(&self) -> usize {
        self.id(OUTSIDE).unwrap_or(0)
    }

    /// The id a continuation subword receives when its word carries `id`.
    ///
    /// `B-<type>` becomes `I-<type>` (or the outside label when the vocabulary has no such
    /// inside label). Every other label is carried over unchanged.
    pub fn continuation_id(&self, id: usize) -> usize {
        match self.label(id).map(Bio::parse) {
            Some(Bio::Begin(kind)) => self
                .id(&format!("I-{}", kind))
                .unwrap_or_else(|| self.outside_id()),
            _ => id,
        }
    }

    /// Fail if labels persisted alongside a checkpoint disagree with this vocabulary
    pub fn ensure_matches<S: AsRef<str>>(&self, stored: &[S]) -> Result<(), LabelError> {
        let same = stored.len() == self.id2label.len()
            && stored
                .iter()
                .zip(&self.id2label)
                .all(|(a, b)| a.as_ref() == b);

        if same {
            Ok(())
        } else {
            Err(LabelError::Drift {
                expected: self.id2label.clone(),
                found: stored.iter().map(|s| s.as_ref().to_string()).collect(),
            })
        }
    }
}

/// A label read with the BIO tagging scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bio<'a> {
    /// Not part of an entity
    Outside,

    /// First token of an entity of the given type
    Begin(&'a str),

    /// Continuation of an entity of the given type
    Inside(&'a str),
}

impl<'a> Bio<'a> {
    /// Parse a label. Anything without a `B-` or `I-` prefix reads as outside.
    pub fn parse(label: &'a str) -> Self {
        if let Some(kind) = label.strip_prefix("B-") {
            Bio::Begin(kind)
        } else if let Some(kind) = label.strip_prefix("I-") {
            Bio::Inside(kind)
        } else {
            Bio::Outside
        }
    }

    /// The entity type, if any
    pub fn entity_type(&self) -> Option<&'a str> {
        match self {
            Bio::Outside => None,
            Bio::Begin(kind) | Bio::Inside(kind) => Some(kind),
        }
    }
}

/// Label Error
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LabelError {
    /// No labels were given
    #[error("a label vocabulary needs at least one label")]
    Empty,

    /// The same label was given twice
    #[error("duplicate label {0}")]
    Duplicate(String),

    /// Stored labels disagree with the task labels
    #[error("label drift: expected {expected:?}, found {found:?}")]
    Drift {
        /// The labels of the current task
        expected: Vec<String>,

        /// The labels stored with the artifact
        found: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn tags() -> LabelVocab {
        LabelVocab::new(["O", "B-PER", "I-PER", "B-LOC", "I-LOC", "B-ORG"]).unwrap()
    }

    #[test]
    fn test_ids_follow_input_order() {
        let vocab = tags();

        assert_eq!(vocab.len(), 6);
        assert_eq!(vocab.id("B-LOC"), Some(3));
        assert_eq!(vocab.label(2), Some("I-PER"));
        assert_eq!(vocab.id("B-DATE"), None);
        assert_eq!(vocab.label(6), None);
    }

    #[test]
    fn test_rejects_empty_and_duplicates() {
        assert_eq!(LabelVocab::new(Vec::<String>::new()), Err(LabelError::Empty));
        assert_eq!(
            LabelVocab::new(["O", "B-PER", "O"]),
            Err(LabelError::Duplicate("O".to_string()))
        );
    }

    #[test]
    fn test_continuation_ids() {
        let vocab = tags();

        assert_eq!(vocab.continuation_id(1), 2);
        assert_eq!(vocab.continuation_id(2), 2);
        assert_eq!(vocab.continuation_id(0), 0);
        // No I-ORG in this vocabulary
        assert_eq!(vocab.continuation_id(5), 0);
    }

    #[test]
    fn test_outside_id_falls_back_to_zero() {
        let vocab = LabelVocab::new(["normal", "jailbreak"]).unwrap();

        assert_eq!(vocab.outside_id(), 0);
        assert_eq!(vocab.continuation_id(1), 1);
    }

    #[test]
    fn test_bio_parse() {
        assert_eq!(Bio::parse("B-PER"), Bio::Begin("PER"));
        assert_eq!(Bio::parse("I-LOC"), Bio::Inside("LOC"));
        assert_eq!(Bio::parse("O"), Bio::Outside);
        assert_eq!(Bio::parse("I-ORG").entity_type(), Some("ORG"));
        assert_eq!(Bio::parse("O").entity_type(), None);
    }

    #[test]
    fn test_drift_detection() {
        let vocab = tags();

        assert!(vocab.ensure_matches(vocab.labels()).is_ok());
        assert!(matches!(
            vocab.ensure_matches(&["O", "B-PER"]),
            Err(LabelError::Drift { .. })
        ));
    }
}
