use crate::utils::classes::LabelVocab;

/// Target value for positions excluded from the loss and from metrics
pub const IGNORE_INDEX: i64 = -100;

/// Project word-level BIO labels onto the subword tokens produced by the tokenizer.
///
/// `word_ids` holds, for every token position, the index of the word that produced it (or
/// `None` for special and padding positions). The first subword of a word takes the word's
/// label; later subwords of the same word take the continuation label (`B-x` becomes `I-x`).
/// Word indices past the end of `word_labels`, and labels missing from the vocabulary, read as
/// the outside label.
pub fn align_labels<S: AsRef<str>>(
    word_labels: &[S],
    word_ids: &[Option<u32>],
    vocab: &LabelVocab,
) -> Vec<i64> {
    let outside = vocab.outside_id();
    let mut previous: Option<u32> = None;

    word_ids
        .iter()
        .map(|word_id| {
            let aligned = match *word_id {
                None => IGNORE_INDEX,
                Some(word) => {
                    let id = word_labels
                        .get(word as usize)
                        .and_then(|label| vocab.id(label.as_ref()))
                        .unwrap_or(outside);

                    if previous == Some(word) {
                        vocab.continuation_id(id) as i64
                    } else {
                        id as i64
                    }
                }
            };

            previous = *word_id;

            aligned
        })
        .collect()
}

/// Recover one label id per word from aligned token labels, reading the first subword of each
/// word. Positions without an owning word, and ignored positions, are skipped.
pub fn word_labels(aligned: &[i64], word_ids: &[Option<u32>]) -> Vec<i64> {
    let mut labels = Vec::new();
    let mut previous: Option<u32> = None;

    for (label, word_id) in aligned.iter().zip(word_ids) {
        if let Some(word) = word_id {
            if previous != Some(*word) && *label != IGNORE_INDEX {
                labels.push(*label);
            }
        }

        previous = *word_id;
    }

    labels
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::datasets::pii::LABELS;

    fn vocab() -> LabelVocab {
        LabelVocab::new(LABELS).unwrap()
    }

    #[test]
    fn test_first_subword_keeps_label_continuations_go_inside() {
        // [CLS] 홍 ##길동 은 서울 에 산다 [SEP]
        let word_ids = [
            None,
            Some(0),
            Some(0),
            Some(1),
            Some(2),
            Some(3),
            Some(4),
            None,
        ];
        let labels = ["B-PER", "O", "B-LOC", "O", "O"];

        let aligned = align_labels(&labels, &word_ids, &vocab());

        assert_eq!(aligned, vec![IGNORE_INDEX, 1, 2, 0, 3, 0, 0, IGNORE_INDEX]);
    }

    #[test]
    fn test_output_length_matches_word_ids() {
        let word_ids = [None, Some(0), Some(1), Some(1), Some(1), None, None, None];

        let aligned = align_labels(&["O", "B-ORG"], &word_ids, &vocab());

        assert_eq!(aligned.len(), word_ids.len());
        assert_eq!(aligned[2..5].to_vec(), vec![5, 6, 6]);
        assert!(aligned[5..].iter().all(|l| *l == IGNORE_INDEX));
    }

    #[test]
    fn test_null_positions_are_always_ignored() {
        let aligned = align_labels(&["B-PER"], &[None, None], &vocab());

        assert_eq!(aligned, vec![IGNORE_INDEX, IGNORE_INDEX]);
    }

    #[test]
    fn test_inside_and_outside_carry_over() {
        let word_ids = [Some(0), Some(0), Some(1), Some(1)];

        let aligned = align_labels(&["I-LOC", "O"], &word_ids, &vocab());

        assert_eq!(aligned, vec![4, 4, 0, 0]);
    }

    #[test]
    fn test_mismatched_lengths_fall_back_to_outside() {
        // The tokenizer saw three words but only two labels were given
        let word_ids = [None, Some(0), Some(1), Some(2), Some(2), None];

        let aligned = align_labels(&["B-PER", "I-PER"], &word_ids, &vocab());

        assert_eq!(aligned, vec![IGNORE_INDEX, 1, 2, 0, 0, IGNORE_INDEX]);
    }

    #[test]
    fn test_unknown_label_reads_as_outside() {
        let aligned = align_labels(&["B-DATE", "B-PER"], &[Some(0), Some(0), Some(1)], &vocab());

        assert_eq!(aligned, vec![0, 0, 1]);
    }

    #[test]
    fn test_word_level_round_trip() {
        let word_ids = [
            None,
            Some(0),
            Some(0),
            Some(1),
            Some(2),
            Some(2),
            Some(3),
            None,
            None,
        ];
        let labels = ["B-PER", "O", "B-ORG", "B-LOC"];
        let vocab = vocab();

        let aligned = align_labels(&labels, &word_ids, &vocab);
        let recovered: Vec<&str> = word_labels(&aligned, &word_ids)
            .into_iter()
            .map(|id| vocab.label(id as usize).unwrap())
            .collect();

        assert_eq!(recovered, labels);
    }
}
