use std::fmt::Display;

use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::InMemDataset},
    tensor::backend::Backend,
};

use crate::{
    datasets::{split, SplitSelector},
    models::encoder::Model,
    utils::classes::LabelVocab,
};

use super::{
    batcher::Batcher,
    checkpoint::{Checkpoint, Restored},
    encoder::Encoder,
    task::{encode_all, label_vocab, Task},
    token_classification::IGNORE_INDEX,
};

/// Predicted and expected class ids, position by position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predictions {
    /// Class ids chosen by the model
    pub predicted: Vec<usize>,

    /// Gold class ids
    pub expected: Vec<usize>,
}

impl Predictions {
    /// Pair up raw ids, dropping positions whose expected id is the ignore sentinel
    pub fn from_ids(predicted: Vec<i64>, expected: Vec<i64>) -> Self {
        let (predicted, expected) = predicted
            .into_iter()
            .zip(expected)
            .filter(|(_, expected)| *expected != IGNORE_INDEX)
            .map(|(predicted, expected)| (predicted as usize, expected as usize))
            .unzip();

        Self {
            predicted,
            expected,
        }
    }

    /// Append another batch of predictions
    pub fn extend(&mut self, other: Predictions) {
        self.predicted.extend(other.predicted);
        self.expected.extend(other.expected);
    }

    /// Number of scored positions
    pub fn len(&self) -> usize {
        self.expected.len()
    }

    /// True when nothing was scored
    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }
}

/// Precision, recall and F1 for one class (or an average over classes)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassMetrics {
    /// Fraction of predictions of this class that were correct
    pub precision: f64,

    /// Fraction of this class that was found
    pub recall: f64,

    /// Harmonic mean of precision and recall
    pub f1: f64,

    /// Number of positions whose expected class is this one
    pub support: usize,
}

/// Per-class and averaged metrics with the confusion matrix. Divisions by zero yield 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    labels: Vec<String>,
    per_class: Vec<ClassMetrics>,
    accuracy: f64,
    macro_avg: ClassMetrics,
    weighted_avg: ClassMetrics,

    /// Rows are expected classes, columns predicted classes
    confusion: Vec<Vec<usize>>,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

impl ClassificationReport {
    /// Score predictions over every label of the vocabulary
    pub fn new<S: AsRef<str>>(predictions: &Predictions, labels: &[S]) -> Self {
        let n = labels.len();
        let mut confusion = vec![vec![0usize; n]; n];

        for (predicted, expected) in predictions.predicted.iter().zip(&predictions.expected) {
            if *predicted < n && *expected < n {
                confusion[*expected][*predicted] += 1;
            }
        }

        let per_class: Vec<ClassMetrics> = (0..n)
            .map(|class| {
                let tp = confusion[class][class] as f64;
                let support: usize = confusion[class].iter().sum();
                let predicted: usize = confusion.iter().map(|row| row[class]).sum();

                let precision = ratio(tp, predicted as f64);
                let recall = ratio(tp, support as f64);
                let f1 = ratio(2.0 * precision * recall, precision + recall);

                ClassMetrics {
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        let total: usize = per_class.iter().map(|m| m.support).sum();
        let correct: usize = (0..n).map(|class| confusion[class][class]).sum();

        let average = |weight: &dyn Fn(&ClassMetrics) -> f64, norm: f64| ClassMetrics {
            precision: ratio(per_class.iter().map(|m| m.precision * weight(m)).sum(), norm),
            recall: ratio(per_class.iter().map(|m| m.recall * weight(m)).sum(), norm),
            f1: ratio(per_class.iter().map(|m| m.f1 * weight(m)).sum(), norm),
            support: total,
        };

        let macro_avg = average(&|_: &ClassMetrics| 1.0, n as f64);
        let weighted_avg = average(&|m: &ClassMetrics| m.support as f64, total as f64);

        Self {
            labels: labels.iter().map(|l| l.as_ref().to_string()).collect(),
            accuracy: ratio(correct as f64, total as f64),
            per_class,
            macro_avg,
            weighted_avg,
            confusion,
        }
    }

    /// Metrics per class, in id order
    pub fn per_class(&self) -> &[ClassMetrics] {
        &self.per_class
    }

    /// Fraction of positions predicted correctly
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Unweighted mean over classes
    pub fn macro_avg(&self) -> ClassMetrics {
        self.macro_avg
    }

    /// Support-weighted mean over classes
    pub fn weighted_avg(&self) -> ClassMetrics {
        self.weighted_avg
    }

    /// Support-weighted F1, used for checkpoint selection
    pub fn weighted_f1(&self) -> f64 {
        self.weighted_avg.f1
    }

    /// Rows are expected classes, columns predicted classes
    pub fn confusion_matrix(&self) -> &[Vec<usize>] {
        &self.confusion
    }

    /// The confusion matrix as aligned text
    pub fn confusion_table(&self) -> String {
        let width = self
            .confusion
            .iter()
            .flatten()
            .map(|count| count.to_string().len())
            .max()
            .unwrap_or(1);

        self.confusion
            .iter()
            .map(|row| {
                let cells: Vec<String> = row
                    .iter()
                    .map(|count| format!("{:>width$}", count, width = width))
                    .collect();

                format!("[{}]", cells.join(" "))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Display for ClassificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self
            .labels
            .iter()
            .map(|l| l.chars().count())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(0);

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "",
            "precision",
            "recall",
            "f1-score",
            "support",
            width = width
        )?;
        writeln!(f)?;

        let row = |f: &mut std::fmt::Formatter<'_>, name: &str, m: &ClassMetrics| {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name,
                m.precision,
                m.recall,
                m.f1,
                m.support,
                width = width
            )
        };

        for (label, metrics) in self.labels.iter().zip(&self.per_class) {
            row(f, label, metrics)?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.macro_avg.support,
            width = width
        )?;
        row(f, "macro avg", &self.macro_avg)?;
        row(f, "weighted avg", &self.weighted_avg)
    }
}

/// Score a model over batches
pub fn evaluate_batches<B, T, I>(
    model: &Model<B>,
    batches: I,
    vocab: &LabelVocab,
) -> ClassificationReport
where
    B: Backend,
    T: Task,
    I: IntoIterator<Item = T::Batch<B>>,
{
    let mut predictions = Predictions::default();

    for batch in batches {
        predictions.extend(T::predict(model, batch));
    }

    ClassificationReport::new(&predictions, vocab.labels())
}

/// Restore a checkpoint, reproduce its train/val/test split over `records`, and score the
/// selected partition
pub fn evaluate<B: Backend, T: Task>(
    device: &B::Device,
    checkpoint: &Checkpoint,
    records: Vec<T::Record>,
    selector: SplitSelector,
    batch_size: Option<usize>,
) -> anyhow::Result<ClassificationReport> {
    let vocab = label_vocab::<T>()?;

    let Restored {
        model,
        training,
        tokenizer,
        ..
    } = checkpoint.restore::<B>(&vocab, device)?;

    let records = split(records, training.split_ratios()?, training.seed).take(selector);
    info!("Evaluating on {} split: {} records", selector, records.len());

    let encoder = Encoder::new(tokenizer, training.max_length)?;
    let examples = encode_all::<T>(&encoder, &records, &vocab)?;

    let dataloader = DataLoaderBuilder::new(Batcher::<B, T>::new(device.clone()))
        .batch_size(batch_size.unwrap_or(training.batch_size))
        .build(InMemDataset::new(examples));

    Ok(evaluate_batches::<B, T, _>(&model, dataloader.iter(), &vocab))
}
