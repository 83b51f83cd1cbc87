use std::{
    collections::BTreeMap,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use burn::{
    config::Config as _,
    module::Module,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::backend::Backend,
};
use derive_new::new;
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::{
    models::encoder::{Config as ModelConfig, Model},
    utils::{classes::LabelVocab, files::write_lines},
};

use super::{
    batcher::Infer,
    checkpoint::{Checkpoint, Restored},
    encoder::{Encoded, Encoder},
    parity::{compare, Logits, ParityPolicy, ParityReport, PARITY_TOLERANCE},
    task::{label_vocab, Task},
};

/// Graph weights, without the recorder's extension
pub static GRAPH_WEIGHTS_FILE: &str = "graph";

/// Hyperparameters needed to rebuild the graph
pub static GRAPH_CONFIG_FILE: &str = "graph_config.json";

/// Input/output declaration of the graph
pub static GRAPH_SPEC_FILE: &str = "graph.json";

/// One token per line, ordered by id
pub static VOCAB_FILE: &str = "vocab.txt";

/// Graph input names, in call order
pub const INPUT_NAMES: [&str; 3] = ["input_ids", "attention_mask", "token_type_ids"];

/// Graph output name
pub const OUTPUT_NAME: &str = "logits";

/// Name of the dynamic batch axis
pub const BATCH_AXIS: &str = "batch_size";

/// Name of the dynamic sequence axis
pub const SEQUENCE_AXIS: &str = "sequence_length";

/// Named inputs and outputs of an exported graph, with the axes that may vary between calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSpec {
    /// Input names, in call order
    pub inputs: Vec<String>,

    /// Output names
    pub outputs: Vec<String>,

    /// For each input and output, the axes that are dynamic and their names
    pub dynamic_axes: BTreeMap<String, BTreeMap<usize, String>>,

    /// Longest sequence the graph accepts
    pub max_position_embeddings: usize,
}

impl GraphSpec {
    /// Declare the graph of a classifier. Token-level logits also vary along the sequence axis.
    pub fn new(token_level: bool, max_position_embeddings: usize) -> Self {
        let sequence_axes = || {
            BTreeMap::from([
                (0, BATCH_AXIS.to_string()),
                (1, SEQUENCE_AXIS.to_string()),
            ])
        };

        let mut dynamic_axes: BTreeMap<String, BTreeMap<usize, String>> = INPUT_NAMES
            .iter()
            .map(|name| (name.to_string(), sequence_axes()))
            .collect();

        let logits_axes = if token_level {
            sequence_axes()
        } else {
            BTreeMap::from([(0, BATCH_AXIS.to_string())])
        };
        dynamic_axes.insert(OUTPUT_NAME.to_string(), logits_axes);

        Self {
            inputs: INPUT_NAMES.iter().map(|name| name.to_string()).collect(),
            outputs: vec![OUTPUT_NAME.to_string()],
            dynamic_axes,
            max_position_embeddings,
        }
    }

    /// Check that an input fits the graph
    pub fn validate(&self, input: &Encoded) -> anyhow::Result<()> {
        let length = input.len();

        ensure!(length > 0, "Graph inputs need at least one position");
        ensure!(
            length <= self.max_position_embeddings,
            "Input of {} positions exceeds the graph limit of {}",
            length,
            self.max_position_embeddings
        );
        ensure!(
            input.attention_mask.len() == length && input.segment_ids.len() == length,
            "Graph inputs {:?} must share one length",
            self.inputs
        );

        Ok(())
    }
}

/// Serializes a trained model into a self-contained graph directory. Implementations do blocking
/// file IO.
pub trait GraphExporter<B: Backend> {
    /// Write the graph for `model` into `dir`
    fn export(
        &self,
        model: &Model<B>,
        config: &ModelConfig,
        spec: &GraphSpec,
        dir: &Path,
    ) -> anyhow::Result<()>;
}

/// Writes full-precision named MessagePack weights with the model config and graph declaration
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordGraph;

impl<B: Backend> GraphExporter<B> for RecordGraph {
    fn export(
        &self,
        model: &Model<B>,
        config: &ModelConfig,
        spec: &GraphSpec,
        dir: &Path,
    ) -> anyhow::Result<()> {
        NamedMpkFileRecorder::<FullPrecisionSettings>::new()
            .record(model.clone().into_record(), dir.join(GRAPH_WEIGHTS_FILE))
            .map_err(|e| anyhow!("Unable to write graph weights: {}", e))?;

        config.save(dir.join(GRAPH_CONFIG_FILE))?;
        std::fs::write(dir.join(GRAPH_SPEC_FILE), serde_json::to_string_pretty(spec)?)?;

        Ok(())
    }
}

/// Runs one encoded input through a model and returns its logits
pub trait Runtime {
    /// Run a single input (batch of one)
    fn run(&self, input: &Encoded) -> anyhow::Result<Logits>;
}

/// The in-memory model the graph was exported from
#[derive(new)]
pub struct ReferenceModel<'a, B: Backend, T: Task> {
    model: &'a Model<B>,
    device: B::Device,
    #[new(default)]
    task: PhantomData<T>,
}

impl<'a, B: Backend, T: Task> Runtime for ReferenceModel<'a, B, T> {
    fn run(&self, input: &Encoded) -> anyhow::Result<Logits> {
        let batch = Infer::from_rows(std::slice::from_ref(input), &self.device);

        Ok(T::logits(self.model, batch))
    }
}

/// A graph read back from an exported directory
pub struct PortableGraph<B: Backend, T: Task> {
    model: Model<B>,
    spec: GraphSpec,
    device: B::Device,
    task: PhantomData<T>,
}

impl<B: Backend, T: Task> PortableGraph<B, T> {
    /// Load a graph written by [`RecordGraph`]. Blocks on file IO.
    pub fn load(dir: &Path, device: &B::Device) -> anyhow::Result<Self> {
        let spec: GraphSpec =
            serde_json::from_str(&std::fs::read_to_string(dir.join(GRAPH_SPEC_FILE))?)?;
        let config = ModelConfig::load_file(dir.join(GRAPH_CONFIG_FILE))?;

        let record = NamedMpkFileRecorder::<FullPrecisionSettings>::new()
            .load(dir.join(GRAPH_WEIGHTS_FILE), device)
            .map_err(|e| anyhow!("Unable to load graph weights: {}", e))?;

        Ok(Self {
            model: config.init::<B>(device).load_record(record),
            spec,
            device: device.clone(),
            task: PhantomData,
        })
    }

    /// The graph declaration
    pub fn spec(&self) -> &GraphSpec {
        &self.spec
    }
}

impl<B: Backend, T: Task> Runtime for PortableGraph<B, T> {
    fn run(&self, input: &Encoded) -> anyhow::Result<Logits> {
        self.spec.validate(input)?;

        let batch = Infer::from_rows(std::slice::from_ref(input), &self.device);

        Ok(T::logits(&self.model, batch))
    }
}

/// The metadata document shipped next to the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Artifact name
    pub name: String,

    /// Class labels in id order
    pub labels: Vec<String>,

    /// Encoding length the graph was exported for
    pub max_length: usize,

    /// Decision threshold
    pub threshold: f64,
}

/// Write every vocabulary token on its own line, ordered by id. Returns the number of tokens.
pub async fn write_vocab(tokenizer: &Tokenizer, dir: &Path) -> anyhow::Result<usize> {
    let mut tokens: Vec<(String, u32)> = tokenizer.get_vocab(true).into_iter().collect();
    tokens.sort_by_key(|(_, id)| *id);

    write_lines(dir.join(VOCAB_FILE), tokens.iter().map(|(token, _)| token)).await?;

    Ok(tokens.len())
}

/// Write the task metadata document
pub async fn write_metadata<T: Task>(
    vocab: &LabelVocab,
    max_length: usize,
    dir: &Path,
) -> anyhow::Result<PathBuf> {
    let metadata = Metadata::new(
        T::NAME.to_string(),
        vocab.labels().to_vec(),
        max_length,
        T::THRESHOLD,
    );

    let path = dir.join(T::METADATA_FILE);
    tokio::fs::write(&path, serde_json::to_string_pretty(&metadata)?).await?;

    Ok(path)
}

/// Export the best model of a checkpoint into a portable bundle and verify that the bundle
/// reproduces the in-memory model's logits on the task's canonical input.
///
/// Artifacts are always written; `policy` decides whether a failed parity check is an error.
pub async fn export<B: Backend, T: Task>(
    device: &B::Device,
    checkpoint: &Checkpoint,
    output_dir: &Path,
    max_length: Option<usize>,
    policy: ParityPolicy,
) -> anyhow::Result<ParityReport> {
    let vocab = label_vocab::<T>()?;

    let Restored {
        model,
        model_config,
        training,
        tokenizer,
    } = checkpoint.restore::<B>(&vocab, device)?;

    let max_length = max_length.unwrap_or(training.max_length);
    ensure!(
        max_length > 0 && max_length <= model_config.max_position_embeddings,
        "Max length {} is outside 1..={}",
        max_length,
        model_config.max_position_embeddings
    );

    tokio::fs::create_dir_all(output_dir).await?;

    let spec = GraphSpec::new(T::TOKEN_LEVEL, model_config.max_position_embeddings);
    let graph_model = model.clone();
    let graph_dir = output_dir.to_path_buf();
    tokio::task::spawn_blocking(move || {
        RecordGraph.export(&graph_model, &model_config, &spec, &graph_dir)
    })
    .await??;
    info!("Exported graph to {}", output_dir.display());

    let tokens = write_vocab(&tokenizer, output_dir).await?;
    info!("Saved {} ({} tokens)", VOCAB_FILE, tokens);

    let metadata = write_metadata::<T>(&vocab, max_length, output_dir).await?;
    info!("Saved {}", metadata.display());

    let encoder = Encoder::new(tokenizer, max_length)?;
    let input = T::canonical_input(&encoder)?;

    let reference = ReferenceModel::<B, T>::new(&model, device.clone()).run(&input)?;

    let graph_dir = output_dir.to_path_buf();
    let graph_device = device.clone();
    let portable = tokio::task::spawn_blocking(move || {
        PortableGraph::<B, T>::load(&graph_dir, &graph_device)?.run(&input)
    })
    .await??;

    let report = compare(&reference, &portable, PARITY_TOLERANCE)?;
    report.log();
    policy.enforce(&report)?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use burn::backend::{ndarray::NdArrayDevice, NdArray};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        pipelines::sequence_classification::{
            parity::Verdict, text_classification::TextClassification,
            token_classification::TokenClassification,
        },
        utils::{
            files::read_file,
            testing::{random_checkpoint, tokenizer},
        },
    };

    type B = NdArray;

    #[test]
    fn test_graph_spec_axes() {
        let sentence = GraphSpec::new(false, 512);
        let tokens = GraphSpec::new(true, 512);

        assert_eq!(sentence.inputs, INPUT_NAMES.to_vec());
        assert_eq!(sentence.outputs, vec![OUTPUT_NAME]);
        assert_eq!(sentence.dynamic_axes["input_ids"].len(), 2);
        assert_eq!(
            sentence.dynamic_axes[OUTPUT_NAME],
            BTreeMap::from([(0, BATCH_AXIS.to_string())])
        );
        assert_eq!(tokens.dynamic_axes[OUTPUT_NAME][&1], SEQUENCE_AXIS);
    }

    #[test]
    fn test_graph_spec_rejects_long_inputs() {
        let spec = GraphSpec::new(false, 4);
        let input = |n: usize| Encoded {
            input_ids: vec![1; n],
            attention_mask: vec![1; n],
            segment_ids: vec![0; n],
            word_ids: vec![None; n],
        };

        assert!(spec.validate(&input(4)).is_ok());
        assert!(spec.validate(&input(5)).is_err());
        assert!(spec.validate(&input(0)).is_err());
    }

    #[tokio::test]
    async fn test_export_text_classifier_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("model");
        let output_dir = dir.path().join("export");

        let report = export::<B, TextClassification>(
            &NdArrayDevice::Cpu,
            &random_checkpoint::<TextClassification>(&model_dir, 16),
            &output_dir,
            None,
            ParityPolicy::Strict,
        )
        .await
        .unwrap();

        assert_eq!(report.verdict, Verdict::Pass);

        let vocab = read_file(output_dir.join(VOCAB_FILE)).await.unwrap();
        assert_eq!(vocab.len(), 23);
        assert_eq!(vocab[0], "[UNK]");
        assert_eq!(vocab[22], "##하세요");

        let metadata: Metadata = serde_json::from_str(
            &std::fs::read_to_string(output_dir.join("config.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(metadata.name, "injection-classifier");
        assert_eq!(metadata.max_length, 16);
        assert_eq!(metadata.threshold, 0.7);
        assert_eq!(metadata.labels.len(), 5);

        let raw = std::fs::read_to_string(output_dir.join("config.json")).unwrap();
        assert!(raw.contains("\"maxLength\""));
    }

    #[tokio::test]
    async fn test_export_token_classifier_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("model");
        let output_dir = dir.path().join("export");

        let report = export::<B, TokenClassification>(
            &NdArrayDevice::Cpu,
            &random_checkpoint::<TokenClassification>(&model_dir, 16),
            &output_dir,
            Some(12),
            ParityPolicy::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.verdict, Verdict::Pass);
        assert!(output_dir.join("label_map.json").exists());
        assert!(output_dir.join(GRAPH_SPEC_FILE).exists());

        let graph = PortableGraph::<B, TokenClassification>::load(&output_dir, &NdArrayDevice::Cpu)
            .unwrap();
        let encoder = Encoder::new(tokenizer(), 12).unwrap();
        let logits = graph
            .run(&TokenClassification::canonical_input(&encoder).unwrap())
            .unwrap();

        assert_eq!(logits.shape(), &[1, 12, 7]);
    }

    #[tokio::test]
    async fn test_export_rejects_drifted_labels() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("model");

        // A tagging checkpoint exported as a sentence classifier
        let result = export::<B, TextClassification>(
            &NdArrayDevice::Cpu,
            &random_checkpoint::<TokenClassification>(&model_dir, 16),
            &dir.path().join("export"),
            None,
            ParityPolicy::default(),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_export_into_checkpoint_dir_keeps_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = random_checkpoint::<TextClassification>(dir.path(), 16);
        let vocab = label_vocab::<TextClassification>().unwrap();

        let before = std::fs::read(dir.path().join("model.mpk.gz")).unwrap();

        export::<B, TextClassification>(
            &NdArrayDevice::Cpu,
            &checkpoint,
            dir.path(),
            None,
            ParityPolicy::Strict,
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(dir.path().join("model.mpk.gz")).unwrap(), before);
        assert!(dir.path().join("graph.mpk").exists());
        assert!(dir.path().join(GRAPH_CONFIG_FILE).exists());
        assert!(checkpoint
            .restore::<B>(&vocab, &NdArrayDevice::Cpu)
            .is_ok());
    }
}
