//! Command line tool for training

use std::path::PathBuf;

use aegis_transformers::{
    cli::{self, Pipeline, TrainingBackend},
    datasets::{load_jsonl, split},
    pipelines::sequence_classification::{
        task::label_vocab, train, Checkpoint, Encoder, Task, TextClassification,
        TokenClassification, Training,
    },
    utils::hugging_face::load_tokenizer,
};
use anyhow::anyhow;
use log::info;
use pico_args::Arguments;

const HELP: &str = "\
Usage: train PIPELINE --data FILE [OPTIONS]

Arguments:
  PIPELINE             The pipeline to use ('text-classification' or 'token-classification')

Options:
  -h, --help           Print help
  --data               Path to the JSONL dataset
  --tokenizer          Hugging Face Hub model name or local tokenizer path
  --output             Checkpoint directory (defaults to 'checkpoints/<model name>')
  --config             JSON training config to start from
  -n, --num-epochs     Number of epochs to train for (defaults to 5)
  -b, --batch-size     Batch size (defaults to 16)
  --lr                 Peak learning rate (defaults to 2e-5)
  --max-length         Token positions per example (defaults to 512)
  --warmup-ratio       Fraction of steps spent warming up (defaults to 0.1)
  --seed               Random seed (defaults to 42)
";

#[derive(Debug)]
struct Args {
    pipeline: String,
    data: PathBuf,
    tokenizer: Option<String>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    num_epochs: Option<usize>,
    batch_size: Option<usize>,
    learning_rate: Option<f64>,
    max_length: Option<usize>,
    warmup_ratio: Option<f64>,
    seed: Option<u64>,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            data: pargs.value_from_str("--data").map_err(|e| match e {
                pico_args::Error::MissingOption(_) => anyhow!("Missing required option: --data"),
                _ => anyhow!("{}", e),
            })?,
            tokenizer: pargs.opt_value_from_str("--tokenizer")?,
            output: pargs.opt_value_from_str("--output")?,
            config: pargs.opt_value_from_str("--config")?,
            num_epochs: pargs.opt_value_from_str(["-n", "--num-epochs"])?,
            batch_size: pargs.opt_value_from_str(["-b", "--batch-size"])?,
            learning_rate: pargs.opt_value_from_str("--lr")?,
            max_length: pargs.opt_value_from_str("--max-length")?,
            warmup_ratio: pargs.opt_value_from_str("--warmup-ratio")?,
            seed: pargs.opt_value_from_str("--seed")?,
            pipeline: pargs.free_from_str().map_err(|e| match e {
                pico_args::Error::MissingArgument => anyhow!("Missing required argument: PIPELINE"),
                _ => anyhow!("{}", e),
            })?,
        };

        Ok(Some(args))
    }

    /// Start from the config file or the defaults, then apply flags
    fn config<T: Task>(&self, pipeline: Pipeline) -> anyhow::Result<Training> {
        let labels: Vec<String> = T::labels().iter().map(|l| l.to_string()).collect();

        let mut config = match &self.config {
            Some(path) => Training::load_file(path)?,
            None => Training::new(pipeline.default_tokenizer().to_string(), labels.clone()),
        };

        if let Some(tokenizer) = &self.tokenizer {
            config.base_model = tokenizer.clone();
        }

        if let Some(num_epochs) = self.num_epochs {
            config.num_epochs = num_epochs;
        }

        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }

        if let Some(learning_rate) = self.learning_rate {
            config.learning_rate = learning_rate;
        }

        if let Some(max_length) = self.max_length {
            config.max_length = max_length;
        }

        if let Some(warmup_ratio) = self.warmup_ratio {
            config.warmup_ratio = warmup_ratio;
        }

        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        config.labels = labels;

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::init_logging();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let pipeline = Pipeline::try_from(args.pipeline.as_str())?;

    match pipeline {
        Pipeline::TextClassification => run::<TextClassification>(pipeline, &args).await,
        Pipeline::TokenClassification => run::<TokenClassification>(pipeline, &args).await,
    }
}

async fn run<T: Task>(pipeline: Pipeline, args: &Args) -> anyhow::Result<()> {
    let config = args.config::<T>(pipeline)?;
    let vocab = label_vocab::<T>()?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| pipeline.default_checkpoint_dir());
    let checkpoint = Checkpoint::create(output)?;

    let records = load_jsonl::<T::Record, _>(&args.data, &vocab).await?;
    let parts = split(records, config.split_ratios()?, config.seed);

    let tokenizer = load_tokenizer(&config.base_model).await?;
    let encoder = Encoder::new(tokenizer, config.max_length)?;

    let summary = train::<TrainingBackend, T>(
        &cli::device(),
        &encoder,
        &vocab,
        parts,
        &config,
        &checkpoint,
    )?;

    info!(
        "Best model from epoch {} (val F1: {:.4}) saved to {}",
        summary.best_epoch,
        summary.best_f1,
        checkpoint.dir().display()
    );

    Ok(())
}
