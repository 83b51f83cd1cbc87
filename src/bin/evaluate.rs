//! Command line tool for scoring a trained checkpoint on one partition of its dataset

use std::path::PathBuf;

use aegis_transformers::{
    cli::{self, Backend, Pipeline},
    datasets::{load_jsonl, SplitSelector},
    pipelines::sequence_classification::{
        evaluate, task::label_vocab, Checkpoint, Task, TextClassification, TokenClassification,
    },
};
use anyhow::anyhow;
use log::info;
use pico_args::Arguments;

const HELP: &str = "\
Usage: evaluate PIPELINE --data FILE [OPTIONS]

Arguments:
  PIPELINE             The pipeline to use ('text-classification' or 'token-classification')

Options:
  -h, --help           Print help
  --data               Path to the JSONL dataset the model was trained on
  --model-dir          Checkpoint directory (defaults to 'checkpoints/<model name>')
  --split              Partition to score: train, val or test (defaults to 'test')
  -b, --batch-size     Batch size (defaults to the training batch size)
";

#[derive(Debug)]
struct Args {
    pipeline: String,
    data: PathBuf,
    model_dir: Option<PathBuf>,
    split: Option<String>,
    batch_size: Option<usize>,
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
            model_dir: pargs.opt_value_from_str("--model-dir")?,
            split: pargs.opt_value_from_str("--split")?,
            batch_size: pargs.opt_value_from_str(["-b", "--batch-size"])?,
            pipeline: pargs.free_from_str().map_err(|e| match e {
                pico_args::Error::MissingArgument => anyhow!("Missing required argument: PIPELINE"),
                _ => anyhow!("{}", e),
            })?,
        };

        Ok(Some(args))
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
    let selector = match &args.split {
        Some(name) => SplitSelector::try_from(name.as_str())?,
        None => SplitSelector::Test,
    };

    let model_dir = args
        .model_dir
        .clone()
        .unwrap_or_else(|| pipeline.default_checkpoint_dir());
    let checkpoint = Checkpoint::new(model_dir);

    let records = load_jsonl::<T::Record, _>(&args.data, &label_vocab::<T>()?).await?;

    let report = evaluate::<Backend, T>(
        &cli::device(),
        &checkpoint,
        records,
        selector,
        args.batch_size,
    )?;

    info!("Classification report:\n{}", report);
    info!("Confusion matrix:\n{}", report.confusion_table());

    Ok(())
}
