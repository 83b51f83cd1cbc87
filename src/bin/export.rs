//! Command line tool for exporting a trained checkpoint and checking the export against it

use std::path::PathBuf;

use aegis_transformers::{
    cli::{self, Backend, Pipeline},
    pipelines::sequence_classification::{
        export, Checkpoint, ParityPolicy, Task, TextClassification, TokenClassification,
    },
};
use anyhow::anyhow;
use pico_args::Arguments;

const HELP: &str = "\
Usage: export PIPELINE [OPTIONS]

Arguments:
  PIPELINE             The pipeline to use ('text-classification' or 'token-classification')

Options:
  -h, --help           Print help
  --model-dir          Checkpoint directory (defaults to 'checkpoints/<model name>')
  --output-dir         Bundle directory (defaults to 'ml-models/<model name>')
  --max-length         Encoding length (defaults to the training max length)
  --strict             Fail when the export does not reproduce the checkpoint's logits
";

#[derive(Debug)]
struct Args {
    pipeline: String,
    model_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    max_length: Option<usize>,
    strict: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            model_dir: pargs.opt_value_from_str("--model-dir")?,
            output_dir: pargs.opt_value_from_str("--output-dir")?,
            max_length: pargs.opt_value_from_str("--max-length")?,
            strict: pargs.contains("--strict"),
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
    let model_dir = args
        .model_dir
        .clone()
        .unwrap_or_else(|| pipeline.default_checkpoint_dir());
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| pipeline.default_export_dir());

    let policy = if args.strict {
        ParityPolicy::Strict
    } else {
        ParityPolicy::Permissive
    };

    export::<Backend, T>(
        &cli::device(),
        &Checkpoint::new(model_dir),
        &output_dir,
        args.max_length,
        policy,
    )
    .await?;

    Ok(())
}
