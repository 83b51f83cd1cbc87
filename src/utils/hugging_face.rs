use std::path::{Path, PathBuf};

use hf_hub::api::tokio::Api;
use tokenizers::Tokenizer;

/// The tokenizer file inside a model directory or Hub repository
pub static TOKENIZER_FILE: &str = "tokenizer.json";

/// Download a single file from a Hugging Face Hub model repository
/// If file exists in cache, it will not be downloaded again
pub async fn download_hf_file(model_name: &str, file: &str) -> anyhow::Result<PathBuf> {
    let api = Api::new()?;
    let repo = api.model(model_name.to_string());

    repo.get(file).await.map_err(|e| {
        anyhow!(
            "Failed to download: {} file with name: {} from HuggingFace Hub: {}",
            model_name,
            file,
            e
        )
    })
}

/// Load a tokenizer from a local `tokenizer.json`, a directory containing one, or a Hub model name
pub async fn load_tokenizer(name_or_path: &str) -> anyhow::Result<Tokenizer> {
    let local = Path::new(name_or_path);

    let path = if local.is_dir() {
        local.join(TOKENIZER_FILE)
    } else if local.is_file() {
        local.to_path_buf()
    } else {
        debug!("{} is not a local path, trying the Hub", name_or_path);
        download_hf_file(name_or_path, TOKENIZER_FILE).await?
    };

    let tokenizer = Tokenizer::from_file(&path)
        .map_err(|e| anyhow!("Unable to load tokenizer from {}: {}", path.display(), e))?;

    info!(
        "Loaded tokenizer from {} ({} tokens)",
        path.display(),
        tokenizer.get_vocab_size(true)
    );

    Ok(tokenizer)
}
