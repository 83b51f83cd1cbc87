use std::{fmt::Display, path::PathBuf};

use crate::pipelines::sequence_classification::{Task, TextClassification, TokenClassification};

/// The unique string token that identifies the prompt-injection classifier
pub static TEXT_CLASSIFICATION: &str = "text-classification";

/// The unique string token that identifies the PII tagger
pub static TOKEN_CLASSIFICATION: &str = "token-classification";

/// Available Pipelines
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Pipeline {
    /// Prompt-injection sentence classification
    TextClassification,

    /// PII token classification
    TokenClassification,
}

impl Pipeline {
    /// Get the default tokenizer for the given pipeline
    pub fn default_tokenizer(&self) -> &'static str {
        match self {
            Pipeline::TextClassification => "klue/roberta-base",
            Pipeline::TokenClassification => "klue/bert-base",
        }
    }

    /// The artifact name of the pipeline's model
    pub fn artifact_name(&self) -> &'static str {
        match self {
            Pipeline::TextClassification => TextClassification::NAME,
            Pipeline::TokenClassification => TokenClassification::NAME,
        }
    }

    /// Where checkpoints go when no directory is given
    pub fn default_checkpoint_dir(&self) -> PathBuf {
        PathBuf::from("checkpoints").join(self.artifact_name())
    }

    /// Where exported bundles go when no directory is given
    pub fn default_export_dir(&self) -> PathBuf {
        PathBuf::from("ml-models").join(self.artifact_name())
    }
}

impl TryFrom<&str> for Pipeline {
    type Error = PipelineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value == TEXT_CLASSIFICATION {
            Ok(Pipeline::TextClassification)
        } else if value == TOKEN_CLASSIFICATION {
            Ok(Pipeline::TokenClassification)
        } else {
            Err(PipelineError::Unknown(value.to_string()))
        }
    }
}

impl Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Pipeline::TextClassification => TEXT_CLASSIFICATION,
            Pipeline::TokenClassification => TOKEN_CLASSIFICATION,
        };

        write!(f, "{}", name)
    }
}

/// Pipeline Error
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PipelineError {
    /// No pipeline found for the given string
    #[error("no pipeline found for {0}")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_pipeline_names() {
        for pipeline in [Pipeline::TextClassification, Pipeline::TokenClassification] {
            let name = pipeline.to_string();

            assert_eq!(Pipeline::try_from(name.as_str()), Ok(pipeline));
        }

        assert_eq!(
            Pipeline::try_from("summarization"),
            Err(PipelineError::Unknown("summarization".to_string()))
        );
    }

    #[test]
    fn test_pipeline_defaults() {
        assert_eq!(
            Pipeline::TokenClassification.default_checkpoint_dir(),
            PathBuf::from("checkpoints/pii-detector")
        );
        assert_eq!(
            Pipeline::TextClassification.default_export_dir(),
            PathBuf::from("ml-models/injection-classifier")
        );
        assert_eq!(
            Pipeline::TextClassification.default_tokenizer(),
            "klue/roberta-base"
        );
    }
}
