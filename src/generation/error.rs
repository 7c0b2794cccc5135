use thiserror::Error;

use crate::{generation::PipelineStage, model::DatabaseError};

pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation service error: {0}")]
    Service(String),
    #[error("malformed generation output: {0}")]
    MalformedOutput(String),
    #[error("video service unavailable: {0}")]
    VideoUnavailable(String),
    #[error("persistence failure: {0}")]
    Persistence(#[from] DatabaseError),
    #[error("invalid generation request: {0}")]
    InvalidRequest(String),
    #[error("generation failed during {stage}: {source}")]
    Stage {
        stage: PipelineStage,
        source: Box<GenerationError>,
    },
}

impl GenerationError {
    /// Tags the error with the stage it escaped from. Already tagged errors
    /// keep their original stage.
    pub fn at(self, stage: PipelineStage) -> Self {
        match self {
            Self::Stage { .. } => self,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The error without its stage tag.
    pub fn root(&self) -> &GenerationError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_invalid_request(&self) -> bool {
        matches!(self.root(), Self::InvalidRequest(_))
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(value: reqwest::Error) -> Self {
        Self::Service(value.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stage_tag_is_kept_from_first_failure() {
        let err = GenerationError::Service(String::from("timeout"))
            .at(PipelineStage::Outline)
            .at(PipelineStage::Persist);

        assert_eq!(err.stage(), Some(PipelineStage::Outline));
        assert!(matches!(err.root(), GenerationError::Service(_)));
        assert!(err.to_string().contains("outline"));
    }

    #[test]
    fn invalid_request_detected_through_tag() {
        let err = GenerationError::InvalidRequest(String::from("empty prompt"))
            .at(PipelineStage::Outline);
        assert!(err.is_invalid_request());
    }
}
