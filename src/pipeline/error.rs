//! Pipeline-specific error types.
//!
//! Two families live here: configuration errors, raised while building and
//! wiring a pipeline and never retried, and contract errors such as asking a
//! packet for the wrong payload type. An empty port or an invalid packet is
//! *not* an error and never shows up in this enum.

use crate::pipeline::port::PortDirection;
use thiserror::Error;

/// Errors that can occur within the pipeline system.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No {direction} port registered under tag '{tag}'")]
    PortNotFound {
        tag: String,
        direction: PortDirection,
    },

    #[error("No side packet registered under tag '{0}'")]
    SidePacketNotFound(String),

    #[error("No context found for stage '{0}'")]
    StageNotFound(String),

    #[error("A stage named '{0}' is already registered")]
    DuplicateStage(String),

    #[error("No stages registered")]
    NoStagesRegistered,

    #[error("Pipeline has not been connected")]
    NotConnected,

    #[error("Pipeline is already connected")]
    AlreadyConnected,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether this error belongs to the setup/wiring family.
    ///
    /// Stage-wrapped errors report the classification of the inner error.
    pub fn is_configuration(&self) -> bool {
        match self {
            PipelineError::PortNotFound { .. }
            | PipelineError::SidePacketNotFound(_)
            | PipelineError::StageNotFound(_)
            | PipelineError::DuplicateStage(_)
            | PipelineError::NoStagesRegistered
            | PipelineError::NotConnected
            | PipelineError::AlreadyConnected
            | PipelineError::InvalidConfig(_) => true,
            PipelineError::Stage { source, .. } => source.is_configuration(),
            _ => false,
        }
    }

    /// Attach the name of the stage whose hook produced this error.
    pub fn with_stage(self, stage: impl Into<String>) -> Self {
        PipelineError::Stage {
            stage: stage.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any stage wrappers.
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Extension trait for tagging hook results with the stage that produced them.
pub trait StageResultExt<T> {
    fn with_stage(self, stage: &str) -> PipelineResult<T>;
}

impl<T> StageResultExt<T> for PipelineResult<T> {
    fn with_stage(self, stage: &str) -> PipelineResult<T> {
        self.map_err(|e| e.with_stage(stage))
    }
}
