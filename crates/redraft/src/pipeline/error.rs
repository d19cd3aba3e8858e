use thiserror::Error;

use crate::ai::AiError;
use crate::db::DatabaseError;
use crate::model::Stage;
use crate::secrets::SecretError;

/// Every way a run can fail. The controller records the message on the run
/// before handing the error back.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Unsupported processing mode '{0}'")]
    UnsupportedMode(String),

    /// `segment` is 1-based; the run's checkpoint holds the 0-based index.
    #[error("Segment {segment} failed during {stage}: {source}")]
    SegmentStage {
        segment: usize,
        stage: Stage,
        #[source]
        source: AiError,
    },

    #[error("History compression after segment {segment} failed during {stage}: {source}")]
    Compression {
        segment: usize,
        stage: Stage,
        #[source]
        source: AiError,
    },

    #[error("Persistence failed: {0}")]
    Persistence(#[from] DatabaseError),

    #[error("Could not resolve service credentials: {0}")]
    Credentials(#[from] SecretError),

    #[error("Run '{0}' not found")]
    RunNotFound(String),
}
