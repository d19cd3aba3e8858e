//! Domain enums shared by the store and the pipeline.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// One named transformation pass over a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Polish,
    EmotionPolish,
    Enhance,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Polish => "polish",
            Stage::EmotionPolish => "emotion_polish",
            Stage::Enhance => "enhance",
        }
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "polish" => Ok(Stage::Polish),
            "emotion_polish" => Ok(Stage::EmotionPolish),
            "enhance" => Ok(Stage::Enhance),
            other => Err(format!("unknown stage '{}'", other)),
        }
    }
}

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Created,
    Queued,
    Processing,
    Completed,
    Failed,
}

impl RunStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            RunStatus::Created => "created",
            RunStatus::Queued => "queued",
            RunStatus::Processing => "processing",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(RunStatus::Created),
            "queued" => Ok(RunStatus::Queued),
            "processing" => Ok(RunStatus::Processing),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            other => Err(format!("unknown run status '{}'", other)),
        }
    }
}

/// Processing status of a single segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SegmentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            SegmentStatus::Pending => "pending",
            SegmentStatus::Processing => "processing",
            SegmentStatus::Completed => "completed",
            SegmentStatus::Failed => "failed",
        }
    }
}

impl FromStr for SegmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SegmentStatus::Pending),
            "processing" => Ok(SegmentStatus::Processing),
            "completed" => Ok(SegmentStatus::Completed),
            "failed" => Ok(SegmentStatus::Failed),
            other => Err(format!("unknown segment status '{}'", other)),
        }
    }
}

/// Which stages a run goes through. Stored as free text on the run so an
/// unknown value can be reported as a run failure instead of a decode error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    PaperPolish,
    EmotionPolish,
    #[default]
    PaperPolishEnhance,
}

impl ProcessingMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ProcessingMode::PaperPolish => "paper_polish",
            ProcessingMode::EmotionPolish => "emotion_polish",
            ProcessingMode::PaperPolishEnhance => "paper_polish_enhance",
        }
    }

    /// The fixed stage sequence for this mode.
    pub const fn stages(self) -> &'static [Stage] {
        match self {
            ProcessingMode::PaperPolish => &[Stage::Polish],
            ProcessingMode::EmotionPolish => &[Stage::EmotionPolish],
            ProcessingMode::PaperPolishEnhance => &[Stage::Polish, Stage::Enhance],
        }
    }
}

impl FromStr for ProcessingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paper_polish" => Ok(ProcessingMode::PaperPolish),
            "emotion_polish" => Ok(ProcessingMode::EmotionPolish),
            "paper_polish_enhance" => Ok(ProcessingMode::PaperPolishEnhance),
            other => Err(other.to_string()),
        }
    }
}

/// Author of a history turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of rolling context handed to the generative service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Implements `Display`, `ToSql` and `FromSql` for an enum stored as text.
macro_rules! text_column {
    ($($ty:ty),+) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    )+};
}

text_column!(Stage, RunStatus, SegmentStatus);

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
