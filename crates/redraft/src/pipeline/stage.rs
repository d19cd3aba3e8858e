//! Which segment field each stage reads and writes.
//!
//! Polish and emotion-polish both produce `polished_text`; enhance produces
//! `enhanced_text` from the polished text.

use crate::db::segment_repo::SegmentRow;
use crate::model::Stage;

/// The stage's output on `segment`, if it already has one.
pub fn output(segment: &SegmentRow, stage: Stage) -> Option<&str> {
    match stage {
        Stage::Polish | Stage::EmotionPolish => segment.polished_text.as_deref(),
        Stage::Enhance => segment.enhanced_text.as_deref(),
    }
}

pub fn set_output(segment: &mut SegmentRow, stage: Stage, text: String) {
    match stage {
        Stage::Polish | Stage::EmotionPolish => segment.polished_text = Some(text),
        Stage::Enhance => segment.enhanced_text = Some(text),
    }
}

/// Text handed to the generative service for this stage.
pub fn input(segment: &SegmentRow, stage: Stage) -> &str {
    match stage {
        Stage::Enhance => segment
            .polished_text
            .as_deref()
            .unwrap_or(&segment.original_text),
        Stage::Polish | Stage::EmotionPolish => &segment.original_text,
    }
}
