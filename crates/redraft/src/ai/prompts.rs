//! Fixed prompt texts per stage and the compression instruction templates.

use crate::model::Stage;

pub trait PromptProvider: Send + Sync {
    fn stage_prompt(&self, stage: Stage) -> String;

    /// Instruction handed to the summarizer when history is compressed.
    fn compression_instruction(&self, stage: Stage) -> String;
}

const POLISH_PROMPT: &str = "You are an academic editor. Rewrite the paragraph you are given so \
that it reads fluently and precisely while keeping every claim, term, citation and number \
unchanged. Keep the original language. Output only the rewritten paragraph.";

const EMOTION_POLISH_PROMPT: &str = "You are a literary editor. Rewrite the paragraph you are \
given so that its emotional tone is vivid and natural, with varied sentence rhythm and concrete \
imagery, without changing what happens or who is speaking. Keep the original language. Output \
only the rewritten paragraph.";

const ENHANCE_PROMPT: &str = "You are a senior academic editor. Strengthen the already polished \
paragraph you are given: vary sentence structure, tighten logical connections and make the \
argument more precise, without adding facts or removing content. Keep the original language. \
Output only the enhanced paragraph.";

const STANDARD_COMPRESSION: &str = "You summarize academic text. Compress the previously \
processed content below into its key information:\n\
1. Keep the main terms, core concepts and key data.\n\
2. Summarize the topics and points of the processed paragraphs.\n\
3. Capture the characteristic style and direction of the edits.\n\
4. Drop repetition and redundant wording.\n\
Requirements: at most 30% of the original length, stay academic and precise, output only the \
summary with no explanations.\n\nPreviously processed content:";

const EMOTION_COMPRESSION: &str = "You summarize text. Compress the previously processed \
content below into its key style features:\n\
1. Summarize the expressive style and language traits.\n\
2. Capture the main direction and patterns of the edits.\n\
3. Keep notable word-choice tendencies.\n\
4. Drop repetition and redundant wording.\n\
Requirements: at most 30% of the original length, output only the summary with no \
explanations.\n\nPreviously processed content:";

/// Built-in prompts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPrompts;

impl PromptProvider for DefaultPrompts {
    fn stage_prompt(&self, stage: Stage) -> String {
        match stage {
            Stage::Polish => POLISH_PROMPT,
            Stage::EmotionPolish => EMOTION_POLISH_PROMPT,
            Stage::Enhance => ENHANCE_PROMPT,
        }
        .to_string()
    }

    fn compression_instruction(&self, stage: Stage) -> String {
        match stage {
            Stage::EmotionPolish => EMOTION_COMPRESSION,
            Stage::Polish | Stage::Enhance => STANDARD_COMPRESSION,
        }
        .to_string()
    }
}
