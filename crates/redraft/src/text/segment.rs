/// Splits a document into independently processed segments.
///
/// Implementations must be deterministic: a run materializes its segments
/// once and relies on the count staying stable.
pub trait Segmenter: Send + Sync {
    fn split(&self, text: &str) -> Vec<String>;
}

/// One segment per non-blank line, trimmed, in document order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParagraphSegmenter;

impl Segmenter for ParagraphSegmenter {
    fn split(&self, text: &str) -> Vec<String> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}
