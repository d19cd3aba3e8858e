//! Document segmentation and length/weight counting.

pub mod count;
pub mod segment;

pub use count::{count_length, count_weighted};
pub use segment::{ParagraphSegmenter, Segmenter};
