//! Counting functions behind the two size thresholds.
//!
//! `count_length` drives title detection; `count_weighted` drives history
//! compression and approximates token cost across scripts.

/// Number of non-whitespace characters.
pub fn count_length(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Script-aware weight: one unit per CJK ideograph, kana or hangul syllable,
/// plus one unit per run of other alphanumeric characters (a word).
/// Punctuation and whitespace weigh nothing.
pub fn count_weighted(text: &str) -> usize {
    let mut weight = 0;
    let mut in_word = false;
    for c in text.chars() {
        if is_logographic(c) {
            weight += 1;
            in_word = false;
        } else if c.is_alphanumeric() {
            if !in_word {
                weight += 1;
                in_word = true;
            }
        } else {
            in_word = false;
        }
    }
    weight
}

fn is_logographic(c: char) -> bool {
    matches!(c,
        '\u{3400}'..='\u{4DBF}'   // CJK extension A
        | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
        | '\u{F900}'..='\u{FAFF}' // CJK compatibility ideographs
        | '\u{3040}'..='\u{30FF}' // hiragana + katakana
        | '\u{AC00}'..='\u{D7AF}' // hangul syllables
    )
}
