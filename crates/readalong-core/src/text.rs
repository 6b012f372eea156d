use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Anything that is not a letter or a decimal digit.
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{Nd}]").expect("valid regex"));

/// Keep only letters and decimal digits, lower-cased.
///
/// Other numerics (superscripts, fractions, roman numerals) are dropped.
/// Punctuation-only input normalizes to an empty string, which alignment
/// treats as unmatchable.
pub fn normalize(raw: &str) -> String {
    NON_WORD.replace_all(raw, "").to_lowercase()
}

/// Split on whitespace runs, normalize each piece and drop empty results.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(normalize)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Whitespace-separated pieces paired with their normalized token.
///
/// Pieces that normalize to nothing (dashes, bullets) are dropped, so the
/// tokens are exactly those of [`tokenize`].
pub fn words_with_tokens(text: &str) -> Vec<(&str, String)> {
    text.split_whitespace()
        .map(|piece| (piece, normalize(piece)))
        .filter(|(_, token)| !token.is_empty())
        .collect()
}

/// Number of whitespace-separated words, as used for timer pacing.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Byte ranges of sentence bodies, untrimmed.
///
/// A boundary is a run of whitespace directly preceded by `.`, `!` or `?`.
/// The whitespace run itself belongs to no range.
pub fn sentence_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if c.is_whitespace() && prev.is_some_and(is_terminator) {
            spans.push(start..idx);
            let mut end = idx + c.len_utf8();
            while let Some(&(next_idx, next)) = chars.peek() {
                if !next.is_whitespace() {
                    break;
                }
                end = next_idx + next.len_utf8();
                chars.next();
            }
            start = end;
            prev = None;
            continue;
        }
        prev = Some(c);
    }

    if start < text.len() {
        spans.push(start..text.len());
    }
    spans
}

/// Split text into trimmed, non-empty sentences.
///
/// This is a punctuation heuristic: abbreviations such as "e.g. this" split
/// too, and text without terminators is a single sentence.
pub fn segment_sentences(text: &str) -> Vec<String> {
    sentence_spans(text)
        .into_iter()
        .map(|r| text[r].trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Hello,"), "hello");
        assert_eq!(normalize("“Quoted”"), "quoted");
        assert_eq!(normalize("Straße"), "straße");
        assert_eq!(normalize("ÉCOLE-42"), "école42");
        assert_eq!(normalize("—"), "");
        assert_eq!(normalize("..."), "");
    }

    #[test]
    fn test_normalize_keeps_only_decimal_digits() {
        assert_eq!(normalize("x²"), "x");
        assert_eq!(normalize("½"), "");
        assert_eq!(normalize("Ⅻ"), "");
        assert_eq!(normalize("٣4"), "٣4");
        assert_eq!(normalize("E=mc²"), "emc");
    }

    #[test]
    fn test_tokenize_drops_punctuation_only_pieces() {
        assert_eq!(
            tokenize("  The quick — brown\tfox!  "),
            vec!["the", "quick", "brown", "fox"]
        );
        assert!(tokenize(" - ; ").is_empty());
    }

    #[test]
    fn test_words_with_tokens_matches_tokenize() {
        let text = "Hello, — world!";
        let pairs = words_with_tokens(text);
        assert_eq!(
            pairs,
            vec![("Hello,", "hello".to_string()), ("world!", "world".to_string())]
        );
        let tokens: Vec<String> = pairs.into_iter().map(|(_, t)| t).collect();
        assert_eq!(tokens, tokenize(text));
    }

    #[test]
    fn test_word_count_counts_raw_pieces() {
        assert_eq!(word_count("Wait — what?"), 3);
        assert_eq!(word_count("   "), 0);
    }

    #[test]
    fn test_segment_sentences() {
        let text = "First one. Second one!  Third?\nFourth without end";
        assert_eq!(
            segment_sentences(text),
            vec!["First one.", "Second one!", "Third?", "Fourth without end"]
        );
    }

    #[test]
    fn test_terminator_without_whitespace_does_not_split() {
        assert_eq!(segment_sentences("Version 1.5 is out."), vec!["Version 1.5 is out."]);
        assert_eq!(segment_sentences("Wow!!! Really?"), vec!["Wow!!!", "Really?"]);
    }

    #[test]
    fn test_empty_and_blank_spans_dropped() {
        assert!(segment_sentences("").is_empty());
        assert!(segment_sentences("   \n ").is_empty());
        assert_eq!(segment_sentences("  Lead in. "), vec!["Lead in."]);
    }

    #[test]
    fn test_sentence_round_trip() {
        let paragraph = "Reading along is fun. It keeps focus! Does it scale? Yes, mostly.";
        let spans = sentence_spans(paragraph);
        let mut rebuilt = String::new();
        let mut last_end = 0;
        for span in &spans {
            rebuilt.push_str(&paragraph[last_end..span.start]);
            rebuilt.push_str(&paragraph[span.clone()]);
            last_end = span.end;
        }
        rebuilt.push_str(&paragraph[last_end..]);
        assert_eq!(rebuilt, paragraph);

        let sentences = segment_sentences(paragraph);
        assert_eq!(sentences.len(), 4);
        assert_eq!(sentences.join(" "), paragraph);
    }

    #[test]
    fn test_multibyte_text_boundaries() {
        let text = "Ça va. Très bien… Merci!";
        assert_eq!(segment_sentences(text), vec!["Ça va.", "Très bien… Merci!"]);
    }
}
