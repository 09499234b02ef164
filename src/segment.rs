//! Sentence segmentation for diary paragraphs.
//!
//! Two passes: Unicode sentence boundaries (UAX #29) handle punctuated text,
//! then each piece is split again after Korean sentence-final endings so
//! that run-on clauses without punctuation (common in diary writing) still
//! yield one sentence each.

use crate::error::{MoodError, Result};
use unicode_segmentation::UnicodeSegmentation;

/// Word endings that close a Korean sentence in plain, informal or polite style.
///
/// Single-syllable endings such as `-어` or `-다` are left out: they also
/// close connective forms and common nouns (`바다`), and splitting on them
/// produces fragments. Past forms contracted into the stem (`왔어`, `갔다`)
/// are caught by [`has_past_final`] instead.
const KOREAN_FINAL_ENDINGS: &[&str] = &[
    "었다", "았다", "였다", "했다", "겠다", "한다", "된다", "는다", "니다", "었어", "았어", "였어",
    "했어", "겠어", "있어", "없어", "싶어", "어요", "아요", "해요", "에요", "예요", "네요", "군요",
    "지요", "세요", "까요", "죠",
];

/// Final-consonant index of ㅆ within a precomposed Hangul syllable.
const SSANGSIOT_FINAL: u32 = 20;

/// Whether `c` is a Hangul syllable closed by ㅆ, the past-tense marker
/// in `왔`, `갔`, `됐`.
fn has_past_final(c: char) -> bool {
    let code = u32::from(c);
    (0xAC00..=0xD7A3).contains(&code) && (code - 0xAC00) % 28 == SSANGSIOT_FINAL
}

/// Trailing characters ignored when looking for a sentence-final ending.
fn is_closing_mark(c: char) -> bool {
    matches!(c, '~' | '"' | '\'' | ')' | '…' | '”' | '’' | '」' | '』')
}

/// Split a paragraph into trimmed, non-empty sentences.
///
/// Line breaks are treated as spaces before segmentation. A paragraph with
/// no boundary at all comes back as a single sentence.
///
/// # Errors
///
/// Returns [`MoodError::EmptyInput`] if the paragraph holds only whitespace.
pub fn split_sentences(paragraph: &str) -> Result<Vec<String>> {
    let clean = paragraph.replace(['\r', '\n'], " ");

    let mut sentences = Vec::new();
    for piece in clean.split_sentence_bounds() {
        split_on_final_endings(piece, &mut sentences);
    }

    if sentences.is_empty() {
        return Err(MoodError::EmptyInput(
            "diary text contains no sentences".to_owned(),
        ));
    }
    Ok(sentences)
}

fn split_on_final_endings(piece: &str, out: &mut Vec<String>) {
    let words: Vec<&str> = piece.split_whitespace().collect();
    let mut current = String::new();

    for (i, word) in words.iter().enumerate() {
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);

        let is_last = i + 1 == words.len();
        if !is_last && ends_sentence(word) {
            out.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        out.push(current);
    }
}

fn ends_sentence(word: &str) -> bool {
    let word = word.trim_end_matches(is_closing_mark);
    if KOREAN_FINAL_ENDINGS
        .iter()
        .any(|ending| word.ends_with(ending))
    {
        return true;
    }
    let mut rev = word.chars().rev();
    match (rev.next(), rev.next()) {
        (Some('다' | '어'), Some(stem)) => has_past_final(stem),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn splits_on_terminal_punctuation() {
        let s = split_sentences("오늘 너무 행복했어. 정말 행복했어.").unwrap();
        assert_eq!(s, vec!["오늘 너무 행복했어.", "정말 행복했어."]);
    }

    #[test]
    fn single_sentence_without_boundary_yields_one() {
        let s = split_sentences("그냥 그런 하루").unwrap();
        assert_eq!(s, vec!["그냥 그런 하루"]);
    }

    #[test]
    fn newlines_become_spaces() {
        let s = split_sentences("비가 오는 날\n우산을 들고").unwrap();
        assert_eq!(s, vec!["비가 오는 날 우산을 들고"]);
    }

    #[test]
    fn newline_between_informal_sentences_splits() {
        let s = split_sentences("오늘은 비가 왔어\n우산이 없었어").unwrap();
        assert_eq!(s, vec!["오늘은 비가 왔어", "우산이 없었어"]);
    }

    #[test]
    fn informal_past_endings_split() {
        let s = split_sentences("오늘 너무 행복했어 그런데 저녁엔 너무 피곤했어").unwrap();
        assert_eq!(s, vec!["오늘 너무 행복했어", "그런데 저녁엔 너무 피곤했어"]);
    }

    #[test]
    fn informal_present_endings_split() {
        let s = split_sentences("시간이 없어 그래도 쉬고 싶어 내일은 약속이 있어 기대돼").unwrap();
        assert_eq!(
            s,
            vec!["시간이 없어", "그래도 쉬고 싶어", "내일은 약속이 있어", "기대돼"]
        );
    }

    #[test]
    fn contracted_past_stems_split() {
        let s = split_sentences("친구가 왔다 같이 밥을 먹었어 일찍 잤어").unwrap();
        assert_eq!(s, vec!["친구가 왔다", "같이 밥을 먹었어", "일찍 잤어"]);
    }

    #[test]
    fn past_final_detection() {
        assert!(has_past_final('왔'));
        assert!(has_past_final('갔'));
        assert!(has_past_final('있'));
        assert!(!has_past_final('바'));
        assert!(!has_past_final('없'));
        assert!(!has_past_final('a'));
    }

    #[test]
    fn crlf_is_normalised() {
        let s = split_sentences("첫 줄이야.\r\n둘째 줄이야.").unwrap();
        assert_eq!(s.len(), 2);
        assert!(s.iter().all(|x| !x.contains('\r')));
    }

    #[test]
    fn splits_unpunctuated_korean_endings() {
        let s = split_sentences("오늘 정말 행복했다 내일도 기대된다").unwrap();
        assert_eq!(s, vec!["오늘 정말 행복했다", "내일도 기대된다"]);
    }

    #[test]
    fn polite_endings_split() {
        let s = split_sentences("날씨가 좋네요 산책을 했어요").unwrap();
        assert_eq!(s, vec!["날씨가 좋네요", "산책을 했어요"]);
    }

    #[test]
    fn ending_followed_by_closing_mark_still_splits() {
        let s = split_sentences("너무 좋았다~ 또 가고 싶어").unwrap();
        assert_eq!(s, vec!["너무 좋았다~", "또 가고 싶어"]);
    }

    #[test]
    fn noun_ending_in_da_does_not_split() {
        let s = split_sentences("바다 보러 갔어").unwrap();
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn decimal_point_is_not_a_boundary() {
        let s = split_sentences("시험 점수는 3.5점이었다.").unwrap();
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn english_punctuation() {
        let s = split_sentences("I had a great day! Will tomorrow be good?").unwrap();
        assert_eq!(s, vec!["I had a great day!", "Will tomorrow be good?"]);
    }

    #[test]
    fn blank_input_is_empty_error() {
        assert!(matches!(
            split_sentences("   \n\t "),
            Err(MoodError::EmptyInput(_))
        ));
        assert!(matches!(split_sentences(""), Err(MoodError::EmptyInput(_))));
    }
}
