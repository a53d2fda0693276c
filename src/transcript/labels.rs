//! Speaker-label recognition for pasted transcripts.
//!
//! Patterns are tried from most to least specific so that
//! `2024-01-05 14:00 - Alice: hello` yields the speaker `Alice` rather than the
//! whole timestamp prefix. A pattern whose captured name fails
//! [`is_plausible_speaker`] does not count as a match, and the next pattern is
//! tried instead.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::normalize::{self, DATE, PERIOD, TIME};

pub const MAX_SPEAKER_CHARS: usize = 24;
pub const MAX_SPEAKER_WORDS: usize = 4;
/// `Name 14:05` headers carry a bare name, never a phrase.
pub const MAX_HEADER_WORDS: usize = 2;

/// Words that put a clock time inside a sentence: `meet at 5:00`.
const TIME_PREPOSITIONS: &[&str] = &[
    "at", "by", "on", "in", "to", "from", "until", "till", "around", "about", "before", "after",
    "since", "past",
];

const SENTENCE_FINAL: &[char] = &['。', '！', '？', '?', '!'];

static DATETIME_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^[\[(]?{DATE}[\sT,]+(?:{PERIOD}\s*)?{TIME}[\])]?\s*[-–—]?\s*(?P<name>[^:：]+?)\s*[:：]\s*(?P<text>.+)$"
    ))
    .expect("datetime label regex")
});

static BRACKET_TIME_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^\[(?:{DATE}[\sT,]*)?(?:{PERIOD}\s*)?{TIME}\]\s*(?P<name>[^:：]+?)\s*[:：]\s*(?P<text>.+)$"
    ))
    .expect("bracket time label regex")
});

static BRACKET_NAME_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\[【](?P<name>[^\]】]+)[\]】]\s*[:：]?\s*(?P<text>.+)$")
        .expect("bracket name label regex")
});

static COLON_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>[^:：]+?)\s*[:：]\s*(?P<text>.+)$").expect("colon label regex")
});

static ARROW_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>[^>]+?)\s*>\s*(?P<text>.+)$").expect("arrow label regex")
});

static HEADER_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?P<name>[^:：\d\s][^:：]*?)\s+(?:{DATE}[\sT,]*)?(?:{PERIOD}\s*)?{TIME}$"
    ))
    .expect("header time regex")
});

static HEADER_COLON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<name>[^:：]+?)\s*[:：]$").expect("header colon regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMatch {
    /// `Name: text` and friends: a new turn starts on this very line.
    Label { speaker: String, text: String },
    /// `Name 14:05` or `Name:` alone: the next line opens this speaker's turn.
    Header { speaker: String },
}

impl LineMatch {
    pub fn speaker(&self) -> &str {
        match self {
            LineMatch::Label { speaker, .. } | LineMatch::Header { speaker } => speaker,
        }
    }
}

enum Shape {
    Label(&'static Lazy<Regex>),
    Header(&'static Lazy<Regex>),
}

/// Precedence order. Header shapes sit before the generic colon label so that
/// `Alice 14:05` is not read as speaker `Alice 14` saying `05`.
static SHAPES: [Shape; 7] = [
    Shape::Label(&DATETIME_LABEL_RE),
    Shape::Label(&BRACKET_TIME_LABEL_RE),
    Shape::Label(&BRACKET_NAME_LABEL_RE),
    Shape::Header(&HEADER_TIME_RE),
    Shape::Header(&HEADER_COLON_RE),
    Shape::Label(&COLON_LABEL_RE),
    Shape::Label(&ARROW_LABEL_RE),
];

pub fn match_line(line: &str) -> Option<LineMatch> {
    SHAPES.iter().find_map(|shape| match shape {
        Shape::Label(re) => {
            let caps = re.captures(line)?;
            let speaker = caps.name("name")?.as_str().trim();
            let text = caps.name("text")?.as_str().trim();
            // `https://...` splits into name `https` and text `//...`.
            if text.is_empty()
                || text.starts_with("//")
                || splits_clock_time(speaker, text)
                || !is_plausible_speaker(speaker)
            {
                return None;
            }
            Some(LineMatch::Label {
                speaker: speaker.to_owned(),
                text: text.to_owned(),
            })
        }
        Shape::Header(re) => {
            let caps = re.captures(line)?;
            let speaker = caps.name("name")?.as_str().trim();
            is_plausible_header_name(speaker).then(|| LineMatch::Header {
                speaker: speaker.to_owned(),
            })
        }
    })
}

/// Rejects captures that are really the head of a sentence containing a colon.
pub fn is_plausible_speaker(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty()
        && name.chars().count() <= MAX_SPEAKER_CHARS
        && !looks_like_url(name)
        && !name.contains(SENTENCE_FINAL)
        && name.split_whitespace().count() <= MAX_SPEAKER_WORDS
        && !normalize::is_timestamp(name)
        && name.chars().any(char::is_alphabetic)
}

/// Header names are held to a stricter standard, since any short sentence can
/// end in a time. Multi-word Latin names must be capitalized word by word.
pub fn is_plausible_header_name(name: &str) -> bool {
    if !is_plausible_speaker(name) {
        return false;
    }
    let words: Vec<&str> = name.split_whitespace().collect();
    if words.len() > MAX_HEADER_WORDS {
        return false;
    }
    if words
        .iter()
        .any(|word| TIME_PREPOSITIONS.contains(&word.to_lowercase().as_str()))
    {
        return false;
    }
    words.len() == 1
        || words
            .iter()
            .all(|word| !word.starts_with(|c: char| c.is_ascii_lowercase()))
}

/// `at 5:00` split on its colon into name `at 5` and text `00`.
fn splits_clock_time(speaker: &str, text: &str) -> bool {
    speaker.ends_with(|c: char| c.is_ascii_digit()) && text.starts_with(|c: char| c.is_ascii_digit())
}

fn looks_like_url(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("www.") || lower.contains("http")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(speaker: &str, text: &str) -> Option<LineMatch> {
        Some(LineMatch::Label {
            speaker: speaker.to_owned(),
            text: text.to_owned(),
        })
    }

    fn header(speaker: &str) -> Option<LineMatch> {
        Some(LineMatch::Header {
            speaker: speaker.to_owned(),
        })
    }

    #[test]
    fn datetime_prefix_wins_over_generic_colon() {
        assert_eq!(match_line("2024-01-05 14:00 - Alice: hello"), label("Alice", "hello"));
        assert_eq!(match_line("1/5/24, 2:00 PM - Bob: hey"), label("Bob", "hey"));
    }

    #[test]
    fn bracketed_time_and_bracketed_name() {
        assert_eq!(match_line("[14:02] Alice: hi there"), label("Alice", "hi there"));
        assert_eq!(match_line("[Alice] hi there"), label("Alice", "hi there"));
        assert_eq!(match_line("【小明】你好"), label("小明", "你好"));
    }

    #[test]
    fn colon_and_arrow_labels() {
        assert_eq!(match_line("Alice: hi"), label("Alice", "hi"));
        assert_eq!(match_line("小红：在吗"), label("小红", "在吗"));
        assert_eq!(match_line("Bob > sure"), label("Bob", "sure"));
    }

    #[test]
    fn header_only_lines() {
        assert_eq!(match_line("Alice 14:05"), header("Alice"));
        assert_eq!(match_line("张三 下午 3:20"), header("张三"));
        assert_eq!(match_line("Bob:"), header("Bob"));
        assert_eq!(match_line("Jane Doe 9:15 AM"), header("Jane Doe"));
    }

    #[test]
    fn sentences_ending_in_a_time_are_not_headers() {
        assert_eq!(match_line("see you at 5:00"), None);
        assert_eq!(match_line("ok meet at 6:30"), None);
        assert_eq!(match_line("lunch is 12:30"), None);
        assert_eq!(match_line("around 7:00"), None);
        assert!(!is_plausible_header_name("Alice and Bob too"));
        assert!(is_plausible_header_name("小明"));
    }

    #[test]
    fn sentence_colons_are_not_speakers() {
        assert_eq!(match_line("Here is the thing I wanted to say: nothing"), None);
        assert_eq!(match_line("Really? yes: it works"), None);
        assert_eq!(match_line("see https://example.com/a"), None);
        assert_eq!(match_line("https://example.com/a"), None);
        assert_eq!(match_line("14: the answer"), None);
    }

    #[test]
    fn plausible_speaker_rules() {
        assert!(is_plausible_speaker("Alice"));
        assert!(is_plausible_speaker("Dr. Jane Smith"));
        assert!(!is_plausible_speaker("a name that is way too long to be real"));
        assert!(!is_plausible_speaker("one two three four five"));
        assert!(!is_plausible_speaker("why?"));
        assert!(!is_plausible_speaker("www.example.com"));
        assert!(!is_plausible_speaker("14:05"));
    }
}
