//! Line splitting and line classification for pasted text.
//!
//! Every line break style is honored, zero-width characters are stripped, and
//! each line is tagged as blank, separator, timestamp or content before any
//! speaker matching happens.

use once_cell::sync::Lazy;
use regex::Regex;

/// Dates as they show up in chat exports: ISO-ish, US-style and Chinese.
pub(crate) const DATE: &str = r"(?:\d{4}[-/.]\d{1,2}[-/.]\d{1,2}|\d{1,2}/\d{1,2}/\d{2,4}|\d{4}年\d{1,2}月\d{1,2}日|\d{1,2}月\d{1,2}日)";

/// Clock time with optional seconds and an optional AM/PM marker.
pub(crate) const TIME: &str = r"(?:\d{1,2}:\d{2}(?::\d{2})?(?:\s*[AaPp]\.?[Mm]\.?)?)";

/// Period-of-day words that chat apps put in front of a clock time.
pub(crate) const PERIOD: &str =
    r"(?:上午|下午|中午|晚上|凌晨|早上|傍晚|深夜|昨天|今天|前天|星期[一二三四五六日天]|周[一二三四五六日天]|[Tt]oday|[Yy]esterday)";

const ZERO_WIDTH: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-–—_=*~·•.。…#+]\s*){3,}$").expect("separator regex"));

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^[\[(（【]?\s*(?:{DATE}[\sT,]*)?(?:{PERIOD}\s*)?{TIME}\s*[\])）】]?$"
    ))
    .expect("timestamp regex")
});

static DATE_ONLY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^[\[(（【]?\s*{DATE}(?:\s*{PERIOD})?\s*[\])）】]?$")).expect("date regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Separator,
    Timestamp,
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub kind: LineKind,
}

impl Line {
    pub fn is_content(&self) -> bool {
        self.kind == LineKind::Content
    }

    /// Separator and timestamp-only lines never reach a parser.
    pub fn is_ignored(&self) -> bool {
        matches!(self.kind, LineKind::Separator | LineKind::Timestamp)
    }
}

pub fn strip_zero_width(text: &str) -> String {
    text.chars().filter(|c| !ZERO_WIDTH.contains(c)).collect()
}

pub fn is_separator(line: &str) -> bool {
    SEPARATOR_RE.is_match(line)
}

pub fn is_timestamp(line: &str) -> bool {
    TIMESTAMP_RE.is_match(line) || DATE_ONLY_RE.is_match(line)
}

pub fn classify(line: &str) -> LineKind {
    if line.is_empty() {
        LineKind::Blank
    } else if is_separator(line) {
        LineKind::Separator
    } else if is_timestamp(line) {
        LineKind::Timestamp
    } else {
        LineKind::Content
    }
}

/// Splits raw input on any line terminator and classifies every resulting line.
pub fn lines(raw: &str) -> Vec<Line> {
    raw.replace("\r\n", "\n")
        .split(['\n', '\r', '\u{2028}', '\u{2029}'])
        .map(|piece| {
            let text = strip_zero_width(piece).trim().to_owned();
            let kind = classify(&text);
            Line { text, kind }
        })
        .collect()
}
