use itertools::Itertools;
use tracing::debug;

use super::labels::{self, LineMatch};
use super::{DetectedMode, ModeOverride};
use crate::normalize::Line;

/// Share of usable lines that must carry a label before speaker mode is chosen.
/// Empirical; tolerant of stray lines and OCR noise.
pub const LABEL_RATIO_THRESHOLD: f64 = 0.3;
pub const MIN_DISTINCT_SPEAKERS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub mode: DetectedMode,
    /// Distinct names seen on label or header lines, most frequent first.
    pub speakers: Vec<String>,
}

/// Counts per name, remembering the order names were first seen in.
#[derive(Debug, Clone, Default)]
pub struct SpeakerTally {
    counts: Vec<(String, usize)>,
}

impl SpeakerTally {
    pub fn record(&mut self, name: &str) {
        match self.counts.iter_mut().find(|(seen, _)| seen == name) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((name.to_owned(), 1)),
        }
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn repeated(&self) -> usize {
        self.counts.iter().filter(|(_, count)| *count >= 2).count()
    }

    /// Most frequent first; `sorted_by` is stable so ties stay in first-seen order.
    pub fn ranked(&self) -> Vec<String> {
        self.counts
            .iter()
            .sorted_by(|a, b| b.1.cmp(&a.1))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

pub fn detect(lines: &[Line], requested: ModeOverride) -> Detection {
    if requested == ModeOverride::Alternate {
        return Detection {
            mode: DetectedMode::Alternate,
            speakers: Vec::new(),
        };
    }

    let mut tally = SpeakerTally::default();
    let mut usable = 0usize;
    let mut labeled = 0usize;

    let matches: Vec<Option<LineMatch>> = lines
        .iter()
        .filter(|line| line.is_content())
        .map(|line| labels::match_line(&line.text))
        .collect();

    for (position, found) in matches.iter().enumerate() {
        usable += 1;
        match found {
            // A header only counts when an unlabeled line follows to carry its turn.
            Some(LineMatch::Header { .. })
                if !matches.get(position + 1).is_some_and(Option::is_none) => {}
            Some(found) => {
                labeled += 1;
                tally.record(found.speaker());
            }
            None => {}
        }
    }

    let mode = match requested {
        ModeOverride::Speaker => DetectedMode::Speaker,
        _ if looks_speaker_labeled(usable, labeled, &tally) => DetectedMode::Speaker,
        _ => DetectedMode::Alternate,
    };

    debug!(
        usable,
        labeled,
        distinct = tally.distinct(),
        repeated = tally.repeated(),
        %mode,
        "dialogue mode detected"
    );

    Detection {
        mode,
        speakers: tally.ranked(),
    }
}

fn looks_speaker_labeled(usable: usize, labeled: usize, tally: &SpeakerTally) -> bool {
    if usable == 0 || tally.distinct() < MIN_DISTINCT_SPEAKERS {
        return false;
    }
    labeled as f64 / usable as f64 >= LABEL_RATIO_THRESHOLD || tally.repeated() >= 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize;

    #[test]
    fn two_speakers_labeling_half_the_lines_each() {
        let text = (0..10)
            .map(|i| {
                if i % 2 == 0 {
                    format!("Alice: line {i}")
                } else {
                    format!("Bob: line {i}")
                }
            })
            .join("\n");
        let detection = detect(&normalize::lines(&text), ModeOverride::Auto);
        assert_eq!(detection.mode, DetectedMode::Speaker);
        assert_eq!(detection.speakers, vec!["Alice", "Bob"]);
    }

    #[test]
    fn a_single_incidental_colon_stays_alternate() {
        let mut lines: Vec<String> = (0..9).map(|i| format!("just a plain line {i}")).collect();
        lines.insert(4, "Note: remember the milk".to_owned());
        let detection = detect(&normalize::lines(&lines.join("\n")), ModeOverride::Auto);
        assert_eq!(detection.mode, DetectedMode::Alternate);
    }

    #[test]
    fn times_inside_plain_sentences_stay_alternate() {
        let detection = detect(
            &normalize::lines("hi\nsee you at 5:00\nok meet at 6:30"),
            ModeOverride::Auto,
        );
        assert_eq!(detection.mode, DetectedMode::Alternate);
        assert!(detection.speakers.is_empty());
    }

    #[test]
    fn headers_count_only_when_a_turn_follows() {
        let with_bodies = detect(
            &normalize::lines("Alice 14:05\nhello\nBob 14:06\nhi there"),
            ModeOverride::Auto,
        );
        assert_eq!(with_bodies.mode, DetectedMode::Speaker);
        assert_eq!(with_bodies.speakers, vec!["Alice", "Bob"]);

        let bare = detect(&normalize::lines("Alice 14:05\nBob 14:06"), ModeOverride::Auto);
        assert_eq!(bare.mode, DetectedMode::Alternate);
    }

    #[test]
    fn repeated_speaker_overrides_a_low_ratio() {
        let mut lines: Vec<String> = (0..20).map(|i| format!("noise {i}")).collect();
        lines.push("Alice: one".to_owned());
        lines.push("Alice: two".to_owned());
        lines.push("Bob: three".to_owned());
        let detection = detect(&normalize::lines(&lines.join("\n")), ModeOverride::Auto);
        assert_eq!(detection.mode, DetectedMode::Speaker);
    }

    #[test]
    fn overrides_are_honored() {
        let lines = normalize::lines("Alice: hi\nBob: hello");
        assert_eq!(detect(&lines, ModeOverride::Alternate).mode, DetectedMode::Alternate);
        let forced = detect(&normalize::lines("hi\nthere"), ModeOverride::Speaker);
        assert_eq!(forced.mode, DetectedMode::Speaker);
        assert!(forced.speakers.is_empty());
    }

    #[test]
    fn ranking_prefers_frequency_then_first_seen() {
        let mut tally = SpeakerTally::default();
        for name in ["Bob", "Alice", "Carol", "Alice"] {
            tally.record(name);
        }
        assert_eq!(tally.ranked(), vec!["Alice", "Bob", "Carol"]);
    }
}
