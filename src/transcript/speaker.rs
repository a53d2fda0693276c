use super::detect::SpeakerTally;
use super::labels::{self, LineMatch};
use super::{ProvisionalEntry, TextParse};
use crate::normalize::{Line, LineKind};

struct OpenTurn {
    speaker: String,
    text: String,
    lines: usize,
}

#[derive(Default)]
struct SpeakerParser {
    current: Option<OpenTurn>,
    pending_header: Option<String>,
    tally: SpeakerTally,
    out: TextParse,
}

impl SpeakerParser {
    fn flush(&mut self) {
        if let Some(turn) = self.current.take() {
            self.tally.record(&turn.speaker);
            self.out.consumed += turn.lines;
            self.out
                .entries
                .push(ProvisionalEntry::spoken_by(turn.speaker, turn.text));
        }
    }

    fn drop_dangling_header(&mut self) {
        if self.pending_header.take().is_some() {
            self.out.ignored += 1;
        }
    }

    fn feed(&mut self, line: &Line) {
        match line.kind {
            LineKind::Blank => {}
            LineKind::Separator | LineKind::Timestamp => self.out.ignored += 1,
            LineKind::Content => self.feed_content(&line.text),
        }
    }

    fn feed_content(&mut self, text: &str) {
        match labels::match_line(text) {
            Some(LineMatch::Label { speaker, text }) => {
                self.flush();
                self.drop_dangling_header();
                self.current = Some(OpenTurn {
                    speaker,
                    text,
                    lines: 1,
                });
            }
            Some(LineMatch::Header { speaker }) => {
                self.flush();
                self.drop_dangling_header();
                self.pending_header = Some(speaker);
            }
            None => {
                if let Some(speaker) = self.pending_header.take() {
                    // The header line itself is consumed by the turn it opens.
                    self.current = Some(OpenTurn {
                        speaker,
                        text: text.to_owned(),
                        lines: 2,
                    });
                } else if let Some(turn) = self.current.as_mut() {
                    turn.text.push('\n');
                    turn.text.push_str(text);
                    turn.lines += 1;
                } else {
                    self.out.ignored += 1;
                }
            }
        }
    }

    fn finish(mut self) -> TextParse {
        self.flush();
        self.drop_dangling_header();
        self.out.speakers = self.tally.ranked();
        self.out
    }
}

/// Runs the labeled-transcript state machine over normalized lines.
pub fn parse(lines: &[Line]) -> TextParse {
    let mut parser = SpeakerParser::default();
    for line in lines {
        parser.feed(line);
    }
    parser.finish()
}
