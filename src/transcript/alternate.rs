use super::{ProvisionalEntry, SplitMode, TextParse};
use crate::normalize::{Line, LineKind};

/// Splits unlabeled text into turns whose roles follow purely from position.
pub fn parse(lines: &[Line], split: SplitMode) -> TextParse {
    let mut out = TextParse::default();
    let mut paragraph: Vec<&str> = Vec::new();

    for line in lines {
        match (line.kind, split) {
            (LineKind::Content, SplitMode::Line) => {
                out.consumed += 1;
                out.entries
                    .push(ProvisionalEntry::unlabeled(line.text.clone()));
            }
            (LineKind::Content, SplitMode::Paragraph) => paragraph.push(&line.text),
            // Separator and timestamp lines end a paragraph just like a blank line does.
            (LineKind::Separator | LineKind::Timestamp, _) => {
                out.ignored += 1;
                close(&mut paragraph, &mut out);
            }
            (LineKind::Blank, _) => close(&mut paragraph, &mut out),
        }
    }
    close(&mut paragraph, &mut out);

    out
}

fn close(paragraph: &mut Vec<&str>, out: &mut TextParse) {
    if !paragraph.is_empty() {
        out.consumed += paragraph.len();
        out.entries
            .push(ProvisionalEntry::unlabeled(paragraph.join("\n")));
        paragraph.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize;

    fn texts(parse: &TextParse) -> Vec<&str> {
        parse.entries.iter().map(|e| e.text.as_str()).collect()
    }

    #[test]
    fn by_line_makes_one_turn_per_content_line() {
        let parse = parse(&normalize::lines("hi\nhello there\n\nhow are you"), SplitMode::Line);
        assert_eq!(texts(&parse), vec!["hi", "hello there", "how are you"]);
        assert!(parse.entries.iter().all(|e| e.speaker.is_none() && e.role.is_none()));
    }

    #[test]
    fn by_paragraph_joins_until_a_blank_line() {
        let input = "first line\nsecond line\n\n\nreply\n---\nthird turn";
        let parse = parse(&normalize::lines(input), SplitMode::Paragraph);
        assert_eq!(
            texts(&parse),
            vec!["first line\nsecond line", "reply", "third turn"]
        );
        assert_eq!(parse.consumed, 4);
        assert_eq!(parse.ignored, 1);
    }
}
