//! The import pipeline, from raw input to [`ImportSession`].
//!
//! Parsing and role assignment are kept apart. [`ParsedImport`] is built once
//! per input, and [`ParsedImport::session`] applies role choices to it without
//! re-parsing. Every stage returns a fresh value, so running the pipeline twice
//! on the same input gives equal sessions.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::normalize;
use crate::roles::{self, RoleChoice, Turn};
use crate::share::{self, FetchError, FetchTicket, FetchTracker, ShareLink, ShareResolver};
use crate::transcript::{
    DetectedMode, ModeOverride, ProvisionalEntry, SplitMode, alternate, detect, speaker,
};
use crate::vendor::{self, Decoded, Vendor};

pub const NOTHING_RECOGNIZED: &str = "No conversation turns were recognized in the input.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    pub mode: ModeOverride,
    pub split: SplitMode,
}

/// Everything recovered from one input, before roles are chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedImport {
    pub mode: DetectedMode,
    pub source: Option<Vendor>,
    pub speakers: Vec<String>,
    pub entries: Vec<ProvisionalEntry>,
    pub ignored_line_count: usize,
    pub notice: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSession {
    pub detected_mode: DetectedMode,
    /// Vendor id, or empty for pasted text.
    pub source: String,
    pub speakers: Vec<String>,
    pub entries: Vec<Turn>,
    pub ignored_line_count: usize,
    pub notice: String,
}

impl ParsedImport {
    pub fn session(&self, choice: &RoleChoice) -> ImportSession {
        ImportSession {
            detected_mode: self.mode,
            source: self.source.map(|vendor| vendor.to_string()).unwrap_or_default(),
            speakers: self.speakers.clone(),
            entries: roles::assign(self.mode, &self.entries, &self.speakers, choice),
            ignored_line_count: self.ignored_line_count,
            notice: self.notice.clone(),
        }
    }

    fn fetching(link: &ShareLink) -> Self {
        Self {
            mode: DetectedMode::Direct,
            source: Some(link.vendor),
            speakers: Vec::new(),
            entries: Vec::new(),
            ignored_line_count: 0,
            notice: format!("Fetching {} share page…", link.vendor.product_name()),
        }
    }
}

impl From<Decoded> for ParsedImport {
    fn from(decoded: Decoded) -> Self {
        Self {
            mode: DetectedMode::Direct,
            source: Some(decoded.source),
            speakers: Vec::new(),
            entries: decoded.entries,
            ignored_line_count: 0,
            notice: decoded.notice,
        }
    }
}

/// Runs the text pipeline: normalize, detect, then the matching line parser.
pub fn parse_text(raw: &str, options: &ImportOptions) -> ParsedImport {
    let lines = normalize::lines(raw);
    let detection = detect::detect(&lines, options.mode);
    let parse = match detection.mode {
        DetectedMode::Speaker => speaker::parse(&lines),
        _ => alternate::parse(&lines, options.split),
    };
    debug!(
        mode = %detection.mode,
        entries = parse.entries.len(),
        ignored = parse.ignored,
        "parsed pasted text"
    );

    ParsedImport {
        mode: detection.mode,
        source: None,
        notice: if parse.entries.is_empty() {
            NOTHING_RECOGNIZED.to_owned()
        } else {
            String::new()
        },
        speakers: parse.speakers,
        entries: parse.entries,
        ignored_line_count: parse.ignored,
    }
}

/// Decodes pasted page HTML when a vendor is recognized, otherwise treats it as text.
pub fn parse_html(html: &str, options: &ImportOptions) -> ParsedImport {
    match Vendor::sniff(html) {
        Some(vendor) => vendor::decode_html(vendor, html).into(),
        None => parse_text(html, options),
    }
}

/// What the pipeline needs next for an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    Parsed(ParsedImport),
    NeedsFetch(ShareLink),
}

pub fn prepare(raw: &str, options: &ImportOptions) -> Prepared {
    if let Some(link) = share::share_link(raw) {
        // Nothing in a Gemini page's static HTML is decodable; decline without fetching.
        if link.vendor == Vendor::Gemini {
            return Prepared::Parsed(vendor::decode_html(Vendor::Gemini, &link.url).into());
        }
        return Prepared::NeedsFetch(link);
    }
    if vendor::looks_like_html(raw) {
        return Prepared::Parsed(parse_html(raw, options));
    }
    Prepared::Parsed(parse_text(raw, options))
}

/// Turns a finished fetch into a parse. A failed fetch falls through to the
/// text pipeline with the fetch notice attached.
pub fn after_fetch(
    raw: &str,
    link: &ShareLink,
    fetched: Result<String, FetchError>,
    options: &ImportOptions,
) -> ParsedImport {
    match fetched {
        Ok(html) => {
            let vendor = Vendor::sniff(&html).unwrap_or(link.vendor);
            vendor::decode_html(vendor, &html).into()
        }
        Err(err) => ParsedImport {
            notice: err.to_string(),
            ..parse_text(raw, options)
        },
    }
}

/// Input-driven import state: every input change re-runs the pipeline, and a
/// share-page fetch only lands if the input still names that page.
#[derive(Debug)]
pub struct Importer {
    options: ImportOptions,
    tracker: FetchTracker,
    input: String,
    latest: ParsedImport,
}

impl Importer {
    pub fn new(options: ImportOptions) -> Self {
        Self {
            options,
            tracker: FetchTracker::default(),
            input: String::new(),
            latest: parse_text("", &options),
        }
    }

    /// Re-parses `raw`. Returns a ticket when a share page has to be fetched.
    pub fn update(&mut self, raw: &str) -> Option<FetchTicket> {
        self.input = raw.to_owned();
        match prepare(raw, &self.options) {
            Prepared::Parsed(parsed) => {
                self.tracker.clear();
                self.latest = parsed;
                None
            }
            Prepared::NeedsFetch(link) => {
                let ticket = self.tracker.begin(link.clone())?;
                self.latest = ParsedImport::fetching(&link);
                Some(ticket)
            }
        }
    }

    /// Applies a fetch result. Returns `false` when the result was stale and dropped.
    pub fn complete(&mut self, ticket: FetchTicket, fetched: Result<String, FetchError>) -> bool {
        if !self.tracker.settle(&ticket) {
            return false;
        }
        self.latest = after_fetch(&self.input, ticket.link(), fetched, &self.options);
        true
    }

    pub fn latest(&self) -> &ParsedImport {
        &self.latest
    }

    pub fn into_latest(self) -> ParsedImport {
        self.latest
    }
}

/// One-shot import: parses the input and, for a share link, awaits the fetch.
pub async fn import(raw: &str, options: &ImportOptions, resolver: &ShareResolver) -> ParsedImport {
    let mut importer = Importer::new(*options);
    if let Some(ticket) = importer.update(raw) {
        info!(url = ticket.url(), "fetching share page");
        let fetched = resolver.fetch(ticket.url()).await;
        importer.complete(ticket, fetched);
    }
    importer.into_latest()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Role;

    #[test]
    fn empty_input_reports_nothing_recognized() {
        let parsed = parse_text("\n\n", &ImportOptions::default());
        assert!(parsed.entries.is_empty());
        assert_eq!(parsed.notice, NOTHING_RECOGNIZED);
    }

    #[test]
    fn gemini_links_decline_without_fetching() {
        match prepare("https://gemini.google.com/share/abc", &ImportOptions::default()) {
            Prepared::Parsed(parsed) => {
                assert_eq!(parsed.source, Some(Vendor::Gemini));
                assert!(parsed.entries.is_empty());
                assert!(parsed.notice.contains("paste"));
            }
            other => panic!("expected an immediate decline, got {other:?}"),
        }
    }

    #[test]
    fn importer_drops_stale_fetches() {
        let mut importer = Importer::new(ImportOptions::default());
        let first = importer.update("https://chatgpt.com/share/one").unwrap();
        assert_eq!(importer.latest().mode, DetectedMode::Direct);

        // The user edits the input before the first fetch resolves.
        assert!(importer.update("Alice: hi\nBob: hey\nAlice: bye").is_none());
        let typed = importer.latest().clone();

        assert!(!importer.complete(first, Ok("<html></html>".to_owned())));
        assert_eq!(importer.latest(), &typed);
    }

    #[test]
    fn importer_applies_current_fetch() {
        let mut importer = Importer::new(ImportOptions::default());
        let ticket = importer.update("https://chatgpt.com/share/one").unwrap();
        assert!(importer.complete(ticket, Ok("<html>chatgpt.com</html>".to_owned())));

        let parsed = importer.latest();
        assert_eq!(parsed.source, Some(Vendor::Chatgpt));
        assert!(parsed.entries.is_empty());
        assert!(parsed.notice.contains("no embedded conversation payload"));
    }

    #[test]
    fn failed_fetch_falls_through_to_text() {
        let mut importer = Importer::new(ImportOptions::default());
        let ticket = importer.update("https://www.doubao.com/thread/abc").unwrap();
        let failure = FetchError::Blocked("HTTP 403 Forbidden".to_owned());
        assert!(importer.complete(ticket, Err(failure)));

        let session = importer.latest().session(&RoleChoice::default());
        assert_eq!(session.detected_mode, DetectedMode::Alternate);
        assert_eq!(session.source, "");
        assert!(session.notice.contains("blocked"));
        assert_eq!(session.entries.len(), 1);
        assert_eq!(session.entries[0].role, Role::User);
    }

    #[test]
    fn session_serializes_in_camel_case() {
        let parsed = parse_text("hi\nhello", &ImportOptions::default());
        let json = serde_json::to_value(parsed.session(&RoleChoice::default())).unwrap();
        assert_eq!(json["detectedMode"], "alternate");
        assert_eq!(json["ignoredLineCount"], 0);
        assert_eq!(json["entries"][1]["role"], "assistant");
        assert_eq!(json["source"], "");
    }
}
