//! Share-link recognition and share-page fetching.
//!
//! A share page is fetched through the same-origin proxy when one is
//! configured and directly otherwise; a failed proxy attempt falls back to a
//! direct fetch. Only one fetch is tracked at a time: [`FetchTracker`] keeps
//! the URL of the current input, and a completion for any other URL is stale.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{StatusCode, Url, header};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::ShareCache;
use crate::vendor::Vendor;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const HTML_ACCEPT: &str = "text/html,application/xhtml+xml";

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

static SHARE_LINK_PATTERNS: Lazy<Vec<(Regex, Vendor)>> = Lazy::new(|| {
    [
        (
            r"(?i)^https?://(?:www\.)?(?:chatgpt\.com|chat\.openai\.com)/share/[A-Za-z0-9-]+/?(?:[?#]\S*)?$",
            Vendor::Chatgpt,
        ),
        (
            r"(?i)^https?://(?:[a-z0-9-]+\.)*doubao\.com/thread/[A-Za-z0-9_-]+/?(?:[?#]\S*)?$",
            Vendor::Doubao,
        ),
        (
            r"(?i)^https?://(?:gemini\.google\.com/share|g\.co/gemini/share)/[A-Za-z0-9_-]+/?(?:[?#]\S*)?$",
            Vendor::Gemini,
        ),
    ]
    .into_iter()
    .map(|(pattern, vendor)| (Regex::new(pattern).expect("share link regex"), vendor))
    .collect()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub url: String,
    pub vendor: Vendor,
}

/// Recognizes input that is exactly one known share-page URL.
pub fn share_link(input: &str) -> Option<ShareLink> {
    let candidate = input.trim();
    SHARE_LINK_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(candidate))
        .map(|(_, vendor)| ShareLink {
            url: candidate.to_owned(),
            vendor: *vendor,
        })
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(
        "No proxy is available (running without a local server), and fetching the page directly failed ({0}). Start the proxy or paste the copied conversation instead."
    )]
    NoProxyAvailable(String),
    #[error(
        "The share page could not be fetched: the request was blocked, likely by CORS or access control ({0}). Paste the copied conversation instead."
    )]
    Blocked(String),
    #[error("Fetching the share page failed ({0}).")]
    Failed(String),
}

/// Why one fetch attempt did not produce a page.
#[derive(Debug)]
enum Attempt {
    /// No request was sent.
    InvalidUrl(String),
    Status(StatusCode),
    Transport(reqwest::Error),
}

impl std::fmt::Display for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attempt::InvalidUrl(reason) => write!(f, "invalid URL: {reason}"),
            Attempt::Status(status) => write!(f, "HTTP {status}"),
            Attempt::Transport(err) => write!(f, "{err}"),
        }
    }
}

impl From<reqwest::Error> for Attempt {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Attempt::Status(status),
            None => Attempt::Transport(err),
        }
    }
}

impl Attempt {
    fn is_blocked(&self) -> bool {
        // 401, 403, 429 and 451: the host answered but refused to serve the page.
        matches!(self, Attempt::Status(status) if matches!(status.as_u16(), 401 | 403 | 429 | 451))
    }
}

pub struct ShareResolver {
    client: reqwest::Client,
    proxy_base: Option<Url>,
    cache: Option<ShareCache>,
}

impl ShareResolver {
    pub fn new(proxy_base: Option<Url>, cache: Option<ShareCache>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            proxy_base,
            cache,
        })
    }

    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if let Some(cache) = &self.cache {
            if let Some(html) = cache.get(url).await {
                info!(%url, "using cached share page");
                return Ok(html);
            }
        }

        let html = self.fetch_uncached(url).await?;
        if let Some(cache) = &self.cache {
            cache.insert(url, &html).await;
        }
        Ok(html)
    }

    async fn fetch_uncached(&self, url: &str) -> Result<String, FetchError> {
        let Some(proxy_base) = &self.proxy_base else {
            return self.direct(url).await.map_err(|attempt| {
                warn!(%url, %attempt, "direct fetch failed without a proxy");
                FetchError::NoProxyAvailable(attempt.to_string())
            });
        };

        let proxy_attempt = match self.via_proxy(proxy_base, url).await {
            Ok(html) => return Ok(html),
            Err(attempt) => {
                warn!(%url, %attempt, "proxy fetch failed, trying direct");
                attempt
            }
        };

        self.direct(url).await.map_err(|attempt| {
            warn!(%url, %attempt, "direct fetch failed");
            if attempt.is_blocked() || proxy_attempt.is_blocked() {
                FetchError::Blocked(attempt.to_string())
            } else {
                FetchError::Failed(format!("proxy: {proxy_attempt}; direct: {attempt}"))
            }
        })
    }

    async fn via_proxy(&self, proxy_base: &Url, url: &str) -> Result<String, Attempt> {
        let mut endpoint = proxy_base
            .join("/proxy")
            .map_err(|err| Attempt::InvalidUrl(err.to_string()))?;
        endpoint.query_pairs_mut().append_pair("url", url);
        debug!(%endpoint, "fetching through proxy");
        self.get_html(endpoint).await
    }

    async fn direct(&self, url: &str) -> Result<String, Attempt> {
        let target = Url::parse(url).map_err(|err| Attempt::InvalidUrl(err.to_string()))?;
        debug!(%target, "fetching directly");
        self.get_html(target).await
    }

    async fn get_html(&self, target: Url) -> Result<String, Attempt> {
        let response = self
            .client
            .get(target)
            .header(header::ACCEPT, HTML_ACCEPT)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}

/// A fetch started for one input. Completing it only counts while its URL is
/// still the one the current input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    link: ShareLink,
}

impl FetchTicket {
    pub fn url(&self) -> &str {
        &self.link.url
    }

    pub fn link(&self) -> &ShareLink {
        &self.link
    }
}

#[derive(Debug, Default)]
pub struct FetchTracker {
    current_url: Option<String>,
}

impl FetchTracker {
    /// Starts tracking `link`. Returns `None` when that URL is already in flight.
    pub fn begin(&mut self, link: ShareLink) -> Option<FetchTicket> {
        if self.current_url.as_deref() == Some(link.url.as_str()) {
            return None;
        }
        self.current_url = Some(link.url.clone());
        Some(FetchTicket { link })
    }

    /// The input no longer names a share page; whatever is in flight is stale.
    pub fn clear(&mut self) {
        self.current_url = None;
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.current_url.as_deref() == Some(ticket.url())
    }

    /// Accepts a completion if it is current, and stops tracking it.
    pub fn settle(&mut self, ticket: &FetchTicket) -> bool {
        if !self.is_current(ticket) {
            debug!(url = ticket.url(), "dropping stale fetch result");
            return false;
        }
        self.current_url = None;
        true
    }
}
