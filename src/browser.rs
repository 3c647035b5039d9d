use anyhow::{Context, Result};
use scraper::{Html, Selector};
use std::time::{Duration, Instant};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Minimal page session the crawl stages run against: navigate somewhere,
/// then read the rendered document. Passed explicitly into every stage so
/// tests can substitute an in-memory implementation.
pub trait Browser {
    /// Navigate to `url` and wait until `ready` (a CSS selector) matches in
    /// the document, up to the settle timeout. A page that never produces the
    /// element is still accepted once the window closes.
    fn goto(&mut self, url: &str, ready: &str) -> Result<()>;

    fn current_url(&self) -> &str;

    fn document(&self) -> &Html;
}

/// HTTP-backed session: fetches pages with a browser User-Agent and polls by
/// re-fetching until the readiness selector matches.
pub struct HttpBrowser {
    client: reqwest::blocking::Client,
    settle: Duration,
    poll_interval: Duration,
    url: String,
    document: Html,
}

impl HttpBrowser {
    pub fn new(settle: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            settle,
            poll_interval: Duration::from_millis(250),
            url: String::new(),
            document: Html::parse_document(""),
        })
    }

    fn fetch(&self, url: &str) -> Result<Html> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to fetch {}", url))?;
        let body = response
            .text()
            .context("Failed to read response body")?;
        Ok(Html::parse_document(&body))
    }
}

impl Browser for HttpBrowser {
    fn goto(&mut self, url: &str, ready: &str) -> Result<()> {
        let selector = Selector::parse(ready)
            .map_err(|e| anyhow::anyhow!("Invalid readiness selector {:?}: {:?}", ready, e))?;

        let deadline = Instant::now() + self.settle;
        let mut document = self.fetch(url)?;
        while document.select(&selector).next().is_none() && Instant::now() < deadline {
            std::thread::sleep(self.poll_interval);
            document = self.fetch(url)?;
        }

        tracing::debug!(url, "page loaded");
        self.url = url.to_string();
        self.document = document;
        Ok(())
    }

    fn current_url(&self) -> &str {
        &self.url
    }

    fn document(&self) -> &Html {
        &self.document
    }
}
