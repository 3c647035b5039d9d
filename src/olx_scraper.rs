use crate::browser::Browser;
use crate::models::Listing;
use anyhow::{Context, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Listing card on a search results page.
pub const CARD_SELECTOR: &str = r#"div[data-cy="l-card"]"#;
/// "Next page" control on a search results page.
pub const NEXT_PAGE_SELECTOR: &str = r#"a[data-testid="pagination-forward"]"#;
/// Title block on a detail page, also used as the readiness marker.
pub const TITLE_SELECTOR: &str = r#"div[data-cy="ad_title"]"#;

const PRICE_SELECTOR: &str = r#"div[data-testid="ad-price-container"]"#;
const DESCRIPTION_SELECTOR: &str = r#"div[data-cy="ad_description"]"#;
const LOCATION_SELECTOR: &str = "p.css-1cju8pu";

// Parameter labels on a detail page. Matched case-insensitively against
// paragraph text; the trailing colon keeps "поверх:" from matching
// "поверховість".
const FLOOR_LABEL: &str = "поверх:";
const HEIGHT_LABEL: &str = "поверховість:";
const AREA_LABEL: &str = "площа:";

/// Collects the detail-page links of all listing cards on a results page, in
/// document order. A card without a link is a hard failure for the page.
pub fn collect_listing_links(document: &Html, page_url: &str) -> Result<Vec<String>> {
    let card_selector = Selector::parse(CARD_SELECTOR).unwrap();
    let link_selector = Selector::parse("a").unwrap();

    let mut links = Vec::new();
    for card in document.select(&card_selector) {
        let link = card
            .select(&link_selector)
            .next()
            .context("Listing card without a link")?;
        let href = link
            .value()
            .attr("href")
            .context("Listing link without an href")?;
        links.push(absolutize(page_url, href)?);
    }

    Ok(links)
}

/// Looks for the "next page" control and returns its absolute target URL.
/// Absence, a missing href and a malformed href all read as "no control".
pub fn find_next_page(document: &Html, page_url: &str) -> Option<String> {
    let selector = Selector::parse(NEXT_PAGE_SELECTOR).unwrap();
    let control = document.select(&selector).next()?;
    let href = control.value().attr("href")?;
    absolutize(page_url, href).ok()
}

/// Navigates to a listing's detail page and extracts one record. Required
/// fields fail the whole listing; the labeled numeric fields fall back to
/// empty strings.
pub fn scrape_listing<B: Browser>(browser: &mut B, url: &str) -> Result<Listing> {
    browser.goto(url, TITLE_SELECTOR)?;
    let document = browser.document();

    let title = required_text(document, TITLE_SELECTOR)?;
    let price = required_text(document, PRICE_SELECTOR)?;
    let description = required_text(document, DESCRIPTION_SELECTOR)?;
    // The location line reads "<city>, <district>"; only the city is kept.
    let city = required_text(document, LOCATION_SELECTOR)?
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();

    let floor = labeled_digits(document, FLOOR_LABEL);
    let height = labeled_digits(document, HEIGHT_LABEL);
    let area = labeled_digits(document, AREA_LABEL);

    Ok(Listing {
        title,
        price,
        description,
        url: url.to_string(),
        floor,
        height,
        area,
        city,
    })
}

/// Finds the first paragraph whose text contains `label` (case-insensitive)
/// and returns the first decimal digit run in it, or an empty string when no
/// paragraph matches.
pub fn labeled_digits(document: &Html, label: &str) -> String {
    let paragraphs = Selector::parse("p").unwrap();
    let digits = Regex::new(r"\d+").unwrap();

    for paragraph in document.select(&paragraphs) {
        let text = element_text(&paragraph);
        if text.to_lowercase().contains(label) {
            return digits
                .find(&text)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
        }
    }

    String::new()
}

fn required_text(document: &Html, selector_str: &str) -> Result<String> {
    let selector = Selector::parse(selector_str)
        .map_err(|e| anyhow::anyhow!("Failed to parse selector {:?}: {:?}", selector_str, e))?;
    let element = document
        .select(&selector)
        .next()
        .with_context(|| format!("Missing element {}", selector_str))?;
    Ok(element_text(&element))
}

fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn absolutize(page_url: &str, href: &str) -> Result<String> {
    if href.starts_with("http") {
        return Ok(href.to_string());
    }
    let base = Url::parse(page_url)
        .with_context(|| format!("Invalid page URL: {}", page_url))?;
    let joined = base
        .join(href)
        .with_context(|| format!("Invalid link target: {}", href))?;
    Ok(joined.to_string())
}
