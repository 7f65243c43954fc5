//! Source locator: finds the most recently dated spreadsheet link on the
//! portal's listing page.
//!
//! The listing is an HTML table where the second column carries a
//! day/month/year date and the third a download link. Rows that do not fit
//! that shape are skipped; only a listing with zero usable rows is an error.

use chrono::NaiveDate;
use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

use crate::config::SourceConfig;

/// Locator errors.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("listing page unavailable: {0}")]
    SourceUnavailable(#[source] reqwest::Error),

    #[error("no dated spreadsheet link found on listing page")]
    NoCandidate,

    #[error("invalid listing URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Determines the URL of the current source spreadsheet.
pub trait LocateSource {
    fn locate_latest(&self) -> Result<Url, SourceError>;
}

/// Scrapes the portal listing page over HTTP.
pub struct HtmlSourceLocator {
    client: reqwest::blocking::Client,
    listing_url: Url,
}

impl HtmlSourceLocator {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");
        let listing_url = Url::parse(&config.listing_url)?;
        Ok(Self {
            client,
            listing_url,
        })
    }
}

impl LocateSource for HtmlSourceLocator {
    /// One GET of the listing page, no retry at this layer.
    fn locate_latest(&self) -> Result<Url, SourceError> {
        let body = self
            .client
            .get(self.listing_url.clone())
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(SourceError::SourceUnavailable)?;

        latest_candidate(&body, &self.listing_url).ok_or(SourceError::NoCandidate)
    }
}

/// Pick the link belonging to the strictly greatest row date.
///
/// Ties keep the first-seen row. Relative hrefs resolve against `base`.
fn latest_candidate(html: &str, base: &Url) -> Option<Url> {
    let document = Html::parse_document(html);
    let row_sel = Selector::parse("tr").expect("static selector");
    let cell_sel = Selector::parse("td").expect("static selector");
    let link_sel = Selector::parse("a").expect("static selector");

    let mut best: Option<(NaiveDate, Url)> = None;
    for row in document.select(&row_sel) {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        if cells.len() < 3 {
            continue;
        }

        let date_text = cells[1].text().collect::<String>();
        let Ok(date) = NaiveDate::parse_from_str(date_text.trim(), "%d/%m/%Y") else {
            continue;
        };
        let Some(href) = cells[2]
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };
        let Ok(link) = base.join(href) else {
            continue;
        };

        match &best {
            Some((latest, _)) if date <= *latest => {}
            _ => best = Some((date, link)),
        }
    }

    best.map(|(_, link)| link)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.gov/modul/43").unwrap()
    }

    fn listing(rows: &str) -> String {
        format!("<html><body><table id=\"myTable\"><tbody>{rows}</tbody></table></body></html>")
    }

    #[test]
    fn test_picks_latest_date() {
        let html = listing(
            r#"
            <tr><td>1</td><td>14/01/2025</td><td><a href="/files/old.xlsx">old</a></td></tr>
            <tr><td>2</td><td>20/01/2025</td><td><a href="/files/new.xlsx">new</a></td></tr>
            "#,
        );
        let link = latest_candidate(&html, &base()).unwrap();
        assert_eq!(link.as_str(), "https://example.gov/files/new.xlsx");
    }

    #[test]
    fn test_tie_keeps_first_seen_row() {
        let html = listing(
            r#"
            <tr><td>1</td><td>20/01/2025</td><td><a href="/files/first.xlsx">a</a></td></tr>
            <tr><td>2</td><td>20/01/2025</td><td><a href="/files/second.xlsx">b</a></td></tr>
            "#,
        );
        let link = latest_candidate(&html, &base()).unwrap();
        assert_eq!(link.as_str(), "https://example.gov/files/first.xlsx");
    }

    #[test]
    fn test_skips_rows_with_bad_dates_or_missing_links() {
        let html = listing(
            r#"
            <tr><td>1</td><td>not a date</td><td><a href="/files/bad-date.xlsx">x</a></td></tr>
            <tr><td>2</td><td>14/01/2025</td><td>no link here</td></tr>
            <tr><td>3</td><td>10/01/2025</td><td><a href="/files/good.xlsx">ok</a></td></tr>
            <tr><td>too few cells</td></tr>
            "#,
        );
        let link = latest_candidate(&html, &base()).unwrap();
        assert_eq!(link.as_str(), "https://example.gov/files/good.xlsx");
    }

    #[test]
    fn test_absolute_href_is_kept() {
        let html = listing(
            r#"<tr><td>1</td><td>01/02/2025</td><td><a href="https://cdn.example.gov/x.xlsx">x</a></td></tr>"#,
        );
        let link = latest_candidate(&html, &base()).unwrap();
        assert_eq!(link.as_str(), "https://cdn.example.gov/x.xlsx");
    }

    #[test]
    fn test_no_candidate_on_empty_listing() {
        let html = listing("");
        assert!(latest_candidate(&html, &base()).is_none());
    }
}
