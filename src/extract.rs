//! Trending page extraction.
//!
//! Turns raw trending-page markup into an ordered list of repository
//! records. Page order is GitHub's trending rank and is preserved exactly;
//! downstream rankings rely on it for tie-breaking.
//!
//! Two failure shapes are kept apart on purpose:
//! - a page with zero entries but the empty-state marker is a *valid* empty
//!   result (GitHub legitimately shows no trending repos sometimes);
//! - a page yielding zero valid records without that marker means the layout
//!   changed underneath us and callers should alert on it.

use chrono::{DateTime, Utc};
use log::warn;
use scraper::{ElementRef, Html, Selector};

use crate::error::TrackerError;
use crate::numbers::parse_count;
use crate::types::RepoRecord;

const ENTRY_SELECTOR: &str = "article.Box-row";
const NAME_SELECTOR: &str = "h2 a";
const DESCRIPTION_SELECTOR: &str = "p";
const LANGUAGE_SELECTOR: &str = "[itemprop=\"programmingLanguage\"]";
const STARS_SELECTOR: &str = "a[href$=\"/stargazers\"]";
const FORKS_SELECTOR: &str = "a[href$=\"/forks\"]";
const TODAY_STARS_SELECTOR: &str = "span.d-inline-block.float-sm-right";
const EMPTY_STATE_SELECTOR: &str = ".blankslate";

/// Extract repository records from a trending page, in page order.
///
/// Entries without an identifiable name anchor are skipped with a warning;
/// one bad entry never aborts the batch. A result set that ends up empty
/// without the page carrying GitHub's empty-state marker is surfaced as
/// [`TrackerError::LayoutDrift`].
pub fn extract_repositories(
    html: &str,
    page_url: &str,
    crawled_at: DateTime<Utc>,
) -> Result<Vec<RepoRecord>, TrackerError> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();

    if let Ok(entry_sel) = Selector::parse(ENTRY_SELECTOR) {
        for entry in document.select(&entry_sel) {
            match extract_entry(&entry, crawled_at) {
                Some(record) => records.push(record),
                None => warn!("Skipping trending entry without a name anchor on {}", page_url),
            }
        }
    }

    if records.is_empty() {
        if has_empty_state(&document) {
            return Ok(records);
        }
        return Err(TrackerError::layout_drift(page_url));
    }

    Ok(records)
}

fn extract_entry(entry: &ElementRef<'_>, crawled_at: DateTime<Utc>) -> Option<RepoRecord> {
    let name = extract_name(entry)?;
    let mut record = RepoRecord::new(name, crawled_at);

    record.description = select_text(entry, DESCRIPTION_SELECTOR);
    record.language = select_text(entry, LANGUAGE_SELECTOR);
    record.stars = select_count(entry, STARS_SELECTOR);
    record.forks = select_count(entry, FORKS_SELECTOR);
    record.today_stars = extract_today_stars(entry);

    Some(record)
}

/// The repository identity comes from the heading anchor's href,
/// e.g. `/rust-lang/rust` -> `rust-lang/rust`.
fn extract_name(entry: &ElementRef<'_>) -> Option<String> {
    let sel = Selector::parse(NAME_SELECTOR).ok()?;
    let anchor = entry.select(&sel).next()?;
    let href = anchor.value().attr("href")?;
    let name = href.trim().trim_matches('/').to_string();
    if name.is_empty() || !name.contains('/') {
        return None;
    }
    Some(name)
}

fn select_text(entry: &ElementRef<'_>, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let element = entry.select(&sel).next()?;
    let text = element.text().collect::<String>().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn select_count(entry: &ElementRef<'_>, selector: &str) -> i64 {
    select_text(entry, selector).map(|t| parse_count(&t)).unwrap_or(0)
}

/// The today-stars cell reads like "1,047 stars today"; only the leading
/// numeric token is a count.
fn extract_today_stars(entry: &ElementRef<'_>) -> i64 {
    select_text(entry, TODAY_STARS_SELECTOR)
        .and_then(|t| t.split_whitespace().next().map(parse_count))
        .unwrap_or(0)
}

fn has_empty_state(document: &Html) -> bool {
    match Selector::parse(EMPTY_STATE_SELECTOR) {
        Ok(sel) => document.select(&sel).next().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_html(name: &str, description: &str, language: &str, stars: &str, forks: &str, today: &str) -> String {
        format!(
            r#"<article class="Box-row">
                 <h2 class="h3"><a href="/{name}">{name}</a></h2>
                 <p class="col-9">{description}</p>
                 <span itemprop="programmingLanguage">{language}</span>
                 <a href="/{name}/stargazers">{stars}</a>
                 <a href="/{name}/forks">{forks}</a>
                 <span class="d-inline-block float-sm-right">{today} stars today</span>
               </article>"#
        )
    }

    fn page(entries: &[String]) -> String {
        format!("<html><body><div class=\"Box\">{}</div></body></html>", entries.join("\n"))
    }

    #[test]
    fn extracts_fields_in_page_order() {
        let html = page(&[
            entry_html("alpha/first", "An API framework for things", "Rust", "12.4k", "1,047", "312"),
            entry_html("beta/second", "", "", "950", "80", "42"),
            entry_html("gamma/third", "A tool", "Python", "3m", "5k", "1.2k"),
        ]);

        let records = extract_repositories(&html, "https://github.com/trending", Utc::now()).unwrap();
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["alpha/first", "beta/second", "gamma/third"]);

        let first = &records[0];
        assert_eq!(first.url, "https://github.com/alpha/first");
        assert_eq!(first.description.as_deref(), Some("An API framework for things"));
        assert_eq!(first.language.as_deref(), Some("Rust"));
        assert_eq!(first.stars, 12_400);
        assert_eq!(first.forks, 1_047);
        assert_eq!(first.today_stars, 312);

        // Empty description and language become None, not empty strings.
        assert_eq!(records[1].description, None);
        assert_eq!(records[1].language, None);

        assert_eq!(records[2].stars, 3_000_000);
        assert_eq!(records[2].today_stars, 1_200);
    }

    #[test]
    fn skips_entry_without_name_anchor() {
        let broken = r#"<article class="Box-row"><p>orphaned description</p></article>"#.to_string();
        let html = page(&[
            entry_html("alpha/first", "desc long enough here", "Go", "100", "10", "5"),
            broken,
            entry_html("beta/second", "other description", "Rust", "200", "20", "7"),
        ]);

        let records = extract_repositories(&html, "https://github.com/trending", Utc::now()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "alpha/first");
        assert_eq!(records[1].name, "beta/second");
    }

    #[test]
    fn empty_page_with_blankslate_is_valid() {
        let html = r#"<html><body>
            <div class="blankslate"><h3>Trending repositories are currently unavailable.</h3></div>
        </body></html>"#;
        let records = extract_repositories(html, "https://github.com/trending/zig", Utc::now()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn empty_page_without_marker_is_layout_drift() {
        let html = "<html><body><div class=\"totally-new-layout\"></div></body></html>";
        let err = extract_repositories(html, "https://github.com/trending", Utc::now()).unwrap_err();
        assert!(err.is_layout_drift());
    }

    #[test]
    fn all_entries_invalid_is_layout_drift() {
        let broken = r#"<article class="Box-row"><h2><a href="/">no name</a></h2></article>"#.to_string();
        let html = page(&[broken.clone(), broken]);
        let err = extract_repositories(&html, "https://github.com/trending", Utc::now()).unwrap_err();
        assert!(err.is_layout_drift());
    }

    #[test]
    fn every_record_has_name_and_url() {
        let html = page(&[entry_html("a/b", "d", "C++", "1", "2", "3")]);
        let records = extract_repositories(&html, "u", Utc::now()).unwrap();
        assert!(records.iter().all(|r| !r.name.is_empty() && !r.url.is_empty()));
    }
}
