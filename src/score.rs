//! Activity scoring.
//!
//! A repository's activity score is a weighted sum of normalized raw metrics,
//! scaled to [0, 100]. Two weight tables exist: the `listing` table works on
//! the fields a trending page exposes, the `full_metrics` table applies once
//! enriched metadata (issues, watchers, contributors, commits) is available.
//! Both go through the same normalize-and-sum path; the scorer is a pure
//! function with no I/O and no randomness.

use crate::types::RepoRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Stars,
    Forks,
    TodayStars,
    LanguagePopularity,
    DescriptionQuality,
    OpenIssues,
    Watchers,
    Contributors,
    RecentCommits,
}

#[derive(Debug, Clone, Copy)]
struct WeightEntry {
    metric: Metric,
    weight: f64,
    cap: f64,
}

/// Mapping of metric -> (weight, cap). Weights in a preset sum to 1.0.
#[derive(Debug, Clone)]
pub struct WeightTable {
    entries: Vec<WeightEntry>,
}

impl WeightTable {
    /// Canonical table for listing-page data. This is what the crawl batch
    /// applies, since a trending page never exposes issue or commit counts.
    pub fn listing() -> Self {
        Self {
            entries: vec![
                WeightEntry { metric: Metric::Stars, weight: 0.3, cap: 10_000.0 },
                WeightEntry { metric: Metric::Forks, weight: 0.2, cap: 5_000.0 },
                WeightEntry { metric: Metric::TodayStars, weight: 0.2, cap: 1_000.0 },
                WeightEntry { metric: Metric::LanguagePopularity, weight: 0.15, cap: 1.0 },
                WeightEntry { metric: Metric::DescriptionQuality, weight: 0.15, cap: 1.0 },
            ],
        }
    }

    /// Table for rows carrying the full metadata set; used when rescoring
    /// stored repositories after enrichment.
    pub fn full_metrics() -> Self {
        Self {
            entries: vec![
                WeightEntry { metric: Metric::Stars, weight: 0.3, cap: 10_000.0 },
                WeightEntry { metric: Metric::Forks, weight: 0.2, cap: 5_000.0 },
                WeightEntry { metric: Metric::OpenIssues, weight: 0.1, cap: 1_000.0 },
                WeightEntry { metric: Metric::Watchers, weight: 0.1, cap: 10_000.0 },
                WeightEntry { metric: Metric::Contributors, weight: 0.15, cap: 100.0 },
                WeightEntry { metric: Metric::RecentCommits, weight: 0.15, cap: 1_000.0 },
            ],
        }
    }

    /// Compute the activity score for one repository, in [0, 100],
    /// rounded to two decimals.
    pub fn score(&self, repo: &RepoRecord) -> f64 {
        let total: f64 = self
            .entries
            .iter()
            .map(|e| normalize(raw_value(repo, e.metric), e.cap) * e.weight)
            .sum();
        round2(total * 100.0)
    }
}

/// Normalize a raw metric into [0, 1]. A zero or negative cap normalizes
/// to 0 rather than dividing by it.
fn normalize(value: f64, cap: f64) -> f64 {
    if cap <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    (value / cap).clamp(0.0, 1.0)
}

fn raw_value(repo: &RepoRecord, metric: Metric) -> f64 {
    match metric {
        Metric::Stars => repo.stars as f64,
        Metric::Forks => repo.forks as f64,
        Metric::TodayStars => repo.today_stars as f64,
        Metric::LanguagePopularity => language_popularity(repo.language.as_deref()),
        Metric::DescriptionQuality => description_quality(repo.description.as_deref()),
        Metric::OpenIssues => repo.open_issues as f64,
        Metric::Watchers => repo.watchers as f64,
        Metric::Contributors => repo.contributors_count as f64,
        Metric::RecentCommits => repo.recent_commits as f64,
    }
}

/// Fixed popularity lookup, case-insensitive; unlisted languages score 0.5.
pub fn language_popularity(language: Option<&str>) -> f64 {
    let language = match language {
        Some(l) => l.to_lowercase(),
        None => return 0.5,
    };
    match language.as_str() {
        "python" | "javascript" => 1.0,
        "java" | "go" | "typescript" => 0.9,
        "rust" | "c++" => 0.8,
        "ruby" => 0.7,
        _ => 0.5,
    }
}

/// Rough description quality in [0, 1]: length thresholds plus a bonus for
/// keywords that suggest a reusable project. Empty or absent scores 0.
pub fn description_quality(description: Option<&str>) -> f64 {
    let description = match description {
        Some(d) if !d.is_empty() => d,
        _ => return 0.0,
    };

    let mut quality: f64 = 0.0;
    if description.len() >= 20 {
        quality += 0.5;
    }
    if description.len() >= 50 {
        quality += 0.3;
    }
    let lower = description.to_lowercase();
    if ["api", "framework", "library", "tool"].iter().any(|kw| lower.contains(kw)) {
        quality += 0.2;
    }

    quality.min(1.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
