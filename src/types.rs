use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One crawled snapshot of a repository at a point in time.
///
/// Counters are non-negative by construction (the count parser never
/// produces negatives); `activity_score` stays in [0, 100] once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRecord {
    /// `owner/repo` identity, unique per crawl timestamp.
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stars: i64,
    pub forks: i64,
    pub today_stars: i64,
    #[serde(default)]
    pub open_issues: i64,
    #[serde(default)]
    pub watchers: i64,
    #[serde(default)]
    pub contributors_count: i64,
    #[serde(default)]
    pub recent_commits: i64,
    #[serde(default)]
    pub activity_score: Option<f64>,
    pub crawled_at: DateTime<Utc>,
}

impl RepoRecord {
    pub fn new(name: String, crawled_at: DateTime<Utc>) -> Self {
        let url = format!("https://github.com/{}", name);
        Self {
            name,
            url,
            description: None,
            language: None,
            stars: 0,
            forks: 0,
            today_stars: 0,
            open_issues: 0,
            watchers: 0,
            contributors_count: 0,
            recent_commits: 0,
            activity_score: None,
            crawled_at,
        }
    }
}

/// Trending page time window, maps to the `since` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    Daily,
    Weekly,
    Monthly,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Daily => "daily",
            TimeRange::Weekly => "weekly",
            TimeRange::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Some(TimeRange::Daily),
            "weekly" => Some(TimeRange::Weekly),
            "monthly" => Some(TimeRange::Monthly),
            _ => None,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filters for the "top N trending now" query.
#[derive(Debug, Clone, Default)]
pub struct TrendingFilter {
    pub language: Option<String>,
    pub min_stars: Option<i64>,
    pub min_activity: Option<f64>,
    /// 0 means the default limit of 20.
    pub limit: usize,
}

impl TrendingFilter {
    pub fn limit_or_default(&self) -> usize {
        if self.limit == 0 {
            20
        } else {
            self.limit
        }
    }
}

/// Daily aggregate per language, recomputable from repository snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageStat {
    pub language: String,
    pub repository_count: i64,
    pub total_stars: i64,
    pub total_forks: i64,
    pub average_activity_score: f64,
    pub date: NaiveDate,
}

/// Derived comparison between two snapshots of the same repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityChange {
    pub repository_name: String,
    pub activity_change: f64,
    pub stars_change: i64,
    pub forks_change: i64,
    pub issues_change: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
