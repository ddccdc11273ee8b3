//! Report assembly.
//!
//! Folds scored repository records into the aggregate structure the exporters
//! and notifiers consume. Read-only: no I/O happens here.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::RepoRecord;

const TOP_N: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct LanguageRollup {
    pub language: String,
    pub repos: usize,
    pub total_stars: i64,
    pub total_forks: i64,
    pub avg_activity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendingSummary {
    pub total_repositories: usize,
    pub total_stars: i64,
    pub total_forks: i64,
    pub average_activity_score: f64,
    pub min_activity: f64,
    pub max_activity: f64,
    /// Rollups sorted by repository count descending.
    pub languages: Vec<LanguageRollup>,
    pub most_starred: Vec<RepoRecord>,
    pub most_forked: Vec<RepoRecord>,
    pub trending_today: Vec<RepoRecord>,
    pub insights: Vec<String>,
}

impl TrendingSummary {
    pub fn build(repos: &[RepoRecord]) -> Self {
        let total_repositories = repos.len();
        let total_stars: i64 = repos.iter().map(|r| r.stars).sum();
        let total_forks: i64 = repos.iter().map(|r| r.forks).sum();

        let scores: Vec<f64> = repos.iter().map(score_of).collect();
        let average_activity_score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };
        let min_activity = scores.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_activity = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let (min_activity, max_activity) = if scores.is_empty() {
            (0.0, 0.0)
        } else {
            (min_activity, max_activity)
        };

        let languages = language_rollups(repos);
        let insights = build_insights(total_repositories, &languages, min_activity, max_activity);

        Self {
            total_repositories,
            total_stars,
            total_forks,
            average_activity_score,
            min_activity,
            max_activity,
            languages,
            most_starred: top_by(repos, |r| r.stars),
            most_forked: top_by(repos, |r| r.forks),
            trending_today: top_by(repos, |r| r.today_stars),
            insights,
        }
    }
}

fn score_of(repo: &RepoRecord) -> f64 {
    repo.activity_score.unwrap_or(0.0)
}

/// Cross-fetch dedupe by name: the same repository can appear under several
/// languages or time ranges in one run. Keep the snapshot with the higher
/// activity score; ties keep the first occurrence.
pub fn merge_record(collected: &mut HashMap<String, RepoRecord>, record: RepoRecord) {
    match collected.get(&record.name) {
        Some(existing)
            if existing.activity_score.unwrap_or(0.0) >= record.activity_score.unwrap_or(0.0) => {}
        _ => {
            collected.insert(record.name.clone(), record);
        }
    }
}

/// Top-5 by a metric. The sort is stable, so repositories tied on the metric
/// keep their input (trending rank) order.
fn top_by(repos: &[RepoRecord], metric: impl Fn(&RepoRecord) -> i64) -> Vec<RepoRecord> {
    let mut sorted: Vec<RepoRecord> = repos.to_vec();
    sorted.sort_by_key(|r| std::cmp::Reverse(metric(r)));
    sorted.truncate(TOP_N);
    sorted
}

fn language_rollups(repos: &[RepoRecord]) -> Vec<LanguageRollup> {
    let mut rollups: Vec<LanguageRollup> = Vec::new();

    for repo in repos {
        let language = repo.language.as_deref().unwrap_or("Unknown");
        let idx = match rollups.iter().position(|r| r.language == language) {
            Some(idx) => idx,
            None => {
                rollups.push(LanguageRollup {
                    language: language.to_string(),
                    repos: 0,
                    total_stars: 0,
                    total_forks: 0,
                    avg_activity: 0.0,
                });
                rollups.len() - 1
            }
        };
        let rollup = &mut rollups[idx];

        rollup.repos += 1;
        rollup.total_stars += repo.stars;
        rollup.total_forks += repo.forks;
        // Running average after the k-th item: (avg * (k-1) + x) / k.
        let k = rollup.repos as f64;
        rollup.avg_activity = (rollup.avg_activity * (k - 1.0) + score_of(repo)) / k;
    }

    rollups.sort_by(|a, b| b.repos.cmp(&a.repos).then(a.language.cmp(&b.language)));
    rollups
}

fn build_insights(
    total: usize,
    languages: &[LanguageRollup],
    min_activity: f64,
    max_activity: f64,
) -> Vec<String> {
    let mut insights = Vec::new();
    insights.push(format!("Analyzed {} trending repositories", total));

    if !languages.is_empty() {
        let top = languages
            .iter()
            .take(3)
            .map(|l| format!("{} ({} repos)", l.language, l.repos))
            .collect::<Vec<_>>()
            .join(", ");
        insights.push(format!("Top languages: {}", top));
    }

    insights.push(format!(
        "Activity scores range from {:.2} to {:.2}",
        min_activity, max_activity
    ));
    insights
}
