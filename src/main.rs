use std::collections::HashMap;
use std::fs;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::{error, info, warn};

use trending_tracker::config::Settings;
use trending_tracker::export;
use trending_tracker::extract::extract_repositories;
use trending_tracker::fetch::{PageCache, RateLimiter, TrendingClient};
use trending_tracker::notify;
use trending_tracker::report::{merge_record, TrendingSummary};
use trending_tracker::score::WeightTable;
use trending_tracker::store::TrendingStore;
use trending_tracker::types::RepoRecord;

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Batch run failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let settings = Settings::from_env();

    let limiter = RateLimiter::new(settings.rate_limit_calls, settings.rate_limit_period);
    let cache = PageCache::new(settings.cache_ttl);
    let mut client = TrendingClient::new(settings.github_token.clone(), limiter, cache)?;
    let store = TrendingStore::open(&settings.db_path, settings.cache_ttl)?;

    let table = WeightTable::listing();
    let mut collected: HashMap<String, RepoRecord> = HashMap::new();
    let mut successes = 0usize;
    let mut attempts = 0usize;

    for language in &settings.languages {
        for range in &settings.time_ranges {
            attempts += 1;
            info!("Fetching {} trending for {}", range, language);

            let url = TrendingClient::trending_url(Some(language.as_str()), *range);
            let body = match client.fetch_trending(Some(language.as_str()), *range) {
                Ok(body) => body,
                Err(e) => {
                    warn!("Skipping {}: {}", url, e);
                    continue;
                }
            };

            let records = match extract_repositories(&body, &url, Utc::now()) {
                Ok(records) => records,
                Err(e) => {
                    // Layout drift on one page must not sink the others.
                    warn!("Skipping {}: {}", url, e);
                    continue;
                }
            };

            successes += 1;
            info!("Extracted {} repositories from {}", records.len(), url);

            for mut record in records {
                record.activity_score = Some(table.score(&record));
                merge_record(&mut collected, record);
            }
        }
    }

    if successes == 0 {
        bail!("all {} trending fetches failed", attempts);
    }
    if collected.is_empty() {
        warn!("No trending repositories found across {} fetches", attempts);
        return Ok(());
    }

    let mut records: Vec<RepoRecord> = collected.into_values().collect();
    records.sort_by(|a, b| {
        b.activity_score
            .partial_cmp(&a.activity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.stars.cmp(&a.stars))
            .then(a.name.cmp(&b.name))
    });

    store.bulk_save(&records).context("Saving crawl batch")?;
    info!("Total unique repositories collected: {}", records.len());

    let today = Utc::now().date_naive();
    store
        .materialize_language_stats(today)
        .context("Materializing language statistics")?;

    let score_changes: HashMap<String, f64> = match store.latest_history_date_before(today)? {
        Some(previous) => store
            .activity_changes(None, previous, today, false, None)
            .context("Computing activity changes")?
            .into_iter()
            .map(|c| (c.repository_name, c.activity_change))
            .collect(),
        None => HashMap::new(),
    };

    let summary = TrendingSummary::build(&records);
    for insight in &summary.insights {
        info!("{}", insight);
    }

    fs::create_dir_all(&settings.report_dir).context("Creating report directory")?;
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let csv_path = settings.report_dir.join(format!("github_trending_{}.csv", timestamp));
    let html_path = settings.report_dir.join(format!("github_trending_{}.html", timestamp));
    export::write_csv(&csv_path, &records)?;
    export::write_html(&html_path, &summary, &records)?;

    let subject = format!("GitHub Trending Report - {}", today);
    let digest = summary.insights.join("\n");
    let report_html = notify::build_report_html(&records, &score_changes);
    if let Err(e) = notify::send_notifications(&settings.channels, &subject, &digest, &report_html) {
        warn!("Notification delivery failed: {}", e);
    }

    Ok(())
}
