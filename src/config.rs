//! Environment-style settings for a batch run.
//!
//! Everything has a sensible default so an unconfigured run crawls the
//! default language set into `data/github_trending.db`.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::notify::Channels;
use crate::types::TimeRange;

const DEFAULT_LANGUAGES: &[&str] = &["python", "java", "javascript", "go", "rust"];
const DEFAULT_DB_PATH: &str = "data/github_trending.db";
const DEFAULT_REPORT_DIR: &str = "reports";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_RATE_LIMIT_CALLS: u32 = 30;
const DEFAULT_RATE_LIMIT_PERIOD_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Optional token for authenticated (higher rate limit) fetches.
    pub github_token: Option<String>,
    pub languages: Vec<String>,
    pub time_ranges: Vec<TimeRange>,
    pub db_path: PathBuf,
    pub report_dir: PathBuf,
    /// Notification webhook endpoints; empty means log-only delivery.
    pub channels: Channels,
    pub cache_ttl: Duration,
    pub rate_limit_calls: u32,
    pub rate_limit_period: Duration,
}

impl Settings {
    pub fn from_env() -> Self {
        let languages = env::var("TRENDING_LANGUAGES")
            .ok()
            .map(|raw| parse_list(&raw))
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect());

        let time_ranges = env::var("TRENDING_SINCE")
            .ok()
            .map(|raw| {
                parse_list(&raw)
                    .iter()
                    .filter_map(|s| TimeRange::parse(s))
                    .collect::<Vec<_>>()
            })
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| vec![TimeRange::Daily]);

        Self {
            github_token: non_empty_env("GITHUB_TOKEN"),
            languages,
            time_ranges,
            db_path: env::var("DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH)),
            report_dir: env::var("REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_REPORT_DIR)),
            channels: Channels {
                slack_webhook: non_empty_env("SLACK_WEBHOOK_URL"),
                discord_webhook: non_empty_env("DISCORD_WEBHOOK_URL"),
                report_webhook: non_empty_env("REPORT_WEBHOOK_URL"),
            },
            cache_ttl: Duration::from_secs(parse_env_u64(
                "CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )),
            rate_limit_calls: parse_env_u64("RATE_LIMIT_CALLS", DEFAULT_RATE_LIMIT_CALLS as u64)
                as u32,
            rate_limit_period: Duration::from_secs(parse_env_u64(
                "RATE_LIMIT_PERIOD_SECS",
                DEFAULT_RATE_LIMIT_PERIOD_SECS,
            )),
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
