//! SQLite persistence and diff layer.
//!
//! Repository snapshots are the source of truth; `language_stats` and
//! `activity_changes` are materialized views recomputable from the snapshot
//! and history tables. Every crawl batch commits atomically, and any commit
//! clears the read-query cache; a read must never see state older than a
//! committed write.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use rusqlite::{params, params_from_iter, types::Value, Connection, Row};

use crate::error::TrackerError;
use crate::score::WeightTable;
use crate::types::{ActivityChange, LanguageStat, RepoRecord, TrendingFilter};

const REPO_COLUMNS: &str = "name, url, description, language, stars, forks, today_stars, \
     open_issues, watchers, contributors_count, recent_commits, activity_score, crawled_at";

/// TTL cache in front of the read queries. Cleared on every committed write.
struct QueryCache {
    ttl: Duration,
    trending: HashMap<String, (Instant, Vec<RepoRecord>)>,
    languages: HashMap<String, (Instant, Vec<LanguageStat>)>,
}

impl QueryCache {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            trending: HashMap::new(),
            languages: HashMap::new(),
        }
    }

    fn fresh<'a, T>(&self, entry: Option<&'a (Instant, T)>) -> Option<&'a T> {
        match entry {
            Some((stored, value)) if stored.elapsed() < self.ttl => Some(value),
            _ => None,
        }
    }

    fn clear(&mut self) {
        self.trending.clear();
        self.languages.clear();
    }
}

pub struct TrendingStore {
    conn: Mutex<Connection>,
    cache: Mutex<QueryCache>,
}

impl TrendingStore {
    /// Open (or create) the database file and initialize the schema.
    pub fn open(path: &Path, cache_ttl: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;
        Self::with_connection(conn, cache_ttl)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory(cache_ttl: Duration) -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn, cache_ttl)
    }

    fn with_connection(conn: Connection, cache_ttl: Duration) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            cache: Mutex::new(QueryCache::new(cache_ttl)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS repositories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                url TEXT NOT NULL,
                description TEXT,
                language TEXT,
                stars INTEGER DEFAULT 0,
                forks INTEGER DEFAULT 0,
                today_stars INTEGER DEFAULT 0,
                open_issues INTEGER DEFAULT 0,
                watchers INTEGER DEFAULT 0,
                contributors_count INTEGER DEFAULT 0,
                recent_commits INTEGER DEFAULT 0,
                activity_score REAL,
                crawled_at TEXT NOT NULL,
                UNIQUE(name, crawled_at)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS trending_history (
                id INTEGER PRIMARY KEY,
                repository_name TEXT NOT NULL,
                activity_score REAL DEFAULT 0.0,
                stars INTEGER DEFAULT 0,
                forks INTEGER DEFAULT 0,
                open_issues INTEGER DEFAULT 0,
                watchers INTEGER DEFAULT 0,
                contributors_count INTEGER DEFAULT 0,
                date TEXT NOT NULL,
                UNIQUE(repository_name, date)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS language_stats (
                id INTEGER PRIMARY KEY,
                language TEXT NOT NULL,
                repository_count INTEGER DEFAULT 0,
                total_stars INTEGER DEFAULT 0,
                total_forks INTEGER DEFAULT 0,
                average_activity_score REAL DEFAULT 0.0,
                date TEXT NOT NULL,
                UNIQUE(language, date)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS activity_changes (
                id INTEGER PRIMARY KEY,
                repository_name TEXT NOT NULL,
                activity_change REAL DEFAULT 0.0,
                stars_change INTEGER DEFAULT 0,
                forks_change INTEGER DEFAULT 0,
                issues_change INTEGER DEFAULT 0,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                UNIQUE(repository_name, start_date, end_date)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_repo_name ON repositories(name)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_history_date ON trending_history(date)",
            [],
        )?;

        Ok(())
    }

    /// Save one crawl batch atomically.
    ///
    /// A record matching an existing row by name within the same crawl day
    /// updates that row field by field; anything else inserts. History rows
    /// keyed (name, date) are written alongside. Any failure rolls back the
    /// whole batch.
    pub fn bulk_save(&self, records: &[RepoRecord]) -> Result<(), TrackerError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        for record in records {
            let crawl_day = record.crawled_at.date_naive().to_string();

            let updated = tx.execute(
                "UPDATE repositories SET
                    url = ?3, description = ?4, language = ?5, stars = ?6, forks = ?7,
                    today_stars = ?8, open_issues = ?9, watchers = ?10,
                    contributors_count = ?11, recent_commits = ?12, activity_score = ?13,
                    crawled_at = ?14
                 WHERE name = ?1 AND date(crawled_at) = ?2",
                params![
                    record.name,
                    crawl_day,
                    record.url,
                    record.description,
                    record.language,
                    record.stars,
                    record.forks,
                    record.today_stars,
                    record.open_issues,
                    record.watchers,
                    record.contributors_count,
                    record.recent_commits,
                    record.activity_score,
                    record.crawled_at.to_rfc3339(),
                ],
            )?;

            if updated == 0 {
                tx.execute(
                    &format!(
                        "INSERT INTO repositories ({}) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                        REPO_COLUMNS
                    ),
                    params![
                        record.name,
                        record.url,
                        record.description,
                        record.language,
                        record.stars,
                        record.forks,
                        record.today_stars,
                        record.open_issues,
                        record.watchers,
                        record.contributors_count,
                        record.recent_commits,
                        record.activity_score,
                        record.crawled_at.to_rfc3339(),
                    ],
                )?;
            }

            tx.execute(
                "INSERT OR REPLACE INTO trending_history
                    (repository_name, activity_score, stars, forks, open_issues,
                     watchers, contributors_count, date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.name,
                    record.activity_score.unwrap_or(0.0),
                    record.stars,
                    record.forks,
                    record.open_issues,
                    record.watchers,
                    record.contributors_count,
                    crawl_day,
                ],
            )?;
        }

        tx.commit()?;
        self.cache.lock().unwrap().clear();
        info!("Bulk saved {} repositories", records.len());
        Ok(())
    }

    /// Recompute the activity score of every stored snapshot with the given
    /// weight table. Used after enriched metadata has been filled in.
    pub fn update_activity_scores(&self, table: &WeightTable) -> Result<usize, TrackerError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut rescored = 0;

        {
            let mut stmt = tx.prepare(&format!("SELECT id, {} FROM repositories", REPO_COLUMNS))?;
            let rows = stmt.query_map([], |row| {
                let id: i64 = row.get(0)?;
                Ok((id, row_to_record_offset(row, 1)?))
            })?;

            let mut updates = Vec::new();
            for row in rows {
                let (id, record) = row?;
                updates.push((id, table.score(&record)));
            }

            for (id, score) in updates {
                tx.execute(
                    "UPDATE repositories SET activity_score = ?1 WHERE id = ?2",
                    params![score, id],
                )?;
                rescored += 1;
            }
        }

        tx.commit()?;
        self.cache.lock().unwrap().clear();
        info!("Updated activity scores for {} repositories", rescored);
        Ok(rescored)
    }

    /// Top trending repositories from the latest snapshot of each name.
    ///
    /// Ordered by activity score descending, tie-broken by stars descending
    /// then name ascending so repeated calls are deterministic.
    pub fn trending_repositories(
        &self,
        filter: &TrendingFilter,
    ) -> Result<Vec<RepoRecord>, TrackerError> {
        let key = format!(
            "{:?}|{:?}|{:?}|{}",
            filter.language,
            filter.min_stars,
            filter.min_activity,
            filter.limit_or_default()
        );
        {
            let cache = self.cache.lock().unwrap();
            if let Some(hit) = cache.fresh(cache.trending.get(&key)) {
                return Ok(hit.clone());
            }
        }

        let mut sql = format!(
            "SELECT {} FROM repositories
             WHERE crawled_at = (SELECT MAX(r2.crawled_at) FROM repositories r2
                                 WHERE r2.name = repositories.name)",
            REPO_COLUMNS
        );
        let mut values: Vec<Value> = Vec::new();

        if let Some(ref language) = filter.language {
            values.push(Value::Text(language.clone()));
            sql.push_str(&format!(" AND language = ?{}", values.len()));
        }
        if let Some(min_stars) = filter.min_stars {
            values.push(Value::Integer(min_stars));
            sql.push_str(&format!(" AND stars >= ?{}", values.len()));
        }
        if let Some(min_activity) = filter.min_activity {
            values.push(Value::Real(min_activity));
            sql.push_str(&format!(" AND activity_score >= ?{}", values.len()));
        }

        values.push(Value::Integer(filter.limit_or_default() as i64));
        sql.push_str(&format!(
            " ORDER BY activity_score DESC, stars DESC, name ASC LIMIT ?{}",
            values.len()
        ));

        let results = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
                row_to_record_offset(row, 0)
            })?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };

        self.cache
            .lock()
            .unwrap()
            .trending
            .insert(key, (Instant::now(), results.clone()));
        Ok(results)
    }

    /// Aggregate the latest snapshot per language and persist the result as
    /// that day's `language_stats` rows. Recomputable at any time.
    pub fn materialize_language_stats(&self, date: NaiveDate) -> Result<usize, TrackerError> {
        let stats = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT language, COUNT(*), SUM(stars), SUM(forks),
                        AVG(COALESCE(activity_score, 0.0))
                 FROM repositories
                 WHERE language IS NOT NULL
                   AND crawled_at = (SELECT MAX(r2.crawled_at) FROM repositories r2
                                     WHERE r2.name = repositories.name)
                 GROUP BY language",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(LanguageStat {
                    language: row.get(0)?,
                    repository_count: row.get(1)?,
                    total_stars: row.get(2)?,
                    total_forks: row.get(3)?,
                    average_activity_score: row.get(4)?,
                    date,
                })
            })?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for stat in &stats {
            tx.execute(
                "INSERT OR REPLACE INTO language_stats
                    (language, repository_count, total_stars, total_forks,
                     average_activity_score, date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    stat.language,
                    stat.repository_count,
                    stat.total_stars,
                    stat.total_forks,
                    stat.average_activity_score,
                    date.to_string(),
                ],
            )?;
        }
        tx.commit()?;
        self.cache.lock().unwrap().clear();
        Ok(stats.len())
    }

    /// Language statistics ordered by average activity descending.
    pub fn language_statistics(
        &self,
        min_repos: Option<i64>,
        min_stars: Option<i64>,
    ) -> Result<Vec<LanguageStat>, TrackerError> {
        let key = format!("{:?}|{:?}", min_repos, min_stars);
        {
            let cache = self.cache.lock().unwrap();
            if let Some(hit) = cache.fresh(cache.languages.get(&key)) {
                return Ok(hit.clone());
            }
        }

        let mut sql = String::from(
            "SELECT language, repository_count, total_stars, total_forks,
                    average_activity_score, date
             FROM language_stats
             WHERE date = (SELECT MAX(date) FROM language_stats)",
        );
        let mut values: Vec<Value> = Vec::new();

        if let Some(min_repos) = min_repos {
            values.push(Value::Integer(min_repos));
            sql.push_str(&format!(" AND repository_count >= ?{}", values.len()));
        }
        if let Some(min_stars) = min_stars {
            values.push(Value::Integer(min_stars));
            sql.push_str(&format!(" AND total_stars >= ?{}", values.len()));
        }
        sql.push_str(" ORDER BY average_activity_score DESC");

        let results = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
                let date: String = row.get(5)?;
                Ok(LanguageStat {
                    language: row.get(0)?,
                    repository_count: row.get(1)?,
                    total_stars: row.get(2)?,
                    total_forks: row.get(3)?,
                    average_activity_score: row.get(4)?,
                    date: date.parse().unwrap_or_default(),
                })
            })?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };

        self.cache
            .lock()
            .unwrap()
            .languages
            .insert(key, (Instant::now(), results.clone()));
        Ok(results)
    }

    /// Per-repository metric deltas between the history rows of two dates,
    /// for one repository or across all of them, ordered by activity change
    /// descending. Results are materialized into the `activity_changes`
    /// table keyed (name, start, end).
    pub fn activity_changes(
        &self,
        repository: Option<&str>,
        start: NaiveDate,
        end: NaiveDate,
        positive_only: bool,
        min_change: Option<f64>,
    ) -> Result<Vec<ActivityChange>, TrackerError> {
        let mut sql = String::from(
            "SELECT a.repository_name,
                    b.activity_score - a.activity_score,
                    b.stars - a.stars,
                    b.forks - a.forks,
                    b.open_issues - a.open_issues
             FROM trending_history a
             JOIN trending_history b ON a.repository_name = b.repository_name
             WHERE a.date = ?1 AND b.date = ?2",
        );
        let mut values: Vec<Value> = vec![
            Value::Text(start.to_string()),
            Value::Text(end.to_string()),
        ];
        if let Some(name) = repository {
            values.push(Value::Text(name.to_string()));
            sql.push_str(&format!(" AND a.repository_name = ?{}", values.len()));
        }
        sql.push_str(" ORDER BY b.activity_score - a.activity_score DESC");

        let changes = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
                Ok(ActivityChange {
                    repository_name: row.get(0)?,
                    activity_change: row.get(1)?,
                    stars_change: row.get(2)?,
                    forks_change: row.get(3)?,
                    issues_change: row.get(4)?,
                    start_date: start,
                    end_date: end,
                })
            })?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };

        let changes: Vec<ActivityChange> = changes
            .into_iter()
            .filter(|c| !positive_only || c.activity_change > 0.0)
            .filter(|c| min_change.map_or(true, |m| c.activity_change >= m))
            .collect();

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for change in &changes {
            tx.execute(
                "INSERT OR REPLACE INTO activity_changes
                    (repository_name, activity_change, stars_change, forks_change,
                     issues_change, start_date, end_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    change.repository_name,
                    change.activity_change,
                    change.stars_change,
                    change.forks_change,
                    change.issues_change,
                    start.to_string(),
                    end.to_string(),
                ],
            )?;
        }
        tx.commit()?;

        Ok(changes)
    }

    /// Most recent history date strictly before `date`, if any. The batch
    /// driver uses this to pick the comparison baseline for activity changes.
    pub fn latest_history_date_before(
        &self,
        date: NaiveDate,
    ) -> Result<Option<NaiveDate>, TrackerError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT MAX(date) FROM trending_history WHERE date < ?1")?;
        let result: Option<String> = stmt.query_row(params![date.to_string()], |row| row.get(0))?;
        Ok(result.and_then(|s| s.parse().ok()))
    }

    /// Total stored snapshot rows.
    pub fn snapshot_count(&self) -> Result<i64, TrackerError> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row("SELECT COUNT(*) FROM repositories", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn row_to_record_offset(row: &Row<'_>, offset: usize) -> rusqlite::Result<RepoRecord> {
    let crawled_at: String = row.get(offset + 12)?;
    let crawled_at = DateTime::parse_from_rfc3339(&crawled_at)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    Ok(RepoRecord {
        name: row.get(offset)?,
        url: row.get(offset + 1)?,
        description: row.get(offset + 2)?,
        language: row.get(offset + 3)?,
        stars: row.get(offset + 4)?,
        forks: row.get(offset + 5)?,
        today_stars: row.get(offset + 6)?,
        open_issues: row.get(offset + 7)?,
        watchers: row.get(offset + 8)?,
        contributors_count: row.get(offset + 9)?,
        recent_commits: row.get(offset + 10)?,
        activity_score: row.get(offset + 11)?,
        crawled_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store() -> TrendingStore {
        TrendingStore::open_in_memory(Duration::from_secs(300)).unwrap()
    }

    fn record(name: &str, stars: i64, score: f64, day: u32) -> RepoRecord {
        let crawled_at = Utc.with_ymd_and_hms(2026, 8, day, 12, 0, 0).unwrap();
        let mut r = RepoRecord::new(name.to_string(), crawled_at);
        r.stars = stars;
        r.forks = stars / 2;
        r.language = Some("Rust".to_string());
        r.activity_score = Some(score);
        r
    }

    #[test]
    fn bulk_save_is_idempotent_per_crawl_day() {
        let store = store();
        let repo = record("owner/repo", 100, 50.0, 1);

        store.bulk_save(&[repo.clone()]).unwrap();
        store.bulk_save(&[repo.clone()]).unwrap();
        assert_eq!(store.snapshot_count().unwrap(), 1);

        // Same name on a later day is a new snapshot, not an update.
        store.bulk_save(&[record("owner/repo", 150, 55.0, 2)]).unwrap();
        assert_eq!(store.snapshot_count().unwrap(), 2);
    }

    #[test]
    fn same_day_resave_updates_fields() {
        let store = store();
        store.bulk_save(&[record("owner/repo", 100, 50.0, 1)]).unwrap();
        store.bulk_save(&[record("owner/repo", 175, 61.5, 1)]).unwrap();

        let rows = store.trending_repositories(&TrendingFilter::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stars, 175);
        assert_eq!(rows[0].activity_score, Some(61.5));
    }

    #[test]
    fn trending_query_orders_with_deterministic_tie_break() {
        let store = store();
        let mut zeta = record("zeta/tied", 500, 90.0, 1);
        zeta.language = Some("Go".to_string());
        store
            .bulk_save(&[
                record("alpha/low", 900, 70.0, 1),
                zeta,
                record("beta/tied", 500, 90.0, 1),
                record("delta/tied-more-stars", 800, 90.0, 1),
            ])
            .unwrap();

        for _ in 0..3 {
            let rows = store.trending_repositories(&TrendingFilter::default()).unwrap();
            let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
            // Ties at 90 sort by stars desc, then name asc.
            assert_eq!(
                names,
                ["delta/tied-more-stars", "beta/tied", "zeta/tied", "alpha/low"]
            );
        }
    }

    #[test]
    fn trending_query_applies_filters() {
        let store = store();
        let mut py = record("py/repo", 50, 40.0, 1);
        py.language = Some("Python".to_string());
        store
            .bulk_save(&[record("rs/big", 5000, 80.0, 1), record("rs/small", 10, 20.0, 1), py])
            .unwrap();

        let filter = TrendingFilter {
            language: Some("Rust".to_string()),
            min_stars: Some(100),
            min_activity: Some(50.0),
            limit: 10,
        };
        let rows = store.trending_repositories(&filter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "rs/big");
    }

    #[test]
    fn query_cache_is_invalidated_by_writes() {
        let store = store();
        store.bulk_save(&[record("owner/one", 100, 50.0, 1)]).unwrap();

        let first = store.trending_repositories(&TrendingFilter::default()).unwrap();
        assert_eq!(first.len(), 1);

        // A second crawl commits; the cached result must not be served.
        store.bulk_save(&[record("owner/two", 200, 60.0, 1)]).unwrap();
        let second = store.trending_repositories(&TrendingFilter::default()).unwrap();
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn language_stats_materialize_and_query() {
        let store = store();
        let mut go = record("go/one", 300, 30.0, 1);
        go.language = Some("Go".to_string());
        store
            .bulk_save(&[record("rs/one", 100, 80.0, 1), record("rs/two", 200, 60.0, 1), go])
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        assert_eq!(store.materialize_language_stats(date).unwrap(), 2);

        let stats = store.language_statistics(None, None).unwrap();
        assert_eq!(stats.len(), 2);
        // Ordered by average activity descending: Rust 70.0, Go 30.0.
        assert_eq!(stats[0].language, "Rust");
        assert_eq!(stats[0].repository_count, 2);
        assert_eq!(stats[0].total_stars, 300);
        assert!((stats[0].average_activity_score - 70.0).abs() < 1e-9);
        assert_eq!(stats[1].language, "Go");

        let filtered = store.language_statistics(Some(2), None).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].language, "Rust");
    }

    #[test]
    fn activity_change_between_two_dates() {
        let store = store();
        store.bulk_save(&[record("owner/repo", 100, 70.0, 1)]).unwrap();
        store.bulk_save(&[record("owner/repo", 180, 85.0, 2)]).unwrap();

        let start = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 8, 2).unwrap();
        let changes = store.activity_changes(None, start, end, false, None).unwrap();
        assert_eq!(changes.len(), 1);
        assert!((changes[0].activity_change - 15.0).abs() < 1e-9);
        assert_eq!(changes[0].stars_change, 80);
    }

    #[test]
    fn positive_only_excludes_non_positive_changes() {
        let store = store();
        store
            .bulk_save(&[record("up/repo", 100, 70.0, 1), record("down/repo", 100, 70.0, 1)])
            .unwrap();
        store
            .bulk_save(&[record("up/repo", 120, 85.0, 2), record("down/repo", 90, 60.0, 2)])
            .unwrap();

        let start = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 8, 2).unwrap();

        let all = store.activity_changes(None, start, end, false, None).unwrap();
        assert_eq!(all.len(), 2);
        // Ordered by change magnitude descending.
        assert_eq!(all[0].repository_name, "up/repo");

        let positive = store.activity_changes(None, start, end, true, None).unwrap();
        assert_eq!(positive.len(), 1);
        assert_eq!(positive[0].repository_name, "up/repo");
    }

    #[test]
    fn activity_change_scoped_to_one_repository() {
        let store = store();
        store
            .bulk_save(&[record("up/repo", 100, 70.0, 1), record("down/repo", 100, 70.0, 1)])
            .unwrap();
        store
            .bulk_save(&[record("up/repo", 120, 85.0, 2), record("down/repo", 90, 60.0, 2)])
            .unwrap();

        let start = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 8, 2).unwrap();

        let scoped = store
            .activity_changes(Some("down/repo"), start, end, false, None)
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].repository_name, "down/repo");
        assert!((scoped[0].activity_change + 10.0).abs() < 1e-9);
    }

    #[test]
    fn latest_history_date_lookup() {
        let store = store();
        assert_eq!(
            store
                .latest_history_date_before(NaiveDate::from_ymd_opt(2026, 8, 5).unwrap())
                .unwrap(),
            None
        );

        store.bulk_save(&[record("owner/repo", 100, 70.0, 1)]).unwrap();
        store.bulk_save(&[record("owner/repo", 110, 72.0, 3)]).unwrap();

        let before = store
            .latest_history_date_before(NaiveDate::from_ymd_opt(2026, 8, 3).unwrap())
            .unwrap();
        assert_eq!(before, Some(NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()));
    }

    #[test]
    fn rescoring_with_full_metrics_table() {
        let store = store();
        let mut repo = record("owner/repo", 10_000, 10.0, 1);
        repo.forks = 5_000;
        repo.open_issues = 1_000;
        repo.watchers = 10_000;
        repo.contributors_count = 100;
        repo.recent_commits = 1_000;
        store.bulk_save(&[repo]).unwrap();

        let rescored = store.update_activity_scores(&WeightTable::full_metrics()).unwrap();
        assert_eq!(rescored, 1);

        let rows = store.trending_repositories(&TrendingFilter::default()).unwrap();
        assert_eq!(rows[0].activity_score, Some(100.0));
    }
}
