//! Report delivery.
//!
//! Channels are configured in `Settings` and passed in explicitly; with none
//! configured the digest lands in the log instead. Delivery failures never
//! touch persisted data and never abort the batch; the caller logs them and
//! moves on.

use std::collections::HashMap;

use log::{info, warn};

use crate::error::TrackerError;
use crate::types::RepoRecord;

/// Webhook endpoints for report delivery, filled in by
/// `Settings::from_env()` and handed to [`send_notifications`].
#[derive(Debug, Clone, Default)]
pub struct Channels {
    /// Receives the plain-text digest as a Slack message payload.
    pub slack_webhook: Option<String>,
    /// Receives the plain-text digest as a Discord message payload.
    pub discord_webhook: Option<String>,
    /// Receives a JSON payload carrying the full HTML table.
    pub report_webhook: Option<String>,
}

impl Channels {
    pub fn is_empty(&self) -> bool {
        self.slack_webhook.is_none()
            && self.discord_webhook.is_none()
            && self.report_webhook.is_none()
    }
}

/// Render the report table the original email consumers expect:
/// name / language / activity score / score change / stars / issues,
/// with up/down coloring on the change column.
pub fn build_report_html(records: &[RepoRecord], score_changes: &HashMap<String, f64>) -> String {
    let mut html = String::from(
        "<html>\n<head>\n<style>\n\
         table { border-collapse: collapse; width: 100%; }\n\
         th, td { padding: 8px; text-align: left; border: 1px solid #ddd; }\n\
         th { background-color: #f2f2f2; }\n\
         tr:nth-child(even) { background-color: #f9f9f9; }\n\
         .trend-up { color: green; }\n\
         .trend-down { color: red; }\n\
         </style>\n</head>\n<body>\n\
         <h2>GitHub Trending Repositories Report</h2>\n<table>\n\
         <tr><th>Repository</th><th>Language</th><th>Activity Score</th>\
         <th>Score Change</th><th>Stars</th><th>Issues</th></tr>\n",
    );

    for record in records {
        let score = record.activity_score.unwrap_or(0.0);
        let change = score_changes.get(&record.name).copied().unwrap_or(0.0);
        let trend_class = if change >= 0.0 { "trend-up" } else { "trend-down" };
        html.push_str(&format!(
            "<tr><td><a href=\"https://github.com/{name}\">{name}</a></td>\
             <td>{language}</td><td>{score:.1}</td>\
             <td class=\"{trend_class}\">{change:+.1}</td>\
             <td>{stars}</td><td>{issues}</td></tr>\n",
            name = record.name,
            language = record.language.as_deref().unwrap_or("-"),
            score = score,
            trend_class = trend_class,
            change = change,
            stars = record.stars,
            issues = record.open_issues,
        ));
    }

    html.push_str("</table>\n</body>\n</html>\n");
    html
}

/// Fan the report out to every configured channel. With no channels
/// configured the digest lands in the log instead.
pub fn send_notifications(
    channels: &Channels,
    subject: &str,
    text: &str,
    html: &str,
) -> Result<(), TrackerError> {
    if channels.is_empty() {
        info!("No notification channels configured. Report summary:\n{}", text);
        return Ok(());
    }

    if let Some(webhook) = &channels.slack_webhook {
        send_slack(webhook, text)?;
    }

    if let Some(webhook) = &channels.discord_webhook {
        send_discord(webhook, text)?;
    }

    if let Some(webhook) = &channels.report_webhook {
        send_report_webhook(webhook, subject, html)?;
    }

    Ok(())
}

fn send_slack(webhook_url: &str, text: &str) -> Result<(), TrackerError> {
    let client = reqwest::blocking::Client::new();
    let response = client
        .post(webhook_url)
        .json(&serde_json::json!({ "text": text }))
        .send()
        .map_err(|e| TrackerError::notification(format!("slack: {}", e)))?;
    check_delivery("slack", response)
}

fn send_discord(webhook_url: &str, text: &str) -> Result<(), TrackerError> {
    let client = reqwest::blocking::Client::new();
    let response = client
        .post(webhook_url)
        .json(&serde_json::json!({ "content": text }))
        .send()
        .map_err(|e| TrackerError::notification(format!("discord: {}", e)))?;
    check_delivery("discord", response)
}

fn send_report_webhook(webhook_url: &str, subject: &str, html: &str) -> Result<(), TrackerError> {
    let client = reqwest::blocking::Client::new();
    let response = client
        .post(webhook_url)
        .json(&serde_json::json!({ "subject": subject, "html": html }))
        .send()
        .map_err(|e| TrackerError::notification(format!("report webhook: {}", e)))?;
    check_delivery("report webhook", response)
}

fn check_delivery(channel: &str, response: reqwest::blocking::Response) -> Result<(), TrackerError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        warn!("{} delivery returned HTTP {}", channel, status.as_u16());
        Err(TrackerError::notification(format!(
            "{}: HTTP {}",
            channel,
            status.as_u16()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn report_html_has_expected_columns_and_trend_classes() {
        let mut up = RepoRecord::new("up/repo".to_string(), Utc::now());
        up.language = Some("Rust".to_string());
        up.activity_score = Some(85.0);
        up.stars = 1200;
        up.open_issues = 7;

        let mut down = RepoRecord::new("down/repo".to_string(), Utc::now());
        down.activity_score = Some(40.0);

        let mut changes = HashMap::new();
        changes.insert("up/repo".to_string(), 15.0);
        changes.insert("down/repo".to_string(), -3.5);

        let html = build_report_html(&[up, down], &changes);

        assert!(html.contains("<th>Activity Score</th>"));
        assert!(html.contains("<th>Score Change</th>"));
        assert!(html.contains("class=\"trend-up\">+15.0"));
        assert!(html.contains("class=\"trend-down\">-3.5"));
        assert!(html.contains("https://github.com/up/repo"));
        assert!(html.contains("<td>1200</td>"));
    }

    #[test]
    fn no_configured_channels_degrades_to_log_only() {
        let channels = Channels::default();
        assert!(channels.is_empty());
        // No network access happens on this path; delivery is a no-op Ok.
        send_notifications(&channels, "subject", "digest", "<html></html>").unwrap();
    }

    #[test]
    fn any_configured_webhook_makes_channels_non_empty() {
        let channels = Channels {
            report_webhook: Some("https://hooks.example.test/report".to_string()),
            ..Channels::default()
        };
        assert!(!channels.is_empty());
    }

    #[test]
    fn missing_change_renders_as_flat() {
        let mut repo = RepoRecord::new("new/repo".to_string(), Utc::now());
        repo.activity_score = Some(50.0);
        let html = build_report_html(&[repo], &HashMap::new());
        assert!(html.contains("class=\"trend-up\">+0.0"));
    }
}
