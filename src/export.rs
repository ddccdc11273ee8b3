//! Tabular and HTML artifact writers.
//!
//! The CSV column set (name, url, description, language, stars, forks,
//! today_stars, crawled_at) is load-bearing for downstream consumers; keep it
//! stable. The HTML report is self-contained: the language chart is plain
//! HTML/CSS bars, no script dependency.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::numbers::format_count;
use crate::report::TrendingSummary;
use crate::types::RepoRecord;

const CSV_HEADER: &str = "name,url,description,language,stars,forks,today_stars,crawled_at";

pub fn write_csv(path: &Path, records: &[RepoRecord]) -> Result<()> {
    let mut out = String::with_capacity(records.len() * 96);
    out.push_str(CSV_HEADER);
    out.push('\n');

    for record in records {
        let fields = [
            record.name.clone(),
            record.url.clone(),
            record.description.clone().unwrap_or_default(),
            record.language.clone().unwrap_or_default(),
            record.stars.to_string(),
            record.forks.to_string(),
            record.today_stars.to_string(),
            record.crawled_at.to_rfc3339(),
        ];
        let line = fields.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(",");
        out.push_str(&line);
        out.push('\n');
    }

    fs::write(path, out).with_context(|| format!("Failed to write CSV to {:?}", path))?;
    info!("Wrote {} rows to {:?}", records.len(), path);
    Ok(())
}

/// RFC 4180 quoting: fields containing commas, quotes or newlines are quoted
/// and internal quotes doubled.
fn csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn write_html(path: &Path, summary: &TrendingSummary, records: &[RepoRecord]) -> Result<()> {
    let html = render_html(summary, records);
    fs::write(path, html).with_context(|| format!("Failed to write HTML report to {:?}", path))?;
    info!("Wrote HTML report to {:?}", path);
    Ok(())
}

pub fn render_html(summary: &TrendingSummary, records: &[RepoRecord]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>GitHub Trending Report</title>\n<style>\n\
         body { font-family: sans-serif; margin: 2em; }\n\
         table { border-collapse: collapse; width: 100%; }\n\
         th, td { padding: 8px; text-align: left; border: 1px solid #ddd; }\n\
         th { background-color: #f2f2f2; }\n\
         tr:nth-child(even) { background-color: #f9f9f9; }\n\
         .bar { background-color: #2188ff; height: 14px; display: inline-block; }\n\
         .bar-row { margin: 2px 0; }\n\
         .bar-label { display: inline-block; width: 10em; }\n\
         </style>\n</head>\n<body>\n",
    );

    html.push_str("<h2>GitHub Trending Repositories Report</h2>\n");

    html.push_str("<h3>Summary</h3>\n<ul>\n");
    for insight in &summary.insights {
        html.push_str(&format!("<li>{}</li>\n", escape(insight)));
    }
    html.push_str("</ul>\n");

    // Language distribution as CSS bars, widest bar = most repositories.
    let max_repos = summary.languages.iter().map(|l| l.repos).max().unwrap_or(0);
    if max_repos > 0 {
        html.push_str("<h3>Repositories by Language</h3>\n<div>\n");
        for rollup in &summary.languages {
            let width = 300 * rollup.repos / max_repos;
            html.push_str(&format!(
                "<div class=\"bar-row\"><span class=\"bar-label\">{}</span>\
                 <span class=\"bar\" style=\"width: {}px\"></span> {}</div>\n",
                escape(&rollup.language),
                width,
                rollup.repos
            ));
        }
        html.push_str("</div>\n");
    }

    html.push_str(
        "<h3>Repositories</h3>\n<table>\n<tr>\
         <th>Repository</th><th>Description</th><th>Language</th>\
         <th>Stars</th><th>Forks</th><th>Stars Today</th><th>Activity</th></tr>\n",
    );
    for record in records {
        html.push_str(&format!(
            "<tr><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td>\
             <td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(&record.url),
            escape(&record.name),
            escape(record.description.as_deref().unwrap_or("")),
            escape(record.language.as_deref().unwrap_or("-")),
            format_count(record.stars),
            format_count(record.forks),
            format_count(record.today_stars),
            record
                .activity_score
                .map(|s| format!("{:.1}", s))
                .unwrap_or_else(|| "-".to_string()),
        ));
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
