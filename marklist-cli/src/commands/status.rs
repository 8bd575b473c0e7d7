//! `marklist status` — freshness of every configured source.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use marklist_sync::freshness::format_datetime_age;
use marklist_sync::pipeline::{self, SourceStatus};
use marklist_sync::SourceFreshness;

/// Arguments for `marklist status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let config = super::load_config(config_path)?;
        let statuses = pipeline::status(&config).with_context(|| {
            format!(
                "failed to read database at '{}'",
                config.data_dir.display()
            )
        })?;

        if self.json {
            return print_json(&statuses);
        }
        print_table(&statuses);
        Ok(())
    }
}

#[derive(Serialize)]
struct StatusReportJson<'a> {
    sources: Vec<SourceStatusJson<'a>>,
}

#[derive(Serialize)]
struct SourceStatusJson<'a> {
    identifier: &'a str,
    status: &'static str,
    files: &'a [String],
    items: usize,
    stars: Option<u64>,
    updated_at: Option<String>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "source")]
    source: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "detail")]
    detail: String,
    #[tabled(rename = "items")]
    items: usize,
    #[tabled(rename = "stars")]
    stars: String,
    #[tabled(rename = "last sync")]
    last_sync: String,
}

fn print_json(statuses: &[SourceStatus]) -> Result<()> {
    let payload = StatusReportJson {
        sources: statuses
            .iter()
            .map(|s| SourceStatusJson {
                identifier: &s.identifier,
                status: freshness_key(&s.freshness),
                files: s.freshness.files(),
                items: s.item_count,
                stars: s.stars,
                updated_at: s.updated_at.map(|at| at.to_rfc3339()),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(statuses: &[SourceStatus]) {
    let due = statuses
        .iter()
        .filter(|s| !matches!(s.freshness, SourceFreshness::Fresh | SourceFreshness::Disabled))
        .count();
    println!(
        "marklist v{} | {} sources | {} need sync",
        env!("CARGO_PKG_VERSION"),
        statuses.len(),
        due,
    );

    if statuses.is_empty() {
        println!("No sources configured.");
        return;
    }

    let now = Utc::now();
    let rows: Vec<StatusTableRow> = statuses
        .iter()
        .map(|s| StatusTableRow {
            source: s.identifier.clone(),
            status: colorize(&s.freshness),
            detail: detail(&s.freshness),
            items: s.item_count,
            stars: s.stars.map(|n| n.to_string()).unwrap_or_else(|| "-".into()),
            last_sync: s
                .updated_at
                .map(|at| format_datetime_age(at, now))
                .unwrap_or_else(|| "never".into()),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if due > 0 {
        println!("Run 'marklist sync' to update due sources.");
    }
}

fn freshness_key(freshness: &SourceFreshness) -> &'static str {
    match freshness {
        SourceFreshness::Disabled => "disabled",
        SourceFreshness::NeverSynced => "never_synced",
        SourceFreshness::Partial { .. } => "partial",
        SourceFreshness::ParseFailed { .. } => "parse_failed",
        SourceFreshness::Due { .. } => "due",
        SourceFreshness::Fresh => "fresh",
    }
}

fn colorize(freshness: &SourceFreshness) -> String {
    let label = freshness.label().to_uppercase();
    match freshness {
        SourceFreshness::Fresh => label.green().to_string(),
        SourceFreshness::Due { .. } => label.yellow().to_string(),
        SourceFreshness::ParseFailed { .. } => label.red().to_string(),
        SourceFreshness::Partial { .. } => label.magenta().to_string(),
        SourceFreshness::NeverSynced | SourceFreshness::Disabled => {
            label.bright_black().to_string()
        }
    }
}

fn detail(freshness: &SourceFreshness) -> String {
    match freshness {
        SourceFreshness::Disabled => "skip: true".to_string(),
        SourceFreshness::NeverSynced => "no metadata".to_string(),
        SourceFreshness::Fresh => "up to date".to_string(),
        SourceFreshness::Partial { missing } => format!("{} not ingested", summarize(missing)),
        SourceFreshness::ParseFailed { files } => format!("{} to rebuild", summarize(files)),
        SourceFreshness::Due { files } => format!("{} due", summarize(files)),
    }
}

fn summarize(files: &[String]) -> String {
    match files {
        [] => "no files".to_string(),
        [one] => one.clone(),
        [first, rest @ ..] => format!("{first} +{}", rest.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_lists_first_file_and_remainder() {
        assert_eq!(summarize(&[]), "no files");
        assert_eq!(summarize(&["README.md".into()]), "README.md");
        assert_eq!(
            summarize(&["README.md".into(), "a.md".into(), "b.md".into()]),
            "README.md +2"
        );
    }

    #[test]
    fn detail_describes_each_state() {
        assert_eq!(detail(&SourceFreshness::Fresh), "up to date");
        assert_eq!(
            detail(&SourceFreshness::Due {
                files: vec!["README.md".into()]
            }),
            "README.md due"
        );
        assert_eq!(freshness_key(&SourceFreshness::NeverSynced), "never_synced");
    }
}
