//! Catalog maintenance commands run with the templates token:
//! `web2app-admin icons` and `web2app-admin counts`.

use std::path::Path;

use anyhow::{Context, Result};
use web2app_admin::config::AdminConfig;
use web2app_admin::dashboard::catalog;
use web2app_admin::dashboard::github::GitHubClient;
use web2app_admin::dashboard::icons::{self, BatchStatus, HttpIconFetcher};

fn templates_token(config: &AdminConfig) -> Result<String> {
    config
        .github
        .templates_token
        .clone()
        .context("GITHUB_TEMPLATES_TOKEN is not set; maintenance commands need a token with write access")
}

pub async fn cmd_icons(config_path: &Path, dry_run: bool) -> Result<()> {
    let config = AdminConfig::resolve(config_path)?;
    let token = templates_token(&config)?;
    let client = GitHubClient::new(&config)?;
    let fetcher = HttpIconFetcher::new()?;

    println!();
    if dry_run {
        println!("Fetching icons (dry run)...");
    } else {
        println!("Fetching and uploading icons...");
    }
    println!();

    let report = icons::run_batch(&client, &fetcher, &token, dry_run)
        .await
        .context("Batch icon run failed")?;

    for outcome in &report.results {
        let marker = match outcome.status {
            BatchStatus::Success => "+",
            BatchStatus::Failed => "x",
            BatchStatus::Skipped => "-",
        };
        println!(
            "  {} {}/{} ({}): {}",
            marker, outcome.category, outcome.template_id, outcome.name, outcome.message
        );
    }

    let s = report.summary;
    println!();
    println!(
        "{} templates: {} succeeded, {} failed, {} skipped",
        s.total, s.success, s.failed, s.skipped
    );
    println!();
    Ok(())
}

pub async fn cmd_counts(config_path: &Path) -> Result<()> {
    let config = AdminConfig::resolve(config_path)?;
    let token = templates_token(&config)?;
    let client = GitHubClient::new(&config)?;

    let manifest = catalog::update_template_counts(&client, &token)
        .await
        .context("Failed to update template counts")?;

    println!();
    println!("Template counts ({}):", manifest.last_updated);
    for category in &manifest.categories {
        println!("  {:<20} {}", category.id, category.template_count);
    }
    println!();
    Ok(())
}
