use anyhow::Context;
use chrono::NaiveDate;
use housewatch_core::config::Settings;
use housewatch_core::ingest::normalize::{filter, normalize};
use housewatch_core::ingest::ListingProvider;
use housewatch_core::notify::{notify, Mailer, NotificationResult};
use housewatch_core::storage;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub run_date: NaiveDate,
    pub output_dir: PathBuf,
    /// Do everything except sending the email.
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub fetched: usize,
    pub missing_zip: usize,
    pub rejected: usize,
    pub matched: usize,
    pub output_path: PathBuf,
    /// `None` on a dry run.
    pub notification: Option<NotificationResult>,
}

/// Fetch, filter, persist, notify. Stops at the first fatal error.
pub async fn run_once(
    settings: &Settings,
    provider: &dyn ListingProvider,
    mailer: &dyn Mailer,
    opts: &RunOptions,
) -> anyhow::Result<RunReport> {
    let raw = provider
        .fetch_listings(&settings.listing_url)
        .await
        .with_context(|| format!("{} listing fetch failed", provider.provider_name()))?;

    let normalized = normalize(&raw.results);
    let matched = filter(normalized.records, &settings.zip_codes, settings.price_range);
    tracing::info!(
        fetched = raw.results.len(),
        missing_zip = normalized.missing_zip,
        rejected = normalized.rejected.len(),
        matched = matched.len(),
        "filtered listings"
    );

    let output_path = storage::output_path(&opts.output_dir, opts.run_date);
    storage::write_csv(&matched, &output_path).context("persisting filtered listings failed")?;

    let notification = if opts.dry_run {
        tracing::info!(matched = matched.len(), "dry run; not sending email");
        None
    } else {
        let res = notify(&matched, settings, mailer)
            .await
            .context("sending notification failed")?;
        Some(res)
    };

    Ok(RunReport {
        fetched: raw.results.len(),
        missing_zip: normalized.missing_zip,
        rejected: normalized.rejected.len(),
        matched: matched.len(),
        output_path,
        notification,
    })
}
