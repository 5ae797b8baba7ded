// src/fetch/tabnet.rs

use anyhow::{Context, Result};
use futures::{stream::FuturesUnordered, StreamExt};
use reqwest::{header, Client};
use std::{collections::BTreeMap, ops::RangeInclusive, time::Duration};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use super::forms::Measure;
use crate::config::FetchConfig;
use crate::process::utils::decode_text;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36";

/// One fetched tabulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub measure: Measure,
    pub year: i32,
    pub html: String,
}

pub fn build_client(cfg: &FetchConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .user_agent(USER_AGENT)
        .cookie_store(true)
        .gzip(true)
        .build()
        .context("building HTTP client")
}

async fn post_form_core(client: &Client, url: &Url, body: &str) -> Result<String> {
    debug!("POST {}", url);
    let bytes = client
        .post(url.clone())
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::ACCEPT_LANGUAGE, "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7")
        .header(header::REFERER, url.as_str())
        .body(body.to_string())
        .send()
        .await
        .with_context(|| format!("POST {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .bytes()
        .await
        .with_context(|| format!("Reading body from {}", url))?;
    Ok(decode_text(&bytes))
}

/// Delay before retry number `attempt` (1-based): doubles each time, saturating.
fn backoff_ms(initial_backoff_ms: u64, attempt: u32) -> u64 {
    initial_backoff_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

pub async fn post_form_with_retry(
    client: &Client,
    url: &Url,
    body: &str,
    max_retries: u32,
    initial_backoff_ms: u64,
) -> Result<String> {
    let mut attempts = 0;
    loop {
        match post_form_core(client, url, body).await {
            Ok(t) => return Ok(t),
            Err(e) if attempts < max_retries => {
                attempts += 1;
                let backoff = backoff_ms(initial_backoff_ms, attempts);
                warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                sleep(Duration::from_millis(backoff)).await;
            }
            Err(e) => {
                error!(%url, error = %e, "Exhausted retries");
                return Err(e);
            }
        }
    }
}

#[instrument(level = "info", skip(client, cfg))]
async fn fetch_page(client: Client, cfg: FetchConfig, measure: Measure, year: i32) -> Result<Page> {
    let url = Url::parse(measure.endpoint(&cfg))
        .with_context(|| format!("invalid {} endpoint", measure.name()))?;
    let html = post_form_with_retry(
        &client,
        &url,
        &measure.form_body(year),
        cfg.max_retries,
        cfg.initial_backoff_ms,
    )
    .await
    .with_context(|| format!("fetching {} for {}", measure.name(), year))?;
    Ok(Page { measure, year, html })
}

/// Fetch every measure for every year, at most `max_concurrency` at a time.
///
/// Pages come back ordered by (measure, year) whatever order they arrive in.
/// The first page that still fails after its retries fails the whole fetch.
#[instrument(level = "info", skip(client, cfg))]
pub async fn fetch_pages(
    client: &Client,
    cfg: &FetchConfig,
    years: RangeInclusive<i32>,
) -> Result<Vec<Page>> {
    let mut tasks = FuturesUnordered::new();
    let mut pages = BTreeMap::new();

    for measure in Measure::ALL {
        for year in years.clone() {
            tasks.push(fetch_page(client.clone(), cfg.clone(), measure, year));

            // throttle concurrency
            if tasks.len() >= cfg.max_concurrency {
                if let Some(res) = tasks.next().await {
                    let page: Page = res?;
                    info!(measure = page.measure.name(), year = page.year, "fetched");
                    pages.insert((page.measure, page.year), page);
                }
            }
        }
    }

    // drain remaining tasks
    while let Some(res) = tasks.next().await {
        let page = res?;
        info!(measure = page.measure.name(), year = page.year, "fetched");
        pages.insert((page.measure, page.year), page);
    }

    Ok(pages.into_values().collect())
}
