use anyhow::{Context, Result};
use pmo_dashboard::{
    auth::{AuthOutcome, ConsoleUserAgent, FileSessionStore, TokenFlow},
    config::DashboardConfig,
    dashboard::Dashboard,
    fetch::{self, DriveFetcher},
};
use reqwest::Client;
use std::{env, io, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    // stderr only; stdout carries the JSON result
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pmo_dashboard=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();
    info!("startup");

    // ─── 2) config ───────────────────────────────────────────────────
    let cfg = DashboardConfig::load().context("loading dashboard config")?;
    let client = Client::new();
    let store = Arc::new(FileSessionStore::new(cfg.session_file.clone()));
    info!(session = %store.path().display(), "using session file");

    // ─── 3) token: cached, redirect, or redeem the callback URL ──────
    let current = match env::args().nth(1) {
        Some(callback) => Url::parse(&callback).context("parsing callback URL")?,
        None => Url::parse(&cfg.redirect_uri)?,
    };
    let mut agent = ConsoleUserAgent::new(current);
    let mut flow = TokenFlow::new(cfg.oauth(), store, client.clone());

    let token = match flow.acquire(&mut agent).await.context("acquiring token")? {
        AuthOutcome::Authorized(token) => token,
        AuthOutcome::Redirected(url) => {
            eprintln!("Open this URL to sign in, then rerun with the URL you are sent back to:");
            eprintln!("{}", url);
            return Ok(());
        }
    };

    // ─── 4) fetch + parse ────────────────────────────────────────────
    let fetcher = DriveFetcher::new(client, cfg.file_url()?);
    let dataset = match fetch::load_records(&fetcher, &token, &cfg.csv_options()).await {
        Ok(ds) => ds,
        Err(e) => {
            if e.is_unauthorized() {
                flow.expire()?;
                error!("token rejected by drive; cleared cached token, rerun to sign in again");
            }
            return Err(e).context("loading export");
        }
    };

    // ─── 5) emit records + chart series ─────────────────────────────
    let mut dashboard = Dashboard::new();
    dashboard.replace(dataset);
    let output = serde_json::json!({
        "headers": dashboard.dataset().map(|d| &d.headers),
        "records": dashboard.records(),
        "warnings": dashboard.dataset().map(|d| &d.warnings),
        "charts": dashboard.charts(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    info!(records = dashboard.records().len(), "all done");
    Ok(())
}
