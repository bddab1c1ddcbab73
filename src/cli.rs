//! Command-line interface and pipeline orchestration

use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::auth::{self, MAIL_SCOPE};
use crate::client::{GmailClient, ProductionGmailClient};
use crate::config::Config;
use crate::error::Result;
use crate::scanner::{EmailScanner, ScanConfig};
use crate::senders;
use crate::token::{CachedToken, OAuthTokenExchanger, TokenCache, TokenManager};
use google_gmail1::yup_oauth2::ApplicationSecret;

#[derive(Parser, Debug)]
#[command(name = "gmail-senders")]
#[command(version)]
#[command(about = "Group every inbox message ID by sender address", long_about = None)]
pub struct Cli {
    /// Optional TOML file overriding paths, query and page size
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the effective configuration; without `--config` the built-in defaults apply
    pub async fn load_config(&self) -> Result<Config> {
        let config = match &self.config {
            Some(path) => Config::load(path).await?,
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }
}

pub struct ProgressReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
}

impl ProgressReporter {
    pub fn new(multi: MultiProgress) -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed:>6}] {pos} messages scanned ({msg})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        Self {
            multi,
            spinner_style,
        }
    }

    pub fn add_spinner(&self, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.spinner_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub pages: usize,
    pub messages_listed: usize,
    pub messages_recorded: usize,
    pub messages_skipped: usize,
    pub senders: usize,
    pub output_path: PathBuf,
}

/// Load credentials and obtain a token, prompting on the console on a cache miss
pub async fn authenticate(config: &Config) -> Result<(ApplicationSecret, CachedToken)> {
    let secret = auth::load_application_secret(&config.credentials_path).await?;
    let authorization_url = auth::authorization_url(&secret, &[MAIL_SCOPE])?;

    let manager = TokenManager::new(
        TokenCache::new(&config.token_cache_path),
        OAuthTokenExchanger::new(&secret)?,
        authorization_url,
    );

    let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let token = manager.acquire(&mut stdin, &mut stdout).await?;

    Ok((secret, token))
}

/// Scan the mailbox and write the sender index
///
/// The output file is only touched after every page has been fetched, so a
/// failed scan leaves any previous output in place.
pub async fn collect_senders<C: GmailClient>(
    client: C,
    config: &Config,
    progress: ProgressBar,
) -> Result<FetchReport> {
    let scanner = EmailScanner::new(client).with_progress(progress.clone());
    let (index, summary) = scanner.scan(&ScanConfig::from(config)).await?;
    progress.finish_and_clear();

    senders::write_senders(&config.output_path, &index).await?;

    Ok(FetchReport {
        pages: summary.pages,
        messages_listed: summary.messages_listed,
        messages_recorded: summary.messages_recorded,
        messages_skipped: summary.messages_skipped,
        senders: index.sender_count(),
        output_path: config.output_path.clone(),
    })
}

/// Full run: authenticate, scan, write
pub async fn run_fetch(config: &Config, reporter: &ProgressReporter) -> Result<FetchReport> {
    let (secret, token) = authenticate(config).await?;
    let hub = auth::initialize_gmail_hub(&secret, &token).await?;
    let client = ProductionGmailClient::new(hub, config.user_id.clone());

    info!("Scanning messages matching {:?}", config.query);
    let spinner = reporter.add_spinner("starting");
    collect_senders(client, config, spinner).await
}
