use anyhow::Result;
use clap::Parser;
use gmail_senders::auth;
use gmail_senders::cli::{self, Cli, ProgressReporter};
use indicatif::MultiProgress;
use std::io::{self, Write};
use std::process;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Log writer that prints above the scan spinner
///
/// tracing-subscriber hands over one formatted event per write. When the
/// progress display is hidden (stderr is not a terminal) lines go straight
/// to stderr instead of being dropped.
#[derive(Clone)]
struct ProgressLogWriter {
    multi: MultiProgress,
}

impl Write for ProgressLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.multi.is_hidden() {
            io::stderr().write_all(buf)?;
        } else {
            let line = String::from_utf8_lossy(buf);
            self.multi.println(line.trim_end_matches('\n'))?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for ProgressLogWriter {
    type Writer = ProgressLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let multi_progress = MultiProgress::new();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_senders=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_senders=info,warn"))
    };

    // Logs print above the scan spinner
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(ProgressLogWriter {
            multi: multi_progress.clone(),
        })
        .with_target(false)
        .init();

    if let Err(e) = run(&cli, multi_progress).await {
        tracing::error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(cli: &Cli, multi_progress: MultiProgress) -> Result<()> {
    auth::install_crypto_provider()?;

    let config = cli.load_config().await?;
    tracing::debug!("Effective configuration: {:?}", config);

    let reporter = ProgressReporter::new(multi_progress);
    let report = cli::run_fetch(&config, &reporter).await?;

    tracing::info!(
        "Wrote {} senders covering {} messages to {:?} ({} pages, {} listed, {} skipped)",
        report.senders,
        report.messages_recorded,
        report.output_path,
        report.pages,
        report.messages_listed,
        report.messages_skipped
    );

    Ok(())
}
