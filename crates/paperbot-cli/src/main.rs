use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use paperbot_core::storage::record_file::render;
use paperbot_core::{AlertSource, AppConfig, ArticleRecord, CandidateLink, ExitCode, PaperbotError, RecordStore, RetryList};
use paperbot_notify::{NotifyError, TelegramBot};
use paperbot_science::{Dispatcher, ExtractionFailure, OpenAiTranslator, PdfIngestor, Reconciler, ScienceError, alerts};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "paperbot",
    about = "Collect research-paper abstracts from alert links into citation records",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print produced records as JSON instead of record-file text.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every candidate link, reconcile the retry list, forward today's records.
    Run {
        /// File of `url<TAB>title` lines.
        #[arg(long)]
        links: Option<PathBuf>,
        /// Saved alert e-mail body as `<source>=<html file>` (scholar, wiley, stork).
        #[arg(long, action = clap::ArgAction::Append)]
        alert: Vec<String>,
    },

    /// Extract a single article page and save its record.
    Extract {
        url: String,
        #[arg(long)]
        title: Option<String>,
    },

    /// Retry every URL on the retry list once.
    Reconcile,

    /// Extract a record from a local PDF.
    Pdf { path: PathBuf },

    /// Send today's record files to Telegram.
    Notify,

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config file location.
    Path,
    /// Print the effective configuration as TOML.
    Show,
    /// Write the default configuration to the config file.
    Init {
        #[arg(long)]
        force: bool,
    },
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(ExitCode::InvalidArgs as i32);
        }
    };

    let guard = init_logging(&config.log_dir());
    let result = execute(cli, config).await;
    if let Err(e) = &result {
        tracing::error!("{e:#}");
    }
    drop(guard);

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(exit_code(&e) as i32);
    }
}

async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
    let start = Instant::now();
    let store = RecordStore::new(config.output_dir());

    match cli.command {
        // ── Run ────────────────────────────────────────────────────────────

        Commands::Run { links, alert } => {
            let mut candidates = Vec::new();
            if let Some(path) = &links {
                candidates.extend(read_links(path)?);
            }
            for arg in &alert {
                let (source, path) = parse_alert_arg(arg)?;
                let html = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading alert body {}", path.display()))?;
                candidates.extend(alerts::extract_links(source, &html));
            }
            if candidates.is_empty() && links.is_none() && alert.is_empty() {
                bail!("nothing to do: pass --links and/or --alert");
            }
            info!(count = candidates.len(), "run: candidate links collected");

            let dispatcher = Dispatcher::from_config(&config)?;
            let mut produced = 0;
            for record in dispatcher.extract_batch(&candidates).await {
                if save(&store, dispatcher.retry_list(), &record) {
                    produced += 1;
                }
            }

            let recovered = Reconciler::new(&dispatcher, &store, &config.reconcile)
                .reconcile()
                .await;
            produced += recovered.len();

            info!(
                produced,
                recovered = recovered.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "run: done"
            );

            if produced == 0 {
                info!("run: no new records, nothing to forward");
            } else if !config.telegram.enabled {
                info!("run: telegram disabled, records not forwarded");
            } else {
                let bot = TelegramBot::from_config(&config.telegram)?;
                let sent = bot.forward_records(&store, Local::now().date_naive()).await?;
                info!(sent, "run: records forwarded");
            }
        }

        // ── Extract ────────────────────────────────────────────────────────

        Commands::Extract { url, title } => {
            let dispatcher = Dispatcher::from_config(&config)?;
            let record = dispatcher.extract(&url, title.as_deref()).await?;
            store.save(&record)?;
            print_record(&record, cli.json)?;
        }

        // ── Reconcile ──────────────────────────────────────────────────────

        Commands::Reconcile => {
            let dispatcher = Dispatcher::from_config(&config)?;
            let records = Reconciler::new(&dispatcher, &store, &config.reconcile)
                .try_reconcile()
                .await?;
            if cli.json {
                print_json(&serde_json::to_value(&records)?)?;
            } else {
                println!("Recovered {} record(s).", records.len());
            }
        }

        // ── Pdf ────────────────────────────────────────────────────────────

        Commands::Pdf { path } => {
            if !path.is_file() {
                bail!(PaperbotError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} is not a file", path.display()),
                )));
            }
            let translator = Arc::new(OpenAiTranslator::new(&config.translator)?);
            let ingestor = PdfIngestor::new(translator, store);
            match ingestor.ingest(&path).await {
                Some(record) => print_record(&record, cli.json)?,
                None => bail!("no record could be extracted from {}", path.display()),
            }
        }

        // ── Notify ─────────────────────────────────────────────────────────

        Commands::Notify => {
            let bot = TelegramBot::from_config(&config.telegram)?;
            let sent = bot.forward_records(&store, Local::now().date_naive()).await?;
            println!("Sent {sent} record(s).");
        }

        // ── Config ─────────────────────────────────────────────────────────

        Commands::Config { action } => match action {
            ConfigAction::Path => println!("{}", AppConfig::config_path().display()),
            ConfigAction::Show => print!("{}", toml::to_string_pretty(&config)?),
            ConfigAction::Init { force } => {
                let path = AppConfig::config_path();
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                AppConfig::default().save_to(&path)?;
                println!("Wrote {}", path.display());
            }
        },
    }

    Ok(())
}

// ─── Logging ────────────────────────────────────────────────────────────────

/// Stderr plus a daily file in `log_dir`. Falls back to stderr only when the
/// directory cannot be created.
fn init_logging(log_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let stderr = fmt::layer().with_writer(std::io::stderr);

    match std::fs::create_dir_all(log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(log_dir, "paperbot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            warn!(dir = %log_dir.display(), error = %e, "log directory unavailable");
            None
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn read_links(path: &Path) -> Result<Vec<CandidateLink>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading links file {}", path.display()))?;
    Ok(contents.lines().filter_map(CandidateLink::parse_line).collect())
}

fn parse_alert_arg(arg: &str) -> Result<(AlertSource, PathBuf)> {
    let Some((source, path)) = arg.split_once('=') else {
        bail!("expected <source>=<html file>, got `{arg}`");
    };
    let source: AlertSource = source.parse().map_err(anyhow::Error::msg)?;
    Ok((source, PathBuf::from(path)))
}

/// Save a record. A record that cannot be written goes back on the retry list.
fn save(store: &RecordStore, retry: &RetryList, record: &ArticleRecord) -> bool {
    match store.save(record) {
        Ok(path) => {
            info!(path = %path.display(), "record saved");
            true
        }
        Err(e) => {
            warn!(url = %record.source_url, error = %e, "record not saved");
            if let Err(e) = retry.record(&record.source_url) {
                warn!(url = %record.source_url, error = %e, "could not write retry list");
            }
            false
        }
    }
}

fn print_record(record: &ArticleRecord, json: bool) -> Result<()> {
    if json {
        print_json(&serde_json::to_value(record)?)
    } else {
        print!("{}", render(record));
        Ok(())
    }
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<PaperbotError>() {
            return match e {
                PaperbotError::Io(_) => ExitCode::FileSystemError,
                _ => ExitCode::InvalidArgs,
            };
        }
        if let Some(ExtractionFailure::FetchTimeout(_) | ExtractionFailure::FetchFailed(..)) =
            cause.downcast_ref::<ExtractionFailure>()
        {
            return ExitCode::NetworkError;
        }
        match cause.downcast_ref::<ScienceError>() {
            Some(ScienceError::Http(_) | ScienceError::Timeout(_) | ScienceError::RateLimit(..)) => {
                return ExitCode::NetworkError;
            }
            Some(ScienceError::Core(PaperbotError::Io(_))) => return ExitCode::FileSystemError,
            _ => {}
        }
        match cause.downcast_ref::<NotifyError>() {
            Some(NotifyError::Http(_) | NotifyError::RateLimited(_) | NotifyError::Api(..)) => {
                return ExitCode::NetworkError;
            }
            Some(NotifyError::Io(_)) => return ExitCode::FileSystemError,
            Some(NotifyError::Core(PaperbotError::ConfigError(_))) => return ExitCode::InvalidArgs,
            _ => {}
        }
        if cause.is::<std::io::Error>() {
            return ExitCode::FileSystemError;
        }
    }
    ExitCode::GeneralError
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn alert_arg_parses_source_and_path() {
        let (source, path) = parse_alert_arg("stork=mail/stork.html").unwrap();
        assert_eq!(source, AlertSource::Stork);
        assert_eq!(path, PathBuf::from("mail/stork.html"));

        assert!(parse_alert_arg("stork").is_err());
        assert!(parse_alert_arg("imap=x.html").is_err());
    }

    #[test]
    fn links_file_skips_blanks_and_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.txt");
        std::fs::write(&path, "# today\nhttps://a.org/1\tFirst\n\nhttps://a.org/2\n").unwrap();

        let links = read_links(&path).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].title.as_deref(), Some("First"));
        assert_eq!(links[1].title, None);
    }

    #[test]
    fn unsaved_record_goes_on_retry_list() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("out");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = RecordStore::new(&blocker);
        let retry = RetryList::new(dir.path().join("error_links.txt"));

        let record = ArticleRecord::unresolved(
            "https://www.frontiersin.org/articles/10.3389/x/full",
            paperbot_core::RecordKind::Html,
            "Title",
        );
        assert!(!save(&store, &retry, &record));
        assert!(retry.pending().unwrap().contains(&record.source_url));

        let store = RecordStore::new(dir.path().join("records"));
        assert!(save(&store, &retry, &record));
    }

    #[test]
    fn io_errors_map_to_filesystem_exit_code() {
        let err = anyhow::Error::new(PaperbotError::Io(std::io::Error::other("disk")));
        assert!(matches!(exit_code(&err), ExitCode::FileSystemError));

        let err = anyhow::anyhow!("something else");
        assert!(matches!(exit_code(&err), ExitCode::GeneralError));
    }
}
