use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::Parser;
use log::info;

use emails2telegram::bot::telegram::TelegramClient;
use emails2telegram::config::{load_config, resolve_db_path};
use emails2telegram::daemon::relay::Relay;
use emails2telegram::daemon::{DaemonConfig, install_shutdown_handler, run_daemon};
use emails2telegram::mail::imap_client::ImapClient;
use emails2telegram::store::sqlite::SqliteRepo;

#[derive(Parser)]
#[command(name = "emails2telegram")]
#[command(about = "Relay unread mailbox messages into Telegram chats", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/emails2telegram/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Session database, overrides the config file
    #[arg(long)]
    db: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Run one poll-and-relay round and exit
    #[arg(long)]
    once: bool,
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(path) = log_file {
        let file = File::create(path)
            .map_err(|e| anyhow!("cannot open log file {}: {e}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    let cfg = load_config(cli.config.as_deref()).map_err(|e| anyhow!("Configuration error: {e}"))?;
    let db_path = match cli.db {
        Some(p) => p,
        None => resolve_db_path(&cfg)?,
    };
    info!("using session database {}", db_path.display());
    let repo = SqliteRepo::open(&db_path)?;

    let bot = TelegramClient::new(&cfg.api_base, &cfg.api_token, cfg.request_timeout())?;
    let imap = ImapClient::new(cfg.imap_port, cfg.request_timeout(), &cfg.imap_servers);

    let mut relay = Relay::new(&bot, &imap, &repo, cfg.poll_timeout())?;
    let running = install_shutdown_handler()?;

    run_daemon(
        &mut relay,
        DaemonConfig {
            initial_backoff: Duration::from_secs(cfg.error_backoff_secs.max(1)),
            max_backoff: Duration::from_secs(60),
            once: cli.once,
        },
        &running,
    )
}
