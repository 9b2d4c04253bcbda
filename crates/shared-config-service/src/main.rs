//! `shared-config` command-line host.
//!
//! Stands in for the presentation layer: every subcommand goes through one
//! [`SyncCore`], exactly as a UI process would.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ ServiceSettings::resolve()   -- flags > env > settings file > defaults
//!  └─ SyncCore::with_file_watcher() -- bootstrap, first load, subscribe
//!       ├─ show   -- print current()
//!       ├─ set    -- current() + overrides -> update()
//!       └─ watch  -- print each reload until Ctrl-C
//!  └─ SyncCore::shutdown()
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{bail, Context};
use chrono::{DateTime, Local};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use shared_config_core::ConfigRecord;
use shared_config_service::domain::settings::SettingsFile;
use shared_config_service::{ServiceSettings, SyncCore};

/// How often `watch` checks the core for completed reloads.
const WATCH_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Parser)]
#[command(name = "shared-config", version, about = "Shared XML configuration store")]
struct Cli {
    /// Shared configuration document.
    #[arg(long, env = "SHARED_CONFIG_PATH", global = true)]
    config_path: Option<PathBuf>,

    /// Debounce window for change notifications, in milliseconds.
    #[arg(long, env = "SHARED_CONFIG_DEBOUNCE_MS", global = true)]
    debounce_ms: Option<u64>,

    /// Optional TOML settings file.
    #[arg(long, env = "SHARED_CONFIG_SETTINGS", global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the current configuration.
    Show,
    /// Change one or more fields and save.
    Set(SetArgs),
    /// Print the configuration every time the file changes, until Ctrl-C.
    Watch,
}

#[derive(Debug, Args)]
struct SetArgs {
    #[arg(long)]
    app_name: Option<String>,

    #[arg(long)]
    database_connection: Option<String>,

    /// Seconds, 1 to 300.
    #[arg(long, allow_hyphen_values = true)]
    api_timeout: Option<i32>,

    #[arg(long)]
    enable_logging: Option<bool>,

    /// 1 to 10000.
    #[arg(long, allow_hyphen_values = true)]
    max_users: Option<i32>,
}

impl SetArgs {
    fn apply(self, record: ConfigRecord) -> ConfigRecord {
        ConfigRecord {
            app_name: self.app_name.unwrap_or(record.app_name),
            database_connection: self
                .database_connection
                .unwrap_or(record.database_connection),
            api_timeout: self.api_timeout.unwrap_or(record.api_timeout),
            enable_logging: self.enable_logging.unwrap_or(record.enable_logging),
            max_users: self.max_users.unwrap_or(record.max_users),
            last_updated: record.last_updated,
        }
    }

    fn is_empty(&self) -> bool {
        self.app_name.is_none()
            && self.database_connection.is_none()
            && self.api_timeout.is_none()
            && self.enable_logging.is_none()
            && self.max_users.is_none()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `show` output stays clean.  Level is overridden by
    // `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let file = cli
        .settings
        .as_deref()
        .map(SettingsFile::load)
        .transpose()
        .context("failed to load settings file")?;
    let settings = ServiceSettings::resolve(file, cli.config_path, cli.debounce_ms);

    let core = SyncCore::with_file_watcher(&settings).with_context(|| {
        format!(
            "failed to open shared configuration at {}",
            settings.config_path.display()
        )
    })?;

    let result = match cli.command {
        Command::Show => {
            print_record(core.config_path(), &core.current());
            Ok(())
        }
        Command::Set(args) => set(&core, args),
        Command::Watch => watch(&core).await,
    };

    core.shutdown();
    result
}

fn set(core: &SyncCore, args: SetArgs) -> anyhow::Result<()> {
    if args.is_empty() {
        bail!("nothing to set; pass at least one field option");
    }

    let record = args.apply(core.current());
    if !core.update(record) {
        bail!("failed to save configuration; check the values and try again");
    }

    println!("Configuration saved.");
    print_record(core.config_path(), &core.current());
    Ok(())
}

async fn watch(core: &SyncCore) -> anyhow::Result<()> {
    if !core.live_reload_active() {
        bail!("live reload is unavailable for {}", core.config_path().display());
    }

    info!(path = %core.config_path().display(), "watching for changes.  Press Ctrl-C to exit.");
    print_record(core.config_path(), &core.cached());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(WATCH_POLL);
    let mut seen = core.reload_count();

    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                signal.context("failed to listen for Ctrl-C")?;
                info!("shutdown signal received");
                return Ok(());
            }
            _ = ticker.tick() => {
                let reloads = core.reload_count();
                if reloads != seen {
                    seen = reloads;
                    println!();
                    print_record(core.config_path(), &core.cached());
                }
            }
        }
    }
}

fn print_record(path: &Path, record: &ConfigRecord) {
    print!("{}", render_record(path, record));
}

/// Every view shows which file it reflects.
fn render_record(path: &Path, record: &ConfigRecord) -> String {
    format!(
        "Config file:         {}\n\
         App name:            {}\n\
         Database connection: {}\n\
         API timeout:         {} s\n\
         Logging enabled:     {}\n\
         Max users:           {}\n\
         Last updated:        {}\n",
        path.display(),
        record.app_name,
        record.database_connection,
        record.api_timeout,
        record.enable_logging,
        record.max_users,
        local_time(record.last_updated),
    )
}

fn local_time(at: SystemTime) -> String {
    DateTime::<Local>::from(at)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
