//! slowwatch
//!
//! Polls HTTP targets through a monitored client and reports when the
//! connection turns slow.
//!
//! ```text
//!   targets ──▶ MonitoredClient ──▶ SlowRequestLayer ──▶ network
//!                                        │
//!                                        ▼
//!                               SlowRequestMonitor ──▶ slow_network signal ──▶ log
//! ```

use clap::{Parser, Subcommand};
use std::error::Error;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use slow_request_monitor::config::{
    load_config, validate_config, AppConfig, ConfigWatcher, ObservabilityConfig,
};
use slow_request_monitor::error::ConfigError;
use slow_request_monitor::http::slow_backend;
use slow_request_monitor::lifecycle::{wait_for_shutdown_signal, Shutdown};
use slow_request_monitor::observability::{logging, metrics};
use slow_request_monitor::{MonitoredClient, SlowRequestMonitor};

#[derive(Parser)]
#[command(name = "slowwatch")]
#[command(about = "Flag slow HTTP responses the way a GUI banner would", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll targets and report slow-network transitions
    Watch {
        /// TOML config file; reloaded when it changes
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the slow threshold in milliseconds
        #[arg(short, long)]
        threshold_ms: Option<u64>,

        /// Targets to poll (replaces the configured list)
        urls: Vec<String>,
    },
    /// Run a backend that answers every request late
    ServeSlow {
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,

        /// Default response delay; `?delay_ms=N` overrides per request
        #[arg(short, long, default_value_t = 4000)]
        delay_ms: u64,
    },
    /// Validate a config file and print the effective configuration
    CheckConfig { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            config,
            threshold_ms,
            urls,
        } => run_watch(config, threshold_ms, urls).await,
        Commands::ServeSlow { bind, delay_ms } => run_serve_slow(bind, delay_ms).await,
        Commands::CheckConfig { path } => {
            let config = load_config(&path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn run_watch(
    config_path: Option<PathBuf>,
    threshold_ms: Option<u64>,
    urls: Vec<String>,
) -> Result<(), Box<dyn Error>> {
    let overrides = Overrides { threshold_ms, urls };
    let mut config = match &config_path {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability)?;
    init_metrics(&config.observability);

    tracing::info!(
        threshold_ms = config.monitor.threshold_ms,
        targets = ?config.watch.targets,
        interval_ms = config.watch.interval_ms,
        "slowwatch starting"
    );

    let monitor = SlowRequestMonitor::new(config.monitor.clone());
    let client = MonitoredClient::new(monitor.clone(), &config.client);

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());
    spawn_transition_logger(&monitor);

    // Keep the watcher (or the idle sender) alive for the whole loop.
    let (_watcher, mut updates, _idle_tx) = match &config_path {
        Some(path) => start_config_watcher(path)?,
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (None, rx, Some(tx))
        }
    };

    let mut ticker = tokio::time::interval(Duration::from_millis(config.watch.interval_ms));
    let mut stop = shutdown.subscribe();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for target in &config.watch.targets {
                    spawn_fetch(client.clone(), target.clone());
                }
            }
            Some(mut update) = updates.recv() => {
                overrides.apply(&mut update);
                let reload = apply_reload(&mut config, update);
                if reload.monitor {
                    monitor.reconfigure(config.monitor.clone());
                }
                if reload.interval {
                    ticker = tokio::time::interval(Duration::from_millis(config.watch.interval_ms));
                }
                tracing::info!(
                    applied = ?reload.applied(),
                    ignored = ?reload.ignored,
                    "Config reloaded"
                );
            }
            _ = stop.recv() => break,
        }
    }

    monitor.shutdown();
    tracing::info!(
        warnings = monitor.warnings_published(),
        "slowwatch stopped"
    );
    Ok(())
}

/// Command-line values that win over the config file on every load.
#[derive(Debug, Default)]
struct Overrides {
    threshold_ms: Option<u64>,
    urls: Vec<String>,
}

impl Overrides {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(threshold_ms) = self.threshold_ms {
            config.monitor.threshold_ms = threshold_ms;
        }
        if !self.urls.is_empty() {
            config.watch.targets = self.urls.clone();
        }
    }
}

/// What a reload changed.
#[derive(Debug, Default, PartialEq)]
struct Reload {
    monitor: bool,
    watch: bool,
    interval: bool,
    /// Changed sections that only take effect on restart.
    ignored: Vec<&'static str>,
}

impl Reload {
    fn applied(&self) -> Vec<&'static str> {
        let mut applied = Vec::new();
        if self.monitor {
            applied.push("monitor");
        }
        if self.watch {
            applied.push("watch");
        }
        applied
    }
}

/// Fold a reloaded config into the running one. `client` and
/// `observability` are fixed at startup and are kept as they are.
fn apply_reload(current: &mut AppConfig, update: AppConfig) -> Reload {
    let mut reload = Reload {
        monitor: current.monitor != update.monitor,
        watch: current.watch != update.watch,
        interval: current.watch.interval_ms != update.watch.interval_ms,
        ignored: Vec::new(),
    };
    if current.client != update.client {
        reload.ignored.push("client");
    }
    if current.observability != update.observability {
        reload.ignored.push("observability");
    }

    current.monitor = update.monitor;
    current.watch = update.watch;
    reload
}

type WatcherParts = (
    Option<notify::RecommendedWatcher>,
    mpsc::UnboundedReceiver<AppConfig>,
    Option<mpsc::UnboundedSender<AppConfig>>,
);

fn start_config_watcher(path: &Path) -> Result<WatcherParts, notify::Error> {
    let (watcher, updates) = ConfigWatcher::new(path);
    let watcher = watcher.run()?;
    Ok((Some(watcher), updates, None))
}

fn init_metrics(config: &ObservabilityConfig) {
    if !config.metrics_enabled {
        return;
    }
    // Validation already checked the address.
    match config.metrics_address.parse() {
        Ok(addr) => {
            if let Err(e) = metrics::init_metrics(addr) {
                tracing::error!(error = %e, "Failed to start metrics endpoint");
            }
        }
        Err(_) => tracing::error!(
            metrics_address = %config.metrics_address,
            "Failed to parse metrics address"
        ),
    }
}

fn spawn_signal_handler(shutdown: Shutdown) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        shutdown.trigger();
    });
}

fn spawn_transition_logger(monitor: &SlowRequestMonitor) {
    let mut slow = monitor.slow_network().subscribe();
    let monitor = monitor.clone();
    tokio::spawn(async move {
        while slow.changed().await.is_ok() {
            let is_slow = *slow.borrow_and_update();
            if is_slow {
                tracing::warn!(
                    home_visible = monitor.home_visible().get(),
                    "Connection is slow"
                );
            } else {
                tracing::info!("Connection back to normal");
            }
        }
    });
}

fn spawn_fetch(client: MonitoredClient, target: String) {
    tokio::spawn(async move {
        match client.get(&target).await {
            Ok(outcome) => tracing::debug!(
                target = %target,
                status = %outcome.status,
                bytes = outcome.body_bytes,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "Fetched"
            ),
            Err(e) => tracing::warn!(target = %target, error = %e, "Fetch failed"),
        }
    });
}

async fn run_serve_slow(bind: SocketAddr, delay_ms: u64) -> Result<(), Box<dyn Error>> {
    logging::init(&ObservabilityConfig::default())?;

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let listener = TcpListener::bind(bind).await?;
    slow_backend::serve(listener, Duration::from_millis(delay_ms), shutdown.subscribe()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use slow_request_monitor::config::ClientConfig;

    fn file_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.monitor.threshold_ms = 3000;
        config.watch.targets = vec!["http://file.example/".into()];
        config
    }

    #[test]
    fn overrides_survive_reload() {
        let overrides = Overrides {
            threshold_ms: Some(500),
            urls: vec!["http://cli.example/".into()],
        };
        let mut running = file_config();
        overrides.apply(&mut running);

        let mut update = file_config();
        update.watch.interval_ms = 250;
        overrides.apply(&mut update);
        let reload = apply_reload(&mut running, update);

        assert_eq!(running.monitor.threshold_ms, 500);
        assert_eq!(running.watch.targets, vec!["http://cli.example/".to_string()]);
        assert_eq!(running.watch.interval_ms, 250);
        assert!(!reload.monitor);
        assert!(reload.interval);
        assert_eq!(reload.applied(), vec!["watch"]);
    }

    #[test]
    fn file_values_apply_without_overrides() {
        let mut running = file_config();
        let mut update = file_config();
        update.monitor.threshold_ms = 1200;
        Overrides::default().apply(&mut update);

        let reload = apply_reload(&mut running, update);
        assert_eq!(running.monitor.threshold_ms, 1200);
        assert!(reload.monitor);
        assert!(!reload.watch);
    }

    #[test]
    fn restart_only_sections_are_reported_and_kept() {
        let mut running = file_config();
        let mut update = file_config();
        update.client.request_timeout_secs = 99;
        update.observability.log_level = "debug".into();

        let reload = apply_reload(&mut running, update);
        assert_eq!(reload.ignored, vec!["client", "observability"]);
        assert!(reload.applied().is_empty());
        assert_eq!(running.client, ClientConfig::default());
        assert_eq!(running.observability.log_level, "info");
    }
}
