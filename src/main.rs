use clap::Parser;
use log::{debug, error, info, warn};
use metrowatch::alerts::NotificationCenter;
use metrowatch::config::Config;
use metrowatch::dispatch::{Dispatcher, EmailChannel};
use metrowatch::error::ConfigError;
use metrowatch::poller::PollLoop;
use metrowatch::source::HttpSource;
use metrowatch::store::{HealthStore, PollStatus};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Command-line arguments for the metropolitan health monitor
#[derive(Parser)]
#[command(
    name = "metrowatch",
    about = "Metropolitan health monitor - polling, threshold alerting and notifications",
    long_about = "Polls an aggregated health-data endpoint for environmental readings, \
                  disease outbreaks and flood forecasts, evaluates fixed alert thresholds \
                  on every snapshot, and surfaces each condition exactly once per session \
                  through in-app notifications and email alerts."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files are handled gracefully by load_config, which
            // warns and falls back to defaults
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

/// Main application struct that orchestrates the health monitor components
///
/// HealthMonitor wires the snapshot source, health store, notification
/// center, dispatcher and poll loop together, and manages their lifecycle
/// including graceful shutdown.
pub struct HealthMonitor {
    /// Latest-snapshot store with change subscriptions
    store: Arc<HealthStore>,

    /// In-app notification center
    notifications: Arc<Mutex<NotificationCenter>>,

    /// Interval-driven poll loop
    poll: PollLoop,

    /// Background tasks logging store and badge changes
    watcher_tasks: Vec<JoinHandle<()>>,
}

impl HealthMonitor {
    /// Create a new HealthMonitor from the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or if the HTTP
    /// clients cannot be constructed.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        info!("Initializing HealthMonitor with configuration");

        let source = Arc::new(HttpSource::new(
            config.source.endpoint.clone(),
            Duration::from_secs(config.source.timeout_seconds),
        )?);

        let channel = Arc::new(EmailChannel::new(
            config.email.endpoint.clone(),
            Duration::from_secs(config.email.timeout_seconds),
        )?);
        let dispatcher = Arc::new(Dispatcher::new(
            channel,
            config.email.recipient.clone(),
            config.thresholds.heatwave_temp_c,
        ));

        let store = Arc::new(HealthStore::new());
        let notifications = Arc::new(Mutex::new(NotificationCenter::new()));

        let poll = PollLoop::new(
            config.poll_interval(),
            config.thresholds.clone(),
            source,
            Arc::clone(&store),
            Arc::clone(&notifications),
            dispatcher,
        )?;

        Ok(HealthMonitor {
            store,
            notifications,
            poll,
            watcher_tasks: Vec::new(),
        })
    }

    /// Load configuration from file or use defaults
    ///
    /// A missing or invalid file is reported and replaced with defaults so
    /// the monitor always comes up.
    pub fn load_config(config_path: Option<&Path>) -> Result<Config, ConfigError> {
        match config_path {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                match Config::from_file(path) {
                    Ok(config) => Ok(config),
                    Err(ConfigError::ReadError(_)) => {
                        warn!(
                            "Configuration file '{}' not found or unreadable, using defaults",
                            path.display()
                        );
                        Ok(Config::default())
                    }
                    Err(e) => {
                        error!("Configuration error in '{}': {}", path.display(), e);
                        warn!("Using default configuration due to invalid config file");
                        Ok(Config::default())
                    }
                }
            }
            None => {
                info!("Using default configuration");
                Ok(Config::default())
            }
        }
    }

    /// Start the poll loop and the background watcher tasks
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError` if the poll loop is already running.
    pub fn start(&mut self) -> anyhow::Result<()> {
        info!("Starting HealthMonitor components");

        self.poll.start()?;
        info!("Poll loop started");

        self.spawn_status_watcher();
        self.spawn_badge_watcher();

        info!("All HealthMonitor components started successfully");
        Ok(())
    }

    /// Stop the poll loop and the background watcher tasks
    pub fn stop(&mut self) {
        info!("Stopping HealthMonitor components");

        self.poll.stop();

        for handle in self.watcher_tasks.drain(..) {
            handle.abort();
        }

        info!("HealthMonitor stopped successfully");
    }

    /// Spawn the task that logs poll status transitions
    fn spawn_status_watcher(&mut self) {
        let mut status_rx = self.store.subscribe_status();
        let store = Arc::clone(&self.store);

        let handle = tokio::spawn(async move {
            while status_rx.changed().await.is_ok() {
                let status = status_rx.borrow().clone();
                match status {
                    PollStatus::Healthy { at } => {
                        debug!(
                            "Poll healthy at {}, {} active outbreak(s)",
                            at,
                            store.active_outbreak_count()
                        );
                    }
                    PollStatus::Failed { at, message } => {
                        warn!("Poll failing since {}: {}", at, message);
                    }
                    PollStatus::Idle => {}
                }
            }
        });

        self.watcher_tasks.push(handle);
    }

    /// Spawn the task that logs unread-notification badge changes
    fn spawn_badge_watcher(&mut self) {
        let badge_rx = match self.notifications.lock() {
            Ok(center) => center.subscribe_badge(),
            Err(_) => {
                error!("Notification center lock poisoned, badge watcher not started");
                return;
            }
        };

        let handle = tokio::spawn(async move {
            let mut badge_rx = badge_rx;
            while badge_rx.changed().await.is_ok() {
                let unread = *badge_rx.borrow();
                info!("Unread notifications: {}", unread);
            }
        });

        self.watcher_tasks.push(handle);
    }
}

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    info!("Starting metropolitan health monitor");

    // Validate CLI arguments
    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    // Load configuration
    let config = match HealthMonitor::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Create the health monitor
    let mut monitor = match HealthMonitor::new(config) {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("Failed to initialize HealthMonitor: {}", e);
            std::process::exit(1);
        }
    };

    info!("HealthMonitor initialized successfully");

    // Start the monitor
    if let Err(e) = monitor.start() {
        error!("Failed to start HealthMonitor: {}", e);
        std::process::exit(1);
    }

    // Set up signal handling for graceful shutdown (SIGINT)
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::unbounded_channel();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received interrupt signal (SIGINT), shutting down gracefully...");
        let _ = shutdown_tx.send(());
    }) {
        error!("Error setting SIGINT handler: {}", e);
        std::process::exit(1);
    }

    info!("Health monitor is running. Press Ctrl+C to stop.");

    // Wait for shutdown
    if shutdown_rx.recv().await.is_none() {
        error!("Shutdown channel closed unexpectedly");
    }

    // Stop the monitor
    monitor.stop();

    info!("HealthMonitor shutdown complete");
}
