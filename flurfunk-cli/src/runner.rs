//! Shared setup for commands that talk to a store.
//!
//! Loads configuration, applies global flags, installs logging and builds
//! the backing store.

use std::sync::Arc;
use std::time::Duration;

use flurfunk::config::{ConfigFile, ConfigKey};
use flurfunk::logging::{init_logging, LoggingGuard};
use flurfunk::scheduler::{RefreshScheduler, ResultSnapshot, SchedulerError};
use flurfunk::store::{sample_notes, HttpStore, InMemoryStore, NotePublisher, ProximityStore};
use flurfunk::Coordinate;

use crate::error::CliError;

/// Flags accepted by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub url: Option<String>,
    pub verbose: bool,
    pub demo: bool,
}

/// A store usable for both querying and posting.
pub struct Backend {
    pub store: Arc<dyn ProximityStore>,
    pub publisher: Arc<dyn NotePublisher>,
    pub description: String,
}

/// Configuration plus logging for one CLI invocation.
pub struct CliRunner {
    config: ConfigFile,
    demo: bool,
    _logging: LoggingGuard,
}

impl CliRunner {
    pub fn new(options: &GlobalOptions) -> Result<Self, CliError> {
        let mut config = ConfigFile::load()?;

        // CLI takes precedence over config
        if let Some(url) = &options.url {
            ConfigKey::StoreUrl.set(&mut config, url)?;
        }

        let mut logging = config.logging_config().with_stderr(options.verbose);
        if options.verbose {
            logging = logging.with_level("debug");
        }
        let guard = init_logging(&logging)?;

        Ok(Self {
            config,
            demo: options.demo,
            _logging: guard,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn log_startup(&self, command: &str) {
        tracing::info!(
            version = flurfunk::VERSION,
            command,
            demo = self.demo,
            store_url = %self.config.store.url,
            "Flurfunk CLI starting"
        );
    }

    /// Build the backing store.
    ///
    /// In demo mode this is an in-memory store seeded with sample notes
    /// around `near`; otherwise the configured HTTP store.
    pub async fn create_backend(&self, near: Coordinate) -> Result<Backend, CliError> {
        if self.demo {
            let store = Arc::new(InMemoryStore::with_notes(sample_notes(near)));
            return Ok(Backend {
                store: store.clone(),
                publisher: store,
                description: "in-memory demo store".to_string(),
            });
        }

        let store = Arc::new(HttpStore::new(self.config.http_store_config())?);
        if !store.health().await {
            tracing::warn!(url = %store.config().base_url, "Store health check failed");
        }
        let description = store.config().base_url.clone();
        Ok(Backend {
            store: store.clone(),
            publisher: store,
            description,
        })
    }

    /// Start a refresh session using the configured query settings.
    pub fn spawn_scheduler(&self, backend: &Backend, user: Coordinate) -> RefreshScheduler {
        RefreshScheduler::spawn(
            Arc::clone(&backend.store),
            self.config.scheduler_config(),
            user,
        )
    }

    /// How long to wait for a single refresh: the store timeout plus the
    /// debounce delay, with a little slack.
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.config.store.timeout_secs)
            + Duration::from_millis(self.config.query.debounce_ms)
            + Duration::from_secs(1)
    }
}

/// Wait until the session publishes sequence `min_sequence` or later, or
/// reports a failure, whichever comes first.
pub async fn wait_for_refresh(
    scheduler: &RefreshScheduler,
    min_sequence: u64,
    timeout: Duration,
) -> Result<ResultSnapshot, CliError> {
    let mut updates = scheduler.subscribe();

    let wait = async {
        loop {
            {
                let snapshot = updates.borrow_and_update();
                if is_settled(&snapshot, min_sequence) {
                    return Ok(snapshot.clone());
                }
            }
            if updates.changed().await.is_err() {
                return Err(CliError::Session(SchedulerError::Closed));
            }
        }
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(result) => result,
        Err(_) => Err(CliError::Timeout(timeout.as_secs())),
    }
}

fn is_settled(snapshot: &ResultSnapshot, min_sequence: u64) -> bool {
    !snapshot.is_in_flight() && (snapshot.sequence >= min_sequence || snapshot.failed())
}
