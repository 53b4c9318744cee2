//! Runtime orchestration: module selection, registry construction and the
//! update loop.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use rose_runtime::RoseRuntime;
//!
//! let runtime = RoseRuntime::builder()
//!     .catalog(rose_modules::catalog())
//!     .config_file("rose.toml")
//!     .build()?;
//!
//! // `updates` is fed by the platform binding.
//! runtime.run(bot, updates).await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use rose_core::{BoxedBot, Update};
use rose_framework::{Dispatcher, MemoryStore, ModuleCatalog, ModuleEnv, Registry, Store};

use crate::config::{ConfigLoader, RoseConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::handlers::Core;
use crate::logging;

/// A loaded bot: frozen registry plus the dispatcher built over it.
pub struct RoseRuntime {
    config: RoseConfig,
    registry: Arc<Registry>,
    dispatcher: Arc<Dispatcher>,
}

impl RoseRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Builds a runtime with an in-memory store.
    ///
    /// Initializes logging from `config.logging` unless a subscriber is
    /// already installed.
    pub fn from_config(config: RoseConfig, catalog: &ModuleCatalog) -> Self {
        Self::with_store(config, catalog, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: RoseConfig, catalog: &ModuleCatalog, store: Arc<dyn Store>) -> Self {
        logging::init_from_config(&config.logging);

        let env = ModuleEnv::new(store, config.bot.access_control())
            .with_configs(config.module_config.clone());
        let names = catalog.select(config.modules.load.as_slice(), config.modules.no_load.as_slice());
        let registry = Arc::new(Registry::load_all(names.as_slice(), catalog, &env));

        let mut dispatcher = Dispatcher::new(config.bot.command_parser());
        let core = Arc::new(Core::new(&config, Arc::clone(&registry), env.access()));
        dispatcher.extend(core.matchers());
        dispatcher.extend(registry.matchers().cloned());

        info!(
            modules = registry.len(),
            matchers = dispatcher.matcher_count(),
            workers = config.bot.workers,
            "Runtime initialized from configuration"
        );

        Self {
            config,
            registry,
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn config(&self) -> &RoseConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Dispatches one update and waits for every handler to finish.
    ///
    /// Returns `true` if any matcher matched.
    pub async fn handle_update(&self, bot: BoxedBot, update: Update) -> bool {
        self.dispatcher.dispatch(update, bot).await
    }

    /// Processes updates until Ctrl+C / SIGTERM or until `updates` closes.
    pub async fn run(&self, bot: BoxedBot, updates: mpsc::Receiver<Update>) -> RuntimeResult<()> {
        info!("Rose is now running. Press Ctrl+C to stop.");
        let shutdown = async {
            if let Err(e) = wait_for_shutdown().await {
                error!(error = %e, "Running without signal handling");
                std::future::pending::<()>().await;
            }
        };
        self.run_until(bot, updates, shutdown).await
    }

    /// Processes updates until `shutdown` completes or `updates` closes.
    ///
    /// At most `bot.workers` updates are handled at once, each on its own
    /// task. In-flight updates are allowed to finish before returning.
    pub async fn run_until<F>(
        &self,
        bot: BoxedBot,
        mut updates: mpsc::Receiver<Update>,
        shutdown: F,
    ) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let permits = Arc::new(Semaphore::new(self.config.bot.workers));
        let mut tasks = JoinSet::new();
        let mut shutdown = std::pin::pin!(shutdown);

        loop {
            let update = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                next = updates.recv() => match next {
                    Some(update) => update,
                    None => {
                        info!("Update stream closed");
                        break;
                    }
                },
            };

            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            let dispatcher = Arc::clone(&self.dispatcher);
            let bot = Arc::clone(&bot);
            tasks.spawn(async move {
                let _permit = permit;
                dispatcher.dispatch(update, bot).await
            });

            while let Some(done) = tasks.try_join_next() {
                log_finished(done);
            }
        }

        if !tasks.is_empty() {
            debug!(in_flight = tasks.len(), "Waiting for in-flight updates");
        }
        while let Some(done) = tasks.join_next().await {
            log_finished(done);
        }

        info!("Runtime stopped");
        Ok(())
    }
}

fn log_finished(result: Result<bool, tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "Update task panicked");
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_shutdown() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .map_err(RuntimeError::Signal)?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result.map_err(RuntimeError::Signal)?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.map_err(RuntimeError::Signal)?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`RoseRuntime`] loaded through [`ConfigLoader`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    catalog: ModuleCatalog,
    store: Option<Arc<dyn Store>>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir().with_user_config_dir(),
            catalog: ModuleCatalog::default(),
            store: None,
        }
    }

    /// Sets the modules available for loading.
    pub fn catalog(mut self, catalog: ModuleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Sets the store modules persist to (in-memory by default).
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: RoseConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Overrides a single configuration value by dotted key path.
    pub fn set<T: serde::Serialize>(mut self, key: &str, value: T) -> Self {
        self.config_loader = self.config_loader.set(key, value);
        self
    }

    pub fn build(self) -> RuntimeResult<RoseRuntime> {
        let config = self.config_loader.load()?;
        if self.catalog.is_empty() {
            warn!("Building a runtime with an empty module catalog");
        }
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn Store>);
        Ok(RoseRuntime::with_store(config, &self.catalog, store))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
