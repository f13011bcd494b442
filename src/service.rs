//! Service Wiring
//!
//! Builds the shared collaborators once and spawns the long-running tasks.
//! The poll loop and the event dispatcher feeding the hooks talk to the game
//! server through one serialized channel; a sweep purges expired keys.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::audit::{AuditSink, DiscordWebhookAudit};
use crate::automod::{
    AutomodHooks, DeferredNotifier, EventBus, ModeratorFactory, ModeratorRegistry, PollLoop,
    PunitionExecutor, WarmupGuard,
};
use crate::config::AutomodConfig;
use crate::rcon::{CommandChannel, RconHttpClient, SerializedChannel};
use crate::store::{
    ConfigStore, DEFAULT_SWEEP_INTERVAL, JsonFileConfigStore, KeyStore, MemoryConfigStore,
    MemoryKeyStore, spawn_sweeper,
};

pub struct AutomodService {
    config: AutomodConfig,
    channel: Arc<dyn CommandChannel>,
    audit: Arc<dyn AuditSink>,
    key_store: Arc<dyn KeyStore>,
    config_store: Arc<dyn ConfigStore>,
    factories: Vec<Arc<dyn ModeratorFactory>>,
}

impl AutomodService {
    /// Service over an arbitrary channel, with in-memory stores and a
    /// webhook audit sink
    pub fn new<C: CommandChannel + 'static>(config: AutomodConfig, channel: C) -> Result<Self> {
        let audit = DiscordWebhookAudit::new(&config.audit)?;
        let config_store: Arc<dyn ConfigStore> = match &config.engine.moderator_config_path {
            Some(path) => Arc::new(JsonFileConfigStore::new(path.clone())),
            None => Arc::new(MemoryConfigStore::new()),
        };

        Ok(Self {
            config,
            channel: Arc::new(SerializedChannel::new(channel)),
            audit: Arc::new(audit),
            key_store: Arc::new(MemoryKeyStore::new()),
            config_store,
            factories: Vec::new(),
        })
    }

    /// Service talking to the HTTP command API described by `config.rcon`
    pub fn from_config(config: AutomodConfig) -> Result<Self> {
        let client = RconHttpClient::new(config.rcon.clone())
            .context("Failed to create command channel client")?;
        Self::new(config, client)
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_key_store(mut self, key_store: Arc<dyn KeyStore>) -> Self {
        self.key_store = key_store;
        self
    }

    pub fn with_config_store(mut self, config_store: Arc<dyn ConfigStore>) -> Self {
        self.config_store = config_store;
        self
    }

    pub fn with_factory(mut self, factory: Arc<dyn ModeratorFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    /// The serialized channel every component shares
    pub fn channel(&self) -> Arc<dyn CommandChannel> {
        self.channel.clone()
    }

    /// Spawn the poll loop and subscribe the hooks to `events`
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self, events: &EventBus) -> AutomodHandle {
        let engine = &self.config.engine;

        let mut registry = ModeratorRegistry::new(self.config_store, self.key_store.clone());
        for factory in self.factories {
            registry.register(factory);
        }
        let registry = Arc::new(registry);

        let sweep_task = spawn_sweeper(self.key_store.clone(), DEFAULT_SWEEP_INTERVAL);

        let executor = Arc::new(PunitionExecutor::new(self.channel.clone(), self.audit));
        let guard = Arc::new(WarmupGuard::with_ttl(self.key_store, engine.warmup_ttl()));
        let notifier = Arc::new(DeferredNotifier::with_delay(
            self.channel.clone(),
            engine.notify_delay(),
        ));

        let hooks = Arc::new(AutomodHooks::new(
            self.channel.clone(),
            registry.clone(),
            executor.clone(),
            guard.clone(),
            notifier.clone(),
        ));
        let dispatch_task = events.spawn_handler(hooks);

        let poll = PollLoop::new(self.channel, registry.clone(), executor, guard)
            .with_interval(engine.poll_interval());
        let poll_task = tokio::spawn(async move { poll.run().await });

        info!(
            "Automod service started with {} moderator kind(s)",
            registry.factory_count()
        );

        AutomodHandle {
            poll_task,
            dispatch_task,
            sweep_task,
            notifier,
        }
    }
}

/// Running service
pub struct AutomodHandle {
    poll_task: JoinHandle<Result<()>>,
    dispatch_task: JoinHandle<()>,
    sweep_task: JoinHandle<()>,
    notifier: Arc<DeferredNotifier>,
}

impl AutomodHandle {
    /// The poll loop task; it only completes when a cycle fails
    pub fn poll_task(&mut self) -> &mut JoinHandle<Result<()>> {
        &mut self.poll_task
    }

    pub fn notifier(&self) -> &DeferredNotifier {
        &self.notifier
    }

    /// Stop every task and drop every pending notification
    pub fn shutdown(self) {
        self.poll_task.abort();
        self.dispatch_task.abort();
        self.sweep_task.abort();
        self.notifier.cancel_all();
        info!("Automod service stopped");
    }
}
