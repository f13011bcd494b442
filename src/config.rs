use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Configuration for the automod engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutomodConfig {
    /// Game server command channel
    pub rcon: RconConfig,
    /// Poll loop, warm-up and notifier timing
    pub engine: EngineConfig,
    /// Audit webhook delivery
    pub audit: AuditConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RconConfig {
    /// Base URL of the server's JSON command API
    pub base_url: String,
    /// Bearer token sent with every request
    pub api_key: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Attempts for idempotent reads
    pub max_retries: u32,
    /// Delay between read attempts
    pub retry_delay_ms: u64,
}

impl Default for RconConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8010/".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Idle time between two poll cycles
    pub poll_interval_secs: u64,
    /// How long a completed poll cycle keeps event hooks enabled
    pub warmup_ttl_secs: u64,
    /// Grace delay before messaging a just-connected player
    pub notify_delay_secs: u64,
    /// JSON file holding per-moderator configuration, re-read every cycle
    pub moderator_config_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            warmup_ttl_secs: 4 * 60,
            notify_delay_secs: 20,
            moderator_config_path: None,
        }
    }
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn warmup_ttl(&self) -> Duration {
        Duration::from_secs(self.warmup_ttl_secs)
    }

    pub fn notify_delay(&self) -> Duration {
        Duration::from_secs(self.notify_delay_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Webhook request timeout in seconds
    pub timeout_secs: u64,
    /// Display name used for webhook posts
    pub username: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            username: "Automod".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Emit span open/close events
    pub log_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_spans: false,
        }
    }
}

impl AutomodConfig {
    /// Load configuration from environment variables and validate it
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Command channel
        if let Ok(url) = env::var("AUTOMOD_RCON_URL") {
            config.rcon.base_url = url;
        }

        match env::var("AUTOMOD_RCON_API_KEY") {
            Ok(key) => config.rcon.api_key = key,
            Err(_) => warn!("AUTOMOD_RCON_API_KEY not set, commands will be sent unauthenticated"),
        }

        if let Ok(timeout) = env::var("AUTOMOD_RCON_TIMEOUT_SECS") {
            config.rcon.timeout_secs = timeout
                .parse()
                .context("Invalid AUTOMOD_RCON_TIMEOUT_SECS value")?;
        }

        if let Ok(retries) = env::var("AUTOMOD_RCON_MAX_RETRIES") {
            config.rcon.max_retries = retries
                .parse()
                .context("Invalid AUTOMOD_RCON_MAX_RETRIES value")?;
        }

        if let Ok(delay) = env::var("AUTOMOD_RCON_RETRY_DELAY_MS") {
            config.rcon.retry_delay_ms = delay
                .parse()
                .context("Invalid AUTOMOD_RCON_RETRY_DELAY_MS value")?;
        }

        // Engine timing
        if let Ok(interval) = env::var("AUTOMOD_POLL_INTERVAL_SECS") {
            config.engine.poll_interval_secs = interval
                .parse()
                .context("Invalid AUTOMOD_POLL_INTERVAL_SECS value")?;
        }

        if let Ok(ttl) = env::var("AUTOMOD_WARMUP_TTL_SECS") {
            config.engine.warmup_ttl_secs =
                ttl.parse().context("Invalid AUTOMOD_WARMUP_TTL_SECS value")?;
        }

        if let Ok(delay) = env::var("AUTOMOD_NOTIFY_DELAY_SECS") {
            config.engine.notify_delay_secs = delay
                .parse()
                .context("Invalid AUTOMOD_NOTIFY_DELAY_SECS value")?;
        }

        if let Ok(path) = env::var("AUTOMOD_MODERATOR_CONFIG") {
            config.engine.moderator_config_path = Some(PathBuf::from(path));
        }

        // Audit
        if let Ok(timeout) = env::var("AUTOMOD_AUDIT_TIMEOUT_SECS") {
            config.audit.timeout_secs = timeout
                .parse()
                .context("Invalid AUTOMOD_AUDIT_TIMEOUT_SECS value")?;
        }

        if let Ok(username) = env::var("AUTOMOD_AUDIT_USERNAME") {
            config.audit.username = username;
        }

        // Logging
        if let Ok(level) = env::var("AUTOMOD_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(spans) = env::var("AUTOMOD_LOG_SPANS") {
            config.logging.log_spans = spans.parse().context("Invalid AUTOMOD_LOG_SPANS value")?;
        }

        config.validate()?;

        info!(
            "Automod configured: rcon={} key={} poll={}s warmup={}s notify_delay={}s",
            config.rcon.base_url,
            sanitize_for_logging(&config.rcon.api_key),
            config.engine.poll_interval_secs,
            config.engine.warmup_ttl_secs,
            config.engine.notify_delay_secs
        );

        Ok(config)
    }

    /// Validate configuration for consistency
    pub fn validate(&self) -> Result<()> {
        if self.rcon.base_url.is_empty() {
            return Err(anyhow::anyhow!("Command channel URL cannot be empty"));
        }

        let url = Url::parse(&self.rcon.base_url)
            .with_context(|| format!("Invalid command channel URL: {}", self.rcon.base_url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(anyhow::anyhow!(
                "Command channel URL must be http or https: {}",
                self.rcon.base_url
            ));
        }

        if self.rcon.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Command channel timeout must be non-zero"));
        }

        if self.rcon.max_retries == 0 {
            return Err(anyhow::anyhow!("Command channel retries must be at least 1"));
        }

        if self.engine.poll_interval_secs == 0 {
            return Err(anyhow::anyhow!("Poll interval must be non-zero"));
        }

        // The guard must outlive the gap between two healthy cycles
        if self.engine.warmup_ttl_secs <= self.engine.poll_interval_secs {
            return Err(anyhow::anyhow!(
                "Warm-up TTL ({}s) must exceed the poll interval ({}s)",
                self.engine.warmup_ttl_secs,
                self.engine.poll_interval_secs
            ));
        }

        if self.audit.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Audit timeout must be non-zero"));
        }

        Ok(())
    }
}

/// Mask a secret for logging, keeping only its edges
pub fn sanitize_for_logging(secret: &str) -> String {
    if secret.is_empty() {
        return "<unset>".to_string();
    }

    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }

    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}
