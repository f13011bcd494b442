use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::AuditConfig;

/// Destination for audit records
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn publish(&self, target: &Url, command_name: &str, message: &str, author: &str);
}

/// Posts audit records to a Discord-compatible webhook
///
/// Delivery runs detached from the caller, so a slow webhook never holds
/// up enforcement. Records may therefore arrive out of order.
#[derive(Debug, Clone)]
pub struct DiscordWebhookAudit {
    client: Client,
    username: String,
}

impl DiscordWebhookAudit {
    pub fn new(config: &AuditConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("SquadAutomod/1.0")
            .build()
            .context("Failed to create webhook HTTP client")?;

        Ok(Self {
            client,
            username: config.username.clone(),
        })
    }

    fn payload(&self, command_name: &str, message: &str, author: &str) -> serde_json::Value {
        json!({
            "username": self.username,
            "content": format!("**{}** by {}: {}", command_name, author, message),
            "allowed_mentions": { "parse": [] },
        })
    }
}

#[async_trait]
impl AuditSink for DiscordWebhookAudit {
    /// Hands the post to a background task and returns at once
    async fn publish(&self, target: &Url, command_name: &str, message: &str, author: &str) {
        let payload = self.payload(command_name, message, author);
        let request = self.client.post(target.clone()).json(&payload);
        let command_name = command_name.to_string();

        tokio::spawn(async move {
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!("Audit record delivered: {}", command_name);
                }
                Ok(resp) => {
                    warn!(
                        "Audit webhook answered {} for {} record",
                        resp.status(),
                        command_name
                    );
                }
                Err(e) => {
                    warn!("Audit webhook unreachable for {} record: {}", command_name, e);
                }
            }
        });
    }
}

/// Sink that only traces records
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAudit;

#[async_trait]
impl AuditSink for NoopAudit {
    async fn publish(&self, target: &Url, command_name: &str, message: &str, author: &str) {
        debug!(
            target_url = %target,
            "AUDIT (not delivered): {} by {}: {}",
            command_name,
            author,
            message
        );
    }
}
