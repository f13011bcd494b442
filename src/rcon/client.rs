//! HTTP client for the game server's JSON command API
//!
//! Every response is an envelope `{ "result": ..., "failed": bool, "error": ... }`.
//! Reads are retried on transport failures; commands are sent once and left
//! to the next evaluation cycle when they fail.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::channel::{ChannelError, CommandChannel};
use crate::config::RconConfig;
use crate::game::{DetailedPlayer, GameState, PlayerRef, TeamView};

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    result: Option<T>,
    #[serde(default)]
    failed: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RconHttpClient {
    config: RconConfig,
    base_url: Url,
    http_client: Client,
}

impl RconHttpClient {
    pub fn new(config: RconConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid command channel URL: {}", config.base_url))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("SquadAutomod/1.0")
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                if !config.api_key.is_empty() {
                    if let Ok(val) =
                        reqwest::header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                    {
                        headers.insert(reqwest::header::AUTHORIZATION, val);
                    }
                }
                headers
            })
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            base_url,
            http_client,
        })
    }

    fn endpoint(&self, command: &str) -> Result<Url, ChannelError> {
        self.base_url
            .join(&format!("api/{}", command))
            .map_err(|e| ChannelError::Protocol(format!("invalid endpoint for {}: {}", command, e)))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        command: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ChannelError> {
        let url = self.endpoint(command)?;
        let max_retries = self.config.max_retries.max(1);
        let delay = Duration::from_millis(self.config.retry_delay_ms);
        let mut attempts = 0;

        loop {
            attempts += 1;

            let outcome = match self.http_client.get(url.clone()).query(query).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    match resp.text().await {
                        Ok(body) => decode_response(command, status, &body).and_then(|result| {
                            result.ok_or_else(|| {
                                ChannelError::Protocol(format!("{}: missing result", command))
                            })
                        }),
                        Err(e) => Err(ChannelError::Unavailable(e.to_string())),
                    }
                }
                Err(e) => Err(ChannelError::Unavailable(e.to_string())),
            };

            match outcome {
                Err(ChannelError::Unavailable(reason)) if attempts < max_retries => {
                    debug!(
                        "{} failed: {}, retrying ({}/{})",
                        command, reason, attempts, max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    async fn post(&self, command: &str, body: serde_json::Value) -> Result<(), ChannelError> {
        let url = self.endpoint(command)?;

        let resp = self
            .http_client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!("{} could not be sent: {}", command, e);
                ChannelError::Unavailable(e.to_string())
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ChannelError::Unavailable(e.to_string()))?;

        decode_response::<serde_json::Value>(command, status, &text).map(|_| ())
    }
}

/// Longest slice of a raw error body kept in a rejection reason
const MAX_REASON_LEN: usize = 200;

/// Map an HTTP response onto the channel's error taxonomy
///
/// Server errors, timeouts and rate limits are transient. Any other 4xx is
/// a refusal of this one command. Only a body that cannot be decoded on a
/// success status is a protocol error.
fn decode_response<T: DeserializeOwned>(
    command: &str,
    status: StatusCode,
    body: &str,
) -> Result<Option<T>, ChannelError> {
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        return Err(ChannelError::Unavailable(format!(
            "{} answered {}",
            command, status
        )));
    }

    if status.is_client_error() {
        let reason = match serde_json::from_str::<ApiEnvelope<serde_json::Value>>(body) {
            Ok(ApiEnvelope {
                error: Some(error), ..
            }) => format!("{}: {}", status, error),
            _ => format!("{}: {}", status, truncate(body.trim(), MAX_REASON_LEN)),
        };
        return Err(ChannelError::rejected(command, reason));
    }

    let envelope: ApiEnvelope<T> = serde_json::from_str(body).map_err(|e| {
        ChannelError::Protocol(format!("{}: undecodable response ({}): {}", command, status, e))
    })?;

    if envelope.failed {
        return Err(ChannelError::rejected(
            command,
            envelope.error.unwrap_or_else(|| "no reason given".to_string()),
        ));
    }

    if !status.is_success() {
        return Err(ChannelError::Protocol(format!(
            "{}: unexpected status {}",
            command, status
        )));
    }

    Ok(envelope.result)
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[async_trait]
impl CommandChannel for RconHttpClient {
    async fn get_team_view(&self) -> Result<TeamView, ChannelError> {
        self.get("get_team_view", &[]).await
    }

    async fn get_game_state(&self) -> Result<GameState, ChannelError> {
        self.get("get_gamestate", &[]).await
    }

    async fn get_detailed_player_info(
        &self,
        player_name: &str,
    ) -> Result<DetailedPlayer, ChannelError> {
        self.get("get_detailed_player_info", &[("player_name", player_name)])
            .await
    }

    async fn message_player(
        &self,
        player: &PlayerRef,
        message: &str,
        by: &str,
        save_message: bool,
    ) -> Result<(), ChannelError> {
        self.post(
            "message_player",
            json!({
                "player_name": player.name,
                "player_id": player.player_id,
                "message": message,
                "by": by,
                "save_message": save_message,
            }),
        )
        .await
    }

    async fn punish(
        &self,
        player: &PlayerRef,
        reason: &str,
        by: &str,
    ) -> Result<(), ChannelError> {
        self.post(
            "punish",
            json!({
                "player_name": player.name,
                "player_id": player.player_id,
                "reason": reason,
                "by": by,
            }),
        )
        .await
    }

    async fn kick(&self, player: &PlayerRef, reason: &str, by: &str) -> Result<(), ChannelError> {
        self.post(
            "kick",
            json!({
                "player_name": player.name,
                "player_id": player.player_id,
                "reason": reason,
                "by": by,
            }),
        )
        .await
    }
}
