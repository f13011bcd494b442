//! Integration tests for the automod pipeline
//!
//! These tests drive the poll loop, the event hooks, the deferred notifier
//! and the service wiring against a recording command channel and a
//! configurable moderator.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use squad_automod::automod::{DEFAULT_NOTIFY_DELAY, FIRST_RUN_DONE_KEY};
use squad_automod::store::decode_config;
use squad_automod::{
    ApplyReport, AuditSink, AutomodHooks, ChannelError, CommandChannel, DeferredNotifier,
    DetailedPlayer, GameState, KeyStore, KillEvent, MemoryConfigStore, MemoryKeyStore, Moderator,
    ModeratorFactory, ModeratorRegistry, Player, PlayerRef, PollLoop, PunishDetails, PunishPlayer,
    PunitionExecutor, PunitionsToApply, Squad, Team, TeamInfo, TeamView, WarmupGuard,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

// ============================================================================
// Test Helpers
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Call {
    TeamView,
    GameState,
    Detail(String),
    Message {
        player_id: String,
        message: String,
        save_message: bool,
    },
    Punish(String),
    Kick(String),
}

impl Call {
    fn is_action(&self) -> bool {
        matches!(self, Call::Message { .. } | Call::Punish(_) | Call::Kick(_))
    }
}

/// Command channel recording every call
#[derive(Default)]
struct MockChannel {
    team_view: Mutex<TeamView>,
    detail: Mutex<Option<DetailedPlayer>>,
    calls: Mutex<Vec<Call>>,
    reject_punish: AtomicBool,
    broken: AtomicBool,
    garbled_kick: AtomicBool,
}

impl MockChannel {
    fn with_view(team_view: TeamView) -> Self {
        let channel = Self::default();
        *channel.team_view.lock().unwrap() = team_view;
        channel
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn actions(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_action).collect()
    }

    fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CommandChannel for MockChannel {
    async fn get_team_view(&self) -> Result<TeamView, ChannelError> {
        self.record(Call::TeamView);
        if self.broken.load(Ordering::SeqCst) {
            return Err(ChannelError::Protocol("unexpected payload".to_string()));
        }
        Ok(self.team_view.lock().unwrap().clone())
    }

    async fn get_game_state(&self) -> Result<GameState, ChannelError> {
        self.record(Call::GameState);
        Ok(GameState::default())
    }

    async fn get_detailed_player_info(
        &self,
        player_name: &str,
    ) -> Result<DetailedPlayer, ChannelError> {
        self.record(Call::Detail(player_name.to_string()));
        self.detail
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ChannelError::Unavailable("player lookup timed out".to_string()))
    }

    async fn message_player(
        &self,
        player: &PlayerRef,
        message: &str,
        _by: &str,
        save_message: bool,
    ) -> Result<(), ChannelError> {
        self.record(Call::Message {
            player_id: player.player_id.clone(),
            message: message.to_string(),
            save_message,
        });
        Ok(())
    }

    async fn punish(
        &self,
        player: &PlayerRef,
        _reason: &str,
        _by: &str,
    ) -> Result<(), ChannelError> {
        self.record(Call::Punish(player.player_id.clone()));
        if self.reject_punish.load(Ordering::SeqCst) {
            return Err(ChannelError::rejected("punish", "player is dead"));
        }
        Ok(())
    }

    async fn kick(&self, player: &PlayerRef, _reason: &str, _by: &str) -> Result<(), ChannelError> {
        self.record(Call::Kick(player.player_id.clone()));
        if self.garbled_kick.load(Ordering::SeqCst) {
            return Err(ChannelError::Protocol("undecodable kick reply".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct RecordingAudit {
    records: Mutex<Vec<(String, String)>>,
}

impl RecordingAudit {
    fn records(&self) -> Vec<(String, String)> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn publish(&self, _target: &Url, command_name: &str, message: &str, _author: &str) {
        self.records
            .lock()
            .unwrap()
            .push((command_name.to_string(), message.to_string()));
    }
}

/// Behavior of the configurable moderator
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScriptConfig {
    enabled: bool,
    dry_run: bool,
    audit_webhook: Option<Url>,
    warn_squad: Option<String>,
    punish_squad: Option<String>,
    kick_squad: Option<String>,
    punish_team_killers: bool,
    connect_warnings: Vec<String>,
    kick_on_connect: bool,
}

/// What moderators saw, shared across the instances built each cycle
#[derive(Default)]
struct Observed {
    kills: Mutex<usize>,
    connects: Mutex<Vec<Option<DetailedPlayer>>>,
    punish_failed: Mutex<Vec<String>>,
}

struct Scripted {
    config: ScriptConfig,
    observed: Arc<Observed>,
}

impl Scripted {
    fn details(&self, message: &str) -> PunishDetails {
        let details = PunishDetails::new(message, "automod").with_dry_run(self.config.dry_run);
        match &self.config.audit_webhook {
            Some(webhook) => details.with_audit_webhook(webhook.clone()),
            None => details,
        }
    }
}

#[async_trait]
impl Moderator for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    async fn punitions_to_apply(
        &self,
        _team_view: &TeamView,
        squad_name: &str,
        team: Team,
        squad: &Squad,
        _game_state: &GameState,
    ) -> Result<PunitionsToApply> {
        let mut punitions = PunitionsToApply::new();
        let targets = |wanted: &Option<String>| wanted.as_deref() == Some(squad_name);

        for player in &squad.players {
            let proposal = |message: &str| {
                PunishPlayer::new(player.player_ref(), self.details(message))
                    .in_squad(team, squad_name)
            };
            if targets(&self.config.warn_squad) {
                punitions.add_warning(proposal("squad warned"));
            }
            if targets(&self.config.punish_squad) {
                punitions.add_punish(proposal("squad punished"));
            }
            if targets(&self.config.kick_squad) {
                punitions.add_kick(proposal("squad kicked"));
            }
        }

        Ok(punitions)
    }

    async fn on_kill(&self, event: &KillEvent) -> Result<PunitionsToApply> {
        *self.observed.kills.lock().unwrap() += 1;

        let mut punitions = PunitionsToApply::new();
        if self.config.punish_team_killers && event.is_team_kill() {
            punitions.add_punish(PunishPlayer::new(
                event.killer.clone(),
                self.details("team kill"),
            ));
        }
        Ok(punitions)
    }

    async fn on_connected(
        &self,
        name: &str,
        player_id: &str,
        detail: Option<&DetailedPlayer>,
    ) -> Result<PunitionsToApply> {
        self.observed.connects.lock().unwrap().push(detail.cloned());

        let player = PlayerRef::new(name, player_id);
        let mut punitions = PunitionsToApply::new();
        for message in &self.config.connect_warnings {
            punitions.add_warning(PunishPlayer::new(player.clone(), self.details(message)));
        }
        if self.config.kick_on_connect {
            punitions.add_kick(PunishPlayer::new(player, self.details("not allowed")));
        }
        Ok(punitions)
    }

    async fn player_punish_failed(&self, player: &PunishPlayer) {
        self.observed
            .punish_failed
            .lock()
            .unwrap()
            .push(player.player_id().to_string());
    }
}

struct ScriptedFactory {
    observed: Arc<Observed>,
}

impl ModeratorFactory for ScriptedFactory {
    fn config_key(&self) -> &str {
        "scripted"
    }

    fn build(
        &self,
        config: Option<serde_json::Value>,
        _store: Arc<dyn KeyStore>,
    ) -> Result<Arc<dyn Moderator>> {
        Ok(Arc::new(Scripted {
            config: decode_config(config)?,
            observed: self.observed.clone(),
        }))
    }
}

fn squad(players: &[(&str, &str)]) -> Squad {
    Squad::with_players(
        players
            .iter()
            .map(|(name, id)| Player::new(*name, *id))
            .collect(),
    )
}

/// Allies only, with the given squads
fn allies_view(squads: Vec<(&str, Squad)>) -> TeamView {
    let mut info = TeamInfo::default();
    for (name, squad) in squads {
        info.squads.insert(name.to_string(), squad);
    }
    TeamView {
        allies: Some(info),
        axis: None,
    }
}

fn team_kill(killer_id: &str) -> KillEvent {
    KillEvent {
        timestamp: Utc::now(),
        killer: PlayerRef::new("Killer", killer_id),
        killer_team: Some(Team::Allies),
        victim: PlayerRef::new("Victim", "99"),
        victim_team: Some(Team::Allies),
        weapon: "M1 GARAND".to_string(),
    }
}

/// Every pipeline component over shared mocks
struct Harness {
    channel: Arc<MockChannel>,
    audit: Arc<RecordingAudit>,
    observed: Arc<Observed>,
    config: Arc<MemoryConfigStore>,
    key_store: Arc<MemoryKeyStore>,
    registry: Arc<ModeratorRegistry>,
    executor: Arc<PunitionExecutor>,
    guard: Arc<WarmupGuard>,
    notifier: Arc<DeferredNotifier>,
}

impl Harness {
    async fn new(team_view: TeamView, moderator_config: serde_json::Value) -> Self {
        let channel = Arc::new(MockChannel::with_view(team_view));
        let audit = Arc::new(RecordingAudit::default());
        let observed = Arc::new(Observed::default());
        let config = Arc::new(MemoryConfigStore::new());
        config.set("scripted", moderator_config).await;
        let key_store = Arc::new(MemoryKeyStore::new());

        let registry = Arc::new(
            ModeratorRegistry::new(config.clone(), key_store.clone()).with_factory(Arc::new(
                ScriptedFactory {
                    observed: observed.clone(),
                },
            )),
        );
        let executor = Arc::new(PunitionExecutor::new(channel.clone(), audit.clone()));
        let guard = Arc::new(WarmupGuard::new(key_store.clone()));
        let notifier = Arc::new(DeferredNotifier::new(channel.clone()));

        Self {
            channel,
            audit,
            observed,
            config,
            key_store,
            registry,
            executor,
            guard,
            notifier,
        }
    }

    fn poll_loop(&self) -> PollLoop {
        PollLoop::new(
            self.channel.clone(),
            self.registry.clone(),
            self.executor.clone(),
            self.guard.clone(),
        )
    }

    fn hooks(&self) -> AutomodHooks {
        AutomodHooks::new(
            self.channel.clone(),
            self.registry.clone(),
            self.executor.clone(),
            self.guard.clone(),
            self.notifier.clone(),
        )
    }
}

fn audit_hook() -> serde_json::Value {
    json!("https://audit.example/webhook")
}

// ============================================================================
// Poll Cycle Tests
// ============================================================================

mod poll_cycle {
    use super::*;
    use squad_automod::CycleOutcome;

    #[tokio::test]
    async fn test_no_enabled_moderator_makes_no_remote_calls() {
        let harness = Harness::new(
            allies_view(vec![("able", squad(&[("Bob", "1")]))]),
            json!({ "enabled": false, "punish_squad": "able" }),
        )
        .await;

        let outcome = harness.poll_loop().punish_squads().await.unwrap();

        assert_eq!(outcome, CycleOutcome::NoModerators);
        assert!(harness.channel.calls().is_empty());
        assert!(!harness.guard.is_ready().await);
        assert!(!harness.key_store.exists(FIRST_RUN_DONE_KEY).await.unwrap());
    }

    #[tokio::test]
    async fn test_accepted_punish_is_applied_and_audited() {
        let harness = Harness::new(
            allies_view(vec![
                ("able", squad(&[("Bob", "1")])),
                ("baker", squad(&[("Eve", "2")])),
            ]),
            json!({ "enabled": true, "punish_squad": "able", "audit_webhook": audit_hook() }),
        )
        .await;

        let outcome = harness.poll_loop().punish_squads().await.unwrap();

        assert_eq!(
            outcome,
            CycleOutcome::Applied(ApplyReport {
                punishes: 1,
                ..Default::default()
            })
        );
        assert_eq!(harness.channel.actions(), vec![Call::Punish("1".to_string())]);

        let records = harness.audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "punish");
        assert!(records[0].1.starts_with("--> PUNISHING: "));
        assert!(records[0].1.contains("Bob (1) [allies/able]"));

        assert!(harness.observed.punish_failed.lock().unwrap().is_empty());
        assert!(harness.guard.is_ready().await);
    }

    #[tokio::test]
    async fn test_actions_applied_in_escalation_order() {
        let harness = Harness::new(
            allies_view(vec![
                ("able", squad(&[("Kim", "3")])),
                ("baker", squad(&[("Bob", "1")])),
                ("charlie", squad(&[("Eve", "2")])),
            ]),
            json!({
                "enabled": true,
                "kick_squad": "able",
                "punish_squad": "baker",
                "warn_squad": "charlie",
            }),
        )
        .await;

        harness.poll_loop().punish_squads().await.unwrap();

        assert_eq!(
            harness.channel.actions(),
            vec![
                Call::Message {
                    player_id: "2".to_string(),
                    message: "squad warned".to_string(),
                    save_message: true,
                },
                Call::Punish("1".to_string()),
                Call::Kick("3".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_punish_notifies_moderators_and_cycle_succeeds() {
        let harness = Harness::new(
            allies_view(vec![("able", squad(&[("Bob", "1"), ("Eve", "2")]))]),
            json!({ "enabled": true, "punish_squad": "able", "audit_webhook": audit_hook() }),
        )
        .await;
        harness.channel.reject_punish.store(true, Ordering::SeqCst);

        let outcome = harness.poll_loop().punish_squads().await.unwrap();

        assert_eq!(
            outcome,
            CycleOutcome::Applied(ApplyReport {
                failed: 2,
                ..Default::default()
            })
        );
        assert_eq!(
            *harness.observed.punish_failed.lock().unwrap(),
            vec!["1".to_string(), "2".to_string()]
        );
        // Refused actions are not audited as applied
        assert!(harness.audit.records().is_empty());
        assert!(harness.guard.is_ready().await);
    }

    #[tokio::test]
    async fn test_dry_run_audits_without_acting() {
        let harness = Harness::new(
            allies_view(vec![("able", squad(&[("Bob", "1")]))]),
            json!({
                "enabled": true,
                "dry_run": true,
                "kick_squad": "able",
                "audit_webhook": audit_hook(),
            }),
        )
        .await;

        let outcome = harness.poll_loop().punish_squads().await.unwrap();

        assert_eq!(
            outcome,
            CycleOutcome::Applied(ApplyReport {
                dry_run: 1,
                ..Default::default()
            })
        );
        assert!(harness.channel.actions().is_empty());
        let records = harness.audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "kick");
        assert!(records[0].1.starts_with("---> KICKING <---: "));
    }

    #[tokio::test]
    async fn test_protocol_failure_ends_the_loop() {
        let harness = Harness::new(
            allies_view(vec![("able", squad(&[("Bob", "1")]))]),
            json!({ "enabled": true }),
        )
        .await;
        harness.channel.broken.store(true, Ordering::SeqCst);

        let result = harness.poll_loop().run().await;

        assert!(result.is_err());
        assert_eq!(harness.channel.count(&Call::TeamView), 1);
        assert!(!harness.guard.is_ready().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_idles_between_cycles() {
        let harness = Harness::new(allies_view(vec![]), json!({ "enabled": true })).await;
        let poll = harness.poll_loop().with_interval(Duration::from_secs(5));

        let task = tokio::spawn(async move { poll.run().await });
        tokio::time::sleep(Duration::from_secs(12)).await;
        task.abort();

        // Cycles at t=0, t=5 and t=10
        assert_eq!(harness.channel.count(&Call::TeamView), 3);
        assert_eq!(harness.channel.count(&Call::GameState), 3);
    }

    #[tokio::test]
    async fn test_configuration_is_reread_every_cycle() {
        let harness = Harness::new(
            allies_view(vec![("able", squad(&[("Bob", "1")]))]),
            json!({ "enabled": false, "punish_squad": "able" }),
        )
        .await;
        let poll = harness.poll_loop();

        assert_eq!(poll.punish_squads().await.unwrap(), CycleOutcome::NoModerators);

        harness
            .config
            .set("scripted", json!({ "enabled": true, "punish_squad": "able" }))
            .await;

        assert_eq!(
            poll.punish_squads().await.unwrap(),
            CycleOutcome::Applied(ApplyReport {
                punishes: 1,
                ..Default::default()
            })
        );
    }
}

// ============================================================================
// Warm-up Tests
// ============================================================================

mod warmup {
    use super::*;

    #[tokio::test]
    async fn test_kill_hook_inert_before_first_cycle() {
        let harness = Harness::new(
            allies_view(vec![]),
            json!({ "enabled": true, "punish_team_killers": true }),
        )
        .await;

        harness.hooks().on_kill(&team_kill("5")).await.unwrap();

        assert_eq!(*harness.observed.kills.lock().unwrap(), 0);
        assert!(harness.channel.calls().is_empty());
    }

    #[tokio::test]
    async fn test_kill_hook_active_after_cycle() {
        let harness = Harness::new(
            allies_view(vec![]),
            json!({ "enabled": true, "punish_team_killers": true }),
        )
        .await;

        harness.poll_loop().punish_squads().await.unwrap();
        harness.hooks().on_kill(&team_kill("5")).await.unwrap();

        assert_eq!(*harness.observed.kills.lock().unwrap(), 1);
        assert_eq!(harness.channel.actions(), vec![Call::Punish("5".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hooks_go_inert_when_polling_stops() {
        let harness = Harness::new(
            allies_view(vec![]),
            json!({ "enabled": true, "punish_team_killers": true }),
        )
        .await;
        let hooks = harness.hooks();

        harness.poll_loop().punish_squads().await.unwrap();

        tokio::time::sleep(Duration::from_secs(239)).await;
        hooks.on_kill(&team_kill("5")).await.unwrap();
        assert_eq!(*harness.observed.kills.lock().unwrap(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        hooks.on_kill(&team_kill("5")).await.unwrap();
        assert_eq!(*harness.observed.kills.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_hooks_skip_when_no_moderator_enabled() {
        let harness = Harness::new(allies_view(vec![]), json!({ "enabled": false })).await;
        harness.guard.mark_ready().await.unwrap();

        harness.hooks().on_kill(&team_kill("5")).await.unwrap();

        assert_eq!(*harness.observed.kills.lock().unwrap(), 0);
        assert!(harness.channel.calls().is_empty());
    }
}

// ============================================================================
// Connect Hook Tests
// ============================================================================

mod connect_hook {
    use super::*;

    fn message(player_id: &str, message: &str) -> Call {
        Call::Message {
            player_id: player_id.to_string(),
            message: message.to_string(),
            save_message: false,
        }
    }

    async fn ready_harness(moderator_config: serde_json::Value) -> Harness {
        let harness = Harness::new(allies_view(vec![]), moderator_config).await;
        harness.guard.mark_ready().await.unwrap();
        harness
    }

    #[tokio::test(start_paused = true)]
    async fn test_warnings_deferred_kicks_immediate() {
        let harness = ready_harness(json!({
            "enabled": true,
            "connect_warnings": ["read the rules"],
            "kick_on_connect": true,
        }))
        .await;
        let bob = PlayerRef::new("Bob", "1");

        harness.hooks().on_connected(&bob).await.unwrap();

        assert_eq!(harness.channel.actions(), vec![Call::Kick("1".to_string())]);
        assert!(harness.notifier.is_pending("1"));

        tokio::time::sleep(DEFAULT_NOTIFY_DELAY + Duration::from_secs(1)).await;

        assert_eq!(
            harness.channel.actions(),
            vec![Call::Kick("1".to_string()), message("1", "read the rules")]
        );
        assert!(!harness.notifier.is_pending("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_scheduled_without_warnings() {
        let harness = ready_harness(json!({ "enabled": true, "kick_on_connect": true })).await;

        harness
            .hooks()
            .on_connected(&PlayerRef::new("Bob", "1"))
            .await
            .unwrap();

        assert_eq!(harness.notifier.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_detail_passed_to_moderators() {
        let harness = ready_harness(json!({ "enabled": true })).await;
        let detail = DetailedPlayer {
            name: "Bob".to_string(),
            player_id: "1".to_string(),
            level: 42,
            ..Default::default()
        };
        *harness.channel.detail.lock().unwrap() = Some(detail.clone());

        harness
            .hooks()
            .on_connected(&PlayerRef::new("Bob", "1"))
            .await
            .unwrap();

        assert_eq!(harness.channel.count(&Call::Detail("Bob".to_string())), 1);
        assert_eq!(*harness.observed.connects.lock().unwrap(), vec![Some(detail)]);
    }

    #[tokio::test]
    async fn test_detail_failure_passes_none() {
        let harness = ready_harness(json!({ "enabled": true })).await;

        let result = harness
            .hooks()
            .on_connected(&PlayerRef::new("Bob", "1"))
            .await;

        assert!(result.is_ok());
        assert_eq!(*harness.observed.connects.lock().unwrap(), vec![None]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_replaces_pending_warnings() {
        let harness = ready_harness(json!({
            "enabled": true,
            "connect_warnings": ["welcome", "no team killing"],
        }))
        .await;
        let hooks = harness.hooks();
        let bob = PlayerRef::new("Bob", "1");

        hooks.on_connected(&bob).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        hooks.on_connected(&bob).await.unwrap();
        assert_eq!(harness.notifier.pending_count(), 1);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(harness.channel.actions().is_empty());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(
            harness.channel.actions(),
            vec![message("1", "welcome"), message("1", "no team killing")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_warnings_survive_failed_connect_kick() {
        let harness = ready_harness(json!({
            "enabled": true,
            "connect_warnings": ["read the rules"],
            "kick_on_connect": true,
        }))
        .await;
        harness.channel.garbled_kick.store(true, Ordering::SeqCst);

        let result = harness
            .hooks()
            .on_connected(&PlayerRef::new("Bob", "1"))
            .await;

        assert!(matches!(result, Err(ChannelError::Protocol(_))));
        assert!(harness.notifier.is_pending("1"));

        tokio::time::sleep(DEFAULT_NOTIFY_DELAY + Duration::from_secs(1)).await;
        assert_eq!(
            harness.channel.actions(),
            vec![Call::Kick("1".to_string()), message("1", "read the rules")]
        );
    }

    #[tokio::test]
    async fn test_connect_hook_inert_before_first_cycle() {
        let harness = Harness::new(
            allies_view(vec![]),
            json!({ "enabled": true, "kick_on_connect": true }),
        )
        .await;

        harness
            .hooks()
            .on_connected(&PlayerRef::new("Bob", "1"))
            .await
            .unwrap();

        assert!(harness.channel.calls().is_empty());
        assert!(harness.observed.connects.lock().unwrap().is_empty());
    }
}

// ============================================================================
// Configuration File Tests
// ============================================================================

mod config_file {
    use super::*;
    use squad_automod::{CycleOutcome, JsonFileConfigStore};

    #[tokio::test]
    async fn test_file_edits_apply_on_next_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("automod.json");
        std::fs::write(&path, r#"{ "scripted": { "enabled": false } }"#).unwrap();

        let channel = Arc::new(MockChannel::with_view(allies_view(vec![(
            "able",
            squad(&[("Bob", "1")]),
        )])));
        let key_store = Arc::new(MemoryKeyStore::new());
        let registry = Arc::new(
            ModeratorRegistry::new(Arc::new(JsonFileConfigStore::new(&path)), key_store.clone())
                .with_factory(Arc::new(ScriptedFactory {
                    observed: Arc::new(Observed::default()),
                })),
        );
        let poll = PollLoop::new(
            channel.clone(),
            registry,
            Arc::new(PunitionExecutor::new(
                channel.clone(),
                Arc::new(RecordingAudit::default()),
            )),
            Arc::new(WarmupGuard::new(key_store)),
        );

        assert_eq!(poll.punish_squads().await.unwrap(), CycleOutcome::NoModerators);

        std::fs::write(
            &path,
            r#"{ "scripted": { "enabled": true, "kick_squad": "able" } }"#,
        )
        .unwrap();

        assert_eq!(
            poll.punish_squads().await.unwrap(),
            CycleOutcome::Applied(ApplyReport {
                kicks: 1,
                ..Default::default()
            })
        );
        assert_eq!(channel.actions(), vec![Call::Kick("1".to_string())]);
    }
}

// ============================================================================
// Service Tests
// ============================================================================

mod service {
    use super::*;
    use squad_automod::{AutomodConfig, AutomodService, EventBus, GameEvent};

    fn service(channel: Arc<MockChannel>, config: Arc<MemoryConfigStore>) -> AutomodService {
        AutomodService::new(AutomodConfig::default(), channel)
            .unwrap()
            .with_audit(Arc::new(RecordingAudit::default()))
            .with_config_store(config)
            .with_factory(Arc::new(ScriptedFactory {
                observed: Arc::new(Observed::default()),
            }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_polls_and_handles_events() {
        let channel = Arc::new(MockChannel::with_view(allies_view(vec![])));
        let config = Arc::new(MemoryConfigStore::new());
        config
            .set(
                "scripted",
                json!({ "enabled": true, "punish_team_killers": true }),
            )
            .await;

        let bus = EventBus::default();
        let handle = service(channel.clone(), config).start(&bus);

        // Let the first cycle complete so the hooks are warmed up
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(channel.count(&Call::TeamView), 1);

        assert_eq!(bus.publish(GameEvent::Kill(team_kill("5"))), 1);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(channel.actions(), vec![Call::Punish("5".to_string())]);
        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_notifications() {
        let channel = Arc::new(MockChannel::with_view(allies_view(vec![])));
        let config = Arc::new(MemoryConfigStore::new());
        config
            .set(
                "scripted",
                json!({ "enabled": true, "connect_warnings": ["welcome"] }),
            )
            .await;

        let bus = EventBus::default();
        let handle = service(channel.clone(), config).start(&bus);
        tokio::time::sleep(Duration::from_secs(1)).await;

        bus.publish(GameEvent::Connected {
            timestamp: Utc::now(),
            player: PlayerRef::new("Bob", "1"),
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.notifier().pending_count(), 1);

        handle.shutdown();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(channel.actions().is_empty());
    }

    #[tokio::test]
    async fn test_poll_task_reports_fatal_failure() {
        let channel = Arc::new(MockChannel::with_view(allies_view(vec![])));
        channel.broken.store(true, Ordering::SeqCst);
        let config = Arc::new(MemoryConfigStore::new());
        config.set("scripted", json!({ "enabled": true })).await;

        let bus = EventBus::default();
        let mut handle = service(channel, config).start(&bus);

        let result = handle.poll_task().await.unwrap();
        assert!(result.is_err());
        handle.shutdown();
    }
}
