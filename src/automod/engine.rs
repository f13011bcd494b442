//! Punition Engine
//!
//! Runs every moderator against every unit of both teams and merges the
//! proposals into one aggregate. The engine keeps nothing between calls.

use std::sync::Arc;
use tracing::{debug, error};

use super::moderator::Moderator;
use crate::game::{GameState, Squad, Team, TeamView};
use crate::punitions::PunitionsToApply;
use crate::rcon::{ChannelError, CommandChannel};

/// Fetch the current match state and evaluate it
pub async fn get_punitions_to_apply(
    channel: &dyn CommandChannel,
    moderators: &[Arc<dyn Moderator>],
) -> Result<PunitionsToApply, ChannelError> {
    debug!("Getting team info");
    let team_view = channel.get_team_view().await?;
    let game_state = channel.get_game_state().await?;

    Ok(evaluate(moderators, &team_view, &game_state).await)
}

/// Evaluate a state snapshot
///
/// For each team the commander (if any) is evaluated as a one-player squad,
/// then every squad in name order. A missing team yields no proposals.
pub async fn evaluate(
    moderators: &[Arc<dyn Moderator>],
    team_view: &TeamView,
    game_state: &GameState,
) -> PunitionsToApply {
    let mut punitions = PunitionsToApply::new();

    for team in Team::ALL {
        let Some(info) = team_view.team(team) else {
            continue;
        };

        if let Some(commander) = &info.commander {
            let unit = Squad::commander(commander.clone());
            evaluate_unit(
                &mut punitions,
                moderators,
                team_view,
                Squad::COMMANDER_LABEL,
                team,
                &unit,
                game_state,
            )
            .await;
        }

        for (squad_name, squad) in &info.squads {
            evaluate_unit(
                &mut punitions,
                moderators,
                team_view,
                squad_name,
                team,
                squad,
                game_state,
            )
            .await;
        }
    }

    punitions
}

async fn evaluate_unit(
    punitions: &mut PunitionsToApply,
    moderators: &[Arc<dyn Moderator>],
    team_view: &TeamView,
    squad_name: &str,
    team: Team,
    squad: &Squad,
    game_state: &GameState,
) {
    for moderator in moderators {
        match moderator
            .punitions_to_apply(team_view, squad_name, team, squad, game_state)
            .await
        {
            Ok(proposed) => punitions.merge(proposed),
            Err(e) => {
                // One faulty rule must not block the others
                error!(
                    moderator = %moderator.name(),
                    team = %team,
                    squad = %squad_name,
                    "Moderator evaluation failed: {:#}",
                    e
                );
            }
        }
    }
}
