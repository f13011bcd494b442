use serde::{Deserialize, Serialize};

use super::models::{ActionKind, PunishPlayer};

/// Merged set of proposed actions for one evaluation pass
///
/// Order inside each collection is first-seen-first. No order is promised
/// across moderators, only within one moderator's own proposals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PunitionsToApply {
    pub warnings: Vec<PunishPlayer>,
    pub punishes: Vec<PunishPlayer>,
    pub kicks: Vec<PunishPlayer>,
}

impl PunitionsToApply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: ActionKind, player: PunishPlayer) {
        self.of_kind_mut(kind).push(player);
    }

    pub fn add_warning(&mut self, player: PunishPlayer) {
        self.warnings.push(player);
    }

    pub fn add_punish(&mut self, player: PunishPlayer) {
        self.punishes.push(player);
    }

    pub fn add_kick(&mut self, player: PunishPlayer) {
        self.kicks.push(player);
    }

    /// Append every same-kind collection of `other` to this one
    pub fn merge(&mut self, other: PunitionsToApply) {
        self.warnings.extend(other.warnings);
        self.punishes.extend(other.punishes);
        self.kicks.extend(other.kicks);
    }

    pub fn of_kind(&self, kind: ActionKind) -> &[PunishPlayer] {
        match kind {
            ActionKind::Warn => &self.warnings,
            ActionKind::Punish => &self.punishes,
            ActionKind::Kick => &self.kicks,
        }
    }

    fn of_kind_mut(&mut self, kind: ActionKind) -> &mut Vec<PunishPlayer> {
        match kind {
            ActionKind::Warn => &mut self.warnings,
            ActionKind::Punish => &mut self.punishes,
            ActionKind::Kick => &mut self.kicks,
        }
    }

    /// Detach the warnings, leaving punishes and kicks in place
    pub fn take_warnings(&mut self) -> Vec<PunishPlayer> {
        std::mem::take(&mut self.warnings)
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty() && self.punishes.is_empty() && self.kicks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len() + self.punishes.len() + self.kicks.len()
    }

    /// Iterate every entry with its kind, in application order
    pub fn iter(&self) -> impl Iterator<Item = (ActionKind, &PunishPlayer)> {
        ActionKind::ALL
            .into_iter()
            .flat_map(move |kind| self.of_kind(kind).iter().map(move |p| (kind, p)))
    }
}

impl Extend<PunitionsToApply> for PunitionsToApply {
    fn extend<I: IntoIterator<Item = PunitionsToApply>>(&mut self, iter: I) {
        for other in iter {
            self.merge(other);
        }
    }
}

impl FromIterator<PunitionsToApply> for PunitionsToApply {
    fn from_iter<I: IntoIterator<Item = PunitionsToApply>>(iter: I) -> Self {
        let mut merged = Self::new();
        merged.extend(iter);
        merged
    }
}
