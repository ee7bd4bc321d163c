//! Rule table deciding which controls the client offers.
//!
//! The server re-validates every request; these rules only decide what is
//! worth showing.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::player::{PlayerId, PlayerView, Role};
use crate::room::Phase;

/// An action a player can submit against a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionTag {
    Vote,
    Protect,
    Hunt,
    Inspect,
    Poison,
    Kill,
    Watch,
}

impl ActionTag {
    pub const ALL: [ActionTag; 7] = [
        ActionTag::Vote,
        ActionTag::Protect,
        ActionTag::Hunt,
        ActionTag::Inspect,
        ActionTag::Poison,
        ActionTag::Kill,
        ActionTag::Watch,
    ];

    /// Wire name sent in the `action` field.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionTag::Vote => "vote",
            ActionTag::Protect => "protect",
            ActionTag::Hunt => "hunt",
            ActionTag::Inspect => "inspect",
            ActionTag::Poison => "poison",
            ActionTag::Kill => "kill",
            ActionTag::Watch => "watch",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ActionTag::Vote => "Accuse",
            ActionTag::Protect => "Protect",
            ActionTag::Hunt => "Hunt",
            ActionTag::Inspect => "Inspect",
            ActionTag::Poison => "Poison",
            ActionTag::Kill => "Kill",
            ActionTag::Watch => "Watch",
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionTag::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown action: {s}"))
    }
}

/// Actions a player may submit given the current phase.
///
/// Only the viewer's own seat ever gets actions. At night, `watch` is the
/// fallback for roles without a night power of their own (villagers, or a
/// role the server did not disclose).
pub fn eligible_actions(
    phase: Phase,
    role: Option<Role>,
    alive: bool,
    is_self: bool,
) -> BTreeSet<ActionTag> {
    let mut actions = BTreeSet::new();
    if !alive || !is_self {
        return actions;
    }
    match phase {
        Phase::Day => {
            actions.insert(ActionTag::Vote);
        },
        Phase::Night => match role {
            Some(Role::Hunter) => {
                actions.insert(ActionTag::Protect);
                actions.insert(ActionTag::Hunt);
            },
            Some(Role::Seer) => {
                actions.insert(ActionTag::Inspect);
            },
            Some(Role::Witch) => {
                actions.insert(ActionTag::Poison);
            },
            Some(Role::Vampire) => {
                actions.insert(ActionTag::Kill);
            },
            Some(Role::Villager) | None => {
                actions.insert(ActionTag::Watch);
            },
        },
        Phase::Waiting | Phase::Voting | Phase::Ended => {},
    }
    actions
}

/// Whether `candidate` may be picked as the target of the next action.
pub fn is_selectable_target(candidate: &PlayerView, self_id: Option<PlayerId>) -> bool {
    candidate.alive && Some(candidate.player_id) != self_id
}

/// Phase transition an admin can ask the server for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseRequest {
    StartGame,
    EndNight,
    EndDay,
}

impl PhaseRequest {
    /// Wire name sent in the `phase` field.
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseRequest::StartGame => "start-game",
            PhaseRequest::EndNight => "end-night",
            PhaseRequest::EndDay => "end-day",
        }
    }

    /// Whether a successful request landing on `resulting` starts the
    /// decision countdown.
    pub fn arms_decision_timer(self, resulting: Phase) -> bool {
        resulting != Phase::Ended
    }
}

impl fmt::Display for PhaseRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The admin "advance phase" control for a given phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseControl {
    pub request: PhaseRequest,
    pub label: &'static str,
}

/// Control offered to the room owner in `phase`, if any.
pub fn advance_control(phase: Phase) -> Option<PhaseControl> {
    let (request, label) = match phase {
        Phase::Waiting => (PhaseRequest::StartGame, "Start game"),
        Phase::Night => (PhaseRequest::EndNight, "End night"),
        Phase::Day => (PhaseRequest::EndDay, "End day"),
        Phase::Ended => (PhaseRequest::StartGame, "New game"),
        Phase::Voting => return None,
    };
    Some(PhaseControl { request, label })
}
