//! Game actions that players can take.
//!
//! This module defines the move requests accepted by the resolver, the
//! pending-attack record, and the notification events emitted for display.

use crate::cards::{AppCard, Card, CardKind, PlayerId};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// All possible moves a player can submit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    /// Play the card at `hand_index`, declared as `card_kind`. Attack
    /// kinds require a target player.
    PlayCard {
        hand_index: usize,
        card_kind: CardKind,
        target: Option<PlayerId>,
    },

    /// Burn the card at `hand_index` and pass the turn
    Discard { hand_index: usize },

    /// Answer the pending attack with the card at `hand_index`
    Defend {
        hand_index: usize,
        card_kind: CardKind,
    },

    /// Decline to defend and let the pending attack resolve
    SubmitToAttack,

    /// Concede the game
    Resign,
}

/// An attack waiting for the target's response.
///
/// Set by an attack-kind `PlayCard` and cleared by the matching `Defend`
/// or `SubmitToAttack`; the turn does not rotate while one is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAttack {
    pub kind: CardKind,
    pub from: PlayerId,
    pub to: PlayerId,
    /// The played attack card, held here until it burns on resolution
    pub card: Card,
}

/// Display events emitted after each move.
///
/// These are hints for clients, not authoritative state; correctness must
/// never depend on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// An app card was downloaded into the shared pile
    DownloadApp { by: PlayerId, card: AppCard, ts: u64 },

    /// An attack was declared against `to`
    Attack {
        by: PlayerId,
        card: Card,
        to: PlayerId,
        ts: u64,
    },

    /// A card was discarded
    Discard { by: PlayerId, card: Card, ts: u64 },

    /// The attacked player defended
    Defend {
        by: PlayerId,
        attacker: PlayerId,
        card: CardKind,
        ts: u64,
    },

    /// The attacked player submitted; the attack had no pile effect
    SubmitAttack { by: PlayerId, ts: u64 },

    /// A Computer Virus returned a value group to the app deck
    VirusReturn {
        attacker: PlayerId,
        defender: PlayerId,
        ts: u64,
    },

    /// A Hacker Theft reassigned a value group to the attacker
    HackerTheft {
        attacker: PlayerId,
        defender: PlayerId,
        ts: u64,
    },

    /// A player conceded
    Resigned { by: PlayerId, ts: u64 },
}

/// Milliseconds since the unix epoch, for notification timestamps.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
