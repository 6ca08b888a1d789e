//! Win evaluation over the shared app pile.
//!
//! Pure functions only; the resolver calls [`evaluate`] after every
//! mutation that changes app-pile ownership.

use crate::cards::{AppCard, PlayerId};

/// Points required to win.
pub const WIN_THRESHOLD: u32 = 7;

/// Points `player` currently holds in the app pile.
///
/// Card values are clamped to [0, 4]; out-of-range values are rejected at
/// the download step, so the clamp here is a last line of defense.
pub fn score_for(app_pile: &[AppCard], player: PlayerId) -> u32 {
    app_pile
        .iter()
        .filter(|card| card.owner == Some(player))
        .map(|card| u32::from(card.value.min(4)))
        .sum()
}

/// The winner, if any player has reached [`WIN_THRESHOLD`].
///
/// Iterates `player_order` so ties resolve to the earliest seat.
pub fn evaluate(app_pile: &[AppCard], player_order: &[PlayerId]) -> Option<PlayerId> {
    player_order
        .iter()
        .copied()
        .find(|&player| score_for(app_pile, player) >= WIN_THRESHOLD)
}
