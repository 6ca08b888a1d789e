//! Card types and deck construction.
//!
//! This module contains:
//! - The `Card` tagged variant and the `AppCard` scoring card
//! - Standard deck composition for a new game
//! - Shuffle helpers

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a player, assigned by the server when the client connects.
pub type PlayerId = Uuid;

/// Number of app cards in a fresh app deck.
pub const APP_DECK_SIZE: usize = 28;

/// Number of non-app cards in a fresh draw pile.
pub const DRAW_PILE_SIZE: usize = 100;

/// Total cards dealt into a game.
pub const TOTAL_CARDS: usize = APP_DECK_SIZE + DRAW_PILE_SIZE;

/// A scoring card. Lives in the app deck until downloaded, then in the
/// shared app pile where its owner collects its points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCard {
    /// Unique card id, stable for the lifetime of the game
    pub id: String,
    /// Point value, 1-4
    pub value: u8,
    /// Owning player while the card sits in the app pile
    pub owner: Option<PlayerId>,
}

impl AppCard {
    /// Copy of this card owned by `owner`.
    pub fn owned_by(&self, owner: PlayerId) -> AppCard {
        AppCard {
            id: self.id.clone(),
            value: self.value,
            owner: Some(owner),
        }
    }

    /// Copy of this card with ownership stripped (returned to the deck).
    pub fn released(&self) -> AppCard {
        AppCard {
            id: self.id.clone(),
            value: self.value,
            owner: None,
        }
    }
}

/// A card in play. Each kind carries only the fields it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Card {
    /// Scoring card (should never appear in a hand or the draw pile)
    App(AppCard),
    /// Draws the top app card into the shared pile when played
    DownloadApp { id: String },
    /// Attack: returns one of the target's app value groups to the deck
    ComputerVirus { id: String },
    /// Attack: steals one of the target's app value groups
    HackerTheft { id: String },
    /// Attack with no submit effect; nuisance card
    ItGuy { id: String },
    /// Attack with no submit effect; nuisance card
    Firewall { id: String },
}

impl Card {
    /// Unique card id.
    pub fn id(&self) -> &str {
        match self {
            Card::App(app) => &app.id,
            Card::DownloadApp { id }
            | Card::ComputerVirus { id }
            | Card::HackerTheft { id }
            | Card::ItGuy { id }
            | Card::Firewall { id } => id,
        }
    }

    /// Kind discriminant, for comparing against a declared kind.
    pub fn kind(&self) -> CardKind {
        match self {
            Card::App(_) => CardKind::App,
            Card::DownloadApp { .. } => CardKind::DownloadApp,
            Card::ComputerVirus { .. } => CardKind::ComputerVirus,
            Card::HackerTheft { .. } => CardKind::HackerTheft,
            Card::ItGuy { .. } => CardKind::ItGuy,
            Card::Firewall { .. } => CardKind::Firewall,
        }
    }

    /// Whether this is a scoring card.
    pub fn is_app(&self) -> bool {
        matches!(self, Card::App(_))
    }
}

/// Card kind without payload, used for declared card types in requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardKind {
    App,
    DownloadApp,
    ComputerVirus,
    HackerTheft,
    ItGuy,
    Firewall,
}

impl CardKind {
    /// Attack kinds create a pending response obligation when played.
    pub fn is_attack(&self) -> bool {
        matches!(
            self,
            CardKind::ComputerVirus | CardKind::HackerTheft | CardKind::ItGuy | CardKind::Firewall
        )
    }
}

/// Create the standard app deck: 10 ones, 8 twos, 6 threes, 4 fours.
pub fn standard_app_deck() -> Vec<AppCard> {
    let mut deck = Vec::with_capacity(APP_DECK_SIZE);

    for (value, count) in [(1u8, 10usize), (2, 8), (3, 6), (4, 4)] {
        for i in 0..count {
            deck.push(AppCard {
                id: format!("app_{}_{}", value, i),
                value,
                owner: None,
            });
        }
    }

    deck
}

/// Create the standard non-app draw pile: 30 Download App, 20 Computer
/// Virus, 20 Hacker Theft, 15 IT Guy, 15 Firewall.
pub fn standard_draw_pile() -> Vec<Card> {
    let mut pile = Vec::with_capacity(DRAW_PILE_SIZE);

    for i in 0..30 {
        pile.push(Card::DownloadApp {
            id: format!("download_{}", i),
        });
    }
    for i in 0..20 {
        pile.push(Card::ComputerVirus {
            id: format!("virus_{}", i),
        });
    }
    for i in 0..20 {
        pile.push(Card::HackerTheft {
            id: format!("hacker_{}", i),
        });
    }
    for i in 0..15 {
        pile.push(Card::ItGuy {
            id: format!("itguy_{}", i),
        });
    }
    for i in 0..15 {
        pile.push(Card::Firewall {
            id: format!("firewall_{}", i),
        });
    }

    pile
}

/// Shuffle a deck in place.
pub fn shuffle_deck<T, R: Rng>(deck: &mut [T], rng: &mut R) {
    deck.shuffle(rng);
}
