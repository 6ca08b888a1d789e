//! Appstack core game engine.
//!
//! Rules engine for Appstack, a 4-player cyber-themed card game: players
//! download app cards into a shared scoring pile and attack each other
//! with viruses and hacker cards; the first player to collect seven
//! points of owned apps wins.
//!
//! This crate is transport and storage agnostic. [`GameState::apply`] is
//! the single entry point for moves; callers (the server crate, tests)
//! own locking and persistence.
//!
//! # Modules
//!
//! - [`cards`]: Card types and standard deck construction
//! - [`actions`]: Move requests and display notifications
//! - [`game`]: The `GameState` aggregate and move resolver
//! - [`score`]: Pure win evaluation over the shared app pile

pub mod actions;
pub mod cards;
pub mod game;
pub mod score;

// Re-export commonly used types
pub use actions::{GameAction, Notification, PendingAttack};
pub use cards::{AppCard, Card, CardKind, PlayerId};
pub use game::{GameError, GameState, GameStatus, HAND_SIZE, PLAYERS_PER_GAME};
pub use score::{evaluate, score_for, WIN_THRESHOLD};
