//! Core game state machine.
//!
//! This module contains the `GameState` aggregate and the move resolver:
//! turn sequencing, the one-auto-draw-per-turn rule, hand replenishment,
//! attack/defense resolution, and win detection.

use crate::actions::{now_millis, GameAction, Notification, PendingAttack};
use crate::cards::{
    shuffle_deck, standard_app_deck, standard_draw_pile, AppCard, Card, CardKind, PlayerId,
};
use crate::score;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Cards each player holds between turns
pub const HAND_SIZE: usize = 3;

/// Players per game; lobbies fill to exactly this count
pub const PLAYERS_PER_GAME: usize = 4;

/// Game lifecycle status. `Finished` and `Resigned` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Active,
    Finished,
    Resigned,
}

/// Errors that can occur when applying moves
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Game is over")]
    GameOver,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("An attack is awaiting a response")]
    AttackPending,

    #[error("No attack is awaiting a response")]
    NoPendingAttack,

    #[error("Only the attacked player may respond")]
    NotYourResponse,

    #[error("Hand index {0} is out of bounds")]
    HandIndexOutOfBounds(usize),

    #[error("Declared card kind does not match the card at that index")]
    WrongCardKind,

    #[error("Attack cards require a target player")]
    MissingTarget,

    #[error("No app cards left to download")]
    EmptyAppDeck,

    #[error("App card {id} has invalid value {value}")]
    CorruptAppCard { id: String, value: u8 },

    #[error("Player is not part of this game")]
    UnknownPlayer,
}

/// The complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Seat order; fixed at creation, defines the turn rotation
    pub player_order: Vec<PlayerId>,
    /// Display names
    pub player_names: HashMap<PlayerId, String>,
    /// Each player's hand, index-addressed by moves
    pub hands: HashMap<PlayerId, Vec<Card>>,
    /// Face-down app cards, drawn from the tail by Download App
    pub app_deck: Vec<AppCard>,
    /// Shared scoring pool of downloaded, owned app cards
    pub app_pile: Vec<AppCard>,
    /// Spent cards; nothing here re-enters play
    pub burned: Vec<Card>,
    /// Shared face-down draw pile, drawn from the tail
    pub unused: Vec<Card>,
    /// Index into `player_order` of the player to act
    pub current_turn: usize,
    /// Last turn index at which each player auto-drew
    pub last_draw_turn: HashMap<PlayerId, usize>,
    /// Unresolved attack, if any
    pub pending_attack: Option<PendingAttack>,
    /// Last emitted notification; display only
    pub current_message: Option<Notification>,
    pub status: GameStatus,
    /// Set only when `status` is `Finished`
    pub winner: Option<PlayerId>,
    /// Who conceded, when `status` is `Resigned`
    pub resigned_by: Option<PlayerId>,
    pub resigned_players: Vec<PlayerId>,
    /// Players who returned to the lobby after the game ended
    pub exited_players: Vec<PlayerId>,
    /// Unix millis at creation
    pub created_at: u64,
}

impl GameState {
    /// Create a new game: shuffle both decks, randomize seating, deal
    /// three draw-pile cards to each player.
    pub fn new(players: Vec<(PlayerId, String)>) -> Self {
        assert_eq!(
            players.len(),
            PLAYERS_PER_GAME,
            "Appstack is a 4-player game"
        );

        let mut rng = rand::thread_rng();

        let mut app_deck = standard_app_deck();
        shuffle_deck(&mut app_deck, &mut rng);

        let mut unused = standard_draw_pile();
        shuffle_deck(&mut unused, &mut rng);

        let player_names: HashMap<PlayerId, String> = players.iter().cloned().collect();
        let mut player_order: Vec<PlayerId> = players.into_iter().map(|(id, _)| id).collect();
        player_order.shuffle(&mut rng);

        let mut hands = HashMap::new();
        for &player in &player_order {
            let mut hand = Vec::with_capacity(HAND_SIZE);
            for _ in 0..HAND_SIZE {
                if let Some(card) = unused.pop() {
                    hand.push(card);
                }
            }
            hands.insert(player, hand);
        }

        Self {
            player_order,
            player_names,
            hands,
            app_deck,
            app_pile: Vec::new(),
            burned: Vec::new(),
            unused,
            current_turn: 0,
            last_draw_turn: HashMap::new(),
            pending_attack: None,
            current_message: None,
            status: GameStatus::Active,
            winner: None,
            resigned_by: None,
            resigned_players: Vec::new(),
            exited_players: Vec::new(),
            created_at: now_millis(),
        }
    }

    /// The player whose turn it is.
    pub fn current_player(&self) -> PlayerId {
        self.player_order[self.current_turn]
    }

    /// Whether the game has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.status, GameStatus::Active)
    }

    /// Total number of cards across every zone. Conserved for the whole
    /// game: always 128 for a standard deal.
    pub fn card_count(&self) -> usize {
        self.hands.values().map(Vec::len).sum::<usize>()
            + self.app_deck.len()
            + self.app_pile.len()
            + self.burned.len()
            + self.unused.len()
            + self.pending_attack.as_ref().map_or(0, |_| 1)
    }

    /// Apply a move for `actor`, producing the notification to display.
    ///
    /// On error the state may hold a partially applied mutation (the auto
    /// draw runs before index validation by design); callers must commit
    /// the state only on success.
    pub fn apply(&mut self, actor: PlayerId, action: GameAction) -> Result<Notification, GameError> {
        if self.is_terminal() {
            return Err(GameError::GameOver);
        }
        if !self.player_order.contains(&actor) {
            return Err(GameError::UnknownPlayer);
        }

        let note = match action {
            GameAction::PlayCard {
                hand_index,
                card_kind,
                target,
            } => self.play_card(actor, hand_index, card_kind, target)?,
            GameAction::Discard { hand_index } => self.discard(actor, hand_index)?,
            GameAction::Defend {
                hand_index,
                card_kind,
            } => self.defend(actor, hand_index, card_kind)?,
            GameAction::SubmitToAttack => self.submit_to_attack(actor)?,
            GameAction::Resign => self.resign(actor)?,
        };

        self.current_message = Some(note.clone());
        Ok(note)
    }

    // ==================== Transitions ====================

    fn play_card(
        &mut self,
        actor: PlayerId,
        hand_index: usize,
        card_kind: CardKind,
        target: Option<PlayerId>,
    ) -> Result<Notification, GameError> {
        if self.pending_attack.is_some() {
            return Err(GameError::AttackPending);
        }
        if actor != self.current_player() {
            return Err(GameError::NotYourTurn);
        }

        self.apply_auto_draw(actor);

        let hand = self.hands.get_mut(&actor).ok_or(GameError::UnknownPlayer)?;
        if hand_index >= hand.len() {
            return Err(GameError::HandIndexOutOfBounds(hand_index));
        }
        if hand[hand_index].kind() != card_kind {
            return Err(GameError::WrongCardKind);
        }

        match card_kind {
            CardKind::DownloadApp => {
                match self.app_deck.last() {
                    None => return Err(GameError::EmptyAppDeck),
                    Some(top) if !(1..=4).contains(&top.value) => {
                        // Upstream construction bug, not a user error
                        return Err(GameError::CorruptAppCard {
                            id: top.id.clone(),
                            value: top.value,
                        });
                    }
                    Some(_) => {}
                }

                let played = hand.remove(hand_index);
                let app = match self.app_deck.pop() {
                    Some(card) => card.owned_by(actor),
                    None => return Err(GameError::EmptyAppDeck),
                };

                self.burned.push(played);
                self.app_pile.push(app.clone());
                self.draw_to_three(actor);
                self.advance_turn(actor);
                self.check_win();

                Ok(Notification::DownloadApp {
                    by: actor,
                    card: app,
                    ts: now_millis(),
                })
            }

            // App cards never sit in a hand; the kind check above already
            // rejects this, but keep the arm total.
            CardKind::App => Err(GameError::WrongCardKind),

            attack => {
                let to = target.ok_or(GameError::MissingTarget)?;
                if !self.player_order.contains(&to) {
                    return Err(GameError::UnknownPlayer);
                }

                let card = hand.remove(hand_index);
                self.draw_to_three(actor);
                // Turn stays with the attacker until the target responds
                self.pending_attack = Some(PendingAttack {
                    kind: attack,
                    from: actor,
                    to,
                    card: card.clone(),
                });

                Ok(Notification::Attack {
                    by: actor,
                    card,
                    to,
                    ts: now_millis(),
                })
            }
        }
    }

    fn discard(&mut self, actor: PlayerId, hand_index: usize) -> Result<Notification, GameError> {
        if self.pending_attack.is_some() {
            return Err(GameError::AttackPending);
        }
        if actor != self.current_player() {
            return Err(GameError::NotYourTurn);
        }

        self.apply_auto_draw(actor);

        let hand = self.hands.get_mut(&actor).ok_or(GameError::UnknownPlayer)?;
        if hand_index >= hand.len() {
            return Err(GameError::HandIndexOutOfBounds(hand_index));
        }

        let card = hand.remove(hand_index);
        self.burned.push(card.clone());
        self.draw_to_three(actor);
        self.advance_turn(actor);

        Ok(Notification::Discard {
            by: actor,
            card,
            ts: now_millis(),
        })
    }

    fn defend(
        &mut self,
        actor: PlayerId,
        hand_index: usize,
        card_kind: CardKind,
    ) -> Result<Notification, GameError> {
        let pending = self
            .pending_attack
            .clone()
            .ok_or(GameError::NoPendingAttack)?;
        if pending.to != actor {
            return Err(GameError::NotYourResponse);
        }

        let hand = self.hands.get_mut(&actor).ok_or(GameError::UnknownPlayer)?;
        if hand_index >= hand.len() {
            return Err(GameError::HandIndexOutOfBounds(hand_index));
        }
        if hand[hand_index].kind() != card_kind {
            return Err(GameError::WrongCardKind);
        }

        let defense = hand.remove(hand_index);
        self.burned.push(pending.card.clone());
        self.burned.push(defense);
        self.pending_attack = None;
        self.draw_to_three(actor);
        // Rotates past the attacker's seat, which still holds the turn
        self.advance_turn(actor);

        Ok(Notification::Defend {
            by: actor,
            attacker: pending.from,
            card: card_kind,
            ts: now_millis(),
        })
    }

    fn submit_to_attack(&mut self, actor: PlayerId) -> Result<Notification, GameError> {
        let pending = self
            .pending_attack
            .clone()
            .ok_or(GameError::NoPendingAttack)?;
        if pending.to != actor {
            return Err(GameError::NotYourResponse);
        }

        self.burned.push(pending.card.clone());
        self.pending_attack = None;

        let mut rng = rand::thread_rng();
        let ts = now_millis();

        let note = match pending.kind {
            CardKind::ComputerVirus => match self.pick_owned_value(actor, &mut rng) {
                Some(value) => {
                    let pile = std::mem::take(&mut self.app_pile);
                    for card in pile {
                        if card.owner == Some(actor) && card.value == value {
                            self.app_deck.push(card.released());
                        } else {
                            self.app_pile.push(card);
                        }
                    }
                    self.app_deck.shuffle(&mut rng);

                    Notification::VirusReturn {
                        attacker: pending.from,
                        defender: actor,
                        ts,
                    }
                }
                None => Notification::SubmitAttack { by: actor, ts },
            },

            CardKind::HackerTheft => match self.pick_owned_value(actor, &mut rng) {
                Some(value) => {
                    for card in self.app_pile.iter_mut() {
                        if card.owner == Some(actor) && card.value == value {
                            card.owner = Some(pending.from);
                        }
                    }

                    Notification::HackerTheft {
                        attacker: pending.from,
                        defender: actor,
                        ts,
                    }
                }
                None => Notification::SubmitAttack { by: actor, ts },
            },

            // IT Guy and Firewall have no effect beyond the burned card
            _ => Notification::SubmitAttack { by: actor, ts },
        };

        self.draw_to_three(actor);
        self.advance_turn(actor);
        self.check_win();

        Ok(note)
    }

    fn resign(&mut self, actor: PlayerId) -> Result<Notification, GameError> {
        self.status = GameStatus::Resigned;
        self.resigned_by = Some(actor);
        if !self.resigned_players.contains(&actor) {
            self.resigned_players.push(actor);
        }

        Ok(Notification::Resigned {
            by: actor,
            ts: now_millis(),
        })
    }

    // ==================== Post-game ====================

    /// Record that `player` left the finished game.
    pub fn record_exit(&mut self, player: PlayerId) -> Result<(), GameError> {
        if !self.player_order.contains(&player) {
            return Err(GameError::UnknownPlayer);
        }
        if !self.exited_players.contains(&player) {
            self.exited_players.push(player);
        }
        Ok(())
    }

    /// Whether every player has resigned or exited; the game record can
    /// be deleted once this holds.
    pub fn all_players_done(&self) -> bool {
        self.player_order
            .iter()
            .filter(|p| self.exited_players.contains(p) || self.resigned_players.contains(p))
            .count()
            >= PLAYERS_PER_GAME
    }

    // ==================== Helper Methods ====================

    /// One face-down draw per player per turn index. App cards never
    /// enter a hand; a stray one is quarantined to the burn pile so the
    /// card count stays conserved.
    fn apply_auto_draw(&mut self, player: PlayerId) {
        if self.last_draw_turn.get(&player) == Some(&self.current_turn) {
            return;
        }
        if let Some(card) = self.unused.pop() {
            if card.is_app() {
                self.burned.push(card);
            } else if let Some(hand) = self.hands.get_mut(&player) {
                hand.push(card);
            }
        }
    }

    /// Refill `player`'s hand to three from the draw pile tail, filtering
    /// out app cards on both sides.
    fn draw_to_three(&mut self, player: PlayerId) {
        let hand = match self.hands.get_mut(&player) {
            Some(hand) => hand,
            None => return,
        };

        let mut i = 0;
        while i < hand.len() {
            if hand[i].is_app() {
                let stray = hand.remove(i);
                self.burned.push(stray);
            } else {
                i += 1;
            }
        }

        while hand.len() < HAND_SIZE {
            match self.unused.pop() {
                Some(card) if card.is_app() => self.burned.push(card),
                Some(card) => hand.push(card),
                None => break,
            }
        }
    }

    /// Rotate the turn and remember the actor's new draw turn.
    fn advance_turn(&mut self, actor: PlayerId) {
        let next = (self.current_turn + 1) % self.player_order.len();
        self.current_turn = next;
        self.last_draw_turn.insert(actor, next);
    }

    /// Uniform pick of one app card owned by `owner`; its value keys the
    /// whole group an attack acts on. Groups with more copies are
    /// therefore proportionally more likely to be chosen.
    fn pick_owned_value<R: Rng>(&self, owner: PlayerId, rng: &mut R) -> Option<u8> {
        let owned: Vec<&AppCard> = self
            .app_pile
            .iter()
            .filter(|card| card.owner == Some(owner))
            .collect();
        owned.choose(rng).map(|card| card.value)
    }

    fn check_win(&mut self) {
        if let Some(winner) = score::evaluate(&self.app_pile, &self.player_order) {
            self.status = GameStatus::Finished;
            self.winner = Some(winner);
        }
    }
}
