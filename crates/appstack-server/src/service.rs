//! Game operations over the store.
//!
//! One service instance serves every connection. Each move runs the core
//! resolver inside [`GameStore::update`], so validation and mutation are
//! atomic per game; the win report is spawned after the commit and can
//! never block or fail a move.

use crate::error::{ApiError, ApiResult};
use crate::leaderboard::{PlayerScore, ScoreReporter};
use crate::store::{GameStore, StoredGame};
use appstack_core::{GameAction, GameState, GameStatus, Notification, PlayerId};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Result of a committed move.
#[derive(Debug)]
pub struct MoveOutcome {
    pub snapshot: StoredGame,
    pub notification: Notification,
}

pub struct GameService {
    store: Arc<dyn GameStore>,
    reporter: Arc<dyn ScoreReporter>,
}

impl GameService {
    pub fn new(store: Arc<dyn GameStore>, reporter: Arc<dyn ScoreReporter>) -> Self {
        Self { store, reporter }
    }

    /// Register a freshly created game.
    pub async fn start_game(&self, game_id: Uuid, state: GameState) -> ApiResult<()> {
        self.store.insert(game_id, state).await?;
        info!(%game_id, "game started");
        Ok(())
    }

    /// Snapshot for a reconnecting or spectating participant.
    pub async fn game_snapshot(&self, game_id: Uuid) -> ApiResult<StoredGame> {
        self.store.load(game_id).await
    }

    /// Apply one move for `actor` and return the committed snapshot.
    pub async fn submit_move(
        &self,
        game_id: Uuid,
        actor: PlayerId,
        action: GameAction,
    ) -> ApiResult<MoveOutcome> {
        let snapshot = self
            .store
            .update(
                game_id,
                Box::new(move |state| {
                    state.apply(actor, action).map_err(ApiError::from)?;
                    Ok(())
                }),
            )
            .await?;

        // apply() always records the notification it returned
        let notification = snapshot
            .state
            .current_message
            .clone()
            .ok_or_else(|| ApiError::Internal("committed move left no notification".into()))?;

        if snapshot.state.status == GameStatus::Finished {
            self.spawn_win_report(game_id, &snapshot.state);
        }

        Ok(MoveOutcome {
            snapshot,
            notification,
        })
    }

    /// Record that `player` left a finished game; once everyone has
    /// resigned or exited the record is deleted.
    pub async fn return_to_lobby(&self, game_id: Uuid, player: PlayerId) -> ApiResult<bool> {
        let snapshot = self
            .store
            .update(
                game_id,
                Box::new(move |state| {
                    if !state.is_terminal() {
                        return Err(ApiError::FailedPrecondition(
                            "game is still in progress".into(),
                        ));
                    }
                    state.record_exit(player).map_err(ApiError::from)
                }),
            )
            .await?;

        if snapshot.state.all_players_done() {
            self.store.remove(game_id).await?;
            info!(%game_id, "all players done, game removed");
            return Ok(true);
        }
        Ok(false)
    }

    /// Leaderboard lookup.
    pub async fn get_scores(&self, limit: usize) -> ApiResult<Vec<PlayerScore>> {
        self.reporter.top_scores(limit).await
    }

    fn spawn_win_report(&self, game_id: Uuid, state: &GameState) {
        let winner = match state.winner {
            Some(winner) => winner,
            None => return,
        };
        let name = state
            .player_names
            .get(&winner)
            .cloned()
            .unwrap_or_default();
        let reporter = Arc::clone(&self.reporter);

        tokio::spawn(async move {
            if let Err(err) = reporter.report_win(game_id, winner, &name).await {
                error!(%game_id, %winner, "win report failed: {}", err);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::MemoryLeaderboard;
    use crate::store::MemoryStore;
    use appstack_core::{AppCard, Card, CardKind, GameError};
    use std::collections::HashMap;
    use std::time::Duration;

    fn download(tag: &str) -> Card {
        Card::DownloadApp {
            id: format!("download_{}", tag),
        }
    }

    fn firewall(tag: &str) -> Card {
        Card::Firewall {
            id: format!("firewall_{}", tag),
        }
    }

    fn app(value: u8, tag: &str) -> AppCard {
        AppCard {
            id: format!("app_{}_{}", value, tag),
            value,
            owner: None,
        }
    }

    /// Scripted game one download away from a win for seat 0.
    fn near_win_game() -> GameState {
        let order: Vec<PlayerId> = (0..4).map(|_| PlayerId::new_v4()).collect();
        let leader = order[0];

        let mut hands = HashMap::new();
        for (i, &player) in order.iter().enumerate() {
            hands.insert(
                player,
                vec![
                    download(&format!("h{}a", i)),
                    firewall(&format!("h{}b", i)),
                    firewall(&format!("h{}c", i)),
                ],
            );
        }

        GameState {
            player_order: order.clone(),
            player_names: order
                .iter()
                .enumerate()
                .map(|(i, &id)| (id, format!("Player{}", i)))
                .collect(),
            hands,
            app_deck: vec![app(3, "d0")],
            app_pile: vec![app(4, "p0").owned_by(leader)],
            burned: Vec::new(),
            unused: (0..8).map(|i| firewall(&format!("u{}", i))).collect(),
            current_turn: 0,
            last_draw_turn: HashMap::new(),
            pending_attack: None,
            current_message: None,
            status: GameStatus::Active,
            winner: None,
            resigned_by: None,
            resigned_players: Vec::new(),
            exited_players: Vec::new(),
            created_at: 0,
        }
    }

    fn service() -> (GameService, Arc<MemoryLeaderboard>) {
        let board = Arc::new(MemoryLeaderboard::new());
        let service = GameService::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&board) as Arc<dyn ScoreReporter>,
        );
        (service, board)
    }

    #[tokio::test]
    async fn test_move_commits_and_returns_notification() {
        let (service, _) = service();
        let game_id = Uuid::new_v4();
        let state = near_win_game();
        let mover = state.player_order[1];
        let mut ok_state = state.clone();
        ok_state.current_turn = 1;

        service.start_game(game_id, ok_state).await.unwrap();

        let outcome = service
            .submit_move(game_id, mover, GameAction::Discard { hand_index: 0 })
            .await
            .unwrap();

        assert!(matches!(outcome.notification, Notification::Discard { .. }));
        assert_eq!(outcome.snapshot.version, 1);
        assert_eq!(outcome.snapshot.state.current_turn, 2);
    }

    #[tokio::test]
    async fn test_rejected_move_leaves_state_untouched() {
        let (service, _) = service();
        let game_id = Uuid::new_v4();
        let state = near_win_game();
        let off_turn = state.player_order[2];

        service.start_game(game_id, state).await.unwrap();

        let err = service
            .submit_move(game_id, off_turn, GameAction::Discard { hand_index: 0 })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "failed_precondition");
        assert_eq!(err.to_string(), format!("{}", ApiError::from(GameError::NotYourTurn)));

        let snapshot = service.game_snapshot(game_id).await.unwrap();
        assert_eq!(snapshot.version, 0);
    }

    #[tokio::test]
    async fn test_missing_game_is_not_found() {
        let (service, _) = service();

        let err = service
            .submit_move(
                Uuid::new_v4(),
                PlayerId::new_v4(),
                GameAction::Resign,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_winning_move_reports_score() {
        let (service, board) = service();
        let game_id = Uuid::new_v4();
        let state = near_win_game();
        let leader = state.player_order[0];

        service.start_game(game_id, state).await.unwrap();

        let outcome = service
            .submit_move(
                game_id,
                leader,
                GameAction::PlayCard {
                    hand_index: 0,
                    card_kind: CardKind::DownloadApp,
                    target: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.snapshot.state.status, GameStatus::Finished);
        assert_eq!(outcome.snapshot.state.winner, Some(leader));

        // The report is spawned; give it a few polls to land.
        let mut rows = Vec::new();
        for _ in 0..50 {
            rows = board.top_scores(10).await.unwrap();
            if !rows.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].player, leader);
        assert_eq!(rows[0].wins, 1);
    }

    #[tokio::test]
    async fn test_return_to_lobby_requires_terminal_game() {
        let (service, _) = service();
        let game_id = Uuid::new_v4();
        let state = near_win_game();
        let player = state.player_order[0];

        service.start_game(game_id, state).await.unwrap();

        let err = service.return_to_lobby(game_id, player).await.unwrap_err();
        assert_eq!(err.kind(), "failed_precondition");
    }

    #[tokio::test]
    async fn test_return_to_lobby_deletes_when_everyone_leaves() {
        let (service, _) = service();
        let game_id = Uuid::new_v4();
        let state = near_win_game();
        let order = state.player_order.clone();

        service.start_game(game_id, state).await.unwrap();
        service
            .submit_move(game_id, order[0], GameAction::Resign)
            .await
            .unwrap();

        // The resigner counts as done; the other three must exit.
        for &player in &order[1..3] {
            let deleted = service.return_to_lobby(game_id, player).await.unwrap();
            assert!(!deleted);
        }
        let deleted = service.return_to_lobby(game_id, order[3]).await.unwrap();
        assert!(deleted);

        let err = service.game_snapshot(game_id).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }
}
