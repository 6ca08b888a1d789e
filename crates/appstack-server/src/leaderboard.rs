//! Win reporting and player score lookup.
//!
//! Reporting is best-effort and fire-and-forget: the service spawns it
//! after the winning move commits, and a failure can never undo the win.

use crate::error::{ApiError, ApiResult};
use appstack_core::PlayerId;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub player: PlayerId,
    pub name: String,
    pub wins: u64,
}

/// Sink for finished-game results.
#[async_trait]
pub trait ScoreReporter: Send + Sync {
    /// Record a win. Idempotent per `game_id`: a retried report of the
    /// same game must not double-count.
    async fn report_win(&self, game_id: Uuid, winner: PlayerId, name: &str) -> ApiResult<()>;

    /// Top scores, wins descending.
    async fn top_scores(&self, limit: usize) -> ApiResult<Vec<PlayerScore>>;
}

/// In-process leaderboard.
pub struct MemoryLeaderboard {
    scores: DashMap<PlayerId, PlayerScore>,
    reported_games: DashSet<Uuid>,
}

impl MemoryLeaderboard {
    pub fn new() -> Self {
        Self {
            scores: DashMap::new(),
            reported_games: DashSet::new(),
        }
    }
}

impl Default for MemoryLeaderboard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScoreReporter for MemoryLeaderboard {
    async fn report_win(&self, game_id: Uuid, winner: PlayerId, name: &str) -> ApiResult<()> {
        // insert returns false when the game was already reported
        if !self.reported_games.insert(game_id) {
            return Ok(());
        }

        self.scores
            .entry(winner)
            .and_modify(|row| {
                row.wins += 1;
                row.name = name.to_string();
            })
            .or_insert_with(|| PlayerScore {
                player: winner,
                name: name.to_string(),
                wins: 1,
            });

        Ok(())
    }

    async fn top_scores(&self, limit: usize) -> ApiResult<Vec<PlayerScore>> {
        if limit == 0 {
            return Err(ApiError::InvalidArgument("limit must be positive".into()));
        }

        let mut rows: Vec<PlayerScore> = self.scores.iter().map(|e| e.value().clone()).collect();
        rows.sort_by(|a, b| b.wins.cmp(&a.wins).then_with(|| a.name.cmp(&b.name)));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_report_win_is_idempotent_per_game() {
        let board = MemoryLeaderboard::new();
        let player = PlayerId::new_v4();
        let game = Uuid::new_v4();

        board.report_win(game, player, "Ada").await.unwrap();
        board.report_win(game, player, "Ada").await.unwrap();

        let rows = board.top_scores(10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].wins, 1);
    }

    #[tokio::test]
    async fn test_wins_accumulate_across_games() {
        let board = MemoryLeaderboard::new();
        let player = PlayerId::new_v4();

        board
            .report_win(Uuid::new_v4(), player, "Ada")
            .await
            .unwrap();
        board
            .report_win(Uuid::new_v4(), player, "Ada")
            .await
            .unwrap();

        let rows = board.top_scores(10).await.unwrap();
        assert_eq!(rows[0].wins, 2);
    }

    #[tokio::test]
    async fn test_top_scores_sorted_and_limited() {
        let board = MemoryLeaderboard::new();
        let ada = PlayerId::new_v4();
        let ben = PlayerId::new_v4();
        let cam = PlayerId::new_v4();

        for _ in 0..3 {
            board.report_win(Uuid::new_v4(), ben, "Ben").await.unwrap();
        }
        board.report_win(Uuid::new_v4(), ada, "Ada").await.unwrap();
        for _ in 0..2 {
            board.report_win(Uuid::new_v4(), cam, "Cam").await.unwrap();
        }

        let rows = board.top_scores(2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Ben");
        assert_eq!(rows[1].name, "Cam");
    }

    #[tokio::test]
    async fn test_zero_limit_rejected() {
        let board = MemoryLeaderboard::new();
        let err = board.top_scores(0).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }
}
