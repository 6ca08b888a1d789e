//! Game state storage.
//!
//! The store owns the only mutable copy of each game. All mutation goes
//! through [`GameStore::update`], which runs the closure under the game's
//! lock so no resolver call ever races another; a mutation error leaves
//! the stored snapshot untouched.

use crate::error::{ApiError, ApiResult};
use appstack_core::GameState;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// How long `update` waits on a game's lock before giving up.
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// A stored game with its commit counter.
#[derive(Debug, Clone)]
pub struct StoredGame {
    /// Bumped on every committed mutation
    pub version: u64,
    pub state: GameState,
}

/// Mutation applied to a game under its lock.
pub type Mutation = Box<dyn FnOnce(&mut GameState) -> ApiResult<()> + Send>;

/// Storage adapter for game state.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Snapshot of a game.
    async fn load(&self, game_id: Uuid) -> ApiResult<StoredGame>;

    /// Insert a new game. Fails if the id is taken.
    async fn insert(&self, game_id: Uuid, state: GameState) -> ApiResult<()>;

    /// Atomic read-modify-write. The mutation runs on a working copy
    /// under the game's lock; on `Ok` the copy is committed and the new
    /// snapshot returned, on `Err` nothing is written.
    async fn update(&self, game_id: Uuid, mutation: Mutation) -> ApiResult<StoredGame>;

    /// Delete a game record.
    async fn remove(&self, game_id: Uuid) -> ApiResult<()>;
}

/// In-process store backed by a concurrent map of per-game mutexes.
pub struct MemoryStore {
    games: DashMap<Uuid, Arc<Mutex<StoredGame>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            games: DashMap::new(),
        }
    }

    fn entry(&self, game_id: Uuid) -> ApiResult<Arc<Mutex<StoredGame>>> {
        self.games
            .get(&game_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| ApiError::NotFound(format!("game {}", game_id)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn load(&self, game_id: Uuid) -> ApiResult<StoredGame> {
        let entry = self.entry(game_id)?;
        let guard = entry.lock().await;
        Ok(guard.clone())
    }

    async fn insert(&self, game_id: Uuid, state: GameState) -> ApiResult<()> {
        use dashmap::mapref::entry::Entry;
        match self.games.entry(game_id) {
            Entry::Occupied(_) => Err(ApiError::Internal(format!(
                "game {} already exists",
                game_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(StoredGame { version: 0, state })));
                Ok(())
            }
        }
    }

    async fn update(&self, game_id: Uuid, mutation: Mutation) -> ApiResult<StoredGame> {
        let entry = self.entry(game_id)?;
        let mut guard = tokio::time::timeout(LOCK_TIMEOUT, entry.lock())
            .await
            .map_err(|_| ApiError::Conflict(format!("game {} is busy", game_id)))?;

        let mut working = guard.state.clone();
        mutation(&mut working)?;

        guard.state = working;
        guard.version += 1;
        Ok(guard.clone())
    }

    async fn remove(&self, game_id: Uuid) -> ApiResult<()> {
        self.games
            .remove(&game_id)
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound(format!("game {}", game_id)))
    }
}
