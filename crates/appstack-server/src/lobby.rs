//! Pre-game lobbies.
//!
//! Players gather in a lobby of four; the moment the fourth player joins,
//! the lobby converts into a live game and disappears. A player may sit in
//! at most one lobby at a time.

use crate::error::{ApiError, ApiResult};
use appstack_core::{GameState, PlayerId, PLAYERS_PER_GAME};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lobby snapshot sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyInfo {
    pub id: Uuid,
    pub creator: PlayerId,
    pub players: Vec<PlayerId>,
    pub player_names: Vec<String>,
    pub capacity: usize,
}

#[derive(Debug, Clone)]
struct Lobby {
    id: Uuid,
    creator: PlayerId,
    members: Vec<(PlayerId, String)>,
}

impl Lobby {
    fn to_info(&self) -> LobbyInfo {
        LobbyInfo {
            id: self.id,
            creator: self.creator,
            players: self.members.iter().map(|(id, _)| *id).collect(),
            player_names: self.members.iter().map(|(_, name)| name.clone()).collect(),
            capacity: PLAYERS_PER_GAME,
        }
    }
}

/// Outcome of a join: either the lobby is still filling, or it just
/// filled and produced a game.
#[derive(Debug)]
pub enum JoinOutcome {
    Waiting(LobbyInfo),
    GameReady {
        game_id: Uuid,
        members: Vec<PlayerId>,
        state: GameState,
    },
}

/// All open lobbies.
pub struct LobbyRegistry {
    lobbies: DashMap<Uuid, Lobby>,
    /// Which lobby each player currently sits in
    memberships: DashMap<PlayerId, Uuid>,
}

impl LobbyRegistry {
    pub fn new() -> Self {
        Self {
            lobbies: DashMap::new(),
            memberships: DashMap::new(),
        }
    }

    /// Create a lobby with the caller as its first member.
    pub fn create(&self, creator: PlayerId, name: String) -> ApiResult<LobbyInfo> {
        if self.memberships.contains_key(&creator) {
            return Err(ApiError::FailedPrecondition(
                "already in a lobby".into(),
            ));
        }

        let id = Uuid::new_v4();
        let lobby = Lobby {
            id,
            creator,
            members: vec![(creator, name)],
        };
        let info = lobby.to_info();
        self.lobbies.insert(id, lobby);
        self.memberships.insert(creator, id);
        Ok(info)
    }

    /// Join a lobby; filling the last seat converts it into a game.
    pub fn join(&self, lobby_id: Uuid, player: PlayerId, name: String) -> ApiResult<JoinOutcome> {
        if self.memberships.contains_key(&player) {
            return Err(ApiError::FailedPrecondition(
                "already in a lobby".into(),
            ));
        }

        let mut lobby = self
            .lobbies
            .get_mut(&lobby_id)
            .ok_or_else(|| ApiError::NotFound(format!("lobby {}", lobby_id)))?;

        if lobby.members.len() >= PLAYERS_PER_GAME {
            return Err(ApiError::FailedPrecondition("lobby is full".into()));
        }

        lobby.members.push((player, name));
        self.memberships.insert(player, lobby_id);

        if lobby.members.len() < PLAYERS_PER_GAME {
            return Ok(JoinOutcome::Waiting(lobby.to_info()));
        }

        // Fourth seat taken: the lobby becomes a game.
        let members: Vec<(PlayerId, String)> = lobby.members.clone();
        drop(lobby);
        self.lobbies.remove(&lobby_id);
        for (id, _) in &members {
            self.memberships.remove(id);
        }

        let member_ids: Vec<PlayerId> = members.iter().map(|(id, _)| *id).collect();
        Ok(JoinOutcome::GameReady {
            game_id: Uuid::new_v4(),
            members: member_ids,
            state: GameState::new(members),
        })
    }

    /// Leave the current lobby; an emptied lobby is deleted.
    pub fn leave(&self, player: PlayerId) -> ApiResult<Option<LobbyInfo>> {
        let (_, lobby_id) = self
            .memberships
            .remove(&player)
            .ok_or_else(|| ApiError::FailedPrecondition("not in a lobby".into()))?;

        let remaining = {
            let mut lobby = match self.lobbies.get_mut(&lobby_id) {
                Some(lobby) => lobby,
                None => return Ok(None),
            };
            lobby.members.retain(|(id, _)| *id != player);
            if lobby.members.is_empty() {
                None
            } else {
                Some(lobby.to_info())
            }
        };

        if remaining.is_none() {
            self.lobbies.remove(&lobby_id);
        }
        Ok(remaining)
    }

    /// Cancel a lobby outright. Only the creator may cancel.
    pub fn cancel(&self, lobby_id: Uuid, caller: PlayerId) -> ApiResult<()> {
        let lobby = self
            .lobbies
            .get(&lobby_id)
            .ok_or_else(|| ApiError::NotFound(format!("lobby {}", lobby_id)))?;

        if lobby.creator != caller {
            return Err(ApiError::FailedPrecondition(
                "only the creator may cancel".into(),
            ));
        }

        let members: Vec<PlayerId> = lobby.members.iter().map(|(id, _)| *id).collect();
        drop(lobby);

        self.lobbies.remove(&lobby_id);
        for id in members {
            self.memberships.remove(&id);
        }
        Ok(())
    }

    /// Open lobbies with free seats.
    pub fn open_lobbies(&self) -> Vec<LobbyInfo> {
        self.lobbies.iter().map(|e| e.value().to_info()).collect()
    }
}

impl Default for LobbyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str) -> (PlayerId, String) {
        (PlayerId::new_v4(), name.to_string())
    }

    #[test]
    fn test_create_and_join_until_full() {
        let registry = LobbyRegistry::new();
        let (creator, creator_name) = player("Ada");

        let info = registry.create(creator, creator_name).unwrap();
        assert_eq!(info.players, vec![creator]);

        let mut members = vec![creator];
        for name in ["Ben", "Cam"] {
            let (id, name) = player(name);
            members.push(id);
            match registry.join(info.id, id, name).unwrap() {
                JoinOutcome::Waiting(info) => assert_eq!(info.players, members),
                JoinOutcome::GameReady { .. } => panic!("lobby should still be filling"),
            }
        }

        let (last, last_name) = player("Dee");
        members.push(last);
        match registry.join(info.id, last, last_name).unwrap() {
            JoinOutcome::Waiting(_) => panic!("fourth join must start the game"),
            JoinOutcome::GameReady {
                members: game_members,
                state,
                ..
            } => {
                assert_eq!(game_members, members);
                assert_eq!(state.player_order.len(), PLAYERS_PER_GAME);
            }
        }

        // Lobby is gone and everyone is free to create again.
        assert!(registry.open_lobbies().is_empty());
        registry.create(creator, "Ada".into()).unwrap();
    }

    #[test]
    fn test_double_membership_rejected() {
        let registry = LobbyRegistry::new();
        let (creator, name) = player("Ada");

        registry.create(creator, name).unwrap();
        let err = registry.create(creator, "Ada".into()).unwrap_err();
        assert_eq!(err.kind(), "failed_precondition");
    }

    #[test]
    fn test_join_missing_lobby() {
        let registry = LobbyRegistry::new();
        let (joiner, name) = player("Ben");

        let err = registry.join(Uuid::new_v4(), joiner, name).unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_leave_empties_and_deletes() {
        let registry = LobbyRegistry::new();
        let (creator, creator_name) = player("Ada");
        let (joiner, joiner_name) = player("Ben");

        let info = registry.create(creator, creator_name).unwrap();
        registry.join(info.id, joiner, joiner_name).unwrap();

        let remaining = registry.leave(joiner).unwrap();
        assert_eq!(remaining.unwrap().players, vec![creator]);

        let remaining = registry.leave(creator).unwrap();
        assert!(remaining.is_none());
        assert!(registry.open_lobbies().is_empty());
    }

    #[test]
    fn test_only_creator_cancels() {
        let registry = LobbyRegistry::new();
        let (creator, creator_name) = player("Ada");
        let (joiner, joiner_name) = player("Ben");

        let info = registry.create(creator, creator_name).unwrap();
        registry.join(info.id, joiner, joiner_name).unwrap();

        let err = registry.cancel(info.id, joiner).unwrap_err();
        assert_eq!(err.kind(), "failed_precondition");

        registry.cancel(info.id, creator).unwrap();
        assert!(registry.open_lobbies().is_empty());

        // Memberships were released with the lobby.
        registry.create(joiner, "Ben".into()).unwrap();
    }
}
