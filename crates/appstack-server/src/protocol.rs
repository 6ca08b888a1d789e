//! WebSocket protocol messages for Appstack multiplayer.

use crate::leaderboard::PlayerScore;
use crate::lobby::LobbyInfo;
use appstack_core::GameAction;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Open a new lobby with the caller seated
    CreateLobby { player_name: String },

    /// Take a seat in an open lobby
    JoinLobby { lobby_id: Uuid, player_name: String },

    /// Give up the current lobby seat
    LeaveLobby,

    /// Dissolve a lobby (creator only)
    CancelLobby { lobby_id: Uuid },

    /// Request the open lobby list
    ListLobbies,

    /// Submit a game move
    Move { game_id: Uuid, action: GameAction },

    /// Leave a finished game
    ReturnToLobby { game_id: Uuid },

    /// Request the leaderboard
    GetScores { limit: usize },

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned player ID
    Welcome { player_id: Uuid },

    /// Lobby created with the caller seated
    LobbyCreated { lobby: LobbyInfo },

    /// Lobby membership changed
    LobbyUpdated { lobby: LobbyInfo },

    /// Caller left their lobby
    LeftLobby,

    /// Lobby was cancelled by its creator
    LobbyCancelled { lobby_id: Uuid },

    /// Open lobbies
    LobbyList { lobbies: Vec<LobbyInfo> },

    /// A filled lobby became a game
    GameStarted {
        game_id: Uuid,
        state: serde_json::Value,
    },

    /// A move committed; full refreshed state plus the display event
    GameUpdated {
        game_id: Uuid,
        version: u64,
        state: serde_json::Value,
        notification: serde_json::Value,
    },

    /// Caller's exit from a finished game was recorded
    LeftGame { game_id: Uuid },

    /// Everyone has left; the game record is gone
    GameRemoved { game_id: Uuid },

    /// Leaderboard rows
    Scores { scores: Vec<PlayerScore> },

    /// Error occurred; `kind` is the stable taxonomy string
    Error { kind: String, message: String },

    /// Pong response
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;
    use appstack_core::CardKind;

    #[test]
    fn test_client_message_tagging() {
        let msg = ClientMessage::Move {
            game_id: Uuid::new_v4(),
            action: GameAction::PlayCard {
                hand_index: 0,
                card_kind: CardKind::DownloadApp,
                target: None,
            },
        };

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Move");
        assert!(json["payload"]["action"].is_object());

        let back: ClientMessage = serde_json::from_value(json).unwrap();
        assert!(matches!(back, ClientMessage::Move { .. }));
    }

    #[test]
    fn test_error_message_shape() {
        let msg = ServerMessage::Error {
            kind: "failed_precondition".into(),
            message: "Not your turn".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["payload"]["kind"], "failed_precondition");
    }
}
