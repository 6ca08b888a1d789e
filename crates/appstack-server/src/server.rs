//! WebSocket server and connection handling.

use crate::error::ApiError;
use crate::lobby::{JoinOutcome, LobbyRegistry};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::service::GameService;
use appstack_core::PlayerId;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    pub service: GameService,
    pub lobbies: LobbyRegistry,
    /// Participants of each live game, for broadcasts
    pub game_players: DashMap<Uuid, Vec<PlayerId>>,
    /// Mapping from player ID to their message sender
    pub player_senders: DashMap<PlayerId, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState {
    pub fn new(service: GameService) -> Self {
        Self {
            service,
            lobbies: LobbyRegistry::new(),
            game_players: DashMap::new(),
            player_senders: DashMap::new(),
        }
    }

    /// Send a message to a specific player.
    pub fn send_to_player(&self, player_id: PlayerId, msg: ServerMessage) {
        if let Some(sender) = self.player_senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    /// Broadcast a message to every participant of a game.
    pub fn broadcast_to_game(&self, game_id: Uuid, msg: ServerMessage) {
        if let Some(players) = self.game_players.get(&game_id) {
            for &player_id in players.iter() {
                self.send_to_player(player_id, msg.clone());
            }
        }
    }

    fn send_error(&self, player_id: PlayerId, err: &ApiError) {
        self.send_to_player(
            player_id,
            ServerMessage::Error {
                kind: err.kind().to_string(),
                message: err.to_string(),
            },
        );
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Appstack server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Assign a player ID
    let player_id = PlayerId::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.player_senders.insert(player_id, tx);

    // Send welcome message
    let welcome = ServerMessage::Welcome { player_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text.into())).await?;

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) {
                    handle_message(player_id, client_msg, &state).await;
                } else {
                    warn!("Invalid message from {}: {}", player_id, text);
                    state.send_error(
                        player_id,
                        &ApiError::InvalidArgument("unparseable message".into()),
                    );
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", player_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                state.send_to_player(player_id, ServerMessage::Pong);
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", player_id, e);
                break;
            }
            _ => {}
        }
    }

    // Clean up on disconnect. A lobby seat is released; a live game keeps
    // the player so they can reconnect and resign or finish later.
    let _ = state.lobbies.leave(player_id);
    state.player_senders.remove(&player_id);
    send_task.abort();

    info!("Connection closed for {}", player_id);
    Ok(())
}

/// Handle a client message.
async fn handle_message(player_id: PlayerId, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::CreateLobby { player_name } => {
            match state.lobbies.create(player_id, player_name) {
                Ok(lobby) => state.send_to_player(player_id, ServerMessage::LobbyCreated { lobby }),
                Err(e) => state.send_error(player_id, &e),
            }
        }

        ClientMessage::JoinLobby {
            lobby_id,
            player_name,
        } => match state.lobbies.join(lobby_id, player_id, player_name) {
            Ok(JoinOutcome::Waiting(lobby)) => {
                for &member in &lobby.players {
                    state.send_to_player(member, ServerMessage::LobbyUpdated { lobby: lobby.clone() });
                }
            }
            Ok(JoinOutcome::GameReady {
                game_id,
                members,
                state: game,
            }) => {
                let view = match serde_json::to_value(&game) {
                    Ok(view) => view,
                    Err(e) => {
                        error!(%game_id, "failed to serialize game state: {}", e);
                        state.send_error(player_id, &ApiError::Internal(e.to_string()));
                        return;
                    }
                };

                if let Err(e) = state.service.start_game(game_id, game).await {
                    error!(%game_id, "failed to start game: {}", e);
                    state.send_error(player_id, &e);
                    return;
                }

                state.game_players.insert(game_id, members.clone());
                for &member in &members {
                    state.send_to_player(
                        member,
                        ServerMessage::GameStarted {
                            game_id,
                            state: view.clone(),
                        },
                    );
                }
            }
            Err(e) => state.send_error(player_id, &e),
        },

        ClientMessage::LeaveLobby => match state.lobbies.leave(player_id) {
            Ok(remaining) => {
                state.send_to_player(player_id, ServerMessage::LeftLobby);
                if let Some(lobby) = remaining {
                    for &member in &lobby.players {
                        state.send_to_player(
                            member,
                            ServerMessage::LobbyUpdated { lobby: lobby.clone() },
                        );
                    }
                }
            }
            Err(e) => state.send_error(player_id, &e),
        },

        ClientMessage::CancelLobby { lobby_id } => {
            match state.lobbies.cancel(lobby_id, player_id) {
                Ok(()) => state.send_to_player(player_id, ServerMessage::LobbyCancelled { lobby_id }),
                Err(e) => state.send_error(player_id, &e),
            }
        }

        ClientMessage::ListLobbies => {
            let lobbies = state.lobbies.open_lobbies();
            state.send_to_player(player_id, ServerMessage::LobbyList { lobbies });
        }

        ClientMessage::Move { game_id, action } => {
            match state.service.submit_move(game_id, player_id, action).await {
                Ok(outcome) => {
                    let state_view = serde_json::to_value(&outcome.snapshot.state)
                        .unwrap_or(serde_json::Value::Null);
                    let note_view = serde_json::to_value(&outcome.notification)
                        .unwrap_or(serde_json::Value::Null);

                    state.broadcast_to_game(
                        game_id,
                        ServerMessage::GameUpdated {
                            game_id,
                            version: outcome.snapshot.version,
                            state: state_view,
                            notification: note_view,
                        },
                    );
                }
                Err(e) => state.send_error(player_id, &e),
            }
        }

        ClientMessage::ReturnToLobby { game_id } => {
            match state.service.return_to_lobby(game_id, player_id).await {
                Ok(true) => {
                    state.broadcast_to_game(game_id, ServerMessage::GameRemoved { game_id });
                    state.game_players.remove(&game_id);
                }
                Ok(false) => {
                    state.send_to_player(player_id, ServerMessage::LeftGame { game_id });
                }
                Err(e) => state.send_error(player_id, &e),
            }
        }

        ClientMessage::GetScores { limit } => match state.service.get_scores(limit).await {
            Ok(scores) => state.send_to_player(player_id, ServerMessage::Scores { scores }),
            Err(e) => state.send_error(player_id, &e),
        },

        ClientMessage::Ping => {
            state.send_to_player(player_id, ServerMessage::Pong);
        }
    }
}
