use serde::Serialize;

use crate::data::ClientId;

#[derive(Serialize)]
pub struct PlayerStatus {
    pub id: ClientId,
    pub nickname: Option<String>,
    pub score: i64,
}

#[derive(Serialize)]
pub struct BoardStatus {
    pub width: usize,
    pub height: usize,
    pub mine_count: usize,
    pub fields_left: usize,
    pub game_over: bool,
}

#[derive(Serialize)]
pub struct LobbyStatus {
    pub players: Vec<PlayerStatus>,
    pub admin: Option<ClientId>,
    pub board: Option<BoardStatus>,
}
