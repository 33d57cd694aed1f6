use std::fmt;

use crate::data::ClientId;

/// One outbound protocol line. `Display` produces the exact wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// `YOU<id>`: tells a fresh connection its own id.
    Welcome(ClientId),
    /// `G<serialized board>`: full board state.
    Board(String),
    /// `A<id>`: current admin.
    Admin(ClientId),
    /// `PL<id> <score>`: player joined / roster snapshot line.
    PlayerJoined { id: ClientId, score: i64 },
    /// `PN<id> <nick>`: nickname assignment.
    NicknameSet { id: ClientId, nick: String },
    /// `PO<id>`: player left.
    PlayerLeft(ClientId),
    /// `F<col> <row> <score> <token>`: click result.
    CellRevealed {
        col: usize,
        row: usize,
        score: i64,
        token: String,
    },
    /// `OVER`: all safe fields explored.
    GameOver,
    /// `M<display>: <text>`: chat broadcast.
    Chat { from: String, text: String },
    /// `NO: <reason>`: unicast rejection.
    Rejected(String),
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Welcome(id) => write!(f, "YOU{id}"),
            Self::Board(board) => write!(f, "G{board}"),
            Self::Admin(id) => write!(f, "A{id}"),
            Self::PlayerJoined { id, score } => write!(f, "PL{id} {score}"),
            Self::NicknameSet { id, nick } => write!(f, "PN{id} {nick}"),
            Self::PlayerLeft(id) => write!(f, "PO{id}"),
            Self::CellRevealed {
                col,
                row,
                score,
                token,
            } => write!(f, "F{col} {row} {score} {token}"),
            Self::GameOver => write!(f, "OVER"),
            Self::Chat { from, text } => write!(f, "M{from}: {text}"),
            Self::Rejected(reason) => write!(f, "NO: {reason}"),
        }
    }
}
