use std::fmt;

use serde::Serialize;

use crate::connection::Connection;

/// Score for exploring a mine.
pub const MINE_SCORE: i64 = -1000;
/// Base score for exploring a safe cell next to known territory.
pub const EXPLORE_SCORE: i64 = 25;
/// Per adjacent mine on the explored cell.
pub const DANGER_SCORE: i64 = 50;

/// Consecutive failed deliveries a client survives before being closed.
pub const MAX_DELIVERY_ERRORS: u8 = 5;

/// Identity of a connected player. Allocated from a monotonic counter
/// starting at 1 and never reused; the board stores these, never a live
/// connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub mines_around: u8,
    pub is_mine: bool,
    /// Set at most once, on the first click.
    pub explorer: Option<ClientId>,
}

#[derive(Debug)]
pub struct Board {
    pub width: usize,
    pub height: usize,
    pub mine_count: usize,
    /// Unexplored safe cells remaining; 0 means the game is over.
    pub fields_left: usize,
    /// Row-major, index = col + row * width.
    pub cells: Vec<Cell>,
}

pub struct ClientSession {
    pub id: ClientId,
    pub nickname: Option<String>,
    pub score: i64,
    pub connection: Box<dyn Connection>,
    pub error_count: u8,
}
