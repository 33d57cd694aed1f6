//! Request-scoped failure kinds. Every variant's `Display` string is the
//! human-readable reason sent back to the requester as a `NO: ` line.

use thiserror::Error;

use crate::data::ClientId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("{0}")]
    InvalidDimensions(String),

    #[error("the given coordinate {col} {row} is not in bounds of the game")]
    OutOfBounds { col: i64, row: i64 },

    #[error("there is already a game running")]
    GameInProgress,

    #[error("there is currently no board to click on")]
    NoActiveGame,

    #[error("you already have a nickname")]
    NicknameAlreadySet,

    #[error("{0}")]
    InvalidNickname(String),

    #[error("this nick was already taken by player {0}")]
    NicknameTaken(ClientId),

    #[error("{0}")]
    InvalidMessage(String),

    #[error("{0}")]
    BadArguments(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

/// Failure to hand a line to a client's outbound queue.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("outbound queue is full")]
    QueueFull,

    #[error("connection is closed")]
    Closed,
}
