use std::{collections::BTreeMap, sync::Arc};

use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    connection::Connection,
    data::{
        Board, Cell, ClientId, ClientSession, DANGER_SCORE, EXPLORE_SCORE, MAX_DELIVERY_ERRORS,
        MINE_SCORE,
    },
    error::{DeliveryError, GameError},
    model::{
        api::{BoardStatus, LobbyStatus, PlayerStatus},
        client::ClientCommand,
        server::ServerMessage,
    },
};

pub type SharedLobby = Arc<Mutex<Lobby>>;

/// The single mutable session domain: registry, current board and admin
/// pointer all live behind one lock, so every named operation is atomic
/// relative to every other.
pub struct Lobby {
    clients: BTreeMap<ClientId, ClientSession>,
    board: Option<Board>,
    admin: Option<ClientId>,
    next_id: u64,
}

fn scatter_mines(width: usize, height: usize, mine_count: usize) -> Vec<bool> {
    let mut mines = Vec::with_capacity(width * height);
    let mut rng = rand::rng();

    let mut mines_left = mine_count;
    let length = width * height;
    for cells_left in (1..=length).rev() {
        let mine = rng.random_ratio(mines_left as u32, cells_left as u32);
        mines.push(mine);
        if mine {
            mines_left -= 1;
        }
    }

    mines
}

fn count_adjacent_mines(mines: &[bool], index: usize, width: usize, height: usize) -> u8 {
    let col = index % width;
    let row = index / width;
    let mut count = 0;

    for dy in -1..=1 {
        for dx in -1..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }

            let new_col = col as i32 + dx;
            let new_row = row as i32 + dy;

            if new_col >= 0
                && new_col < width as i32
                && new_row >= 0
                && new_row < height as i32
            {
                let adj_index = (new_col as usize) + (new_row as usize) * width;
                if mines[adj_index] {
                    count += 1;
                }
            }
        }
    }

    count
}

fn build_cells(width: usize, height: usize, mine_count: usize) -> Vec<Cell> {
    let mines = scatter_mines(width, height, mine_count);
    mines
        .iter()
        .enumerate()
        .map(|(i, &is_mine)| Cell {
            is_mine,
            mines_around: count_adjacent_mines(&mines, i, width, height),
            explorer: None,
        })
        .collect()
}

fn parse_board_number(token: &str) -> Result<i64, GameError> {
    token
        .parse()
        .map_err(|_| GameError::InvalidDimensions(format!("not a number: {token}")))
}

impl Cell {
    /// Whitespace-free wire token: `_` while unexplored, otherwise `X` or
    /// the adjacency digit immediately followed by the explorer's id.
    pub fn token(&self) -> String {
        match self.explorer {
            None => "_".to_string(),
            Some(id) if self.is_mine => format!("X{id}"),
            Some(id) => format!("{}{}", self.mines_around, id),
        }
    }
}

/// Outcome of a resolved click, for the coordinator to format and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickOutcome {
    pub col: usize,
    pub row: usize,
    pub score: i64,
    pub token: String,
}

impl Board {
    pub fn new(width: i64, height: i64, mine_count: i64) -> Result<Self, GameError> {
        if width < 1 || height < 1 || mine_count < 0 {
            return Err(GameError::InvalidDimensions(
                "min: 1x1 with 0 mines".to_string(),
            ));
        }
        if width > 64 || height > 64 {
            return Err(GameError::InvalidDimensions("too big game field".to_string()));
        }
        let (width, height, mine_count) = (width as usize, height as usize, mine_count as usize);
        if mine_count * 3 > width * height {
            return Err(GameError::InvalidDimensions(
                "1/3 of fields can be mines at max".to_string(),
            ));
        }

        Ok(Self {
            width,
            height,
            mine_count,
            fields_left: width * height - mine_count,
            cells: build_cells(width, height, mine_count),
        })
    }

    /// Parses `"<width> <height> [<mine count>]"`; a missing mine count
    /// defaults to a fifth of the cell count.
    pub fn from_spec(spec: &str) -> Result<Self, GameError> {
        let tokens: Vec<&str> = spec.split_whitespace().collect();
        if tokens.len() != 2 && tokens.len() != 3 {
            return Err(GameError::InvalidDimensions(
                "new game takes 2 or 3 parameters: width, height and optionally mine count"
                    .to_string(),
            ));
        }
        let width = parse_board_number(tokens[0])?;
        let height = parse_board_number(tokens[1])?;
        let mine_count = match tokens.get(2) {
            Some(token) => parse_board_number(token)?,
            None => width * height / 5,
        };
        Self::new(width, height, mine_count)
    }

    /// `"<width> <height> <mineCount>"` followed by one token per cell in
    /// column-major order.
    pub fn serialize(&self) -> String {
        let mut out = format!("{} {} {}", self.width, self.height, self.mine_count);
        for col in 0..self.width {
            for row in 0..self.height {
                out.push(' ');
                out.push_str(&self.cells[col + row * self.width].token());
            }
        }
        out
    }

    pub fn is_game_over(&self) -> bool {
        self.fields_left == 0
    }

    fn is_explored(&self, col: i64, row: i64) -> bool {
        col >= 0
            && col < self.width as i64
            && row >= 0
            && row < self.height as i64
            && self.cells[col as usize + row as usize * self.width].explorer.is_some()
    }

    /// True when the cell and its whole 8-neighborhood are still unexplored.
    fn is_unseen(&self, col: usize, row: usize) -> bool {
        for dy in -1..=1 {
            for dx in -1..=1 {
                if self.is_explored(col as i64 + dx, row as i64 + dy) {
                    return false;
                }
            }
        }
        true
    }

    /// Scoring is evaluated against the pre-click state of the board.
    fn score_for(&self, col: usize, row: usize) -> i64 {
        let cell = &self.cells[col + row * self.width];
        if cell.explorer.is_some() {
            return 0;
        }
        if cell.is_mine {
            return MINE_SCORE;
        }
        if self.is_unseen(col, row) {
            // Sized so that clicking through an entirely unseen board nets
            // zero against the mines hit along the way.
            return -MINE_SCORE * self.mine_count as i64
                / (self.width * self.height - self.mine_count) as i64;
        }
        EXPLORE_SCORE + cell.mines_around as i64 * DANGER_SCORE
    }

    pub fn click(&mut self, who: ClientId, col: i64, row: i64) -> Result<ClickOutcome, GameError> {
        if col < 0 || row < 0 || col >= self.width as i64 || row >= self.height as i64 {
            return Err(GameError::OutOfBounds { col, row });
        }
        let (col, row) = (col as usize, row as usize);

        let score = self.score_for(col, row);
        let index = col + row * self.width;
        if self.cells[index].explorer.is_none() {
            if !self.cells[index].is_mine {
                self.fields_left -= 1;
            }
            self.cells[index].explorer = Some(who);
        }

        Ok(ClickOutcome {
            col,
            row,
            score,
            token: self.cells[index].token(),
        })
    }
}

impl ClientSession {
    pub fn new(id: ClientId, connection: Box<dyn Connection>) -> Self {
        Self {
            id,
            nickname: None,
            score: 0,
            connection,
            error_count: 0,
        }
    }

    pub fn display_name(&self) -> String {
        self.nickname
            .clone()
            .unwrap_or_else(|| format!("player{}", self.id))
    }

    /// Fire-and-forget delivery with the per-client error budget: a failure
    /// never propagates to the caller, but five consecutive ones close the
    /// connection.
    pub fn send_guarded(&mut self, line: &str) {
        match self.connection.deliver(line) {
            Ok(()) => self.error_count = 0,
            Err(err) => {
                self.error_count += 1;
                warn!(
                    "delivery to client {} failed ({err}), consecutive errors: {}",
                    self.id, self.error_count
                );
                if self.error_count >= MAX_DELIVERY_ERRORS {
                    warn!("client {} exhausted its error budget, closing", self.id);
                    self.connection.close();
                }
            }
        }
    }
}

impl Lobby {
    pub fn new() -> Self {
        Self {
            clients: BTreeMap::new(),
            board: None,
            admin: None,
            next_id: 0,
        }
    }

    pub fn admin(&self) -> Option<ClientId> {
        self.admin
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    /// Registers a new connection: bootstraps it (own id, board, roster,
    /// admin), then inserts it and announces the join to everyone including
    /// the newcomer. Any bootstrap delivery failure aborts the registration
    /// and the connection is dropped; the consumed id is not reused.
    pub fn connect(&mut self, mut connection: Box<dyn Connection>) -> Result<ClientId, DeliveryError> {
        self.next_id += 1;
        let id = ClientId(self.next_id);

        connection.deliver(&ServerMessage::Welcome(id).to_string())?;
        if let Some(board) = &self.board {
            connection.deliver(&ServerMessage::Board(board.serialize()).to_string())?;
        }
        for client in self.clients.values() {
            connection.deliver(
                &ServerMessage::PlayerJoined {
                    id: client.id,
                    score: client.score,
                }
                .to_string(),
            )?;
            if let Some(nick) = &client.nickname {
                connection.deliver(
                    &ServerMessage::NicknameSet {
                        id: client.id,
                        nick: nick.clone(),
                    }
                    .to_string(),
                )?;
            }
        }
        if self.clients.is_empty() {
            self.admin = Some(id);
            info!("new admin: {id}");
        }
        if let Some(admin) = self.admin {
            connection.deliver(&ServerMessage::Admin(admin).to_string())?;
        }

        self.clients.insert(id, ClientSession::new(id, connection));
        self.broadcast(&ServerMessage::PlayerJoined { id, score: 0 });
        info!("client {id} successfully connected");
        Ok(id)
    }

    /// Removes a client; if it held the admin role, the smallest remaining
    /// id is promoted and announced before the departure broadcast.
    pub fn disconnect(&mut self, id: ClientId) {
        let Some(leaver) = self.clients.remove(&id) else {
            return;
        };
        info!("client {} aka {} is leaving", id, leaver.display_name());

        if self.admin == Some(id) {
            self.admin = self.clients.keys().next().copied();
            match self.admin {
                Some(new_admin) => {
                    info!("the leaver was admin, new admin: {new_admin}");
                    self.broadcast(&ServerMessage::Admin(new_admin));
                }
                None => info!("nobody is left, admin is now unset"),
            }
        }
        self.broadcast(&ServerMessage::PlayerLeft(id));
    }

    /// Starts a new game. Allowed for anyone when there is no board yet or
    /// the current one is finished; only the admin may cut a running game
    /// short.
    pub fn start_game(&mut self, requester: ClientId, spec: &str) -> Result<(), GameError> {
        let allowed = match &self.board {
            None => true,
            Some(board) => board.is_game_over() || self.admin == Some(requester),
        };
        if !allowed {
            debug!("{requester} tried creating a game while one was running");
            return Err(GameError::GameInProgress);
        }

        let board = Board::from_spec(spec)?;
        info!(
            "starting new game: {}x{} with {} mines",
            board.width, board.height, board.mine_count
        );
        let serialized = board.serialize();
        self.board = Some(board);
        self.broadcast(&ServerMessage::Board(serialized));
        Ok(())
    }

    /// Resolves one click atomically: scoring, cell mutation, score
    /// application and the result broadcast all happen under the caller's
    /// lock, so concurrent clicks can never double-score a cell.
    pub fn click(&mut self, requester: ClientId, col: i64, row: i64) -> Result<(), GameError> {
        let board = self.board.as_mut().ok_or(GameError::NoActiveGame)?;
        let outcome = board.click(requester, col, row)?;
        let over = board.is_game_over();

        if outcome.score != 0
            && let Some(client) = self.clients.get_mut(&requester)
        {
            client.score += outcome.score;
        }

        debug!(
            "client {requester} clicked ({}, {}) for {} points",
            outcome.col, outcome.row, outcome.score
        );
        self.broadcast(&ServerMessage::CellRevealed {
            col: outcome.col,
            row: outcome.row,
            score: outcome.score,
            token: outcome.token,
        });
        if over {
            info!("game over, all safe fields explored");
            self.broadcast(&ServerMessage::GameOver);
        }
        Ok(())
    }

    /// Claims a nickname: write-once, no protocol delimiters, unique among
    /// connected clients ignoring ASCII case.
    pub fn set_nickname(&mut self, requester: ClientId, nick: &str) -> Result<(), GameError> {
        if self
            .clients
            .get(&requester)
            .is_some_and(|client| client.nickname.is_some())
        {
            return Err(GameError::NicknameAlreadySet);
        }
        if nick.is_empty() {
            return Err(GameError::InvalidNickname("nickname cannot be empty".to_string()));
        }
        if nick.contains('\n') || nick.contains(": ") {
            return Err(GameError::InvalidNickname(
                "no newline or \": \" allowed in nickname".to_string(),
            ));
        }
        if let Some(holder) = self.clients.values().find(|client| {
            client
                .nickname
                .as_deref()
                .is_some_and(|existing| existing.eq_ignore_ascii_case(nick))
        }) {
            return Err(GameError::NicknameTaken(holder.id));
        }

        let Some(client) = self.clients.get_mut(&requester) else {
            return Ok(());
        };
        client.nickname = Some(nick.to_string());
        info!("client {requester} is now known as {nick}");
        self.broadcast(&ServerMessage::NicknameSet {
            id: requester,
            nick: nick.to_string(),
        });
        Ok(())
    }

    pub fn chat(&mut self, requester: ClientId, text: &str) -> Result<(), GameError> {
        if text.contains('\n') {
            return Err(GameError::InvalidMessage(
                "no newline allowed in message".to_string(),
            ));
        }
        if text.chars().count() > 160 {
            return Err(GameError::InvalidMessage(
                "only 160 characters allowed in chat message".to_string(),
            ));
        }

        let from = self
            .clients
            .get(&requester)
            .map(ClientSession::display_name)
            .unwrap_or_else(|| format!("player{requester}"));
        self.broadcast(&ServerMessage::Chat {
            from,
            text: text.to_string(),
        });
        Ok(())
    }

    /// Dispatcher entry: decodes one inbound line from `who`, runs the
    /// operation, and answers failures with a unicast `NO: ` line. Empty
    /// lines are dropped.
    pub fn handle_line(&mut self, who: ClientId, line: &str) {
        if line.is_empty() {
            warn!("ignoring empty command from {who}");
            return;
        }

        let result = match ClientCommand::parse(line) {
            Ok(ClientCommand::Chat(text)) => self.chat(who, &text),
            Ok(ClientCommand::NewGame(spec)) => self.start_game(who, &spec),
            Ok(ClientCommand::Click { col, row }) => self.click(who, col, row),
            Ok(ClientCommand::Nickname(nick)) => self.set_nickname(who, &nick),
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            debug!("rejecting command from {who}: {err}");
            self.send_to(who, &ServerMessage::Rejected(err.to_string()));
        }
    }

    pub fn send_to(&mut self, id: ClientId, message: &ServerMessage) {
        if let Some(client) = self.clients.get_mut(&id) {
            client.send_guarded(&message.to_string());
        }
    }

    /// Delivers a line to every registered client. Failures only count
    /// against the failing client's error budget; the rest of the fan-out
    /// is unaffected.
    pub fn broadcast(&mut self, message: &ServerMessage) {
        let line = message.to_string();
        for client in self.clients.values_mut() {
            client.send_guarded(&line);
        }
    }

    pub fn status(&self) -> LobbyStatus {
        LobbyStatus {
            players: self
                .clients
                .values()
                .map(|client| PlayerStatus {
                    id: client.id,
                    nickname: client.nickname.clone(),
                    score: client.score,
                })
                .collect(),
            admin: self.admin,
            board: self.board.as_ref().map(|board| BoardStatus {
                width: board.width,
                height: board.height,
                mine_count: board.mine_count,
                fields_left: board.fields_left,
                game_over: board.is_game_over(),
            }),
        }
    }
}

impl Default for Lobby {
    fn default() -> Self {
        Self::new()
    }
}
