//! Wire protocol shared between the game server and its clients.
//!
//! Frames are newline-terminated JSON text records. The field names and their
//! ordering are part of the protocol contract: `body[0]` is always the head,
//! and arrays preserve player/food insertion order.

use serde::{Deserialize, Serialize};

pub const GRID_WIDTH: i32 = 60;
pub const GRID_HEIGHT: i32 = 40;
pub const MAX_PLAYERS: usize = 4;
pub const INITIAL_BODY_LEN: usize = 3;
pub const FOOD_SCORE: u32 = 10;
pub const DEFAULT_PORT: u16 = 8765;
pub const TICK_INTERVAL_MS: u64 = 120;

/// Heading of a player, encoded on the wire as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn is_opposite(self, other: Direction) -> bool {
        other == self.opposite()
    }

    /// Grid delta for one tick of movement. Up decreases y.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

impl From<Direction> for u8 {
    fn from(direction: Direction) -> u8 {
        match direction {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = String;

    fn try_from(code: u8) -> Result<Direction, String> {
        match code {
            0 => Ok(Direction::Up),
            1 => Ok(Direction::Down),
            2 => Ok(Direction::Left),
            3 => Ok(Direction::Right),
            other => Err(format!("invalid direction code: {}", other)),
        }
    }
}

/// Integer grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub fn new(x: i32, y: i32) -> Self {
        Vec2 { x, y }
    }
}

/// Per-player state as broadcast to clients. `body[0]` is the head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: u32,
    pub alive: bool,
    pub dir: Direction,
    pub score: u32,
    pub body: Vec<Vec2>,
}

/// Deep snapshot of the simulation, safe to hold across tick boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub active: bool,
    pub players: Vec<PlayerState>,
    pub food: Vec<Vec2>,
}

/// One protocol frame. The `type` tag selects the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// Client -> server directional input. `playerId` is optional; without it
    /// the server falls back to the sending connection's assigned id.
    Input {
        #[serde(
            rename = "playerId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        player_id: Option<u32>,
        direction: Direction,
    },
    /// Server -> client state broadcast, sent once per tick.
    State {
        active: bool,
        players: Vec<PlayerState>,
        food: Vec<Vec2>,
    },
}

impl Message {
    pub fn state(snapshot: GameState) -> Message {
        Message::State {
            active: snapshot.active,
            players: snapshot.players,
            food: snapshot.food,
        }
    }

    /// Serializes the message as one newline-terminated frame.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Parses one frame, tolerating the trailing newline.
    pub fn from_line(line: &str) -> Result<Message, serde_json::Error> {
        serde_json::from_str(line.trim_end())
    }
}
