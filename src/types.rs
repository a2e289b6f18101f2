use serde::Serialize;

use crate::constants;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    /// Fixed tie-break order for every grid decision: Up > Left > Down > Right.
    pub const PRIORITY: [Direction; 4] = [
        Direction::Up,
        Direction::Left,
        Direction::Down,
        Direction::Right,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// Cell delta, row 0 at the top.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::None => (0, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::None => Direction::None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Wall,
    Floor,
    Tunnel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostName {
    Blinky,
    Pinky,
    Inky,
    Clyde,
}

impl GhostName {
    pub const ALL: [GhostName; 4] = [
        GhostName::Blinky,
        GhostName::Pinky,
        GhostName::Inky,
        GhostName::Clyde,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostMode {
    Chase,
    Scatter,
    Frightened,
    Eaten,
}

/// Global chase/scatter alternation. Frightened and Eaten are per-ghost
/// overlays on top of this.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostPhase {
    Scatter,
    Chase,
}

/// How a ghost picks its chase target. One struct per ghost, one variant per
/// personality; the decision loop itself is shared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetStrategy {
    /// Blinky: the player's tile.
    Direct,
    /// Pinky: `lookahead` tiles past the player along its facing.
    Predictive { lookahead: i32 },
    /// Inky: Blinky's position reflected through a pivot ahead of the player.
    VectorOffset { pivot: i32 },
    /// Clyde: the player while far away, its own corner when close.
    DistanceGated { threshold: i32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    Trail,
    Ghost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub x: i32,
    pub y: i32,
    pub dir: Direction,
    pub lives: u32,
    pub score: u32,
    #[serde(rename = "powerTicks")]
    pub power_ticks: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct GhostView {
    pub name: GhostName,
    pub x: i32,
    pub y: i32,
    pub dir: Direction,
    pub mode: GhostMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct HazardView {
    pub x: i32,
    pub y: i32,
    pub ttl: u32,
}

/// Static level description sent once so the renderer can draw the board.
#[derive(Clone, Debug, Serialize)]
pub struct LevelInit {
    pub width: i32,
    pub height: i32,
    pub tiles: Vec<String>,
    #[serde(rename = "playerSpawn")]
    pub player_spawn: Vec2,
    #[serde(rename = "ghostSpawns")]
    pub ghost_spawns: Vec<Vec2>,
    pub pellets: Vec<(i32, i32)>,
    #[serde(rename = "powerPellets")]
    pub power_pellets: Vec<(i32, i32)>,
    #[serde(rename = "tunnelRows")]
    pub tunnel_rows: Vec<i32>,
}

/// Echo of the effective tuning, for hosts that display or log it.
#[derive(Clone, Debug, Serialize)]
pub struct GameConfig {
    #[serde(rename = "tickRate")]
    pub tick_rate: u32,
    #[serde(rename = "startingLives")]
    pub starting_lives: u32,
    #[serde(rename = "frightenedTicks")]
    pub frightened_ticks: u32,
    #[serde(rename = "trailBaseTtlTicks")]
    pub trail_base_ttl_ticks: u32,
    #[serde(rename = "trailWaveBonusTicks")]
    pub trail_wave_bonus_ticks: u32,
    #[serde(rename = "pinkyLookahead")]
    pub pinky_lookahead: i32,
    #[serde(rename = "inkyPivot")]
    pub inky_pivot: i32,
    #[serde(rename = "clydeThreshold")]
    pub clyde_threshold: i32,
    #[serde(rename = "ghostReleaseTicks")]
    pub ghost_release_ticks: u32,
}

/// Every knob a host may override. Defaults come from `constants`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tuning {
    pub starting_lives: u32,
    /// Tiles per second at wave 1.
    pub player_speed: f32,
    pub ghost_speed: f32,
    pub frightened_speed_multiplier: f32,
    pub eaten_speed_multiplier: f32,
    pub frightened_ticks: u32,
    pub trail_base_ttl_ticks: u32,
    pub trail_wave_bonus_ticks: u32,
    pub pinky_lookahead: i32,
    pub inky_pivot: i32,
    pub clyde_threshold: i32,
    pub ghost_release_ticks: u32,
    pub player_speed_cap: f32,
    pub ghost_speed_cap: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            starting_lives: constants::STARTING_LIVES,
            player_speed: constants::PLAYER_BASE_SPEED,
            ghost_speed: constants::GHOST_BASE_SPEED,
            frightened_speed_multiplier: constants::FRIGHTENED_SPEED_MULTIPLIER,
            eaten_speed_multiplier: constants::EATEN_SPEED_MULTIPLIER,
            frightened_ticks: constants::POWER_DURATION_TICKS,
            trail_base_ttl_ticks: constants::TRAIL_BASE_TTL_TICKS,
            trail_wave_bonus_ticks: constants::TRAIL_WAVE_BONUS_TICKS,
            pinky_lookahead: constants::PINKY_LOOKAHEAD,
            inky_pivot: constants::INKY_PIVOT,
            clyde_threshold: constants::CLYDE_THRESHOLD,
            ghost_release_ticks: constants::GHOST_RELEASE_TICKS,
            player_speed_cap: constants::PLAYER_SPEED_CAP,
            ghost_speed_cap: constants::GHOST_SPEED_CAP,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    PelletEaten {
        x: i32,
        y: i32,
    },
    PowerPelletEaten {
        x: i32,
        y: i32,
    },
    GhostEaten {
        ghost: GhostName,
    },
    LifeLost {
        cause: DeathCause,
        #[serde(rename = "livesLeft")]
        lives_left: u32,
    },
    PhaseChanged {
        phase: GhostPhase,
    },
    WaveCleared {
        wave: u32,
    },
    GameOver {
        score: u32,
        wave: u32,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub wave: u32,
    pub score: u32,
    pub lives: u32,
    pub phase: GhostPhase,
    #[serde(rename = "powerTicks")]
    pub power_ticks: u32,
    pub player: PlayerView,
    pub ghosts: Vec<GhostView>,
    pub hazards: Vec<HazardView>,
    #[serde(rename = "pelletsLeft")]
    pub pellets_left: u32,
    #[serde(rename = "powerPelletsLeft")]
    pub power_pellets_left: u32,
    pub events: Vec<RuntimeEvent>,
}
