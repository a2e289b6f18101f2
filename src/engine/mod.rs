use std::collections::BTreeSet;

use crate::constants::{
    ghost_speed_multiplier, phase_duration_ticks, player_speed_multiplier, trail_ttl_ticks,
    GHOST_SCORE, PELLET_SCORE, PHASE_SCHEDULE, POWER_PELLET_SCORE, TICK_RATE,
};
use crate::grid::Grid;
use crate::rng::Rng;
use crate::types::{
    DeathCause, Direction, GameConfig, GhostMode, GhostName, GhostPhase, GhostView, LevelInit,
    PlayerView, RuntimeEvent, Snapshot, TargetStrategy, Tuning, Vec2,
};

mod ghost_system;
mod trail_system;
mod utils;

pub use trail_system::TrailField;

use self::ghost_system::build_ghosts;
use self::utils::{manhattan, random_direction};

#[derive(Clone, Debug)]
struct PlayerInternal {
    view: PlayerView,
    desired_dir: Direction,
    move_buffer: f32,
    spawn: Vec2,
    has_moved: bool,
}

#[derive(Clone, Debug)]
struct GhostInternal {
    view: GhostView,
    strategy: TargetStrategy,
    scatter_corner: Vec2,
    home: Vec2,
    move_buffer: f32,
    reverse_pending: bool,
}

#[derive(Clone, Debug, Default)]
pub struct EngineOptions {
    pub tuning_override: Option<Tuning>,
}

fn mode_for_phase(phase: GhostPhase) -> GhostMode {
    match phase {
        GhostPhase::Scatter => GhostMode::Scatter,
        GhostPhase::Chase => GhostMode::Chase,
    }
}

/// The whole game behind two calls: `step` once per tick, `build_snapshot`
/// whenever the host wants to draw. Input arrives through `set_direction`.
#[derive(Clone, Debug)]
pub struct GameEngine {
    grid: Grid,
    tuning: Tuning,
    rng: Rng,

    player: PlayerInternal,
    ghosts: Vec<GhostInternal>,
    trail: TrailField,
    pellets: BTreeSet<(i32, i32)>,
    power_pellets: BTreeSet<(i32, i32)>,
    events: Vec<RuntimeEvent>,

    wave: u32,
    phase_index: usize,
    phase: GhostPhase,
    phase_ticks_left: u32,
    power_ticks_left: u32,
    ghosts_released: bool,
    ghost_hold_ticks: u32,
    tick_counter: u64,
    ended: bool,
}

impl GameEngine {
    pub fn new(grid: Grid, seed: u32, options: EngineOptions) -> Self {
        let tuning = options.tuning_override.unwrap_or_default();
        let mut rng = Rng::new(seed);
        let spawn = grid.player_spawn();
        let ghosts = build_ghosts(&grid, &tuning, &mut rng);
        let (phase, base_ticks) = PHASE_SCHEDULE[0];
        let pellets = grid.pellets().clone();
        let power_pellets = grid.power_pellets().clone();

        Self {
            player: PlayerInternal {
                view: PlayerView {
                    x: spawn.x,
                    y: spawn.y,
                    dir: Direction::None,
                    lives: tuning.starting_lives,
                    score: 0,
                    power_ticks: 0,
                },
                desired_dir: Direction::None,
                move_buffer: 0.0,
                spawn,
                has_moved: false,
            },
            ghosts,
            trail: TrailField::default(),
            pellets,
            power_pellets,
            events: Vec::new(),
            wave: 1,
            phase_index: 0,
            phase,
            phase_ticks_left: phase_duration_ticks(phase, base_ticks, 1),
            power_ticks_left: 0,
            ghosts_released: false,
            ghost_hold_ticks: 0,
            tick_counter: 0,
            ended: false,
            grid,
            tuning,
            rng,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Buffers one directional intent; a later call in the same tick replaces
    /// an earlier one. The buffer is consumed at the next tile boundary (or
    /// immediately while standing still) and dropped if the turn is blocked
    /// there.
    pub fn set_direction(&mut self, dir: Direction) {
        if dir == Direction::None {
            return;
        }
        self.player.desired_dir = dir;
    }

    /// Starts the game over on the same level, seed state, and tuning.
    pub fn restart(&mut self) {
        self.pellets = self.grid.pellets().clone();
        self.power_pellets = self.grid.power_pellets().clone();
        self.events.clear();
        self.wave = 1;
        self.phase_index = 0;
        let (phase, base_ticks) = PHASE_SCHEDULE[0];
        self.phase = phase;
        self.phase_ticks_left = phase_duration_ticks(phase, base_ticks, 1);
        self.tick_counter = 0;
        self.ended = false;
        self.player.view.lives = self.tuning.starting_lives;
        self.player.view.score = 0;
        self.reset_positions();
    }

    pub fn step(&mut self, dt_ms: u64) {
        if self.ended {
            return;
        }
        self.tick_counter += 1;
        self.update_mode_timers();

        let player_before = (self.player.view.x, self.player.view.y);
        let ghosts_before: Vec<(i32, i32)> = self
            .ghosts
            .iter()
            .map(|ghost| (ghost.view.x, ghost.view.y))
            .collect();

        if self.update_player(dt_ms) {
            // A trail death already reset the board; the rest of the tick is
            // moot.
            return;
        }
        self.update_ghost_release();
        if self.ghosts_active() {
            self.update_ghosts(dt_ms);
        }
        if self.resolve_ghost_collisions(player_before, &ghosts_before) {
            return;
        }
        self.trail.tick();
        self.check_wave_clear();
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let snapshot = Snapshot {
            tick: self.tick_counter,
            wave: self.wave,
            score: self.player.view.score,
            lives: self.player.view.lives,
            phase: self.phase,
            power_ticks: self.power_ticks_left,
            player: self.player.view.clone(),
            ghosts: self.ghosts.iter().map(|g| g.view.clone()).collect(),
            hazards: self.trail.view(),
            pellets_left: self.pellets.len() as u32,
            power_pellets_left: self.power_pellets.len() as u32,
            events: if include_events {
                self.events.clone()
            } else {
                Vec::new()
            },
        };
        if include_events {
            self.events.clear();
        }
        snapshot
    }

    pub fn level_init(&self) -> LevelInit {
        LevelInit {
            width: self.grid.width(),
            height: self.grid.height(),
            tiles: self.grid.rows().to_vec(),
            player_spawn: self.grid.player_spawn(),
            ghost_spawns: self.grid.ghost_spawns().to_vec(),
            pellets: self.grid.pellets().iter().copied().collect(),
            power_pellets: self.grid.power_pellets().iter().copied().collect(),
            tunnel_rows: self.grid.tunnel_rows(),
        }
    }

    pub fn config(&self) -> GameConfig {
        GameConfig {
            tick_rate: TICK_RATE,
            starting_lives: self.tuning.starting_lives,
            frightened_ticks: self.tuning.frightened_ticks,
            trail_base_ttl_ticks: self.tuning.trail_base_ttl_ticks,
            trail_wave_bonus_ticks: self.tuning.trail_wave_bonus_ticks,
            pinky_lookahead: self.tuning.pinky_lookahead,
            inky_pivot: self.tuning.inky_pivot,
            clyde_threshold: self.tuning.clyde_threshold,
            ghost_release_ticks: self.tuning.ghost_release_ticks,
        }
    }

    fn phase_mode(&self) -> GhostMode {
        mode_for_phase(self.phase)
    }

    /// Power timer first; while it runs the scatter/chase clock is frozen.
    fn update_mode_timers(&mut self) {
        if self.power_ticks_left > 0 {
            self.power_ticks_left -= 1;
            self.player.view.power_ticks = self.power_ticks_left;
            if self.power_ticks_left == 0 {
                self.end_frightened();
            }
            return;
        }
        if self.phase_ticks_left == u32::MAX {
            return;
        }
        if self.phase_ticks_left > 1 {
            self.phase_ticks_left -= 1;
            return;
        }
        self.advance_phase();
    }

    fn advance_phase(&mut self) {
        self.phase_index = (self.phase_index + 1).min(PHASE_SCHEDULE.len() - 1);
        let (phase, base_ticks) = PHASE_SCHEDULE[self.phase_index];
        self.phase = phase;
        self.phase_ticks_left = phase_duration_ticks(phase, base_ticks, self.wave);
        let mode = mode_for_phase(phase);
        for ghost in &mut self.ghosts {
            if ghost.view.mode != GhostMode::Eaten {
                ghost.view.mode = mode;
                ghost.reverse_pending = true;
            }
        }
        self.events.push(RuntimeEvent::PhaseChanged { phase });
    }

    /// Returns true when the player died this tick.
    fn update_player(&mut self, dt_ms: u64) -> bool {
        if self.player.view.dir == Direction::None {
            self.try_apply_buffered_turn();
            if self.player.view.dir == Direction::None {
                return false;
            }
        }
        let dt_sec = dt_ms as f32 / 1000.0;
        let speed = self.tuning.player_speed
            * player_speed_multiplier(self.wave, self.tuning.player_speed_cap);
        self.player.move_buffer += speed * dt_sec;
        let mut safety = 0;
        while self.player.move_buffer >= 1.0 {
            self.player.move_buffer -= 1.0;
            safety += 1;
            if safety > 6 {
                break;
            }
            if self.advance_player_one_cell() {
                return true;
            }
            if self.player.view.dir == Direction::None {
                break;
            }
        }
        false
    }

    /// Returns true when the step killed the player. The order inside a cell
    /// matters: hazard check on the entered tile first, then the vacated tile
    /// joins the trail, then pickups.
    fn advance_player_one_cell(&mut self) -> bool {
        self.try_apply_buffered_turn();
        let from = Vec2 {
            x: self.player.view.x,
            y: self.player.view.y,
        };
        let Some(next) = self.grid.step_from(from, self.player.view.dir) else {
            self.player.view.dir = Direction::None;
            self.player.move_buffer = 0.0;
            return false;
        };
        self.player.view.x = next.x;
        self.player.view.y = next.y;
        self.player.has_moved = true;

        if self.power_ticks_left == 0 && self.trail.is_hazard(next) {
            self.lose_life(DeathCause::Trail);
            return true;
        }
        let ttl = trail_ttl_ticks(
            self.tuning.trail_base_ttl_ticks,
            self.tuning.trail_wave_bonus_ticks,
            self.wave,
        );
        self.trail.deposit(from, ttl);
        self.apply_player_pickups();
        false
    }

    fn try_apply_buffered_turn(&mut self) {
        let desired = self.player.desired_dir;
        if desired == Direction::None {
            return;
        }
        // One shot: the buffer is either applied at this boundary or dropped.
        self.player.desired_dir = Direction::None;
        if desired == self.player.view.dir {
            return;
        }
        let pos = Vec2 {
            x: self.player.view.x,
            y: self.player.view.y,
        };
        if self.grid.step_from(pos, desired).is_some() {
            self.player.view.dir = desired;
        }
    }

    fn apply_player_pickups(&mut self) {
        let key = (self.player.view.x, self.player.view.y);
        if self.pellets.remove(&key) {
            self.player.view.score += PELLET_SCORE;
            self.events.push(RuntimeEvent::PelletEaten { x: key.0, y: key.1 });
        }
        if self.power_pellets.remove(&key) {
            self.player.view.score += POWER_PELLET_SCORE;
            self.events
                .push(RuntimeEvent::PowerPelletEaten { x: key.0, y: key.1 });
            self.begin_frightened();
        }
    }

    fn begin_frightened(&mut self) {
        self.power_ticks_left = self.tuning.frightened_ticks;
        self.player.view.power_ticks = self.power_ticks_left;
        for ghost in &mut self.ghosts {
            if ghost.view.mode != GhostMode::Eaten {
                ghost.view.mode = GhostMode::Frightened;
                ghost.reverse_pending = true;
            }
        }
    }

    fn end_frightened(&mut self) {
        self.player.view.power_ticks = 0;
        let mode = mode_for_phase(self.phase);
        for ghost in &mut self.ghosts {
            if ghost.view.mode == GhostMode::Frightened {
                ghost.view.mode = mode;
            }
        }
    }

    fn update_ghost_release(&mut self) {
        if !self.ghosts_released {
            if self.player.has_moved {
                self.ghosts_released = true;
                self.ghost_hold_ticks = self.tuning.ghost_release_ticks;
            }
        } else if self.ghost_hold_ticks > 0 {
            self.ghost_hold_ticks -= 1;
        }
    }

    fn ghosts_active(&self) -> bool {
        self.ghosts_released && self.ghost_hold_ticks == 0
    }

    /// Returns true when a touch cost a life.
    fn resolve_ghost_collisions(
        &mut self,
        player_before: (i32, i32),
        ghosts_before: &[(i32, i32)],
    ) -> bool {
        for idx in 0..self.ghosts.len() {
            let ghost_pos = (self.ghosts[idx].view.x, self.ghosts[idx].view.y);
            let player_pos = (self.player.view.x, self.player.view.y);
            let overlap = ghost_pos == player_pos;
            // Passing through each other within one tick counts as a touch.
            let swapped = ghosts_before.get(idx) == Some(&player_pos) && player_before == ghost_pos;
            if !overlap && !swapped {
                continue;
            }
            match self.ghosts[idx].view.mode {
                GhostMode::Eaten => {}
                GhostMode::Frightened => {
                    self.player.view.score += GHOST_SCORE;
                    self.events.push(RuntimeEvent::GhostEaten {
                        ghost: self.ghosts[idx].view.name,
                    });
                    self.ghosts[idx].view.mode = GhostMode::Eaten;
                    self.ghosts[idx].reverse_pending = false;
                }
                GhostMode::Chase | GhostMode::Scatter => {
                    self.lose_life(DeathCause::Ghost);
                    return true;
                }
            }
        }
        false
    }

    fn lose_life(&mut self, cause: DeathCause) {
        self.player.view.lives = self.player.view.lives.saturating_sub(1);
        self.events.push(RuntimeEvent::LifeLost {
            cause,
            lives_left: self.player.view.lives,
        });
        if self.player.view.lives == 0 {
            self.ended = true;
            self.events.push(RuntimeEvent::GameOver {
                score: self.player.view.score,
                wave: self.wave,
            });
            return;
        }
        self.reset_positions();
    }

    /// Everyone back to spawn; the trail and power timer go with them. The
    /// scatter/chase schedule keeps its place.
    fn reset_positions(&mut self) {
        self.player.view.x = self.player.spawn.x;
        self.player.view.y = self.player.spawn.y;
        self.player.view.dir = Direction::None;
        self.player.view.power_ticks = 0;
        self.player.desired_dir = Direction::None;
        self.player.move_buffer = 0.0;
        self.player.has_moved = false;
        self.power_ticks_left = 0;
        self.trail.clear();
        self.ghosts_released = false;
        self.ghost_hold_ticks = 0;
        let mode = mode_for_phase(self.phase);
        for ghost in &mut self.ghosts {
            ghost.view.x = ghost.home.x;
            ghost.view.y = ghost.home.y;
            ghost.view.dir = random_direction(&mut self.rng);
            ghost.view.mode = mode;
            ghost.move_buffer = 0.0;
            ghost.reverse_pending = false;
        }
    }

    fn check_wave_clear(&mut self) {
        if !self.pellets.is_empty() || !self.power_pellets.is_empty() {
            return;
        }
        self.wave += 1;
        self.events.push(RuntimeEvent::WaveCleared { wave: self.wave });
        self.pellets = self.grid.pellets().clone();
        self.power_pellets = self.grid.power_pellets().clone();
        self.reset_positions();
    }
}
