use super::*;

pub(super) fn strategy_for(name: GhostName, tuning: &Tuning) -> TargetStrategy {
    match name {
        GhostName::Blinky => TargetStrategy::Direct,
        GhostName::Pinky => TargetStrategy::Predictive {
            lookahead: tuning.pinky_lookahead,
        },
        GhostName::Inky => TargetStrategy::VectorOffset {
            pivot: tuning.inky_pivot,
        },
        GhostName::Clyde => TargetStrategy::DistanceGated {
            threshold: tuning.clyde_threshold,
        },
    }
}

pub(super) fn scatter_corner(name: GhostName, grid: &Grid) -> Vec2 {
    let (w, h) = (grid.width(), grid.height());
    match name {
        GhostName::Blinky => Vec2 { x: w - 2, y: 1 },
        GhostName::Pinky => Vec2 { x: 1, y: 1 },
        GhostName::Inky => Vec2 { x: w - 2, y: h - 2 },
        GhostName::Clyde => Vec2 { x: 1, y: h - 2 },
    }
}

/// Always four ghosts. Levels with fewer spawn cells share homes round-robin.
pub(super) fn build_ghosts(grid: &Grid, tuning: &Tuning, rng: &mut Rng) -> Vec<GhostInternal> {
    let spawns = grid.ghost_spawns();
    GhostName::ALL
        .iter()
        .enumerate()
        .map(|(idx, &name)| {
            let home = spawns[idx % spawns.len()];
            GhostInternal {
                view: GhostView {
                    name,
                    x: home.x,
                    y: home.y,
                    dir: random_direction(rng),
                    mode: GhostMode::Scatter,
                },
                strategy: strategy_for(name, tuning),
                scatter_corner: scatter_corner(name, grid),
                home,
                move_buffer: 0.0,
                reverse_pending: false,
            }
        })
        .collect()
}

impl GameEngine {
    pub(super) fn update_ghosts(&mut self, dt_ms: u64) {
        let dt_sec = dt_ms as f32 / 1000.0;
        let base_speed = self.tuning.ghost_speed
            * ghost_speed_multiplier(self.wave, self.tuning.ghost_speed_cap);

        for idx in 0..self.ghosts.len() {
            let speed = match self.ghosts[idx].view.mode {
                GhostMode::Frightened => base_speed * self.tuning.frightened_speed_multiplier,
                GhostMode::Eaten => base_speed * self.tuning.eaten_speed_multiplier,
                GhostMode::Chase | GhostMode::Scatter => base_speed,
            };
            self.ghosts[idx].move_buffer += speed * dt_sec;
            let mut safety = 0;
            while self.ghosts[idx].move_buffer >= 1.0 {
                self.ghosts[idx].move_buffer -= 1.0;
                safety += 1;
                if safety > 5 {
                    break;
                }
                self.advance_ghost_one_cell(idx);
            }
        }
    }

    pub(super) fn advance_ghost_one_cell(&mut self, idx: usize) {
        let dir = self.choose_ghost_direction(idx);
        let pos = Vec2 {
            x: self.ghosts[idx].view.x,
            y: self.ghosts[idx].view.y,
        };
        let Some(next) = self.grid.step_from(pos, dir) else {
            return;
        };
        self.ghosts[idx].view.x = next.x;
        self.ghosts[idx].view.y = next.y;
        self.ghosts[idx].view.dir = dir;
        if self.ghosts[idx].view.mode == GhostMode::Eaten && next == self.ghosts[idx].home {
            self.ghosts[idx].view.mode = self.phase_mode();
            self.ghosts[idx].reverse_pending = false;
        }
    }

    /// One decision per tile boundary. Eaten ghosts path home and ignore the
    /// no-reverse rule; everyone else greedily minimizes Manhattan distance to
    /// their target over the legal non-reversing neighbors, ties falling to
    /// the direction priority.
    pub(super) fn choose_ghost_direction(&mut self, idx: usize) -> Direction {
        let pos = Vec2 {
            x: self.ghosts[idx].view.x,
            y: self.ghosts[idx].view.y,
        };

        if self.ghosts[idx].view.mode == GhostMode::Eaten {
            if pos == self.ghosts[idx].home {
                // Eaten where it respawns; rejoin the phase without moving.
                self.ghosts[idx].view.mode = self.phase_mode();
                self.ghosts[idx].reverse_pending = false;
            } else {
                return self
                    .grid
                    .first_step_toward(pos, self.ghosts[idx].home)
                    .unwrap_or(Direction::None);
            }
        }

        let current = self.ghosts[idx].view.dir;
        if self.ghosts[idx].reverse_pending {
            self.ghosts[idx].reverse_pending = false;
            let back = current.opposite();
            if self.grid.step_from(pos, back).is_some() {
                return back;
            }
        }

        let neighbors = self.grid.open_neighbors(pos);
        if neighbors.is_empty() {
            return Direction::None;
        }
        let back = current.opposite();
        let mut options: Vec<(Direction, Vec2)> = neighbors
            .iter()
            .copied()
            .filter(|(dir, _)| *dir != back)
            .collect();
        if options.is_empty() {
            // dead end; reversing is the only way out
            options = neighbors;
        }

        if self.ghosts[idx].view.mode == GhostMode::Frightened {
            return options[self.rng.pick_index(options.len())].0;
        }

        let target = self.ghost_target(idx);
        let mut best = options[0];
        let mut best_dist = manhattan(best.1.x, best.1.y, target.x, target.y);
        for &(dir, cell) in options.iter().skip(1) {
            let dist = manhattan(cell.x, cell.y, target.x, target.y);
            if dist < best_dist {
                best = (dir, cell);
                best_dist = dist;
            }
        }
        best.0
    }

    pub(super) fn ghost_target(&self, idx: usize) -> Vec2 {
        let ghost = &self.ghosts[idx];
        if ghost.view.mode == GhostMode::Scatter {
            return ghost.scatter_corner;
        }

        let player = Vec2 {
            x: self.player.view.x,
            y: self.player.view.y,
        };
        let facing = if self.player.view.dir != Direction::None {
            self.player.view.dir
        } else if self.player.desired_dir != Direction::None {
            self.player.desired_dir
        } else {
            Direction::Left
        };
        let (dx, dy) = facing.delta();

        match ghost.strategy {
            TargetStrategy::Direct => player,
            TargetStrategy::Predictive { lookahead } => self
                .grid
                .clamp(player.x + dx * lookahead, player.y + dy * lookahead),
            TargetStrategy::VectorOffset { pivot } => {
                let pivot_cell = self.grid.clamp(player.x + dx * pivot, player.y + dy * pivot);
                let anchor = self
                    .ghosts
                    .iter()
                    .find(|other| other.view.name == GhostName::Blinky)
                    .map(|other| Vec2 {
                        x: other.view.x,
                        y: other.view.y,
                    })
                    .unwrap_or(player);
                self.grid
                    .clamp(2 * pivot_cell.x - anchor.x, 2 * pivot_cell.y - anchor.y)
            }
            TargetStrategy::DistanceGated { threshold } => {
                if manhattan(ghost.view.x, ghost.view.y, player.x, player.y) > threshold {
                    player
                } else {
                    ghost.scatter_corner
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::{EngineOptions, GameEngine};
    use crate::grid::Grid;
    use crate::types::{Direction, GhostMode, GhostName, Vec2};

    const ARENA: [&str; 9] = [
        "##########",
        "#........#",
        "#........#",
        "#........#",
        "#...P....#",
        "#........#",
        "#..G.....#",
        "#........#",
        "##########",
    ];

    fn arena_engine(seed: u32) -> GameEngine {
        let grid = Grid::parse(&ARENA).unwrap();
        GameEngine::new(grid, seed, EngineOptions::default())
    }

    fn set_ghost(engine: &mut GameEngine, idx: usize, x: i32, y: i32, mode: GhostMode) {
        engine.ghosts[idx].view.x = x;
        engine.ghosts[idx].view.y = y;
        engine.ghosts[idx].view.mode = mode;
        engine.ghosts[idx].reverse_pending = false;
    }

    #[test]
    fn blinky_targets_the_player_tile() {
        let mut engine = arena_engine(1);
        set_ghost(&mut engine, 0, 7, 7, GhostMode::Chase);
        assert_eq!(engine.ghost_target(0), Vec2 { x: 4, y: 4 });
    }

    #[test]
    fn pinky_leads_the_player_facing() {
        let mut engine = arena_engine(1);
        set_ghost(&mut engine, 1, 7, 7, GhostMode::Chase);
        engine.player.view.dir = Direction::Right;
        assert_eq!(engine.ghost_target(1), Vec2 { x: 8, y: 4 });

        engine.player.view.dir = Direction::Up;
        assert_eq!(engine.ghost_target(1), Vec2 { x: 4, y: 0 });
    }

    #[test]
    fn pinky_target_clamps_at_the_grid_edge() {
        let mut engine = arena_engine(1);
        set_ghost(&mut engine, 1, 7, 7, GhostMode::Chase);
        engine.player.view.x = 8;
        engine.player.view.dir = Direction::Right;
        assert_eq!(engine.ghost_target(1), Vec2 { x: 9, y: 4 });
    }

    #[test]
    fn inky_reflects_blinky_through_the_pivot() {
        let mut engine = arena_engine(1);
        set_ghost(&mut engine, 0, 2, 2, GhostMode::Chase);
        set_ghost(&mut engine, 2, 7, 7, GhostMode::Chase);
        engine.player.view.dir = Direction::Up;
        // Pivot is (4, 2); reflecting Blinky (2, 2) gives (6, 2).
        assert_eq!(engine.ghost_target(2), Vec2 { x: 6, y: 2 });
    }

    #[test]
    fn clyde_retreats_inside_its_threshold() {
        let mut engine = arena_engine(1);
        set_ghost(&mut engine, 3, 1, 1, GhostMode::Chase);
        // Manhattan distance 6 is not above the threshold, so Clyde heads for
        // its corner.
        assert_eq!(engine.ghost_target(3), engine.ghosts[3].scatter_corner);

        engine.player.view.x = 8;
        engine.player.view.y = 7;
        assert_eq!(engine.ghost_target(3), Vec2 { x: 8, y: 7 });
    }

    #[test]
    fn scatter_mode_targets_the_fixed_corner() {
        let mut engine = arena_engine(1);
        for idx in 0..4 {
            engine.ghosts[idx].view.mode = GhostMode::Scatter;
            assert_eq!(engine.ghost_target(idx), engine.ghosts[idx].scatter_corner);
        }
        assert_eq!(engine.ghosts[0].scatter_corner, Vec2 { x: 8, y: 1 });
        assert_eq!(engine.ghosts[1].scatter_corner, Vec2 { x: 1, y: 1 });
        assert_eq!(engine.ghosts[2].scatter_corner, Vec2 { x: 8, y: 7 });
        assert_eq!(engine.ghosts[3].scatter_corner, Vec2 { x: 1, y: 7 });
    }

    #[test]
    fn ties_fall_to_up_then_left() {
        let mut engine = arena_engine(1);
        // All four neighbors are equidistant from a target on the ghost's own
        // tile, so the priority scan decides.
        set_ghost(&mut engine, 0, 4, 4, GhostMode::Chase);
        engine.ghosts[0].view.dir = Direction::None;
        assert_eq!(engine.choose_ghost_direction(0), Direction::Up);
    }

    #[test]
    fn ghosts_do_not_reverse_in_a_corridor() {
        let grid = Grid::parse(&["######", "#P.G.#", "######"]).unwrap();
        let mut engine = GameEngine::new(grid, 1, EngineOptions::default());
        set_ghost(&mut engine, 0, 3, 1, GhostMode::Chase);
        engine.ghosts[0].view.dir = Direction::Right;
        // The player sits behind the ghost, but turning back is forbidden.
        assert_eq!(engine.choose_ghost_direction(0), Direction::Right);
    }

    #[test]
    fn dead_ends_force_a_reversal() {
        let grid = Grid::parse(&["######", "#P.G.#", "######"]).unwrap();
        let mut engine = GameEngine::new(grid, 1, EngineOptions::default());
        set_ghost(&mut engine, 0, 4, 1, GhostMode::Chase);
        engine.ghosts[0].view.dir = Direction::Right;
        assert_eq!(engine.choose_ghost_direction(0), Direction::Left);
    }

    #[test]
    fn pending_reversal_is_taken_once() {
        let mut engine = arena_engine(1);
        set_ghost(&mut engine, 0, 4, 2, GhostMode::Chase);
        engine.ghosts[0].view.dir = Direction::Up;
        engine.ghosts[0].reverse_pending = true;
        assert_eq!(engine.choose_ghost_direction(0), Direction::Down);
        assert!(!engine.ghosts[0].reverse_pending);
        // The next decision is back to normal targeting.
        assert_ne!(engine.choose_ghost_direction(0), Direction::Down);
    }

    #[test]
    fn frightened_choices_are_seed_stable_and_legal() {
        let mut a = arena_engine(77);
        let mut b = arena_engine(77);
        for engine in [&mut a, &mut b] {
            set_ghost(engine, 0, 4, 4, GhostMode::Frightened);
            engine.ghosts[0].view.dir = Direction::Right;
        }
        for _ in 0..16 {
            let da = a.choose_ghost_direction(0);
            let db = b.choose_ghost_direction(0);
            assert_eq!(da, db);
            assert_ne!(da, Direction::Left);
            assert_ne!(da, Direction::None);
        }
    }

    #[test]
    fn eaten_ghosts_path_home_and_rejoin_the_phase() {
        let mut engine = arena_engine(1);
        let home = engine.ghosts[0].home;
        set_ghost(&mut engine, 0, home.x + 1, home.y, GhostMode::Eaten);
        engine.ghosts[0].view.dir = Direction::Right;
        // Homing may reverse even though normal movement never does.
        assert_eq!(engine.choose_ghost_direction(0), Direction::Left);
        engine.advance_ghost_one_cell(0);
        assert_eq!(engine.ghosts[0].view.x, home.x);
        assert_eq!(engine.ghosts[0].view.mode, engine.phase_mode());
    }

    #[test]
    fn ghost_eaten_on_its_home_tile_rejoins_immediately() {
        let mut engine = arena_engine(1);
        let home = engine.ghosts[0].home;
        set_ghost(&mut engine, 0, home.x, home.y, GhostMode::Eaten);
        engine.ghosts[0].view.dir = Direction::None;
        let dir = engine.choose_ghost_direction(0);
        assert_eq!(engine.ghosts[0].view.mode, engine.phase_mode());
        assert_ne!(dir, Direction::None);
        for _ in 0..100 {
            engine.advance_ghost_one_cell(0);
            assert_ne!(engine.ghosts[0].view.mode, GhostMode::Eaten);
        }
    }

    #[test]
    fn each_ghost_gets_its_own_personality() {
        let engine = arena_engine(1);
        let names: Vec<GhostName> = engine.ghosts.iter().map(|g| g.view.name).collect();
        assert_eq!(names, GhostName::ALL.to_vec());
        assert_eq!(engine.ghosts.len(), 4);
    }

    #[test]
    fn sparse_levels_share_ghost_homes_round_robin() {
        let grid = Grid::parse(&["#####", "#P.G#", "#####"]).unwrap();
        let engine = GameEngine::new(grid, 1, EngineOptions::default());
        assert_eq!(engine.ghosts.len(), 4);
        assert!(engine
            .ghosts
            .iter()
            .all(|g| g.home == Vec2 { x: 3, y: 1 }));
    }
}
