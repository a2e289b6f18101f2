use std::collections::{BTreeSet, VecDeque};

use thiserror::Error;

use crate::types::{Direction, TileKind, Vec2};

/// Bundled level. Legend: `#` wall, `.` pellet, `o` power pellet, `P` player
/// spawn, `G` ghost spawn, space bare corridor. Rows open at both side edges
/// are tunnel rows and wrap horizontally.
pub const DEFAULT_LEVEL: [&str; 22] = [
    "############################",
    "#............##............#",
    "#.####.#####.##.#####.####.#",
    "#o####.#####.##.#####.####o#",
    "#.####.#####.##.#####.####.#",
    "#..........................#",
    "#.####.##.########.##.####.#",
    "#.####.##.########.##.####.#",
    "#......##....##....##......#",
    "######.#####.##.#####.######",
    "      .#####.##.#####.      ",
    "      .#####.##.#####.      ",
    "######.##...GGGG...##.######",
    "######.##.###..###.##.######",
    "#............P.............#",
    "#.####.#####.##.#####.####.#",
    "#o..##.......##.......##..o#",
    "###.##.##.########.##.##.###",
    "#......##....##....##......#",
    "#.##########.##.##########.#",
    "#..........................#",
    "############################",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("level map is empty")]
    Empty,
    #[error("row {row} has {len} tiles, expected {expected}")]
    RaggedRow { row: usize, len: usize, expected: usize },
    #[error("unknown tile {tile:?} at ({x}, {y})")]
    UnknownTile { tile: char, x: i32, y: i32 },
    #[error("level map defines no player spawn")]
    MissingPlayerSpawn,
    #[error("level map defines more than one player spawn")]
    DuplicatePlayerSpawn,
    #[error("level map defines no ghost spawns")]
    MissingGhostSpawn,
    #[error("walkable tile ({x}, {y}) is unreachable from the player spawn")]
    UnreachableTile { x: i32, y: i32 },
}

#[derive(Clone, Debug)]
pub struct Grid {
    width: i32,
    height: i32,
    rows: Vec<String>,
    tiles: Vec<TileKind>,
    tunnel_rows: BTreeSet<i32>,
    player_spawn: Vec2,
    ghost_spawns: Vec<Vec2>,
    pellets: BTreeSet<(i32, i32)>,
    power_pellets: BTreeSet<(i32, i32)>,
}

impl Grid {
    pub fn parse(rows: &[&str]) -> Result<Self, GridError> {
        if rows.is_empty() {
            return Err(GridError::Empty);
        }
        let width = rows[0].chars().count();
        if width == 0 {
            return Err(GridError::Empty);
        }
        let height = rows.len();

        let mut tunnel_rows = BTreeSet::new();
        for (y, row) in rows.iter().enumerate() {
            let len = row.chars().count();
            if len != width {
                return Err(GridError::RaggedRow {
                    row: y,
                    len,
                    expected: width,
                });
            }
            let first = row.chars().next();
            let last = row.chars().last();
            if first != Some('#') && last != Some('#') {
                tunnel_rows.insert(y as i32);
            }
        }

        let mut tiles = vec![TileKind::Wall; width * height];
        let mut player_spawn = None;
        let mut ghost_spawns = Vec::new();
        let mut pellets = BTreeSet::new();
        let mut power_pellets = BTreeSet::new();

        for (y, row) in rows.iter().enumerate() {
            for (x, tile) in row.chars().enumerate() {
                let (xi, yi) = (x as i32, y as i32);
                let walkable = match tile {
                    '#' => false,
                    ' ' => true,
                    '.' => {
                        pellets.insert((xi, yi));
                        true
                    }
                    'o' => {
                        power_pellets.insert((xi, yi));
                        true
                    }
                    'P' => {
                        if player_spawn.replace(Vec2 { x: xi, y: yi }).is_some() {
                            return Err(GridError::DuplicatePlayerSpawn);
                        }
                        true
                    }
                    'G' => {
                        ghost_spawns.push(Vec2 { x: xi, y: yi });
                        true
                    }
                    other => {
                        return Err(GridError::UnknownTile {
                            tile: other,
                            x: xi,
                            y: yi,
                        })
                    }
                };
                if walkable {
                    let at_edge = x == 0 || x == width - 1;
                    tiles[y * width + x] = if at_edge && tunnel_rows.contains(&yi) {
                        TileKind::Tunnel
                    } else {
                        TileKind::Floor
                    };
                }
            }
        }

        let player_spawn = player_spawn.ok_or(GridError::MissingPlayerSpawn)?;
        if ghost_spawns.is_empty() {
            return Err(GridError::MissingGhostSpawn);
        }

        let grid = Self {
            width: width as i32,
            height: height as i32,
            rows: rows.iter().map(|row| row.to_string()).collect(),
            tiles,
            tunnel_rows,
            player_spawn,
            ghost_spawns,
            pellets,
            power_pellets,
        };
        grid.check_reachability()?;
        Ok(grid)
    }

    /// The level every engine uses unless the host parses its own.
    pub fn bundled() -> Self {
        Self::parse(&DEFAULT_LEVEL).expect("bundled level map is well formed")
    }

    /// Every walkable tile must be reachable from the player spawn, or the
    /// level would have dead pellets and unusable spawns.
    fn check_reachability(&self) -> Result<(), GridError> {
        let mut seen = vec![false; self.tiles.len()];
        let start = self.index(self.player_spawn.x, self.player_spawn.y);
        seen[start] = true;
        let mut queue = VecDeque::from([self.player_spawn]);
        while let Some(cell) = queue.pop_front() {
            for (_, next) in self.open_neighbors(cell) {
                let idx = self.index(next.x, next.y);
                if !seen[idx] {
                    seen[idx] = true;
                    queue.push_back(next);
                }
            }
        }
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = self.index(x, y);
                if self.tiles[idx] != TileKind::Wall && !seen[idx] {
                    return Err(GridError::UnreachableTile { x, y });
                }
            }
        }
        Ok(())
    }

    fn index(&self, x: i32, y: i32) -> usize {
        (y * self.width + x) as usize
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Out-of-bounds reads as Wall rather than an error.
    pub fn kind(&self, x: i32, y: i32) -> TileKind {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return TileKind::Wall;
        }
        self.tiles[self.index(x, y)]
    }

    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.kind(x, y) != TileKind::Wall
    }

    pub fn is_tunnel_row(&self, y: i32) -> bool {
        self.tunnel_rows.contains(&y)
    }

    /// Horizontal wrap on tunnel rows; everywhere else coordinates pass
    /// through unchanged.
    pub fn wrap(&self, x: i32, y: i32) -> (i32, i32) {
        if self.tunnel_rows.contains(&y) {
            if x < 0 {
                return (self.width - 1, y);
            }
            if x >= self.width {
                return (0, y);
            }
        }
        (x, y)
    }

    /// The cell one step from `pos`, if that step lands on a walkable tile.
    pub fn step_from(&self, pos: Vec2, dir: Direction) -> Option<Vec2> {
        if dir == Direction::None {
            return None;
        }
        let (dx, dy) = dir.delta();
        let (x, y) = self.wrap(pos.x + dx, pos.y + dy);
        if self.is_walkable(x, y) {
            Some(Vec2 { x, y })
        } else {
            None
        }
    }

    /// Walkable neighbors in fixed priority order.
    pub fn open_neighbors(&self, pos: Vec2) -> Vec<(Direction, Vec2)> {
        Direction::PRIORITY
            .iter()
            .filter_map(|&dir| self.step_from(pos, dir).map(|cell| (dir, cell)))
            .collect()
    }

    /// First move of a shortest path from `from` to `to` (BFS, tunnel-aware).
    /// Ties fall to the direction priority because neighbors are expanded in
    /// that order. None when `to` is unreachable or equal to `from`.
    pub fn first_step_toward(&self, from: Vec2, to: Vec2) -> Option<Direction> {
        if from == to || !self.is_walkable(from.x, from.y) {
            return None;
        }
        let mut first_move: Vec<Option<Direction>> = vec![None; self.tiles.len()];
        let mut seen = vec![false; self.tiles.len()];
        seen[self.index(from.x, from.y)] = true;
        let mut queue = VecDeque::from([from]);
        while let Some(cell) = queue.pop_front() {
            for (dir, next) in self.open_neighbors(cell) {
                let idx = self.index(next.x, next.y);
                if seen[idx] {
                    continue;
                }
                seen[idx] = true;
                first_move[idx] = if cell == from {
                    Some(dir)
                } else {
                    first_move[self.index(cell.x, cell.y)]
                };
                if next == to {
                    return first_move[idx];
                }
                queue.push_back(next);
            }
        }
        None
    }

    pub fn clamp(&self, x: i32, y: i32) -> Vec2 {
        Vec2 {
            x: x.clamp(0, self.width - 1),
            y: y.clamp(0, self.height - 1),
        }
    }

    pub fn player_spawn(&self) -> Vec2 {
        self.player_spawn
    }

    pub fn ghost_spawns(&self) -> &[Vec2] {
        &self.ghost_spawns
    }

    pub fn pellets(&self) -> &BTreeSet<(i32, i32)> {
        &self.pellets
    }

    pub fn power_pellets(&self) -> &BTreeSet<(i32, i32)> {
        &self.power_pellets
    }

    pub fn tunnel_rows(&self) -> Vec<i32> {
        self.tunnel_rows.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_level_parses() {
        let grid = Grid::bundled();
        assert_eq!(grid.width(), 28);
        assert_eq!(grid.height(), 22);
        assert_eq!(grid.player_spawn(), Vec2 { x: 13, y: 14 });
        assert_eq!(grid.ghost_spawns().len(), 4);
        assert_eq!(grid.tunnel_rows(), vec![10, 11]);
        assert!(!grid.pellets().is_empty());
        assert_eq!(grid.power_pellets().len(), 4);
    }

    #[test]
    fn tunnel_rows_wrap_both_ways() {
        let grid = Grid::bundled();
        assert_eq!(grid.wrap(-1, 10), (27, 10));
        assert_eq!(grid.wrap(28, 11), (0, 11));
        // Non-tunnel rows do not wrap.
        assert_eq!(grid.wrap(-1, 5), (-1, 5));
        assert_eq!(
            grid.step_from(Vec2 { x: 0, y: 10 }, Direction::Left),
            Some(Vec2 { x: 27, y: 10 })
        );
        assert_eq!(
            grid.step_from(Vec2 { x: 27, y: 11 }, Direction::Right),
            Some(Vec2 { x: 0, y: 11 })
        );
    }

    #[test]
    fn edge_tiles_on_tunnel_rows_are_tunnels() {
        let grid = Grid::bundled();
        assert_eq!(grid.kind(0, 10), TileKind::Tunnel);
        assert_eq!(grid.kind(27, 11), TileKind::Tunnel);
        assert_eq!(grid.kind(3, 10), TileKind::Floor);
    }

    #[test]
    fn out_of_bounds_reads_as_wall() {
        let grid = Grid::bundled();
        assert_eq!(grid.kind(-1, 0), TileKind::Wall);
        assert_eq!(grid.kind(0, 22), TileKind::Wall);
        assert!(!grid.is_walkable(99, 99));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Grid::parse(&["####", "#PG", "####"]).unwrap_err();
        assert_eq!(
            err,
            GridError::RaggedRow {
                row: 1,
                len: 3,
                expected: 4
            }
        );
    }

    #[test]
    fn unknown_tiles_are_rejected() {
        let err = Grid::parse(&["#####", "#PG?#", "#####"]).unwrap_err();
        assert_eq!(
            err,
            GridError::UnknownTile {
                tile: '?',
                x: 3,
                y: 1
            }
        );
    }

    #[test]
    fn spawn_presence_is_enforced() {
        assert_eq!(
            Grid::parse(&["#####", "#.G.#", "#####"]).unwrap_err(),
            GridError::MissingPlayerSpawn
        );
        assert_eq!(
            Grid::parse(&["#####", "#.P.#", "#####"]).unwrap_err(),
            GridError::MissingGhostSpawn
        );
        assert_eq!(
            Grid::parse(&["######", "#PPG.#", "######"]).unwrap_err(),
            GridError::DuplicatePlayerSpawn
        );
    }

    #[test]
    fn unreachable_pockets_are_rejected() {
        let err = Grid::parse(&["#####", "#PG##", "###.#", "#####"]).unwrap_err();
        assert_eq!(err, GridError::UnreachableTile { x: 3, y: 2 });
    }

    #[test]
    fn first_step_follows_a_shortest_path() {
        let grid = Grid::parse(&[
            "#######",
            "#P...G#",
            "#.###.#",
            "#.....#",
            "#######",
        ])
        .unwrap();
        let from = Vec2 { x: 1, y: 1 };
        // Right along the top row is the unique shortest path.
        assert_eq!(
            grid.first_step_toward(from, Vec2 { x: 5, y: 1 }),
            Some(Direction::Right)
        );
        // The unique shortest path to (3, 3) starts by going down the left
        // column.
        assert_eq!(
            grid.first_step_toward(from, Vec2 { x: 3, y: 3 }),
            Some(Direction::Down)
        );
        assert_eq!(grid.first_step_toward(from, from), None);
    }

    #[test]
    fn first_step_uses_tunnels() {
        let grid = Grid::parse(&[
            "#####",
            ".P.G.",
            "#####",
        ])
        .unwrap();
        // Wrapping left reaches (3, 1) in two steps versus two going right;
        // Left wins the priority tie against Right.
        assert_eq!(
            grid.first_step_toward(Vec2 { x: 1, y: 1 }, Vec2 { x: 4, y: 1 }),
            Some(Direction::Left)
        );
    }
}
