use std::collections::BTreeMap;

use crate::types::{HazardView, Vec2};

/// Fading hazard field left behind the player. Each occupied cell carries a
/// remaining lifetime in ticks; a cell is lethal while its lifetime is
/// positive.
#[derive(Clone, Debug, Default)]
pub struct TrailField {
    cells: BTreeMap<(i32, i32), u32>,
}

impl TrailField {
    /// Marks a cell with a fresh lifetime. Depositing over a live cell
    /// resets it; lifetimes never stack.
    pub fn deposit(&mut self, pos: Vec2, ttl_ticks: u32) {
        if ttl_ticks == 0 {
            return;
        }
        self.cells.insert((pos.x, pos.y), ttl_ticks);
    }

    /// Ages every cell by one tick and drops the ones that expire.
    pub fn tick(&mut self) {
        self.cells.retain(|_, ttl| {
            *ttl -= 1;
            *ttl > 0
        });
    }

    pub fn is_hazard(&self, pos: Vec2) -> bool {
        self.cells.contains_key(&(pos.x, pos.y))
    }

    pub fn ttl(&self, pos: Vec2) -> u32 {
        self.cells.get(&(pos.x, pos.y)).copied().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn view(&self) -> Vec<HazardView> {
        self.cells
            .iter()
            .map(|(&(x, y), &ttl)| HazardView { x, y, ttl })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CELL: Vec2 = Vec2 { x: 3, y: 5 };

    #[test]
    fn cells_expire_after_their_lifetime() {
        let mut trail = TrailField::default();
        trail.deposit(CELL, 3);
        assert!(trail.is_hazard(CELL));
        trail.tick();
        trail.tick();
        assert!(trail.is_hazard(CELL));
        trail.tick();
        assert!(!trail.is_hazard(CELL));
        assert!(trail.is_empty());
    }

    #[test]
    fn redeposit_resets_instead_of_stacking() {
        let mut trail = TrailField::default();
        trail.deposit(CELL, 5);
        trail.tick();
        trail.tick();
        assert_eq!(trail.ttl(CELL), 3);
        trail.deposit(CELL, 5);
        assert_eq!(trail.ttl(CELL), 5);
    }

    #[test]
    fn zero_lifetime_deposits_are_ignored() {
        let mut trail = TrailField::default();
        trail.deposit(CELL, 0);
        assert!(!trail.is_hazard(CELL));
    }

    #[test]
    fn clear_removes_everything() {
        let mut trail = TrailField::default();
        trail.deposit(CELL, 4);
        trail.deposit(Vec2 { x: 4, y: 5 }, 4);
        assert_eq!(trail.len(), 2);
        trail.clear();
        assert!(trail.is_empty());
    }

    #[test]
    fn view_reports_cells_with_lifetimes() {
        let mut trail = TrailField::default();
        trail.deposit(Vec2 { x: 1, y: 1 }, 2);
        trail.deposit(Vec2 { x: 2, y: 1 }, 7);
        let view = trail.view();
        assert_eq!(view.len(), 2);
        assert!(view.contains(&HazardView { x: 2, y: 1, ttl: 7 }));
    }
}
