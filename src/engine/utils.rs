use crate::rng::Rng;
use crate::types::Direction;

pub(super) fn manhattan(ax: i32, ay: i32, bx: i32, by: i32) -> i32 {
    (ax - bx).abs() + (ay - by).abs()
}

pub(super) fn random_direction(rng: &mut Rng) -> Direction {
    match rng.int(0, 3) {
        0 => Direction::Up,
        1 => Direction::Down,
        2 => Direction::Left,
        _ => Direction::Right,
    }
}
