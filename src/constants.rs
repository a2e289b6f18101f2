use crate::types::GhostPhase;

pub const TICK_RATE: u32 = 20;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const STARTING_LIVES: u32 = 3;

// Speeds in tiles per second at wave 1.
pub const PLAYER_BASE_SPEED: f32 = 8.0;
pub const GHOST_BASE_SPEED: f32 = 6.4;
pub const FRIGHTENED_SPEED_MULTIPLIER: f32 = 0.7;
pub const EATEN_SPEED_MULTIPLIER: f32 = 1.6;

// Wave scaling caps, as multipliers on the base speeds. The ghost cap keeps a
// fully scaled ghost below an unscaled player (6.4 * 1.2 < 8.0).
pub const PLAYER_SPEED_CAP: f32 = 1.15;
pub const GHOST_SPEED_CAP: f32 = 1.2;

pub const PLAYER_SPEED_STEP_PER_WAVE: f32 = 0.02;
pub const GHOST_SPEED_STEP_PER_WAVE: f32 = 0.04;

// Ghosts hold at their spawns until the player first moves, then this long.
pub const GHOST_RELEASE_TICKS: u32 = TICK_RATE;

pub const PELLET_SCORE: u32 = 10;
pub const POWER_PELLET_SCORE: u32 = 50;
pub const GHOST_SCORE: u32 = 200;

pub const POWER_DURATION_TICKS: u32 = 8 * TICK_RATE;

// 1.15 s at 20 Hz, plus roughly 12% of that per wave.
pub const TRAIL_BASE_TTL_TICKS: u32 = 23;
pub const TRAIL_WAVE_BONUS_TICKS: u32 = 3;

pub const PINKY_LOOKAHEAD: i32 = 4;
pub const INKY_PIVOT: i32 = 2;
pub const CLYDE_THRESHOLD: i32 = 6;

/// Scatter/chase alternation. The final leg never expires.
pub const PHASE_SCHEDULE: [(GhostPhase, u32); 8] = [
    (GhostPhase::Scatter, 7 * TICK_RATE),
    (GhostPhase::Chase, 20 * TICK_RATE),
    (GhostPhase::Scatter, 7 * TICK_RATE),
    (GhostPhase::Chase, 20 * TICK_RATE),
    (GhostPhase::Scatter, 5 * TICK_RATE),
    (GhostPhase::Chase, 20 * TICK_RATE),
    (GhostPhase::Scatter, 5 * TICK_RATE),
    (GhostPhase::Chase, u32::MAX),
];

pub const MIN_SCATTER_TICKS: u32 = 2 * TICK_RATE;

pub fn trail_ttl_ticks(base: u32, bonus_per_wave: u32, wave: u32) -> u32 {
    base + bonus_per_wave * wave.saturating_sub(1)
}

pub fn player_speed_multiplier(wave: u32, cap: f32) -> f32 {
    (1.0 + PLAYER_SPEED_STEP_PER_WAVE * wave.saturating_sub(1) as f32).min(cap)
}

pub fn ghost_speed_multiplier(wave: u32, cap: f32) -> f32 {
    (1.0 + GHOST_SPEED_STEP_PER_WAVE * wave.saturating_sub(1) as f32).min(cap)
}

/// Phase leg length for a given wave. Scatter legs shrink 10% per wave down
/// to a floor; chase legs hold steady. `u32::MAX` marks the open-ended leg.
pub fn phase_duration_ticks(phase: GhostPhase, base_ticks: u32, wave: u32) -> u32 {
    if base_ticks == u32::MAX {
        return u32::MAX;
    }
    match phase {
        GhostPhase::Chase => base_ticks,
        GhostPhase::Scatter => {
            let scaled = base_ticks as f32 * 0.9_f32.powi(wave.saturating_sub(1).min(64) as i32);
            (scaled as u32).max(MIN_SCATTER_TICKS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trail_ttl_strictly_increases_with_wave() {
        let mut prev = 0;
        for wave in 1..=12 {
            let ttl = trail_ttl_ticks(TRAIL_BASE_TTL_TICKS, TRAIL_WAVE_BONUS_TICKS, wave);
            assert!(ttl > prev);
            prev = ttl;
        }
    }

    #[test]
    fn speed_multipliers_are_monotonic_and_capped() {
        let mut prev_player = 0.0;
        let mut prev_ghost = 0.0;
        for wave in 1..=40 {
            let p = player_speed_multiplier(wave, PLAYER_SPEED_CAP);
            let g = ghost_speed_multiplier(wave, GHOST_SPEED_CAP);
            assert!(p >= prev_player && p <= PLAYER_SPEED_CAP);
            assert!(g >= prev_ghost && g <= GHOST_SPEED_CAP);
            prev_player = p;
            prev_ghost = g;
        }
    }

    #[test]
    fn capped_ghost_stays_slower_than_player() {
        let ghost = GHOST_BASE_SPEED * ghost_speed_multiplier(100, GHOST_SPEED_CAP);
        let player = PLAYER_BASE_SPEED * player_speed_multiplier(1, PLAYER_SPEED_CAP);
        assert!(ghost < player);
    }

    #[test]
    fn scatter_legs_shrink_to_a_floor() {
        let base = 7 * TICK_RATE;
        let mut prev = u32::MAX;
        for wave in 1..=30 {
            let ticks = phase_duration_ticks(GhostPhase::Scatter, base, wave);
            assert!(ticks <= prev);
            assert!(ticks >= MIN_SCATTER_TICKS);
            prev = ticks;
        }
        assert_eq!(phase_duration_ticks(GhostPhase::Scatter, base, 30), MIN_SCATTER_TICKS);
    }

    #[test]
    fn chase_legs_do_not_shrink() {
        assert_eq!(
            phase_duration_ticks(GhostPhase::Chase, 20 * TICK_RATE, 9),
            20 * TICK_RATE
        );
        assert_eq!(
            phase_duration_ticks(GhostPhase::Chase, u32::MAX, 9),
            u32::MAX
        );
    }
}
