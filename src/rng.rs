/// Mulberry32 step generator. Small, fast, and good enough for game
/// randomness; most importantly the whole simulation replays from one seed.
#[derive(Clone, Debug)]
pub struct Rng {
    seed: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    pub fn next_f32(&mut self) -> f32 {
        self.seed = self.seed.wrapping_add(0x6d2b79f5);
        let mut t = self.seed;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        let out = t ^ (t >> 14);
        (out as f64 / 4_294_967_296.0) as f32
    }

    pub fn int(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as f32;
        min + (self.next_f32() * span).floor() as i32
    }

    pub fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        (self.next_f32() * len as f32).floor().min((len - 1) as f32) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Rng::new(1234);
        let mut b = Rng::new(1234);
        for _ in 0..64 {
            assert_eq!(a.next_f32(), b.next_f32());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = Rng::new(1);
        let mut b = Rng::new(2);
        let same = (0..16).all(|_| a.next_f32() == b.next_f32());
        assert!(!same);
    }

    #[test]
    fn int_stays_in_range() {
        let mut rng = Rng::new(99);
        for _ in 0..200 {
            let v = rng.int(-3, 5);
            assert!((-3..=5).contains(&v));
        }
    }

    #[test]
    fn pick_index_stays_in_range() {
        let mut rng = Rng::new(7);
        for _ in 0..200 {
            assert!(rng.pick_index(4) < 4);
        }
        assert_eq!(rng.pick_index(0), 0);
        assert_eq!(rng.pick_index(1), 0);
    }
}
