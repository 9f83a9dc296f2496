#[cfg(test)]
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(seed)
}

/// Random source that replays a fixed sequence of unit-interval draws.
///
/// Each `rng.random::<f64>()` call consumes one entry, so tests can steer
/// weighted draws and mutation coin flips exactly. The sequence wraps around
/// once exhausted.
#[cfg(test)]
#[derive(Clone, Debug)]
pub struct ScriptedRng {
    draws: Vec<f64>,
    cursor: usize,
}

#[cfg(test)]
impl ScriptedRng {
    const MANTISSA_BITS: u32 = 53;

    pub fn new(draws: Vec<f64>) -> Self {
        assert!(!draws.is_empty(), "scripted rng needs at least one draw");
        Self { draws, cursor: 0 }
    }

    /// Number of draws consumed so far (not wrapped).
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
impl RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        let draw = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        // rand maps the top 53 bits of a u64 onto [0, 1); invert that mapping.
        let scale = (1u64 << Self::MANTISSA_BITS) as f64;
        let mantissa = (draw.clamp(0.0, 1.0) * scale).min(scale - 1.0) as u64;
        mantissa << (64 - Self::MANTISSA_BITS)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn scripted_rng_replays_unit_draws() {
        let mut rng = ScriptedRng::new(vec![0.0, 0.25, 0.5, 0.75]);
        assert_eq!(rng.random::<f64>(), 0.0);
        assert_eq!(rng.random::<f64>(), 0.25);
        assert_eq!(rng.random::<f64>(), 0.5);
        assert_eq!(rng.random::<f64>(), 0.75);
        assert_eq!(rng.random::<f64>(), 0.0, "sequence wraps");
        assert_eq!(rng.consumed(), 5);
    }

    #[test]
    fn scripted_rng_never_reaches_one() {
        let mut rng = ScriptedRng::new(vec![1.0]);
        assert!(rng.random::<f64>() < 1.0);
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut a = create_rng(7);
        let mut b = create_rng(7);
        let xs: Vec<u64> = (0..8).map(|_| a.random()).collect();
        let ys: Vec<u64> = (0..8).map(|_| b.random()).collect();
        assert_eq!(xs, ys);
    }
}
