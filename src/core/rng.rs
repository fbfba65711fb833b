//! Seedable Random Source
//!
//! Uses Xorshift128+ for fast, deterministic randomness.
//! The simulation only sees the [`RandomSource`] trait, so tests can
//! script exact power-up rolls.

/// Source of randomness for the simulation.
pub trait RandomSource: Send + Sync {
    /// Uniform integer in `[0, max)`. Returns 0 when `max == 0`.
    fn next_int(&mut self, max: u32) -> u32;

    /// True with probability `percent / 100`.
    fn roll_percent(&mut self, percent: u32) -> bool {
        self.next_int(100) < percent
    }
}

/// Deterministic PRNG using the Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use bomberman::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Ensure state is never all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Seed from a fresh v4 UUID.
    pub fn from_entropy() -> Self {
        let bits = uuid::Uuid::new_v4().as_u128();
        Self::new((bits >> 64) as u64 ^ bits as u64)
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }
}

impl RandomSource for DeterministicRng {
    #[inline]
    fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        // Plain modulo; the bias is negligible for the small ranges used here
        (self.next_u64() % max as u64) as u32
    }
}

/// SplitMix64 for seed initialization.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Replays a fixed script of values, then repeats the last one.
///
/// Each scripted value is reduced modulo the requested range.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRng {
    values: Vec<u32>,
    cursor: usize,
}

impl ScriptedRng {
    /// Create from a script.
    pub fn new(values: Vec<u32>) -> Self {
        Self { values, cursor: 0 }
    }

    /// Never rolls under any percentage below 100.
    pub fn never() -> Self {
        Self::new(vec![99])
    }

    /// Always rolls under any non-zero percentage, always picks index 0.
    pub fn always() -> Self {
        Self::new(vec![0])
    }
}

impl RandomSource for ScriptedRng {
    fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        let value = match self.values.get(self.cursor) {
            Some(v) => {
                self.cursor += 1;
                *v
            }
            None => self.values.last().copied().unwrap_or(0),
        };
        value % max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(54321);

        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_next_int() {
        let mut rng = DeterministicRng::new(1234);

        for _ in 0..1000 {
            assert!(rng.next_int(100) < 100);
        }

        assert_eq!(rng.next_int(0), 0);
        assert_eq!(rng.next_int(1), 0);
    }

    #[test]
    fn test_roll_percent_bounds() {
        let mut rng = DeterministicRng::new(42);
        for _ in 0..200 {
            assert!(!rng.roll_percent(0));
            assert!(rng.roll_percent(100));
        }
    }

    #[test]
    fn test_roll_percent_rate() {
        let mut rng = DeterministicRng::new(2024);
        let hits = (0..10_000).filter(|_| rng.roll_percent(30)).count();
        assert!((2_500..3_500).contains(&hits), "hits = {}", hits);
    }

    #[test]
    fn test_scripted_rng() {
        let mut rng = ScriptedRng::new(vec![5, 120, 2]);
        assert_eq!(rng.next_int(10), 5);
        assert_eq!(rng.next_int(100), 20);
        assert_eq!(rng.next_int(3), 2);
        // Exhausted: repeats last value
        assert_eq!(rng.next_int(3), 2);

        assert!(ScriptedRng::always().roll_percent(30));
        assert!(!ScriptedRng::never().roll_percent(30));
    }
}
