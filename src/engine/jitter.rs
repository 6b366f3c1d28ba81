// ==========================================
// Site Progress - jitter policy
// ==========================================
// The timeline derivation takes its day-level variability through an
// injectable policy so production derivations and tests stay
// deterministic while the demo seeder gets realistic spread.
// ==========================================

// ==========================================
// JitterPolicy trait
// ==========================================
pub trait JitterPolicy: Send {
    /// Draw a day offset in the inclusive range [lo, hi]
    fn jitter_days(&mut self, lo: i64, hi: i64) -> i64;
}

// ==========================================
// NoJitter - fixed-offset policy
// ==========================================
// Always returns the zero point of the range (clamped into it), so a
// [0, n] slip range yields zero slip and a [-n, n] range yields 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoJitter;

impl JitterPolicy for NoJitter {
    fn jitter_days(&mut self, lo: i64, hi: i64) -> i64 {
        0i64.clamp(lo, hi)
    }
}

// ==========================================
// SeededJitter - deterministic PRNG policy
// ==========================================
// splitmix64: small, well-distributed, reproducible from a seed.
// Demo seeding and fixtures use this; same seed, same timeline.
#[derive(Debug, Clone)]
pub struct SeededJitter {
    state: u64,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

impl JitterPolicy for SeededJitter {
    fn jitter_days(&mut self, lo: i64, hi: i64) -> i64 {
        if lo >= hi {
            return lo;
        }
        let span = (hi - lo + 1) as u64;
        lo + (self.next_u64() % span) as i64
    }
}
