//! Deterministic Mersenne Twister (MT19937) with serializable state.
//!
//! Every random draw of the simulation goes through [`RandomEngine`] so a run can be
//! replayed exactly from its seed or from a saved [`EngineState`].

use glam::Vec3;
use log::debug;
use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};

pub const STATE_WORDS: usize = 624;
const SHIFT: usize = 397;
const MATRIX_A: u32 = 0x9908_b0df;
const UPPER_MASK: u32 = 0x8000_0000;
const LOWER_MASK: u32 = 0x7fff_ffff;
const DEFAULT_SEED: u32 = 5489;

/// Full generator state: the word array and the cursor into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineState {
    pub words: Vec<u32>,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomEngine {
    state: [u32; STATE_WORDS],
    index: usize,
}

impl RandomEngine {
    /// Seeds the generator. A zero seed is replaced by one taken from the clock.
    pub fn new(seed: u32) -> Self {
        let mut engine = Self {
            state: [0; STATE_WORDS],
            index: STATE_WORDS,
        };
        engine.seed(seed);
        engine
    }

    pub fn seed(&mut self, seed: u32) {
        let seed = if seed == 0 { time_seed() } else { seed };
        self.state[0] = seed;
        for i in 1..STATE_WORDS {
            let prev = self.state[i - 1];
            self.state[i] = 1_812_433_253u32
                .wrapping_mul(prev ^ (prev >> 30))
                .wrapping_add(i as u32);
        }
        self.index = STATE_WORDS;
    }

    pub fn from_key(key: &[u32]) -> Self {
        let mut engine = Self::new(19_650_218);
        engine.seed_by_array(key);
        engine
    }

    /// Reference `init_by_array` seeding.
    pub fn seed_by_array(&mut self, key: &[u32]) {
        self.seed(19_650_218);
        if key.is_empty() {
            return;
        }
        let mut i = 1usize;
        let mut j = 0usize;
        for _ in 0..STATE_WORDS.max(key.len()) {
            let prev = self.state[i - 1];
            self.state[i] = (self.state[i] ^ (prev ^ (prev >> 30)).wrapping_mul(1_664_525))
                .wrapping_add(key[j])
                .wrapping_add(j as u32);
            i += 1;
            j += 1;
            if i >= STATE_WORDS {
                self.state[0] = self.state[STATE_WORDS - 1];
                i = 1;
            }
            if j >= key.len() {
                j = 0;
            }
        }
        for _ in 0..STATE_WORDS - 1 {
            let prev = self.state[i - 1];
            self.state[i] = (self.state[i] ^ (prev ^ (prev >> 30)).wrapping_mul(1_566_083_941))
                .wrapping_sub(i as u32);
            i += 1;
            if i >= STATE_WORDS {
                self.state[0] = self.state[STATE_WORDS - 1];
                i = 1;
            }
        }
        self.state[0] = UPPER_MASK;
        self.index = STATE_WORDS;
    }

    fn twist(&mut self) {
        for i in 0..STATE_WORDS {
            let y = (self.state[i] & UPPER_MASK) | (self.state[(i + 1) % STATE_WORDS] & LOWER_MASK);
            let mut next = self.state[(i + SHIFT) % STATE_WORDS] ^ (y >> 1);
            if y & 1 != 0 {
                next ^= MATRIX_A;
            }
            self.state[i] = next;
        }
        self.index = 0;
    }

    /// Next tempered 32-bit output word.
    pub fn next_word(&mut self) -> u32 {
        if self.index >= STATE_WORDS {
            self.twist();
        }
        let mut y = self.state[self.index];
        self.index += 1;
        y ^= y >> 11;
        y ^= (y << 7) & 0x9d2c_5680;
        y ^= (y << 15) & 0xefc6_0000;
        y ^= y >> 18;
        y
    }

    /// Uniform draw in `[0, 1)`, built by placing 23 random bits in the mantissa of 1.0.
    pub fn next_unit(&mut self) -> f32 {
        f32::from_bits((self.next_word() >> 9) | 0x3f80_0000) - 1.0
    }

    /// Uniform draw in `[min, max)`.
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_unit()
    }

    /// Uniform integer in `[min, max)`. Returns `min` for an empty range.
    pub fn range_usize(&mut self, min: usize, max: usize) -> usize {
        if max <= min {
            return min;
        }
        let span = (max - min) as f64;
        let offset = (self.next_unit() as f64 * span) as usize;
        min + offset.min(max - min - 1)
    }

    pub fn chance(&mut self, probability: f32) -> bool {
        self.next_unit() < probability
    }

    /// Uniformly distributed unit vector.
    pub fn unit_vector(&mut self) -> Vec3 {
        let z = self.range_f32(-1.0, 1.0);
        let phi = self.range_f32(0.0, std::f32::consts::TAU);
        let r = (1.0 - z * z).max(0.0).sqrt();
        Vec3::new(r * phi.cos(), r * phi.sin(), z)
    }

    pub fn state(&self) -> EngineState {
        EngineState {
            words: self.state.to_vec(),
            index: self.index,
        }
    }

    /// Restores a saved state. Returns `None` when the word count or cursor is invalid.
    pub fn from_state(state: &EngineState) -> Option<Self> {
        if state.index > STATE_WORDS {
            return None;
        }
        let words: [u32; STATE_WORDS] = state.words.as_slice().try_into().ok()?;
        Some(Self {
            state: words,
            index: state.index,
        })
    }
}

impl RngCore for RandomEngine {
    fn next_u32(&mut self) -> u32 {
        self.next_word()
    }

    fn next_u64(&mut self) -> u64 {
        let hi = self.next_word() as u64;
        let lo = self.next_word() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(4) {
            let bytes = self.next_word().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

fn time_seed() -> u32 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seed = (nanos ^ (nanos >> 32)) as u32;
    let seed = if seed == 0 { DEFAULT_SEED } else { seed };
    debug!("Zero seed replaced by clock seed {seed}");
    seed
}
