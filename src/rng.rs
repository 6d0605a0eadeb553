//! Randomness plumbing. The host RNG only promises 15 useful bits per call,
//! so full words get composed from chunks; the LCG exists for tests that
//! need the exact same sequence every run.

use rand::RngCore;

/// How many of the low bits each [EntropySource::next_bits] call carries
pub const ENTROPY_BITS_PER_CALL: u32 = 15;

const ENTROPY_MASK: u16 = (1 << ENTROPY_BITS_PER_CALL) - 1;

/// A source of at least 15 bits of entropy per call
pub trait EntropySource {
    /// Only the low [ENTROPY_BITS_PER_CALL] bits are meaningful
    fn next_bits(&mut self) -> u16;
}

/// Builds a full 32 bit word out of 15 bit chunks
pub fn compose_u32(source: &mut dyn EntropySource) -> u32 {
    let mut value: u32 = 0;
    let mut bits: u32 = 0;
    while bits < u32::BITS {
        value = (value << ENTROPY_BITS_PER_CALL) | (source.next_bits() & ENTROPY_MASK) as u32;
        bits += ENTROPY_BITS_PER_CALL;
    }
    value
}

/// Production entropy on top of the host RNG
pub struct HostEntropy {
    rng: rand::rngs::ThreadRng,
}

impl HostEntropy {
    pub fn new() -> Self {
        HostEntropy { rng: rand::rng() }
    }
}

impl Default for HostEntropy {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropySource for HostEntropy {
    fn next_bits(&mut self) -> u16 {
        (self.rng.next_u32() as u16) & ENTROPY_MASK
    }
}

/// A 32 bit LCG with the classic glibc constants. Deterministic on purpose,
/// for tests only.
pub struct Lcg32 {
    state: u32,
}

impl Lcg32 {
    pub fn new(seed: u32) -> Self {
        Lcg32 { state: seed }
    }
}

impl EntropySource for Lcg32 {
    fn next_bits(&mut self) -> u16 {
        self.state = self.state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        ((self.state >> 16) as u16) & ENTROPY_MASK
    }
}
