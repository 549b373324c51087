//! Seedable uniform sources
//!
//! Selection draws through [`UniformSource`] rather than a global RNG so the
//! stream is pinned down exactly: the same seed yields the same sample on
//! every platform and release. [`Lcg32`] is the default; [`RandSource`]
//! plugs in any `rand` generator.

use rand::{RngCore, SeedableRng};

/// Source of uniform floats in `[0, 1)`
pub trait UniformSource {
    /// Next uniform value in `[0, 1)`
    fn next_unit(&mut self) -> f64;

    /// Next index in `[0, bound)`; `bound` must be positive
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn next_below(&mut self, bound: usize) -> usize {
        debug_assert!(bound > 0, "next_below requires a positive bound");
        let index = (self.next_unit() * bound as f64) as usize;
        index.min(bound.saturating_sub(1))
    }
}

/// Uniform source constructible from a seed
pub trait SeededSource: UniformSource + Sized {
    /// Create source from seed
    fn from_seed(seed: u64) -> Self;
}

/// 32-bit linear congruential generator
///
/// `state = state × 1664525 + 1013904223 (mod 2³²)`, output `state / 2³²`.
/// The 64-bit seed is folded into 32 bits by XOR of its halves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lcg32 {
    state: u32,
}

impl Lcg32 {
    /// Multiplier (Numerical Recipes)
    pub const MULTIPLIER: u32 = 1_664_525;
    /// Increment (Numerical Recipes)
    pub const INCREMENT: u32 = 1_013_904_223;

    /// Create generator from seed
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(seed: u64) -> Self {
        Self {
            state: (seed as u32) ^ ((seed >> 32) as u32),
        }
    }

    /// Advance and return the raw 32-bit state
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT);
        self.state
    }
}

impl UniformSource for Lcg32 {
    #[inline]
    fn next_unit(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }
}

impl SeededSource for Lcg32 {
    #[inline]
    fn from_seed(seed: u64) -> Self {
        Self::new(seed)
    }
}

/// Adapter for any `rand` generator
#[derive(Debug, Clone)]
pub struct RandSource<R>(R);

impl<R: RngCore> RandSource<R> {
    /// Wrap an existing generator
    #[inline]
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self(rng)
    }
}

impl<R: RngCore> UniformSource for RandSource<R> {
    #[allow(clippy::cast_precision_loss)]
    fn next_unit(&mut self) -> f64 {
        // top 53 bits -> exact double in [0, 1)
        (self.0.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

impl<R: RngCore + SeedableRng> SeededSource for RandSource<R> {
    fn from_seed(seed: u64) -> Self {
        Self(R::seed_from_u64(seed))
    }
}

/// `rand`'s standard generator behind the adapter
pub type StdRandSource = RandSource<rand::rngs::StdRng>;
