//! Round selection: a random subset of the library plus one target.

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

use super::library::{ImageEntry, Library};
use crate::error::Result;

/// Uniform random source for round draws.
pub trait Sampler {
    /// Uniform index in `0..len`. `len` is never zero. Out-of-range
    /// results are wrapped back into range by callers.
    fn index(&mut self, len: usize) -> usize;
}

/// `Sampler` over any `rand` generator. Defaults to a PCG stream.
#[derive(Clone, Debug)]
pub struct RandomSampler<R = Pcg64Mcg> {
    rng: R,
}

impl RandomSampler<Pcg64Mcg> {
    /// Deterministic stream, for replays and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// Seeded from the platform entropy source (`crypto.getRandomValues` in the browser).
    pub fn from_entropy() -> Result<Self> {
        let mut seed = [0u8; 16];
        getrandom::getrandom(&mut seed)?;
        Ok(Self {
            rng: Pcg64Mcg::from_seed(seed),
        })
    }
}

impl<R: RngCore> RandomSampler<R> {
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: RngCore> Sampler for RandomSampler<R> {
    fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

fn pick_index(sampler: &mut impl Sampler, len: usize) -> usize {
    sampler.index(len) % len
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round {
    entries: Vec<ImageEntry>,
    target: usize,
}

impl Round {
    /// Draws `min(size, library.len())` distinct entries by repeated random
    /// extraction, then a target among them. `None` for an empty library.
    pub fn draw(library: &Library, size: usize, sampler: &mut impl Sampler) -> Option<Self> {
        if library.is_empty() || size == 0 {
            return None;
        }
        let all = library.entries();
        let mut pool: Vec<usize> = (0..all.len()).collect();
        let want = size.min(pool.len());
        let mut entries = Vec::with_capacity(want);
        while entries.len() < want {
            let i = pick_index(sampler, pool.len());
            entries.push(all[pool.swap_remove(i)].clone());
        }
        let target = pick_index(sampler, entries.len());
        Some(Self { entries, target })
    }

    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn target(&self) -> &ImageEntry {
        &self.entries[self.target]
    }

    pub fn is_target(&self, id: &str) -> bool {
        self.target().id == id
    }
}
