//! Random sub-streams.
//!
//! Each internal random draw (the random start, a top-up, the draws inside
//! one grid) runs on a child generator seeded from the caller's generator, so
//! adding or reordering one draw does not shift the streams of the others.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Child generator seeded from a fresh value drawn from `rng`.
pub fn fork<R: Rng + ?Sized>(rng: &mut R) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(rng.r#gen::<u64>())
}
