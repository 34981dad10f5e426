//! Seeded jitter and dithered rounding
//!
//! All randomness in the estimator is reproducible: seed material is hashed
//! with SHA-256, truncated to the first 8 bytes (big-endian u64) and fed to
//! a `ChaCha8Rng`. Gaussian draws use Box-Muller over two uniform draws.
//! The same hash/generator combination is used on the slow path, the fast
//! path and the dither so that identical inputs always reproduce identical
//! outputs.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Derive a 64-bit seed from arbitrary seed material
#[must_use]
pub fn seed_from(material: &str) -> u64 {
    let digest = Sha256::digest(material.as_bytes());
    u64::from_be_bytes(digest[..8].try_into().expect("digest is 32 bytes"))
}

/// Draw one N(0, sigma) sample from a deterministic seed, clipped to ±clip
#[must_use]
pub fn gaussian_draw(seed: u64, sigma: f64, clip: f64) -> f64 {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let u1: f64 = rng.gen::<f64>().max(1e-9);
    let u2: f64 = rng.gen::<f64>().max(1e-9);
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    (sigma * z).clamp(-clip, clip)
}

/// Slow jitter: reseeded once per time bucket, stable across many ticks for
/// the same song key
#[must_use]
pub fn slow_jitter(
    song_key: &str,
    epoch_secs: i64,
    bucket_secs: u64,
    sigma: f64,
    clip: f64,
) -> f64 {
    let bucket = epoch_secs.div_euclid(bucket_secs.max(1) as i64);
    let seed = seed_from(&format!("{song_key}|{bucket}"));
    gaussian_draw(seed, sigma, clip)
}

/// Fast jitter: reseeded from a millisecond tick on every call
#[must_use]
pub fn fast_jitter(tick_ms: i64, sigma: f64, clip: f64) -> f64 {
    let seed = seed_from(&tick_ms.to_string());
    gaussian_draw(seed, sigma, clip)
}

/// Dithered rounding: the fractional part is the probability of rounding up
///
/// The uniform draw is reseeded `dither_hz` times per second from the seed
/// key, so repeated calls within one dither tick agree while the long-run
/// average over many ticks matches the true fractional value. This avoids
/// the visually flat plateaus plain rounding produces.
#[must_use]
pub fn dithered_round(value: f64, seed_key: &str, epoch_secs: f64, dither_hz: f64) -> u32 {
    let floor = value.floor();
    let frac = value - floor;
    let tick = (epoch_secs * dither_hz.max(1.0)).floor() as i64;
    let seed = seed_from(&format!("{seed_key}|{tick}"));
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let up = rng.gen::<f64>() < frac;
    floor as u32 + u32::from(up)
}
