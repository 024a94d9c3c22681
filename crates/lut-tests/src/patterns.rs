//! Test grid generation

use oxlut_core::ColorGrid;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Grid patterns
#[derive(Debug, Clone, Copy)]
pub enum GridPattern {
    /// Each sample equals its coordinate
    Identity,
    /// Per-channel power curve
    Gamma(f64),
    /// Output (B, R, G) of each input (R, G, B)
    ChannelSwap,
    /// Blend toward luma by the given amount
    Desaturate(f64),
    /// Uniform random samples in [0, 1] with seed
    Random(u64),
    /// Identity plus bounded seeded noise, stays in [0, 1]
    Jitter(u64),
}

/// Generate a pattern at the given resolution
pub fn generate_grid(pattern: GridPattern, size: usize) -> ColorGrid {
    let grid = match pattern {
        GridPattern::Identity => ColorGrid::identity(size),
        GridPattern::Gamma(g) => ColorGrid::from_fn(size, |c| c.map(|v| v.powf(g))),
        GridPattern::ChannelSwap => ColorGrid::from_fn(size, |[r, g, b]| [b, r, g]),
        GridPattern::Desaturate(amount) => ColorGrid::from_fn(size, |[r, g, b]| {
            let y = 0.2126 * r + 0.7152 * g + 0.0722 * b;
            [r, g, b].map(|v| v + (y - v) * amount)
        }),
        GridPattern::Random(seed) => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let samples = (0..size * size * size)
                .map(|_| {
                    [
                        rng.gen_range(0.0..=1.0),
                        rng.gen_range(0.0..=1.0),
                        rng.gen_range(0.0..=1.0),
                    ]
                })
                .collect();
            ColorGrid::new(size, samples)
        }
        GridPattern::Jitter(seed) => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let identity = ColorGrid::identity(size).expect("valid size");
            let samples = identity
                .samples()
                .iter()
                .map(|s| s.map(|v: f64| (v + rng.gen_range(-0.02..=0.02)).clamp(0.0, 1.0)))
                .collect();
            ColorGrid::new(size, samples)
        }
    };
    grid.expect("pattern grid")
}
