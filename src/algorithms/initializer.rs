use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Draws `size` independent components uniformly from `[0, 1)`.
pub fn unit_uniform<R: Rng>(rng: &mut R, size: usize) -> DVector<f64> {
    DVector::from_fn(size, |_, _| rng.gen::<f64>())
}

/// Source of fresh latent vectors for a dataset.
///
/// Owns its random generator so that two datasets built from the same seed
/// and the same insertion sequence end up with identical vectors.
#[derive(Debug, Clone)]
pub struct LatentInitializer {
    rng: StdRng,
    dimension: usize,
}

impl LatentInitializer {
    pub fn new(rng: StdRng, dimension: usize) -> Self {
        Self { rng, dimension }
    }

    pub fn from_seed(seed: u64, dimension: usize) -> Self {
        Self::new(StdRng::seed_from_u64(seed), dimension)
    }

    pub fn from_entropy(dimension: usize) -> Self {
        Self::new(StdRng::from_entropy(), dimension)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn next_vector(&mut self) -> DVector<f64> {
        unit_uniform(&mut self.rng, self.dimension)
    }
}
