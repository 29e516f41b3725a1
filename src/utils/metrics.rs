use serde::{Deserialize, Serialize};

/// Error of predicted ratings against observed ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingMetrics {
    pub count: usize,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
}

impl RatingMetrics {
    /// `pairs` holds `(predicted, observed)`.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        let mse = mean_squared_error(pairs);
        Self {
            count: pairs.len(),
            mse,
            rmse: mse.sqrt(),
            mae: mean_absolute_error(pairs),
        }
    }
}

pub fn mean_squared_error(pairs: &[(f64, f64)]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }

    let total: f64 = pairs
        .iter()
        .map(|(predicted, observed)| (predicted - observed).powi(2))
        .sum();
    total / pairs.len() as f64
}

pub fn root_mean_squared_error(pairs: &[(f64, f64)]) -> f64 {
    mean_squared_error(pairs).sqrt()
}

pub fn mean_absolute_error(pairs: &[(f64, f64)]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }

    let total: f64 = pairs
        .iter()
        .map(|(predicted, observed)| (predicted - observed).abs())
        .sum();
    total / pairs.len() as f64
}
