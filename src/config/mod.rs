use crate::algorithms::{FitParams, DEFAULT_ALPHA, DEFAULT_ITERATIONS, DEFAULT_LAMBDA};
use crate::dataset::{TrainingDataset, DEFAULT_DIMENSION};
use crate::models::{SortKey, SortOrder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub training: TrainingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub dimension: usize,
    /// Seed for latent vector initialization; OS entropy when unset.
    pub seed: Option<u64>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            seed: None,
        }
    }
}

impl DatasetConfig {
    pub fn build(&self) -> TrainingDataset {
        match self.seed {
            Some(seed) => TrainingDataset::with_seed(self.dimension, seed),
            None => TrainingDataset::new(self.dimension),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub iterations: usize,
    pub lambda: f64,
    pub alpha: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            lambda: DEFAULT_LAMBDA,
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl From<&TrainingConfig> for FitParams {
    fn from(config: &TrainingConfig) -> Self {
        FitParams {
            iterations: config.iterations,
            lambda: config.lambda,
            alpha: config.alpha,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Decimal digits for rendered predictions; raw values when unset.
    pub fixed: Option<usize>,
    pub sort_key: Option<SortKey>,
    pub sort_order: SortOrder,
}

impl Config {
    /// Loads `path` (any format the `config` crate understands), then applies
    /// `LATENTCF_<SECTION>__<KEY>` environment overrides.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("LATENTCF").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.dataset.dimension, 2);
        assert_eq!(config.dataset.seed, None);

        let params = FitParams::from(&config.training);
        assert_eq!(params, FitParams::default());
        assert_eq!(params.iterations, 500);
        assert_eq!(params.lambda, 0.0);
        assert_eq!(params.alpha, 0.01);

        assert_eq!(config.output.sort_order, SortOrder::Desc);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"training":{"iterations":10},"output":{"sort_key":"predicted"}}"#)
                .unwrap();
        assert_eq!(config.training.iterations, 10);
        assert_eq!(config.training.alpha, 0.01);
        assert_eq!(config.output.sort_key, Some(SortKey::Predicted));
        assert_eq!(config.dataset, DatasetConfig::default());
    }

    #[test]
    fn test_seeded_build() {
        let config = DatasetConfig {
            dimension: 4,
            seed: Some(1),
        };
        let mut a = config.build();
        let mut b = config.build();
        a.add("u", "i", 1.0).unwrap();
        b.add("u", "i", 1.0).unwrap();

        assert_eq!(a.dimension(), 4);
        assert_eq!(a.user_vector("u").unwrap(), b.user_vector("u").unwrap());
    }
}
