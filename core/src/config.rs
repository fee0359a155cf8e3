use serde::{Deserialize, Serialize};

/// Boosting hyperparameters, shared by the classifier and the regressor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostParams {
    #[serde(default = "default_rounds")]
    pub rounds: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            rounds:           default_rounds(),
            learning_rate:    default_learning_rate(),
            max_depth:        default_max_depth(),
            min_samples_leaf: default_min_samples_leaf(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Days between the cutoff date and the end of the raw data.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: i64,

    /// Fraction of customers held out for evaluation.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    /// Master seed for the train/test shuffle.
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub boost: BoostParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            horizon_days:  default_horizon_days(),
            test_fraction: default_test_fraction(),
            seed:          default_seed(),
            boost:         BoostParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file. Every field is optional in the file.
    /// In tests, use PipelineConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Few rounds and a higher learning rate so test suites stay fast.
    pub fn default_test() -> Self {
        Self {
            horizon_days:  90,
            test_fraction: 0.2,
            seed:          42,
            boost: BoostParams {
                rounds:           30,
                learning_rate:    0.1,
                max_depth:        3,
                min_samples_leaf: 1,
            },
        }
    }
}

fn default_horizon_days() -> i64 {
    90
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_rounds() -> usize {
    100
}

fn default_learning_rate() -> f64 {
    0.05
}

fn default_max_depth() -> usize {
    3
}

fn default_min_samples_leaf() -> usize {
    1
}
