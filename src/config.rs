//! Configuration for tree splitting, grid weighting, GRTS sampling and split allocation.
//!
//! Every section deserializes with `serde` and rejects unknown fields, so a
//! typo in a JSON or TOML document fails loudly instead of silently falling
//! back to a default.
use crate::error::{GrtsError, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// How quadrant rows are duplicated before systematic sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum WeightMethod {
    /// Sample the quadrant table as is.
    #[default]
    None,
    /// One extra row for quadrants at least twice as sparse as the densest.
    DensityFactor,
    /// `round(max / count)` extra rows for every quadrant sparser than the densest.
    InverseDensity,
    /// Extra rows for the quadrants nearest to k-means centers of the grid layout.
    Cluster {
        #[serde(default = "WeightMethod::default_n_clusters")]
        n_clusters: usize,
        #[serde(default = "WeightMethod::default_num_results")]
        num_results: usize,
    },
}

impl WeightMethod {
    const fn default_n_clusters() -> usize {
        10
    }

    const fn default_num_results() -> usize {
        2
    }

    /// Cluster weighting with the default cluster and neighbour counts.
    pub const fn cluster() -> Self {
        Self::Cluster {
            n_clusters: Self::default_n_clusters(),
            num_results: Self::default_num_results(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::DensityFactor => "density-factor",
            Self::InverseDensity => "inverse-density",
            Self::Cluster { .. } => "cluster",
        }
    }
}

impl FromStr for WeightMethod {
    type Err = GrtsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "density-factor" => Ok(Self::DensityFactor),
            "inverse-density" => Ok(Self::InverseDensity),
            "cluster" => Ok(Self::cluster()),
            other => Err(GrtsError::InvalidConfig(format!(
                "unsupported weight method '{}', expected one of none, density-factor, inverse-density, cluster",
                other
            ))),
        }
    }
}

/// Stopping rule for recursive splitting, resolved from [`SplitOptions`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopRule {
    /// Stop after the first split that prunes a quadrant.
    FirstNull,
    /// Stop once every quadrant's shorter side is at most this length.
    MaxLength(f64),
    /// Stop once no quadrant holds more than this many points.
    MaxSamples(usize),
}

/// Options for [`QuadTree::split_recursive`](crate::QuadTree::split_recursive).
///
/// Precedence when several are set: `first_null > max_length > max_samples`.
/// `min_thresh` is the pruning threshold handed to every split, not a
/// stopping criterion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitOptions {
    #[serde(default)]
    pub max_samples: Option<usize>,
    #[serde(default)]
    pub max_length: Option<f64>,
    #[serde(default)]
    pub first_null: bool,
    #[serde(default)]
    pub min_thresh: usize,
}

impl SplitOptions {
    pub fn max_samples(max_samples: usize) -> Self {
        Self {
            max_samples: Some(max_samples),
            ..Self::default()
        }
    }

    pub fn max_length(max_length: f64) -> Self {
        Self {
            max_length: Some(max_length),
            ..Self::default()
        }
    }

    pub fn first_null() -> Self {
        Self {
            first_null: true,
            ..Self::default()
        }
    }

    pub fn with_min_thresh(mut self, min_thresh: usize) -> Self {
        self.min_thresh = min_thresh;
        self
    }

    /// Resolve the single active stopping rule.
    pub fn stop_rule(&self) -> Result<StopRule> {
        if self.first_null {
            return Ok(StopRule::FirstNull);
        }

        if let Some(max_length) = self.max_length {
            if !max_length.is_finite() || max_length <= 0.0 {
                return Err(GrtsError::InvalidConfig(format!(
                    "max_length must be a positive finite length, got {}",
                    max_length
                )));
            }
            return Ok(StopRule::MaxLength(max_length));
        }

        if let Some(max_samples) = self.max_samples {
            return Ok(StopRule::MaxSamples(max_samples));
        }

        Err(GrtsError::InvalidConfig(
            "one of first_null, max_length or max_samples must be chosen".to_string(),
        ))
    }
}

/// Options for a single GRTS draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SampleConfig {
    /// Target number of grids.
    #[serde(default = "SampleConfig::default_n")]
    pub n: usize,

    #[serde(default = "SampleConfig::default_samples_per_grid")]
    pub samples_per_grid: usize,

    /// Attribute column to stratify within-grid samples by.
    #[serde(default)]
    pub strata_column: Option<String>,

    /// Per-value quotas; values without an entry fall back to `samples_per_grid`.
    #[serde(default)]
    pub strata_samples_per_grid: Option<BTreeMap<String, usize>>,

    #[serde(default)]
    pub weight_method: WeightMethod,

    /// Favour points far from the quadrant edge.
    #[serde(default)]
    pub weight_sample_by_distance: bool,

    #[serde(default = "SampleConfig::default_distance_multiplier")]
    pub multiply_distance_weights_by: f64,

    #[serde(default)]
    pub random_state: Option<u64>,
}

impl SampleConfig {
    const fn default_n() -> usize {
        1
    }

    const fn default_samples_per_grid() -> usize {
        1
    }

    const fn default_distance_multiplier() -> f64 {
        1.0
    }

    pub fn new(n: usize) -> Self {
        Self {
            n,
            ..Self::default()
        }
    }

    pub fn with_n(mut self, n: usize) -> Self {
        self.n = n;
        self
    }

    pub fn with_samples_per_grid(mut self, samples_per_grid: usize) -> Self {
        self.samples_per_grid = samples_per_grid;
        self
    }

    pub fn with_strata_column(mut self, column: impl Into<String>) -> Self {
        self.strata_column = Some(column.into());
        self
    }

    pub fn with_strata_quotas(mut self, quotas: BTreeMap<String, usize>) -> Self {
        self.strata_samples_per_grid = Some(quotas);
        self
    }

    pub fn with_weight_method(mut self, method: WeightMethod) -> Self {
        self.weight_method = method;
        self
    }

    pub fn with_distance_weights(mut self, multiplier: f64) -> Self {
        self.weight_sample_by_distance = true;
        self.multiply_distance_weights_by = multiplier;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Generator seeded from `random_state`, or from OS entropy when unset.
    pub fn rng(&self) -> ChaCha8Rng {
        match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.strata_samples_per_grid.is_some() && self.strata_column.is_none() {
            return Err("strata_samples_per_grid requires strata_column".to_string());
        }

        if !self.multiply_distance_weights_by.is_finite() || self.multiply_distance_weights_by <= 0.0
        {
            return Err(format!(
                "multiply_distance_weights_by must be a positive finite value, got {}",
                self.multiply_distance_weights_by
            ));
        }

        if let WeightMethod::Cluster {
            n_clusters,
            num_results,
        } = self.weight_method
            && (n_clusters == 0 || num_results == 0)
        {
            return Err("cluster weighting needs n_clusters > 0 and num_results > 0".to_string());
        }

        Ok(())
    }
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            n: Self::default_n(),
            samples_per_grid: Self::default_samples_per_grid(),
            strata_column: None,
            strata_samples_per_grid: None,
            weight_method: WeightMethod::default(),
            weight_sample_by_distance: false,
            multiply_distance_weights_by: Self::default_distance_multiplier(),
            random_state: None,
        }
    }
}

/// Fractions for a sequential test → validation → train allocation.
///
/// Each fraction applies to the quadrants still unassigned when its split is
/// drawn, so `train_frac = 1.0` hands every remaining quadrant to training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainValTestConfig {
    #[serde(default = "TrainValTestConfig::default_train_frac")]
    pub train_frac: f64,
    #[serde(default = "TrainValTestConfig::default_val_frac")]
    pub val_frac: f64,
    #[serde(default = "TrainValTestConfig::default_test_frac")]
    pub test_frac: f64,
}

impl TrainValTestConfig {
    const fn default_train_frac() -> f64 {
        1.0
    }

    const fn default_val_frac() -> f64 {
        0.2
    }

    const fn default_test_frac() -> f64 {
        0.2
    }

    pub fn new(train_frac: f64, val_frac: f64, test_frac: f64) -> Self {
        Self {
            train_frac,
            val_frac,
            test_frac,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, value) in [
            ("train_frac", self.train_frac),
            ("val_frac", self.val_frac),
            ("test_frac", self.test_frac),
        ] {
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return Err(format!("{} must be in (0, 1], got {}", name, value));
            }
        }

        if self.test_frac + self.val_frac >= 1.0 {
            return Err(format!(
                "test_frac + val_frac must leave quadrants for training, got {}",
                self.test_frac + self.val_frac
            ));
        }

        Ok(())
    }
}

impl Default for TrainValTestConfig {
    fn default() -> Self {
        Self {
            train_frac: Self::default_train_frac(),
            val_frac: Self::default_val_frac(),
            test_frac: Self::default_test_frac(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KFoldConfig {
    #[serde(default = "KFoldConfig::default_n_splits")]
    pub n_splits: usize,
}

impl KFoldConfig {
    const fn default_n_splits() -> usize {
        5
    }

    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.n_splits < 2 {
            return Err(format!("n_splits must be at least 2, got {}", self.n_splits));
        }
        Ok(())
    }
}

impl Default for KFoldConfig {
    fn default() -> Self {
        Self {
            n_splits: Self::default_n_splits(),
        }
    }
}

/// Full sampling run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Grow the initial quadrant's shorter side so quadrants are square.
    #[serde(default = "Config::default_force_square")]
    pub force_square: bool,

    #[serde(default)]
    pub split: SplitOptions,

    #[serde(default)]
    pub sample: SampleConfig,

    #[serde(default)]
    pub train_val_test: TrainValTestConfig,

    #[serde(default)]
    pub kfold: KFoldConfig,
}

impl Config {
    const fn default_force_square() -> bool {
        true
    }

    pub fn with_force_square(mut self, force_square: bool) -> Self {
        self.force_square = force_square;
        self
    }

    pub fn with_split(mut self, split: SplitOptions) -> Self {
        self.split = split;
        self
    }

    pub fn with_sample(mut self, sample: SampleConfig) -> Self {
        self.sample = sample;
        self
    }

    pub fn with_train_val_test(mut self, fractions: TrainValTestConfig) -> Self {
        self.train_val_test = fractions;
        self
    }

    pub fn with_kfold(mut self, kfold: KFoldConfig) -> Self {
        self.kfold = kfold;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        self.sample.validate()?;
        self.train_val_test.validate()?;
        self.kfold.validate()?;
        Ok(())
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(serde_json::Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load a configuration file, choosing the format from its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()) {
            #[cfg(feature = "toml")]
            Some("toml") => Self::from_toml(&contents).map_err(|e| GrtsError::Toml(e.to_string())),
            Some("json") => Ok(Self::from_json(&contents)?),
            other => Err(GrtsError::InvalidConfig(format!(
                "unsupported configuration file extension: {:?}",
                other
            ))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            force_square: Self::default_force_square(),
            split: SplitOptions::default(),
            sample: SampleConfig::default(),
            train_val_test: TrainValTestConfig::default(),
            kfold: KFoldConfig::default(),
        }
    }
}
