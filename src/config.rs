use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ai::selector::NetworkTopology;
use crate::env::{EnvFamily, EnvSource, EpisodeStepLimit, RenderOptions};
use crate::error::{ConfigError, SeedParseError};

/// The flat option set of a run, exactly as given on the command line or in
/// a TOML file. Every field has its own default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOptions {
    /// Gym id of a single environment to make.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_name: Option<String>,
    /// Name of the batched environment problem to make.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_problem_name: Option<String>,
    /// Overrides the catalogued family of the environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_family: Option<EnvFamily>,

    pub epochs: usize,
    /// Parsed as an integer; anything else runs unseeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<String>,
    pub batch_size: usize,
    pub eval_batch_size: usize,
    /// Trajectories are padded to integer multiples of this.
    pub boundary: usize,
    /// Episode step limit of rendered envs: unset strips the limit, -1 keeps
    /// the registered one, anything else imposes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_timestep: Option<i64>,
    /// Maximum trajectory length used while collecting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation_timestep: Option<usize>,

    pub debug_nans: bool,
    pub disable_jit: bool,

    pub resize: bool,
    pub resized_height: usize,
    pub resized_width: usize,
    pub use_accelerator: bool,

    pub combined_network: bool,
    pub two_towers: bool,
    pub flatten_dims: bool,

    pub num_optimizer_steps: usize,
    pub policy_only_num_optimizer_steps: usize,
    pub value_only_num_optimizer_steps: usize,
    pub print_every_optimizer_steps: usize,

    pub learning_rate: f64,
    pub policy_only_learning_rate: f64,
    pub value_only_learning_rate: f64,

    pub target_kl: f64,
    pub value_coef: f64,
    pub entropy_coef: f64,
    pub gamma: f64,
    pub lambda: f64,
    pub epsilon: f64,

    pub output_dir: PathBuf,
    pub enable_early_stopping: bool,
    pub eval_every_n: usize,
}

impl Default for RawOptions {
    fn default() -> Self {
        RawOptions {
            env_name: None,
            env_problem_name: None,
            env_family: None,
            epochs: 100,
            random_seed: None,
            batch_size: 32,
            eval_batch_size: 4,
            boundary: 20,
            max_timestep: None,
            truncation_timestep: None,
            debug_nans: false,
            disable_jit: false,
            resize: false,
            resized_height: 105,
            resized_width: 80,
            use_accelerator: false,
            combined_network: false,
            two_towers: true,
            flatten_dims: false,
            num_optimizer_steps: 100,
            policy_only_num_optimizer_steps: 80,
            value_only_num_optimizer_steps: 80,
            print_every_optimizer_steps: 1,
            learning_rate: 1e-3,
            policy_only_learning_rate: 3e-4,
            value_only_learning_rate: 1e-3,
            target_kl: 0.01,
            value_coef: 1.0,
            entropy_coef: 0.01,
            gamma: 0.99,
            lambda: 0.95,
            epsilon: 0.1,
            output_dir: PathBuf::new(),
            enable_early_stopping: true,
            eval_every_n: 100,
        }
    }
}

impl RawOptions {
    /// Load options from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let options: RawOptions = toml::from_str(&content)?;
        Ok(options)
    }

    /// Load options from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Pick the environment naming scheme. Exactly one name must be set.
    pub fn env_source(&self) -> Result<EnvSource, ConfigError> {
        let non_empty = |name: &Option<String>| {
            name.as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
        };

        match (non_empty(&self.env_name), non_empty(&self.env_problem_name)) {
            (Some(env_name), Some(env_problem_name)) => Err(ConfigError::ConflictingEnvironments {
                env_name,
                env_problem_name,
            }),
            (Some(env_name), None) => Ok(EnvSource::Gym(env_name)),
            (None, Some(env_problem_name)) => Ok(EnvSource::EnvProblem(env_problem_name)),
            (None, None) => Err(ConfigError::MissingEnvironment),
        }
    }

    /// Validate numeric options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive_counts = [
            ("epochs", self.epochs),
            ("batch_size", self.batch_size),
            ("eval_batch_size", self.eval_batch_size),
            ("boundary", self.boundary),
            ("num_optimizer_steps", self.num_optimizer_steps),
            (
                "policy_only_num_optimizer_steps",
                self.policy_only_num_optimizer_steps,
            ),
            (
                "value_only_num_optimizer_steps",
                self.value_only_num_optimizer_steps,
            ),
            ("print_every_optimizer_steps", self.print_every_optimizer_steps),
            ("eval_every_n", self.eval_every_n),
        ];
        for (name, value) in positive_counts {
            if value == 0 {
                return Err(ConfigError::Validation(format!("{name} must be > 0")));
            }
        }

        for (name, value) in [
            ("learning_rate", self.learning_rate),
            ("policy_only_learning_rate", self.policy_only_learning_rate),
            ("value_only_learning_rate", self.value_only_learning_rate),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::Validation(format!("{name} must be > 0")));
            }
        }

        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(ConfigError::Validation("gamma must be in [0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&self.lambda) {
            return Err(ConfigError::Validation("lambda must be in [0, 1]".into()));
        }
        if self.epsilon <= 0.0 {
            return Err(ConfigError::Validation("epsilon must be > 0".into()));
        }
        if self.value_coef < 0.0 {
            return Err(ConfigError::Validation("value_coef must be >= 0".into()));
        }
        if self.entropy_coef < 0.0 {
            return Err(ConfigError::Validation("entropy_coef must be >= 0".into()));
        }
        if self.target_kl < 0.0 {
            return Err(ConfigError::Validation("target_kl must be >= 0".into()));
        }
        if self.truncation_timestep == Some(0) {
            return Err(ConfigError::Validation(
                "truncation_timestep must be > 0 when set".into(),
            ));
        }

        Ok(())
    }

    /// Render pipeline settings, or `None` when frames are not resized.
    ///
    /// The render options are only read and checked when `resize` is set.
    pub fn render_options(&self) -> Result<Option<RenderOptions>, ConfigError> {
        if !self.resize {
            return Ok(None);
        }
        if self.resized_height == 0 || self.resized_width == 0 {
            return Err(ConfigError::Validation(
                "resized_height and resized_width must be > 0".into(),
            ));
        }
        let max_episode_steps = match self.max_timestep {
            None => EpisodeStepLimit::Unwrapped,
            Some(-1) => EpisodeStepLimit::AsIs,
            Some(steps) if steps >= 0 => EpisodeStepLimit::Limit(steps as u64),
            Some(steps) => {
                return Err(ConfigError::Validation(format!(
                    "max_timestep must be -1 or >= 0, got {steps}"
                )))
            }
        };
        Ok(Some(RenderOptions {
            max_episode_steps,
            resized_height: self.resized_height,
            resized_width: self.resized_width,
            use_accelerator: self.use_accelerator,
        }))
    }

    pub fn topology(&self) -> NetworkTopology {
        if self.combined_network {
            NetworkTopology::Combined {
                two_towers: self.two_towers,
            }
        } else {
            NetworkTopology::Separate
        }
    }

    pub fn learning_rates(&self) -> LearningRates {
        LearningRates {
            combined: self.learning_rate,
            policy_only: self.policy_only_learning_rate,
            value_only: self.value_only_learning_rate,
        }
    }

    pub fn ppo_coefficients(&self) -> PpoCoefficients {
        PpoCoefficients {
            gamma: self.gamma,
            lambda: self.lambda,
            epsilon: self.epsilon,
            value_coef: self.value_coef,
            entropy_coef: self.entropy_coef,
            target_kl: self.target_kl,
        }
    }

    pub fn optimizer_steps(&self) -> OptimizerSteps {
        OptimizerSteps {
            combined: self.num_optimizer_steps,
            policy_only: self.policy_only_num_optimizer_steps,
            value_only: self.value_only_num_optimizer_steps,
            print_every: self.print_every_optimizer_steps,
        }
    }

    /// Generate a TOML string with all default values.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&RawOptions::default()).expect("default options serialize")
    }
}

/// Parse a seed string as an integer.
pub fn parse_seed(raw: Option<&str>) -> Result<i64, SeedParseError> {
    let raw = raw.ok_or(SeedParseError::Unset)?;
    raw.trim()
        .parse::<i64>()
        .map_err(|source| SeedParseError::NotAnInteger {
            raw: raw.to_string(),
            source,
        })
}

/// Learning rates of the combined network and of the separate networks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningRates {
    pub combined: f64,
    pub policy_only: f64,
    pub value_only: f64,
}

/// PPO loss and stopping coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PpoCoefficients {
    /// Discount factor.
    pub gamma: f64,
    /// GAE lambda.
    pub lambda: f64,
    /// Clipping epsilon of the surrogate objective.
    pub epsilon: f64,
    /// Weight of the value loss in the combined loss (c1).
    pub value_coef: f64,
    /// Weight of the entropy bonus in the combined loss (c2).
    pub entropy_coef: f64,
    /// KL divergence that stops a policy update early.
    pub target_kl: f64,
}

/// Optimizer steps per epoch for each network, and the logging cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerSteps {
    pub combined: usize,
    pub policy_only: usize,
    pub value_only: usize,
    pub print_every: usize,
}

/// The resolved, immutable hyperparameters of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    pub env_source: EnvSource,
    pub env_family: EnvFamily,
    pub epochs: usize,
    pub batch_size: usize,
    pub eval_batch_size: usize,
    pub topology: NetworkTopology,
    pub flatten_dims: bool,
    pub learning_rates: LearningRates,
    pub ppo: PpoCoefficients,
    pub optimizer_steps: OptimizerSteps,
    pub boundary: usize,
    pub truncation_timestep: Option<usize>,
    /// `None` when no usable seed was given.
    pub random_seed: Option<i64>,
    pub render: Option<RenderOptions>,
    pub output_dir: PathBuf,
    pub enable_early_stopping: bool,
    pub eval_every_n: usize,
}
