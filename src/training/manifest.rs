use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ai::selector::NetworkTopology;
use crate::config::{OptimizerSteps, PpoCoefficients};
use crate::env::{EnvFamily, EnvHandle, EnvKind, ObservationSpace};
use crate::error::TrainerError;
use crate::training::execution::ExecutionMode;

/// File written into the output directory of a run.
pub const MANIFEST_FILE: &str = "run_manifest.json";

/// What one environment handle looked like when the run started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvSummary {
    pub name: String,
    pub kind: EnvKind,
    pub batch_size: usize,
    pub observation_space: ObservationSpace,
    pub n_actions: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_range: Option<(f32, f32)>,
}

impl From<&EnvHandle> for EnvSummary {
    fn from(env: &EnvHandle) -> Self {
        EnvSummary {
            name: env.name().to_string(),
            kind: env.kind(),
            batch_size: env.batch_size(),
            observation_space: env.observation_space().clone(),
            n_actions: env.n_actions(),
            reward_range: env.reward_range(),
        }
    }
}

/// A materialized network and its optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub name: String,
    pub parameters: usize,
    pub learning_rate: f64,
    pub optimizer_steps: usize,
}

/// Top-level record of a run, written to `run_manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub env: EnvSummary,
    pub eval_env: EnvSummary,
    pub env_family: EnvFamily,
    pub topology: NetworkTopology,
    pub networks: Vec<NetworkSummary>,
    /// Seed the backend was seeded with. A negative configured seed appears
    /// here with its bits reinterpreted as unsigned.
    pub seed: u64,
    /// Whether `seed` came from the options rather than being drawn.
    pub seed_from_options: bool,
    pub execution_mode: ExecutionMode,
    pub epochs: usize,
    pub batch_size: usize,
    pub boundary: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncation_timestep: Option<usize>,
    pub ppo: PpoCoefficients,
    pub optimizer_steps: OptimizerSteps,
    pub enable_early_stopping: bool,
    pub eval_every_n: usize,
}

impl RunManifest {
    /// Write the manifest into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, TrainerError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        Ok(path)
    }

    pub fn read_from(path: &Path) -> Result<Self, TrainerError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
