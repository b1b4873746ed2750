use serde::{Deserialize, Serialize};
use tracing::info;

use crate::env::handle::{EnvHandle, EpisodeStepLimit, GymWrapperOptions, OutputDtype};
use crate::error::{ConfigError, EnvError};

/// Rewards of batched environment problems are clipped to this range.
pub const REWARD_RANGE: (f32, f32) = (-1.0, 1.0);

/// Constructors the driver consumes to obtain environments.
pub trait EnvBuilder {
    /// A single unbatched environment made straight from a gym id.
    fn gym_env(&self, name: &str) -> Result<EnvHandle, EnvError>;

    /// A plain batched environment problem.
    fn env_problem(
        &self,
        base_env_name: &str,
        batch_size: usize,
        reward_range: (f32, f32),
    ) -> Result<EnvHandle, EnvError>;

    /// A batched environment problem behind the render/resize/frame-skip
    /// pipeline described by `wrapper`.
    fn rendered_env_problem(
        &self,
        base_env_name: &str,
        batch_size: usize,
        wrapper: GymWrapperOptions,
        reward_range: (f32, f32),
    ) -> Result<EnvHandle, EnvError>;
}

/// Which naming scheme a run uses. Exactly one is active per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvSource {
    /// Explicit gym id (`env_name`).
    Gym(String),
    /// Environment problem name (`env_problem_name`).
    EnvProblem(String),
}

impl EnvSource {
    pub fn name(&self) -> &str {
        match self {
            EnvSource::Gym(name) | EnvSource::EnvProblem(name) => name,
        }
    }
}

/// Settings of the render pipeline. Only consulted when frames are resized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub max_episode_steps: EpisodeStepLimit,
    pub resized_height: usize,
    pub resized_width: usize,
    /// Target accelerator only accepts fixed-width integer frames.
    pub use_accelerator: bool,
}

impl RenderOptions {
    pub fn wrapper_options(&self) -> GymWrapperOptions {
        GymWrapperOptions {
            rl_env_max_episode_steps: self.max_episode_steps,
            maxskip_env: true,
            rendered_env: true,
            rendered_env_resize_to: (self.resized_height, self.resized_width),
            sticky_actions: false,
            output_dtype: self.use_accelerator.then_some(OutputDtype::Int32),
        }
    }
}

/// Build one environment for `source`.
///
/// With `render` set, the environment problem goes through the render
/// pipeline; without it, the plain constructor is used and no render option
/// is looked at. Gym ids always build a single unbatched environment.
pub fn make_env<E: EnvBuilder + ?Sized>(
    builder: &E,
    source: &EnvSource,
    batch_size: usize,
    render: Option<&RenderOptions>,
) -> Result<EnvHandle, EnvError> {
    if source.name().trim().is_empty() {
        return Err(ConfigError::MissingEnvironment.into());
    }

    let env = match (source, render) {
        (EnvSource::Gym(name), _) => builder.gym_env(name)?,
        (EnvSource::EnvProblem(name), None) => {
            builder.env_problem(name, batch_size, REWARD_RANGE)?
        }
        (EnvSource::EnvProblem(name), Some(render)) => builder.rendered_env_problem(
            name,
            batch_size,
            render.wrapper_options(),
            REWARD_RANGE,
        )?,
    };

    info!(
        env = env.name(),
        kind = ?env.kind(),
        batch_size = env.batch_size(),
        "environment ready"
    );
    Ok(env)
}
