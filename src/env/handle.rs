use serde::{Deserialize, Serialize};

/// Broad environment family, decided once when the run is configured.
///
/// Image-based environments get the convolutional body; everything else gets
/// the dense/tanh body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EnvFamily {
    Image,
    Vector,
}

impl EnvFamily {
    pub fn is_image_based(self) -> bool {
        self == EnvFamily::Image
    }
}

/// Element type of the observations an environment emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObsDtype {
    F32,
    U8,
    I32,
}

/// Fixed-width integer cast applied to rendered frames for accelerators that
/// cannot consume the default frame dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputDtype {
    Int32,
}

/// Per-sample observation shape and dtype (batch axis excluded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSpace {
    pub shape: Vec<usize>,
    pub dtype: ObsDtype,
}

impl ObservationSpace {
    pub fn new(shape: Vec<usize>, dtype: ObsDtype) -> Self {
        ObservationSpace { shape, dtype }
    }

    /// Number of scalars in one observation.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

/// How the base environment's own episode step limit is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeStepLimit {
    /// Strip the registered time limit.
    Unwrapped,
    /// Keep whatever limit the environment registers.
    AsIs,
    /// Impose this many steps per episode.
    Limit(u64),
}

/// Options for the render/resize/frame-skip pipeline wrapped around a base
/// environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GymWrapperOptions {
    pub rl_env_max_episode_steps: EpisodeStepLimit,
    pub maxskip_env: bool,
    pub rendered_env: bool,
    pub rendered_env_resize_to: (usize, usize),
    pub sticky_actions: bool,
    pub output_dtype: Option<OutputDtype>,
}

/// Which constructor produced a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvKind {
    /// A single unbatched environment made directly from a gym id.
    Gym,
    /// A batched environment problem.
    EnvProblem,
    /// A batched environment problem behind the render pipeline.
    Rendered,
}

/// An opaque batched environment.
///
/// Handles are built once per run and owned for its duration; they are
/// intentionally not `Clone` so the train and eval environments never share
/// state.
#[derive(Debug)]
pub struct EnvHandle {
    name: String,
    kind: EnvKind,
    batch_size: usize,
    reward_range: Option<(f32, f32)>,
    observation_space: ObservationSpace,
    n_actions: usize,
    family: EnvFamily,
    wrapper: Option<GymWrapperOptions>,
}

impl EnvHandle {
    pub fn new(
        name: impl Into<String>,
        kind: EnvKind,
        batch_size: usize,
        observation_space: ObservationSpace,
        n_actions: usize,
        family: EnvFamily,
    ) -> Self {
        EnvHandle {
            name: name.into(),
            kind,
            batch_size,
            reward_range: None,
            observation_space,
            n_actions,
            family,
            wrapper: None,
        }
    }

    pub fn with_reward_range(mut self, low: f32, high: f32) -> Self {
        self.reward_range = Some((low, high));
        self
    }

    pub fn with_wrapper(mut self, wrapper: GymWrapperOptions) -> Self {
        self.wrapper = Some(wrapper);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EnvKind {
        self.kind
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Rewards are clipped into this range, if set.
    pub fn reward_range(&self) -> Option<(f32, f32)> {
        self.reward_range
    }

    pub fn observation_space(&self) -> &ObservationSpace {
        &self.observation_space
    }

    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    pub fn family(&self) -> EnvFamily {
        self.family
    }

    /// The render pipeline configuration, present only for rendered envs.
    pub fn wrapper(&self) -> Option<&GymWrapperOptions> {
        self.wrapper.as_ref()
    }
}
