//! Environment construction: the builder seam, the factory that picks the
//! plain or rendered constructor, and the built-in catalogue.

pub mod factory;
pub mod handle;
pub mod registry;

pub use factory::{make_env, EnvBuilder, EnvSource, RenderOptions, REWARD_RANGE};
pub use handle::{
    EnvFamily, EnvHandle, EnvKind, EpisodeStepLimit, GymWrapperOptions, ObsDtype,
    ObservationSpace, OutputDtype,
};
pub use registry::{classify, lookup, EnvSpec, RegistryEnvBuilder};
