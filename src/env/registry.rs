//! Built-in environment catalogue and the default [`EnvBuilder`].

use tracing::debug;

use crate::env::factory::EnvBuilder;
use crate::env::handle::{
    EnvFamily, EnvHandle, EnvKind, EpisodeStepLimit, GymWrapperOptions, ObsDtype,
    ObservationSpace, OutputDtype,
};
use crate::error::EnvError;

/// Raw Atari frame size (height, width, channels).
const ATARI_FRAME: &[usize] = &[210, 160, 3];

/// Static description of a known environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvSpec {
    pub family: EnvFamily,
    pub observation_shape: &'static [usize],
    pub n_actions: usize,
    pub max_episode_steps: Option<u64>,
}

impl EnvSpec {
    const fn vector(observation_shape: &'static [usize], n_actions: usize, steps: u64) -> Self {
        EnvSpec {
            family: EnvFamily::Vector,
            observation_shape,
            n_actions,
            max_episode_steps: Some(steps),
        }
    }

    const fn atari(n_actions: usize, steps: u64) -> Self {
        EnvSpec {
            family: EnvFamily::Image,
            observation_shape: ATARI_FRAME,
            n_actions,
            max_episode_steps: Some(steps),
        }
    }
}

/// Look up a known environment by its gym id.
pub fn lookup(name: &str) -> Option<EnvSpec> {
    let spec = match name {
        "CartPole-v0" => EnvSpec::vector(&[4], 2, 200),
        "CartPole-v1" => EnvSpec::vector(&[4], 2, 500),
        "Acrobot-v1" => EnvSpec::vector(&[6], 3, 500),
        "MountainCar-v0" => EnvSpec::vector(&[2], 3, 200),
        "LunarLander-v2" => EnvSpec::vector(&[8], 4, 1000),
        "Pong-v0" | "Pong-v4" | "PongDeterministic-v4" => EnvSpec::atari(6, 10_000),
        "PongNoFrameskip-v4" => EnvSpec::atari(6, 400_000),
        "Breakout-v0" | "Breakout-v4" | "BreakoutDeterministic-v4" => EnvSpec::atari(4, 10_000),
        "BreakoutNoFrameskip-v4" => EnvSpec::atari(4, 400_000),
        _ => return None,
    };
    Some(spec)
}

/// Game names whose environments always observe frames, whatever the id's
/// prefix or version suffix.
const FRAME_GAMES: &[&str] = &["Pong", "Breakout"];

/// Family of a known environment, or `None` when neither the catalogue nor
/// a frame game name matches.
pub fn classify(name: &str) -> Option<EnvFamily> {
    lookup(name).map(|spec| spec.family).or_else(|| {
        FRAME_GAMES
            .iter()
            .any(|game| name.contains(game))
            .then_some(EnvFamily::Image)
    })
}

/// [`EnvBuilder`] backed by the built-in catalogue.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegistryEnvBuilder;

impl RegistryEnvBuilder {
    pub fn new() -> Self {
        RegistryEnvBuilder
    }

    fn spec(name: &str) -> Result<EnvSpec, EnvError> {
        lookup(name).ok_or_else(|| EnvError::UnknownEnvironment(name.to_string()))
    }

    fn check_batch_size(name: &str, batch_size: usize) -> Result<(), EnvError> {
        if batch_size == 0 {
            return Err(EnvError::InvalidBatchSize {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn native_dtype(spec: &EnvSpec) -> ObsDtype {
        match spec.family {
            EnvFamily::Image => ObsDtype::U8,
            EnvFamily::Vector => ObsDtype::F32,
        }
    }
}

impl EnvBuilder for RegistryEnvBuilder {
    fn gym_env(&self, name: &str) -> Result<EnvHandle, EnvError> {
        let spec = Self::spec(name)?;
        debug!(env = name, "building gym environment");
        Ok(EnvHandle::new(
            name,
            EnvKind::Gym,
            1,
            ObservationSpace::new(spec.observation_shape.to_vec(), Self::native_dtype(&spec)),
            spec.n_actions,
            spec.family,
        ))
    }

    fn env_problem(
        &self,
        base_env_name: &str,
        batch_size: usize,
        reward_range: (f32, f32),
    ) -> Result<EnvHandle, EnvError> {
        let spec = Self::spec(base_env_name)?;
        Self::check_batch_size(base_env_name, batch_size)?;
        debug!(env = base_env_name, batch_size, "building env problem");
        Ok(EnvHandle::new(
            base_env_name,
            EnvKind::EnvProblem,
            batch_size,
            ObservationSpace::new(spec.observation_shape.to_vec(), Self::native_dtype(&spec)),
            spec.n_actions,
            spec.family,
        )
        .with_reward_range(reward_range.0, reward_range.1))
    }

    fn rendered_env_problem(
        &self,
        base_env_name: &str,
        batch_size: usize,
        wrapper: GymWrapperOptions,
        reward_range: (f32, f32),
    ) -> Result<EnvHandle, EnvError> {
        let spec = Self::spec(base_env_name)?;
        Self::check_batch_size(base_env_name, batch_size)?;

        let (height, width) = wrapper.rendered_env_resize_to;
        let dtype = match wrapper.output_dtype {
            Some(OutputDtype::Int32) => ObsDtype::I32,
            None => ObsDtype::U8,
        };
        let episode_steps = match wrapper.rl_env_max_episode_steps {
            EpisodeStepLimit::Unwrapped => None,
            EpisodeStepLimit::AsIs => spec.max_episode_steps,
            EpisodeStepLimit::Limit(steps) => Some(steps),
        };
        debug!(
            env = base_env_name,
            batch_size,
            height,
            width,
            ?episode_steps,
            "building rendered env problem"
        );

        Ok(EnvHandle::new(
            base_env_name,
            EnvKind::Rendered,
            batch_size,
            ObservationSpace::new(vec![height, width, 3], dtype),
            spec.n_actions,
            EnvFamily::Image,
        )
        .with_reward_range(reward_range.0, reward_range.1)
        .with_wrapper(wrapper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapper(output_dtype: Option<OutputDtype>) -> GymWrapperOptions {
        GymWrapperOptions {
            rl_env_max_episode_steps: EpisodeStepLimit::Unwrapped,
            maxskip_env: true,
            rendered_env: true,
            rendered_env_resize_to: (105, 80),
            sticky_actions: false,
            output_dtype,
        }
    }

    #[test]
    fn test_classify_known_families() {
        assert_eq!(classify("CartPole-v1"), Some(EnvFamily::Vector));
        assert_eq!(classify("PongNoFrameskip-v4"), Some(EnvFamily::Image));
        assert_eq!(classify("NotAnEnv-v0"), None);
    }

    #[test]
    fn test_classify_uncatalogued_frame_games() {
        assert_eq!(lookup("ALE/Pong-v5"), None);
        assert_eq!(classify("ALE/Pong-v5"), Some(EnvFamily::Image));
        assert_eq!(classify("ALE/Breakout-v5"), Some(EnvFamily::Image));
    }

    #[test]
    fn test_env_problem_clamps_rewards() {
        let env = RegistryEnvBuilder::new()
            .env_problem("Acrobot-v1", 8, (-1.0, 1.0))
            .unwrap();
        assert_eq!(env.kind(), EnvKind::EnvProblem);
        assert_eq!(env.batch_size(), 8);
        assert_eq!(env.reward_range(), Some((-1.0, 1.0)));
        assert_eq!(env.observation_space().shape, vec![6]);
        assert_eq!(env.n_actions(), 3);
    }

    #[test]
    fn test_gym_env_is_unbatched() {
        let env = RegistryEnvBuilder::new().gym_env("CartPole-v0").unwrap();
        assert_eq!(env.kind(), EnvKind::Gym);
        assert_eq!(env.batch_size(), 1);
        assert_eq!(env.reward_range(), None);
    }

    #[test]
    fn test_unknown_environment_is_rejected() {
        let err = RegistryEnvBuilder::new()
            .env_problem("NotAnEnv-v0", 4, (-1.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, EnvError::UnknownEnvironment(name) if name == "NotAnEnv-v0"));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let err = RegistryEnvBuilder::new()
            .env_problem("CartPole-v1", 0, (-1.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, EnvError::InvalidBatchSize { .. }));
    }

    #[test]
    fn test_rendered_env_uses_resized_frames() {
        let env = RegistryEnvBuilder::new()
            .rendered_env_problem("PongNoFrameskip-v4", 2, wrapper(None), (-1.0, 1.0))
            .unwrap();
        assert_eq!(env.kind(), EnvKind::Rendered);
        assert_eq!(env.observation_space().shape, vec![105, 80, 3]);
        assert_eq!(env.observation_space().dtype, ObsDtype::U8);
        assert_eq!(env.family(), EnvFamily::Image);
        assert!(env.wrapper().is_some());
    }

    #[test]
    fn test_rendered_env_casts_dtype_for_accelerators() {
        let env = RegistryEnvBuilder::new()
            .rendered_env_problem(
                "PongNoFrameskip-v4",
                2,
                wrapper(Some(OutputDtype::Int32)),
                (-1.0, 1.0),
            )
            .unwrap();
        assert_eq!(env.observation_space().dtype, ObsDtype::I32);
    }
}
