use tracing::{debug, info};

use crate::ai::networks::body_layers;
use crate::ai::selector::{select_networks, NetworkBundle};
use crate::config::{parse_seed, RawOptions, RunOptions};
use crate::env::{
    classify, lookup, make_env, EnvBuilder, EnvFamily, EnvHandle, EnvSource, RenderOptions,
};
use crate::error::{ConfigError, EnvError, ResolveError};
use crate::training::execution::ExecutionMode;
use crate::training::trainer::TrainingRun;

/// Everything a training loop needs, assembled from one set of options.
#[derive(Debug)]
pub struct ResolvedRun {
    pub options: RunOptions,
    pub execution_mode: ExecutionMode,
    pub env: EnvHandle,
    pub eval_env: EnvHandle,
    pub networks: NetworkBundle,
}

impl ResolvedRun {
    /// Split into the trainer descriptor and the mode it must run under.
    pub fn into_training_run(self) -> (TrainingRun, ExecutionMode) {
        let ResolvedRun {
            options,
            execution_mode,
            env,
            eval_env,
            networks,
        } = self;

        let run = TrainingRun {
            env,
            eval_env,
            epochs: options.epochs,
            networks,
            optimizer_steps: options.optimizer_steps,
            batch_size: options.batch_size,
            ppo: options.ppo,
            boundary: options.boundary,
            truncation_timestep: options.truncation_timestep,
            random_seed: options.random_seed,
            enable_early_stopping: options.enable_early_stopping,
            output_dir: options.output_dir,
            eval_every_n: options.eval_every_n,
            env_family: options.env_family,
        };
        (run, execution_mode)
    }
}

/// Decide the environment family once: an explicit choice wins, then the
/// catalogue (including game-name tokens), then vector observations.
pub fn resolve_family(explicit: Option<EnvFamily>, env_name: &str) -> EnvFamily {
    explicit.or_else(|| classify(env_name)).unwrap_or_else(|| {
        debug!(env = env_name, "family not catalogued, assuming vector observations");
        EnvFamily::Vector
    })
}

/// Reject image networks on observations known not to be frames.
///
/// Rendered environments always emit frames. Otherwise the catalogue is
/// consulted; names it does not know are checked once built.
fn check_frames_before_build(
    family: EnvFamily,
    source: &EnvSource,
    render: Option<&RenderOptions>,
) -> Result<(), ConfigError> {
    if !family.is_image_based() || render.is_some() {
        return Ok(());
    }
    match lookup(source.name()) {
        Some(spec) if spec.observation_shape.len() != 3 => Err(ConfigError::Validation(format!(
            "image networks need [height, width, channels] observations, {} has {:?}",
            source.name(),
            spec.observation_shape
        ))),
        _ => Ok(()),
    }
}

/// Turn raw options into a ready-to-dispatch run.
///
/// Nothing is built when no environment is named. Both environments share
/// the render settings and differ only in batch size.
pub fn resolve<E: EnvBuilder + ?Sized>(
    raw: &RawOptions,
    builder: &E,
) -> Result<ResolvedRun, ResolveError> {
    let execution_mode = ExecutionMode::from_flags(raw.debug_nans, raw.disable_jit);

    let env_source = raw.env_source()?;
    raw.validate()?;
    let render = raw.render_options()?;
    let env_family = resolve_family(raw.env_family, env_source.name());
    check_frames_before_build(env_family, &env_source, render.as_ref())?;

    let env = make_env(builder, &env_source, raw.batch_size, render.as_ref())?;
    let eval_env = make_env(builder, &env_source, raw.eval_batch_size, render.as_ref())?;

    if env_family.is_image_based() && env.observation_space().shape.len() != 3 {
        return Err(EnvError::NotFrameObservations {
            name: env.name().to_string(),
            shape: env.observation_space().shape.clone(),
        }
        .into());
    }

    let flatten_dims = raw.flatten_dims;
    let body = move || body_layers(env_family, flatten_dims);
    let topology = raw.topology();
    let learning_rates = raw.learning_rates();
    let networks = select_networks(topology, &body, &learning_rates);

    let random_seed = match parse_seed(raw.random_seed.as_deref()) {
        Ok(seed) => Some(seed),
        Err(e) => {
            debug!(error = %e, "running without a fixed seed");
            None
        }
    };

    let options = RunOptions {
        env_source,
        env_family,
        epochs: raw.epochs,
        batch_size: raw.batch_size,
        eval_batch_size: raw.eval_batch_size,
        topology,
        flatten_dims,
        learning_rates,
        ppo: raw.ppo_coefficients(),
        optimizer_steps: raw.optimizer_steps(),
        boundary: raw.boundary,
        truncation_timestep: raw.truncation_timestep,
        random_seed,
        render,
        output_dir: raw.output_dir.clone(),
        enable_early_stopping: raw.enable_early_stopping,
        eval_every_n: raw.eval_every_n,
    };

    info!(
        env = options.env_source.name(),
        family = ?options.env_family,
        topology = ?options.topology,
        batch_size = options.batch_size,
        eval_batch_size = options.eval_batch_size,
        seed = ?options.random_seed,
        "run resolved"
    );

    Ok(ResolvedRun {
        options,
        execution_mode,
        env,
        eval_env,
        networks,
    })
}
