use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use ppo_driver::config::RawOptions;
use ppo_driver::env::{EnvFamily, RegistryEnvBuilder};
use ppo_driver::logging::init_tracing;
use ppo_driver::training::{dispatch, resolve, DryRunTrainer};

/// Resolve PPO experiment options and dispatch a training run.
///
/// Options come from the TOML file given by `--config`; every flag below
/// overrides the matching key.
#[derive(Parser)]
#[command(name = "train", about = "Resolve and dispatch a PPO training run")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Print a config file with every default value and exit
    #[arg(long)]
    print_default_config: bool,

    /// Gym id of a single environment
    #[arg(long)]
    env_name: Option<String>,

    /// Name of a batched environment problem
    #[arg(long)]
    env_problem_name: Option<String>,

    /// Force the observation family instead of looking it up
    #[arg(long, value_enum)]
    env_family: Option<EnvFamily>,

    #[arg(long)]
    epochs: Option<usize>,

    /// Integer seed; anything unparsable runs unseeded
    #[arg(long)]
    random_seed: Option<String>,

    #[arg(long)]
    batch_size: Option<usize>,

    #[arg(long)]
    eval_batch_size: Option<usize>,

    /// Trajectory padding boundary
    #[arg(long)]
    boundary: Option<usize>,

    /// Episode step limit of rendered envs (-1 keeps the registered limit)
    #[arg(long, allow_hyphen_values = true)]
    max_timestep: Option<i64>,

    #[arg(long)]
    truncation_timestep: Option<usize>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    debug_nans: Option<bool>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    disable_jit: Option<bool>,

    /// Render frames and resize them before they reach the network
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    resize: Option<bool>,

    #[arg(long)]
    resized_height: Option<usize>,

    #[arg(long)]
    resized_width: Option<usize>,

    /// Emit fixed-width integer frames
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    use_accelerator: Option<bool>,

    /// Use one network with policy and value heads
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    combined_network: Option<bool>,

    /// Give the value head its own body in the combined network
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    two_towers: Option<bool>,

    /// Scale and flatten observations before the dense body
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    flatten_dims: Option<bool>,

    #[arg(long)]
    num_optimizer_steps: Option<usize>,

    #[arg(long)]
    policy_only_num_optimizer_steps: Option<usize>,

    #[arg(long)]
    value_only_num_optimizer_steps: Option<usize>,

    #[arg(long)]
    print_every_optimizer_steps: Option<usize>,

    #[arg(long)]
    learning_rate: Option<f64>,

    #[arg(long)]
    policy_only_learning_rate: Option<f64>,

    #[arg(long)]
    value_only_learning_rate: Option<f64>,

    #[arg(long)]
    target_kl: Option<f64>,

    #[arg(long)]
    value_coef: Option<f64>,

    #[arg(long)]
    entropy_coef: Option<f64>,

    #[arg(long)]
    gamma: Option<f64>,

    #[arg(long)]
    lambda: Option<f64>,

    #[arg(long)]
    epsilon: Option<f64>,

    /// Directory for the run manifest; empty disables it
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    enable_early_stopping: Option<bool>,

    #[arg(long)]
    eval_every_n: Option<usize>,
}

macro_rules! override_options {
    ($cli:expr, $options:expr, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(value) = $cli.$field {
                $options.$field = value;
            }
        )*
    };
}

impl Cli {
    fn apply(self, options: &mut RawOptions) {
        // A naming scheme given here replaces the file's scheme entirely.
        match (self.env_name, self.env_problem_name) {
            (None, None) => {}
            (env_name, env_problem_name) => {
                options.env_name = env_name;
                options.env_problem_name = env_problem_name;
            }
        }
        if self.env_family.is_some() {
            options.env_family = self.env_family;
        }
        if self.random_seed.is_some() {
            options.random_seed = self.random_seed;
        }
        if self.max_timestep.is_some() {
            options.max_timestep = self.max_timestep;
        }
        if self.truncation_timestep.is_some() {
            options.truncation_timestep = self.truncation_timestep;
        }

        override_options!(
            self,
            options,
            [
                epochs,
                batch_size,
                eval_batch_size,
                boundary,
                debug_nans,
                disable_jit,
                resize,
                resized_height,
                resized_width,
                use_accelerator,
                combined_network,
                two_towers,
                flatten_dims,
                num_optimizer_steps,
                policy_only_num_optimizer_steps,
                value_only_num_optimizer_steps,
                print_every_optimizer_steps,
                learning_rate,
                policy_only_learning_rate,
                value_only_learning_rate,
                target_kl,
                value_coef,
                entropy_coef,
                gamma,
                lambda,
                epsilon,
                output_dir,
                enable_early_stopping,
                eval_every_n,
            ]
        );
    }
}

fn main() -> Result<()> {
    init_tracing("info");
    let cli = Cli::parse();

    if cli.print_default_config {
        print!("{}", RawOptions::default_toml());
        return Ok(());
    }

    let mut options = RawOptions::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    cli.apply(&mut options);

    let resolved = resolve(&options, &RegistryEnvBuilder::new()).context("resolving run options")?;
    let report = dispatch(&mut DryRunTrainer::new(), resolved).context("training run failed")?;

    for network in &report.networks {
        info!(
            network = %network.name,
            parameters = network.parameters,
            "trained"
        );
    }
    if let Some(path) = &report.manifest_path {
        info!(path = %path.display(), seed = report.seed, "run complete");
    } else {
        info!(seed = report.seed, "run complete");
    }
    Ok(())
}
