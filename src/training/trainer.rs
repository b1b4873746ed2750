use std::path::PathBuf;

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::prelude::*;
use rand::Rng;
use tracing::{debug, info};

use crate::ai::selector::{NetworkBundle, NetworkTopology};
use crate::ai::{PolicyAndValueNet, PolicyNet, ValueNet};
use crate::config::{OptimizerSteps, PpoCoefficients};
use crate::env::{EnvFamily, EnvHandle};
use crate::error::TrainerError;
use crate::training::execution::{with_mode, ExecutionMode};
use crate::training::manifest::{EnvSummary, NetworkSummary, RunManifest};
use crate::training::resolver::ResolvedRun;

/// Everything handed to a training loop for one run.
#[derive(Debug)]
pub struct TrainingRun {
    pub env: EnvHandle,
    pub eval_env: EnvHandle,
    pub env_family: EnvFamily,
    pub epochs: usize,
    pub networks: NetworkBundle,
    pub optimizer_steps: OptimizerSteps,
    pub batch_size: usize,
    pub ppo: PpoCoefficients,
    /// Trajectories are padded to multiples of this.
    pub boundary: usize,
    pub truncation_timestep: Option<usize>,
    pub random_seed: Option<i64>,
    pub enable_early_stopping: bool,
    pub output_dir: PathBuf,
    pub eval_every_n: usize,
}

/// Outcome of a training loop.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub networks: Vec<NetworkSummary>,
    pub seed: u64,
    /// Set when a manifest was written.
    pub manifest_path: Option<PathBuf>,
}

/// A training algorithm that consumes a resolved run.
pub trait TrainingLoop {
    fn run(&mut self, run: TrainingRun) -> Result<TrainingReport, TrainerError>;
}

/// Hand a resolved run to `trainer` under the run's execution mode.
///
/// Trainer errors are passed through untouched.
pub fn dispatch<T: TrainingLoop + ?Sized>(
    trainer: &mut T,
    resolved: ResolvedRun,
) -> Result<TrainingReport, TrainerError> {
    let (run, mode) = resolved.into_training_run();
    debug!(?mode, epochs = run.epochs, "dispatching run");
    with_mode(mode.debug_nans, !mode.jit_enabled, || trainer.run(run))
}

pub type DryRunBackend = Autodiff<NdArray<f32>>;

/// Materializes every network and optimizer of a run without collecting
/// trajectories.
///
/// Useful to check that a configuration is consistent before handing it to
/// a real algorithm. Under `debug_nans` each network also gets one forward
/// pass on a zero observation.
#[derive(Debug, Default)]
pub struct DryRunTrainer {
    device: NdArrayDevice,
}

impl DryRunTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    fn zero_observation(&self, env: &EnvHandle) -> Tensor<DryRunBackend, 2> {
        Tensor::zeros([1, env.observation_space().numel()], &self.device)
    }

    fn materialize(
        &self,
        run: &TrainingRun,
        mode: ExecutionMode,
    ) -> Result<Vec<NetworkSummary>, TrainerError> {
        let observation = run.env.observation_space();
        let n_actions = run.env.n_actions();
        let steps = &run.optimizer_steps;

        match &run.networks {
            NetworkBundle::Combined {
                policy_and_value,
                optimizer,
            } => {
                let network =
                    policy_and_value.init::<DryRunBackend>(observation, n_actions, &self.device);
                let optimizer = optimizer.init::<DryRunBackend, PolicyAndValueNet<DryRunBackend>>();
                if mode.debug_nans {
                    let (log_probs, values) = network.forward(self.zero_observation(&run.env));
                    check_finite("policy_and_value", log_probs)?;
                    check_finite("policy_and_value", values)?;
                }
                Ok(vec![NetworkSummary {
                    name: "policy_and_value".to_string(),
                    parameters: network.num_params(),
                    learning_rate: optimizer.step_size(),
                    optimizer_steps: steps.combined,
                }])
            }
            NetworkBundle::Separate {
                policy,
                value,
                policy_optimizer,
                value_optimizer,
            } => {
                let policy_net = policy.init::<DryRunBackend>(observation, n_actions, &self.device);
                let value_net = value.init::<DryRunBackend>(observation, &self.device);
                let policy_optimizer =
                    policy_optimizer.init::<DryRunBackend, PolicyNet<DryRunBackend>>();
                let value_optimizer = value_optimizer.init::<DryRunBackend, ValueNet<DryRunBackend>>();
                if mode.debug_nans {
                    check_finite("policy", policy_net.forward(self.zero_observation(&run.env)))?;
                    check_finite("value", value_net.forward(self.zero_observation(&run.env)))?;
                }
                Ok(vec![
                    NetworkSummary {
                        name: "policy".to_string(),
                        parameters: policy_net.num_params(),
                        learning_rate: policy_optimizer.step_size(),
                        optimizer_steps: steps.policy_only,
                    },
                    NetworkSummary {
                        name: "value".to_string(),
                        parameters: value_net.num_params(),
                        learning_rate: value_optimizer.step_size(),
                        optimizer_steps: steps.value_only,
                    },
                ])
            }
        }
    }
}

impl TrainingLoop for DryRunTrainer {
    fn run(&mut self, run: TrainingRun) -> Result<TrainingReport, TrainerError> {
        let seed_from_options = run.random_seed.is_some();
        let seed = match run.random_seed {
            Some(seed) => backend_seed(seed),
            None => rand::rng().random(),
        };
        DryRunBackend::seed(seed);

        let mode = ExecutionMode::current();
        let networks = self.materialize(&run, mode)?;
        for network in &networks {
            info!(
                network = %network.name,
                parameters = network.parameters,
                lr = network.learning_rate,
                optimizer_steps = network.optimizer_steps,
                "network ready"
            );
        }

        let manifest_path = if run.output_dir.as_os_str().is_empty() {
            None
        } else {
            let manifest = RunManifest {
                env: EnvSummary::from(&run.env),
                eval_env: EnvSummary::from(&run.eval_env),
                env_family: run.env_family,
                topology: topology_of(&run.networks),
                networks: networks.clone(),
                seed,
                seed_from_options,
                execution_mode: mode,
                epochs: run.epochs,
                batch_size: run.batch_size,
                boundary: run.boundary,
                truncation_timestep: run.truncation_timestep,
                ppo: run.ppo,
                optimizer_steps: run.optimizer_steps,
                enable_early_stopping: run.enable_early_stopping,
                eval_every_n: run.eval_every_n,
            };
            let path = manifest.write_to(&run.output_dir)?;
            info!(path = %path.display(), "run manifest written");
            Some(path)
        };

        Ok(TrainingReport {
            networks,
            seed,
            manifest_path,
        })
    }
}

fn topology_of(networks: &NetworkBundle) -> NetworkTopology {
    match networks {
        NetworkBundle::Combined {
            policy_and_value, ..
        } => NetworkTopology::Combined {
            two_towers: policy_and_value.two_towers,
        },
        NetworkBundle::Separate { .. } => NetworkTopology::Separate,
    }
}

/// Reinterpret a configured seed's bits as the backend's unsigned seed, so
/// negative seeds stay distinct and reproducible.
fn backend_seed(seed: i64) -> u64 {
    u64::from_ne_bytes(seed.to_ne_bytes())
}

fn check_finite<B: Backend>(network: &str, output: Tensor<B, 2>) -> Result<(), TrainerError> {
    let data = output.into_data();
    if data.iter::<f32>().all(f32::is_finite) {
        Ok(())
    } else {
        Err(TrainerError::NonFinite {
            network: network.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawOptions;
    use crate::env::RegistryEnvBuilder;
    use crate::training::execution::TEST_LOCK;
    use crate::training::manifest::MANIFEST_FILE;
    use crate::training::resolver::resolve;

    fn cartpole() -> RawOptions {
        RawOptions {
            env_problem_name: Some("CartPole-v1".into()),
            batch_size: 4,
            eval_batch_size: 2,
            random_seed: Some("5".into()),
            ..RawOptions::default()
        }
    }

    /// Records the mode it ran under and the run it received.
    #[derive(Default)]
    struct RecordingTrainer {
        seen_mode: Option<ExecutionMode>,
        seen_epochs: Option<usize>,
        fail: bool,
    }

    impl TrainingLoop for RecordingTrainer {
        fn run(&mut self, run: TrainingRun) -> Result<TrainingReport, TrainerError> {
            self.seen_mode = Some(ExecutionMode::current());
            self.seen_epochs = Some(run.epochs);
            if self.fail {
                return Err(TrainerError::Other("diverged".into()));
            }
            Ok(TrainingReport {
                networks: Vec::new(),
                seed: 0,
                manifest_path: None,
            })
        }
    }

    #[test]
    fn test_dispatch_runs_under_debug_mode() {
        let _lock = TEST_LOCK.lock();
        let raw = RawOptions {
            debug_nans: true,
            ..cartpole()
        };
        let resolved = resolve(&raw, &RegistryEnvBuilder).unwrap();
        let mut trainer = RecordingTrainer::default();
        dispatch(&mut trainer, resolved).unwrap();

        assert_eq!(trainer.seen_mode, Some(ExecutionMode::from_flags(true, false)));
        assert_eq!(trainer.seen_epochs, Some(100));
        assert_eq!(ExecutionMode::current(), ExecutionMode::DEFAULT);
    }

    #[test]
    fn test_dispatch_passes_trainer_errors_through() {
        let _lock = TEST_LOCK.lock();
        let resolved = resolve(&cartpole(), &RegistryEnvBuilder).unwrap();
        let mut trainer = RecordingTrainer {
            fail: true,
            ..RecordingTrainer::default()
        };
        let err = dispatch(&mut trainer, resolved).unwrap_err();
        assert!(matches!(err, TrainerError::Other(msg) if msg == "diverged"));
        assert_eq!(trainer.seen_mode, Some(ExecutionMode::DEFAULT));
    }

    #[test]
    fn test_dry_run_separate_networks() {
        let _lock = TEST_LOCK.lock();
        let resolved = resolve(&cartpole(), &RegistryEnvBuilder).unwrap();
        let report = dispatch(&mut DryRunTrainer::new(), resolved).unwrap();

        assert_eq!(report.seed, 5);
        assert!(report.manifest_path.is_none());
        let names: Vec<&str> = report.networks.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["policy", "value"]);
        assert_eq!(report.networks[0].learning_rate, 3e-4);
        assert_eq!(report.networks[1].learning_rate, 1e-3);
        assert!(report.networks.iter().all(|n| n.parameters > 0));
    }

    #[test]
    fn test_dry_run_combined_with_nan_check() {
        let _lock = TEST_LOCK.lock();
        let raw = RawOptions {
            combined_network: true,
            debug_nans: true,
            ..cartpole()
        };
        let resolved = resolve(&raw, &RegistryEnvBuilder).unwrap();
        let report = dispatch(&mut DryRunTrainer::new(), resolved).unwrap();

        assert_eq!(report.networks.len(), 1);
        assert_eq!(report.networks[0].name, "policy_and_value");
        assert_eq!(report.networks[0].optimizer_steps, 100);
    }

    #[test]
    fn test_dry_run_writes_manifest() {
        let _lock = TEST_LOCK.lock();
        let dir = tempfile::tempdir().unwrap();
        let raw = RawOptions {
            output_dir: dir.path().join("run"),
            ..cartpole()
        };
        let resolved = resolve(&raw, &RegistryEnvBuilder).unwrap();
        let report = dispatch(&mut DryRunTrainer::new(), resolved).unwrap();

        let path = report.manifest_path.unwrap();
        assert_eq!(path, dir.path().join("run").join(MANIFEST_FILE));
        let manifest = RunManifest::read_from(&path).unwrap();
        assert_eq!(manifest.seed, 5);
        assert!(manifest.seed_from_options);
        assert_eq!(manifest.env.batch_size, 4);
        assert_eq!(manifest.eval_env.batch_size, 2);
        assert_eq!(manifest.env.reward_range, Some((-1.0, 1.0)));
        assert_eq!(manifest.networks, report.networks);
        assert_eq!(manifest.topology, NetworkTopology::Separate);
    }

    #[test]
    fn test_backend_seed_keeps_bits() {
        assert_eq!(backend_seed(5), 5);
        assert_eq!(backend_seed(0), 0);
        assert_eq!(backend_seed(-1), u64::MAX);
        assert_ne!(backend_seed(-2), backend_seed(2));
    }

    #[test]
    fn test_dry_run_negative_seed() {
        let _lock = TEST_LOCK.lock();
        let raw = RawOptions {
            random_seed: Some("-1".into()),
            ..cartpole()
        };
        let resolved = resolve(&raw, &RegistryEnvBuilder).unwrap();
        let report = dispatch(&mut DryRunTrainer::new(), resolved).unwrap();
        assert_eq!(report.seed, u64::MAX);
    }

    #[test]
    fn test_check_finite_flags_nan() {
        let device = Default::default();
        let ok = Tensor::<NdArray<f32>, 2>::zeros([1, 2], &device);
        assert!(check_finite("policy", ok).is_ok());

        let bad = Tensor::<NdArray<f32>, 2>::from_floats([[0.0, f32::NAN]], &device);
        assert!(matches!(
            check_finite("policy", bad),
            Err(TrainerError::NonFinite { network }) if network == "policy"
        ));
    }
}
