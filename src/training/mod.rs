//! Run assembly and dispatch: option resolution, the scoped execution mode,
//! the trainer contract and the built-in dry-run trainer.

pub mod execution;
pub mod manifest;
pub mod resolver;
pub mod trainer;

pub use execution::{with_mode, ExecutionMode, ExecutionModeGuard};
pub use manifest::{EnvSummary, NetworkSummary, RunManifest, MANIFEST_FILE};
pub use resolver::{resolve, resolve_family, ResolvedRun};
pub use trainer::{dispatch, DryRunBackend, DryRunTrainer, TrainingLoop, TrainingReport, TrainingRun};
