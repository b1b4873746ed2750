//! # PPO Driver
//!
//! Turns a flat set of experiment options into a PPO training run: two
//! environment handles, network constructors with bound optimizers, PPO
//! hyperparameters and a scoped execution mode, then hands the run to a
//! training loop.
//!
//! ## Modules
//!
//! - [`config`] — raw options, TOML loading, validation and seed parsing
//! - [`env`] — environment handles, the builder contract and the catalogue
//! - [`ai`] — network bodies, policy/value networks, optimizer binding
//! - [`training`] — resolution, execution mode, trainer contract, dry run
//! - [`logging`] — `tracing` subscriber setup
//! - [`error`] — structured error types

pub mod ai;
pub mod config;
pub mod env;
pub mod error;
pub mod logging;
pub mod training;
