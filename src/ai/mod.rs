//! Network constructors, optimizer binding and topology selection.

pub mod networks;
pub mod optimizer;
pub mod selector;

pub use networks::{
    body_layers, LayerSpec, PolicyAndValueNet, PolicyAndValueNetConfig, PolicyNet,
    PolicyNetConfig, ValueNet, ValueNetConfig,
};
pub use optimizer::{bind_optimizer, BoundOptimizer, OptimizerFactory};
pub use selector::{select_networks, NetworkBundle, NetworkTopology};
