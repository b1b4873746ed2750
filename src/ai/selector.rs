use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::networks::{LayerSpec, PolicyAndValueNetConfig, PolicyNetConfig, ValueNetConfig};
use crate::ai::optimizer::{bind_optimizer, OptimizerFactory};
use crate::config::LearningRates;

/// How policy and value estimation are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "topology", rename_all = "snake_case")]
pub enum NetworkTopology {
    /// One network with a policy and a value head.
    Combined { two_towers: bool },
    /// A policy network and a value network, each with its own optimizer.
    Separate,
}

/// Network and optimizer constructors for one run.
///
/// Exactly one of the two layouts is populated; the other simply does not
/// exist.
#[derive(Debug)]
pub enum NetworkBundle {
    Combined {
        policy_and_value: PolicyAndValueNetConfig,
        optimizer: OptimizerFactory,
    },
    Separate {
        policy: PolicyNetConfig,
        value: ValueNetConfig,
        policy_optimizer: OptimizerFactory,
        value_optimizer: OptimizerFactory,
    },
}

impl NetworkBundle {
    pub fn is_combined(&self) -> bool {
        matches!(self, NetworkBundle::Combined { .. })
    }

    pub fn policy_and_value(&self) -> Option<&PolicyAndValueNetConfig> {
        match self {
            NetworkBundle::Combined {
                policy_and_value, ..
            } => Some(policy_and_value),
            NetworkBundle::Separate { .. } => None,
        }
    }

    pub fn policy_and_value_optimizer(&self) -> Option<OptimizerFactory> {
        match self {
            NetworkBundle::Combined { optimizer, .. } => Some(*optimizer),
            NetworkBundle::Separate { .. } => None,
        }
    }

    pub fn policy(&self) -> Option<&PolicyNetConfig> {
        match self {
            NetworkBundle::Separate { policy, .. } => Some(policy),
            NetworkBundle::Combined { .. } => None,
        }
    }

    pub fn value(&self) -> Option<&ValueNetConfig> {
        match self {
            NetworkBundle::Separate { value, .. } => Some(value),
            NetworkBundle::Combined { .. } => None,
        }
    }

    pub fn policy_optimizer(&self) -> Option<OptimizerFactory> {
        match self {
            NetworkBundle::Separate {
                policy_optimizer, ..
            } => Some(*policy_optimizer),
            NetworkBundle::Combined { .. } => None,
        }
    }

    pub fn value_optimizer(&self) -> Option<OptimizerFactory> {
        match self {
            NetworkBundle::Separate {
                value_optimizer, ..
            } => Some(*value_optimizer),
            NetworkBundle::Combined { .. } => None,
        }
    }
}

/// Build the network constructors and bound optimizers for `topology`.
///
/// `body` is called once per network so each one gets its own layer list.
pub fn select_networks(
    topology: NetworkTopology,
    body: &dyn Fn() -> Vec<LayerSpec>,
    rates: &LearningRates,
) -> NetworkBundle {
    match topology {
        NetworkTopology::Combined { two_towers } => {
            debug!(two_towers, lr = rates.combined, "combined policy and value network");
            NetworkBundle::Combined {
                policy_and_value: PolicyAndValueNetConfig::new(body()).with_two_towers(two_towers),
                optimizer: bind_optimizer(rates.combined),
            }
        }
        NetworkTopology::Separate => {
            debug!(
                policy_lr = rates.policy_only,
                value_lr = rates.value_only,
                "separate policy and value networks"
            );
            NetworkBundle::Separate {
                policy: PolicyNetConfig::new(body()),
                value: ValueNetConfig::new(body()),
                policy_optimizer: bind_optimizer(rates.policy_only),
                value_optimizer: bind_optimizer(rates.value_only),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::networks::body_layers;
    use crate::env::EnvFamily;
    use std::cell::Cell;

    fn rates() -> LearningRates {
        LearningRates {
            combined: 1e-3,
            policy_only: 3e-4,
            value_only: 2e-3,
        }
    }

    fn vector_body() -> Vec<LayerSpec> {
        body_layers(EnvFamily::Vector, false)
    }

    #[test]
    fn test_combined_topology() {
        let bundle = select_networks(
            NetworkTopology::Combined { two_towers: false },
            &vector_body,
            &rates(),
        );

        assert!(bundle.is_combined());
        let config = bundle.policy_and_value().unwrap();
        assert!(!config.two_towers);
        assert_eq!(config.body, vector_body());
        assert_eq!(bundle.policy_and_value_optimizer().unwrap().step_size(), 1e-3);

        assert!(bundle.policy().is_none());
        assert!(bundle.value().is_none());
        assert!(bundle.policy_optimizer().is_none());
        assert!(bundle.value_optimizer().is_none());
    }

    #[test]
    fn test_separate_topology() {
        let bundle = select_networks(NetworkTopology::Separate, &vector_body, &rates());

        assert!(!bundle.is_combined());
        assert!(bundle.policy_and_value().is_none());
        assert!(bundle.policy_and_value_optimizer().is_none());

        assert_eq!(bundle.policy().unwrap().body, vector_body());
        assert_eq!(bundle.value().unwrap().body, vector_body());
        assert_eq!(bundle.policy_optimizer().unwrap().step_size(), 3e-4);
        assert_eq!(bundle.value_optimizer().unwrap().step_size(), 2e-3);
    }

    #[test]
    fn test_body_built_once_per_network() {
        let calls = Cell::new(0);
        let counting_body = || {
            calls.set(calls.get() + 1);
            vector_body()
        };

        select_networks(NetworkTopology::Separate, &counting_body, &rates());
        assert_eq!(calls.get(), 2);

        calls.set(0);
        select_networks(
            NetworkTopology::Combined { two_towers: true },
            &counting_body,
            &rates(),
        );
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_topology_serde_tag() {
        let json = serde_json::to_string(&NetworkTopology::Combined { two_towers: true }).unwrap();
        assert_eq!(json, r#"{"topology":"combined","two_towers":true}"#);
        let json = serde_json::to_string(&NetworkTopology::Separate).unwrap();
        assert_eq!(json, r#"{"topology":"separate"}"#);
    }
}
