use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::log_softmax;

use crate::ai::networks::body::{BodyStack, LayerSpec};
use crate::env::ObservationSpace;

/// Combined policy and value network.
///
/// ```text
/// one tower:   obs -> body -+-> policy head -> log-softmax
///                           +-> value head
///
/// two towers:  obs -> body       -> policy head -> log-softmax
///              obs -> value body -> value head
/// ```
#[derive(Module, Debug)]
pub struct PolicyAndValueNet<B: Backend> {
    body: BodyStack<B>,
    value_body: Option<BodyStack<B>>,
    policy_head: Linear<B>,
    value_head: Linear<B>,
}

#[derive(Config, Debug)]
pub struct PolicyAndValueNetConfig {
    pub body: Vec<LayerSpec>,
    /// Give the value path its own copy of the body instead of sharing it.
    #[config(default = true)]
    pub two_towers: bool,
}

impl PolicyAndValueNetConfig {
    pub fn init<B: Backend>(
        &self,
        observation: &ObservationSpace,
        n_actions: usize,
        device: &B::Device,
    ) -> PolicyAndValueNet<B> {
        let body = BodyStack::init(&self.body, observation, device);
        let value_body = self
            .two_towers
            .then(|| BodyStack::init(&self.body, observation, device));

        let value_features = value_body
            .as_ref()
            .map_or(body.output_dim(), BodyStack::output_dim);

        PolicyAndValueNet {
            policy_head: LinearConfig::new(body.output_dim(), n_actions).init(device),
            value_head: LinearConfig::new(value_features, 1).init(device),
            body,
            value_body,
        }
    }
}

impl<B: Backend> PolicyAndValueNet<B> {
    /// Forward pass: observations [batch, numel] ->
    /// (log-probabilities [batch, n_actions], values [batch, 1]).
    pub fn forward(&self, obs: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let (policy_features, value_features) = match &self.value_body {
            Some(value_body) => (self.body.forward(obs.clone()), value_body.forward(obs)),
            None => {
                let features = self.body.forward(obs);
                (features.clone(), features)
            }
        };

        let log_probs = log_softmax(self.policy_head.forward(policy_features), 1);
        let values = self.value_head.forward(value_features);
        (log_probs, values)
    }

    pub fn has_two_towers(&self) -> bool {
        self.value_body.is_some()
    }
}
