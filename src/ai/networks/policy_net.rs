use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::log_softmax;

use crate::ai::networks::body::{BodyStack, LayerSpec};
use crate::env::ObservationSpace;

/// Policy-only network: body stack, then a linear head over actions with
/// log-softmax.
#[derive(Module, Debug)]
pub struct PolicyNet<B: Backend> {
    body: BodyStack<B>,
    head: Linear<B>,
}

#[derive(Config, Debug)]
pub struct PolicyNetConfig {
    pub body: Vec<LayerSpec>,
}

impl PolicyNetConfig {
    pub fn init<B: Backend>(
        &self,
        observation: &ObservationSpace,
        n_actions: usize,
        device: &B::Device,
    ) -> PolicyNet<B> {
        let body = BodyStack::init(&self.body, observation, device);
        let head = LinearConfig::new(body.output_dim(), n_actions).init(device);
        PolicyNet { body, head }
    }
}

impl<B: Backend> PolicyNet<B> {
    /// Forward pass: observations [batch, numel] -> log-probabilities [batch, n_actions].
    pub fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        log_softmax(self.head.forward(self.body.forward(obs)), 1)
    }
}
