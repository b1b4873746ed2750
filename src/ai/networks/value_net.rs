use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;

use crate::ai::networks::body::{BodyStack, LayerSpec};
use crate::env::ObservationSpace;

/// Value-only network: body stack, then a single linear unit.
#[derive(Module, Debug)]
pub struct ValueNet<B: Backend> {
    body: BodyStack<B>,
    head: Linear<B>,
}

#[derive(Config, Debug)]
pub struct ValueNetConfig {
    pub body: Vec<LayerSpec>,
}

impl ValueNetConfig {
    pub fn init<B: Backend>(&self, observation: &ObservationSpace, device: &B::Device) -> ValueNet<B> {
        let body = BodyStack::init(&self.body, observation, device);
        let head = LinearConfig::new(body.output_dim(), 1).init(device);
        ValueNet { body, head }
    }
}

impl<B: Backend> ValueNet<B> {
    /// Forward pass: observations [batch, numel] -> values [batch, 1].
    pub fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        self.head.forward(self.body.forward(obs))
    }
}
