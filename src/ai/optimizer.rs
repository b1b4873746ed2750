use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

/// A learning rate bound to the Adam constructor.
///
/// Binding allocates nothing; optimizer state only exists once the trainer
/// calls [`OptimizerFactory::init`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerFactory {
    step_size: f64,
}

/// Bind `learning_rate` as the step size of every optimizer the returned
/// factory creates.
pub fn bind_optimizer(learning_rate: f64) -> OptimizerFactory {
    OptimizerFactory {
        step_size: learning_rate,
    }
}

impl OptimizerFactory {
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Adam settings shared by every bound optimizer.
    pub fn adam_config() -> AdamConfig {
        AdamConfig::new()
            .with_beta_1(0.9)
            .with_beta_2(0.999)
            .with_epsilon(1e-8)
    }

    /// Create a fresh optimizer for module type `M`.
    pub fn init<B, M>(&self) -> BoundOptimizer<M, B>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
    {
        BoundOptimizer {
            inner: Self::adam_config().init(),
            step_size: self.step_size,
        }
    }
}

/// An Adam optimizer that always steps with its bound learning rate.
pub struct BoundOptimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    inner: OptimizerAdaptor<Adam, M, B>,
    step_size: f64,
}

impl<M, B> BoundOptimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Apply one update to `module` from `grads`.
    pub fn step(&mut self, module: M, grads: GradientsParams) -> M {
        self.inner.step(self.step_size, module, grads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::nn::{Linear, LinearConfig};
    use burn::prelude::*;

    type TestBackend = Autodiff<NdArray<f32>>;

    #[test]
    fn test_binding_keeps_learning_rate() {
        let factory = bind_optimizer(3e-4);
        assert_eq!(factory.step_size(), 3e-4);
    }

    #[test]
    fn test_bindings_are_independent() {
        let policy = bind_optimizer(3e-4);
        let value = bind_optimizer(1e-3);
        assert_ne!(policy, value);
        assert_eq!(policy.step_size(), 3e-4);
        assert_eq!(value.step_size(), 1e-3);
    }

    #[test]
    fn test_bound_optimizer_updates_parameters() {
        let device = Default::default();
        let module: Linear<TestBackend> = LinearConfig::new(2, 1).init(&device);
        let before: Vec<f32> = module.weight.val().into_data().to_vec().unwrap();

        let loss = module
            .forward(Tensor::<TestBackend, 2>::ones([4, 2], &device))
            .sum();
        let grads = GradientsParams::from_grads(loss.backward(), &module);

        let mut optimizer = bind_optimizer(0.1).init::<TestBackend, Linear<TestBackend>>();
        assert_eq!(optimizer.step_size(), 0.1);
        let module = optimizer.step(module, grads);

        let after: Vec<f32> = module.weight.val().into_data().to_vec().unwrap();
        assert_ne!(before, after);
    }
}
