use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::tanh;
use serde::{Deserialize, Serialize};

use crate::ai::networks::atari_cnn::{AtariCnn, AtariCnnConfig, CNN_OUTPUT};
use crate::env::{EnvFamily, ObservationSpace};

/// Width of each dense layer in the vector body.
pub const HIDDEN_UNITS: usize = 64;

/// Pixel scale removed by the optional preprocessing step.
pub const PIXEL_SCALE: f32 = 255.0;

/// One entry of a body stack description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum LayerSpec {
    /// Divide every input by `divisor`.
    Div { divisor: f32 },
    /// Collapse all non-batch axes.
    Flatten,
    Dense { units: usize },
    Tanh,
    /// The fixed convolutional stack for frame observations.
    AtariCnn,
}

/// Layers shared by every network of a run.
///
/// Image-based environments get the CNN. Vector-based ones get an optional
/// rescale/flatten step followed by two 64-unit tanh layers.
pub fn body_layers(family: EnvFamily, flatten_dims: bool) -> Vec<LayerSpec> {
    if family.is_image_based() {
        return vec![LayerSpec::AtariCnn];
    }

    let mut layers = Vec::with_capacity(6);
    if flatten_dims {
        layers.push(LayerSpec::Div {
            divisor: PIXEL_SCALE,
        });
        layers.push(LayerSpec::Flatten);
    }
    layers.extend([
        LayerSpec::Dense {
            units: HIDDEN_UNITS,
        },
        LayerSpec::Tanh,
        LayerSpec::Dense {
            units: HIDDEN_UNITS,
        },
        LayerSpec::Tanh,
    ]);
    layers
}

#[derive(Module, Debug)]
pub struct DenseBlock<B: Backend> {
    linear: Linear<B>,
    tanh: bool,
}

/// A body stack realized on a backend.
///
/// Observations enter flattened per sample, `[batch, numel]`, so the
/// `Flatten` entry needs no work of its own here.
#[derive(Module, Debug)]
pub struct BodyStack<B: Backend> {
    divisor: f32,
    cnn: Option<AtariCnn<B>>,
    dense: Vec<DenseBlock<B>>,
    output_dim: usize,
}

impl<B: Backend> BodyStack<B> {
    /// Realize `layers` for observations shaped like `observation`.
    ///
    /// # Panics
    ///
    /// If the layer list is malformed (a `Tanh` with no preceding `Dense`, a
    /// CNN after dense layers) or the CNN is asked to consume observations
    /// that are not `[height, width, channels]` frames.
    pub fn init(layers: &[LayerSpec], observation: &ObservationSpace, device: &B::Device) -> Self {
        let mut divisor = 1.0f32;
        let mut cnn = None;
        let mut dense: Vec<DenseBlock<B>> = Vec::new();
        let mut width = observation.numel();

        for layer in layers {
            match layer {
                LayerSpec::Div { divisor: d } => divisor *= d,
                LayerSpec::Flatten => {}
                LayerSpec::Dense { units } => {
                    dense.push(DenseBlock {
                        linear: LinearConfig::new(width, *units).init(device),
                        tanh: false,
                    });
                    width = *units;
                }
                LayerSpec::Tanh => {
                    let block = dense.last_mut().expect("Tanh must follow a Dense layer");
                    block.tanh = true;
                }
                LayerSpec::AtariCnn => {
                    assert!(dense.is_empty(), "AtariCnn must precede dense layers");
                    let [height, width_px, channels] = observation.shape[..] else {
                        panic!(
                            "AtariCnn needs [height, width, channels] observations, got {:?}",
                            observation.shape
                        );
                    };
                    cnn = Some(AtariCnnConfig::new(height, width_px, channels).init(device));
                    width = CNN_OUTPUT;
                }
            }
        }

        BodyStack {
            divisor,
            cnn,
            dense,
            output_dim: width,
        }
    }

    /// Width of the features this stack emits.
    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    pub fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = obs.div_scalar(self.divisor);
        if let Some(cnn) = &self.cnn {
            x = cnn.forward(x);
        }
        for block in &self.dense {
            x = block.linear.forward(x);
            if block.tanh {
                x = tanh(x);
            }
        }
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::ObsDtype;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_vector_body_layers() {
        let layers = body_layers(EnvFamily::Vector, false);
        assert_eq!(
            layers,
            vec![
                LayerSpec::Dense { units: 64 },
                LayerSpec::Tanh,
                LayerSpec::Dense { units: 64 },
                LayerSpec::Tanh,
            ]
        );
    }

    #[test]
    fn test_flatten_dims_prepends_preprocessing() {
        let layers = body_layers(EnvFamily::Vector, true);
        assert_eq!(layers[0], LayerSpec::Div { divisor: 255.0 });
        assert_eq!(layers[1], LayerSpec::Flatten);
        assert_eq!(layers.len(), 6);
    }

    #[test]
    fn test_image_body_is_cnn_only() {
        assert_eq!(body_layers(EnvFamily::Image, true), vec![LayerSpec::AtariCnn]);
    }

    #[test]
    fn test_dense_body_output_shape() {
        let device = Default::default();
        let observation = ObservationSpace::new(vec![4], ObsDtype::F32);
        let body = BodyStack::<TestBackend>::init(
            &body_layers(EnvFamily::Vector, false),
            &observation,
            &device,
        );
        assert_eq!(body.output_dim(), HIDDEN_UNITS);

        let output = body.forward(Tensor::zeros([3, 4], &device));
        assert_eq!(output.shape().dims, [3, HIDDEN_UNITS]);
    }

    #[test]
    fn test_tanh_bounds_dense_output() {
        let device = Default::default();
        let observation = ObservationSpace::new(vec![2], ObsDtype::F32);
        let body = BodyStack::<TestBackend>::init(
            &body_layers(EnvFamily::Vector, false),
            &observation,
            &device,
        );
        let output = body.forward(Tensor::ones([1, 2], &device).mul_scalar(100.0));
        let values: Vec<f32> = output.into_data().to_vec().unwrap();
        assert!(values.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_cnn_body_output_shape() {
        let device = Default::default();
        let observation = ObservationSpace::new(vec![8, 8, 3], ObsDtype::U8);
        let body = BodyStack::<TestBackend>::init(&[LayerSpec::AtariCnn], &observation, &device);
        assert_eq!(body.output_dim(), CNN_OUTPUT);

        let output = body.forward(Tensor::zeros([2, 8 * 8 * 3], &device));
        assert_eq!(output.shape().dims, [2, CNN_OUTPUT]);
    }

    #[test]
    #[should_panic(expected = "AtariCnn needs")]
    fn test_cnn_rejects_vector_observations() {
        let device = Default::default();
        let observation = ObservationSpace::new(vec![4], ObsDtype::F32);
        let _ = BodyStack::<TestBackend>::init(&[LayerSpec::AtariCnn], &observation, &device);
    }

    #[test]
    fn test_layer_spec_serializes_tagged() {
        let json = serde_json::to_string(&LayerSpec::Dense { units: 64 }).unwrap();
        assert_eq!(json, r#"{"layer":"dense","units":64}"#);
    }
}
