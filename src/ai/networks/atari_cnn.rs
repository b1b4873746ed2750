use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::prelude::*;

/// Channels of both convolution layers.
pub const CNN_CHANNELS: usize = 32;
/// Width of the feature vector the CNN emits.
pub const CNN_OUTPUT: usize = 256;

/// Spatial size after a 5x5 stride-2 convolution with same padding.
fn downsampled(size: usize) -> usize {
    size.div_ceil(2)
}

/// Convolutional feature extractor for frame observations.
///
/// ```text
/// Input:  [batch, H*W*C] (flattened HWC frames)
/// Reshape/permute     =>  [batch, C, H, W]
/// Conv1:  C -> 32 channels, 5x5, stride 2, same padding, ReLU
/// Conv2:  32 -> 32 channels, 5x5, stride 2, same padding, ReLU
/// Flatten
/// FC:     -> 256, ReLU
/// ```
#[derive(Module, Debug)]
pub struct AtariCnn<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    fc: Linear<B>,
    relu: Relu,
    height: usize,
    width: usize,
    channels: usize,
}

#[derive(Config, Debug)]
pub struct AtariCnnConfig {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl AtariCnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> AtariCnn<B> {
        let out_height = downsampled(downsampled(self.height));
        let out_width = downsampled(downsampled(self.width));

        AtariCnn {
            conv1: Conv2dConfig::new([self.channels, CNN_CHANNELS], [5, 5])
                .with_stride([2, 2])
                .with_padding(PaddingConfig2d::Explicit(2, 2))
                .init(device),
            conv2: Conv2dConfig::new([CNN_CHANNELS, CNN_CHANNELS], [5, 5])
                .with_stride([2, 2])
                .with_padding(PaddingConfig2d::Explicit(2, 2))
                .init(device),
            fc: LinearConfig::new(CNN_CHANNELS * out_height * out_width, CNN_OUTPUT).init(device),
            relu: Relu::new(),
            height: self.height,
            width: self.width,
            channels: self.channels,
        }
    }
}

impl<B: Backend> AtariCnn<B> {
    /// Forward pass: flattened frames [batch, H*W*C] -> features [batch, 256].
    pub fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch_size, _] = obs.dims();

        let x = obs
            .reshape([batch_size, self.height, self.width, self.channels])
            .permute([0, 3, 1, 2]);
        let x = self.relu.forward(self.conv1.forward(x));
        let x = self.relu.forward(self.conv2.forward(x));
        let x: Tensor<B, 2> = x.flatten(1, 3);
        self.relu.forward(self.fc.forward(x))
    }
}
