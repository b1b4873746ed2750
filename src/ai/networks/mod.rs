mod atari_cnn;
mod body;
mod policy_and_value_net;
mod policy_net;
mod value_net;

pub use atari_cnn::{AtariCnn, AtariCnnConfig, CNN_CHANNELS, CNN_OUTPUT};
pub use body::{body_layers, BodyStack, LayerSpec, HIDDEN_UNITS, PIXEL_SCALE};
pub use policy_and_value_net::{PolicyAndValueNet, PolicyAndValueNetConfig};
pub use policy_net::{PolicyNet, PolicyNetConfig};
pub use value_net::{ValueNet, ValueNetConfig};
