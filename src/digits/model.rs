use burn::module::Ignored;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d};
use burn::prelude::*;
use burn::tensor::activation::{leaky_relu, relu};
use tracing::warn;

const LEAKY_SLOPE: f64 = 0.01;
/// 15 channels over a 3x3 map after three 2x2 poolings of a 28x28 input.
const FLATTENED: usize = 135;
const HIDDEN: usize = 75;
pub const NUM_CLASSES: usize = 10;

/// Nonlinearity shared by every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationKind {
    Relu,
    LeakyRelu,
}

impl ActivationKind {
    /// Map `ReLU`/`LeakyReLU`; anything else falls back to ReLU with a warning.
    pub fn from_name(name: &str) -> Self {
        match name {
            "ReLU" => Self::Relu,
            "LeakyReLU" => Self::LeakyRelu,
            other => {
                warn!("No activation named {other}. Using default ReLU function.");
                Self::Relu
            }
        }
    }

    fn apply<B: Backend, const D: usize>(self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Self::Relu => relu(x),
            Self::LeakyRelu => leaky_relu(x, LEAKY_SLOPE),
        }
    }
}

#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    norm: BatchNorm<B>,
    pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    fn new(channels: [usize; 2], device: &B::Device) -> Self {
        Self {
            conv: Conv2dConfig::new(channels, [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            norm: BatchNormConfig::new(channels[1]).init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }

    fn forward(&self, x: Tensor<B, 4>, activation: ActivationKind) -> Tensor<B, 4> {
        let x = self.norm.forward(self.conv.forward(x));
        self.pool.forward(activation.apply(x))
    }
}

/// Three conv blocks followed by a two-layer head.
#[derive(Module, Debug)]
pub struct DigitClassifier<B: Backend> {
    blocks: Vec<ConvBlock<B>>,
    hidden: Linear<B>,
    hidden_norm: BatchNorm<B>,
    output: Linear<B>,
    activation: Ignored<ActivationKind>,
}

#[derive(Debug, Clone, Copy)]
pub struct DigitClassifierConfig {
    pub activation: ActivationKind,
}

impl DigitClassifierConfig {
    pub fn new(activation: ActivationKind) -> Self {
        Self { activation }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> DigitClassifier<B> {
        DigitClassifier {
            blocks: vec![
                ConvBlock::new([1, 30], device),
                ConvBlock::new([30, 30], device),
                ConvBlock::new([30, 15], device),
            ],
            hidden: LinearConfig::new(FLATTENED, HIDDEN).init(device),
            hidden_norm: BatchNormConfig::new(HIDDEN).init(device),
            output: LinearConfig::new(HIDDEN, NUM_CLASSES).init(device),
            activation: Ignored(self.activation),
        }
    }
}

impl<B: Backend> DigitClassifier<B> {
    /// `[batch, 1, 28, 28]` images to `[batch, 10]` logits.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let activation = self.activation.0;
        let mut x = images;
        for block in &self.blocks {
            x = block.forward(x, activation);
        }
        let x = self.hidden.forward(x.flatten::<2>(1, 3));
        // BatchNorm expects a trailing spatial axis.
        let x = self.hidden_norm.forward(x.unsqueeze_dim::<3>(2));
        let x = activation.apply(x).flatten::<2>(1, 2);
        self.output.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn unknown_activation_falls_back_to_relu() {
        assert_eq!(ActivationKind::from_name("LeakyReLU"), ActivationKind::LeakyRelu);
        assert_eq!(ActivationKind::from_name("ReLU"), ActivationKind::Relu);
        assert_eq!(ActivationKind::from_name("GELU"), ActivationKind::Relu);
    }

    #[test]
    fn produces_ten_logits_per_image() {
        let device = Default::default();
        let model: DigitClassifier<NdArray> =
            DigitClassifierConfig::new(ActivationKind::LeakyRelu).init(&device);
        let images = Tensor::<NdArray, 4>::zeros([3, 1, 28, 28], &device);
        let logits = model.forward(images);
        assert_eq!(logits.dims(), [3, NUM_CLASSES]);
    }
}
