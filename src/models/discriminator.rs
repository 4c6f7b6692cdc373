use std::{cell::RefCell, num::NonZeroUsize, rc::Rc};

use machine_learning::{
    Network,
    arch::{Mode, Model, ParamLayout, Sequential, activations::ActFn, layers::Layer},
    initialization::normal_weights_zero_biases,
    optimization::Adam,
};
use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{Discriminator, Trainable};
use crate::{Result, config::TrainerConfig};

const LEAK: f32 = 0.2;

/// A fully connected discriminator over packed images.
///
/// `P·3·H·W -> 8c -> 4c -> 1` with leaky ReLU hidden layers and a sigmoid output.
#[derive(Debug, Clone)]
pub struct DenseDiscriminator {
    net: Network<Sequential, Adam>,
    packing: NonZeroUsize,
    image_dim: usize,
}

impl DenseDiscriminator {
    /// Creates a new `DenseDiscriminator` with normally distributed weights and zero biases.
    pub fn new<R: Rng + 'static>(config: &TrainerConfig, rng: Rc<RefCell<R>>) -> Result<Self> {
        let packing = config.packing;
        let image_dim = config.image_len();
        let c = config.complexity.get();

        let model = Sequential::new([
            Layer::dense((packing.get() * image_dim, 8 * c), Some(ActFn::leaky_relu(LEAK))),
            Layer::dense((8 * c, 4 * c), Some(ActFn::leaky_relu(LEAK))),
            Layer::dense((4 * c, 1), Some(ActFn::sigmoid(1.))),
        ]);

        let params = normal_weights_zero_biases(
            &model.layout(),
            rng,
            config.weights_mean,
            config.weights_std,
        )?;
        let optimizer = Adam::new(
            params.len(),
            config.learning_rate,
            config.beta1,
            config.beta2,
            config.epsilon,
        );

        Ok(Self {
            net: Network::new(model, params, optimizer)?,
            packing,
            image_dim,
        })
    }
}

impl Trainable for DenseDiscriminator {
    fn zero_grad(&mut self) {
        self.net.zero_grad();
    }

    fn apply_gradient_step(&mut self) -> Result<()> {
        Ok(self.net.apply_gradient_step()?)
    }

    fn parameters(&self) -> &[f32] {
        self.net.parameters()
    }

    fn layout(&self) -> ParamLayout {
        self.net.layout()
    }

    fn load_parameters(&mut self, params: &[f32]) -> Result<()> {
        Ok(self.net.load_parameters(params)?)
    }
}

impl Discriminator for DenseDiscriminator {
    fn packing(&self) -> NonZeroUsize {
        self.packing
    }

    fn image_dim(&self) -> usize {
        self.image_dim
    }

    fn forward(&mut self, x: ArrayView2<f32>, mode: Mode) -> Result<Array2<f32>> {
        Ok(self.net.forward(x, mode)?)
    }

    fn backward(&mut self, d: Array2<f32>) -> Result<Array2<f32>> {
        Ok(self.net.backward(d)?)
    }
}
