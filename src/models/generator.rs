use std::{cell::RefCell, rc::Rc};

use machine_learning::{
    Network,
    arch::{Mode, Model, ParamLayout, Sequential, activations::ActFn, layers::Layer},
    initialization::normal_weights_zero_biases,
    optimization::Adam,
};
use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{Generator, Trainable};
use crate::{Result, config::TrainerConfig};

/// A fully connected generator.
///
/// `latent -> 4c -> 8c -> 3·H·W` with ReLU and dropout on the hidden layers and a tanh output,
/// `c` being the configured complexity.
#[derive(Debug, Clone)]
pub struct DenseGenerator {
    net: Network<Sequential, Adam>,
    latent_dim: usize,
    image_dim: usize,
}

impl DenseGenerator {
    /// Creates a new `DenseGenerator` with normally distributed weights and zero biases.
    ///
    /// # Arguments
    /// * `config` - The run's hyper-parameters.
    /// * `rng` - The generator used for the initial weights and the dropout seeds.
    ///
    /// # Returns
    /// A new `DenseGenerator` or an error if the configuration can't build one.
    pub fn new<R: Rng + 'static>(config: &TrainerConfig, rng: Rc<RefCell<R>>) -> Result<Self> {
        let latent_dim = config.latent_input.get();
        let image_dim = config.image_len();
        let c = config.complexity.get();
        let p = config.dropout_prob;

        let (seed1, seed2) = {
            let mut rng = rng.borrow_mut();
            (rng.random(), rng.random())
        };

        let model = Sequential::new([
            Layer::dense((latent_dim, 4 * c), Some(ActFn::relu())),
            Layer::dropout(4 * c, p, seed1)?,
            Layer::dense((4 * c, 8 * c), Some(ActFn::relu())),
            Layer::dropout(8 * c, p, seed2)?,
            Layer::dense((8 * c, image_dim), Some(ActFn::tanh())),
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
            latent_dim,
            image_dim,
        })
    }
}

impl Trainable for DenseGenerator {
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

impl Generator for DenseGenerator {
    fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    fn image_dim(&self) -> usize {
        self.image_dim
    }

    fn forward(&mut self, z: ArrayView2<f32>, mode: Mode) -> Result<Array2<f32>> {
        Ok(self.net.forward(z, mode)?)
    }

    fn backward(&mut self, d: Array2<f32>) -> Result<()> {
        self.net.backward(d)?;
        Ok(())
    }
}
