use std::num::NonZeroUsize;

use machine_learning::arch::{
    Mode, ParamLayout,
    loss::{Bce, LossFn},
};
use ndarray::{Array2, ArrayView2};

use crate::Result;

mod discriminator;
mod generator;

pub use discriminator::DenseDiscriminator;
pub use generator::DenseGenerator;

/// What both adversaries share: owned parameters, a gradient accumulator and an optimizer.
pub trait Trainable {
    /// Resets the gradient accumulator.
    fn zero_grad(&mut self);

    /// Updates the parameters with the accumulated gradient.
    fn apply_gradient_step(&mut self) -> Result<()>;

    fn parameters(&self) -> &[f32];

    /// The named blocks `parameters()` is made of.
    fn layout(&self) -> ParamLayout;

    /// Replaces the parameters with `params`, laid out as `layout()`.
    fn load_parameters(&mut self, params: &[f32]) -> Result<()>;

    /// The adversarial loss of a prediction.
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        Bce.loss(y_pred, y)
    }

    /// Derivative of `loss` with respect to `y_pred`.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        Bce.loss_prime(y_pred, y)
    }
}

/// Maps latent vectors to flattened images in `[-1, 1]`.
pub trait Generator: Trainable {
    fn latent_dim(&self) -> usize;

    fn image_dim(&self) -> usize;

    /// Generates one image per row of `z`.
    fn forward(&mut self, z: ArrayView2<f32>, mode: Mode) -> Result<Array2<f32>>;

    /// Accumulates the gradient of the last forward pass given the derivative of its output.
    fn backward(&mut self, d: Array2<f32>) -> Result<()>;
}

/// Maps packed images to the probability of them being real.
pub trait Discriminator: Trainable {
    /// Amount of images in a packed input unit.
    fn packing(&self) -> NonZeroUsize;

    /// Length of a single unpacked image.
    fn image_dim(&self) -> usize;

    /// One probability per row of `x`, as a `(n, 1)` column.
    fn forward(&mut self, x: ArrayView2<f32>, mode: Mode) -> Result<Array2<f32>>;

    /// Accumulates the gradient of the last forward pass.
    ///
    /// # Returns
    /// The derivative of the loss with respect to the input of that pass.
    fn backward(&mut self, d: Array2<f32>) -> Result<Array2<f32>>;
}
