use ndarray::{Array2, ArrayView2};

use crate::{
    MlErr, Result,
    arch::{Mode, Model, ParamLayout},
    optimization::Optimizer,
};

/// A model together with everything needed to train it: its parameters, its gradient
/// accumulator and the optimizer state.
///
/// The gradient only changes through `backward` and `zero_grad`, the parameters only through
/// `apply_gradient_step` and `load_parameters`.
#[derive(Debug, Clone)]
pub struct Network<M: Model, O: Optimizer> {
    model: M,
    optimizer: O,
    params: Vec<f32>,
    grad: Vec<f32>,
}

impl<M: Model, O: Optimizer> Network<M, O> {
    /// Creates a new `Network`.
    ///
    /// # Arguments
    /// * `model` - The model's architecture.
    /// * `params` - The initial parameters, exactly `model.size()` of them.
    /// * `optimizer` - The optimizer used on `apply_gradient_step`.
    ///
    /// # Returns
    /// A new `Network` or an error if the amount of parameters does not fit the model.
    pub fn new(model: M, params: Vec<f32>, optimizer: O) -> Result<Self> {
        let expected = model.size();

        if params.len() != expected {
            return Err(MlErr::SizeMismatch {
                what: "network parameters",
                got: params.len(),
                expected,
            });
        }

        Ok(Self {
            grad: vec![0.; expected],
            model,
            optimizer,
            params,
        })
    }

    pub fn forward(&mut self, x: ArrayView2<f32>, mode: Mode) -> Result<Array2<f32>> {
        self.model.forward(&self.params, x, mode)
    }

    /// Backpropagates `d` through the last forward pass, accumulating the parameter gradient.
    ///
    /// # Returns
    /// The derivative of the loss with respect to the input of the last forward pass.
    pub fn backward(&mut self, d: Array2<f32>) -> Result<Array2<f32>> {
        self.model.backward(&self.params, &mut self.grad, d)
    }

    /// Resets the gradient accumulator.
    pub fn zero_grad(&mut self) {
        self.grad.fill(0.);
    }

    /// Lets the optimizer update the parameters with the accumulated gradient.
    pub fn apply_gradient_step(&mut self) -> Result<()> {
        self.optimizer.update_params(&self.grad, &mut self.params)
    }

    pub fn parameters(&self) -> &[f32] {
        &self.params
    }

    pub fn gradient(&self) -> &[f32] {
        &self.grad
    }

    pub fn layout(&self) -> ParamLayout {
        self.model.layout()
    }

    /// Replaces the parameters, the optimizer state is left untouched.
    pub fn load_parameters(&mut self, params: &[f32]) -> Result<()> {
        if params.len() != self.params.len() {
            return Err(MlErr::SizeMismatch {
                what: "loaded parameters",
                got: params.len(),
                expected: self.params.len(),
            });
        }

        self.params.copy_from_slice(params);
        Ok(())
    }
}
