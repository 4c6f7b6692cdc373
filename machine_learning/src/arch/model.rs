use ndarray::{Array2, ArrayView2};

use super::{Mode, layout::ParamLayout};
use crate::error::Result;

/// A differentiable model whose parameters live outside of it, in a flat slice.
pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Describes how the flat parameter slice is split into named tensors.
    fn layout(&self) -> ParamLayout;

    /// Makes a forward pass through the model.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - The input data, one sample per row.
    /// * `mode` - Whether the pass is part of training or of inference.
    ///
    /// # Returns
    /// The model's output, one row per sample.
    fn forward(&mut self, params: &[f32], x: ArrayView2<f32>, mode: Mode) -> Result<Array2<f32>>;

    /// Backpropagates the derivative of the loss with respect to the output of the last forward
    /// pass, **adding** the parameter gradient into `grad`.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `grad` - The gradient accumulator, same length as `params`.
    /// * `d` - The derivative of the loss with respect to the model's output.
    ///
    /// # Returns
    /// The derivative of the loss with respect to the model's input.
    fn backward(&mut self, params: &[f32], grad: &mut [f32], d: Array2<f32>)
    -> Result<Array2<f32>>;
}
