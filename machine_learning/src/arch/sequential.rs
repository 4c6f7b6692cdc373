use ndarray::{Array2, ArrayView2};

use super::{BlockKind, Mode, Model, ParamLayout, layers::Layer};
use crate::{MlErr, Result};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        let expected = self.size();

        if got != expected {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected,
            });
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }

    fn layout(&self) -> ParamLayout {
        let mut layout = ParamLayout::new();

        for (i, layer) in self.layers.iter().enumerate() {
            if let Layer::Dense(dense) = layer {
                let (n, m) = dense.dim();
                layout.push(format!("dense_{i}.weight"), BlockKind::Weight, vec![n, m]);
                layout.push(format!("dense_{i}.bias"), BlockKind::Bias, vec![m]);
            }
        }

        layout
    }

    fn forward(&mut self, params: &[f32], x: ArrayView2<f32>, mode: Mode) -> Result<Array2<f32>> {
        self.check_len("sequential parameters", params.len())?;

        let mut front = params;
        let mut a = x.to_owned();

        for layer in self.layers.iter_mut() {
            let (layer_params, rest) = front.split_at(layer.size());
            front = rest;
            a = layer.forward(layer_params, a.view(), mode)?;
        }

        Ok(a)
    }

    fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        mut d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        self.check_len("sequential parameters", params.len())?;
        self.check_len("sequential gradient", grad.len())?;

        let mut end = params.len();

        for (i, layer) in self.layers.iter_mut().enumerate().rev() {
            let start = end - layer.size();
            d = layer
                .backward(&params[start..end], &mut grad[start..end], d)
                .map_err(|e| match e {
                    MlErr::MissingForwardPass { .. } => MlErr::MissingForwardPass { layer: i },
                    e => e,
                })?;
            end = start;
        }

        Ok(d)
    }
}
