use ndarray::{Array2, ArrayView2};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{MlErr, Result, arch::Mode};

/// Inverted dropout: during training each activation is zeroed with probability `prob` and the
/// survivors are scaled by `1 / (1 - prob)`, during evaluation the layer is the identity.
#[derive(Clone, Debug)]
pub struct Dropout {
    dim: usize,
    prob: f32,
    rng: StdRng,
    mask: Option<Array2<f32>>,
}

impl Dropout {
    /// Creates a new `Dropout` layer.
    ///
    /// # Arguments
    /// * `dim` - The width of the layer.
    /// * `prob` - The probability of dropping an activation, in `[0, 1)`.
    /// * `seed` - The seed of the layer's own random number generator.
    ///
    /// # Returns
    /// A new `Dropout` instance or an error if `prob` is out of range.
    pub fn new(dim: usize, prob: f32, seed: u64) -> Result<Self> {
        if !(0. ..1.).contains(&prob) {
            return Err(MlErr::InvalidInput("dropout probability must be in [0, 1)"));
        }

        Ok(Self {
            dim,
            prob,
            rng: StdRng::seed_from_u64(seed),
            mask: None,
        })
    }

    pub fn forward(&mut self, x: ArrayView2<f32>, mode: Mode) -> Result<Array2<f32>> {
        if x.ncols() != self.dim {
            return Err(MlErr::SizeMismatch {
                what: "dropout input",
                got: x.ncols(),
                expected: self.dim,
            });
        }

        if mode == Mode::Eval || self.prob == 0. {
            self.mask = None;
            return Ok(x.to_owned());
        }

        let keep = 1. - self.prob;
        let mask = Array2::from_shape_simple_fn(x.raw_dim(), || {
            if self.rng.random::<f32>() < keep { 1. / keep } else { 0. }
        });

        let a = &x * &mask;
        self.mask = Some(mask);
        Ok(a)
    }

    pub fn backward(&mut self, mut d: Array2<f32>) -> Result<Array2<f32>> {
        if let Some(mask) = &self.mask {
            if mask.dim() != d.dim() {
                return Err(MlErr::SizeMismatch {
                    what: "dropout delta",
                    got: d.len(),
                    expected: mask.len(),
                });
            }

            d *= mask;
        }

        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_mode_is_identity() {
        let mut dropout = Dropout::new(3, 0.5, 7).unwrap();
        let x = Array2::ones((4, 3));

        assert_eq!(dropout.forward(x.view(), Mode::Eval).unwrap(), x);
    }

    #[test]
    fn train_mode_zeroes_and_rescales() {
        let mut dropout = Dropout::new(100, 0.5, 7).unwrap();
        let x = Array2::ones((10, 100));

        let a = dropout.forward(x.view(), Mode::Train).unwrap();
        assert!(a.iter().all(|&v| v == 0. || v == 2.));
        assert!(a.iter().any(|&v| v == 0.));

        let d = dropout.backward(Array2::ones((10, 100))).unwrap();
        assert_eq!(a, d);
    }

    #[test]
    fn rejects_certain_drop() {
        assert!(Dropout::new(1, 1., 0).is_err());
    }
}
