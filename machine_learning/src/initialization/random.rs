use std::{cell::RefCell, rc::Rc};

use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::ParamGen;
use crate::{MlErr, Result};

/// Draws every parameter from a distribution.
///
/// The random number generator is shared so that several generators of a model consume a single
/// seeded sequence.
pub struct RandParamGen<R: Rng, D: Distribution<f32>> {
    rng: Rc<RefCell<R>>,
    distribution: D,
}

impl<R: Rng, D: Distribution<f32>> RandParamGen<R, D> {
    pub fn new(rng: Rc<RefCell<R>>, distribution: D) -> Self {
        Self { rng, distribution }
    }
}

impl<R: Rng> RandParamGen<R, Normal<f32>> {
    /// Creates a new `RandParamGen` sampling from `N(mean, std_dev)`.
    ///
    /// # Returns
    /// An error if `std_dev` is negative or not finite.
    pub fn normal(rng: Rc<RefCell<R>>, mean: f32, std_dev: f32) -> Result<Self> {
        if std_dev.is_nan() || std_dev < 0. {
            return Err(MlErr::InvalidDistribution(format!(
                "standard deviation must be non-negative, got {std_dev}"
            )));
        }

        Ok(Self::new(rng, Normal::new(mean, std_dev)?))
    }
}

impl<R: Rng, D: Distribution<f32>> ParamGen for RandParamGen<R, D> {
    fn fill(&mut self, block: &mut [f32]) {
        let mut rng = self.rng.borrow_mut();
        block
            .iter_mut()
            .for_each(|x| *x = self.distribution.sample(&mut *rng));
    }
}
