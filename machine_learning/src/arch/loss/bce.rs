use ndarray::{Array2, ArrayView2, Zip};

use super::LossFn;

/// Lower bound of `ln(p)`, keeps the loss finite when a prediction saturates. A NaN prediction
/// still yields a NaN loss.
const MIN_LOG: f32 = -100.;

/// Keeps the derivative finite when a prediction saturates.
const EPS: f32 = 1e-7;

/// Binary cross entropy over probabilities, averaged over every element.
#[derive(Default, Clone, Copy, Debug)]
pub struct Bce;

impl Bce {
    /// Returns a new `Bce`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for Bce {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let total = Zip::from(&y_pred).and(&y).fold(0., |acc, &p, &t| {
            let log_p = p.ln().clamp(MIN_LOG, 0.);
            let log_q = (1. - p).ln().clamp(MIN_LOG, 0.);
            acc - (t * log_p + (1. - t) * log_q)
        });

        total / y_pred.len() as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.len() as f32;

        Zip::from(&y_pred).and(&y).map_collect(|&p, &t| {
            let p = p.clamp(EPS, 1. - EPS);
            (p - t) / (p * (1. - p)) / n
        })
    }
}
