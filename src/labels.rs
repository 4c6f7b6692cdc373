use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use rand::Rng;

use crate::{GanErr, Result, device::Device};

/// Produces the discriminator targets, one label per packed sample.
///
/// Smoothed real labels are drawn from `[0.7, 1.0)`, smoothed fake labels from `[0.0, 0.3)`,
/// independently per element and per call.
#[derive(Debug, Clone)]
pub struct LabelSmoother {
    device: Device,
    real: Uniform<f32>,
    fake: Uniform<f32>,
}

impl LabelSmoother {
    /// Creates a new `LabelSmoother`.
    ///
    /// # Arguments
    /// * `device` - The device the label tensors are produced on.
    ///
    /// # Returns
    /// A new `LabelSmoother` or an error if a smoothing range can't be built.
    pub fn new(device: Device) -> Result<Self> {
        let range = |low, high| {
            Uniform::new(low, high)
                .map_err(|e| GanErr::InvalidConfig(format!("label range [{low}, {high}): {e}")))
        };

        Ok(Self {
            device,
            real: range(0.7, 1.0)?,
            fake: range(0.0, 0.3)?,
        })
    }

    /// Targets for real data, a `(n, 1)` column.
    pub fn real<R: Rng + ?Sized>(&self, n: usize, smooth: bool, rng: &mut R) -> Array2<f32> {
        if smooth {
            self.device.sample((n, 1), &self.real, rng)
        } else {
            self.device.full(n, 1, 1.)
        }
    }

    /// Targets for generated data, a `(n, 1)` column.
    pub fn fake<R: Rng + ?Sized>(&self, n: usize, smooth: bool, rng: &mut R) -> Array2<f32> {
        if smooth {
            self.device.sample((n, 1), &self.fake, rng)
        } else {
            self.device.full(n, 1, 0.)
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn smoother() -> LabelSmoother {
        LabelSmoother::new(Device::Cpu).unwrap()
    }

    #[test]
    fn hard_labels_are_constant() {
        let smoother = smoother();
        let mut rng = StdRng::seed_from_u64(0);

        for n in [0, 1, 7] {
            assert!(smoother.real(n, false, &mut rng).iter().all(|&y| y == 1.));
            assert!(smoother.fake(n, false, &mut rng).iter().all(|&y| y == 0.));
            assert_eq!(smoother.real(n, false, &mut rng).dim(), (n, 1));
        }
    }

    #[test]
    fn smoothed_labels_stay_in_range() {
        let smoother = smoother();
        let mut rng = StdRng::seed_from_u64(3);

        for n in [0, 1, 64, 500] {
            let real = smoother.real(n, true, &mut rng);
            let fake = smoother.fake(n, true, &mut rng);

            assert_eq!(real.dim(), (n, 1));
            assert!(real.iter().all(|&y| (0.7..1.0).contains(&y)));
            assert!(fake.iter().all(|&y| (0.0..0.3).contains(&y)));
        }
    }

    #[test]
    fn smoothed_labels_are_resampled() {
        let smoother = smoother();
        let mut rng = StdRng::seed_from_u64(11);

        let a = smoother.real(32, true, &mut rng);
        let b = smoother.real(32, true, &mut rng);
        assert_ne!(a, b);
    }
}
