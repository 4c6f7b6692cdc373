use log::info;
use ndarray::Array2;
use ndarray_rand::{
    RandomExt,
    rand_distr::{Distribution, StandardNormal},
};
use rand::Rng;

use crate::config::DeviceConfig;

/// The device every tensor of a run is produced on.
///
/// Resolved once from the configuration and handed to whoever creates tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
}

impl Device {
    /// Picks the device for `config`.
    ///
    /// `Auto` falls back to the CPU, the only backend the networks run on.
    pub fn resolve(config: DeviceConfig) -> Self {
        let device = match config {
            DeviceConfig::Auto | DeviceConfig::Cpu => Self::Cpu,
        };

        info!("using device {device:?} (requested {config:?})");
        device
    }

    /// A `(rows, cols)` matrix of standard normal samples.
    pub fn randn<R: Rng + ?Sized>(&self, rows: usize, cols: usize, rng: &mut R) -> Array2<f32> {
        self.sample((rows, cols), StandardNormal, rng)
    }

    /// A `(rows, cols)` matrix where every element is `value`.
    pub fn full(&self, rows: usize, cols: usize, value: f32) -> Array2<f32> {
        match self {
            Self::Cpu => Array2::from_elem((rows, cols), value),
        }
    }

    /// A matrix of independent samples of `dist`.
    pub fn sample<D, R>(&self, shape: (usize, usize), dist: D, rng: &mut R) -> Array2<f32>
    where
        D: Distribution<f32>,
        R: Rng + ?Sized,
    {
        match self {
            Self::Cpu => Array2::random_using(shape, dist, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn auto_resolves_to_cpu() {
        assert_eq!(Device::resolve(DeviceConfig::Auto), Device::Cpu);
        assert_eq!(Device::resolve(DeviceConfig::Cpu), Device::Cpu);
    }

    #[test]
    fn randn_is_seeded_and_shaped() {
        let device = Device::Cpu;
        let a = device.randn(4, 3, &mut StdRng::seed_from_u64(7));
        let b = device.randn(4, 3, &mut StdRng::seed_from_u64(7));

        assert_eq!(a.dim(), (4, 3));
        assert_eq!(a, b);
    }

    #[test]
    fn full_fills_every_element() {
        let ones = Device::Cpu.full(2, 1, 1.);
        assert!(ones.iter().all(|&x| x == 1.));

        assert_eq!(Device::Cpu.full(0, 1, 1.).len(), 0);
    }
}
