use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{GanErr, Result};

/// Spreads the stream index over the seed's bits so neighbouring seeds don't share streams.
const STREAM_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Where the tensors of a run are allocated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceConfig {
    /// Pick the best device available on this machine.
    #[default]
    Auto,
    Cpu,
}

/// The independent random sequences of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RngStream {
    /// Initial weights and dropout masks.
    Init,
    /// Latent noise and smoothed labels.
    Training,
    /// Dataset shuffling.
    Shuffle,
}

/// The hyper-parameters of a training run.
///
/// Every field is optional in the JSON file, missing ones take the value of
/// `TrainerConfig::default()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainerConfig {
    pub save_path: PathBuf,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    pub nb_image_to_generate: NonZeroUsize,
    pub latent_input: NonZeroUsize,
    pub image_size: NonZeroUsize,
    pub weights_mean: f32,
    pub weights_std: f32,
    pub complexity: NonZeroUsize,
    pub learning_rate: f32,
    pub packing: NonZeroUsize,
    pub real_label_smoothing: bool,
    pub fake_label_smoothing: bool,
    pub dropout_prob: f32,
    pub nb_discriminator_step: NonZeroUsize,
    pub nb_epoch: usize,
    pub minibatch_size: NonZeroUsize,
    pub data_path: PathBuf,
    pub seed: Option<u64>,
    pub device: DeviceConfig,

    /// The file this configuration was read from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        let nz = |n| NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN);

        Self {
            save_path: PathBuf::from("results"),
            beta1: 0.5,
            beta2: 0.999,
            epsilon: 1e-8,
            nb_image_to_generate: nz(8),
            latent_input: nz(100),
            image_size: nz(32),
            weights_mean: 0.,
            weights_std: 0.02,
            complexity: nz(16),
            learning_rate: 2e-4,
            packing: nz(1),
            real_label_smoothing: true,
            fake_label_smoothing: false,
            dropout_prob: 0.3,
            nb_discriminator_step: nz(1),
            nb_epoch: 25,
            minibatch_size: nz(64),
            data_path: PathBuf::from("data"),
            seed: None,
            device: DeviceConfig::Auto,
            source: None,
        }
    }
}

impl TrainerConfig {
    /// Reads and validates a configuration from a JSON file.
    ///
    /// # Arguments
    /// * `path` - The path of the hyper-parameter file.
    ///
    /// # Returns
    /// The configuration or an error if the file can't be read, parsed or holds invalid values.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        let mut config: Self = serde_json::from_str(&content)?;
        config.source = Some(path.to_path_buf());
        config.validate()?;

        Ok(config)
    }

    /// Checks the values serde can't check by itself.
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, value: f32| {
            if !(0. ..1.).contains(&value) {
                return Err(GanErr::InvalidConfig(format!(
                    "{name} must be in [0, 1), got {value}"
                )));
            }
            Ok(())
        };

        unit("beta1", self.beta1)?;
        unit("beta2", self.beta2)?;
        unit("dropout_prob", self.dropout_prob)?;

        let positive = |name: &str, value: f32| {
            if !(value.is_finite() && value > 0.) {
                return Err(GanErr::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
            Ok(())
        };

        positive("learning_rate", self.learning_rate)?;
        positive("epsilon", self.epsilon)?;
        positive("weights_std", self.weights_std)?;

        if !self.weights_mean.is_finite() {
            return Err(GanErr::InvalidConfig(format!(
                "weights_mean must be finite, got {}",
                self.weights_mean
            )));
        }

        if self.save_path.as_os_str().is_empty() {
            return Err(GanErr::InvalidConfig("save_path must not be empty".into()));
        }

        Ok(())
    }

    /// A random number generator for one purpose of the run.
    ///
    /// With a seed, every `stream` gets its own reproducible sequence; without one, the generator
    /// is seeded from the OS.
    pub fn rng(&self, stream: RngStream) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ (stream as u64).wrapping_mul(STREAM_MIX)),
            None => StdRng::from_os_rng(),
        }
    }

    /// Amount of values of a single flattened RGB image.
    pub fn image_len(&self) -> usize {
        3 * self.image_size.get().pow(2)
    }
}
