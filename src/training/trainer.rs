use std::{cell::RefCell, rc::Rc, time::Instant};

use log::{debug, info, warn};
use machine_learning::arch::Mode;
use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;

use super::{
    history::LossHistory,
    metrics::TrainerMetrics,
    steps::{Labels, Noise, discriminator_step, generator_step},
};
use crate::{
    GanErr, Result,
    checkpoint::{FsStore, Persistence, render_loss_plot, render_sample_strip},
    config::{RngStream, TrainerConfig},
    data::DataLoader,
    device::Device,
    labels::LabelSmoother,
    models::{DenseDiscriminator, DenseGenerator, Discriminator, Generator},
    packing,
};

const LOSS_PLOT: &str = "losses.png";
const CONFIG_FILE: &str = "config.json";

/// Where a trainer is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    Idle,
    /// `epoch` is the 0-based index of the epoch being run.
    Running { epoch: usize },
    Finished,
}

impl TrainerState {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running { .. } => "running",
            Self::Finished => "finished",
        }
    }
}

/// Trains a generator against a discriminator.
///
/// Every batch runs `nb_discriminator_step` discriminator steps followed by one generator step.
/// Every epoch ends by recording the mean losses, writing a strip of images generated from a
/// fixed latent batch and redrawing the loss plot.
pub struct DcganTrainer<G, D, P> {
    config: TrainerConfig,
    device: Device,
    generator: G,
    discriminator: D,
    store: P,
    smoother: LabelSmoother,
    rng: StdRng,
    saved_latent: Array2<f32>,
    history: LossHistory,
    metrics: TrainerMetrics,
    state: TrainerState,
}

/// The trainer the binary runs: dense networks saving under `save_path`.
pub type DenseTrainer = DcganTrainer<DenseGenerator, DenseDiscriminator, FsStore>;

impl DenseTrainer {
    /// Builds freshly initialised dense networks and a store for `config`.
    pub fn from_config(config: TrainerConfig) -> Result<Self> {
        config.validate()?;

        let init = Rc::new(RefCell::new(config.rng(RngStream::Init)));
        let generator = DenseGenerator::new(&config, init.clone())?;
        let discriminator = DenseDiscriminator::new(&config, init)?;
        let store = FsStore::new(config.save_path.clone())?;

        Self::new(config, generator, discriminator, store)
    }
}

impl<G, D, P> DcganTrainer<G, D, P>
where
    G: Generator,
    D: Discriminator,
    P: Persistence,
{
    /// Creates a new `DcganTrainer`.
    ///
    /// # Arguments
    /// * `config` - The run's hyper-parameters.
    /// * `generator` - The generator, its latent size must be `latent_input`.
    /// * `discriminator` - The discriminator, packing `packing` images per unit.
    /// * `store` - Where the samples, plots and models are written.
    ///
    /// # Returns
    /// A new idle `DcganTrainer` or an error if the networks don't fit the configuration.
    pub fn new(config: TrainerConfig, generator: G, discriminator: D, store: P) -> Result<Self> {
        config.validate()?;

        let check_dim = |what: &str, got: usize, expected: usize| {
            if got != expected {
                return Err(GanErr::InvalidConfig(format!(
                    "{what} is {got}, configuration expects {expected}"
                )));
            }
            Ok(())
        };

        check_dim(
            "generator latent size",
            generator.latent_dim(),
            config.latent_input.get(),
        )?;
        check_dim(
            "generator image size",
            generator.image_dim(),
            config.image_len(),
        )?;
        check_dim(
            "discriminator image size",
            discriminator.image_dim(),
            config.image_len(),
        )?;
        check_dim(
            "discriminator packing",
            discriminator.packing().get(),
            config.packing.get(),
        )?;

        let device = Device::resolve(config.device);
        let mut rng = config.rng(RngStream::Training);
        let saved_latent = device.randn(
            config.nb_image_to_generate.get(),
            config.latent_input.get(),
            &mut rng,
        );

        Ok(Self {
            smoother: LabelSmoother::new(device)?,
            config,
            device,
            generator,
            discriminator,
            store,
            rng,
            saved_latent,
            history: LossHistory::default(),
            metrics: TrainerMetrics::default(),
            state: TrainerState::Idle,
        })
    }

    /// Runs `nb_epoch` epochs over `loader`.
    ///
    /// A trainer trains once: calling this on a trainer that isn't idle is an error, so is a run
    /// that fails midway.
    pub fn train(&mut self, loader: &mut DataLoader) -> Result<()> {
        if self.state != TrainerState::Idle {
            return Err(GanErr::InvalidState {
                expected: TrainerState::Idle.name(),
                got: self.state.name(),
            });
        }

        if loader.dataset().image_len() != self.config.image_len() {
            return Err(GanErr::InvalidConfig(format!(
                "dataset images have {} values, configuration expects {}",
                loader.dataset().image_len(),
                self.config.image_len()
            )));
        }

        info!(
            "training for {} epochs over {} images in batches of {}",
            self.config.nb_epoch,
            loader.dataset().len(),
            loader.batch_size()
        );

        let start = Instant::now();
        for epoch in 0..self.config.nb_epoch {
            self.state = TrainerState::Running { epoch };
            self.run_epoch(epoch, loader)?;
        }

        self.metrics.train_time += start.elapsed();
        self.state = TrainerState::Finished;

        info!(
            "training finished in {:.1?}: {} discriminator steps, {} generator steps",
            self.metrics.train_time, self.metrics.discriminator_steps, self.metrics.generator_steps
        );
        Ok(())
    }

    fn run_epoch(&mut self, epoch: usize, loader: &mut DataLoader) -> Result<()> {
        let packing = self.config.packing;
        let nb_epoch = self.config.nb_epoch;

        info!("epoch {}/{nb_epoch} started", epoch + 1);
        loader.shuffle();

        let (mut g_sum, mut d_sum, mut trained) = (0., 0., 0usize);
        let mut batch_idx = 0;

        while let Some(batch) = loader.next_batch() {
            batch_idx += 1;

            let batch_size = batch.len();
            let units = packing::packed_len(batch_size, packing);
            if units == 0 {
                warn!(
                    "epoch {epoch}, batch {batch_idx}: {batch_size} samples can't fill a pack of {packing}, skipped"
                );
                self.metrics.bump_skipped_batch();
                continue;
            }

            let real = packing::pack(batch.images.view(), packing);
            let labels = Labels {
                real: self
                    .smoother
                    .real(units, self.config.real_label_smoothing, &mut self.rng),
                fake: self
                    .smoother
                    .fake(units, self.config.fake_label_smoothing, &mut self.rng),
            };
            let hard_real = self.smoother.real(units, false, &mut self.rng);

            let mut noise = Noise {
                device: self.device,
                rng: &mut self.rng,
            };

            let mut d_loss = 0.;
            for _ in 0..self.config.nb_discriminator_step.get() {
                d_loss = discriminator_step(
                    &mut self.generator,
                    &mut self.discriminator,
                    real.view(),
                    batch_size,
                    &labels,
                    &mut noise,
                )?;
                check_finite(epoch, batch_idx, "discriminator", d_loss)?;
                self.metrics.bump_discriminator_step();
            }

            let g_loss = generator_step(
                &mut self.generator,
                &mut self.discriminator,
                batch_size,
                hard_real.view(),
                &mut noise,
            )?;
            check_finite(epoch, batch_idx, "generator", g_loss)?;
            self.metrics.bump_generator_step();

            debug!("epoch {epoch}, batch {batch_idx}: d_loss {d_loss:.4}, g_loss {g_loss:.4}");

            g_sum += g_loss;
            d_sum += d_loss;
            trained += 1;
            self.metrics.bump_batch();
            self.metrics.add_samples(batch_size);
        }

        if trained == 0 {
            return Err(GanErr::EmptyEpoch { epoch });
        }

        let (g_mean, d_mean) = (g_sum / trained as f32, d_sum / trained as f32);
        self.history.push(g_mean, d_mean);
        self.metrics.bump_epoch();

        info!(
            "epoch {}/{nb_epoch}: generator loss {g_mean:.4}, discriminator loss {d_mean:.4}",
            epoch + 1
        );

        self.write_samples(epoch)?;
        self.write_loss_plot()
    }

    /// Generates images from the saved latent batch and writes them as `gen_epoch_<epoch>.png`,
    /// `epoch` being the 0-based index of the epoch that just ended.
    pub fn write_samples(&mut self, epoch: usize) -> Result<()> {
        let images = self
            .generator
            .forward(self.saved_latent.view(), Mode::Eval)?;
        let strip = render_sample_strip(images.view(), self.config.image_size.get())?;

        self.store
            .write_image(&format!("gen_epoch_{epoch}.png"), &strip)
    }

    /// Redraws `losses.png` from the loss history.
    pub fn write_loss_plot(&mut self) -> Result<()> {
        let plot = render_loss_plot(&self.history)?;
        self.store.write_image(LOSS_PLOT, &plot)
    }

    /// Writes both networks as `<prefix>_discriminator.safetensors` and
    /// `<prefix>_generator.safetensors`.
    pub fn save_models(&mut self, prefix: &str) -> Result<()> {
        self.store.write_params(
            &discriminator_file(prefix),
            &self.discriminator.layout(),
            self.discriminator.parameters(),
        )?;
        self.store.write_params(
            &generator_file(prefix),
            &self.generator.layout(),
            self.generator.parameters(),
        )?;

        info!("saved models with prefix '{prefix}'");
        Ok(())
    }

    /// Loads both networks from the files `save_models` wrote with the same `prefix`.
    pub fn load_models(&mut self, prefix: &str) -> Result<()> {
        let params = self
            .store
            .read_params(&discriminator_file(prefix), &self.discriminator.layout())?;
        self.discriminator.load_parameters(&params)?;

        let params = self
            .store
            .read_params(&generator_file(prefix), &self.generator.layout())?;
        self.generator.load_parameters(&params)?;

        info!("loaded models with prefix '{prefix}'");
        Ok(())
    }

    /// Copies the configuration file next to the run's artifacts.
    ///
    /// A configuration built in code is written as `config.json` instead.
    pub fn snapshot_config(&mut self) -> Result<()> {
        match &self.config.source {
            Some(path) => {
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| CONFIG_FILE.to_string());
                self.store.copy_file(path, &name)
            }
            None => {
                let content = serde_json::to_string_pretty(&self.config)?;
                self.store.write_text(CONFIG_FILE, &content)
            }
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    pub fn history(&self) -> &LossHistory {
        &self.history
    }

    pub fn metrics(&self) -> &TrainerMetrics {
        &self.metrics
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn discriminator(&self) -> &D {
        &self.discriminator
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    /// The latent batch every sample strip is generated from.
    pub fn saved_latent(&self) -> ArrayView2<'_, f32> {
        self.saved_latent.view()
    }
}

fn discriminator_file(prefix: &str) -> String {
    format!("{prefix}_discriminator.safetensors")
}

fn generator_file(prefix: &str) -> String {
    format!("{prefix}_generator.safetensors")
}

fn check_finite(epoch: usize, batch: usize, network: &'static str, value: f32) -> Result<()> {
    if !value.is_finite() {
        return Err(GanErr::NonFiniteLoss {
            epoch,
            batch,
            network,
            value,
        });
    }

    Ok(())
}
