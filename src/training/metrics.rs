use std::time::Duration;

/// Counters of a training run.
#[derive(Debug, Default, Clone)]
pub struct TrainerMetrics {
    pub train_time: Duration,

    pub epochs: u64,
    pub discriminator_steps: u64,
    pub generator_steps: u64,
    pub batches: u64,
    pub skipped_batches: u64,
    pub samples: u64,
}

impl TrainerMetrics {
    #[inline]
    pub fn bump_epoch(&mut self) {
        self.epochs += 1;
    }

    #[inline]
    pub fn bump_discriminator_step(&mut self) {
        self.discriminator_steps += 1;
    }

    #[inline]
    pub fn bump_generator_step(&mut self) {
        self.generator_steps += 1;
    }

    #[inline]
    pub fn bump_batch(&mut self) {
        self.batches += 1;
    }

    #[inline]
    pub fn bump_skipped_batch(&mut self) {
        self.skipped_batches += 1;
    }

    #[inline]
    pub fn add_samples(&mut self, n: usize) {
        self.samples += n as u64;
    }
}
