use std::num::NonZeroUsize;

use rand::{rngs::StdRng, seq::SliceRandom};

use super::dataset::{Batch, ImageDataset};

/// Yields shuffled mini-batches of an `ImageDataset`, restartable once per epoch.
#[derive(Debug, Clone)]
pub struct DataLoader {
    dataset: ImageDataset,
    batch_size: NonZeroUsize,
    order: Vec<usize>,
    cursor: usize,
    rng: StdRng,
}

impl DataLoader {
    /// Creates a new `DataLoader`, iterating in dataset order until the first `shuffle`.
    ///
    /// # Arguments
    /// * `dataset` - The samples to iterate over.
    /// * `batch_size` - The size of every batch but possibly the last one.
    /// * `rng` - The generator used to shuffle the samples.
    pub fn new(dataset: ImageDataset, batch_size: NonZeroUsize, rng: StdRng) -> Self {
        let order = (0..dataset.len()).collect();

        Self {
            dataset,
            batch_size,
            order,
            cursor: 0,
            rng,
        }
    }

    pub fn dataset(&self) -> &ImageDataset {
        &self.dataset
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    /// Amount of batches in a pass over the dataset.
    #[inline]
    pub fn len(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// Restarts the pass, keeping the current order.
    #[inline]
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Restarts the pass over a freshly shuffled order.
    pub fn shuffle(&mut self) {
        self.order.shuffle(&mut self.rng);
        self.reset();
    }

    /// Returns the next batch of this pass, or None if exhausted.
    pub fn next_batch(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }

        let end = (self.cursor + self.batch_size()).min(self.order.len());
        let batch = self.dataset.batch(&self.order[self.cursor..end]);

        self.cursor = end;
        Some(batch)
    }
}
