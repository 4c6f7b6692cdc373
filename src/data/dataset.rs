use ndarray::{Array2, ArrayView2, Axis};

use crate::{GanErr, Result};

/// An in-memory image dataset.
///
/// Images are flattened channel-major rows normalised to `[-1, 1]`, each one tagged with the
/// index of its class.
#[derive(Debug, Clone)]
pub struct ImageDataset {
    images: Array2<f32>,
    labels: Vec<usize>,
    classes: Vec<String>,
}

impl ImageDataset {
    /// Creates a new `ImageDataset`.
    ///
    /// # Arguments
    /// * `images` - One flattened image per row.
    /// * `labels` - The class index of every image.
    /// * `classes` - The class names, indexed by label.
    ///
    /// # Returns
    /// A new `ImageDataset` or an error if the labels don't match the images.
    pub fn new(images: Array2<f32>, labels: Vec<usize>, classes: Vec<String>) -> Result<Self> {
        if labels.len() != images.nrows() {
            return Err(GanErr::InvalidConfig(format!(
                "{} labels for {} images",
                labels.len(),
                images.nrows()
            )));
        }

        if let Some(&label) = labels.iter().find(|&&label| label >= classes.len()) {
            return Err(GanErr::InvalidConfig(format!(
                "label {label} out of {} classes",
                classes.len()
            )));
        }

        Ok(Self {
            images,
            labels,
            classes,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.images.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of a single flattened image.
    #[inline]
    pub fn image_len(&self) -> usize {
        self.images.ncols()
    }

    pub fn images(&self) -> ArrayView2<'_, f32> {
        self.images.view()
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Gathers the samples at `indices` into a batch.
    pub fn batch(&self, indices: &[usize]) -> Batch {
        Batch {
            images: self.images.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// An owned mini-batch of images and their class labels.
#[derive(Debug, Clone)]
pub struct Batch {
    pub images: Array2<f32>,
    pub labels: Vec<usize>,
}

impl Batch {
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
