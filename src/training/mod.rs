mod history;
mod metrics;
pub mod steps;
mod trainer;

pub use history::LossHistory;
pub use metrics::TrainerMetrics;
pub use steps::{Labels, Noise, discriminator_step, generator_step};
pub use trainer::{DcganTrainer, DenseTrainer, TrainerState};
