pub mod checkpoint;
pub mod config;
pub mod data;
pub mod device;
mod error;
pub mod labels;
pub mod models;
pub mod packing;
pub mod tensor;
pub mod training;

pub use config::TrainerConfig;
pub use error::{GanErr, Result};
pub use training::{DcganTrainer, DenseTrainer};
