pub mod dataloader;
pub mod dataset;
mod image_folder;

pub use dataloader::DataLoader;
pub use dataset::{Batch, ImageDataset};
pub use image_folder::load_image_folder;
