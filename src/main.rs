use std::env;

use anyhow::{Context, Result};
use log::info;

use dcgan::{
    DenseTrainer, TrainerConfig,
    config::RngStream,
    data::{DataLoader, load_image_folder},
};

const FINAL_PREFIX: &str = "final";

fn main() -> Result<()> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => TrainerConfig::from_file(&path)
            .with_context(|| format!("failed to load config '{path}'"))?,
        None => {
            info!("no config file given, using defaults");
            TrainerConfig::default()
        }
    };

    let mut trainer =
        DenseTrainer::from_config(config).context("failed to build the networks")?;
    let config = trainer.config();

    let dataset = load_image_folder(&config.data_path, config.image_size).with_context(|| {
        format!("failed to load dataset '{}'", config.data_path.display())
    })?;
    let mut loader = DataLoader::new(
        dataset,
        config.minibatch_size,
        config.rng(RngStream::Shuffle),
    );

    trainer.train(&mut loader).context("training failed")?;
    trainer
        .save_models(FINAL_PREFIX)
        .context("failed to save the models")?;
    trainer
        .snapshot_config()
        .context("failed to snapshot the config")?;

    info!(
        "results written to '{}'",
        trainer.config().save_path.display()
    );
    Ok(())
}
