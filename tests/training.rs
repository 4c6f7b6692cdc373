use std::{cell::RefCell, fs, num::NonZeroUsize, path::Path, rc::Rc};

use dcgan::{
    DcganTrainer, DenseTrainer, GanErr, Result, TrainerConfig,
    checkpoint::FsStore,
    config::RngStream,
    data::{DataLoader, ImageDataset},
    models::{Discriminator, Generator, Trainable},
    training::TrainerState,
};
use machine_learning::arch::{
    BlockKind, Mode, ParamLayout,
    loss::{Bce, LossFn},
};
use ndarray::{Array2, ArrayView2};
use tempfile::TempDir;

const LATENT: usize = 3;
const SIZE: usize = 2;
const IMAGE: usize = 3 * SIZE * SIZE;

type Calls = Rc<RefCell<Vec<&'static str>>>;
type Targets = Rc<RefCell<Vec<Vec<f32>>>>;

fn single_block() -> ParamLayout {
    let mut layout = ParamLayout::new();
    layout.push("w".into(), BlockKind::Weight, vec![1]);
    layout
}

/// Outputs constant images and records its optimizer steps.
struct MockGenerator {
    params: Vec<f32>,
    grad: Vec<f32>,
    calls: Calls,
}

impl Trainable for MockGenerator {
    fn zero_grad(&mut self) {
        self.grad.fill(0.);
    }

    fn apply_gradient_step(&mut self) -> Result<()> {
        self.calls.borrow_mut().push("G");
        self.params[0] -= 0.1 * self.grad[0] + 1e-3;
        Ok(())
    }

    fn parameters(&self) -> &[f32] {
        &self.params
    }

    fn layout(&self) -> ParamLayout {
        single_block()
    }

    fn load_parameters(&mut self, params: &[f32]) -> Result<()> {
        self.params.copy_from_slice(params);
        Ok(())
    }
}

impl Generator for MockGenerator {
    fn latent_dim(&self) -> usize {
        LATENT
    }

    fn image_dim(&self) -> usize {
        IMAGE
    }

    fn forward(&mut self, z: ArrayView2<f32>, _mode: Mode) -> Result<Array2<f32>> {
        Ok(Array2::from_elem((z.nrows(), IMAGE), self.params[0].tanh()))
    }

    fn backward(&mut self, d: Array2<f32>) -> Result<()> {
        self.grad[0] += d.sum();
        Ok(())
    }
}

/// Scores every unit 0.5-ish and records its optimizer steps, input sizes and loss targets.
struct MockDiscriminator {
    packing: NonZeroUsize,
    params: Vec<f32>,
    input: (usize, usize),
    seen_rows: Vec<usize>,
    targets: Targets,
    calls: Calls,
}

impl MockDiscriminator {
    fn new(packing: NonZeroUsize, calls: Calls) -> Self {
        Self {
            packing,
            params: vec![0.],
            input: (0, 0),
            seen_rows: Vec::new(),
            targets: Targets::default(),
            calls,
        }
    }
}

impl Trainable for MockDiscriminator {
    fn zero_grad(&mut self) {}

    fn apply_gradient_step(&mut self) -> Result<()> {
        self.calls.borrow_mut().push("D");
        self.params[0] += 1e-3;
        Ok(())
    }

    fn parameters(&self) -> &[f32] {
        &self.params
    }

    fn layout(&self) -> ParamLayout {
        single_block()
    }

    fn load_parameters(&mut self, params: &[f32]) -> Result<()> {
        self.params.copy_from_slice(params);
        Ok(())
    }

    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        self.targets.borrow_mut().push(y.iter().copied().collect());
        Bce.loss(y_pred, y)
    }
}

impl Discriminator for MockDiscriminator {
    fn packing(&self) -> NonZeroUsize {
        self.packing
    }

    fn image_dim(&self) -> usize {
        IMAGE
    }

    fn forward(&mut self, x: ArrayView2<f32>, _mode: Mode) -> Result<Array2<f32>> {
        self.input = x.dim();
        self.seen_rows.push(x.nrows());

        let p = 1. / (1. + (-self.params[0]).exp());
        Ok(Array2::from_elem((x.nrows(), 1), p))
    }

    fn backward(&mut self, d: Array2<f32>) -> Result<Array2<f32>> {
        Ok(Array2::from_elem(self.input, d.sum() * 1e-2))
    }
}

type MockTrainer = DcganTrainer<MockGenerator, MockDiscriminator, FsStore>;

fn config(dir: &Path) -> TrainerConfig {
    TrainerConfig {
        save_path: dir.to_path_buf(),
        latent_input: NonZeroUsize::new(LATENT).unwrap(),
        image_size: NonZeroUsize::new(SIZE).unwrap(),
        complexity: NonZeroUsize::new(2).unwrap(),
        nb_image_to_generate: NonZeroUsize::new(4).unwrap(),
        minibatch_size: NonZeroUsize::new(2).unwrap(),
        real_label_smoothing: false,
        fake_label_smoothing: false,
        nb_epoch: 1,
        seed: Some(17),
        ..Default::default()
    }
}

fn mock_trainer(config: TrainerConfig) -> (MockTrainer, Calls) {
    let discriminator = MockDiscriminator::new(config.packing, Calls::default());
    mock_trainer_with(config, discriminator)
}

fn mock_trainer_with(
    config: TrainerConfig,
    discriminator: MockDiscriminator,
) -> (MockTrainer, Calls) {
    let calls = discriminator.calls.clone();
    let generator = MockGenerator {
        params: vec![0.1],
        grad: vec![0.],
        calls: calls.clone(),
    };
    let store = FsStore::new(config.save_path.clone()).unwrap();

    let trainer = DcganTrainer::new(config, generator, discriminator, store).unwrap();
    (trainer, calls)
}

fn loader(config: &TrainerConfig, n: usize) -> DataLoader {
    let images = Array2::from_shape_fn((n, IMAGE), |(i, j)| ((i * IMAGE + j) as f32 * 0.1).sin());
    let dataset = ImageDataset::new(images, vec![0; n], vec!["all".into()]).unwrap();

    DataLoader::new(
        dataset,
        config.minibatch_size,
        config.rng(RngStream::Shuffle),
    )
}

fn files_with_extension(dir: &Path, ext: &str) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|e| e == ext))
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn one_epoch_over_three_batches() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let mut loader = loader(&config, 6);
    let (mut trainer, calls) = mock_trainer(config);

    trainer.train(&mut loader).unwrap();

    let metrics = trainer.metrics();
    assert_eq!(metrics.discriminator_steps, 3);
    assert_eq!(metrics.generator_steps, 3);
    assert_eq!(metrics.batches, 3);
    assert_eq!(metrics.samples, 6);

    assert_eq!(*calls.borrow(), ["D", "G", "D", "G", "D", "G"]);
    assert_eq!(trainer.history().len(), 1);
    assert_eq!(trainer.history().discriminator().len(), 1);
    assert_eq!(trainer.state(), TrainerState::Finished);

    assert!(dir.path().join("gen_epoch_0.png").exists());
    assert!(dir.path().join("losses.png").exists());
}

#[test]
fn discriminator_steps_run_before_the_generator_step() {
    let dir = TempDir::new().unwrap();
    let config = TrainerConfig {
        nb_discriminator_step: NonZeroUsize::new(3).unwrap(),
        ..config(dir.path())
    };
    let mut loader = loader(&config, 4);
    let (mut trainer, calls) = mock_trainer(config);

    trainer.train(&mut loader).unwrap();

    assert_eq!(*calls.borrow(), ["D", "D", "D", "G", "D", "D", "D", "G"]);
    assert_eq!(trainer.metrics().discriminator_steps, 6);
    assert_eq!(trainer.metrics().generator_steps, 2);
}

#[test]
fn packed_batches_drop_the_remainder() {
    let dir = TempDir::new().unwrap();
    let config = TrainerConfig {
        packing: NonZeroUsize::new(2).unwrap(),
        minibatch_size: NonZeroUsize::new(5).unwrap(),
        ..config(dir.path())
    };
    let mut loader = loader(&config, 5);
    let (mut trainer, _) = mock_trainer(config);

    trainer.train(&mut loader).unwrap();

    let seen = &trainer.discriminator().seen_rows;
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|&rows| rows == 2));
}

#[test]
fn batches_smaller_than_the_packing_factor_are_skipped() {
    let dir = TempDir::new().unwrap();
    let config = TrainerConfig {
        packing: NonZeroUsize::new(2).unwrap(),
        ..config(dir.path())
    };
    let mut loader = loader(&config, 5);
    let (mut trainer, _) = mock_trainer(config);

    trainer.train(&mut loader).unwrap();

    assert_eq!(trainer.metrics().batches, 2);
    assert_eq!(trainer.metrics().skipped_batches, 1);
    assert_eq!(trainer.history().len(), 1);
}

#[test]
fn an_epoch_without_a_full_pack_is_an_error() {
    let dir = TempDir::new().unwrap();
    let config = TrainerConfig {
        packing: NonZeroUsize::new(2).unwrap(),
        ..config(dir.path())
    };
    let mut loader = loader(&config, 1);
    let (mut trainer, _) = mock_trainer(config);

    assert!(matches!(
        trainer.train(&mut loader),
        Err(GanErr::EmptyEpoch { epoch: 0 })
    ));
}

#[test]
fn only_the_discriminator_sees_smoothed_labels() {
    let dir = TempDir::new().unwrap();
    let config = TrainerConfig {
        real_label_smoothing: true,
        ..config(dir.path())
    };
    let mut loader = loader(&config, 6);
    let discriminator = MockDiscriminator::new(config.packing, Calls::default());
    let targets = discriminator.targets.clone();
    let (mut trainer, _) = mock_trainer_with(config, discriminator);

    trainer.train(&mut loader).unwrap();

    // Per batch: real and fake targets of the discriminator step, then the generator's targets.
    let targets = targets.borrow();
    assert_eq!(targets.len(), 3 * 3);
    for batch in targets.chunks(3) {
        let [real, fake, generator] = batch else {
            unreachable!()
        };
        assert_eq!(real.len(), 2);
        assert!(real.iter().all(|t| (0.7f32..1.).contains(t)));
        assert!(fake.iter().all(|&t| t == 0.));
        assert!(generator.iter().all(|&t| t == 1.));
    }
}

#[test]
fn a_nan_score_aborts_the_run() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let mut loader = loader(&config, 4);
    let mut discriminator = MockDiscriminator::new(config.packing, Calls::default());
    discriminator.params[0] = f32::NAN;
    let (mut trainer, calls) = mock_trainer_with(config, discriminator);

    assert!(matches!(
        trainer.train(&mut loader),
        Err(GanErr::NonFiniteLoss {
            epoch: 0,
            batch: 1,
            network: "discriminator",
            ..
        })
    ));
    assert_eq!(*calls.borrow(), ["D"]);
    assert!(trainer.history().is_empty());
    assert!(!dir.path().join("gen_epoch_0.png").exists());
}

#[test]
fn a_diverging_dense_run_fails() {
    let dir = TempDir::new().unwrap();
    let config = TrainerConfig {
        nb_epoch: 3,
        learning_rate: 1e30,
        weights_std: 1e30,
        ..config(dir.path())
    };
    let mut loader = loader(&config, 6);
    let mut trainer = DenseTrainer::from_config(config).unwrap();

    assert!(matches!(
        trainer.train(&mut loader),
        Err(GanErr::NonFiniteLoss { .. })
    ));
    assert_ne!(trainer.state(), TrainerState::Finished);
}

#[test]
fn a_trainer_trains_once() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let mut loader = loader(&config, 2);
    let (mut trainer, _) = mock_trainer(config);

    assert_eq!(trainer.state(), TrainerState::Idle);
    trainer.train(&mut loader).unwrap();

    assert!(matches!(
        trainer.train(&mut loader),
        Err(GanErr::InvalidState { .. })
    ));
}

#[test]
fn networks_must_fit_the_configuration() {
    let dir = TempDir::new().unwrap();
    let config = TrainerConfig {
        latent_input: NonZeroUsize::new(LATENT + 1).unwrap(),
        ..config(dir.path())
    };

    let calls = Calls::default();
    let generator = MockGenerator {
        params: vec![0.],
        grad: vec![0.],
        calls: calls.clone(),
    };
    let discriminator = MockDiscriminator::new(config.packing, calls);
    let store = FsStore::new(dir.path()).unwrap();

    assert!(matches!(
        DcganTrainer::new(config, generator, discriminator, store),
        Err(GanErr::InvalidConfig(_))
    ));
}

#[test]
fn dense_training_records_one_loss_per_epoch() {
    let dir = TempDir::new().unwrap();
    let config = TrainerConfig {
        nb_epoch: 3,
        real_label_smoothing: true,
        ..config(dir.path())
    };
    let mut loader = loader(&config, 6);
    let mut trainer = DenseTrainer::from_config(config).unwrap();

    trainer.train(&mut loader).unwrap();

    let history = trainer.history();
    assert_eq!(history.generator().len(), 3);
    assert_eq!(history.discriminator().len(), 3);
    assert!(history.generator().iter().all(|l| l.is_finite()));

    assert_eq!(
        files_with_extension(dir.path(), "png"),
        ["gen_epoch_0.png", "gen_epoch_1.png", "gen_epoch_2.png", "losses.png"]
    );

    let strip = image::open(dir.path().join("gen_epoch_2.png")).unwrap();
    assert_eq!((strip.width(), strip.height()), (SIZE as u32, 4 * SIZE as u32));
}

#[test]
fn saved_models_can_be_loaded_back() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let mut loader = loader(&config, 4);

    let mut trained = DenseTrainer::from_config(config.clone()).unwrap();
    trained.train(&mut loader).unwrap();
    trained.save_models("final").unwrap();

    assert_eq!(
        files_with_extension(dir.path(), "safetensors"),
        ["final_discriminator.safetensors", "final_generator.safetensors"]
    );

    let fresh_config = TrainerConfig {
        seed: Some(99),
        ..config
    };
    let mut fresh = DenseTrainer::from_config(fresh_config).unwrap();
    assert_ne!(fresh.generator().parameters(), trained.generator().parameters());

    fresh.load_models("final").unwrap();
    assert_eq!(fresh.generator().parameters(), trained.generator().parameters());
    assert_eq!(
        fresh.discriminator().parameters(),
        trained.discriminator().parameters()
    );
}

#[test]
fn config_snapshot_is_written() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");

    let (mut trainer, _) = mock_trainer(config(&out));
    trainer.snapshot_config().unwrap();

    let written = fs::read_to_string(out.join("config.json")).unwrap();
    let parsed: TrainerConfig = serde_json::from_str(&written).unwrap();
    assert_eq!(parsed.nb_epoch, 1);

    let source = dir.path().join("hyper.json");
    fs::write(&source, r#"{ "nb_epoch": 2 }"#).unwrap();
    let loaded = TrainerConfig {
        save_path: out.clone(),
        latent_input: NonZeroUsize::new(LATENT).unwrap(),
        image_size: NonZeroUsize::new(SIZE).unwrap(),
        ..TrainerConfig::from_file(&source).unwrap()
    };

    let (mut trainer, _) = mock_trainer(loaded);
    trainer.snapshot_config().unwrap();

    assert_eq!(
        fs::read_to_string(out.join("hyper.json")).unwrap(),
        r#"{ "nb_epoch": 2 }"#
    );
}
