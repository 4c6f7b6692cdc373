use std::num::NonZeroUsize;

use machine_learning::{MlErr, arch::Mode};
use ndarray::{Array2, ArrayView2};
use rand::Rng;

use crate::{
    Result,
    device::Device,
    models::{Discriminator, Generator},
    packing,
    tensor::Tracked,
};

/// The source of the latent batches both steps draw.
pub struct Noise<'a, R: Rng + ?Sized> {
    pub device: Device,
    pub rng: &'a mut R,
}

impl<R: Rng + ?Sized> Noise<'_, R> {
    /// A fresh `(n, dim)` batch of standard normal latent vectors.
    pub fn latent(&mut self, n: usize, dim: usize) -> Array2<f32> {
        self.device.randn(n, dim, &mut *self.rng)
    }
}

/// The discriminator targets of one batch.
#[derive(Debug, Clone)]
pub struct Labels {
    pub real: Array2<f32>,
    pub fake: Array2<f32>,
}

/// One gradient update of the discriminator.
///
/// The discriminator learns to tell `real` apart from a freshly generated batch of `batch_size`
/// images. The generated batch is detached, the generator is left untouched.
///
/// # Arguments
/// * `real` - The packed real batch.
/// * `batch_size` - The size of the real batch before packing.
/// * `labels` - The targets of the real and the generated packed units.
///
/// # Returns
/// The sum of the real and fake losses.
pub fn discriminator_step<G, D, R>(
    generator: &mut G,
    discriminator: &mut D,
    real: ArrayView2<f32>,
    batch_size: usize,
    labels: &Labels,
    noise: &mut Noise<R>,
) -> Result<f32>
where
    G: Generator,
    D: Discriminator,
    R: Rng + ?Sized,
{
    let units = packed_units(batch_size, discriminator.packing())?;
    check_rows("real packed batch", real.nrows(), units)?;
    check_rows("real labels", labels.real.nrows(), units)?;
    check_rows("fake labels", labels.fake.nrows(), units)?;

    let z = noise.latent(batch_size, generator.latent_dim());
    let fake = Tracked::new(generator.forward(z.view(), Mode::Train)?).detach();
    let fake_packed = packing::pack(fake.view(), discriminator.packing());

    discriminator.zero_grad();

    let y_real = discriminator.forward(real, Mode::Train)?;
    let real_loss = discriminator.loss(y_real.view(), labels.real.view());
    let d_real = discriminator.loss_prime(y_real.view(), labels.real.view());
    discriminator.backward(d_real)?;

    let y_fake = discriminator.forward(fake_packed.view(), Mode::Train)?;
    let fake_loss = discriminator.loss(y_fake.view(), labels.fake.view());
    let d_fake = discriminator.loss_prime(y_fake.view(), labels.fake.view());
    let d_fake = discriminator.backward(d_fake)?;
    backprop_fake(generator, &fake, d_fake, discriminator.packing())?;

    discriminator.apply_gradient_step()?;
    Ok(real_loss + fake_loss)
}

/// One gradient update of the generator.
///
/// A freshly generated batch is scored by the discriminator against `real_labels`; the gradient
/// flows through the discriminator into the generator but only the generator is updated.
///
/// # Returns
/// The generator's loss.
pub fn generator_step<G, D, R>(
    generator: &mut G,
    discriminator: &mut D,
    batch_size: usize,
    real_labels: ArrayView2<f32>,
    noise: &mut Noise<R>,
) -> Result<f32>
where
    G: Generator,
    D: Discriminator,
    R: Rng + ?Sized,
{
    let units = packed_units(batch_size, discriminator.packing())?;
    check_rows("real labels", real_labels.nrows(), units)?;

    let z = noise.latent(batch_size, generator.latent_dim());
    let fake = Tracked::new(generator.forward(z.view(), Mode::Train)?);
    let fake_packed = packing::pack(fake.view(), discriminator.packing());

    generator.zero_grad();

    let y = discriminator.forward(fake_packed.view(), Mode::Train)?;
    let loss = discriminator.loss(y.view(), real_labels);
    let d_fake = discriminator.loss_prime(y.view(), real_labels);
    let d_fake = discriminator.backward(d_fake)?;
    backprop_fake(generator, &fake, d_fake, discriminator.packing())?;

    generator.apply_gradient_step()?;
    Ok(loss)
}

/// Hands the gradient of a packed generated batch back to the generator, unless it was detached.
fn backprop_fake<G: Generator>(
    generator: &mut G,
    fake: &Tracked,
    d_packed: Array2<f32>,
    packing: NonZeroUsize,
) -> Result<()> {
    if !fake.requires_grad() {
        return Ok(());
    }

    let d = packing::unpack_grad(d_packed.view(), fake.nrows(), packing);
    generator.backward(d)
}

fn packed_units(batch_size: usize, packing: NonZeroUsize) -> Result<usize> {
    match packing::packed_len(batch_size, packing) {
        0 => Err(MlErr::InvalidInput("batch smaller than the packing factor").into()),
        units => Ok(units),
    }
}

fn check_rows(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(MlErr::SizeMismatch {
            what,
            got,
            expected,
        }
        .into());
    }

    Ok(())
}
