//! Packing groups `P` consecutive samples of a batch into a single discriminator input.
//!
//! Images are stored as flattened channel-major rows, so concatenating `P` images along the
//! channel axis is the same as concatenating their rows.

use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2, s};

/// Amount of packed units a batch of `batch_size` samples yields.
pub fn packed_len(batch_size: usize, packing: NonZeroUsize) -> usize {
    batch_size / packing.get()
}

/// Packs a `(B, D)` batch into a `(B / P, P * D)` one.
///
/// The last `B mod P` samples don't fill a group and are dropped.
pub fn pack(batch: ArrayView2<f32>, packing: NonZeroUsize) -> Array2<f32> {
    let p = packing.get();
    let (b, d) = batch.dim();
    let units = packed_len(b, packing);

    let mut packed = Array2::zeros((units, p * d));
    for (i, mut unit) in packed.rows_mut().into_iter().enumerate() {
        for j in 0..p {
            unit.slice_mut(s![j * d..(j + 1) * d]).assign(&batch.row(i * p + j));
        }
    }

    packed
}

/// Scatters the gradient of a packed batch back onto the `(batch_size, D)` samples it came from.
///
/// Samples dropped by `pack` get a zero gradient.
pub fn unpack_grad(d: ArrayView2<f32>, batch_size: usize, packing: NonZeroUsize) -> Array2<f32> {
    let p = packing.get();
    let width = d.ncols() / p;

    let mut grad = Array2::zeros((batch_size, width));
    for (i, unit) in d.rows().into_iter().enumerate() {
        for j in 0..p {
            grad.row_mut(i * p + j).assign(&unit.slice(s![j * width..(j + 1) * width]));
        }
    }

    grad
}
