use std::{
    fs,
    path::{Path, PathBuf},
};

use image::RgbImage;
use log::debug;
use machine_learning::{MlErr, arch::ParamLayout};
use safetensors::{Dtype, SafeTensors, tensor::TensorView};

use crate::{GanErr, Result};

mod plot;
mod samples;

pub use plot::render_loss_plot;
pub use samples::render_sample_strip;

/// Where a run leaves its artifacts.
///
/// Every artifact is addressed by a file name relative to the store.
pub trait Persistence {
    /// Writes `image`, overwriting any previous file of the same name.
    fn write_image(&mut self, name: &str, image: &RgbImage) -> Result<()>;

    /// Writes a parameter set, one named tensor per block of `layout`.
    fn write_params(&mut self, name: &str, layout: &ParamLayout, params: &[f32]) -> Result<()>;

    /// Reads back a parameter set written with the same `layout`.
    fn read_params(&self, name: &str, layout: &ParamLayout) -> Result<Vec<f32>>;

    /// Copies the file at `from` into the store.
    fn copy_file(&mut self, from: &Path, name: &str) -> Result<()>;

    fn write_text(&mut self, name: &str, content: &str) -> Result<()>;
}

/// A `Persistence` backed by a directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Creates a new `FsStore`, creating `root` if it doesn't exist.
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Persistence for FsStore {
    fn write_image(&mut self, name: &str, image: &RgbImage) -> Result<()> {
        let path = self.path(name);
        image.save(&path)?;

        debug!("wrote {}", path.display());
        Ok(())
    }

    fn write_params(&mut self, name: &str, layout: &ParamLayout, params: &[f32]) -> Result<()> {
        if params.len() != layout.len() {
            return Err(MlErr::SizeMismatch {
                what: "saved parameters",
                got: params.len(),
                expected: layout.len(),
            }
            .into());
        }

        let views = layout
            .blocks()
            .iter()
            .map(|block| {
                let bytes: &[u8] = bytemuck::cast_slice(&params[block.range.clone()]);
                let view = TensorView::new(Dtype::F32, block.shape.clone(), bytes)?;
                Ok((block.name.as_str(), view))
            })
            .collect::<Result<Vec<_>>>()?;

        let path = self.path(name);
        safetensors::serialize_to_file(views.iter().map(|(n, v)| (*n, v)), &None, &path)?;

        debug!("wrote {} tensors to {}", views.len(), path.display());
        Ok(())
    }

    fn read_params(&self, name: &str, layout: &ParamLayout) -> Result<Vec<f32>> {
        let bytes = fs::read(self.path(name))?;
        let tensors = SafeTensors::deserialize(&bytes)?;

        let mut params = Vec::with_capacity(layout.len());
        for block in layout.blocks() {
            let tensor = tensors.tensor(&block.name)?;

            if tensor.dtype() != Dtype::F32 || tensor.shape() != block.shape.as_slice() {
                return Err(GanErr::TensorMismatch {
                    name: block.name.clone(),
                    got: tensor.shape().to_vec(),
                    expected: block.shape.clone(),
                });
            }

            params.extend(
                tensor
                    .data()
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            );
        }

        Ok(params)
    }

    fn copy_file(&mut self, from: &Path, name: &str) -> Result<()> {
        fs::copy(from, self.path(name))?;
        Ok(())
    }

    fn write_text(&mut self, name: &str, content: &str) -> Result<()> {
        fs::write(self.path(name), content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use machine_learning::arch::BlockKind;
    use tempfile::TempDir;

    use super::*;

    fn layout() -> ParamLayout {
        let mut layout = ParamLayout::new();
        layout.push("dense_0.weight".into(), BlockKind::Weight, vec![2, 3]);
        layout.push("dense_0.bias".into(), BlockKind::Bias, vec![3]);
        layout
    }

    #[test]
    fn params_survive_a_write_read_cycle() {
        let dir = TempDir::new().unwrap();
        let mut store = FsStore::new(dir.path().join("out")).unwrap();
        let params: Vec<f32> = (0..9).map(|i| i as f32 * 0.5 - 2.).collect();

        store.write_params("net.safetensors", &layout(), &params).unwrap();
        let loaded = store.read_params("net.safetensors", &layout()).unwrap();

        assert_eq!(loaded, params);
    }

    #[test]
    fn reading_into_another_shape_fails() {
        let dir = TempDir::new().unwrap();
        let mut store = FsStore::new(dir.path()).unwrap();
        store.write_params("net.safetensors", &layout(), &[0.; 9]).unwrap();

        let mut other = ParamLayout::new();
        other.push("dense_0.weight".into(), BlockKind::Weight, vec![3, 2]);
        other.push("dense_0.bias".into(), BlockKind::Bias, vec![3]);

        assert!(matches!(
            store.read_params("net.safetensors", &other),
            Err(GanErr::TensorMismatch { .. })
        ));
    }

    #[test]
    fn wrong_parameter_count_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut store = FsStore::new(dir.path()).unwrap();
        assert!(store.write_params("net.safetensors", &layout(), &[0.; 4]).is_err());
    }

    #[test]
    fn images_are_overwritten() {
        let dir = TempDir::new().unwrap();
        let mut store = FsStore::new(dir.path()).unwrap();

        store.write_image("plot.png", &RgbImage::new(4, 4)).unwrap();
        store.write_image("plot.png", &RgbImage::new(8, 2)).unwrap();

        let image = image::open(dir.path().join("plot.png")).unwrap();
        assert_eq!((image.width(), image.height()), (8, 2));
    }
}
