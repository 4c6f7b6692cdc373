use std::{
    collections::BTreeMap,
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use image::imageops::FilterType;
use log::{debug, info};
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;

use super::dataset::ImageDataset;
use crate::{GanErr, Result};

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Class name of the images lying directly in the dataset folder.
const ROOT_CLASS: &str = ".";

/// Loads every image under `root` into memory.
///
/// Each subdirectory of `root` is a class, searched recursively. Images are resized to
/// `image_size`×`image_size`, converted to RGB and normalised to `[-1, 1]`. Decoding runs in
/// parallel.
///
/// # Errors
/// `EmptyDataset` if `root` is missing or holds no image, `MalformedImage` if a file can't be
/// decoded.
pub fn load_image_folder<P: AsRef<Path>>(
    root: P,
    image_size: NonZeroUsize,
) -> Result<ImageDataset> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(GanErr::EmptyDataset(root.to_path_buf()));
    }

    let mut files = Vec::new();
    collect_images(root, &mut files)?;
    files.sort();

    if files.is_empty() {
        return Err(GanErr::EmptyDataset(root.to_path_buf()));
    }

    let mut class_ids = BTreeMap::new();
    for path in &files {
        class_ids.insert(class_of(root, path), 0);
    }
    for (id, slot) in class_ids.values_mut().enumerate() {
        *slot = id;
    }

    info!("decoding {} images from '{}'", files.len(), root.display());

    let size = image_size.get();
    let decoded = files
        .par_iter()
        .map(|path| decode(path, size))
        .collect::<Result<Vec<_>>>()?;

    let mut images = Array2::zeros((files.len(), 3 * size * size));
    for (mut row, pixels) in images.rows_mut().into_iter().zip(&decoded) {
        row.assign(&ArrayView1::from(pixels.as_slice()));
    }

    let labels = files
        .iter()
        .map(|path| class_ids[&class_of(root, path)])
        .collect();
    let classes: Vec<String> = class_ids.into_keys().collect();

    debug!("dataset classes: {classes:?}");
    ImageDataset::new(images, labels, classes)
}

fn collect_images(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_images(&path, files)?;
        } else if is_image(&path) {
            files.push(path);
        }
    }

    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn class_of(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut components = relative.components();

    match (components.next(), components.next()) {
        (Some(class), Some(_)) => class.as_os_str().to_string_lossy().into_owned(),
        _ => ROOT_CLASS.to_string(),
    }
}

/// Decodes one image into a channel-major row normalised to `[-1, 1]`.
fn decode(path: &Path, size: usize) -> Result<Vec<f32>> {
    let image = image::open(path).map_err(|source| GanErr::MalformedImage {
        path: path.to_path_buf(),
        source,
    })?;

    let side = size as u32;
    let rgb = image.resize_exact(side, side, FilterType::Triangle).to_rgb8();

    let mut pixels = vec![0.; 3 * size * size];
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let offset = y as usize * size + x as usize;
        for c in 0..3 {
            pixels[c * size * size + offset] = pixel[c] as f32 / 127.5 - 1.;
        }
    }

    Ok(pixels)
}
