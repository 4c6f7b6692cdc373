use std::{error::Error, fmt, io, path::PathBuf};

use machine_learning::MlErr;
use safetensors::SafeTensorError;

/// The trainer's result type.
pub type Result<T> = std::result::Result<T, GanErr>;

/// Everything that can go wrong while configuring, training or checkpointing.
#[derive(Debug)]
pub enum GanErr {
    /// A configuration value is invalid, caught at construction.
    InvalidConfig(String),
    /// The dataset folder holds no usable image.
    EmptyDataset(PathBuf),
    /// An image of the dataset could not be decoded.
    MalformedImage {
        path: PathBuf,
        source: image::ImageError,
    },
    /// Every batch of an epoch was smaller than the packing factor.
    EmptyEpoch { epoch: usize },
    /// A loss became NaN or infinite, the run can't go on.
    NonFiniteLoss {
        epoch: usize,
        batch: usize,
        network: &'static str,
        value: f32,
    },
    /// An operation was requested in the wrong trainer state.
    InvalidState {
        expected: &'static str,
        got: &'static str,
    },
    /// There is nothing to report yet.
    EmptyHistory,
    /// A stored tensor doesn't fit the parameter block it's loaded into.
    TensorMismatch {
        name: String,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    Ml(MlErr),
    Image(image::ImageError),
    Tensors(SafeTensorError),
    Json(serde_json::Error),
    Io(io::Error),
}

impl fmt::Display for GanErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GanErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            GanErr::EmptyDataset(path) => {
                write!(f, "no image found in dataset '{}'", path.display())
            }
            GanErr::MalformedImage { path, source } => {
                write!(f, "cannot decode image '{}': {source}", path.display())
            }
            GanErr::EmptyEpoch { epoch } => write!(
                f,
                "epoch {epoch} had no batch large enough to fill a packed sample"
            ),
            GanErr::NonFiniteLoss {
                epoch,
                batch,
                network,
                value,
            } => write!(
                f,
                "{network} loss became {value} at epoch {epoch}, batch {batch}"
            ),
            GanErr::InvalidState { expected, got } => {
                write!(f, "trainer is {got}, expected it to be {expected}")
            }
            GanErr::EmptyHistory => write!(f, "no epoch has been completed yet"),
            GanErr::TensorMismatch {
                name,
                got,
                expected,
            } => write!(
                f,
                "stored tensor '{name}' has shape {got:?}, expected f32 {expected:?}"
            ),
            GanErr::Ml(e) => write!(f, "model error: {e}"),
            GanErr::Image(e) => write!(f, "image error: {e}"),
            GanErr::Tensors(e) => write!(f, "safetensors error: {e}"),
            GanErr::Json(e) => write!(f, "json error: {e}"),
            GanErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for GanErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GanErr::MalformedImage { source, .. } => Some(source),
            GanErr::Ml(e) => Some(e),
            GanErr::Image(e) => Some(e),
            GanErr::Tensors(e) => Some(e),
            GanErr::Json(e) => Some(e),
            GanErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for GanErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}

impl From<image::ImageError> for GanErr {
    fn from(value: image::ImageError) -> Self {
        Self::Image(value)
    }
}

impl From<SafeTensorError> for GanErr {
    fn from(value: SafeTensorError) -> Self {
        Self::Tensors(value)
    }
}

impl From<serde_json::Error> for GanErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<io::Error> for GanErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
