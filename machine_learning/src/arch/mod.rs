pub mod activations;
pub mod layers;
mod layout;
pub mod loss;
mod model;
mod sequential;

pub use layout::{BlockKind, ParamBlock, ParamLayout};
pub use model::Model;
pub use sequential::Sequential;

/// Whether a forward pass is part of a training step or of inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}
