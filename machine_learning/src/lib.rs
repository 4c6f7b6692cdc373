pub mod arch;
pub mod error;
pub mod initialization;
mod network;
pub mod optimization;

pub use error::{MlErr, Result};
pub use network::Network;
