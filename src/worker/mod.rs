pub mod consume;
pub mod types;

pub use consume::{DispatchOutcome, Worker};
pub use types::*;
