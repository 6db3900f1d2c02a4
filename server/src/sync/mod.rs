//! Event reconciliation: the runner that converges one event, and the worker
//! that runs one reconciliation per accepted signal.

mod error;
mod outcome;
mod runner;
mod worker;

pub use error::*;
pub use outcome::*;
pub use runner::*;
pub use worker::*;
